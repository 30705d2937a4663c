//! Find usages and rename through the model manager.

use codemodel::Position;
use codemodel::ide::{TaskState, apply_edits};
use codemodel::project::{HeaderPath, ProjectMacro};

use crate::helpers::project_fixtures::ProjectFixture;
use crate::helpers::usage_assertions::*;

const A_H: &str = "void f();\n";
const MAIN_CPP: &str = "#include \"a.h\"\nint main()\n{\n#if FOO\n    f();\n#endif\n    return 0;\n}\n";

/// Part P with header path `<tmp>/inc`, `FOO=1` and `main.cpp` calling `f`
/// from `a.h`.
fn include_scenario() -> (ProjectFixture, codemodel::FilePath, codemodel::FilePath) {
    let fx = ProjectFixture::new();
    let header = fx.write("inc/a.h", A_H);
    let main = fx.write("src/main.cpp", MAIN_CPP);
    let part = fx
        .part("p", "P", &[&main])
        .with_header_paths([HeaderPath::user(fx.path("inc").as_str())])
        .with_macros([ProjectMacro::new("FOO", "1")]);
    assert_eq!(fx.index("p", vec![part]), TaskState::Completed);
    (fx, header, main)
}

// =============================================================================
// SYMBOLS
// =============================================================================

#[test]
fn test_indexing_reaches_header_through_include_path() {
    let (fx, header, main) = include_scenario();
    let snapshot = fx.manager.snapshot();
    assert!(snapshot.contains(&main));
    assert!(snapshot.contains(&header));
    let includes: Vec<_> = snapshot.document(&main).unwrap().resolved_includes().cloned().collect();
    assert_eq!(includes, vec![header]);
}

#[test]
fn test_find_usages_reports_the_call_site() {
    let (fx, header, main) = include_scenario();
    let symbol = fx.manager.symbol_at(&header, Position::new(0, 5)).unwrap();
    assert_eq!(symbol.name.as_str(), "f");

    let report = fx.manager.find_usages(&symbol).finish();
    assert_eq!(report.state, TaskState::Completed);

    let calls = references_in(&report, &main);
    assert_eq!(calls.len(), 1);
    assert_eq!((calls[0].line, calls[0].column, calls[0].length), (4, 4, 1));
    assert_eq!(calls[0].line_text, "    f();");
    assert_eq!(usages_in(&report, &main).len(), 1);
}

#[test]
fn test_rename_stages_one_edit_in_main() {
    let (fx, header, main) = include_scenario();
    let symbol = fx.manager.symbol_at(&header, Position::new(0, 5)).unwrap();

    let report = fx.manager.rename_usages(&symbol, "g").unwrap().finish();
    let edits = edits_in(&report, &main);
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].replacement, "g");
    assert!(apply_edits(MAIN_CPP, &edits).contains("    g();\n"));
}

#[test]
fn test_search_again_after_edit() {
    let (fx, header, main) = include_scenario();
    let symbol = fx.manager.symbol_at(&header, Position::new(0, 5)).unwrap();
    let path = fx.manager.find_usages(&symbol).finish();
    assert_eq!(path.usages.len(), 2);

    fx.write("src/main.cpp", "#include \"a.h\"\nvoid twice()\n{\n    f();\n    f();\n}\n");
    fx.manager.file_changed(&main).wait();

    let again = fx.manager.search_again(&symbol.path(), None).unwrap().finish();
    let lines: Vec<u32> = references_in(&again, &main).iter().map(|u| u.line).collect();
    assert_eq!(lines, vec![3, 4]);
}

#[test]
fn test_macro_usages() {
    let (fx, _, main) = include_scenario();
    let configuration = fx.manager.document(&codemodel::project::configuration_path()).unwrap();
    let foo = configuration.find_macro("FOO").unwrap().clone();

    let report = fx.manager.find_macro_usages(&foo).finish();
    let in_main = usages_in(&report, &main);
    assert_eq!(in_main.len(), 1);
    assert_eq!((in_main[0].line, in_main[0].column), (3, 4));
}

// =============================================================================
// PRE-FILTER
// =============================================================================

#[test]
fn test_only_files_naming_the_symbol_are_bound() {
    let fx = ProjectFixture::new();
    let mut files = vec![
        fx.write("many/f0.cpp", "int widget_count;\n"),
        fx.write("many/f1.cpp", "extern int widget_count;\nvoid bump1() { widget_count++; }\n"),
        fx.write("many/f2.cpp", "extern int widget_count;\nvoid bump2() { widget_count += 2; }\n"),
    ];
    for i in 3..100 {
        files.push(fx.write(&format!("many/f{i}.cpp"), &format!("int unrelated{i} = {i};\n")));
    }
    let refs: Vec<_> = files.iter().collect();
    fx.index("many", vec![fx.part("many", "many", &refs)]);

    let symbol = fx.manager.symbol_at(&files[0], Position::new(0, 4)).unwrap();
    let report = fx.manager.find_usages(&symbol).finish();

    assert_eq!(report.stats.candidates, 100);
    assert_eq!(report.stats.bound, 3);
    assert_eq!(report.files().len(), 3);
    assert_eq!(references_in(&report, &files[1]).len(), 1);
    assert_eq!(references_in(&report, &files[2]).len(), 1);
}

#[test]
fn test_rename_rejects_invalid_identifier() {
    let (fx, header, _) = include_scenario();
    let symbol = fx.manager.symbol_at(&header, Position::new(0, 5)).unwrap();
    assert!(matches!(
        fx.manager.rename_usages(&symbol, "1abc"),
        Err(codemodel::Error::InvalidIdentifier(_))
    ));
}
