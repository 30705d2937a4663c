//! Declaration/definition matching and its search order.

use codemodel::FilePath;
use codemodel::Position;

use crate::helpers::project_fixtures::ProjectFixture;

/// Two parts: P1 = {a.cpp, a_extra.cpp, runner.h}, P2 = {b.cpp}.
fn two_parts() -> (ProjectFixture, [FilePath; 4]) {
    let fx = ProjectFixture::new();
    let header = fx.write("lib/runner.h", "struct Runner {\n    void run(int n);\n};\n");
    let a = fx.write("lib/a.cpp", "#include \"runner.h\"\nvoid Runner::run(int n) {}\n");
    let a_extra = fx.write("lib/a_extra.cpp", "int extra;\n");
    let b = fx.write("lib/b.cpp", "#include \"runner.h\"\nvoid Runner::run(int n) {}\n");
    let p1 = fx.part("app", "P1", &[&a, &a_extra, &header]);
    let p2 = fx.part("app", "P2", &[&b]);
    fx.index("app", vec![p1, p2]);
    (fx, [header, a, a_extra, b])
}

#[test]
fn test_same_part_files_come_first() {
    let (fx, [header, a, a_extra, b]) = two_parts();
    let order = fx.manager.file_iteration_order(&a);

    let rank = |path: &FilePath| order.iter().position(|p| p == path).unwrap();
    assert_eq!(order[0], a);
    assert!(rank(&a_extra) < rank(&b));
    assert!(rank(&header) < rank(&b));
}

#[test]
fn test_definition_found_in_same_part() {
    let (fx, [header, a, _, b]) = two_parts();
    let declaration = fx.manager.symbol_at(&header, Position::new(1, 9)).unwrap();
    assert_eq!(declaration.name.as_str(), "run");

    let definition = fx.manager.find_matching_definition(&declaration, true).unwrap();
    assert_eq!(definition.file, a);
    assert_ne!(definition.file, b);

    let back = fx.manager.find_matching_declaration(&definition).unwrap();
    assert_eq!(back.file, header);
}

#[test]
fn test_strict_mode_refuses_fuzzy_match() {
    let fx = ProjectFixture::new();
    let header = fx.write("w.h", "struct W {\n    void set(int v);\n};\n");
    let source = fx.write("w.cpp", "#include \"w.h\"\nvoid W::set(long v) {}\n");
    fx.index("app", vec![fx.part("app", "app", &[&source, &header])]);

    let declaration = fx.manager.symbol_at(&header, Position::new(1, 9)).unwrap();
    assert!(fx.manager.find_matching_definition(&declaration, true).is_none());
    let fuzzy = fx.manager.find_matching_definition(&declaration, false).unwrap();
    assert_eq!(fuzzy.file, source);
}
