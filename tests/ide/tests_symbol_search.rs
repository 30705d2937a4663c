//! Project-wide symbol search through the model manager.

use codemodel::ide::{SearchScope, SymbolKinds, SymbolSearchParameters, TaskState};

use crate::helpers::project_fixtures::ProjectFixture;

fn indexed() -> (ProjectFixture, codemodel::FilePath, codemodel::FilePath) {
    let fx = ProjectFixture::new();
    let shapes = fx.write(
        "src/shapes.cpp",
        "namespace geo {\nclass Circle {\npublic:\n    double radius() const;\n};\nenum Color { Red };\n}\n",
    );
    let app = fx.write("src/app.cpp", "void drawCircle(int r) {}\nint circles;\n");
    fx.index("app", vec![fx.part("app", "app", &[&shapes, &app])]);
    (fx, shapes, app)
}

fn names(fx: &ProjectFixture, parameters: SymbolSearchParameters) -> Vec<String> {
    let (results, state) = fx.manager.search_symbols(parameters).collect();
    assert_eq!(state, TaskState::Completed);
    let mut names: Vec<String> = results.iter().map(|r| r.item.qualified_name()).collect();
    names.sort();
    names
}

#[test]
fn test_search_across_project() {
    let (fx, _, _) = indexed();
    assert_eq!(
        names(&fx, SymbolSearchParameters::new("circle").with_kinds(SymbolKinds::ALL)),
        vec!["circles", "drawCircle", "geo::Circle"]
    );
}

#[test]
fn test_search_by_kind_and_scope() {
    let (fx, shapes, _) = indexed();
    assert_eq!(
        names(&fx, SymbolSearchParameters::new("circle").with_kinds(SymbolKinds::CLASSES)),
        vec!["geo::Circle"]
    );
    assert_eq!(
        names(
            &fx,
            SymbolSearchParameters::new("r")
                .with_kinds(SymbolKinds::ENUMS)
                .with_scope(SearchScope::Files(vec![shapes]))
        ),
        vec!["geo::Color"]
    );
}

#[test]
fn test_invalid_pattern_finishes_empty() {
    let (fx, _, _) = indexed();
    let (results, state) = fx
        .manager
        .search_symbols(SymbolSearchParameters::new("(").regex(true))
        .collect();
    assert!(results.is_empty());
    assert_eq!(state, TaskState::Completed);
}

#[test]
fn test_canceled_search_stops_between_files() {
    let fx = ProjectFixture::new();
    let files: Vec<codemodel::FilePath> = (0..40)
        .map(|i| {
            let body: String = (0..10).map(|j| format!("void sym{i}_{j}() {{}}\n")).collect();
            fx.write(&format!("src/gen{i:02}.cpp"), &body)
        })
        .collect();
    let refs: Vec<&codemodel::FilePath> = files.iter().collect();
    fx.index("gen", vec![fx.part("gen", "gen", &refs)]);

    let search = fx
        .manager
        .search_symbols(SymbolSearchParameters::new("sym").with_kinds(SymbolKinds::ALL));
    assert!(search.next_result().is_some());
    search.cancel();
    let (rest, state) = search.collect();

    assert_eq!(state, TaskState::Canceled);
    assert!(rest.len() + 1 < 400);
}
