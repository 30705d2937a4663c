#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::hir::{Snapshot, SourceProcessor};
use crate::project::WorkingCopy;
use rstest::rstest;

const SOURCE: &str = "namespace ns {\n\
class Widget {\n\
public:\n\
    void show();\n\
signals:\n\
    void clicked();\n\
private:\n\
    int m_count;\n\
};\n\
enum Color { Red };\n\
void Widget::show() {}\n\
namespace {\n\
int hidden;\n\
}\n\
}\n";

fn document(source: &str) -> Arc<Document> {
    let mut wc = WorkingCopy::new();
    wc.insert("/p/w.cpp", source, 1);
    SourceProcessor::new(Snapshot::new(), wc)
        .run(&FilePath::new("/p/w.cpp"))
        .unwrap()
}

fn flatten(root: &IndexItem) -> Vec<(IndexItemKind, String)> {
    let mut out = Vec::new();
    root.visit(&mut |item| {
        if item.kind != IndexItemKind::File {
            out.push((item.kind, item.qualified_name()));
        }
    });
    out
}

#[test]
fn test_tree_nests_members_under_classes() {
    let strings = StringTable::new();
    let doc = document(SOURCE);
    let root = SymbolIndexBuilder::new(&strings, SymbolKinds::ALL).index_of(&doc, "");

    assert_eq!(root.kind, IndexItemKind::File);
    let widget = root.children.iter().find(|i| &*i.name == "Widget").unwrap();
    assert_eq!(widget.kind, IndexItemKind::Class);
    assert_eq!(&*widget.scope, "ns");
    let members: Vec<&str> = widget.children.iter().map(|i| &*i.name).collect();
    assert_eq!(members, vec!["show", "clicked", "m_count"]);
    assert_eq!(widget.children[2].display_text(), "int m_count");
}

#[test]
fn test_functions_and_anonymous_scopes() {
    let strings = StringTable::new();
    let doc = document(SOURCE);
    let root = SymbolIndexBuilder::new(&strings, SymbolKinds::ALL).index_of(&doc, "");
    let items = flatten(&root);

    assert!(items.contains(&(IndexItemKind::Function, "ns::Widget::show".to_string())));
    assert!(items.contains(&(IndexItemKind::Enum, "ns::Color".to_string())));
    assert!(items.contains(&(IndexItemKind::Declaration, "ns::Color::Red".to_string())));
    assert!(items.contains(&(
        IndexItemKind::Declaration,
        "ns::<anonymous namespace>::hidden".to_string()
    )));

    let definition = root
        .children
        .iter()
        .find(|i| i.kind == IndexItemKind::Function)
        .unwrap();
    assert_eq!(definition.display_text(), "show() -> void");
}

#[rstest]
#[case(SymbolKinds::CLASSES, vec!["ns::Widget"])]
#[case(SymbolKinds::ENUMS, vec!["ns::Color"])]
#[case(SymbolKinds::FUNCTIONS, vec!["ns::Widget::clicked", "ns::Widget::show"])]
fn test_requested_kinds(#[case] kinds: SymbolKinds, #[case] expected: Vec<&str>) {
    let strings = StringTable::new();
    let doc = document(SOURCE);
    let root = SymbolIndexBuilder::new(&strings, kinds).index_of(&doc, "");
    let mut names: Vec<String> = flatten(&root).into_iter().map(|(_, n)| n).collect();
    names.sort();
    assert_eq!(names, expected);
}

#[test]
fn test_strings_are_interned() {
    let strings = StringTable::new();
    let doc = document("int a;\nint b;\n");
    let root = SymbolIndexBuilder::new(&strings, SymbolKinds::ALL).index_of(&doc, "");

    assert_eq!(root.count(), 3);
    assert!(Arc::ptr_eq(&root.children[0].symbol_type, &root.children[1].symbol_type));
    drop(root);
    assert!(strings.collect_garbage() > 0);
}

#[test]
fn test_scope_prefix() {
    let strings = StringTable::new();
    let doc = document("class A {};\n");
    let root = SymbolIndexBuilder::new(&strings, SymbolKinds::CLASSES).index_of(&doc, "outer");
    assert_eq!(root.children[0].qualified_name(), "outer::A");
}

#[test]
fn test_kind_flags() {
    let kinds = SymbolKinds::CLASSES | SymbolKinds::ENUMS;
    assert!(kinds.contains(SymbolKinds::CLASSES));
    assert!(!kinds.contains(SymbolKinds::FUNCTIONS));
    assert!(!kinds.contains(SymbolKinds::NONE));
    assert!(SymbolKinds::ALL.contains(SymbolKinds::DECLARATIONS));
    assert_eq!(format!("{kinds:?}"), "SymbolKinds(CLASSES | ENUMS)");
}
