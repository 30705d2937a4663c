//! Snapshot consistency through the model manager.

use std::sync::Arc;

use codemodel::FilePath;
use codemodel::hir::{Snapshot, process};
use codemodel::ide::{ProgressMode, TaskState};
use codemodel::project::{LanguageFeatures, WorkingCopy};

use crate::helpers::project_fixtures::ProjectFixture;

fn document_at_revision(path: &FilePath, contents: &str, revision: u32) -> Arc<codemodel::syntax::Document> {
    let mut wc = WorkingCopy::new();
    wc.insert(path.clone(), contents, revision);
    process(path, &wc, &[], &[], LanguageFeatures::default()).expect("document")
}

// =============================================================================
// REVISIONS
// =============================================================================

#[test]
fn test_older_revision_is_ignored() {
    let fx = ProjectFixture::new();
    let path = FilePath::new("/virtual/x.cpp");

    assert!(fx.manager.insert_document(document_at_revision(&path, "int five;", 5)));
    assert!(!fx.manager.insert_document(document_at_revision(&path, "int three;", 3)));

    let doc = fx.manager.document(&path).unwrap();
    assert_eq!(doc.revision(), 5);
    assert!(doc.contains_identifier("five"));
}

#[test]
fn test_handles_are_point_in_time() {
    let fx = ProjectFixture::new();
    let path = FilePath::new("/virtual/x.cpp");
    let before: Snapshot = fx.manager.snapshot();

    fx.manager.insert_document(document_at_revision(&path, "int x;", 1));

    assert!(!before.contains(&path));
    assert!(fx.manager.snapshot().contains(&path));
}

// =============================================================================
// REINDEXING
// =============================================================================

#[test]
fn test_reindexing_unchanged_files_keeps_documents() {
    let fx = ProjectFixture::new();
    let header = fx.write("src/a.h", "#define LIMIT 4\nint table[LIMIT];\n");
    let main = fx.write("src/main.cpp", "#include \"a.h\"\nint main() { return table[0]; }\n");
    let part = fx.part("app", "app", &[&main, &header]);
    assert_eq!(fx.index("app", vec![part]), TaskState::Completed);

    let first = fx.manager.snapshot();
    let state = fx
        .manager
        .update_source_files([main.clone(), header.clone()], ProgressMode::Forced)
        .wait();
    assert_eq!(state, TaskState::Completed);
    let second = fx.manager.snapshot();

    for path in [&main, &header] {
        let (a, b) = (first.document(path).unwrap(), second.document(path).unwrap());
        assert_eq!(a.fingerprint(), b.fingerprint(), "{path}");
        assert!(Arc::ptr_eq(&a, &b), "{path} was replaced");
    }
}

#[test]
fn test_changed_file_gets_new_fingerprint() {
    let fx = ProjectFixture::new();
    let main = fx.write("main.cpp", "int a;\n");
    fx.index("app", vec![fx.part("app", "app", &[&main])]);
    let before = fx.manager.document(&main).unwrap();

    fx.write("main.cpp", "int a;\nint b;\n");
    fx.manager.file_changed(&main).wait();

    let after = fx.manager.document(&main).unwrap();
    assert_ne!(before.fingerprint(), after.fingerprint());
    assert!(after.contains_identifier("b"));
}
