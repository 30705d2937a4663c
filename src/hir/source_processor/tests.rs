#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::parser::Severity;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

fn working_copy(files: &[(&str, &str)]) -> WorkingCopy {
    let mut wc = WorkingCopy::new();
    for (path, contents) in files {
        wc.insert(*path, *contents, 1);
    }
    wc
}

#[test]
fn test_includes_are_processed_recursively() {
    let wc = working_copy(&[
        ("/p/main.cpp", "#include \"a.h\"\nint main() { return VALUE; }\n"),
        ("/p/a.h", "#include \"b.h\"\n#define VALUE B_VALUE\n"),
        ("/p/b.h", "#define B_VALUE 7\n"),
    ]);
    let mut processor = SourceProcessor::new(Snapshot::new(), wc);
    let doc = processor.run(&FilePath::new("/p/main.cpp")).unwrap();

    assert_eq!(processor.snapshot().len(), 3);
    assert_eq!(
        doc.resolved_includes().cloned().collect::<Vec<_>>(),
        vec![FilePath::new("/p/a.h")]
    );
    let texts: Vec<_> = doc.tokens().iter().map(|t| t.text.as_str()).collect();
    assert!(texts.contains(&"7"));
    assert!(doc.source().is_some());
}

#[test]
fn test_header_paths_and_unresolved_includes() {
    let wc = working_copy(&[
        ("/p/main.cpp", "#include <lib.h>\n#include \"nowhere.h\"\n"),
        ("/inc/lib.h", "void lib();\n"),
    ]);
    let mut processor = SourceProcessor::new(Snapshot::new(), wc);
    processor.set_header_paths(vec![HeaderPath::user("/inc")]);
    let doc = processor.run(&FilePath::new("/p/main.cpp")).unwrap();

    let includes = doc.includes();
    assert_eq!(includes.len(), 2);
    assert_eq!(includes[0].resolved, Some(FilePath::new("/inc/lib.h")));
    assert_eq!(includes[1].resolved, None);
    assert_eq!(includes[1].line, 1);
    assert!(
        doc.diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains("nowhere.h"))
    );
}

#[test]
fn test_framework_header_path() {
    let wc = working_copy(&[
        ("/p/main.mm", "#include <Kit/Kit.h>\n"),
        ("/fw/Kit.framework/Headers/Kit.h", "int kit;\n"),
    ]);
    let mut processor = SourceProcessor::new(Snapshot::new(), wc);
    processor.set_header_paths(vec![HeaderPath::framework("/fw")]);
    let doc = processor.run(&FilePath::new("/p/main.mm")).unwrap();
    assert_eq!(
        doc.includes()[0].resolved,
        Some(FilePath::new("/fw/Kit.framework/Headers/Kit.h"))
    );
}

#[test]
fn test_include_next_skips_own_directory() {
    let wc = working_copy(&[
        ("/p/main.cpp", "#include <x.h>\n"),
        ("/first/x.h", "#include_next <x.h>\n"),
        ("/second/x.h", "int second;\n"),
    ]);
    let mut processor = SourceProcessor::new(Snapshot::new(), wc);
    processor.set_header_paths(vec![HeaderPath::user("/first"), HeaderPath::user("/second")]);
    processor.run(&FilePath::new("/p/main.cpp")).unwrap();
    let first = processor.snapshot().document(&FilePath::new("/first/x.h")).unwrap();
    assert_eq!(
        first.includes()[0].resolved,
        Some(FilePath::new("/second/x.h"))
    );
}

#[test]
fn test_self_include_does_not_loop() {
    let wc = working_copy(&[("/p/loop.h", "#include \"loop.h\"\nint x;\n")]);
    let mut processor = SourceProcessor::new(Snapshot::new(), wc);
    let doc = processor.run(&FilePath::new("/p/loop.h")).unwrap();
    assert_eq!(doc.tree().decl_count(), 1);
}

#[test]
fn test_known_includes_contribute_macros_without_reparse() {
    let wc = working_copy(&[
        ("/p/a.h", "#define FROM_A 1\n"),
        ("/p/one.cpp", "#include \"a.h\"\n"),
        ("/p/two.cpp", "#include \"a.h\"\n#if FROM_A\nint visible;\n#endif\n"),
    ]);
    let mut processor = SourceProcessor::new(Snapshot::new(), wc);
    processor.run(&FilePath::new("/p/one.cpp"));
    processor.reset_environment();
    let two = processor.run(&FilePath::new("/p/two.cpp")).unwrap();
    assert_eq!(processor.stats().parsed, 3);
    assert!(two.skipped_ranges().is_empty());
    assert_eq!(two.tree().decl_count(), 1);
}

#[test]
fn test_unchanged_fingerprint_reuses_global_document() {
    let wc = working_copy(&[("/p/a.cpp", "int a;\n")]);
    let mut first = SourceProcessor::new(Snapshot::new(), wc.clone());
    let original = first.run(&FilePath::new("/p/a.cpp")).unwrap();
    let global = first.into_snapshot();

    let mut second = SourceProcessor::new(global, wc);
    second.set_todo([FilePath::new("/p/a.cpp")]);
    let again = second.run(&FilePath::new("/p/a.cpp")).unwrap();
    assert!(Arc::ptr_eq(&original, &again));
    assert_eq!(second.stats().reused, 1);
    assert_eq!(second.stats().parsed, 0);
}

#[test]
fn test_document_callback_sees_new_documents() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let wc = working_copy(&[("/p/a.cpp", "#include \"b.h\"\n"), ("/p/b.h", "")]);
    let mut processor = SourceProcessor::new(Snapshot::new(), wc);
    processor.set_document_callback(Arc::new(move |doc| {
        sink.lock().unwrap().push(doc.path().clone());
    }));
    processor.run(&FilePath::new("/p/a.cpp"));
    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec![FilePath::new("/p/b.h"), FilePath::new("/p/a.cpp")]);
}

#[test]
fn test_disk_files_and_size_limit() {
    let dir = TempDir::new().unwrap();
    let small = dir.path().join("small.cpp");
    let big = dir.path().join("big.cpp");
    fs::write(&small, "int small;\n").unwrap();
    fs::write(&big, format!("int big;\n{}", " ".repeat(1024 * 1024 + 1))).unwrap();

    let mut processor = SourceProcessor::new(Snapshot::new(), WorkingCopy::new());
    processor.set_file_size_limit(Some(1));
    let doc = processor.run(&FilePath::from_path(&small)).unwrap();
    assert_eq!(doc.revision(), 0);
    assert!(doc.source().is_none());
    assert!(doc.last_modified().is_some());

    assert!(processor.run(&FilePath::from_path(&big)).is_none());
    assert_eq!(processor.stats().too_large, 1);
    assert!(processor.run(&FilePath::new("/nonexistent/file.cpp")).is_none());
}

#[test]
fn test_process_with_configuration() {
    let wc = working_copy(&[("/p/main.cpp", "#if FOO == 1\nint enabled;\n#endif\n")]);
    let doc = process(
        &FilePath::new("/p/main.cpp"),
        &wc,
        &[],
        &[ProjectMacro::new("FOO", "1")],
        LanguageFeatures::cxx(),
    )
    .unwrap();
    assert_eq!(doc.tree().decl_count(), 1);
}
