#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::ide::symbol_index::SymbolKinds;
use crate::ide::task::TaskState;
use crate::project::configuration_source;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

fn working_copy(files: &[(&str, &str)]) -> WorkingCopy {
    let mut wc = WorkingCopy::new();
    wc.insert(configuration_path(), configuration_source("#define FOO 1\n"), 0);
    for (path, contents) in files {
        wc.insert(*path, *contents, 1);
    }
    wc
}

fn recorder() -> (DocumentCallback, Arc<Mutex<Vec<Arc<Document>>>>) {
    let seen: Arc<Mutex<Vec<Arc<Document>>>> = Arc::default();
    let sink = seen.clone();
    let callback: DocumentCallback = Arc::new(move |doc: &Arc<Document>| sink.lock().push(doc.clone()));
    (callback, seen)
}

fn support(settings: &Settings) -> BuiltinIndexingSupport {
    BuiltinIndexingSupport::new(WorkerPool::new(2).unwrap(), settings)
}

#[test]
fn test_sources_before_headers_with_configuration() {
    let wc = working_copy(&[
        ("/p/b.h", "#if FOO\nint header_yes;\n#endif\n"),
        ("/p/a.cpp", "#if FOO\nint source_yes;\n#endif\n"),
    ]);
    let (callback, seen) = recorder();
    let mut request = RefreshRequest::new(
        vec![FilePath::new("/p/b.h"), FilePath::new("/p/a.cpp")],
        Snapshot::new(),
        wc,
    );
    request.on_document = Some(callback);

    let handle = support(&Settings::default()).refresh_source_files(request, ProgressMode::Reserved);
    assert_eq!(handle.wait(), TaskState::Completed);

    let docs = seen.lock();
    let order: Vec<&str> = docs.iter().map(|d| d.path().as_str()).collect();
    assert_eq!(order, vec!["<configuration>", "/p/a.cpp", "/p/b.h"]);
    for doc in docs.iter().skip(1) {
        assert_eq!(doc.tree().global_decls().count(), 1, "{}", doc.path());
    }
    assert_eq!(handle.progress(), (2, 2));
}

#[rstest::rstest]
#[case(ProgressMode::Reserved, 1, false)]
#[case(ProgressMode::Reserved, 2, true)]
#[case(ProgressMode::Forced, 1, true)]
fn test_progress_visibility(#[case] mode: ProgressMode, #[case] files: usize, #[case] visible: bool) {
    let paths: Vec<FilePath> = (0..files).map(|i| FilePath::new(format!("/p/f{i}.cpp"))).collect();
    let contents: Vec<(String, &str)> = paths.iter().map(|p| (p.to_string(), "int x;\n")).collect();
    let borrowed: Vec<(&str, &str)> = contents.iter().map(|(p, c)| (p.as_str(), *c)).collect();
    let request = RefreshRequest::new(paths, Snapshot::new(), working_copy(&borrowed));

    let handle = support(&Settings::default()).refresh_source_files(request, mode);
    assert_eq!(handle.is_progress_visible(), visible);
    handle.wait();
}

#[test]
fn test_finished_callback_only_when_completed() {
    let pool = WorkerPool::new(1).unwrap();
    let indexing = BuiltinIndexingSupport::new(pool.clone(), &Settings::default());

    // occupy the only worker so the batch stays queued
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
    let blocker = pool.spawn(TaskControl::new("blocker"), move |_| {
        let _ = release_rx.recv();
    });

    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let mut request = RefreshRequest::new(
        vec![FilePath::new("/p/a.cpp")],
        Snapshot::new(),
        working_copy(&[("/p/a.cpp", "int a;\n")]),
    );
    request.on_finished = Some(Arc::new(move |_files: &[FilePath]| flag.store(true, Ordering::SeqCst)));

    let handle = indexing.refresh_source_files(request, ProgressMode::Forced);
    handle.cancel();
    release_tx.send(()).unwrap();
    blocker.wait();

    assert_eq!(handle.wait(), TaskState::Canceled);
    assert!(!finished.load(Ordering::SeqCst));
    assert_eq!(indexing.tracked_batches(), 1);
    indexing.wait_for_all();
    assert_eq!(indexing.tracked_batches(), 0);
}

#[test]
fn test_diagnostics_dump_writes_report() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        dump_diagnostics: true,
        dump_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    let indexing = support(&settings);
    assert!(indexing.is_dumping_diagnostics());

    let request = RefreshRequest::new(
        vec![FilePath::new("/p/z.cpp"), FilePath::new("/p/bad.cpp")],
        Snapshot::new(),
        working_copy(&[("/p/z.cpp", "int fine;\n"), ("/p/bad.cpp", "#error boom\n")]),
    );
    assert_eq!(
        indexing.refresh_source_files(request, ProgressMode::Forced).wait(),
        TaskState::Completed
    );

    let reports: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "tasks"))
        .collect();
    assert_eq!(reports.len(), 1);
    let text = std::fs::read_to_string(&reports[0]).unwrap();
    let line = text.lines().find(|l| l.contains("boom")).unwrap();
    assert!(line.starts_with("/p/bad.cpp\t1\terr\t"), "{line}");
}

#[test]
fn test_search_symbols() {
    let wc = working_copy(&[("/p/a.cpp", "class Alpha {};\nvoid beta() {}\n")]);
    let mut processor = SourceProcessor::new(Snapshot::new(), wc);
    processor.run(&FilePath::new("/p/a.cpp"));
    let snapshot = processor.into_snapshot();
    let indexing = support(&Settings::default());

    let (results, state) = indexing
        .search_symbols(&snapshot, SymbolSearchParameters::new("alp").with_kinds(SymbolKinds::CLASSES))
        .collect();
    assert_eq!(state, TaskState::Completed);
    assert_eq!(results.len(), 1);
    assert_eq!(&*results[0].item.name, "Alpha");
    assert_eq!(indexing.index_cache().len(), 1);

    let (results, state) = indexing
        .search_symbols(&snapshot, SymbolSearchParameters::new("[").regex(true))
        .collect();
    assert!(results.is_empty());
    assert_eq!(state, TaskState::Completed);
}
