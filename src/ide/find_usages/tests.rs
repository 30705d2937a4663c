#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::hir::SourceProcessor;

const HEADER: &str = "void f();\nint other;\n";
const MAIN: &str = "#include \"a.h\"\nint main() { f(); return other; }\n";

fn working_copy(files: &[(&str, &str)]) -> WorkingCopy {
    let mut wc = WorkingCopy::new();
    for (path, contents) in files {
        wc.insert(*path, *contents, 1);
    }
    wc
}

fn snapshot_of(wc: &WorkingCopy) -> Snapshot {
    let mut processor = SourceProcessor::new(Snapshot::new(), wc.clone());
    for (path, _) in wc.sorted() {
        processor.reset_environment();
        processor.run(path);
    }
    processor.into_snapshot()
}

fn pool() -> Arc<WorkerPool> {
    WorkerPool::new(2).unwrap()
}

/// The first declaration called `name` in `path`.
fn symbol(snapshot: &Snapshot, path: &str, name: &str) -> Symbol {
    let doc = snapshot.document(&FilePath::new(path)).unwrap();
    let (id, _) = doc
        .tree()
        .decls()
        .find(|(_, d)| d.name.as_deref() == Some(name))
        .unwrap();
    let ctx = LookupContext::new(doc.clone(), snapshot);
    ctx.symbol(ctx.entity(id))
}

fn in_file<'a>(report: &'a UsageReport, path: &str) -> Vec<&'a Usage> {
    report
        .usages
        .iter()
        .filter(|u| u.file.as_str() == path)
        .collect()
}

#[test]
fn test_function_usages_across_files() {
    let wc = working_copy(&[("/p/a.h", HEADER), ("/p/main.cpp", MAIN), ("/p/other.cpp", "int g;\n")]);
    let snapshot = snapshot_of(&wc);
    let report = find_usages(&pool(), &symbol(&snapshot, "/p/a.h", "f"), snapshot, wc).finish();

    assert_eq!(report.state, TaskState::Completed);
    let declarations = in_file(&report, "/p/a.h");
    assert_eq!(declarations.len(), 1);
    assert!(declarations[0].is_declaration);

    let calls = in_file(&report, "/p/main.cpp");
    assert_eq!(calls.len(), 1);
    assert_eq!((calls[0].line, calls[0].column, calls[0].length), (1, 13, 1));
    assert_eq!(calls[0].line_text, "int main() { f(); return other; }");
    assert!(!calls[0].is_declaration);
    assert_eq!(report.stats.bound, 2);
}

#[test]
fn test_rename_stages_edits() {
    let wc = working_copy(&[("/p/a.h", HEADER), ("/p/main.cpp", MAIN)]);
    let snapshot = snapshot_of(&wc);
    let search = rename_usages(&pool(), &symbol(&snapshot, "/p/a.h", "f"), snapshot, wc, "g").unwrap();
    assert_eq!(search.replacement(), Some("g"));
    let report = search.finish();

    let edits = report.staged_edits();
    let main_edits: Vec<TextEdit> = edits
        .into_iter()
        .filter(|e| e.file.as_str() == "/p/main.cpp")
        .collect();
    assert_eq!(main_edits.len(), 1);
    assert_eq!(
        apply_edits(MAIN, &main_edits),
        "#include \"a.h\"\nint main() { g(); return other; }\n"
    );
}

#[test]
fn test_rename_rejects_non_identifiers() {
    let wc = working_copy(&[("/p/a.h", HEADER)]);
    let snapshot = snapshot_of(&wc);
    let result = rename_usages(&pool(), &symbol(&snapshot, "/p/a.h", "f"), snapshot, wc, "not valid");
    assert!(matches!(result, Err(Error::InvalidIdentifier(_))));
}

#[test]
fn test_local_usages_stay_in_file() {
    let source = "void k()\n{\n    int n = 1;\n    n += 2;\n}\nint n;\n";
    let wc = working_copy(&[("/p/k.cpp", source)]);
    let snapshot = snapshot_of(&wc);
    let local = symbol(&snapshot, "/p/k.cpp", "n");
    assert!(local.is_local());

    let report = find_usages(&pool(), &local, snapshot, wc).finish();
    let lines: Vec<(u32, bool)> = report.usages.iter().map(|u| (u.line, u.is_declaration)).collect();
    assert_eq!(lines, vec![(2, true), (3, false)]);
}

#[test]
fn test_class_usages_include_constructors_and_destructors() {
    let source = "class X { public: X(); ~X(); };\nX::X() {}\nX make();\n";
    let wc = working_copy(&[("/p/x.cpp", source)]);
    let snapshot = snapshot_of(&wc);
    let report = find_usages(&pool(), &symbol(&snapshot, "/p/x.cpp", "X"), snapshot, wc).finish();

    let sites: Vec<(u32, u32)> = report.usages.iter().map(|u| (u.line, u.column)).collect();
    assert!(sites.contains(&(0, 6)));
    assert!(sites.contains(&(0, 18)));
    assert!(sites.contains(&(0, 24)));
    assert!(sites.contains(&(1, 0)));
    assert!(sites.contains(&(1, 3)));
    assert!(sites.contains(&(2, 0)));
}

#[test]
fn test_prefilter_skips_files_without_identifier() {
    let mut files: Vec<(String, String)> = vec![
        ("/p/a.h".to_string(), HEADER.to_string()),
        ("/p/main.cpp".to_string(), MAIN.to_string()),
    ];
    for i in 0..20 {
        files.push((format!("/p/unrelated{i}.cpp"), format!("int value{i};\n")));
    }
    let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, s)| (p.as_str(), s.as_str())).collect();
    let wc = working_copy(&borrowed);
    let snapshot = snapshot_of(&wc);
    let report = find_usages(&pool(), &symbol(&snapshot, "/p/a.h", "f"), snapshot, wc).finish();

    assert_eq!(report.stats.candidates, 22);
    assert_eq!(report.stats.bound, 2);
}

#[test]
fn test_working_copy_changes_are_reparsed() {
    let wc = working_copy(&[("/p/a.h", HEADER), ("/p/main.cpp", MAIN)]);
    let snapshot = snapshot_of(&wc);
    let mut edited = wc.clone();
    edited.insert("/p/main.cpp", "#include \"a.h\"\n\n\nint main() { f(); }\n", 2);

    let report = find_usages(&pool(), &symbol(&snapshot, "/p/a.h", "f"), snapshot, edited).finish();
    let calls = in_file(&report, "/p/main.cpp");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].line, 3);
    assert_eq!(report.stats.reparsed, 1);
}

#[test]
fn test_macro_usages() {
    let wc = working_copy(&[
        ("/p/a.h", "#define LIMIT 10\n"),
        ("/p/main.cpp", "#include \"a.h\"\nint x = LIMIT;\n#ifdef LIMIT\n#endif\n"),
    ]);
    let snapshot = snapshot_of(&wc);
    let definition = snapshot
        .document(&FilePath::new("/p/a.h"))
        .unwrap()
        .find_macro("LIMIT")
        .unwrap()
        .clone();

    let report = find_macro_usages(&pool(), &definition, snapshot, wc).finish();
    let definitions = in_file(&report, "/p/a.h");
    assert_eq!(definitions.len(), 1);
    assert!(definitions[0].is_declaration);
    let uses = in_file(&report, "/p/main.cpp");
    assert!(uses.iter().any(|u| (u.line, u.column, u.length) == (1, 8, 5)));
    assert!(uses.iter().all(|u| u.matched_text == "LIMIT"));
    assert!(uses.iter().all(|u| !u.is_declaration));
}

#[test]
fn test_search_again_after_edit() {
    let wc = working_copy(&[("/p/a.h", HEADER), ("/p/main.cpp", MAIN)]);
    let snapshot = snapshot_of(&wc);
    let first = find_usages(&pool(), &symbol(&snapshot, "/p/a.h", "f"), snapshot, wc);
    let path = first.symbol_path().cloned().unwrap();
    first.finish();

    let edited = working_copy(&[("/p/a.h", "\nvoid f();\n"), ("/p/main.cpp", "#include \"a.h\"\nvoid h() { f(); f(); }\n")]);
    let snapshot = snapshot_of(&edited);
    let report = search_again(&pool(), &path, snapshot, edited, None).unwrap().finish();
    assert_eq!(in_file(&report, "/p/main.cpp").len(), 2);
    assert_eq!(in_file(&report, "/p/a.h")[0].line, 1);
}

/// `count` files, each calling `f` from `a.h` `calls` times on one line.
fn callers(count: usize, calls: usize) -> WorkingCopy {
    let body = "f(); ".repeat(calls);
    let mut files: Vec<(String, String)> = vec![("/p/a.h".to_string(), HEADER.to_string())];
    for i in 0..count {
        files.push((
            format!("/p/caller{i:02}.cpp"),
            format!("#include \"a.h\"\nvoid caller{i}() {{ {body}}}\n"),
        ));
    }
    let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, s)| (p.as_str(), s.as_str())).collect();
    working_copy(&borrowed)
}

/// A one-thread pool whose worker is busy until the returned sender fires.
fn blocked_pool() -> (Arc<WorkerPool>, crossbeam_channel::Sender<()>, TaskHandle) {
    let pool = WorkerPool::new(1).unwrap();
    let (release, released) = bounded::<()>(0);
    let blocker = pool.spawn(TaskControl::new("blocker"), move |_| {
        let _ = released.recv();
    });
    (pool, release, blocker)
}

fn wait_until_started(task: &TaskHandle) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while task.state() == TaskState::Queued && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(task.state(), TaskState::Running);
}

#[test]
fn test_paused_search_waits_for_resume() {
    let wc = callers(4, 1);
    let snapshot = snapshot_of(&wc);
    let (pool, release, blocker) = blocked_pool();

    let search = find_usages(&pool, &symbol(&snapshot, "/p/a.h", "f"), snapshot, wc);
    search.pause();
    release.send(()).unwrap();
    blocker.wait();
    wait_until_started(search.task());

    std::thread::sleep(std::time::Duration::from_millis(100));
    assert_eq!(search.task().progress(), (0, 5));
    assert_eq!(search.stats().bound, 0);

    search.resume();
    let report = search.finish();
    assert_eq!(report.state, TaskState::Completed);
    assert_eq!(report.usages.len(), 5);
    assert_eq!(report.stats.bound, 5);
}

#[test]
fn test_canceled_search_reports_partial_results() {
    let wc = callers(60, 10);
    let snapshot = snapshot_of(&wc);
    let pool = WorkerPool::new(1).unwrap();
    let search = find_usages(&pool, &symbol(&snapshot, "/p/a.h", "f"), snapshot, wc);

    let first = search.next_result().unwrap();
    assert_eq!(first.matched_text, "f");
    search.cancel();
    let report = search.finish();

    assert!(report.is_canceled());
    assert!(!report.usages.is_empty());
    assert!(report.usages.len() < 600);
}

#[test]
fn test_cancel_before_start_finds_nothing() {
    let wc = callers(3, 1);
    let snapshot = snapshot_of(&wc);
    let (pool, release, blocker) = blocked_pool();

    let search = find_usages(&pool, &symbol(&snapshot, "/p/a.h", "f"), snapshot, wc);
    search.cancel();
    release.send(()).unwrap();
    blocker.wait();

    let report = search.finish();
    assert!(report.is_canceled());
    assert!(report.usages.is_empty());
    assert_eq!(report.stats.bound, 0);
}

#[test]
fn test_apply_edits_on_one_line() {
    let edits = staged_edits(
        &[
            Usage {
                file: FilePath::new("/p/a.cpp"),
                line: 0,
                column: 0,
                length: 3,
                matched_text: "foo".to_string(),
                line_text: String::new(),
                is_declaration: true,
            },
            Usage {
                file: FilePath::new("/p/a.cpp"),
                line: 0,
                column: 10,
                length: 3,
                matched_text: "foo".to_string(),
                line_text: String::new(),
                is_declaration: false,
            },
        ],
        "renamed",
    );
    assert_eq!(edits[0].column, 10);
    assert_eq!(apply_edits("foo = 1 + foo;\n", &edits), "renamed = 1 + renamed;\n");
}

#[test]
fn test_identifiers() {
    assert!(is_identifier("g"));
    assert!(is_identifier("_under_score9"));
    assert!(!is_identifier(""));
    assert!(!is_identifier("9lives"));
    assert!(!is_identifier("a-b"));
}
