//! Reachability sweep after projects and editors go away.

use codemodel::ide::{ModelEvent, TextBuffer};

use crate::helpers::project_fixtures::ProjectFixture;

#[test]
fn test_removed_project_files_are_collected() {
    let fx = ProjectFixture::new();
    let b = fx.write("p/b.h", "int b;\n");
    let a = fx.write("p/a.cpp", "#include \"b.h\"\nint a = b;\n");
    fx.index("p", vec![fx.part("p", "p", &[&a])]);
    assert!(fx.manager.snapshot().contains(&b));

    let events = fx.manager.subscribe();
    fx.manager.remove_project(&fx.project("p"));
    let removed = fx.manager.gc();

    assert_eq!(removed, {
        let mut expected = vec![a.clone(), b.clone()];
        expected.sort();
        expected
    });
    let snapshot = fx.manager.snapshot();
    assert!(!snapshot.contains(&a));
    assert!(!snapshot.contains(&b));

    let received: Vec<ModelEvent> = events.try_iter().collect();
    let announce = received
        .iter()
        .position(|e| matches!(e, ModelEvent::AboutToRemoveFiles(files) if files.contains(&a)))
        .expect("removal announced");
    let finished = received
        .iter()
        .position(|e| matches!(e, ModelEvent::GcFinished))
        .expect("gc finished");
    assert!(announce < finished);
    assert!(received.iter().any(|e| matches!(e, ModelEvent::ProjectPartsRemoved(ids) if ids.len() == 1)));
}

#[test]
fn test_open_editor_keeps_its_file() {
    let fx = ProjectFixture::new();
    let b = fx.write("p/b.h", "int b;\n");
    let a = fx.write("p/a.cpp", "#include \"b.h\"\n");
    fx.index("p", vec![fx.part("p", "p", &[&a])]);
    fx.manager.editor_opened(TextBuffer::new(b.clone(), "int b;\n")).wait();

    fx.manager.remove_project(&fx.project("p"));
    fx.manager.gc();

    let snapshot = fx.manager.snapshot();
    assert!(snapshot.contains(&b));
    assert!(!snapshot.contains(&a));
}

#[test]
fn test_files_shared_with_another_project_survive() {
    let fx = ProjectFixture::new();
    let shared = fx.write("common/shared.h", "int shared;\n");
    let one = fx.write("one/main.cpp", "#include \"../common/shared.h\"\n");
    let two = fx.write("two/main.cpp", "#include \"../common/shared.h\"\n");
    fx.index("one", vec![fx.part("one", "one", &[&one])]);
    fx.index("two", vec![fx.part("two", "two", &[&two])]);

    fx.manager.remove_project(&fx.project("one"));
    let removed = fx.manager.gc();

    assert_eq!(removed, vec![one]);
    assert!(fx.manager.snapshot().contains(&shared));
    assert!(fx.manager.snapshot().contains(&two));
}

#[test]
fn test_gc_waits_for_canceled_batch() {
    let fx = ProjectFixture::new();
    let files: Vec<_> = (0..20)
        .map(|i| fx.write(&format!("big/f{i}.cpp"), &format!("int value{i};\n")))
        .collect();
    let refs: Vec<_> = files.iter().collect();
    let handle = fx
        .manager
        .update_project_info(codemodel::project::ProjectInfo::new(
            fx.project("big"),
            vec![fx.part("big", "big", &refs)],
        ));

    fx.manager.remove_project(&fx.project("big"));
    fx.manager.gc();

    assert!(handle.state().is_terminal());
    let snapshot = fx.manager.snapshot();
    assert!(files.iter().all(|f| !snapshot.contains(f)));
}
