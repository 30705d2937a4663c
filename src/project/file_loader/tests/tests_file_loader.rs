#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_collect_file_paths_filters_extensions() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("main.cpp"), "int main() {}").unwrap();
    fs::write(dir.path().join("sub/a.h"), "void f();").unwrap();
    fs::write(dir.path().join("README.md"), "docs").unwrap();

    let paths = collect_file_paths(dir.path()).unwrap();
    let names: Vec<_> = paths.iter().map(|p| p.file_name().to_string()).collect();
    assert_eq!(names, vec!["main.cpp", "a.h"]);
}

#[test]
fn test_collect_file_paths_missing_dir() {
    let result = collect_file_paths(Path::new("/nonexistent/codemodel/dir"));
    assert!(result.unwrap_err().is_not_found());
}

#[test]
fn test_read_file_respects_limit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.cpp");
    fs::write(&path, vec![b'x'; 2 * 1024 * 1024 + 1]).unwrap();
    let path = FilePath::from_path(&path);

    assert!(matches!(
        read_file(&path, Some(2)),
        Err(Error::FileTooLarge { limit_mb: 2, .. })
    ));
    assert!(read_file(&path, Some(3)).is_ok());
    assert!(read_file(&path, None).is_ok());
}

#[test]
fn test_read_file_missing() {
    let err = read_file(&FilePath::new("/nonexistent/x.cpp"), None).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_read_file_lossy_utf8() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("latin1.cpp");
    fs::write(&path, b"int caf\xe9;").unwrap();
    let text = read_file(&FilePath::from_path(&path), None).unwrap();
    assert!(text.starts_with("int caf"));
}

#[test]
fn test_filter_by_size() {
    let dir = TempDir::new().unwrap();
    let small = dir.path().join("small.cpp");
    let big = dir.path().join("big.cpp");
    fs::write(&small, "int x;").unwrap();
    fs::write(&big, vec![b' '; 1024 * 1024 + 10]).unwrap();
    let kept = filter_by_size(
        [FilePath::from_path(&small), FilePath::from_path(&big)],
        Some(1),
    );
    assert_eq!(kept, vec![FilePath::from_path(&small)]);
}

#[test]
fn test_modified_time_injected() {
    assert!(modified_time(&FilePath::new("<configuration>")).is_none());
}
