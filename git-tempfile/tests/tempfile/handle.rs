use std::io::Write;

use git_tempfile::ContainingDirectory;

#[test]
fn persisted_file_contains_written_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("state-file");

    let mut handle = git_tempfile::new(&target, ContainingDirectory::Exists).unwrap();
    handle.write_all(b"hello").unwrap();
    handle.persist(&target).unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"hello");
}

#[test]
fn dropped_without_persist_leaves_no_tempfile() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("state-file");

    {
        let mut handle = git_tempfile::new(&target, ContainingDirectory::Exists).unwrap();
        handle.write_all(b"hello").unwrap();
    }

    let left_over: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(left_over.is_empty(), "temp file should be cleaned up on drop");
}
