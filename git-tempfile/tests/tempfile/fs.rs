use git_tempfile::ContainingDirectory;

#[test]
fn creates_missing_containing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("deep").join("state-file");

    let handle = git_tempfile::new(&target, ContainingDirectory::CreateAllRaceproof).unwrap();
    assert!(target.parent().unwrap().is_dir());
    drop(handle);
}

#[test]
fn fails_when_directory_missing_and_not_requested() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("state-file");

    assert!(git_tempfile::new(&target, ContainingDirectory::Exists).is_err());
}
