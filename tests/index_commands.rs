use assert_fs::fixture::{FileWriteStr, PathChild};
use fake::Fake;
use fake::faker::lorem::en::Words;
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;

mod common;

#[test]
fn init_creates_the_repository_layout() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;

    common::run_dirc(dir.path(), &["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized empty repository in"));

    assert!(dir.child(".git/objects").path().is_dir());
    assert!(dir.child(".git/config").path().is_file());

    Ok(())
}

#[test]
fn add_single_file_records_size_and_blob_id() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    dir.child("a.txt").write_str("hi\n")?;

    common::run_dirc(dir.path(), &["add", "a.txt"])
        .assert()
        .success();

    common::run_dirc(dir.path(), &["ls-files", "--stage"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "100644 45b983be36b73c0788dc9cbcb76cbb80fc7bb057 0\ta.txt\n",
        ));

    // header (12) + one padded entry (72) + trailing digest (20)
    let index_bytes = std::fs::read(dir.child(".git/index").path())?;
    assert_eq!(index_bytes.len(), 104);
    assert_eq!(&index_bytes[0..4], b"DIRC");

    Ok(())
}

#[test]
fn ls_files_lists_paths_in_byte_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    // staged in a deliberately shuffled order
    for name in ["zebra.txt", "a/nested.txt", "a.txt", "mid.txt"] {
        let content = Words(3..6).fake::<Vec<String>>().join(" ");
        common::write_file(&dir.path().join(name), &content);
        common::run_dirc(dir.path(), &["add", name]).assert().success();
    }

    common::run_dirc(dir.path(), &["ls-files"])
        .assert()
        .success()
        .stdout(predicate::str::diff("a.txt\na/nested.txt\nmid.txt\nzebra.txt\n"));

    Ok(())
}

#[test]
fn re_adding_an_unchanged_file_rewrites_an_identical_index()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    dir.child("stable.txt").write_str("unchanged content\n")?;
    common::run_dirc(dir.path(), &["add", "stable.txt"])
        .assert()
        .success();
    let first = std::fs::read(dir.child(".git/index").path())?;

    common::run_dirc(dir.path(), &["add", "stable.txt"])
        .assert()
        .success();
    let second = std::fs::read(dir.child(".git/index").path())?;

    assert_eq!(first, second);

    Ok(())
}

#[test]
fn rm_unstages_without_touching_the_working_tree() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    dir.child("keep.txt").write_str("kept\n")?;
    dir.child("drop.txt").write_str("dropped\n")?;
    common::run_dirc(dir.path(), &["add", "keep.txt", "drop.txt"])
        .assert()
        .success();

    common::run_dirc(dir.path(), &["rm", "drop.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rm 'drop.txt'"));

    common::run_dirc(dir.path(), &["ls-files"])
        .assert()
        .success()
        .stdout(predicate::str::diff("keep.txt\n"));

    assert!(dir.child("drop.txt").path().exists());

    Ok(())
}

#[test]
fn adding_a_missing_pathspec_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    common::run_dirc(dir.path(), &["add", "missing.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not match any files"));

    Ok(())
}
