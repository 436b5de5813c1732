use assert_fs::fixture::{FileWriteStr, PathChild};
use pretty_assertions::assert_eq;

mod common;

#[test]
fn checkout_restores_deleted_files_and_directories() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    dir.child("top.txt").write_str("top\n")?;
    common::write_file(&dir.path().join("nested/deep/file.txt"), "deep content\n");
    common::run_dirc(dir.path(), &["add", "top.txt", "nested/deep/file.txt"])
        .assert()
        .success();

    std::fs::remove_file(dir.child("top.txt").path())?;
    std::fs::remove_dir_all(dir.child("nested").path())?;

    common::run_dirc(dir.path(), &["checkout"]).assert().success();

    assert_eq!(
        std::fs::read_to_string(dir.child("top.txt").path())?,
        "top\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.child("nested/deep/file.txt").path())?,
        "deep content\n"
    );

    Ok(())
}

#[test]
fn checkout_overwrites_local_modifications() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    dir.child("file.txt").write_str("staged\n")?;
    common::run_dirc(dir.path(), &["add", "file.txt"])
        .assert()
        .success();

    dir.child("file.txt").write_str("scribbled over\n")?;

    common::run_dirc(dir.path(), &["checkout"]).assert().success();

    assert_eq!(
        std::fs::read_to_string(dir.child("file.txt").path())?,
        "staged\n"
    );

    Ok(())
}

#[cfg(unix)]
#[test]
fn checkout_restores_the_executable_bit() -> Result<(), Box<dyn std::error::Error>> {
    use is_executable::IsExecutable;

    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    dir.child("tool.sh").write_str("#!/bin/sh\n")?;
    common::make_executable(&dir.path().join("tool.sh"));
    common::run_dirc(dir.path(), &["add", "tool.sh"])
        .assert()
        .success();

    std::fs::remove_file(dir.child("tool.sh").path())?;

    common::run_dirc(dir.path(), &["checkout"]).assert().success();

    assert!(dir.path().join("tool.sh").is_executable());

    Ok(())
}

#[test]
fn a_checked_out_file_is_not_reported_modified() -> Result<(), Box<dyn std::error::Error>> {
    use dirc::areas::repository::Repository;
    use std::path::Path;

    let dir = assert_fs::TempDir::new()?;
    dir.child("file.txt").write_str("stable\n")?;

    let repository = Repository::new(dir.path().to_path_buf(), Box::new(std::io::sink()))?;
    repository.init()?;
    repository.add(&["file.txt".to_string()])?;

    std::fs::remove_file(dir.child("file.txt").path())?;
    repository.checkout()?;

    let index = repository.index();
    let entry = index.get_entry(Path::new("file.txt")).unwrap();
    assert!(
        !entry
            .is_modified(repository.path(), true, repository.trust_executable())
            .unwrap()
    );

    // scribbling over the file flips the verdict
    drop(index);
    dir.child("file.txt").write_str("different\n")?;
    let index = repository.index();
    let entry = index.get_entry(Path::new("file.txt")).unwrap();
    assert!(
        entry
            .is_modified(repository.path(), true, repository.trust_executable())
            .unwrap()
    );

    Ok(())
}
