use assert_fs::fixture::{FileWriteStr, PathChild};
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;

mod common;

#[test]
fn write_tree_prints_the_canonical_root_id() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    dir.child("a").write_str("a\n")?;
    common::write_file(&dir.path().join("b/c"), "c\n");
    common::write_file(&dir.path().join("b/d"), "d\n");
    dir.child("e").write_str("e\n")?;

    common::run_dirc(dir.path(), &["add", "a", "b/c", "b/d", "e"])
        .assert()
        .success();

    // root id precomputed with stock git for this exact layout
    common::run_dirc(dir.path(), &["write-tree"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "5f222d9f147a235a67339f13684e2d5c9cf88d30\n",
        ));

    Ok(())
}

#[test]
fn read_tree_then_write_tree_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    common::run_dirc(dir.path(), &["init"]).assert().success();

    dir.child("a").write_str("a\n")?;
    common::write_file(&dir.path().join("b/c"), "c\n");
    common::run_dirc(dir.path(), &["add", "a", "b/c"])
        .assert()
        .success();

    let first = common::run_dirc(dir.path(), &["write-tree"]).output()?;
    let root_id = String::from_utf8(first.stdout)?.trim().to_string();

    common::run_dirc(dir.path(), &["read-tree", &root_id])
        .assert()
        .success();

    common::run_dirc(dir.path(), &["write-tree"])
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{root_id}\n")));

    Ok(())
}

#[cfg(unix)]
#[test]
fn flipping_the_executable_bit_changes_the_tree() -> Result<(), Box<dyn std::error::Error>> {
    use dirc::areas::repository::Repository;
    use dirc::artifacts::index::entry_mode::EntryMode;
    use std::path::Path;

    let dir = assert_fs::TempDir::new()?;
    dir.child("a.txt").write_str("hi\n")?;

    let repository = Repository::new(dir.path().to_path_buf(), Box::new(std::io::sink()))?;
    repository.init()?;
    repository.add(&["a.txt".to_string()])?;

    let plain_root = repository.index().write_tree(repository.database())?;
    assert_eq!(
        plain_root.as_ref(),
        "0d8a474fc67971fb3dd7616e26323d3066442555"
    );

    common::make_executable(&dir.path().join("a.txt"));

    // the refresh must notice the mode flip even though the content is
    // untouched
    {
        let index = repository.index();
        let changed = index
            .members()
            .next()
            .unwrap()
            .clone()
            .update(
                &dir.path().join("a.txt"),
                repository.trust_executable(),
                repository.database(),
            )?;
        assert!(changed);
    }

    repository.add(&["a.txt".to_string()])?;

    {
        let index = repository.index();
        let entry = index.get_entry(Path::new("a.txt")).unwrap();
        assert_eq!(entry.mode(), EntryMode::Executable);
    }

    let executable_root = repository.index().write_tree(repository.database())?;
    assert_eq!(
        executable_root.as_ref(),
        "9ce475f90aa43581260e697d21f3715a3f9c8760"
    );

    Ok(())
}

#[test]
fn read_tree_entries_carry_no_stat_cache() -> Result<(), Box<dyn std::error::Error>> {
    use dirc::areas::repository::Repository;
    use std::path::Path;

    let dir = assert_fs::TempDir::new()?;
    dir.child("tracked.txt").write_str("content\n")?;

    let repository = Repository::new(dir.path().to_path_buf(), Box::new(std::io::sink()))?;
    repository.init()?;
    repository.add(&["tracked.txt".to_string()])?;

    let root_id = repository.index().write_tree(repository.database())?;
    repository.read_tree(root_id.as_ref())?;

    let index = repository.index();
    let entry = index.get_entry(Path::new("tracked.txt")).unwrap();
    assert_eq!(entry.mtime_ns(), -1);
    assert_eq!(entry.ctime_ns(), -1);
    assert_eq!(entry.size(), 8);
    assert_eq!(entry.stage(), 0);

    Ok(())
}
