use crate::areas::repository::Repository;

impl Repository {
    /// Write every staged file back into the working tree, then persist the
    /// refreshed stat caches.
    pub fn checkout(&self) -> anyhow::Result<()> {
        let mut index = self.index();
        index.reread_if_necessary()?;

        index.checkout(self.path(), self.database(), self.trust_executable())?;
        index.write()?;
        drop(index);
        self.on_index_changed();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::fixture::{FileWriteStr, PathChild};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn restores_deleted_files_and_their_stat_caches() {
        let dir = assert_fs::TempDir::new().unwrap();
        dir.child("sub/data.txt").write_str("payload\n").unwrap();

        let repository =
            Repository::new(dir.path().to_path_buf(), Box::new(std::io::sink())).unwrap();
        repository.init().unwrap();
        repository.add(&["sub".to_string()]).unwrap();

        std::fs::remove_dir_all(dir.child("sub").path()).unwrap();
        assert!(!dir.child("sub/data.txt").path().exists());

        repository.checkout().unwrap();

        let restored = std::fs::read_to_string(dir.child("sub/data.txt").path()).unwrap();
        assert_eq!(restored, "payload\n");

        // the just-written file must not read as modified
        let index = repository.index();
        let entry = index.get_entry(Path::new("sub/data.txt")).unwrap();
        assert!(
            !entry
                .is_modified(repository.path(), true, repository.trust_executable())
                .unwrap()
        );
    }
}
