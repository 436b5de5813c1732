use crate::areas::repository::Repository;

impl Repository {
    /// Stage the given files or directories and persist the index.
    pub fn add(&self, paths: &[String]) -> anyhow::Result<()> {
        let mut index = self.index();
        index.reread_if_necessary()?;

        let trust_executable = self.trust_executable();

        for path in paths {
            let absolute = self.path().join(path);
            if !absolute.exists() {
                anyhow::bail!("pathspec '{path}' did not match any files");
            }

            for relative in self.workspace().list_files(Some(absolute))? {
                index.add(
                    self.path(),
                    &relative,
                    None,
                    self.database(),
                    trust_executable,
                )?;
            }
        }

        index.write()?;
        drop(index);
        self.on_index_changed();

        Ok(())
    }
}
