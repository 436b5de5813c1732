use crate::areas::repository::Repository;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Unstage the given paths and persist the index. The working-tree files
    /// themselves are left alone.
    pub fn rm(&self, paths: &[String]) -> anyhow::Result<()> {
        let mut index = self.index();
        index.reread_if_necessary()?;

        for path in paths {
            let removed = index.remove(self.path(), Path::new(path))?;
            if !removed {
                anyhow::bail!("pathspec '{path}' did not match any tracked files");
            }

            writeln!(self.writer(), "rm '{path}'")?;
        }

        index.write()?;
        drop(index);
        self.on_index_changed();

        Ok(())
    }
}
