use crate::areas::repository::Repository;
use std::io::Write;

impl Repository {
    /// Write the staged state as nested tree objects and print the root id.
    pub fn write_tree(&self) -> anyhow::Result<()> {
        let mut index = self.index();
        index.reread_if_necessary()?;

        let root_id = index.write_tree(self.database())?;
        drop(index);

        writeln!(self.writer(), "{root_id}")?;

        Ok(())
    }
}
