use crate::areas::repository::Repository;
use std::io::Write;

impl Repository {
    /// Print the tracked paths in index order; with `stage_format`, prefix
    /// each with its mode, blob id and merge stage.
    pub fn ls_files(&self, stage_format: bool) -> anyhow::Result<()> {
        let mut index = self.index();
        index.reread_if_necessary()?;

        let mut writer = self.writer();
        for entry in index.members() {
            if stage_format {
                writeln!(
                    writer,
                    "{} {} {}\t{}",
                    entry.mode().as_str(),
                    entry.oid(),
                    entry.stage(),
                    entry.name()
                )?;
            } else {
                writeln!(writer, "{}", entry.name())?;
            }
        }

        Ok(())
    }
}
