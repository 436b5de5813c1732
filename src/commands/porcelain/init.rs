use crate::areas::repository::Repository;
use crate::areas::workspace;
use std::io::Write;

impl Repository {
    /// Create the repository directory layout: `.git`, the object database
    /// and a minimal configuration.
    pub fn init(&self) -> anyhow::Result<()> {
        let git_path = self.git_path();
        std::fs::create_dir_all(git_path.join("objects"))?;

        let config_path = git_path.join("config");
        if !config_path.exists() {
            let filemode = workspace::supports_executable();
            std::fs::write(
                &config_path,
                format!("[core]\n\tfilemode = {filemode}\n"),
            )?;
        }

        writeln!(
            self.writer(),
            "Initialized empty repository in {}",
            git_path.display()
        )?;

        Ok(())
    }
}
