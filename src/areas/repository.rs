//! Repository abstraction and coordination.
//!
//! The `Repository` wires the lower-level pieces together (object database,
//! staging index, workspace, configuration) and carries the output writer
//! used by the command implementations in [`crate::commands`].
//!
//! Index change notifications are a generation counter: every committed index
//! mutation (and every reload picked up from disk) bumps it, so cached views
//! derived from the index can cheaply notice staleness.

use crate::areas::config::Config;
use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::workspace::{self, Workspace};
use std::cell::{Cell, RefCell, RefMut};
use std::path::{Path, PathBuf};

/// Repository directory name
const GIT_DIR: &str = ".git";

/// Object database directory name
const DATABASE_DIR: &str = "objects";

/// Index file name
const INDEX_FILE: &str = "index";

/// Configuration file name
const CONFIG_FILE: &str = "config";

/// A repository: working tree plus repository directory.
pub struct Repository {
    /// Working-tree root
    path: Box<Path>,
    /// Output writer (stdout in the CLI, a buffer in tests)
    writer: RefCell<Box<dyn std::io::Write>>,
    /// Staging index
    index: RefCell<Index>,
    /// Object database
    database: Database,
    /// Working tree
    workspace: Workspace,
    /// Parsed repository configuration
    config: Config,
    /// Bumped whenever the index visibly changes
    index_generation: Cell<u64>,
}

impl Repository {
    pub fn new(path: PathBuf, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }
        let path = path.canonicalize()?;

        let git_path = path.join(GIT_DIR);
        let index = Index::new(git_path.join(INDEX_FILE).into_boxed_path());
        let database = Database::new(git_path.join(DATABASE_DIR).into_boxed_path());
        let workspace = Workspace::new(path.clone().into_boxed_path());
        let config = Config::load(&git_path.join(CONFIG_FILE))?;

        Ok(Repository {
            path: path.into_boxed_path(),
            writer: RefCell::new(writer),
            index: RefCell::new(index),
            database,
            workspace,
            config,
            index_generation: Cell::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_path(&self) -> PathBuf {
        self.path.join(GIT_DIR)
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn index(&'_ self) -> RefMut<'_, Index> {
        self.index.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Are executable bits tracked? Requires platform support and
    /// `core.filemode` (default true).
    pub fn trust_executable(&self) -> bool {
        workspace::supports_executable() && self.config.get_boolean("core", "filemode", true)
    }

    /// Record that the index visibly changed.
    pub fn on_index_changed(&self) {
        self.index_generation.set(self.index_generation.get() + 1);
    }

    pub fn index_generation(&self) -> u64 {
        self.index_generation.get()
    }

    /// Pick up index changes written by another process, if any.
    pub fn reread_index_if_necessary(&self) -> anyhow::Result<bool> {
        let reread = self.index.borrow_mut().reread_if_necessary()?;
        if reread {
            self.on_index_changed();
        }

        Ok(reread)
    }
}
