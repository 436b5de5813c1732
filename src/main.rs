use clap::{Parser, Subcommand};
use colored::Colorize;
use dirc::areas::repository::Repository;

#[derive(Parser)]
#[command(
    name = "dirc",
    version = "0.1.0",
    about = "A git-compatible staging index",
    long_about = "A small implementation of git's staging area: files are staged \
    into a binary index file (version 2) that is byte-compatible with git's, and \
    can be exchanged with the object database as tree objects."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "Initializes a new repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
    },
    #[command(
        name = "add",
        about = "Add files or directories to the index",
        long_about = "Stages the specified files or directories: their content is hashed \
        into the object database and the index entries are created or refreshed."
    )]
    Add {
        #[arg(index = 1, required = true, help = "The files or directories to stage")]
        paths: Vec<String>,
    },
    #[command(
        name = "rm",
        about = "Remove files from the index",
        long_about = "Removes the specified files from the index. The working-tree files \
        are not touched."
    )]
    Rm {
        #[arg(index = 1, required = true, help = "The files to remove from the index")]
        paths: Vec<String>,
    },
    #[command(
        name = "ls-files",
        about = "List the files tracked by the index",
        long_about = "Prints the tracked paths in index order; with --stage, each line \
        carries the mode, blob id and merge stage."
    )]
    LsFiles {
        #[arg(short, long, help = "Show mode, blob id and stage for each entry")]
        stage: bool,
    },
    #[command(
        name = "read-tree",
        about = "Load a tree object into the index",
        long_about = "Replaces the index contents with the flattened entries of the given \
        tree object."
    )]
    ReadTree {
        #[arg(index = 1, help = "The tree object id to read")]
        oid: String,
    },
    #[command(
        name = "write-tree",
        about = "Write the index contents as tree objects",
        long_about = "Builds nested tree objects from the staged entries, stores them in \
        the object database and prints the root tree id."
    )]
    WriteTree,
    #[command(
        name = "checkout",
        about = "Write the staged files back into the working tree",
        long_about = "Materializes every staged entry into the working directory, \
        overwriting existing files and recreating missing directories."
    )]
    Checkout,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err:#}", "fatal:".red());
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let repository = |path: Option<&String>| -> anyhow::Result<Repository> {
        let path = match path {
            Some(path) => std::path::PathBuf::from(path),
            None => std::env::current_dir()?,
        };
        Repository::new(path, Box::new(std::io::stdout()))
    };

    match &cli.command {
        Commands::Init { path } => repository(path.as_ref())?.init(),
        Commands::Add { paths } => repository(None)?.add(paths),
        Commands::Rm { paths } => repository(None)?.rm(paths),
        Commands::LsFiles { stage } => repository(None)?.ls_files(*stage),
        Commands::ReadTree { oid } => repository(None)?.read_tree(oid),
        Commands::WriteTree => repository(None)?.write_tree(),
        Commands::Checkout => repository(None)?.checkout(),
    }
}
