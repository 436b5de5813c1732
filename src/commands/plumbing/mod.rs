pub mod ls_files;
pub mod read_tree;
pub mod write_tree;
