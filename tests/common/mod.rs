#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;

/// Build a `dirc` invocation rooted at `dir`.
pub fn run_dirc(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("dirc").expect("dirc binary builds");
    cmd.current_dir(dir);
    cmd.args(args);
    cmd
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[cfg(unix)]
pub fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path).unwrap().permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions).unwrap();
}
