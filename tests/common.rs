#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use tempfile::TempDir;

/// Temporary database file, removed with the directory on drop.
pub struct TestDb {
    _dir: TempDir,
    pub path: String,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasktime.db").to_string_lossy().to_string();
        Self { _dir: dir, path }
    }

    /// `tasktime --database <path> <args...>`
    pub fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = cargo_bin_cmd!("tasktime");
        cmd.env_remove("TASKTIME_DATABASE_URL")
            .env_remove("RUST_LOG")
            .args(["--database", &self.path])
            .args(args);
        cmd
    }
}
