#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Parses a JSON fixture under `tests/data`.
pub fn fixture_json(name: &str) -> Value {
    let contents = std::fs::read_to_string(fixture_path(name)).expect("read fixture");
    serde_json::from_str(&contents).expect("parse fixture JSON")
}

/// The crate's binary with logging quietened.
pub fn galv() -> Command {
    let mut cmd = Command::cargo_bin("galv-tvn").expect("binary exists");
    cmd.env("RUST_LOG", "error");
    cmd
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        self.write(name, &serde_json::to_string_pretty(value).expect("serialize"))
    }

    pub fn read_json(&self, name: &str) -> Value {
        let contents =
            std::fs::read_to_string(self.temp_dir.path().join(name)).expect("read output");
        serde_json::from_str(&contents).expect("parse output JSON")
    }
}
