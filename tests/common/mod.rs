//! Shared helpers for CLI integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Port 9 (discard) on loopback; nothing should ever be sent there.
const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:9";

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// An isolated workspace with a config that points every backend at an
/// unreachable loopback address.
pub struct Sandbox {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = dir.path().join("config.json");
        let contents = serde_json::json!({
            "completion_endpoint": UNREACHABLE_ENDPOINT,
            "completion_timeout_secs": 2,
            "news_endpoint": UNREACHABLE_ENDPOINT,
            "news_timeout_secs": 1,
        });
        std::fs::write(&config, contents.to_string()).expect("write config");
        Self { dir, config }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// `stpm` with credentials and user config scrubbed from the environment.
    pub fn stpm(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_stpm"));
        cmd.env_remove("SHADOW_TPM_API_KEY")
            .env_remove("SHADOW_TPM_NEWS_API_KEY")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.dir.path())
            .env("HOME", self.dir.path())
            .stdin(Stdio::null());
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.stpm().args(args).output().expect("run stpm")
    }
}

pub fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}
