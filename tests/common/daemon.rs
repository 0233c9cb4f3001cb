//! Test daemon management.
//!
//! Runs the built `vpnsentry` binary against a config written into a
//! temporary directory.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use tempfile::TempDir;

/// Scratch directory holding the config, the databases and list files.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a list or config file and return its path.
    pub fn write(&self, name: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.path(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Offline config pointing at `console`. `storage` is added to the
    /// `[storage]` table, `extra` is appended verbatim.
    pub fn offline_config(
        &self,
        console: &str,
        storage: &str,
        extra: &str,
    ) -> anyhow::Result<PathBuf> {
        let config = format!(
            r#"
[checker]
offline = true

[storage]
range_db = "{ranges}"
whitelist_db = "{whitelist}"
{storage}

[reconnect]
delay_secs = 1
timeout_secs = 5

[[servers]]
address = "{console}"
password = "secret"

{extra}
"#,
            ranges = self.path("ranges.redb").display(),
            whitelist = self.path("whitelist.redb").display(),
        );
        self.write("vpnsentry.toml", &config)
    }
}

fn binary() -> &'static str {
    env!("CARGO_BIN_EXE_vpnsentry")
}

/// Run a one-shot subcommand to completion.
pub fn run_command(config: &Path, args: &[&str]) -> anyhow::Result<Output> {
    let output = Command::new(binary())
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()?;
    Ok(output)
}

/// A running `vpnsentry run` process, killed on drop.
pub struct TestDaemon {
    child: Child,
}

impl TestDaemon {
    pub fn spawn(config: &Path) -> anyhow::Result<Self> {
        let child = Command::new(binary())
            .arg("--config")
            .arg(config)
            .arg("run")
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(Self { child })
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
