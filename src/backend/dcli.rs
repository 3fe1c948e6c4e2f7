//! `dclisync` command-line backend
//!
//! Invocations:
//!
//! ```text
//! dclisync --data-dir <dir> --api-key <key> --list
//! dclisync --data-dir <dir> --api-key <key> --add <name#tag>
//! dclisync --help
//! ```
//!
//! The API key travels on the child's command line, so every rendering of
//! an invocation and every captured output passes through [`ApiKey::scrub`]
//! before it reaches a log line or an error message.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{BackendError, RosterBackend};
use crate::config::DcliConfig;
use crate::identifier::{parse_all, Identifier};
use crate::secret::{ApiKey, REDACTED};

/// Runs the dclisync binary as a child process
#[derive(Debug, Clone)]
pub struct DcliBackend {
    binary: String,
    data_dir: PathBuf,
    api_key: Option<ApiKey>,
    list_timeout: Duration,
    add_timeout: Duration,
}

/// Arguments for one invocation plus its log-safe rendering
struct Invocation {
    args: Vec<OsString>,
    display: String,
}

impl DcliBackend {
    pub fn from_config(config: &DcliConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            data_dir: config.data_dir.clone(),
            api_key: config.api_key.clone(),
            list_timeout: config.list_timeout(),
            add_timeout: config.add_timeout(),
        }
    }

    /// Build `--data-dir <dir> --api-key <key> <mode...>`
    fn invocation(&self, key: &ApiKey, mode: &[&str]) -> Invocation {
        let mut args: Vec<OsString> = vec![
            "--data-dir".into(),
            self.data_dir.clone().into_os_string(),
            "--api-key".into(),
            key.expose().into(),
        ];
        args.extend(mode.iter().map(|arg| OsString::from(*arg)));

        let display = format!(
            "{} --data-dir {} --api-key {} {}",
            self.binary,
            self.data_dir.display(),
            REDACTED,
            mode.join(" ")
        );

        Invocation { args, display }
    }

    fn api_key(&self) -> Result<&ApiKey, BackendError> {
        self.api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or(BackendError::MissingApiKey)
    }

    /// Scrub captured output; a no-op when no key is configured
    fn scrub(&self, text: &str) -> String {
        match &self.api_key {
            Some(key) => key.scrub(text),
            None => text.to_string(),
        }
    }

    /// Spawn the binary, wait up to `timeout`, return scrubbed stdout.
    ///
    /// The child is killed if the timeout elapses.
    async fn run(&self, invocation: Invocation, timeout: Duration) -> Result<String, BackendError> {
        let Invocation { args, display: command } = invocation;
        tracing::debug!(command = %command, ?timeout, "running dclisync");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackendError::Spawn {
                command: command.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(BackendError::Spawn { command, source }),
            Err(_) => return Err(BackendError::Timeout { command, timeout }),
        };

        let stdout = self.scrub(&String::from_utf8_lossy(&output.stdout));
        if !output.status.success() {
            let stderr = self.scrub(&String::from_utf8_lossy(&output.stderr));
            return Err(BackendError::Failed {
                command,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }

    /// Check that the binary can be started at all (`--help`)
    pub async fn probe(&self, timeout: Duration) -> Result<(), BackendError> {
        let invocation = Invocation {
            args: vec!["--help".into()],
            display: format!("{} --help", self.binary),
        };
        self.run(invocation, timeout).await.map(|_| ())
    }
}

/// Keep lines that look like `name#tag`, normalized.
///
/// The list output format is not otherwise specified, so anything without a
/// `#` (headers, progress lines) is ignored.
pub fn parse_list_output(output: &str) -> Vec<Identifier> {
    parse_all(output.lines())
}

#[async_trait]
impl RosterBackend for DcliBackend {
    fn name(&self) -> &str {
        &self.binary
    }

    async fn list(&self) -> Result<Vec<Identifier>, BackendError> {
        let key = self.api_key()?;
        let invocation = self.invocation(key, &["--list"]);
        tracing::info!(command = %invocation.display, "checking existing users");

        let output = self.run(invocation, self.list_timeout).await?;
        let existing = parse_list_output(&output);
        tracing::info!(count = existing.len(), "found existing users via list command");
        Ok(existing)
    }

    async fn add(&self, identifier: &Identifier) -> Result<(), BackendError> {
        let key = self.api_key()?;
        let invocation = self.invocation(key, &["--add", identifier.as_str()]);
        tracing::info!(user = %identifier, command = %invocation.display, "adding user");

        let output = self.run(invocation, self.add_timeout).await?;
        tracing::debug!(user = %identifier, output = %output.trim(), "dclisync output");
        Ok(())
    }
}
