//! Command execution seam
//!
//! [`ProcessRunner`] spawns real processes; [`RecordingRunner`] records the
//! commands it is asked to run and answers with scripted exit codes.

use crate::step::CommandSpec;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands to completion
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `spec`; `Err` only when the process could not be started
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, std::io::Error>;
}

/// Spawns commands with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait::async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, std::io::Error> {
        let output = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    commands: Vec<CommandSpec>,

    /// (substring of the rendered command, exit code)
    exit_codes: Vec<(String, i32)>,

    /// Commands containing these fail to spawn
    unspawnable: Vec<String>,
}

/// In-memory runner for tests
///
/// Every command succeeds with exit code 0 unless scripted otherwise.
/// Clones share the recorded commands.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `code` for commands whose rendered form contains `pattern`
    pub async fn exit_with(&self, pattern: impl Into<String>, code: i32) {
        self.state.lock().await.exit_codes.push((pattern.into(), code));
    }

    /// Fail to spawn commands whose rendered form contains `pattern`
    pub async fn fail_to_spawn(&self, pattern: impl Into<String>) {
        self.state.lock().await.unspawnable.push(pattern.into());
    }

    /// Commands run so far
    pub async fn commands(&self) -> Vec<CommandSpec> {
        self.state.lock().await.commands.clone()
    }

    /// Rendered command lines run so far
    pub async fn command_lines(&self) -> Vec<String> {
        self.state.lock().await.commands.iter().map(|c| c.to_string()).collect()
    }
}

#[async_trait::async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, std::io::Error> {
        let mut state = self.state.lock().await;
        let line = spec.to_string();
        state.commands.push(spec.clone());

        if state.unspawnable.iter().any(|p| line.contains(p.as_str())) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: command not found", spec.program),
            ));
        }

        let code = state
            .exit_codes
            .iter()
            .find(|(p, _)| line.contains(p.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);

        Ok(CommandOutput {
            code: Some(code),
            stdout: format!("ran {}", line),
            stderr: if code == 0 { String::new() } else { format!("exit status {}", code) },
        })
    }
}
