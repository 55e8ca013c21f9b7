//! Fail-fast execution of the dbt step sequence

use crate::runner::CommandRunner;
use crate::step::{CommandSpec, DbtStep};
use shopqa_core::config::snowflake_env;
use shopqa_core::Config;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Transformation failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransformError {
    #[error("{step}: failed to start `{command}`: {message}")]
    Spawn {
        step: DbtStep,
        command: String,
        message: String,
    },

    #[error("{step}: `{command}` exited with {}{}", code.map_or("a signal".to_string(), |c| format!("status {}", c)), tail(stderr))]
    StepFailed {
        step: DbtStep,
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl TransformError {
    pub fn step(&self) -> DbtStep {
        match self {
            Self::Spawn { step, .. } | Self::StepFailed { step, .. } => *step,
        }
    }
}

/// Last non-empty stderr line, for error messages
fn tail(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| format!(": {}", l.trim()))
        .unwrap_or_default()
}

/// A successfully finished step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step: DbtStep,
    pub command: String,
    pub duration_ms: u64,
}

/// Builds and runs dbt commands
#[derive(Clone)]
pub struct Transformer {
    executable: String,
    project_dir: PathBuf,
    env: BTreeMap<String, String>,
    runner: Arc<dyn CommandRunner>,
}

impl Transformer {
    /// Resolve dbt paths against the project root and forward the current
    /// process's `SNOWFLAKE_*` variables
    pub fn from_config(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        let mut env: BTreeMap<String, String> = snowflake_env(std::env::vars()).into_iter().collect();
        env.insert(
            "DBT_PROFILES_DIR".to_string(),
            config.resolve(&config.dbt.profiles_dir).display().to_string(),
        );

        Self {
            executable: config.dbt.executable.clone(),
            project_dir: config.resolve(&config.dbt.project_dir),
            env,
            runner,
        }
    }

    /// Add or override one environment variable for every step
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The command a step runs
    pub fn command(&self, step: DbtStep) -> CommandSpec {
        CommandSpec {
            program: self.executable.clone(),
            args: step.args().iter().map(|a| a.to_string()).collect(),
            cwd: self.project_dir.clone(),
            env: self.env.clone(),
        }
    }

    /// Run a single step
    pub async fn run_step(&self, step: DbtStep) -> Result<StepOutcome, TransformError> {
        let spec = self.command(step);
        let command = spec.to_string();
        let started = Instant::now();
        tracing::info!(step = %step, %command, "running dbt step");

        let output = self.runner.run(&spec).await.map_err(|e| TransformError::Spawn {
            step,
            command: command.clone(),
            message: e.to_string(),
        })?;

        if !output.stdout.is_empty() {
            tracing::debug!(step = %step, stdout = %output.stdout.trim_end(), "dbt output");
        }

        if !output.success() {
            return Err(TransformError::StepFailed {
                step,
                command,
                code: output.code,
                stderr: output.stderr,
            });
        }

        Ok(StepOutcome {
            step,
            command,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Run every step in order, stopping at the first failure
    pub async fn run_all(&self) -> Result<Vec<StepOutcome>, TransformError> {
        let mut outcomes = Vec::with_capacity(DbtStep::ALL.len());
        for step in DbtStep::ALL {
            match self.run_step(step).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!(step = %step, error = %e, "dbt step failed; skipping remaining steps");
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    }
}
