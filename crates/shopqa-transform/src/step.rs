//! The fixed dbt step sequence

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One dbt invocation of the transformation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbtStep {
    Deps,
    RunStaging,
    TestStaging,
    RunMart,
    TestMart,
}

impl DbtStep {
    /// Steps in execution order
    pub const ALL: [DbtStep; 5] = [
        DbtStep::Deps,
        DbtStep::RunStaging,
        DbtStep::TestStaging,
        DbtStep::RunMart,
        DbtStep::TestMart,
    ];

    /// Task identifier in the pipeline graph
    pub fn task_id(&self) -> &'static str {
        match self {
            Self::Deps => "dbt_deps",
            Self::RunStaging => "dbt_run_staging",
            Self::TestStaging => "dbt_test_staging",
            Self::RunMart => "dbt_run_mart",
            Self::TestMart => "dbt_test_mart",
        }
    }

    pub fn from_task_id(task_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.task_id() == task_id)
    }

    /// dbt arguments, without the executable
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            Self::Deps => &["deps"],
            Self::RunStaging => &["run", "--models", "staging.*"],
            Self::TestStaging => &["test", "--models", "staging.*"],
            Self::RunMart => &["run", "--models", "mart.*"],
            Self::TestMart => &["test", "--models", "mart.*"],
        }
    }
}

impl fmt::Display for DbtStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.task_id())
    }
}

/// A fully resolved external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,

    /// Working directory
    pub cwd: PathBuf,

    /// Variables added to the inherited environment
    pub env: BTreeMap<String, String>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_run_staging_before_mart() {
        let ids: Vec<_> = DbtStep::ALL.iter().map(|s| s.task_id()).collect();
        assert_eq!(
            ids,
            ["dbt_deps", "dbt_run_staging", "dbt_test_staging", "dbt_run_mart", "dbt_test_mart"]
        );
    }

    #[test]
    fn task_ids_round_trip() {
        for step in DbtStep::ALL {
            assert_eq!(DbtStep::from_task_id(step.task_id()), Some(step));
        }
        assert_eq!(DbtStep::from_task_id("validate_quality"), None);
    }

    #[test]
    fn command_display() {
        let spec = CommandSpec {
            program: "dbt".to_string(),
            args: DbtStep::TestMart.args().iter().map(|a| a.to_string()).collect(),
            cwd: PathBuf::from("dbt"),
            env: BTreeMap::new(),
        };
        assert_eq!(spec.to_string(), "dbt test --models mart.*");
    }
}
