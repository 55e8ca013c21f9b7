//! dbt transformation stage
//!
//! The staging and mart models are built by dbt; this crate only decides
//! which dbt commands run, in which order, with which environment, and
//! stops at the first one that fails.
//!
//! ## Example
//!
//! ```rust,ignore
//! use shopqa_transform::{ProcessRunner, Transformer};
//!
//! let transformer = Transformer::from_config(&config, Arc::new(ProcessRunner));
//! let outcomes = transformer.run_all().await?;
//! ```

pub mod runner;
pub mod step;
pub mod transformer;

pub use runner::{CommandOutput, CommandRunner, ProcessRunner, RecordingRunner};
pub use step::{CommandSpec, DbtStep};
pub use transformer::{StepOutcome, TransformError, Transformer};
