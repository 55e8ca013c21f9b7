//! Synthetic e-commerce datasets with known defects
//!
//! Produces `customers.csv`, `orders.csv` and `events.csv` with nulls,
//! exact duplicates, out-of-vocabulary categories and negative amounts
//! injected at configured rates. Output is a pure function of the
//! [`GeneratorConfig`](shopqa_core::GeneratorConfig): same seed and
//! parameters, same bytes.

pub mod generator;
pub mod profile;
pub mod records;
pub mod vocab;

pub use generator::{FileSummary, GenerateError, GenerationSummary, Generator};
pub use profile::{profile_dir, DatasetProfile, TableProfile};
pub use records::{Customer, Event, Order};

/// File names written by the generator, in load order
pub const CUSTOMERS_FILE: &str = "customers.csv";
pub const ORDERS_FILE: &str = "orders.csv";
pub const EVENTS_FILE: &str = "events.csv";
