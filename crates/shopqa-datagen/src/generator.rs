//! Seeded dataset generator
//!
//! One `StdRng` stream drives customers, then orders, then events, so the
//! output depends only on the configuration. Wall-clock time is never read:
//! every timestamp is an offset back from `reference_time`.

use crate::records::{Customer, Event, Order};
use crate::vocab;
use crate::{CUSTOMERS_FILE, EVENTS_FILE, ORDERS_FILE};
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use shopqa_core::GeneratorConfig;
use std::path::{Path, PathBuf};

/// Errors raised while generating or writing datasets
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Invalid generator configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// What was written for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub file: String,
    pub path: PathBuf,

    /// Rows written, duplicates included
    pub rows: usize,

    /// Rows appended as exact copies of base rows
    pub duplicates: usize,

    /// SHA-256 of the file bytes, hex encoded
    pub sha256: String,
}

/// Result of [`Generator::write_all`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub seed: u64,
    pub files: Vec<FileSummary>,
}

impl GenerationSummary {
    pub fn file(&self, name: &str) -> Option<&FileSummary> {
        self.files.iter().find(|f| f.file == name)
    }

    pub fn total_rows(&self) -> usize {
        self.files.iter().map(|f| f.rows).sum()
    }
}

/// Generates the three datasets from one configuration
pub struct Generator {
    config: GeneratorConfig,
    rng: StdRng,
    reference: NaiveDateTime,
}

impl Generator {
    /// Create a generator, rejecting rates outside `[0, 1]`
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        let rates = [
            ("null_rate", config.null_rate),
            ("duplicate_rate", config.duplicate_rate),
            ("invalid_rate", config.invalid_rate),
            ("negative_amount_rate", config.negative_amount_rate),
        ];
        for (name, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(GenerateError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            reference: config.reference_time.naive_utc(),
            config,
        })
    }

    /// Base customers followed by injected duplicates
    pub fn customers(&mut self) -> Vec<Customer> {
        let mut customers = Vec::with_capacity(self.config.customers);
        for i in 1..=self.config.customers {
            let first = pick(&mut self.rng, &vocab::FIRST_NAMES);
            let last = pick(&mut self.rng, &vocab::LAST_NAMES);
            let domain = pick(&mut self.rng, &vocab::EMAIL_DOMAINS);
            let (country, city) = *vocab::LOCATIONS
                .choose(&mut self.rng)
                .unwrap_or(&("US", "Portland"));

            let email = format!("{}.{}{}@{}", first, last, i, domain).to_lowercase();
            let age_days = self.rng.gen_range(18 * 365..=80 * 365);
            let date_of_birth = (self.reference - Duration::days(age_days)).date();

            customers.push(Customer {
                customer_id: format!("CUST{:06}", i),
                email: self.nullable(email),
                first_name: self.nullable(first.to_string()),
                last_name: self.nullable(last.to_string()),
                date_of_birth: self.nullable(date_of_birth),
                country: country.to_string(),
                city: city.to_string(),
                signup_date: self.within(Duration::days(3 * 365)),
                customer_segment: pick(&mut self.rng, &vocab::CUSTOMER_SEGMENTS).to_string(),
                loaded_at: self.reference,
            });
        }

        self.append_duplicates(&mut customers);
        customers
    }

    /// Base orders followed by injected duplicates
    ///
    /// Customer references are drawn from the base customer identifiers.
    pub fn orders(&mut self) -> Vec<Order> {
        let mut orders = Vec::with_capacity(self.config.orders);
        for i in 1..=self.config.orders {
            let customer_id = self.customer_ref();

            let mut amount = cents(self.rng.gen_range(10.0..=500.0));
            if self.rng.gen::<f64>() < self.config.negative_amount_rate {
                amount = -amount;
            }

            let order_status = self.category(&vocab::ORDER_STATUSES, &vocab::INVALID_ORDER_STATUSES);
            let order_date = self.within(Duration::days(365));
            let customer_id = customer_id.and_then(|id| self.nullable(id));
            let total_amount = self.nullable(amount);
            let payment_method = pick(&mut self.rng, &vocab::PAYMENT_METHODS).to_string();
            let shipping_cost = cents(self.rng.gen_range(0.0..=20.0));
            let discount_amount = if self.rng.gen::<f64>() < 0.3 {
                cents(self.rng.gen_range(0.0..=50.0))
            } else {
                0.0
            };

            orders.push(Order {
                order_id: format!("ORD{:08}", i),
                customer_id,
                order_date,
                order_status,
                total_amount,
                payment_method,
                shipping_cost,
                discount_amount,
                loaded_at: self.reference,
            });
        }

        self.append_duplicates(&mut orders);
        orders
    }

    /// Base events followed by injected duplicates
    pub fn events(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.config.events);
        for i in 1..=self.config.events {
            let customer_id = self.customer_ref();
            let event_type = self.category(&vocab::EVENT_TYPES, &vocab::INVALID_EVENT_TYPES);
            let event_timestamp = self.within(Duration::days(30));
            let page_url = format!("/page/{}", self.rng.gen_range(1..=vocab::PAGE_COUNT));
            let product_id = if self.rng.gen::<f64>() < 0.3 {
                None
            } else {
                Some(format!("PROD{:04}", self.rng.gen_range(1..=vocab::PRODUCT_COUNT)))
            };
            let session_id = format!("SESS{:06}", self.rng.gen_range(1..=vocab::SESSION_COUNT));
            let device_type = pick(&mut self.rng, &vocab::DEVICE_TYPES).to_string();
            let customer_id = customer_id.and_then(|id| self.nullable(id));

            events.push(Event {
                event_id: format!("EVT{:010}", i),
                customer_id,
                event_type,
                event_timestamp,
                page_url,
                product_id,
                session_id,
                device_type,
                loaded_at: self.reference,
            });
        }

        self.append_duplicates(&mut events);
        events
    }

    /// Generate all three datasets into `dir`, creating it if needed
    pub fn write_all(&mut self, dir: &Path) -> Result<GenerationSummary, GenerateError> {
        std::fs::create_dir_all(dir)?;

        let customers = self.customers();
        let orders = self.orders();
        let events = self.events();

        let files = vec![
            write_csv(dir, CUSTOMERS_FILE, &Customer::HEADERS, &customers, self.duplicates_for(self.config.customers))?,
            write_csv(dir, ORDERS_FILE, &Order::HEADERS, &orders, self.duplicates_for(self.config.orders))?,
            write_csv(dir, EVENTS_FILE, &Event::HEADERS, &events, self.duplicates_for(self.config.events))?,
        ];

        Ok(GenerationSummary {
            seed: self.config.seed,
            files,
        })
    }

    /// `floor(base · duplicate_rate)`
    pub fn duplicates_for(&self, base: usize) -> usize {
        (base as f64 * self.config.duplicate_rate).floor() as usize
    }

    fn append_duplicates<T: Clone>(&mut self, rows: &mut Vec<T>) {
        let base = rows.len();
        if base == 0 {
            return;
        }
        // Sampled with replacement: a base row may be copied more than once
        for _ in 0..self.duplicates_for(base) {
            let idx = self.rng.gen_range(0..base);
            rows.push(rows[idx].clone());
        }
    }

    fn nullable<T>(&mut self, value: T) -> Option<T> {
        if self.rng.gen::<f64>() < self.config.null_rate {
            None
        } else {
            Some(value)
        }
    }

    fn category(&mut self, valid: &[&str], invalid: &[&str]) -> String {
        let pool = if self.rng.gen::<f64>() < self.config.invalid_rate {
            invalid
        } else {
            valid
        };
        pick(&mut self.rng, pool).to_string()
    }

    fn customer_ref(&mut self) -> Option<String> {
        if self.config.customers == 0 {
            return None;
        }
        Some(format!("CUST{:06}", self.rng.gen_range(1..=self.config.customers)))
    }

    /// A whole-second instant in `(reference - span, reference]`
    fn within(&mut self, span: Duration) -> NaiveDateTime {
        let secs = self.rng.gen_range(0..span.num_seconds().max(1));
        self.reference - Duration::seconds(secs)
    }
}

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The header row is written even when there are no rows
fn write_csv<T: Serialize>(
    dir: &Path,
    file: &str,
    headers: &[&str],
    rows: &[T],
    duplicates: usize,
) -> Result<FileSummary, GenerateError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| GenerateError::Io(e.into_error()))?;

    let path = dir.join(file);
    std::fs::write(&path, &bytes)?;

    let summary = FileSummary {
        file: file.to_string(),
        path,
        rows: rows.len(),
        duplicates,
        sha256: hex::encode(Sha256::digest(&bytes)),
    };
    tracing::info!(file, rows = summary.rows, duplicates, "wrote dataset");
    Ok(summary)
}
