//! End-to-end generation tests against a temporary directory

use pretty_assertions::assert_eq;
use shopqa_core::GeneratorConfig;
use shopqa_datagen::{
    profile_dir, vocab, Customer, Event, Generator, Order, CUSTOMERS_FILE, EVENTS_FILE, ORDERS_FILE,
};

fn config() -> GeneratorConfig {
    GeneratorConfig {
        customers: 300,
        orders: 1200,
        events: 2500,
        ..GeneratorConfig::default()
    }
}

#[test]
fn same_seed_gives_identical_bytes() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let a = Generator::new(config()).unwrap().write_all(first.path()).unwrap();
    let b = Generator::new(config()).unwrap().write_all(second.path()).unwrap();

    for file in [CUSTOMERS_FILE, ORDERS_FILE, EVENTS_FILE] {
        let left = std::fs::read(first.path().join(file)).unwrap();
        let right = std::fs::read(second.path().join(file)).unwrap();
        assert_eq!(left, right, "{} differs between runs", file);
        assert_eq!(a.file(file).unwrap().sha256, b.file(file).unwrap().sha256);
    }
}

#[test]
fn different_seed_changes_output() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let a = Generator::new(config()).unwrap().write_all(first.path()).unwrap();
    let b = Generator::new(GeneratorConfig { seed: 7, ..config() })
        .unwrap()
        .write_all(second.path())
        .unwrap();

    assert_ne!(a.file(ORDERS_FILE).unwrap().sha256, b.file(ORDERS_FILE).unwrap().sha256);
}

#[test]
fn null_email_count_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    Generator::new(config()).unwrap().write_all(dir.path()).unwrap();

    let count_null_emails = || {
        let mut reader = csv::Reader::from_path(dir.path().join(CUSTOMERS_FILE)).unwrap();
        reader
            .deserialize::<Customer>()
            .map(|r| r.unwrap())
            .filter(|c| c.email.is_none())
            .count()
    };

    let mut generator = Generator::new(config()).unwrap();
    let expected = generator.customers().iter().filter(|c| c.email.is_none()).count();

    assert_eq!(count_null_emails(), expected);
    assert!(expected > 0);
}

/// `(low, high)` of mean ± 3σ for `n` draws at rate `p`
fn three_sigma(n: usize, p: f64) -> (usize, usize) {
    let mean = n as f64 * p;
    let sigma = (n as f64 * p * (1.0 - p)).sqrt();
    ((mean - 3.0 * sigma).floor() as usize, (mean + 3.0 * sigma).ceil() as usize)
}

#[test]
fn null_email_rate_is_within_sampling_tolerance() {
    let config = GeneratorConfig::default();
    let mut generator = Generator::new(config.clone()).unwrap();
    let customers = generator.customers();
    let base = &customers[..config.customers];

    let nulls = base.iter().filter(|c| c.email.is_none()).count();
    let (low, high) = three_sigma(config.customers, config.null_rate);
    assert_eq!((low, high), (13, 47));
    assert!((low..=high).contains(&nulls), "{} null emails outside [{}, {}]", nulls, low, high);
}

#[test]
fn invalid_category_rates_are_within_sampling_tolerance() {
    let config = GeneratorConfig::default();
    let mut generator = Generator::new(config.clone()).unwrap();
    let _ = generator.customers();
    let orders = generator.orders();
    let events = generator.events();

    let invalid_statuses = orders[..config.orders]
        .iter()
        .filter(|o| vocab::INVALID_ORDER_STATUSES.contains(&o.order_status.as_str()))
        .count();
    let (low, high) = three_sigma(config.orders, config.invalid_rate);
    assert!(
        (low..=high).contains(&invalid_statuses),
        "{} invalid statuses outside [{}, {}]",
        invalid_statuses,
        low,
        high
    );

    let invalid_types = events[..config.events]
        .iter()
        .filter(|e| vocab::INVALID_EVENT_TYPES.contains(&e.event_type.as_str()))
        .count();
    let (low, high) = three_sigma(config.events, config.invalid_rate);
    assert!(
        (low..=high).contains(&invalid_types),
        "{} invalid event types outside [{}, {}]",
        invalid_types,
        low,
        high
    );

    let negative = orders[..config.orders]
        .iter()
        .filter(|o| o.total_amount.is_some_and(|a| a < 0.0))
        .count();
    let (low, high) = three_sigma(config.orders, config.negative_amount_rate);
    assert!((low..=high).contains(&negative), "{} negative amounts outside [{}, {}]", negative, low, high);
}

#[test]
fn empty_dataset_still_has_header_rows() {
    let dir = tempfile::tempdir().unwrap();
    let summary = Generator::new(GeneratorConfig {
        customers: 0,
        orders: 0,
        events: 0,
        ..GeneratorConfig::default()
    })
    .unwrap()
    .write_all(dir.path())
    .unwrap();

    assert_eq!(summary.total_rows(), 0);
    for (file, headers) in [
        (CUSTOMERS_FILE, Customer::HEADERS.join(",")),
        (ORDERS_FILE, Order::HEADERS.join(",")),
        (EVENTS_FILE, Event::HEADERS.join(",")),
    ] {
        let text = std::fs::read_to_string(dir.path().join(file)).unwrap();
        assert_eq!(text, format!("{}\n", headers), "{}", file);
    }
}

#[test]
fn summary_reports_rows_and_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let summary = Generator::new(config()).unwrap().write_all(dir.path().join("nested").as_path()).unwrap();

    let customers = summary.file(CUSTOMERS_FILE).unwrap();
    assert_eq!(customers.rows, 306);
    assert_eq!(customers.duplicates, 6);
    assert_eq!(summary.file(ORDERS_FILE).unwrap().rows, 1224);
    assert_eq!(summary.file(EVENTS_FILE).unwrap().rows, 2550);
    assert_eq!(summary.total_rows(), 306 + 1224 + 2550);
    assert_eq!(customers.sha256.len(), 64);
    assert!(dir.path().join("nested").join(CUSTOMERS_FILE).exists());
}

#[test]
fn header_row_matches_column_order() {
    let dir = tempfile::tempdir().unwrap();
    Generator::new(config()).unwrap().write_all(dir.path()).unwrap();

    let text = std::fs::read_to_string(dir.path().join(CUSTOMERS_FILE)).unwrap();
    assert_eq!(text.lines().next().unwrap(), Customer::HEADERS.join(","));
}

#[test]
fn profile_sees_injected_defects() {
    let dir = tempfile::tempdir().unwrap();
    Generator::new(config()).unwrap().write_all(dir.path()).unwrap();

    let profile = profile_dir(dir.path()).unwrap();
    assert_eq!(profile.customers.rows, 306);
    assert_eq!(profile.customers.duplicate_rows, 6);
    assert_eq!(profile.orders.duplicate_rows, 24);
    assert!(profile.customers.null_fractions["email"] > 0.0);
    assert_eq!(profile.orders.quality_score, 1.0 - profile.orders.invalid_values as f64 / 1224.0);
    assert_eq!(profile.stale_events, 0);
    assert!(profile.conversion_rate > 0.0);
    assert_eq!(profile.avg_order_value.len(), 4);
}
