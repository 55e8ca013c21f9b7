//! CSV record types
//!
//! Field order is column order. `None` is written as an empty cell and an
//! empty cell reads back as `None`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A customer row of `customers.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country: String,
    pub city: String,
    #[serde(with = "timestamp")]
    pub signup_date: NaiveDateTime,
    pub customer_segment: String,
    #[serde(rename = "_loaded_at", with = "timestamp")]
    pub loaded_at: NaiveDateTime,
}

/// An order row of `orders.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: Option<String>,
    #[serde(with = "timestamp")]
    pub order_date: NaiveDateTime,
    pub order_status: String,
    pub total_amount: Option<f64>,
    pub payment_method: String,
    pub shipping_cost: f64,
    pub discount_amount: f64,
    #[serde(rename = "_loaded_at", with = "timestamp")]
    pub loaded_at: NaiveDateTime,
}

/// A clickstream row of `events.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub customer_id: Option<String>,
    pub event_type: String,
    #[serde(with = "timestamp")]
    pub event_timestamp: NaiveDateTime,
    pub page_url: String,
    pub product_id: Option<String>,
    pub session_id: String,
    pub device_type: String,
    #[serde(rename = "_loaded_at", with = "timestamp")]
    pub loaded_at: NaiveDateTime,
}

impl Customer {
    pub const HEADERS: [&'static str; 10] = [
        "customer_id", "email", "first_name", "last_name", "date_of_birth",
        "country", "city", "signup_date", "customer_segment", "_loaded_at",
    ];
}

impl Order {
    pub const HEADERS: [&'static str; 9] = [
        "order_id", "customer_id", "order_date", "order_status", "total_amount",
        "payment_method", "shipping_cost", "discount_amount", "_loaded_at",
    ];
}

impl Event {
    pub const HEADERS: [&'static str; 9] = [
        "event_id", "customer_id", "event_type", "event_timestamp", "page_url",
        "product_id", "session_id", "device_type", "_loaded_at",
    ];
}

/// `YYYY-MM-DD HH:MM:SS`, which every supported warehouse casts from text
mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, FORMAT).map_err(serde::de::Error::custom)
    }
}
