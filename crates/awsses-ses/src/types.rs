use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Aggregate sending counters of one region as of `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendDataPoint {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Bounces", default)]
    pub bounces: i64,
    #[serde(rename = "Complaints", default)]
    pub complaints: i64,
    #[serde(rename = "DeliveryAttempts", default)]
    pub delivery_attempts: i64,
    #[serde(rename = "Rejects", default)]
    pub rejects: i64,
}
