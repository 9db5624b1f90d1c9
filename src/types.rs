//! Core identifier and timestamp helpers shared by the graph and agent layers.

use chrono::{DateTime, SecondsFormat, Utc};

/// Wall-clock timestamp attached to graph records and protocol messages.
pub type Timestamp = DateTime<Utc>;

/// Current time.
pub fn now() -> Timestamp {
    Utc::now()
}

/// RFC 3339 rendering with millisecond precision, as written on the wire.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generate `<prefix>_<unix millis>_<9 char random suffix>`.
///
/// Collision-improbable rather than collision-free: two ids minted in the same
/// millisecond differ only by the random suffix.
pub fn generate_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), &suffix[..9])
}
