use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{BoutiqueError, Result};

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| BoutiqueError::Parse(format!("invalid duration {input}: {e}")))
}

pub fn format_log_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
