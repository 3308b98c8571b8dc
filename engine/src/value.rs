// Copyright 2025 - present Mallard Project Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rendering of engine values into the text format PostgreSQL clients read.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use std::fmt::Write;

/// Text form of a single field, `None` for SQL NULL
pub(crate) fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Boolean(b) => Some(if *b { "true" } else { "false" }.to_owned()),
        Value::TinyInt(v) => Some(v.to_string()),
        Value::SmallInt(v) => Some(v.to_string()),
        Value::Int(v) => Some(v.to_string()),
        Value::BigInt(v) => Some(v.to_string()),
        Value::HugeInt(v) => Some(v.to_string()),
        Value::UTinyInt(v) => Some(v.to_string()),
        Value::USmallInt(v) => Some(v.to_string()),
        Value::UInt(v) => Some(v.to_string()),
        Value::UBigInt(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Double(v) => Some(v.to_string()),
        Value::Decimal(v) => Some(v.to_string()),
        Value::Text(v) => Some(v.clone()),
        Value::Blob(bytes) => Some(hex_of(bytes)),
        Value::Date32(days) => Some(date_of(*days)),
        Value::Time64(unit, v) => Some(time_of(micros_of(unit, *v))),
        Value::Timestamp(unit, v) => Some(timestamp_of(micros_of(unit, *v))),
        Value::Interval { months, days, nanos } => Some(interval_of(*months, *days, *nanos)),
        other => Some(format!("{:?}", other)),
    }
}

fn micros_of(unit: &TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value * 1_000_000,
        TimeUnit::Millisecond => value * 1_000,
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

// the bytea hex format, e.g. \x6d616c6c617264
fn hex_of(bytes: &[u8]) -> String {
    let mut rendered = String::with_capacity(bytes.len() * 2 + 2);
    rendered.push_str("\\x");
    for byte in bytes {
        write!(rendered, "{:02x}", byte).expect("writing to a string never fails");
    }
    rendered
}

fn date_of(days_since_epoch: i32) -> String {
    let date = NaiveDate::from_ymd_opt(1970, 1, 1).expect("unix epoch is a valid date")
        + Duration::days(days_since_epoch as i64);
    date.format("%Y-%m-%d").to_string()
}

fn time_of(micros_since_midnight: i64) -> String {
    let seconds = (micros_since_midnight / 1_000_000) as u32;
    let nanos = ((micros_since_midnight % 1_000_000) * 1_000) as u32;
    match NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos) {
        Some(time) => time.format("%H:%M:%S%.f").to_string(),
        None => micros_since_midnight.to_string(),
    }
}

fn timestamp_of(micros_since_epoch: i64) -> String {
    let seconds = micros_since_epoch.div_euclid(1_000_000);
    let nanos = (micros_since_epoch.rem_euclid(1_000_000) * 1_000) as u32;
    match DateTime::from_timestamp(seconds, nanos) {
        Some(timestamp) => timestamp.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        None => micros_since_epoch.to_string(),
    }
}

fn interval_of(months: i32, days: i32, nanos: i64) -> String {
    let mut parts = Vec::new();
    if months != 0 {
        parts.push(format!("{} mons", months));
    }
    if days != 0 {
        parts.push(format!("{} days", days));
    }
    let micros = nanos / 1_000;
    if micros != 0 || parts.is_empty() {
        parts.push(format!("{} secs", micros as f64 / 1_000_000.0));
    }
    parts.join(" ")
}
