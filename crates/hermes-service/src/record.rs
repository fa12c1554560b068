//! Per-call fields handed to a [`CallRecorder`].

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Timelike};
use serde::Serialize;

use hermes_core::recorder::{FIELD_ARGUMENT, FIELD_BEGIN_TIME, FIELD_DURATION, FIELD_RESPONSE_DATA};
use hermes_core::CallRecorder;

use crate::format::Written;

/// Encodes a value for the recorder.
///
/// # Panics
///
/// Panics if `value` cannot be encoded as JSON. Arguments and responses
/// reaching this point have already round-tripped through JSON, so a failure
/// is a bug in a `Serialize` implementation.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json,
        Err(err) => panic!("failed to encode call record: {err}"),
    }
}

/// JSON of what the adapter wrote, `null` when nothing was written.
pub fn encode_written(written: &Written) -> String {
    match written {
        Written::Nothing => "null".to_string(),
        Written::Envelope(response) => encode(response),
        Written::Value(value) => encode(value),
    }
}

/// `YYYY-MM-DD HH:MM:SS` followed by the fraction of a second with trailing
/// zeros removed; whole seconds carry no fraction.
pub fn format_begin_time<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = time.format("%Y-%m-%d %H:%M:%S").to_string();
    let nanos = time.nanosecond() % 1_000_000_000;
    if nanos != 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}

/// Seconds as the shortest decimal that round-trips, without exponent.
pub fn format_duration(duration: Duration) -> String {
    duration.as_secs_f64().to_string()
}

/// Emits the four call fields in order.
pub fn emit<Tz>(
    recorder: &dyn CallRecorder,
    argument: &str,
    written: &Written,
    begin: &DateTime<Tz>,
    duration: Duration,
) where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    recorder.record(FIELD_ARGUMENT, argument);
    recorder.record(FIELD_RESPONSE_DATA, &encode_written(written));
    recorder.record(FIELD_BEGIN_TIME, &format_begin_time(begin));
    recorder.record(FIELD_DURATION, &format_duration(duration));
}
