//! Classification of call outcomes and envelope writing.

use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::HeaderValue;
use serde::Serialize;
use serde_json::Value;

use hermes_core::envelope::{MSG_ENCODE_FAILED, MSG_METHOD_ERROR, MSG_METHOD_PANICKED};
use hermes_core::{FormattedResponse, IntoMethodReturn, Invocation, MethodReturn, ResponseWriter};
use hermes_telemetry::CallOutcome;

use crate::trace::CallTrace;

/// What the adapter wrote for a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Written {
    /// No body was written by the adapter.
    Nothing,
    /// An envelope was written.
    Envelope(FormattedResponse),
    /// A plain JSON value was written.
    Value(Value),
}

/// Sets the headers every JSON response carries.
pub fn set_response_headers(writer: &ResponseWriter) {
    writer.with_headers(|headers| {
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    });
}

/// Writes an envelope; its code becomes the status line.
///
/// The code should be a valid HTTP status, see
/// [`FormattedResponse::normalized`].
pub fn write_envelope(writer: &ResponseWriter, trace: &CallTrace, response: &FormattedResponse) {
    trace.annotate(format_args!("{}: {}", response.msg, response.data));
    if response.is_error() {
        trace.set_error();
    }

    set_response_headers(writer);
    writer.write_header(response.status());
    write_json(writer, response);
}

/// Writes a plain JSON value with the default status.
pub fn write_value(writer: &ResponseWriter, trace: &CallTrace, value: &Value) {
    trace.annotate(value);
    set_response_headers(writer);
    write_json(writer, value);
}

// One document followed by a newline.
fn write_json<T: Serialize>(writer: &ResponseWriter, value: &T) {
    match serde_json::to_vec(value) {
        Ok(mut bytes) => {
            bytes.push(b'\n');
            writer.write(&bytes);
        }
        Err(err) => tracing::error!(error = %err, "failed to encode response body"),
    }
}

/// Maps a finished invocation to a response and writes it.
///
/// Priority: panic, explicit envelope, failure value, plain value. A plain
/// value is left to the method when `bypass_response_body` is set.
pub fn respond<R: IntoMethodReturn>(
    writer: &ResponseWriter,
    trace: &CallTrace,
    invocation: Invocation<R>,
    bypass_response_body: bool,
) -> (CallOutcome, Written) {
    let returned = match invocation {
        Invocation::Panicked(capture) => {
            let response =
                FormattedResponse::new(500, MSG_METHOD_PANICKED, capture.to_value());
            write_envelope(writer, trace, &response);
            return (CallOutcome::Panic, Written::Envelope(response));
        }
        Invocation::Returned(returned) => returned,
    };

    match returned.into_method_return() {
        Ok(MethodReturn::Envelope(Some(response))) => {
            let response = response.normalized();
            write_envelope(writer, trace, &response);
            (CallOutcome::Envelope, Written::Envelope(response))
        }
        Ok(MethodReturn::Envelope(None)) => (CallOutcome::Envelope, Written::Nothing),
        Ok(MethodReturn::Failure(text)) => {
            let response = FormattedResponse::new(500, MSG_METHOD_ERROR, Value::String(text));
            write_envelope(writer, trace, &response);
            (CallOutcome::Error, Written::Envelope(response))
        }
        Ok(MethodReturn::Value(_)) if bypass_response_body => (CallOutcome::Ok, Written::Nothing),
        Ok(MethodReturn::Value(value)) => {
            write_value(writer, trace, &value);
            (CallOutcome::Ok, Written::Value(value))
        }
        Err(err) if bypass_response_body => {
            tracing::debug!(error = %err, "unencodable return value left to the method");
            (CallOutcome::Ok, Written::Nothing)
        }
        Err(err) => {
            tracing::error!(error = %err, "{}", MSG_ENCODE_FAILED);
            let response =
                FormattedResponse::new(500, MSG_ENCODE_FAILED, Value::String(err.to_string()));
            write_envelope(writer, trace, &response);
            (CallOutcome::Error, Written::Envelope(response))
        }
    }
}
