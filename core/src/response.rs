//! Response classification shared by every endpoint.
//!
//! # Design
//! `classify` is the single place that turns an `HttpResponse` into either an
//! `Envelope` or an `ApiError`. Success is decided by the status alone; the
//! body only supplies the message and payload. Non-JSON and malformed JSON
//! bodies are folded into a `{"message": ...}` object so callers always see
//! the same shape.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::http::HttpResponse;

pub(crate) const MALFORMED_BODY: &str = "malformed server response";
pub(crate) const UNEXPECTED_BODY: &str = "unexpected server response";
const OPERATION_FAILED: &str = "operation failed";

/// The successful result of a call: an optional server message and the
/// payload (`body.data` when present, otherwise the whole body).
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: Option<String>,
    pub data: Value,
}

impl Envelope {
    /// The server's message, or `fallback` when it sent none.
    pub fn message_or(&self, fallback: &str) -> String {
        self.message.clone().unwrap_or_else(|| fallback.to_string())
    }

    /// Deserialize the payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.data.clone()).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Deserialize the payload as a list, wrapping a single object into a
    /// one-element list and treating `null` as empty.
    pub fn decode_list<T: DeserializeOwned>(&self) -> Result<Vec<T>, ApiError> {
        match &self.data {
            Value::Array(_) => self.decode(),
            Value::Null => Ok(Vec::new()),
            single => serde_json::from_value(single.clone())
                .map(|one| vec![one])
                .map_err(|e| ApiError::DeserializationError(e.to_string())),
        }
    }

    /// Deserialize the payload as a list, treating anything that is not an
    /// array as empty.
    pub fn decode_array_or_empty<T: DeserializeOwned>(&self) -> Result<Vec<T>, ApiError> {
        if self.data.is_array() {
            self.decode()
        } else {
            Ok(Vec::new())
        }
    }
}

/// Classify a response by status code.
pub fn classify(response: &HttpResponse) -> Result<Envelope, ApiError> {
    let body = read_body(response);
    let message = body.get("message").and_then(Value::as_str).map(str::to_string);

    if response.is_success() {
        let data = body
            .get("data")
            .filter(|data| is_truthy(data))
            .cloned()
            .unwrap_or(body);
        return Ok(Envelope { message, data });
    }

    let server_message = message
        .or_else(|| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| OPERATION_FAILED.to_string());
    Err(ApiError::from_status(response.status, server_message))
}

fn read_body(response: &HttpResponse) -> Value {
    if response.is_json() {
        return serde_json::from_str(&response.body).unwrap_or_else(|_| json!({ "message": MALFORMED_BODY }));
    }
    if response.body.is_empty() {
        json!({ "message": UNEXPECTED_BODY })
    } else {
        json!({ "message": response.body })
    }
}

/// JavaScript-style truthiness, which decides whether `data` is unwrapped.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
