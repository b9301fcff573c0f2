//! Response bodies. Successes are `{"message", "data"}`, failures are
//! `{"message"}` with a non-2xx status.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

pub type Reply = (StatusCode, Json<Value>);

pub fn ok(message: &str, data: impl Serialize) -> Reply {
    let data = serde_json::to_value(data).unwrap_or(Value::Null);
    (StatusCode::OK, Json(json!({ "message": message, "data": data })))
}

pub fn fail(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "message": message })))
}

pub fn not_found(what: &str) -> Reply {
    fail(StatusCode::NOT_FOUND, &format!("{what} not found"))
}

pub fn forbidden() -> Reply {
    fail(StatusCode::FORBIDDEN, "access denied")
}
