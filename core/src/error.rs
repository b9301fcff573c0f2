//! Error types for the lost-and-found client.
//!
//! # Design
//! Every failure an operation can hit lands in one `ApiError`: transport
//! failures, non-2xx statuses (one variant per status the client treats
//! specially), malformed payloads, and client-side validation. `Display` is
//! the user-facing text that ends up in `Outcome::message`.

use std::fmt;

/// Errors produced while building, sending or interpreting a request.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No response was obtained (DNS, connection refused, reset...).
    Transport(String),

    /// 400.
    BadRequest,

    /// 401. Triggers a session teardown outside the auth endpoints.
    Unauthorized,

    /// 403.
    Forbidden,

    /// 404.
    NotFound,

    /// 500.
    ServerError,

    /// Any other non-2xx status, with the server's message.
    HttpError { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    SerializationError(String),

    /// A write was attempted without a stored token.
    NotLoggedIn,

    /// Registration attempted with a reserved username.
    UsernameTaken,

    /// An avatar `data:` URL could not be decoded.
    InvalidDataUrl(String),
}

impl ApiError {
    /// Map a non-success status code to its error variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            400 => ApiError::BadRequest,
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            500 => ApiError::ServerError,
            _ => ApiError::HttpError {
                status,
                message: message.into(),
            },
        }
    }

    /// The HTTP status this error was classified from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest => Some(400),
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden => Some(403),
            ApiError::NotFound => Some(404),
            ApiError::ServerError => Some(500),
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(_) => write!(
                f,
                "network connection failed, please check that the backend service is running"
            ),
            ApiError::BadRequest => write!(f, "invalid request parameters, please check the submitted fields"),
            ApiError::Unauthorized => write!(f, "unauthorized, please log in again"),
            ApiError::Forbidden => write!(f, "access denied, please check your permissions"),
            ApiError::NotFound => write!(f, "the requested resource does not exist"),
            ApiError::ServerError => write!(f, "internal server error"),
            ApiError::HttpError { status, message } => {
                write!(f, "request failed ({status}): {message}")
            }
            ApiError::DeserializationError(msg) => write!(f, "malformed server response: {msg}"),
            ApiError::SerializationError(msg) => write!(f, "serialization failed: {msg}"),
            ApiError::NotLoggedIn => write!(f, "not logged in, please log in first"),
            ApiError::UsernameTaken => {
                write!(f, "this username is already taken, please choose another one")
            }
            ApiError::InvalidDataUrl(msg) => write!(f, "invalid data URL: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}
