//! The uniform `{success, message, data}` result returned to callers.

use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(error: &ApiError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl<T> From<Result<(String, T), ApiError>> for Outcome<T> {
    fn from(result: Result<(String, T), ApiError>) -> Self {
        match result {
            Ok((message, data)) => Outcome::success(message, data),
            Err(e) => Outcome::failure(&e),
        }
    }
}
