//! Client configuration read from the environment.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_STATE_FILE: &str = "lostfound-state.json";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub api_url: String,
    /// JSON file holding the persisted token and user.
    pub state_file: PathBuf,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = path.into();
        self
    }

    /// `LOSTFOUND_API_URL` and `LOSTFOUND_STATE_FILE`, falling back to the
    /// defaults when unset or empty.
    pub fn from_env() -> Self {
        let api_url = env::var("LOSTFOUND_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let state_file = env::var("LOSTFOUND_STATE_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());

        Self::new(api_url).with_state_file(state_file)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
