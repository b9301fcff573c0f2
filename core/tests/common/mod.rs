//! A scripted transport for tests that must not touch the network.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use lostfound_core::{
    ApiError, AppContext, HttpRequest, HttpResponse, LostFoundClient, MemoryStorage, Transport,
};

pub const BASE_URL: &str = "http://api.test";

/// Replays queued responses in order and records every request it sees.
/// Running out of responses is reported as a transport failure.
#[derive(Default)]
pub struct RecordingTransport {
    pub requests: RefCell<Vec<HttpRequest>>,
    responses: RefCell<VecDeque<Result<HttpResponse, ApiError>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.responses
            .borrow_mut()
            .push_back(Ok(HttpResponse::json(status, body)));
        self
    }

    pub fn fail(self, error: ApiError) -> Self {
        self.responses.borrow_mut().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn request(&self, index: usize) -> HttpRequest {
        self.requests.borrow()[index].clone()
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted response".to_string())))
    }
}

pub fn context(transport: RecordingTransport) -> AppContext<RecordingTransport, MemoryStorage> {
    AppContext::new(LostFoundClient::new(BASE_URL), transport, MemoryStorage::new())
}

/// A context logged in with the built-in test account.
pub fn logged_in(transport: RecordingTransport) -> AppContext<RecordingTransport, MemoryStorage> {
    let mut ctx = context(transport);
    assert!(ctx.login("testuser", "123456").success);
    ctx
}
