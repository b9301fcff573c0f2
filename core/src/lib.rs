//! Synchronous client core for the lost-and-found service.
//!
//! # Overview
//! `LostFoundClient` builds `HttpRequest` values without touching the network
//! (host-does-IO pattern) and `classify` turns any `HttpResponse` into an
//! `Envelope` or an `ApiError`. `AppContext` ties them to a `Transport` that
//! performs the round-trip and a `Storage` that keeps the session across runs.
//!
//! # Design
//! - `LostFoundClient` is stateless; it holds only `base_url`.
//! - `AppContext` owns the session and the shared item list. Operations take
//!   `&mut self`, so there is one writer at a time.
//! - Every request goes through one interceptor that clears the session on a
//!   401 (login and register excepted).
//! - Operations return `Outcome<T>`; only `update_user_profile` returns a
//!   `Result`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod item;
pub mod messaging;
pub mod multipart;
pub mod outcome;
pub mod repository;
pub mod response;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;

pub use client::LostFoundClient;
pub use config::ClientConfig;
pub use context::AppContext;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use item::{CreateItemRequest, Item, ItemResponse, ItemStatus, ItemType, Location, SearchFilters};
pub use multipart::MultipartForm;
pub use outcome::Outcome;
pub use response::{classify, Envelope};
pub use session::Session;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use transport::UreqTransport;
pub use types::{
    ConversationSummary, Credentials, MarkViewedResponse, MessageResponse, ProfileUpdate,
    SendMessageRequest, SimilarItemSuggestion, Upload, User,
};
