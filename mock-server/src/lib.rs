//! In-memory lost-and-found backend.
//!
//! Serves the REST surface the client core talks to: accounts and bearer
//! tokens, profiles, item reports with image uploads, messaging and
//! similar-item suggestions. All state lives in one `Store` behind an async
//! `RwLock`.

pub mod auth;
pub mod form;
pub mod items;
pub mod messages;
pub mod profile;
pub mod reply;
pub mod state;
pub mod suggestions;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

pub use state::{new_db, Db, ItemRecord, Store};

pub fn app() -> Router {
    app_with_state(new_db())
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/profile/user/{id}", get(profile::get_user_profile))
        .route("/items", get(items::list_items).post(items::create_item))
        .route("/items/user", get(items::user_items))
        .route("/items/search", get(items::search_items))
        .route(
            "/items/{id}",
            get(items::get_item).put(items::update_item).delete(items::delete_item),
        )
        .route("/messages", get(messages::list_messages).post(messages::send_message))
        .route("/messages/unread-count", get(messages::unread_count))
        .route("/messages/conversations", get(messages::list_conversations))
        .route("/messages/conversations/{id}", get(messages::get_conversation))
        .route("/api/similar-items", get(suggestions::list_suggestions))
        .route("/api/similar-items/{id}/view", post(suggestions::mark_viewed))
        .route("/uploads/{name}", get(form::get_upload))
        .layer(middleware::from_fn_with_state(db.clone(), auth::bearer_auth))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}
