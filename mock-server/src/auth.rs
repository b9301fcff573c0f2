//! Accounts, tokens, and the bearer-token middleware.

use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::reply::{fail, ok, Reply};
use crate::state::{Db, UserRecord};

/// The authenticated caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: u64,
    pub username: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Routes reachable without a token.
fn is_public(method: &Method, path: &str) -> bool {
    if path == "/auth/login" || path == "/auth/register" {
        return true;
    }
    *method == Method::GET
        && (path == "/items"
            || path == "/items/search"
            || path.starts_with("/uploads/")
            || path.starts_with("/profile/user/")
            || path
                .strip_prefix("/items/")
                .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit())))
}

fn extract_bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.to_string())
}

/// Bearer auth. Unknown or missing tokens on protected routes get 401.
pub async fn bearer_auth(State(db): State<Db>, mut req: Request, next: Next) -> Response {
    if is_public(req.method(), req.uri().path()) {
        return next.run(req).await;
    }

    let Some(token) = extract_bearer_token(&req) else {
        return fail(StatusCode::UNAUTHORIZED, "missing token").into_response();
    };

    let user = {
        let store = db.read().await;
        store.tokens.get(&token).and_then(|id| store.users.get(id)).map(|user| AuthUser {
            id: user.id,
            username: user.username.clone(),
        })
    };

    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => fail(StatusCode::UNAUTHORIZED, "invalid or expired token").into_response(),
    }
}

pub async fn register(State(db): State<Db>, body: Option<Json<Credentials>>) -> Reply {
    let Some(Json(input)) = body else {
        return fail(StatusCode::BAD_REQUEST, "invalid body");
    };
    if input.username.trim().is_empty() || input.password.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "username and password are required");
    }

    let mut store = db.write().await;
    if store.user_by_name(&input.username).is_some() {
        return fail(StatusCode::BAD_REQUEST, "username already exists");
    }

    let id = store.next_id();
    store.users.insert(
        id,
        UserRecord {
            id,
            username: input.username.clone(),
            password: input.password,
            student_id: None,
            gender: None,
            email: None,
            phone_number: None,
            avatar_url: None,
        },
    );
    let token = store.issue_token(id);
    info!(user_id = id, "registered");

    ok(
        "registration successful",
        json!({ "id": id, "username": input.username, "token": token }),
    )
}

pub async fn login(State(db): State<Db>, body: Option<Json<Credentials>>) -> Reply {
    let Some(Json(input)) = body else {
        return fail(StatusCode::BAD_REQUEST, "invalid body");
    };

    let mut store = db.write().await;
    let Some(user) = store
        .user_by_name(&input.username)
        .filter(|user| user.password == input.password)
        .cloned()
    else {
        return fail(StatusCode::UNAUTHORIZED, "invalid username or password");
    };

    let token = store.issue_token(user.id);
    info!(user_id = user.id, "logged in");
    ok(
        "login successful",
        json!({ "id": user.id, "username": user.username, "token": token }),
    )
}
