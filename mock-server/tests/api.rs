use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, new_db, Db};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "test-boundary";

async fn send(db: &Db, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app_with_state(db.clone()).oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn request(method: &str, uri: &str, token: Option<&str>) -> http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(http::header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

fn empty(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    request(method, uri, token).body(Body::empty()).unwrap()
}

fn json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    request(method, uri, token)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart body with text parts and at most one file part.
fn multipart(
    method: &str,
    uri: &str,
    token: Option<&str>,
    texts: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in texts {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    if let Some((name, file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\ncontent-type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    request(method, uri, token)
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn register(db: &Db, username: &str) -> (u64, String) {
    let (status, body) = send(
        db,
        json(
            "POST",
            "/auth/register",
            None,
            serde_json::json!({"username": username, "password": "secret"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_u64().unwrap();
    let token = body["data"]["token"].as_str().unwrap().to_string();
    (id, token)
}

async fn create_item(db: &Db, token: &str, name: &str, item_type: &str) -> Value {
    let uri = format!(
        "/items?name={name}&description=black%20leather&eventTime=2024-01-01T10%3A00%3A00&location=40.1%2C116.2&type={item_type}&site=Library"
    );
    let (status, body) = send(db, empty("POST", &uri, Some(token))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"].clone()
}

// --- auth ---

#[tokio::test]
async fn register_then_login() {
    let db = new_db();
    let (id, _) = register(&db, "ann").await;

    let (status, body) = send(
        &db,
        json(
            "POST",
            "/auth/login",
            None,
            serde_json::json!({"username": "ann", "password": "secret"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let db = new_db();
    register(&db, "ann").await;
    let (status, body) = send(
        &db,
        json(
            "POST",
            "/auth/register",
            None,
            serde_json::json!({"username": "ann", "password": "other"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "username already exists");
}

#[tokio::test]
async fn wrong_password_returns_401() {
    let db = new_db();
    register(&db, "ann").await;
    let (status, _) = send(
        &db,
        json(
            "POST",
            "/auth/login",
            None,
            serde_json::json!({"username": "ann", "password": "nope"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_known_token() {
    let db = new_db();
    let (status, body) = send(&db, empty("GET", "/items/user", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "missing token");

    let (status, _) = send(&db, empty("GET", "/profile", Some("forged"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn item_list_is_public() {
    let resp = app()
        .oneshot(Request::builder().uri("/items").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- profile ---

#[tokio::test]
async fn profile_update_accepts_multipart_fields_and_avatar() {
    let db = new_db();
    let (id, token) = register(&db, "ann").await;

    let (status, body) = send(
        &db,
        multipart(
            "PUT",
            "/profile",
            Some(&token),
            &[("email", "ann@example.com"), ("studentId", "S42")],
            Some(("avatar", "face.png", b"\x89PNG".as_slice())),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userId"], id);
    assert_eq!(body["data"]["email"], "ann@example.com");
    let avatar = body["data"]["avatarUrl"].as_str().unwrap().to_string();
    assert!(avatar.ends_with("face.png"));

    let resp = app_with_state(db.clone())
        .oneshot(empty("GET", &format!("/uploads/{avatar}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"\x89PNG");

    let (status, body) = send(&db, empty("GET", &format!("/profile/user/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["studentId"], "S42");
}

// --- items ---

#[tokio::test]
async fn created_item_uses_wire_format() {
    let db = new_db();
    let (id, token) = register(&db, "ann").await;
    let item = create_item(&db, &token, "Wallet", "LOST").await;

    assert_eq!(item["type"], "LOST");
    assert_eq!(item["status"], "ACTIVE");
    assert_eq!(item["location"], "40.1,116.2");
    assert_eq!(item["eventTime"], "2024-01-01T10:00:00");
    assert_eq!(item["userId"], id);
    assert!(item["imageUrl"].is_null());

    let (_, body) = send(&db, empty("GET", "/items", None)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn create_rejects_unknown_type() {
    let db = new_db();
    let (_, token) = register(&db, "ann").await;
    let (status, _) = send(&db, empty("POST", "/items?name=Pen&type=MISSING", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_with_image_stores_upload() {
    let db = new_db();
    let (_, token) = register(&db, "ann").await;
    let (status, body) = send(
        &db,
        multipart(
            "POST",
            "/items?name=Keys&type=FOUND",
            Some(&token),
            &[],
            Some(("image", "keys.png", b"img".as_slice())),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["imageUrl"].as_str().unwrap().ends_with("keys.png"));
}

#[tokio::test]
async fn only_owner_can_modify_item() {
    let db = new_db();
    let (_, owner) = register(&db, "ann").await;
    let (_, other) = register(&db, "bob").await;
    let item = create_item(&db, &owner, "Wallet", "LOST").await;
    let id = item["id"].as_u64().unwrap();

    let uri = format!("/items/{id}?name=Mine&type=LOST");
    let (status, _) = send(&db, empty("PUT", &uri, Some(&other))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&db, empty("DELETE", &format!("/items/{id}"), Some(&other))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/items/{id}?name=Wallet&type=LOST&status=RESOLVED");
    let (status, body) = send(&db, empty("PUT", &uri, Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "RESOLVED");

    let (status, _) = send(&db, empty("DELETE", &format!("/items/{id}"), Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&db, empty("GET", &format!("/items/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_and_user_items() {
    let db = new_db();
    let (_, ann) = register(&db, "ann").await;
    let (_, bob) = register(&db, "bob").await;
    create_item(&db, &ann, "Wallet", "LOST").await;
    create_item(&db, &bob, "Umbrella", "FOUND").await;

    let (_, body) = send(&db, empty("GET", "/items/search?keyword=wallet", None)).await;
    let found = body["data"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Wallet");

    let (_, body) = send(&db, empty("GET", "/items/search?type=FOUND", None)).await;
    assert_eq!(body["data"][0]["name"], "Umbrella");

    let (_, body) = send(&db, empty("GET", "/items/user", Some(&bob))).await;
    let mine = body["data"].as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["username"], "bob");
}

// --- suggestions ---

#[tokio::test]
async fn matching_items_produce_suggestions_for_both_owners() {
    let db = new_db();
    let (_, ann) = register(&db, "ann").await;
    let (_, bob) = register(&db, "bob").await;
    let lost = create_item(&db, &ann, "Wallet", "LOST").await;
    let found = create_item(&db, &bob, "Wallet", "FOUND").await;

    let (_, body) = send(&db, empty("GET", "/api/similar-items", Some(&ann))).await;
    let suggestions = body["data"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["sourceItemId"], lost["id"]);
    assert_eq!(suggestions[0]["suggestedItemId"], found["id"]);
    assert_eq!(suggestions[0]["viewed"], false);
    let suggestion_id = suggestions[0]["id"].as_u64().unwrap();

    let uri = format!("/api/similar-items/{suggestion_id}/view");
    let (status, _) = send(&db, empty("POST", &uri, Some(&bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&db, empty("POST", &uri, Some(&ann))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&db, empty("GET", "/api/similar-items", Some(&ann))).await;
    assert_eq!(body["data"][0]["viewed"], true);
}

// --- messages ---

#[tokio::test]
async fn messaging_tracks_conversations_and_unread() {
    let db = new_db();
    let (ann_id, ann) = register(&db, "ann").await;
    let (bob_id, bob) = register(&db, "bob").await;
    let item = create_item(&db, &ann, "Wallet", "LOST").await;

    let (status, body) = send(
        &db,
        json(
            "POST",
            "/messages",
            Some(&bob),
            serde_json::json!({"receiverId": ann_id, "itemId": item["id"], "content": "I found it"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["senderId"], bob_id);
    assert_eq!(body["data"]["outgoing"], true);
    let conversation_id = body["data"]["conversationId"].as_u64().unwrap();

    let (_, body) = send(&db, empty("GET", "/messages/unread-count", Some(&ann))).await;
    assert_eq!(body["data"]["count"], 1);

    let (_, body) = send(&db, empty("GET", "/messages/conversations", Some(&ann))).await;
    assert_eq!(body["data"][0]["hasUnread"], true);
    assert_eq!(body["data"][0]["otherUsername"], "bob");
    assert_eq!(body["data"][0]["lastMessageContent"], "I found it");

    let uri = format!("/messages/conversations/{conversation_id}");
    let (_, body) = send(&db, empty("GET", &uri, Some(&ann))).await;
    assert_eq!(body["data"][0]["outgoing"], false);

    let (_, body) = send(&db, empty("GET", "/messages/unread-count", Some(&ann))).await;
    assert_eq!(body["data"]["count"], 0);

    let (_, carol) = register(&db, "carol").await;
    let (status, _) = send(&db, empty("GET", &uri, Some(&carol))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn anonymous_conversation_hides_names() {
    let db = new_db();
    let (ann_id, ann) = register(&db, "ann").await;
    let (_, bob) = register(&db, "bob").await;
    let item = create_item(&db, &ann, "Wallet", "LOST").await;

    send(
        &db,
        json(
            "POST",
            "/messages",
            Some(&bob),
            serde_json::json!({"receiverId": ann_id, "itemId": item["id"], "content": "hi", "anonymous": true}),
        ),
    )
    .await;

    let (_, body) = send(&db, empty("GET", "/messages", Some(&ann))).await;
    assert_eq!(body["data"][0]["senderName"], "Anonymous");
    assert_eq!(body["data"][0]["anonymous"], true);
}

#[tokio::test]
async fn cannot_message_yourself() {
    let db = new_db();
    let (ann_id, ann) = register(&db, "ann").await;
    let item = create_item(&db, &ann, "Wallet", "LOST").await;
    let (status, _) = send(
        &db,
        json(
            "POST",
            "/messages",
            Some(&ann),
            serde_json::json!({"receiverId": ann_id, "itemId": item["id"], "content": "hi"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
