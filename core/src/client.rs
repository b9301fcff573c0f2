//! Stateless HTTP request builder for the lost-and-found backend.
//!
//! # Design
//! `LostFoundClient` holds only a `base_url`. Each endpoint has a `build_*`
//! method producing an `HttpRequest`; the token is passed in by the caller
//! so the builder never reads session state. Responses go through
//! `response::classify`, and executing the request is left to a
//! `Transport`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::item::{CreateItemRequest, SearchFilters};
use crate::multipart::MultipartForm;
use crate::types::{Credentials, SendMessageRequest};

/// Characters left unescaped in query components.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";

/// Request builder for every backend endpoint the application uses.
#[derive(Debug, Clone)]
pub struct LostFoundClient {
    base_url: String,
}

impl LostFoundClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL that relative image and avatar paths are served from.
    pub fn uploads_url(&self) -> String {
        format!("{}/uploads", self.base_url)
    }

    // --- auth -------------------------------------------------------------

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, LOGIN_PATH, None, credentials)
    }

    pub fn build_register(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, REGISTER_PATH, None, credentials)
    }

    // --- profile ----------------------------------------------------------

    /// Own profile without an id, another user's public profile with one.
    pub fn build_get_profile(&self, token: Option<&str>, user_id: Option<u64>) -> HttpRequest {
        match user_id {
            Some(id) => self.request(HttpMethod::Get, &format!("/profile/user/{id}"), token),
            None => self.request(HttpMethod::Get, "/profile", token),
        }
    }

    pub fn build_update_profile(&self, token: Option<&str>, form: &MultipartForm) -> HttpRequest {
        let request = self.request(HttpMethod::Put, "/profile", token);
        with_form(request, form)
    }

    // --- items ------------------------------------------------------------

    pub fn build_list_items(&self, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, "/items", token)
    }

    pub fn build_user_items(&self, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, "/items/user", token)
    }

    pub fn build_get_item(&self, token: Option<&str>, id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/items/{id}"), token)
    }

    /// Fields travel as query parameters; the body is a multipart form only
    /// when an image is attached, otherwise there is no body at all.
    pub fn build_create_item(&self, token: &str, input: &CreateItemRequest) -> HttpRequest {
        let path = with_query("/items", &input.query_pairs());
        let request = self.request(HttpMethod::Post, &path, Some(token));
        with_image(request, input)
    }

    pub fn build_update_item(&self, token: &str, id: u64, input: &CreateItemRequest) -> HttpRequest {
        let mut pairs = input.query_pairs();
        pairs.push(("status", input.status.unwrap_or_default().as_wire().to_string()));
        let path = with_query(&format!("/items/{id}"), &pairs);
        let request = self.request(HttpMethod::Put, &path, Some(token));
        with_image(request, input)
    }

    pub fn build_delete_item(&self, token: &str, id: u64) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/items/{id}"), Some(token))
    }

    pub fn build_search_items(&self, token: Option<&str>, filters: &SearchFilters) -> HttpRequest {
        let path = with_query("/items/search", &filters.query_pairs());
        self.request(HttpMethod::Get, &path, token)
    }

    pub fn build_similar_items(&self, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, "/api/similar-items", token)
    }

    pub fn build_mark_suggestion_viewed(&self, token: Option<&str>, id: u64) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("/api/similar-items/{id}/view"), token)
    }

    // --- messages ---------------------------------------------------------

    pub fn build_send_message(
        &self,
        token: Option<&str>,
        message: &SendMessageRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/messages", token, message)
    }

    pub fn build_list_messages(&self, token: Option<&str>, conversation_id: Option<u64>) -> HttpRequest {
        let path = match conversation_id {
            Some(id) => with_query("/messages", &[("conversationId", id.to_string())]),
            None => "/messages".to_string(),
        };
        self.request(HttpMethod::Get, &path, token)
    }

    pub fn build_unread_count(&self, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, "/messages/unread-count", token)
    }

    pub fn build_list_conversations(&self, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, "/messages/conversations", token)
    }

    pub fn build_conversation_messages(&self, token: Option<&str>, conversation_id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/messages/conversations/{conversation_id}"), token)
    }

    // --- helpers ----------------------------------------------------------

    fn request(&self, method: HttpMethod, path: &str, token: Option<&str>) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        token: Option<&str>,
        body: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(body).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut request = self.request(method, path, token);
        request
            .headers
            .push(("content-type".to_string(), "application/json".to_string()));
        request.body = Some(body);
        Ok(request)
    }
}

fn with_query(path: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    let query = pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, QUERY_COMPONENT),
                utf8_percent_encode(v, QUERY_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}

fn with_form(mut request: HttpRequest, form: &MultipartForm) -> HttpRequest {
    request.headers.push(("content-type".to_string(), form.content_type()));
    request.body = Some(form.encode());
    request
}

fn with_image(request: HttpRequest, input: &CreateItemRequest) -> HttpRequest {
    match &input.image {
        Some(image) => with_form(request, &MultipartForm::new().file("image", image.clone())),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemStatus, ItemType};
    use crate::types::Upload;

    fn client() -> LostFoundClient {
        LostFoundClient::new("http://localhost:8080")
    }

    fn wallet() -> CreateItemRequest {
        CreateItemRequest {
            name: "Black wallet".to_string(),
            description: "Lost near the library".to_string(),
            event_time: "2024-01-01T10:00:00".to_string(),
            location: "40.1,116.2".to_string(),
            item_type: ItemType::Lost,
            site: "Library".to_string(),
            status: None,
            image: None,
        }
    }

    #[test]
    fn build_login_produces_json_post_without_auth() {
        let creds = Credentials {
            username: "ann".to_string(),
            password: "pw".to_string(),
        };
        let req = client().build_login(&creds).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8080/auth/login");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.header("authorization").is_none());
        let body: serde_json::Value = serde_json::from_str(req.body_str().unwrap()).unwrap();
        assert_eq!(body["username"], "ann");
        assert_eq!(body["password"], "pw");
    }

    #[test]
    fn token_becomes_bearer_header() {
        let req = client().build_list_items(Some("abc"));
        assert_eq!(req.header("Authorization"), Some("Bearer abc"));
        assert!(req.body.is_none());
    }

    #[test]
    fn empty_token_is_not_sent() {
        let req = client().build_list_items(Some(""));
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_get_profile_switches_on_user_id() {
        assert_eq!(client().build_get_profile(None, None).url, "http://localhost:8080/profile");
        assert_eq!(
            client().build_get_profile(None, Some(7)).url,
            "http://localhost:8080/profile/user/7"
        );
    }

    #[test]
    fn build_create_item_puts_fields_in_query_and_sends_no_body() {
        let req = client().build_create_item("t", &wallet());
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.url,
            "http://localhost:8080/items?name=Black%20wallet&description=Lost%20near%20the%20library\
             &eventTime=2024-01-01T10%3A00%3A00&location=40.1%2C116.2&type=LOST&site=Library"
        );
        assert!(req.body.is_none());
        assert!(req.header("content-type").is_none());
    }

    #[test]
    fn build_create_item_with_image_sends_multipart() {
        let mut input = wallet();
        input.image = Some(Upload::new("w.jpg", "image/jpeg", vec![1, 2, 3]));
        let req = client().build_create_item("t", &input);
        assert!(req
            .header("content-type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
        let body = req.body.unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(r#"name="image"; filename="w.jpg""#));
    }

    #[test]
    fn build_update_item_defaults_status_to_active() {
        let req = client().build_update_item("t", 3, &wallet());
        assert_eq!(req.method, HttpMethod::Put);
        assert!(req.url.starts_with("http://localhost:8080/items/3?"));
        assert!(req.url.ends_with("&status=ACTIVE"));

        let mut input = wallet();
        input.status = Some(ItemStatus::Resolved);
        let req = client().build_update_item("t", 3, &input);
        assert!(req.url.ends_with("&status=RESOLVED"));
    }

    #[test]
    fn build_delete_item_requires_token() {
        let req = client().build_delete_item("t", 9);
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "http://localhost:8080/items/9");
        assert_eq!(req.header("authorization"), Some("Bearer t"));
    }

    #[test]
    fn build_search_without_filters_has_no_query() {
        let req = client().build_search_items(None, &SearchFilters::default());
        assert_eq!(req.url, "http://localhost:8080/items/search");
    }

    #[test]
    fn build_list_messages_with_conversation() {
        let req = client().build_list_messages(None, Some(5));
        assert_eq!(req.url, "http://localhost:8080/messages?conversationId=5");
    }

    #[test]
    fn build_send_message_omits_absent_anonymous_flag() {
        let msg = SendMessageRequest {
            receiver_id: 2,
            item_id: 1,
            content: "Is this mine?".to_string(),
            anonymous: None,
        };
        let req = client().build_send_message(Some("t"), &msg).unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body_str().unwrap()).unwrap();
        assert_eq!(body["receiverId"], 2);
        assert!(body.get("anonymous").is_none());
    }

    #[test]
    fn suggestion_endpoints() {
        assert_eq!(client().build_similar_items(None).url, "http://localhost:8080/api/similar-items");
        let req = client().build_mark_suggestion_viewed(None, 4);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8080/api/similar-items/4/view");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = LostFoundClient::new("http://localhost:8080/");
        assert_eq!(client.build_list_items(None).url, "http://localhost:8080/items");
        assert_eq!(client.uploads_url(), "http://localhost:8080/uploads");
    }
}
