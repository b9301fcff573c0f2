//! DTOs shared by the session and messaging operations.
//!
//! # Design
//! Backend payloads are loosely shaped: numeric ids sometimes arrive as
//! strings and most fields are optional or `null`. Records default every
//! missing or `null` field instead of failing, and ids go through
//! `lenient_id`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Read an id that may be a JSON number or a numeric string.
///
/// Strings contribute their leading run of digits, so `"12abc"` is `12`.
pub fn lenient_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_id(&value).unwrap_or(0))
}

pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_id(&value))
}

/// `null` or a value of the wrong shape becomes `T::default()`.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// The logged-in user, or another user's public profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Request payload for `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Fields of a profile update. Empty or absent fields are not sent.
///
/// `avatar` is either a `data:` URL, uploaded as a binary file part, or any
/// other string, sent as a plain text part.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub phone_number: Option<String>,
    pub student_id: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

/// A file attached to a multipart request.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Decode a `data:<mime>[;base64],<payload>` URL into an upload.
    pub fn from_data_url(url: &str, file_name: &str) -> Result<Self, ApiError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ApiError::InvalidDataUrl("missing data: scheme".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| ApiError::InvalidDataUrl("missing ',' separator".to_string()))?;

        let (mime, is_base64) = match meta.strip_suffix(";base64") {
            Some(mime) => (mime, true),
            None => (meta, false),
        };
        let bytes = if is_base64 {
            STANDARD
                .decode(payload.trim())
                .map_err(|e| ApiError::InvalidDataUrl(e.to_string()))?
        } else {
            percent_decode_str(payload).collect()
        };
        let content_type = if mime.is_empty() { "text/plain" } else { mime };

        Ok(Self::new(file_name, content_type, bytes))
    }
}

/// Request payload for `POST /messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: u64,
    pub item_id: u64,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<bool>,
}

/// A single message as returned by the messaging endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageResponse {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    #[serde(deserialize_with = "deserialize_id")]
    pub sender_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub sender_name: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub receiver_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub receiver_name: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub item_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub item_name: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub conversation_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub content: String,
    #[serde(deserialize_with = "lenient")]
    pub sent_time: String,
    #[serde(deserialize_with = "lenient")]
    pub read: bool,
    #[serde(deserialize_with = "lenient")]
    pub anonymous: bool,
    #[serde(deserialize_with = "lenient")]
    pub outgoing: bool,
}

/// One row of the conversation list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    #[serde(deserialize_with = "deserialize_id")]
    pub item_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub item_name: String,
    #[serde(deserialize_with = "lenient")]
    pub last_message_content: String,
    #[serde(deserialize_with = "lenient")]
    pub last_message_time: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub other_user_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub other_username: String,
    #[serde(deserialize_with = "lenient")]
    pub anonymous: bool,
    #[serde(deserialize_with = "lenient")]
    pub has_unread: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A recommendation pairing one of the user's items with a similar one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimilarItemSuggestion {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    #[serde(deserialize_with = "deserialize_id")]
    pub source_item_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub source_item_name: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub suggested_item_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub suggested_item_name: String,
    #[serde(deserialize_with = "lenient")]
    pub suggested_item_description: String,
    #[serde(deserialize_with = "lenient")]
    pub suggested_item_image_url: String,
    #[serde(deserialize_with = "lenient")]
    pub similarity_score: f64,
    #[serde(deserialize_with = "lenient")]
    pub text_similarity: f64,
    #[serde(deserialize_with = "lenient")]
    pub image_similarity: f64,
    #[serde(deserialize_with = "lenient")]
    pub viewed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkViewedResponse {
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(lenient_id(&json!(7)), Some(7));
        assert_eq!(lenient_id(&json!("42")), Some(42));
        assert_eq!(lenient_id(&json!("12abc")), Some(12));
        assert_eq!(lenient_id(&json!("abc")), None);
        assert_eq!(lenient_id(&json!(null)), None);
        assert_eq!(lenient_id(&json!(-3)), None);
    }

    #[test]
    fn stored_user_with_string_id_deserializes() {
        let user: User =
            serde_json::from_str(r#"{"id":"15","name":"Ann","username":"ann"}"#).unwrap();
        assert_eq!(user.id, 15);
        assert_eq!(user.username, "ann");
        assert!(user.avatar.is_none());
    }

    #[test]
    fn user_serializes_camel_case_and_skips_absent_fields() {
        let user = User {
            id: 1,
            name: "Ann".into(),
            username: "ann".into(),
            phone_number: Some("123".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["phoneNumber"], "123");
        assert!(json.get("email").is_none());
        assert!(json.get("avatar").is_none());
    }

    #[test]
    fn base64_data_url_decodes_to_bytes() {
        let upload = Upload::from_data_url("data:image/png;base64,aGVsbG8=", "avatar.jpg").unwrap();
        assert_eq!(upload.bytes, b"hello");
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.file_name, "avatar.jpg");
    }

    #[test]
    fn plain_data_url_is_percent_decoded() {
        let upload = Upload::from_data_url("data:,a%20b", "note.txt").unwrap();
        assert_eq!(upload.bytes, b"a b");
        assert_eq!(upload.content_type, "text/plain");
    }

    #[test]
    fn malformed_data_urls_are_rejected() {
        assert!(matches!(
            Upload::from_data_url("https://example.com/a.jpg", "a.jpg"),
            Err(ApiError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            Upload::from_data_url("data:image/png;base64", "a.jpg"),
            Err(ApiError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            Upload::from_data_url("data:image/png;base64,@@@", "a.jpg"),
            Err(ApiError::InvalidDataUrl(_))
        ));
    }

    #[test]
    fn message_defaults_missing_fields() {
        let message: MessageResponse = serde_json::from_str(r#"{"id":3,"content":"hi"}"#).unwrap();
        assert_eq!(message.id, 3);
        assert_eq!(message.content, "hi");
        assert!(!message.read);
    }

    #[test]
    fn null_fields_read_as_defaults() {
        let message: MessageResponse = serde_json::from_str(
            r#"{"id":3,"senderName":null,"itemId":"9","sentTime":null,"read":null}"#,
        )
        .unwrap();
        assert_eq!(message.item_id, 9);
        assert_eq!(message.sender_name, "");
        assert!(!message.read);

        let suggestion: SimilarItemSuggestion = serde_json::from_str(
            r#"{"id":1,"suggestedItemImageUrl":null,"similarityScore":null,"viewed":null}"#,
        )
        .unwrap();
        assert_eq!(suggestion.suggested_item_image_url, "");
        assert_eq!(suggestion.similarity_score, 0.0);
    }

    #[test]
    fn conversation_keeps_unknown_fields() {
        let conversation: ConversationSummary =
            serde_json::from_str(r#"{"id":1,"hasUnread":true,"pinned":true}"#).unwrap();
        assert!(conversation.has_unread);
        assert_eq!(conversation.extra["pinned"], true);
    }
}
