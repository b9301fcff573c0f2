//! In-memory backend state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

pub type Db = Arc<RwLock<Store>>;

pub fn new_db() -> Db {
    Arc::new(RwLock::new(Store::default()))
}

/// UTC timestamp in the `yyyy-mm-ddThh:mm:ss` form the client expects.
pub fn now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub student_id: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserRecord {
    pub fn profile(&self) -> Value {
        json!({
            "userId": self.id,
            "username": self.username,
            "studentId": self.student_id,
            "gender": self.gender,
            "email": self.email,
            "phoneNumber": self.phone_number,
            "avatarUrl": self.avatar_url,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub event_time: String,
    pub location: String,
    pub site: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub image_url: Option<String>,
    pub status: String,
    pub user_id: u64,
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug)]
pub struct MessageRecord {
    pub id: u64,
    pub conversation_id: u64,
    pub sender_id: u64,
    pub receiver_id: u64,
    pub content: String,
    pub sent_time: String,
    pub read: bool,
}

#[derive(Clone, Debug)]
pub struct ConversationRecord {
    pub id: u64,
    pub item_id: u64,
    /// Participants, lower id first.
    pub users: (u64, u64),
    pub anonymous: bool,
}

impl ConversationRecord {
    pub fn includes(&self, user_id: u64) -> bool {
        self.users.0 == user_id || self.users.1 == user_id
    }

    pub fn other(&self, user_id: u64) -> u64 {
        if self.users.0 == user_id {
            self.users.1
        } else {
            self.users.0
        }
    }
}

#[derive(Clone, Debug)]
pub struct SuggestionRecord {
    pub id: u64,
    /// The user the suggestion is shown to.
    pub owner_id: u64,
    pub source_item_id: u64,
    pub suggested_item_id: u64,
    pub text_similarity: f64,
    pub viewed: bool,
}

#[derive(Clone, Debug)]
pub struct StoredUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    pub users: BTreeMap<u64, UserRecord>,
    /// Bearer token to user id.
    pub tokens: HashMap<String, u64>,
    pub items: BTreeMap<u64, ItemRecord>,
    pub conversations: Vec<ConversationRecord>,
    pub messages: Vec<MessageRecord>,
    pub suggestions: Vec<SuggestionRecord>,
    pub uploads: HashMap<String, StoredUpload>,
}

impl Store {
    /// Ids are shared across all record kinds and start at 1.
    pub fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn user_by_name(&self, username: &str) -> Option<&UserRecord> {
        self.users.values().find(|u| u.username == username)
    }

    pub fn username(&self, id: u64) -> String {
        self.users
            .get(&id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    pub fn issue_token(&mut self, user_id: u64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    /// Store an upload and return the path clients resolve under `/uploads`.
    pub fn save_upload(&mut self, file_name: &str, content_type: String, bytes: Vec<u8>) -> String {
        let name = format!("{}-{}", Uuid::new_v4().simple(), sanitize(file_name));
        self.uploads.insert(name.clone(), StoredUpload { content_type, bytes });
        name
    }
}

fn sanitize(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
