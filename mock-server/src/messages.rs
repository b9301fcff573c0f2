//! `/messages` routes. A conversation is keyed by item and participant pair.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::AuthUser;
use crate::reply::{fail, forbidden, not_found, ok, Reply};
use crate::state::{now, ConversationRecord, Db, MessageRecord, Store};

/// Display name of a sender in an anonymous conversation.
const ANONYMOUS_NAME: &str = "Anonymous";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub receiver_id: u64,
    pub item_id: u64,
    pub content: String,
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    pub conversation_id: Option<u64>,
}

fn display_name(store: &Store, conversation: &ConversationRecord, user_id: u64) -> String {
    if conversation.anonymous {
        ANONYMOUS_NAME.to_string()
    } else {
        store.username(user_id)
    }
}

/// A message as seen by `viewer`.
fn message_json(store: &Store, message: &MessageRecord, viewer: u64) -> Value {
    let conversation = store.conversations.iter().find(|c| c.id == message.conversation_id);
    let (item_id, anonymous) = conversation.map_or((0, false), |c| (c.item_id, c.anonymous));
    let name_of = |user_id| match conversation {
        Some(c) => display_name(store, c, user_id),
        None => store.username(user_id),
    };
    json!({
        "id": message.id,
        "senderId": message.sender_id,
        "senderName": name_of(message.sender_id),
        "receiverId": message.receiver_id,
        "receiverName": name_of(message.receiver_id),
        "itemId": item_id,
        "itemName": store.items.get(&item_id).map(|i| i.name.clone()).unwrap_or_default(),
        "conversationId": message.conversation_id,
        "content": message.content,
        "sentTime": message.sent_time,
        "read": message.read,
        "anonymous": anonymous,
        "outgoing": message.sender_id == viewer,
    })
}

fn conversation_messages(store: &mut Store, conversation_id: u64, viewer: u64) -> Vec<Value> {
    for message in store.messages.iter_mut() {
        if message.conversation_id == conversation_id && message.receiver_id == viewer {
            message.read = true;
        }
    }
    let store: &Store = store;
    store
        .messages
        .iter()
        .filter(|m| m.conversation_id == conversation_id)
        .map(|m| message_json(store, m, viewer))
        .collect()
}

pub async fn send_message(
    State(db): State<Db>,
    Extension(auth): Extension<AuthUser>,
    body: Option<Json<SendMessageBody>>,
) -> Reply {
    let Some(Json(input)) = body else {
        return fail(StatusCode::BAD_REQUEST, "invalid body");
    };
    if input.content.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "message content is required");
    }
    if input.receiver_id == auth.id {
        return fail(StatusCode::BAD_REQUEST, "cannot message yourself");
    }

    let mut store = db.write().await;
    if !store.users.contains_key(&input.receiver_id) {
        return not_found("receiver");
    }
    if !store.items.contains_key(&input.item_id) {
        return not_found("item");
    }

    let users = (auth.id.min(input.receiver_id), auth.id.max(input.receiver_id));
    let existing = store
        .conversations
        .iter()
        .find(|c| c.item_id == input.item_id && c.users == users)
        .map(|c| c.id);
    let conversation_id = match existing {
        Some(id) => id,
        None => {
            let id = store.next_id();
            store.conversations.push(ConversationRecord {
                id,
                item_id: input.item_id,
                users,
                anonymous: input.anonymous,
            });
            id
        }
    };

    let id = store.next_id();
    let message = MessageRecord {
        id,
        conversation_id,
        sender_id: auth.id,
        receiver_id: input.receiver_id,
        content: input.content,
        sent_time: now(),
        read: false,
    };
    store.messages.push(message.clone());

    info!(message_id = id, conversation_id, "message sent");
    ok("message sent", message_json(&store, &message, auth.id))
}

pub async fn list_messages(
    State(db): State<Db>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<MessagesQuery>,
) -> Reply {
    let mut store = db.write().await;
    match query.conversation_id {
        Some(conversation_id) => read_conversation(&mut store, conversation_id, auth.id),
        None => {
            let mine: Vec<Value> = store
                .messages
                .iter()
                .filter(|m| m.sender_id == auth.id || m.receiver_id == auth.id)
                .map(|m| message_json(&store, m, auth.id))
                .collect();
            ok("messages loaded", mine)
        }
    }
}

pub async fn unread_count(State(db): State<Db>, Extension(auth): Extension<AuthUser>) -> Reply {
    let store = db.read().await;
    let count = store
        .messages
        .iter()
        .filter(|m| m.receiver_id == auth.id && !m.read)
        .count();
    ok("unread count loaded", json!({ "count": count }))
}

pub async fn list_conversations(
    State(db): State<Db>,
    Extension(auth): Extension<AuthUser>,
) -> Reply {
    let store = db.read().await;
    let mut summaries: Vec<(String, Value)> = store
        .conversations
        .iter()
        .filter(|c| c.includes(auth.id))
        .map(|c| {
            let last = store.messages.iter().rev().find(|m| m.conversation_id == c.id);
            let last_time = last.map(|m| m.sent_time.clone()).unwrap_or_default();
            let other = c.other(auth.id);
            let summary = json!({
                "id": c.id,
                "itemId": c.item_id,
                "itemName": store.items.get(&c.item_id).map(|i| i.name.clone()).unwrap_or_default(),
                "lastMessageContent": last.map(|m| m.content.clone()).unwrap_or_default(),
                "lastMessageTime": last_time,
                "otherUserId": other,
                "otherUsername": display_name(&store, c, other),
                "anonymous": c.anonymous,
                "hasUnread": store
                    .messages
                    .iter()
                    .any(|m| m.conversation_id == c.id && m.receiver_id == auth.id && !m.read),
            });
            (last_time, summary)
        })
        .collect();
    summaries.sort_by(|a, b| b.0.cmp(&a.0));

    let summaries: Vec<Value> = summaries.into_iter().map(|(_, summary)| summary).collect();
    ok("conversations loaded", summaries)
}

pub async fn get_conversation(
    State(db): State<Db>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Reply {
    let mut store = db.write().await;
    read_conversation(&mut store, id, auth.id)
}

fn read_conversation(store: &mut Store, conversation_id: u64, viewer: u64) -> Reply {
    let access = store
        .conversations
        .iter()
        .find(|c| c.id == conversation_id)
        .map(|c| c.includes(viewer));
    match access {
        None => not_found("conversation"),
        Some(false) => forbidden(),
        Some(true) => ok("messages loaded", conversation_messages(store, conversation_id, viewer)),
    }
}
