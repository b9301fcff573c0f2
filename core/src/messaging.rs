//! Messaging: send, list, conversations, unread count.
//!
//! None of these touch the session or the item list except through the 401
//! teardown in `dispatch`.

use serde_json::Value;
use tracing::info;

use crate::context::{AppContext, OnUnauthorized};
use crate::error::ApiError;
use crate::http::Transport;
use crate::outcome::Outcome;
use crate::response::Envelope;
use crate::storage::Storage;
use crate::types::{lenient_id, ConversationSummary, MessageResponse, SendMessageRequest};

/// The unread count is either a bare number or `{"count": n}`.
fn unread_count(envelope: &Envelope) -> u64 {
    match &envelope.data {
        Value::Object(map) => map.get("count").and_then(lenient_id).unwrap_or(0),
        other => lenient_id(other).unwrap_or(0),
    }
}

impl<T: Transport, S: Storage> AppContext<T, S> {
    pub fn send_message(&mut self, message: &SendMessageRequest) -> Outcome<MessageResponse> {
        self.try_send_message(message)
            .map(|sent| ("message sent".to_string(), sent))
            .into()
    }

    fn try_send_message(&mut self, message: &SendMessageRequest) -> Result<MessageResponse, ApiError> {
        let token = self.token();
        let request = self.client.build_send_message(token.as_deref(), message)?;
        let envelope = self.dispatch(request, OnUnauthorized::Logout)?;
        let sent: MessageResponse = envelope.decode()?;
        info!(item_id = message.item_id, receiver_id = message.receiver_id, "message sent");
        Ok(sent)
    }

    /// Messages of one conversation, or all of the user's messages.
    pub fn get_messages(&mut self, conversation_id: Option<u64>) -> Outcome<Vec<MessageResponse>> {
        let token = self.token();
        let request = self.client.build_list_messages(token.as_deref(), conversation_id);
        self.dispatch(request, OnUnauthorized::Logout)
            .and_then(|envelope| envelope.decode_list::<MessageResponse>())
            .map(|messages| ("messages loaded".to_string(), messages))
            .into()
    }

    pub fn get_conversations(&mut self) -> Outcome<Vec<ConversationSummary>> {
        let token = self.token();
        let request = self.client.build_list_conversations(token.as_deref());
        self.dispatch(request, OnUnauthorized::Logout)
            .and_then(|envelope| envelope.decode_list::<ConversationSummary>())
            .map(|conversations| ("conversations loaded".to_string(), conversations))
            .into()
    }

    pub fn get_conversation_messages(&mut self, conversation_id: u64) -> Outcome<Vec<MessageResponse>> {
        let token = self.token();
        let request = self
            .client
            .build_conversation_messages(token.as_deref(), conversation_id);
        self.dispatch(request, OnUnauthorized::Logout)
            .and_then(|envelope| envelope.decode_list::<MessageResponse>())
            .map(|messages| ("messages loaded".to_string(), messages))
            .into()
    }

    /// Number of unread messages; missing or odd payloads count as zero.
    pub fn get_unread_message_count(&mut self) -> Outcome<u64> {
        let token = self.token();
        let request = self.client.build_unread_count(token.as_deref());
        self.dispatch(request, OnUnauthorized::Logout)
            .map(|envelope| ("unread count loaded".to_string(), unread_count(&envelope)))
            .into()
    }
}
