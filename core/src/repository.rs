//! Item repository: CRUD and search over item reports, plus similar-item
//! suggestions.
//!
//! Writes need a stored token and fail with `NotLoggedIn` before any
//! request is built when there is none. The shared list is replaced by
//! `get_all_items`, prepended to by `create_item` and spliced by
//! `delete_item`; search results are returned without touching it.

use tracing::info;

use crate::context::{AppContext, OnUnauthorized};
use crate::error::ApiError;
use crate::http::Transport;
use crate::item::{CreateItemRequest, Item, ItemResponse, SearchFilters};
use crate::outcome::Outcome;
use crate::storage::Storage;
use crate::types::{MarkViewedResponse, SimilarItemSuggestion};

impl<T: Transport, S: Storage> AppContext<T, S> {
    /// Publish an item and prepend it to the shared list.
    pub fn create_item(&mut self, input: &CreateItemRequest) -> Outcome<ItemResponse> {
        self.try_create_item(input)
            .map(|created| ("item published".to_string(), created))
            .into()
    }

    fn try_create_item(&mut self, input: &CreateItemRequest) -> Result<ItemResponse, ApiError> {
        let token = self.require_token()?;
        let request = self.client.build_create_item(&token, input);
        let envelope = self.dispatch(request, OnUnauthorized::Logout)?;
        let created: ItemResponse = envelope.decode()?;

        let mut item = created.to_item(&self.client.uploads_url());
        item.user_avatar = Some(
            self.current_user()
                .and_then(|user| user.avatar.clone())
                .unwrap_or_default(),
        );
        info!(item_id = item.id, "item published");
        self.items.insert(0, item);
        Ok(created)
    }

    /// Fetch every item and replace the shared list with it.
    pub fn get_all_items(&mut self) -> Outcome<Vec<ItemResponse>> {
        self.try_get_all_items()
            .map(|all| ("items loaded".to_string(), all))
            .into()
    }

    fn try_get_all_items(&mut self) -> Result<Vec<ItemResponse>, ApiError> {
        let token = self.token();
        let request = self.client.build_list_items(token.as_deref());
        let envelope = self.dispatch(request, OnUnauthorized::Logout)?;
        let all: Vec<ItemResponse> = envelope.decode_array_or_empty()?;

        let uploads = self.client.uploads_url();
        self.items = all.iter().map(|item| item.to_item(&uploads)).collect();
        Ok(all)
    }

    /// The current user's own items, as sent by the backend.
    pub fn get_user_items(&mut self) -> Outcome<Vec<ItemResponse>> {
        let token = self.token();
        let request = self.client.build_user_items(token.as_deref());
        self.dispatch(request, OnUnauthorized::Logout)
            .and_then(|envelope| envelope.decode_array_or_empty::<ItemResponse>())
            .map(|mine| ("user items loaded".to_string(), mine))
            .into()
    }

    pub fn get_item_by_id(&mut self, id: u64) -> Outcome<Item> {
        self.try_get_item_by_id(id)
            .map(|item| ("item loaded".to_string(), item))
            .into()
    }

    fn try_get_item_by_id(&mut self, id: u64) -> Result<Item, ApiError> {
        let token = self.token();
        let request = self.client.build_get_item(token.as_deref(), id);
        let envelope = self.dispatch(request, OnUnauthorized::Logout)?;
        if !envelope.data.get("id").is_some_and(|id| !id.is_null()) {
            return Err(ApiError::DeserializationError(
                envelope.message_or("item payload has no id"),
            ));
        }

        let response: ItemResponse = envelope.decode()?;
        let mut item = response.to_item(&self.client.uploads_url());
        if item.created_at.is_none() && !response.event_time.is_empty() {
            item.created_at = Some(response.event_time.clone());
        }
        Ok(item)
    }

    /// Replace an item's fields. The shared list is left as is.
    pub fn update_item(&mut self, id: u64, input: &CreateItemRequest) -> Outcome<()> {
        self.try_update_item(id, input)
            .map(|()| ("item updated".to_string(), ()))
            .into()
    }

    fn try_update_item(&mut self, id: u64, input: &CreateItemRequest) -> Result<(), ApiError> {
        let token = self.require_token()?;
        let request = self.client.build_update_item(&token, id, input);
        self.dispatch(request, OnUnauthorized::Logout)?;
        info!(item_id = id, "item updated");
        Ok(())
    }

    /// Delete an item and drop the first matching entry from the shared list.
    pub fn delete_item(&mut self, id: u64) -> Outcome<()> {
        self.try_delete_item(id).into()
    }

    fn try_delete_item(&mut self, id: u64) -> Result<(String, ()), ApiError> {
        let token = self.require_token()?;
        let request = self.client.build_delete_item(&token, id);
        let envelope = self.dispatch(request, OnUnauthorized::Logout)?;

        if let Some(index) = self.items.iter().position(|item| item.id == id) {
            self.items.remove(index);
        }
        info!(item_id = id, "item deleted");
        Ok((envelope.message_or("item deleted"), ()))
    }

    /// Search items. Results are not merged into the shared list.
    pub fn search_items(&mut self, filters: &SearchFilters) -> Outcome<Vec<Item>> {
        let token = self.token();
        let request = self.client.build_search_items(token.as_deref(), filters);
        let uploads = self.client.uploads_url();
        self.dispatch(request, OnUnauthorized::Logout)
            .and_then(|envelope| envelope.decode_array_or_empty::<ItemResponse>())
            .map(|found| {
                let results: Vec<Item> = found.iter().map(|item| item.to_item(&uploads)).collect();
                (format!("search succeeded, found {} results", results.len()), results)
            })
            .into()
    }

    pub fn similar_item_suggestions(&mut self) -> Outcome<Vec<SimilarItemSuggestion>> {
        let token = self.token();
        let request = self.client.build_similar_items(token.as_deref());
        self.dispatch(request, OnUnauthorized::Logout)
            .and_then(|envelope| envelope.decode_array_or_empty::<SimilarItemSuggestion>())
            .map(|suggestions| ("suggestions loaded".to_string(), suggestions))
            .into()
    }

    pub fn mark_suggestion_viewed(&mut self, suggestion_id: u64) -> Outcome<MarkViewedResponse> {
        let token = self.token();
        let request = self.client.build_mark_suggestion_viewed(token.as_deref(), suggestion_id);
        self.dispatch(request, OnUnauthorized::Logout)
            .and_then(|envelope| envelope.decode::<MarkViewedResponse>())
            .map(|viewed| ("suggestion marked as viewed".to_string(), viewed))
            .into()
    }
}
