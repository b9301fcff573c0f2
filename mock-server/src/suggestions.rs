//! `/api/similar-items` routes.

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::reply::{forbidden, not_found, ok, Reply};
use crate::state::{Db, Store, SuggestionRecord};

fn suggestion_json(store: &Store, suggestion: &SuggestionRecord) -> Option<Value> {
    let source = store.items.get(&suggestion.source_item_id)?;
    let suggested = store.items.get(&suggestion.suggested_item_id)?;
    Some(json!({
        "id": suggestion.id,
        "sourceItemId": source.id,
        "sourceItemName": source.name,
        "suggestedItemId": suggested.id,
        "suggestedItemName": suggested.name,
        "suggestedItemDescription": suggested.description,
        "suggestedItemImageUrl": suggested.image_url.clone().unwrap_or_default(),
        "similarityScore": suggestion.text_similarity,
        "textSimilarity": suggestion.text_similarity,
        "imageSimilarity": 0.0,
        "viewed": suggestion.viewed,
    }))
}

pub async fn list_suggestions(State(db): State<Db>, Extension(auth): Extension<AuthUser>) -> Reply {
    let store = db.read().await;
    let mine: Vec<Value> = store
        .suggestions
        .iter()
        .filter(|s| s.owner_id == auth.id)
        .filter_map(|s| suggestion_json(&store, s))
        .collect();
    ok("suggestions loaded", mine)
}

pub async fn mark_viewed(
    State(db): State<Db>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Reply {
    let mut store = db.write().await;
    let Some(suggestion) = store.suggestions.iter_mut().find(|s| s.id == id) else {
        return not_found("suggestion");
    };
    if suggestion.owner_id != auth.id {
        return forbidden();
    }
    suggestion.viewed = true;
    ok("suggestion marked as viewed", json!({ "id": id, "viewed": true }))
}
