//! `/items` routes and similar-item matching.

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Extension,
};
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::form::{read_form, FormData};
use crate::reply::{fail, forbidden, not_found, ok, Reply};
use crate::state::{now, Db, ItemRecord, Store, SuggestionRecord};

/// Minimum word overlap for two items to be suggested to each other.
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemParams {
    pub name: String,
    pub description: String,
    pub event_time: String,
    pub location: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub site: String,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
    pub keyword: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
}

fn validate(params: &ItemParams) -> Result<(), Reply> {
    if params.name.trim().is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "name is required"));
    }
    if params.item_type != "FOUND" && params.item_type != "LOST" {
        return Err(fail(StatusCode::BAD_REQUEST, "type must be FOUND or LOST"));
    }
    if let Some(status) = &params.status {
        if status != "ACTIVE" && status != "RESOLVED" {
            return Err(fail(StatusCode::BAD_REQUEST, "status must be ACTIVE or RESOLVED"));
        }
    }
    Ok(())
}

fn save_image(store: &mut Store, form: &FormData) -> Option<String> {
    form.files
        .get("image")
        .map(|file| store.save_upload(&file.file_name, file.content_type.clone(), file.bytes.to_vec()))
}

/// Newest first.
fn newest_first<'a>(items: impl DoubleEndedIterator<Item = &'a ItemRecord>) -> Vec<ItemRecord> {
    items.rev().cloned().collect()
}

pub async fn list_items(State(db): State<Db>) -> Reply {
    let store = db.read().await;
    ok("items loaded", newest_first(store.items.values()))
}

pub async fn user_items(State(db): State<Db>, Extension(auth): Extension<AuthUser>) -> Reply {
    let store = db.read().await;
    let mine = newest_first(store.items.values().filter(|item| item.user_id == auth.id));
    ok("user items loaded", mine)
}

pub async fn get_item(State(db): State<Db>, Path(id): Path<u64>) -> Reply {
    let store = db.read().await;
    match store.items.get(&id) {
        Some(item) => ok("item loaded", item),
        None => not_found("item"),
    }
}

pub async fn create_item(
    State(db): State<Db>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ItemParams>,
    req: Request,
) -> Reply {
    if let Err(reply) = validate(&params) {
        return reply;
    }
    let form = match read_form(req).await {
        Ok(form) => form,
        Err(reply) => return reply,
    };

    let mut store = db.write().await;
    let image_url = save_image(&mut store, &form);
    let id = store.next_id();
    let timestamp = now();
    let item = ItemRecord {
        id,
        name: params.name,
        description: params.description,
        event_time: params.event_time,
        location: params.location,
        site: params.site,
        item_type: params.item_type,
        image_url,
        status: params.status.unwrap_or_else(|| "ACTIVE".to_string()),
        user_id: auth.id,
        username: auth.username.clone(),
        created_at: timestamp.clone(),
        updated_at: timestamp,
    };
    store.items.insert(id, item.clone());
    let matched = suggest_similar(&mut store, id);

    info!(item_id = id, user_id = auth.id, matched, "item created");
    ok("item published", item)
}

pub async fn update_item(
    State(db): State<Db>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<u64>,
    Query(params): Query<ItemParams>,
    req: Request,
) -> Reply {
    if let Err(reply) = validate(&params) {
        return reply;
    }
    let form = match read_form(req).await {
        Ok(form) => form,
        Err(reply) => return reply,
    };

    let mut store = db.write().await;
    match store.items.get(&id) {
        None => return not_found("item"),
        Some(item) if item.user_id != auth.id => return forbidden(),
        Some(_) => {}
    }
    let image_url = save_image(&mut store, &form);

    let Some(item) = store.items.get_mut(&id) else {
        return not_found("item");
    };
    item.name = params.name;
    item.description = params.description;
    item.event_time = params.event_time;
    item.location = params.location;
    item.site = params.site;
    item.item_type = params.item_type;
    if let Some(status) = params.status {
        item.status = status;
    }
    if image_url.is_some() {
        item.image_url = image_url;
    }
    item.updated_at = now();

    info!(item_id = id, "item updated");
    ok("item updated", item.clone())
}

pub async fn delete_item(
    State(db): State<Db>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Reply {
    let mut store = db.write().await;
    match store.items.get(&id) {
        None => return not_found("item"),
        Some(item) if item.user_id != auth.id => return forbidden(),
        Some(_) => {}
    }
    store.items.remove(&id);
    store
        .suggestions
        .retain(|s| s.source_item_id != id && s.suggested_item_id != id);

    info!(item_id = id, "item deleted");
    ok("item deleted", serde_json::Value::Null)
}

pub async fn search_items(State(db): State<Db>, Query(params): Query<SearchParams>) -> Reply {
    let store = db.read().await;
    let found = newest_first(store.items.values().filter(|item| matches(item, &params)));
    ok("search completed", found)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn matches(item: &ItemRecord, params: &SearchParams) -> bool {
    if let Some(keyword) = non_empty(&params.keyword) {
        let keyword = keyword.to_lowercase();
        if !item.name.to_lowercase().contains(&keyword)
            && !item.description.to_lowercase().contains(&keyword)
        {
            return false;
        }
    }
    if let Some(item_type) = non_empty(&params.item_type) {
        if !item.item_type.eq_ignore_ascii_case(item_type) {
            return false;
        }
    }
    // Dates compare on the `yyyy-mm-dd` prefix of the event time.
    let date = item.event_time.split('T').next().unwrap_or_default();
    if let Some(start) = non_empty(&params.start_date) {
        if date < start {
            return false;
        }
    }
    if let Some(end) = non_empty(&params.end_date) {
        if date > end {
            return false;
        }
    }
    if let Some(location) = non_empty(&params.location) {
        let location = location.to_lowercase();
        if !item.site.to_lowercase().contains(&location)
            && !item.location.to_lowercase().contains(&location)
        {
            return false;
        }
    }
    true
}

fn words(item: &ItemRecord) -> HashSet<String> {
    format!("{} {}", item.name, item.description)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard overlap of the name and description words.
pub fn text_similarity(a: &ItemRecord, b: &ItemRecord) -> f64 {
    let (a, b) = (words(a), words(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Pair a new item with active items of the opposite type owned by someone
/// else. Each match yields one suggestion per owner. Returns the match count.
fn suggest_similar(store: &mut Store, item_id: u64) -> usize {
    let Some(item) = store.items.get(&item_id).cloned() else {
        return 0;
    };
    let candidates: Vec<(u64, u64, f64)> = store
        .items
        .values()
        .filter(|other| {
            other.id != item.id
                && other.user_id != item.user_id
                && other.item_type != item.item_type
                && other.status == "ACTIVE"
        })
        .map(|other| (other.id, other.user_id, text_similarity(&item, other)))
        .filter(|(_, _, score)| *score >= SIMILARITY_THRESHOLD)
        .collect();

    for (other_id, other_owner, score) in &candidates {
        for (owner_id, source, suggested) in [
            (item.user_id, item.id, *other_id),
            (*other_owner, *other_id, item.id),
        ] {
            let id = store.next_id();
            store.suggestions.push(SuggestionRecord {
                id,
                owner_id,
                source_item_id: source,
                suggested_item_id: suggested,
                text_similarity: *score,
                viewed: false,
            });
        }
    }
    candidates.len()
}
