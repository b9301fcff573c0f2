//! Item reports: wire form, view form and the conversion between them.
//!
//! The backend speaks uppercase enums (`FOUND`, `ACTIVE`) and a single
//! `"lat,lng"` location string. The view form lower-cases the enums, parses
//! the location into coordinates and resolves image paths against the
//! upload base.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{deserialize_id, deserialize_optional_id, lenient, Upload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "found", alias = "FOUND", alias = "Found")]
    Found,
    #[serde(rename = "lost", alias = "LOST", alias = "Lost")]
    Lost,
}

impl ItemType {
    pub fn as_wire(&self) -> &'static str {
        match self {
            ItemType::Found => "FOUND",
            ItemType::Lost => "LOST",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    #[default]
    #[serde(rename = "active", alias = "ACTIVE", alias = "Active")]
    Active,
    #[serde(rename = "resolved", alias = "RESOLVED", alias = "Resolved")]
    Resolved,
}

impl ItemStatus {
    pub fn as_wire(&self) -> &'static str {
        match self {
            ItemStatus::Active => "ACTIVE",
            ItemStatus::Resolved => "RESOLVED",
        }
    }
}

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Parse the backend's `"lat,lng"` form. Returns `None` for anything that
    /// is not exactly two finite numbers separated by one comma.
    pub fn parse(raw: &str) -> Option<Self> {
        let (lat, lng) = raw.split_once(',')?;
        if lng.contains(',') {
            return None;
        }
        let lat: f64 = lat.trim().parse().ok()?;
        let lng: f64 = lng.trim().parse().ok()?;
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        Some(Self { lat, lng })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// An item report as the backend sends it.
///
/// Every field tolerates `null` or an unexpected shape, so one odd record
/// never fails a whole list. An unknown `type` reads as `None`, an unknown
/// `status` as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient")]
    pub event_time: String,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub site: String,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub item_type: Option<ItemType>,
    #[serde(default, deserialize_with = "lenient")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<ItemStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub user_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: Option<String>,
}

impl ItemResponse {
    /// Convert to the view form. `uploads` is the base URL image paths are
    /// resolved against. A missing or unknown type reads as lost.
    pub fn to_item(&self, uploads: &str) -> Item {
        Item {
            id: self.id,
            title: self.name.clone(),
            description: self.description.clone(),
            item_type: self.item_type.unwrap_or(ItemType::Lost),
            status: Some(self.status.unwrap_or_default()),
            location: self.location.as_deref().and_then(Location::parse),
            site: self.site.clone(),
            contact: String::new(),
            date: event_date(&self.event_time).to_string(),
            image: self
                .image_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .map(|url| format!("{uploads}/{url}"))
                .unwrap_or_default(),
            user_id: self.user_id,
            user_name: self.username.clone(),
            user_avatar: Some(String::new()),
            created_at: self.created_at.clone(),
        }
    }
}

/// The date part of an ISO timestamp (`2024-01-01T10:00:00` -> `2024-01-01`).
pub fn event_date(event_time: &str) -> &str {
    event_time.split('T').next().unwrap_or_default()
}

/// An item report as the rest of the application sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: u64,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub site: String,
    pub contact: String,
    pub date: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Parameters for creating or updating an item report.
///
/// The text fields travel as query parameters; only `image` goes in the
/// body, as a multipart part.
#[derive(Debug, Clone)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: String,
    pub event_time: String,
    /// Wire form `"lat,lng"`.
    pub location: String,
    pub item_type: ItemType,
    pub site: String,
    pub status: Option<ItemStatus>,
    pub image: Option<Upload>,
}

impl CreateItemRequest {
    /// Query parameters shared by create and update, in the backend's order.
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("description", self.description.clone()),
            ("eventTime", self.event_time.clone()),
            ("location", self.location.clone()),
            ("type", self.item_type.as_wire().to_string()),
            ("site", self.site.clone()),
        ]
    }
}

/// Filters for `GET /items/search`. Empty filters are omitted.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub keyword: Option<String>,
    pub item_type: Option<ItemType>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
}

impl SearchFilters {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(keyword) = self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            pairs.push(("keyword", keyword.to_string()));
        }
        if let Some(item_type) = self.item_type {
            pairs.push(("type", item_type.as_wire().to_string()));
        }
        if let Some(start) = self.start_date.as_deref().filter(|d| !d.is_empty()) {
            pairs.push(("startDate", start.to_string()));
        }
        if let Some(end) = self.end_date.as_deref().filter(|d| !d.is_empty()) {
            pairs.push(("endDate", end.to_string()));
        }
        if let Some(location) = self.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            pairs.push(("location", location.to_string()));
        }
        pairs
    }
}
