use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::Document;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchLocationsParams {
    /// Free-text query, e.g. "old castle by the sea".
    pub query: String,
    /// Maximum number of results to return (default: 10, max: 50).
    pub limit: Option<u32>,
    /// Topic label to narrow results to, as listed in `topics` of a previous search.
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BrowseLocationsParams {
    /// Zero-based position of the first item (default: 0).
    pub offset: Option<u32>,
    /// Items per page (default: 10, max: 100).
    pub limit: Option<u32>,
    /// Random order instead of catalog order.
    pub shuffle: Option<bool>,
    /// Optional query narrowing the listing.
    pub query: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FindSimilarParams {
    /// Document id from a previous search or browse result.
    pub id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TopicDocumentsParams {
    /// Member document ids of a topic.
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocationSummary {
    pub id: String,
    pub title: String,
    pub country: Option<String>,
    pub score: Option<f64>,
    pub url: Option<String>,
    pub address: Option<String>,
    /// Labels of the topics this location belongs to.
    pub topics: Vec<String>,
    /// First portion of the description or body text.
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicInfo {
    pub label: String,
    pub document_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchLocationsResponse {
    pub results: Vec<LocationSummary>,
    pub topics: Vec<TopicInfo>,
    /// The topic the results were narrowed to, if any.
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BrowseLocationsResponse {
    pub items: Vec<LocationSummary>,
    pub total: usize,
    pub offset: usize,
    /// Offset of the following page, absent on the last page.
    pub next_offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocationListResponse {
    pub results: Vec<LocationSummary>,
}

/// Full record of a location, returned by topic document lookups.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocationDetailResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub image: Option<String>,
    pub country: Option<String>,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub location_description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<Document> for LocationDetailResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            content: doc.content,
            url: doc.url,
            image: doc.image,
            country: doc.country,
            location_name: doc.location_name,
            location_address: doc.location_address,
            location_description: doc.location_description,
            latitude: doc.latitude,
            longitude: doc.longitude,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicDocumentsResponse {
    pub documents: Vec<LocationDetailResponse>,
}
