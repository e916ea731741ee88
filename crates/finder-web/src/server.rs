use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use finder_common::catalog::Catalog;
use finder_common::model::{BrowsePage, Document, SearchResponse};
use finder_common::paging::{parse_limit, BrowseRequest, MAX_SEARCH_LIMIT};
use finder_common::topics::{topic_counts, Selection};

use crate::config::DisplayConfig;
use crate::render::{self, BrowseView, SearchView, SimilarView};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub site_title: Arc<str>,
    pub display: DisplayConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(search))
        .route("/browse", get(browse))
        .route("/browse.html", get(browse))
        .route("/similar", get(similar))
        .route("/topic", get(topic))
        .route("/healthz", get(healthz))
        .fallback(search)
        .with_state(state)
}

// Every parameter is read as a string so malformed values fall back to defaults
// instead of rejecting the request.

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
    k: Option<String>,
    topic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BrowseParams {
    offset: Option<String>,
    limit: Option<String>,
    shuffle: Option<String>,
    q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SimilarParams {
    id: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TopicParams {
    ids: Option<String>,
    label: Option<String>,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Html<String> {
    let query = params.q.unwrap_or_default();
    let limit = parse_limit(params.k.as_deref(), state.display.search_limit, MAX_SEARCH_LIMIT);

    let response = if query.trim().is_empty() {
        SearchResponse::default()
    } else {
        state
            .catalog
            .search(&query, limit)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, query = %query, "search failed, rendering empty results");
                SearchResponse::default()
            })
    };

    // A topic from an older result set that this one does not offer is ignored.
    let selection = match Selection::from_param(params.topic.as_deref()) {
        Selection::Selected(label)
            if topic_counts(&response.clusters)
                .iter()
                .any(|(l, _)| *l == label) =>
        {
            Selection::Selected(label)
        }
        _ => Selection::Unselected,
    };

    Html(render::search_page(
        &state.site_title,
        &SearchView {
            query: &query,
            limit,
            results: &response.results,
            clusters: &response.clusters,
            selection: &selection,
            preview_chars: state.display.search_preview_chars,
        },
    ))
}

async fn browse(State(state): State<AppState>, Query(params): Query<BrowseParams>) -> Html<String> {
    let request = BrowseRequest::from_params(
        params.offset.as_deref(),
        params.limit.as_deref(),
        params.shuffle.as_deref(),
        params.q.as_deref(),
    );

    let page = state
        .catalog
        .browse(request.clone())
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, offset = request.offset, limit = request.limit, "browse failed, rendering empty page");
            BrowsePage::default()
        });

    Html(render::browse_page(
        &state.site_title,
        &BrowseView {
            request: &request,
            total: page.total,
            items: &page.items,
            preview_chars: state.display.browse_preview_chars,
        },
    ))
}

async fn similar(State(state): State<AppState>, Query(params): Query<SimilarParams>) -> Html<String> {
    let id = params.id.unwrap_or_default();
    let loaded: Result<Vec<Document>, &str> = if id.trim().is_empty() {
        Err("No document selected")
    } else {
        state
            .catalog
            .similar(&id)
            .await
            .map(|list| list.results)
            .map_err(|e| {
                warn!(error = %e, id = %id, "similar documents failed");
                "Failed to fetch similar documents"
            })
    };

    Html(render::similar_page(
        &state.site_title,
        &SimilarView {
            title: params.title.as_deref(),
            outcome: loaded.as_deref().map_err(|e| *e),
            preview_chars: state.display.similar_preview_chars,
        },
    ))
}

async fn topic(State(state): State<AppState>, Query(params): Query<TopicParams>) -> Html<String> {
    let ids: Vec<String> = params
        .ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    let docs = if ids.is_empty() {
        Vec::new()
    } else {
        state
            .catalog
            .topic_documents(&ids)
            .await
            .map(|list| list.results)
            .unwrap_or_else(|e| {
                warn!(error = %e, ids = ids.len(), "topic documents failed");
                Vec::new()
            })
    };

    Html(render::topic_page(
        &state.site_title,
        params.label.as_deref().unwrap_or_default(),
        &docs,
        state.display.browse_preview_chars,
    ))
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let cache = state.catalog.cache();
    let cache_status = if !cache.is_enabled() {
        "disabled"
    } else if cache.is_available().await {
        "up"
    } else {
        "down"
    };
    Json(json!({ "status": "ok", "cache": cache_status }))
}
