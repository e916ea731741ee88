use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};

use finder_common::catalog::Catalog;
use finder_common::mcp_api::{
    BrowseLocationsParams, BrowseLocationsResponse, FindSimilarParams, LocationListResponse,
    LocationSummary, SearchLocationsParams, SearchLocationsResponse, TopicDocumentsParams,
    TopicDocumentsResponse, TopicInfo,
};
use finder_common::model::{truncate_chars, Document, LocationDetail};
use finder_common::paging::{
    BrowseRequest, PageWindow, DEFAULT_BROWSE_LIMIT, DEFAULT_SEARCH_LIMIT, MAX_BROWSE_LIMIT,
    MAX_SEARCH_LIMIT,
};
use finder_common::topics::{filter_by_cluster, topic_counts, ClusterIndex, Selection};

#[derive(Clone)]
pub struct FinderServer {
    catalog: Catalog,
    summary_chars: usize,
    tool_router: ToolRouter<FinderServer>,
}

impl FinderServer {
    pub fn new(catalog: Catalog, summary_chars: usize) -> Self {
        Self {
            catalog,
            summary_chars,
            tool_router: Self::tool_router(),
        }
    }
}

/// Condense a document for tool output: the curated description when there is one,
/// otherwise the body, cut to `max_chars`.
fn summarize(doc: &Document, topics: &[String], max_chars: usize) -> LocationSummary {
    let (address, text) = match doc.detail() {
        LocationDetail::Curated {
            address,
            description,
        } => (address, description),
        LocationDetail::Addressed { address, body } => (Some(address), body),
        LocationDetail::Body(body) => (None, body),
    };
    LocationSummary {
        id: doc.id.clone(),
        title: doc.display_title().to_string(),
        country: doc.country.clone(),
        score: doc.score,
        url: doc.url.clone(),
        address: address.map(str::to_string),
        topics: topics.to_vec(),
        summary: truncate_chars(text.trim(), max_chars),
    }
}

/// Page-size parameter: missing or zero means the default, anything else is capped.
fn tool_limit(limit: Option<u32>, default: usize, max: usize) -> usize {
    limit
        .map(|n| n as usize)
        .filter(|&n| n > 0)
        .unwrap_or(default)
        .min(max)
}

#[tool_router]
impl FinderServer {
    #[tool(description = "Search filming locations and heritage sites by free text. Returns ranked results with their topics, plus the topic list for the result set. Pass `topic` (a label from `topics`) to narrow the results to one topic.")]
    async fn search_locations(
        &self,
        Parameters(params): Parameters<SearchLocationsParams>,
    ) -> Result<Json<SearchLocationsResponse>, String> {
        let query = params.query.trim();
        if query.is_empty() {
            return Err("query must not be empty".to_string());
        }
        let limit = tool_limit(params.limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);

        let response = self
            .catalog
            .search(query, limit)
            .await
            .map_err(|e| format!("search failed: {e}"))?;

        let topics = topic_counts(&response.clusters);
        let selection = Selection::from_param(params.topic.as_deref());
        if let Some(label) = selection.label() {
            if !topics.iter().any(|(l, _)| l == label) {
                let available: Vec<&str> = topics.iter().map(|(l, _)| l.as_str()).collect();
                return Err(format!(
                    "unknown topic: {label}. Available topics: {}",
                    if available.is_empty() {
                        "(none)".to_string()
                    } else {
                        available.join("; ")
                    }
                ));
            }
        }

        let index = ClusterIndex::build(&response.clusters);
        let results = filter_by_cluster(&response.results, &index, &selection)
            .iter()
            .map(|doc| summarize(doc, index.labels_for(&doc.id), self.summary_chars))
            .collect();

        Ok(Json(SearchLocationsResponse {
            results,
            topics: topics
                .into_iter()
                .map(|(label, document_count)| TopicInfo {
                    label,
                    document_count,
                })
                .collect(),
            topic: selection.label().map(str::to_string),
        }))
    }

    #[tool(description = "Page through the whole catalog, in catalog order or shuffled. Optionally narrow the listing with a query. Returns the items, the total count, and the offset of the next page.")]
    async fn browse_locations(
        &self,
        Parameters(params): Parameters<BrowseLocationsParams>,
    ) -> Result<Json<BrowseLocationsResponse>, String> {
        let request = BrowseRequest {
            offset: params.offset.unwrap_or(0) as usize,
            limit: tool_limit(params.limit, DEFAULT_BROWSE_LIMIT, MAX_BROWSE_LIMIT),
            shuffle: params.shuffle.unwrap_or(false),
            query: params
                .query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
        };

        let page = self
            .catalog
            .browse(request.clone())
            .await
            .map_err(|e| format!("browse failed: {e}"))?;

        let window = PageWindow::new(request.offset, request.limit, page.total);
        Ok(Json(BrowseLocationsResponse {
            items: page
                .items
                .iter()
                .map(|doc| summarize(doc, &[], self.summary_chars))
                .collect(),
            total: page.total,
            offset: request.offset,
            next_offset: window.next_offset(),
        }))
    }

    #[tool(description = "Find documents similar to a given document id (from a search or browse result).")]
    async fn find_similar(
        &self,
        Parameters(params): Parameters<FindSimilarParams>,
    ) -> Result<Json<LocationListResponse>, String> {
        let id = params.id.trim();
        if id.is_empty() {
            return Err("id must not be empty".to_string());
        }
        let list = self
            .catalog
            .similar(id)
            .await
            .map_err(|e| format!("find_similar failed: {e}"))?;
        Ok(Json(LocationListResponse {
            results: list
                .results
                .iter()
                .map(|doc| summarize(doc, &[], self.summary_chars))
                .collect(),
        }))
    }

    #[tool(description = "Fetch the full records of a topic's member documents by id.")]
    async fn get_topic_documents(
        &self,
        Parameters(params): Parameters<TopicDocumentsParams>,
    ) -> Result<Json<TopicDocumentsResponse>, String> {
        let list = self
            .catalog
            .topic_documents(&params.ids)
            .await
            .map_err(|e| format!("get_topic_documents failed: {e}"))?;
        Ok(Json(TopicDocumentsResponse {
            documents: list.results.into_iter().map(Into::into).collect(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for FinderServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "location-finder".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Filming location and heritage site finder. Use search_locations for free-text \
search; each result lists its topics, and passing a topic narrows the results. Use \
browse_locations to page through the catalog, find_similar to expand from one result, and \
get_topic_documents to load every member of a topic."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::routing::{get, post};
    use serde_json::{json, Value};

    use finder_common::cache::ResponseCache;
    use finder_common::catalog::{CatalogClient, CatalogClientConfig};

    use super::*;

    fn doc(id: &str, content: &str) -> Document {
        Document {
            id: id.to_string(),
            title: format!("Title {id}"),
            content: content.to_string(),
            ..Document::default()
        }
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = FinderServer::tool_router().list_all();
        for name in [
            "search_locations",
            "browse_locations",
            "find_similar",
            "get_topic_documents",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[test]
    fn summary_prefers_curated_description() {
        let d = Document {
            location_address: Some("1 Castle Wynd".to_string()),
            location_description: Some("Seen in the opening scene".to_string()),
            ..doc("d1", "long body")
        };
        let s = summarize(&d, &["Castles".to_string()], 300);
        assert_eq!(s.summary, "Seen in the opening scene");
        assert_eq!(s.address.as_deref(), Some("1 Castle Wynd"));
        assert_eq!(s.topics, vec!["Castles"]);
    }

    #[test]
    fn summary_truncates_body() {
        let s = summarize(&doc("d2", "abcdefghij"), &[], 5);
        assert_eq!(s.summary, "abcd…");
        assert_eq!(s.address, None);
        assert_eq!(s.title, "Title d2");
    }

    #[test]
    fn tool_limit_defaults_and_caps() {
        assert_eq!(tool_limit(None, 10, 50), 10);
        assert_eq!(tool_limit(Some(0), 10, 50), 10);
        assert_eq!(tool_limit(Some(20), 10, 50), 20);
        assert_eq!(tool_limit(Some(500), 10, 50), 50);
    }

    async fn stub_search() -> axum::Json<Value> {
        axum::Json(json!({
            "results": [
                {"id": "d1", "title": "Castle", "content": "cliff top", "score": 0.8},
                {"id": "d2", "title": "Fort", "content": "harbour"}
            ],
            "clusters": [
                {"labels": ["Castles"], "docs": ["d1"]},
                {"labels": ["Harbours"], "docs": ["d2"], "count": 7}
            ]
        }))
    }

    async fn stub_browse() -> axum::Json<Value> {
        axum::Json(json!({"total": 12, "items": [{"id": "b1"}, {"id": "b2"}]}))
    }

    async fn stub_cluster_docs(axum::Json(body): axum::Json<Value>) -> axum::Json<Value> {
        let results: Vec<Value> = body["ids"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|id| json!({"id": id, "latitude": 51.5, "longitude": -0.1}))
            .collect();
        axum::Json(json!({"results": results}))
    }

    async fn server() -> FinderServer {
        let router = axum::Router::new()
            .route("/search", get(stub_search))
            .route("/browse", get(stub_browse))
            .route("/api/cluster-docs", post(stub_cluster_docs));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });

        let config = CatalogClientConfig {
            max_retries: 0,
            initial_backoff: Duration::from_millis(1),
            ..CatalogClientConfig::default()
        }
        .with_base_url(&format!("http://{addr}"));
        let catalog = Catalog::new(
            CatalogClient::new(config).expect("client"),
            ResponseCache::disabled(),
        );
        FinderServer::new(catalog, 300)
    }

    fn search_params(query: &str, topic: Option<&str>) -> Parameters<SearchLocationsParams> {
        Parameters(SearchLocationsParams {
            query: query.to_string(),
            limit: None,
            topic: topic.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn search_lists_topics_and_filters_by_topic() {
        let server = server().await;

        let Json(all) = server
            .search_locations(search_params("castle", None))
            .await
            .expect("search");
        assert_eq!(all.results.len(), 2);
        assert_eq!(all.results[0].topics, vec!["Castles"]);
        assert_eq!(all.topics.len(), 2);
        assert_eq!(all.topics[1].document_count, 7);
        assert_eq!(all.topic, None);

        let Json(narrowed) = server
            .search_locations(search_params("castle", Some("Harbours")))
            .await
            .expect("search");
        let ids: Vec<&str> = narrowed.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d2"]);
        assert_eq!(narrowed.topic.as_deref(), Some("Harbours"));
    }

    #[tokio::test]
    async fn unknown_topic_lists_available_ones() {
        let server = server().await;
        let err = server
            .search_locations(search_params("castle", Some("Mills")))
            .await
            .err()
            .expect("unknown topic is rejected");
        assert!(err.contains("unknown topic: Mills"));
        assert!(err.contains("Castles; Harbours"));
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let server = server().await;
        let err = server
            .search_locations(search_params("   ", None))
            .await
            .err()
            .expect("blank query is rejected");
        assert_eq!(err, "query must not be empty");
    }

    #[tokio::test]
    async fn browse_reports_next_offset() {
        let server = server().await;
        let Json(page) = server
            .browse_locations(Parameters(BrowseLocationsParams {
                offset: Some(10),
                limit: Some(2),
                shuffle: None,
                query: Some("  ".to_string()),
            }))
            .await
            .expect("browse");
        assert_eq!(page.total, 12);
        assert_eq!(page.offset, 10);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_offset, None);
    }

    #[tokio::test]
    async fn topic_documents_return_full_records() {
        let server = server().await;
        let Json(resp) = server
            .get_topic_documents(Parameters(TopicDocumentsParams {
                ids: vec!["d1".to_string(), "d2".to_string()],
            }))
            .await
            .expect("topic documents");
        assert_eq!(resp.documents.len(), 2);
        assert_eq!(resp.documents[0].latitude, Some(51.5));

        let err = server
            .get_topic_documents(Parameters(TopicDocumentsParams { ids: vec![] }))
            .await
            .err()
            .expect("empty ids are rejected");
        assert!(err.contains("ids must not be empty"));
    }
}
