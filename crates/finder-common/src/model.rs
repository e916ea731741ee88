use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A catalog item: a filming location or heritage site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique within one result set. Numeric ids from the backend are stringified.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Free-text body
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Poster or photo URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Relevance score; absent for browse results
    #[serde(default, deserialize_with = "number_or_none", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "number_or_none", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "number_or_none", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// What a result card shows beneath its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationDetail<'a> {
    /// A curated description of the location, shown in full.
    Curated {
        address: Option<&'a str>,
        description: &'a str,
    },
    /// Only an address is known; the body text follows it.
    Addressed { address: &'a str, body: &'a str },
    /// Nothing location-specific, only the free-text body.
    Body(&'a str),
}

impl Document {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) if latitude.is_finite() && longitude.is_finite() => {
                Some(Coordinates {
                    latitude,
                    longitude,
                })
            }
            _ => None,
        }
    }

    pub fn detail(&self) -> LocationDetail<'_> {
        let address = non_blank(self.location_address.as_deref());
        match (non_blank(self.location_description.as_deref()), address) {
            (Some(description), address) => LocationDetail::Curated {
                address,
                description,
            },
            (None, Some(address)) => LocationDetail::Addressed {
                address,
                body: &self.content,
            },
            (None, None) => LocationDetail::Body(&self.content),
        }
    }

    pub fn display_title(&self) -> &str {
        non_blank(Some(self.title.as_str())).unwrap_or("(no title)")
    }
}

/// A topic grouping returned alongside a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default, deserialize_with = "lenient_strings")]
    pub labels: Vec<String>,
    /// Member document ids; the topic endpoint calls this `doc_ids`.
    #[serde(default, alias = "doc_ids", deserialize_with = "lenient_strings")]
    pub docs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Result of a search: ranked documents plus the topic clusters computed over them.
///
/// Decodes from either a bare JSON array of documents or `{"results": [...], "clusters": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct SearchResponse {
    pub results: Vec<Document>,
    pub clusters: Vec<Cluster>,
}

impl From<Value> for SearchResponse {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self {
                results: decode_elements(items, "results"),
                clusters: Vec::new(),
            },
            Value::Object(mut obj) => Self {
                results: lenient_list(obj.remove("results"), "results"),
                clusters: lenient_list(obj.remove("clusters"), "clusters"),
            },
            _ => Self::default(),
        }
    }
}

/// One page of the browse listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct BrowsePage {
    pub total: usize,
    pub items: Vec<Document>,
}

impl From<Value> for BrowsePage {
    fn from(value: Value) -> Self {
        let Value::Object(mut obj) = value else {
            return Self::default();
        };
        let total = obj
            .get("total")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(0);
        Self {
            total,
            items: lenient_list(obj.remove("items"), "items"),
        }
    }
}

/// `{"results": [...]}` as returned by the similar-documents and topic-documents endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct DocumentList {
    pub results: Vec<Document>,
}

impl From<Value> for DocumentList {
    fn from(value: Value) -> Self {
        let Value::Object(mut obj) = value else {
            return Self::default();
        };
        Self {
            results: lenient_list(obj.remove("results"), "results"),
        }
    }
}

/// Shorten `text` for a card preview: past `max_len` characters it becomes the first
/// `max_len - 1` characters followed by an ellipsis.
pub fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        let mut out: String = text.chars().take(max_len.saturating_sub(1)).collect();
        out.push('…');
        out
    } else {
        text.to_string()
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Missing or non-array lists decode as empty; elements that fail to decode are skipped.
fn lenient_list<T: DeserializeOwned>(value: Option<Value>, field: &str) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => decode_elements(items, field),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            warn!(field, "expected an array, treating as empty");
            Vec::new()
        }
    }
}

fn decode_elements<T: DeserializeOwned>(items: Vec<Value>, field: &str) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            serde_json::from_value(item)
                .inspect_err(|e| warn!(error = %e, field, index, "skipping malformed element"))
                .ok()
        })
        .collect()
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn number_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_f64())
}

fn lenient_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_decodes_leniently() {
        let doc: Document = serde_json::from_value(json!({
            "id": 42,
            "title": null,
            "content": "Harbour scenes",
            "score": "high",
            "latitude": 51.5,
            "longitude": -0.12,
            "unknown_field": true
        }))
        .expect("lenient decode");
        assert_eq!(doc.id, "42");
        assert_eq!(doc.title, "");
        assert_eq!(doc.display_title(), "(no title)");
        assert_eq!(doc.score, None);
        assert_eq!(
            doc.coordinates(),
            Some(Coordinates {
                latitude: 51.5,
                longitude: -0.12
            })
        );
    }

    #[test]
    fn coordinates_need_both_axes() {
        let doc = Document {
            latitude: Some(10.0),
            ..Document::default()
        };
        assert_eq!(doc.coordinates(), None);
    }

    #[test]
    fn detail_prefers_curated_description() {
        let mut doc = Document {
            content: "body".to_string(),
            location_address: Some("1 Quay St".to_string()),
            location_description: Some("Scene at the pier".to_string()),
            ..Document::default()
        };
        assert_eq!(
            doc.detail(),
            LocationDetail::Curated {
                address: Some("1 Quay St"),
                description: "Scene at the pier"
            }
        );

        doc.location_description = Some("  ".to_string());
        assert_eq!(
            doc.detail(),
            LocationDetail::Addressed {
                address: "1 Quay St",
                body: "body"
            }
        );

        doc.location_address = None;
        assert_eq!(doc.detail(), LocationDetail::Body("body"));
    }

    #[test]
    fn search_response_accepts_bare_array() {
        let resp: SearchResponse =
            serde_json::from_value(json!([{"id": "d1", "title": "A"}, {"id": "d2"}])).unwrap();
        assert_eq!(resp.results.len(), 2);
        assert!(resp.clusters.is_empty());
    }

    #[test]
    fn search_response_accepts_wrapped_object_with_doc_ids_alias() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "results": [{"id": "d1"}],
            "clusters": [
                {"labels": ["Castles"], "docs": ["d1"]},
                {"labels": ["Coastal", "Cliffs"], "doc_ids": ["d1", 7], "count": 2}
            ]
        }))
        .unwrap();
        assert_eq!(resp.results[0].id, "d1");
        assert_eq!(resp.clusters[1].docs, vec!["d1", "7"]);
        assert_eq!(resp.clusters[1].count, Some(2));
    }

    #[test]
    fn non_array_lists_decode_as_empty() {
        let resp: SearchResponse =
            serde_json::from_value(json!({"results": "oops", "clusters": null})).unwrap();
        assert_eq!(resp, SearchResponse::default());

        let resp: SearchResponse = serde_json::from_value(json!("not a response")).unwrap();
        assert_eq!(resp, SearchResponse::default());

        let page: BrowsePage = serde_json::from_value(json!({"total": 3})).unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.is_empty());
    }

    #[test]
    fn malformed_elements_are_skipped() {
        let list: DocumentList =
            serde_json::from_value(json!({"results": [{"id": "ok"}, 5, {"id": "fine"}]})).unwrap();
        let ids: Vec<&str> = list.results.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["ok", "fine"]);
    }

    #[test]
    fn serialized_response_decodes_back() {
        let resp = SearchResponse {
            results: vec![Document {
                id: "d1".to_string(),
                title: "Castle".to_string(),
                score: Some(0.5),
                ..Document::default()
            }],
            clusters: vec![Cluster {
                labels: vec!["Castles".to_string()],
                docs: vec!["d1".to_string()],
                count: None,
            }],
        };
        let json = serde_json::to_string(&resp).unwrap();
        let back: SearchResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resp);
    }

    #[test]
    fn truncation_matches_card_preview_rule() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 6), "abcdef");
        assert_eq!(truncate_chars("abcdefg", 6), "abcde…");
        assert_eq!(truncate_chars("ééééé", 3), "éé…");
    }
}
