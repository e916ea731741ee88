/// Topic clusters: the document → label reverse index and the chip selection filter.
use std::borrow::Cow;
use std::collections::HashMap;

use crate::model::{Cluster, Document};

pub const LABEL_SEPARATOR: &str = ", ";

impl Cluster {
    /// The chip label: all cluster labels joined with `", "`.
    pub fn display_label(&self) -> String {
        self.labels.join(LABEL_SEPARATOR)
    }
}

/// Maps each document id to the display labels of the clusters containing it,
/// in the order the clusters were listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterIndex {
    by_doc: HashMap<String, Vec<String>>,
}

impl ClusterIndex {
    pub fn build(clusters: &[Cluster]) -> Self {
        let mut by_doc: HashMap<String, Vec<String>> = HashMap::new();
        for cluster in clusters {
            let label = cluster.display_label();
            for doc_id in &cluster.docs {
                by_doc.entry(doc_id.clone()).or_default().push(label.clone());
            }
        }
        Self { by_doc }
    }

    /// Labels for `doc_id`, empty when the document belongs to no cluster.
    pub fn labels_for(&self, doc_id: &str) -> &[String] {
        self.by_doc.get(doc_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_label(&self, doc_id: &str, label: &str) -> bool {
        self.labels_for(doc_id).iter().any(|l| l == label)
    }

    pub fn contains(&self, doc_id: &str) -> bool {
        self.by_doc.contains_key(doc_id)
    }

    /// Number of indexed document ids.
    pub fn len(&self) -> usize {
        self.by_doc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_doc.is_empty()
    }
}

/// The currently chosen topic chip. At most one label is selected at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Unselected,
    Selected(String),
}

impl Selection {
    /// Rebuild the selection from a request parameter; absent or blank means no filter.
    /// The label is kept verbatim so it matches the chip it came from.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some(label) if !label.trim().is_empty() => Self::Selected(label.to_string()),
            _ => Self::Unselected,
        }
    }

    /// Choosing the selected label clears it; choosing any other label selects that one.
    pub fn toggle(&mut self, label: &str) {
        *self = self.toggled(label);
    }

    pub fn toggled(&self, label: &str) -> Self {
        match self {
            Self::Selected(current) if current == label => Self::Unselected,
            _ => Self::Selected(label.to_string()),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Unselected => None,
            Self::Selected(label) => Some(label.as_str()),
        }
    }

    pub fn is_selected(&self, label: &str) -> bool {
        self.label() == Some(label)
    }
}

/// Narrow `results` to the documents in the selected cluster, keeping their order.
///
/// With no selection the input slice is returned as-is. Documents missing from the
/// index never pass an active filter.
pub fn filter_by_cluster<'a>(
    results: &'a [Document],
    index: &ClusterIndex,
    selection: &Selection,
) -> Cow<'a, [Document]> {
    match selection.label() {
        None => Cow::Borrowed(results),
        Some(label) => Cow::Owned(
            results
                .iter()
                .filter(|doc| index.has_label(&doc.id, label))
                .cloned()
                .collect(),
        ),
    }
}

/// Chip labels in cluster order, each with the number of member documents.
pub fn topic_counts(clusters: &[Cluster]) -> Vec<(String, usize)> {
    clusters
        .iter()
        .map(|c| (c.display_label(), c.count.unwrap_or(c.docs.len())))
        .collect()
}
