use std::collections::HashSet;

use tracing::debug;

use super::Record;
use crate::parser::Document;

/// References of this many characters or fewer are never reported.
const MIN_REF_LEN: usize = 2;

/// One distinct standard cited from a reference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRow {
    pub job_id: String,
    pub content_type: Option<String>,
    pub std_type: Option<String>,
    pub std_id: Option<String>,
    pub std_ref_type: Option<String>,
    pub std_ref: String,
    /// Number of text nodes in the whole document containing `std_ref`.
    pub count: usize,
}

impl Record for ReferenceRow {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "content_type",
        "std_type",
        "std_id",
        "std_ref_type",
        "std_ref",
        "count",
    ];

    fn into_values(self) -> Vec<Option<String>> {
        vec![
            Some(self.job_id),
            self.content_type,
            self.std_type,
            self.std_id,
            self.std_ref_type,
            Some(self.std_ref),
            Some(self.count.to_string()),
        ]
    }
}

pub fn extract(doc: &Document) -> Vec<ReferenceRow> {
    let tree = &doc.tree;
    let attr = |id, key| tree.attr(id, key).map(str::to_string);
    let text_nodes: Vec<&str> = tree.text_nodes().collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut rows = Vec::new();

    for list in tree.find_all(tree.root(), "ref-list") {
        for reference in tree.find_all(list, "ref") {
            let Some(std) = tree.find(reference, "std") else {
                continue;
            };
            let Some(std_ref) = tree.find(std, "std-ref") else {
                continue;
            };
            let text = tree.text(std_ref).trim().to_string();

            // Marked seen before the length gate: a short reference stays
            // unreported for the rest of the document.
            if !seen.insert(text.clone()) {
                continue;
            }
            if text.chars().count() <= MIN_REF_LEN {
                debug!(job_id = %doc.job_id, std_ref = %text, "reference too short, skipped");
                continue;
            }

            let count = text_nodes.iter().filter(|t| t.contains(text.as_str())).count();
            rows.push(ReferenceRow {
                job_id: doc.job_id.clone(),
                content_type: attr(reference, "content-type"),
                std_type: attr(std, "type"),
                std_id: attr(std, "std-id"),
                std_ref_type: attr(std_ref, "type"),
                std_ref: text,
                count,
            });
        }
    }

    rows
}
