use std::sync::LazyLock;

use regex::Regex;

use super::Record;
use crate::parser::Document;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Body text of one `sec`, nested sections included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRow {
    pub job_id: String,
    pub section_id: Option<String>,
    pub section_type: Option<String>,
    pub section: String,
}

impl Record for SectionRow {
    const FIELDS: &'static [&'static str] = &["id", "section_id", "section_type", "section"];

    fn into_values(self) -> Vec<Option<String>> {
        vec![
            Some(self.job_id),
            self.section_id,
            self.section_type,
            Some(self.section),
        ]
    }
}

pub fn extract(doc: &Document) -> Vec<SectionRow> {
    let tree = &doc.tree;
    tree.find_all(tree.root(), "sec")
        .into_iter()
        .map(|sec| SectionRow {
            job_id: doc.job_id.clone(),
            section_id: tree.attr(sec, "id").map(str::to_string),
            section_type: tree.attr(sec, "sec-type").map(str::to_string),
            section: WHITESPACE_RE.replace_all(&tree.text(sec), " ").trim().to_string(),
        })
        .collect()
}
