use super::{metadata_container, Record};
use crate::parser::Document;

/// One ICS classification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcsRow {
    pub job_id: String,
    pub ics: String,
}

impl Record for IcsRow {
    const FIELDS: &'static [&'static str] = &["id", "ics"];

    fn into_values(self) -> Vec<Option<String>> {
        vec![Some(self.job_id), Some(self.ics)]
    }
}

pub fn extract(doc: &Document) -> Vec<IcsRow> {
    let tree = &doc.tree;
    let Some(meta) = metadata_container(tree) else {
        return Vec::new();
    };
    tree.find_all(meta, "ics")
        .into_iter()
        .map(|ics| IcsRow {
            job_id: doc.job_id.clone(),
            ics: tree.text(ics),
        })
        .collect()
}
