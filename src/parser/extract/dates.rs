use super::Record;
use crate::parser::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRow {
    pub job_id: String,
    pub date_type: Option<String>,
    pub date_val: Option<String>,
}

impl Record for DateRow {
    const FIELDS: &'static [&'static str] = &["id", "date_type", "date_val"];

    fn into_values(self) -> Vec<Option<String>> {
        vec![Some(self.job_id), self.date_type, self.date_val]
    }
}

/// Publication and release dates always come first, present or not, followed
/// by every `meta-date` in document order.
pub fn extract(doc: &Document) -> Vec<DateRow> {
    let tree = &doc.tree;
    let root = tree.root();
    let row = |date_type: Option<String>, date_val: Option<String>| DateRow {
        job_id: doc.job_id.clone(),
        date_type,
        date_val,
    };

    let mut rows = vec![
        row(Some("publication".into()), tree.find_text(root, "pub-date")),
        row(Some("release".into()), tree.find_text(root, "release-date")),
    ];
    rows.extend(tree.find_all(root, "meta-date").into_iter().map(|d| {
        row(
            tree.attr(d, "type").map(str::to_uppercase),
            Some(tree.text(d)),
        )
    }));
    rows
}
