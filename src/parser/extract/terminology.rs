use tracing::debug;

use super::{flatten, Record};
use crate::parser::Document;

/// One term information group (`tbx:tig`), denormalized with its language set
/// and terminology section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRow {
    pub job_id: String,
    pub tds_id: Option<String>,
    pub label: Option<String>,
    pub note: Option<String>,
    pub lang: Option<String>,
    pub definition: Option<String>,
    /// Text of the `std-ref` cited inside the definition. Still present in `definition`.
    pub source: Option<String>,
    pub term_id: Option<String>,
    pub term: String,
    pub pos: Option<String>,
    pub norm_auth: Option<String>,
}

impl Record for TermRow {
    const FIELDS: &'static [&'static str] = &[
        "id", "tds_id", "label", "note", "lang", "definition", "source", "term_id", "term", "pos",
        "norm_auth",
    ];

    fn into_values(self) -> Vec<Option<String>> {
        vec![
            Some(self.job_id),
            self.tds_id,
            self.label,
            self.note,
            self.lang,
            self.definition,
            self.source,
            self.term_id,
            Some(self.term),
            self.pos,
            self.norm_auth,
        ]
    }
}

struct LangSet {
    lang: Option<String>,
    note: Option<String>,
    definition: Option<String>,
    source: Option<String>,
}

pub fn extract(doc: &Document) -> Vec<TermRow> {
    let tree = &doc.tree;
    let attr = |id, key| tree.attr(id, key).map(str::to_string);
    let mut rows = Vec::new();

    for sec in tree.find_all(tree.root(), "term-sec") {
        let tds_id = attr(sec, "id");
        let label = tree.find_text(sec, "label");

        for lang_set in tree.find_all(sec, "tbx:langset") {
            let definition = tree.find(lang_set, "tbx:definition");
            let shared = LangSet {
                lang: attr(lang_set, "xml:lang"),
                note: tree.find_text(lang_set, "tbx:note"),
                definition: definition.map(|d| flatten(&tree.text(d))),
                source: definition.and_then(|d| tree.find_text(d, "std-ref")),
            };

            for tig in tree.find_all(lang_set, "tbx:tig") {
                let Some(term) = tree.find_text(tig, "tbx:term") else {
                    debug!(job_id = %doc.job_id, tds_id = ?tds_id, "tig without term skipped");
                    continue;
                };
                let value_of = |tag| tree.find(tig, tag).and_then(|n| attr(n, "value"));

                rows.push(TermRow {
                    job_id: doc.job_id.clone(),
                    tds_id: tds_id.clone(),
                    label: label.clone(),
                    note: shared.note.clone(),
                    lang: shared.lang.clone(),
                    definition: shared.definition.clone(),
                    source: shared.source.clone(),
                    term_id: attr(tig, "id"),
                    term: flatten(&term),
                    pos: value_of("tbx:partofspeech"),
                    norm_auth: value_of("tbx:normativeauthorization"),
                });
            }
        }
    }

    rows
}
