use super::{ExtractError, Record};
use crate::parser::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRow {
    pub job_id: String,
    pub lang: Option<String>,
    pub intro: Option<String>,
    pub main: String,
    pub compl: Option<String>,
    pub full: Option<String>,
}

impl Record for TitleRow {
    const FIELDS: &'static [&'static str] = &["id", "lang", "intro", "main", "compl", "full"];

    fn into_values(self) -> Vec<Option<String>> {
        vec![
            Some(self.job_id),
            self.lang,
            self.intro,
            Some(self.main),
            self.compl,
            self.full,
        ]
    }
}

/// One row per `title-wrap`. A wrap without `<main>` fails the whole document.
pub fn extract(doc: &Document) -> Result<Vec<TitleRow>, ExtractError> {
    let tree = &doc.tree;
    tree.find_all(tree.root(), "title-wrap")
        .into_iter()
        .map(|wrap| {
            let main = tree
                .find_text(wrap, "main")
                .ok_or(ExtractError::MissingRequiredStructure {
                    extractor: "titles",
                    element: "main",
                })?;
            Ok(TitleRow {
                job_id: doc.job_id.clone(),
                lang: tree.attr(wrap, "xml:lang").map(str::to_string),
                intro: tree.find_text(wrap, "intro"),
                main,
                compl: tree.find_text(wrap, "compl"),
                full: tree.find_text(wrap, "full"),
            })
        })
        .collect()
}
