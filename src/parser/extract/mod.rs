pub mod classification;
pub mod committee;
pub mod dates;
pub mod references;
pub mod sections;
pub mod standard;
pub mod terminology;
pub mod titles;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use super::tree::{NodeId, Tree};
use super::{Document, ExtractorOutcome};

/// Alternate top-level metadata wrappers across the ISO/NISO/national tag sets.
/// Probed in this order; the first one present in the document wins.
pub const METADATA_CONTAINERS: &[&str] =
    &["iso-meta", "nat-meta", "reg-meta", "std-meta", "std-doc-meta"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("{extractor}: required element <{element}> is missing")]
    MissingRequiredStructure {
        extractor: &'static str,
        element: &'static str,
    },
}

/// Typed record of one extractor. `into_values` yields one value per entry of
/// `FIELDS`, in the same order.
pub trait Record {
    const FIELDS: &'static [&'static str];

    fn into_values(self) -> Vec<Option<String>>;
}

/// One output row: a fixed field list and one optional value per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    fields: &'static [&'static str],
    values: Vec<Option<String>>,
}

impl Row {
    pub fn from_record<R: Record>(record: R) -> Self {
        let values = record.into_values();
        debug_assert_eq!(values.len(), R::FIELDS.len());
        Row {
            fields: R::FIELDS,
            values,
        }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .position(|f| *f == field)
            .and_then(|i| self.values[i].as_deref())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in self.fields.iter().zip(&self.values) {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

fn rows<R: Record>(records: Vec<R>) -> Vec<Row> {
    records.into_iter().map(Row::from_record).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Extractor {
    Classification,
    Committee,
    Terminology,
    Dates,
    References,
    Standard,
    Titles,
    Sections,
}

impl Extractor {
    pub const ALL: &'static [Extractor] = &[
        Extractor::Classification,
        Extractor::Committee,
        Extractor::Terminology,
        Extractor::Dates,
        Extractor::References,
        Extractor::Standard,
        Extractor::Titles,
        Extractor::Sections,
    ];

    pub const DEFAULT_PIPELINE: &'static [Extractor] = &[
        Extractor::Classification,
        Extractor::Committee,
        Extractor::Terminology,
        Extractor::Dates,
        Extractor::References,
        Extractor::Standard,
        Extractor::Titles,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Extractor::Classification => "classification",
            Extractor::Committee => "committee",
            Extractor::Terminology => "terminology",
            Extractor::Dates => "dates",
            Extractor::References => "references",
            Extractor::Standard => "standard",
            Extractor::Titles => "titles",
            Extractor::Sections => "sections",
        }
    }

    /// Name of the output table / file.
    pub fn table(self) -> &'static str {
        match self {
            Extractor::Classification => "ics",
            Extractor::Committee => "committees",
            Extractor::Terminology => "terms",
            Extractor::Dates => "dates",
            Extractor::References => "references",
            Extractor::Standard => "standards",
            Extractor::Titles => "titles",
            Extractor::Sections => "sections",
        }
    }

    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Extractor::Classification => classification::IcsRow::FIELDS,
            Extractor::Committee => committee::CommitteeRow::FIELDS,
            Extractor::Terminology => terminology::TermRow::FIELDS,
            Extractor::Dates => dates::DateRow::FIELDS,
            Extractor::References => references::ReferenceRow::FIELDS,
            Extractor::Standard => standard::StandardRow::FIELDS,
            Extractor::Titles => titles::TitleRow::FIELDS,
            Extractor::Sections => sections::SectionRow::FIELDS,
        }
    }

    pub fn extract(self, doc: &Document) -> Result<Vec<Row>, ExtractError> {
        match self {
            Extractor::Classification => Ok(rows(classification::extract(doc))),
            Extractor::Committee => Ok(rows(committee::extract(doc))),
            Extractor::Terminology => Ok(rows(terminology::extract(doc))),
            Extractor::Dates => Ok(rows(dates::extract(doc))),
            Extractor::References => Ok(rows(references::extract(doc))),
            Extractor::Standard => standard::extract(doc).map(|r| vec![Row::from_record(r)]),
            Extractor::Titles => titles::extract(doc).map(rows),
            Extractor::Sections => Ok(rows(sections::extract(doc))),
        }
    }
}

pub fn extract_all(doc: &Document, pipeline: &[Extractor]) -> Vec<ExtractorOutcome> {
    pipeline
        .iter()
        .map(|&extractor| {
            let result = extractor.extract(doc);
            let name = extractor.name();
            match &result {
                Ok(rows) => {
                    debug!(job_id = %doc.job_id, extractor = name, rows = rows.len(), "extracted")
                }
                Err(e) => {
                    debug!(job_id = %doc.job_id, extractor = name, error = %e, "extraction failed")
                }
            }
            ExtractorOutcome { extractor, result }
        })
        .collect()
}

/// First container from `rules` present anywhere in the document.
pub fn resolve_container(tree: &Tree, rules: &[&str]) -> Option<NodeId> {
    rules.iter().find_map(|tag| tree.find(tree.root(), tag))
}

pub fn metadata_container(tree: &Tree) -> Option<NodeId> {
    resolve_container(tree, METADATA_CONTAINERS)
}

/// Newlines become spaces, then the ends are trimmed.
fn flatten(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(fixture: &str) -> Document {
        let xml = std::fs::read_to_string(format!("tests/fixtures/{}.xml", fixture)).unwrap();
        Document::parse(fixture, &xml).unwrap()
    }

    #[test]
    fn container_priority_is_list_order_not_tree_order() {
        let t = Tree::parse("<doc><std-meta><x/></std-meta><nat-meta/><iso-meta/></doc>").unwrap();
        let c = metadata_container(&t).unwrap();
        assert_eq!(t.name(c), Some("iso-meta"));
        let t = Tree::parse("<doc><std-doc-meta/><reg-meta/></doc>").unwrap();
        assert_eq!(t.name(metadata_container(&t).unwrap()), Some("reg-meta"));
        let t = Tree::parse("<doc><front/></doc>").unwrap();
        assert!(metadata_container(&t).is_none());
    }

    #[test]
    fn every_row_carries_exactly_the_declared_fields() {
        for fixture in ["iso_sample", "niso_sample"] {
            let doc = parse(fixture);
            for &e in Extractor::ALL {
                let Ok(rows) = e.extract(&doc) else { continue };
                for row in rows {
                    assert_eq!(row.fields(), e.fields(), "{} in {}", e.name(), fixture);
                    assert_eq!(row.values().len(), e.fields().len());
                    assert_eq!(row.fields()[0], "id");
                    assert_eq!(row.get("id"), Some(fixture));
                }
            }
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let doc = parse("niso_sample");
        for &e in Extractor::ALL {
            assert_eq!(e.extract(&doc), e.extract(&doc), "{}", e.name());
        }
    }

    #[test]
    fn iso_sample_full_pipeline() {
        let doc = parse("iso_sample");
        let outcomes = extract_all(&doc, Extractor::DEFAULT_PIPELINE);
        let count = |e: Extractor| {
            outcomes
                .iter()
                .find(|o| o.extractor == e)
                .and_then(|o| o.result.as_ref().ok())
                .map(|r| r.len())
        };
        assert_eq!(count(Extractor::Classification), Some(2));
        assert_eq!(count(Extractor::Committee), Some(2));
        assert_eq!(count(Extractor::Terminology), Some(3));
        assert_eq!(count(Extractor::Dates), Some(3));
        assert_eq!(count(Extractor::References), Some(2));
        assert_eq!(count(Extractor::Standard), Some(1));
        assert_eq!(count(Extractor::Titles), Some(2));
    }

    #[test]
    fn niso_sample_committee_levels() {
        let doc = parse("niso_sample");
        let rows = Extractor::Committee.extract(&doc).unwrap();
        let levels: Vec<Option<&str>> = rows.iter().map(|r| r.get("level")).collect();
        assert_eq!(levels, vec![Some("2"), Some("1")]);
        assert_eq!(rows[0].get("committee"), Some("CEN/TC 250/SC 2"));
    }

    #[test]
    fn row_serializes_as_ordered_object() {
        let doc = Document::parse("j1", "<iso-meta><ics>01.040</ics></iso-meta>").unwrap();
        let rows = Extractor::Dates.extract(&doc).unwrap();
        let json = serde_json::to_string(&rows[0]).unwrap();
        assert_eq!(json, r#"{"id":"j1","date_type":"publication","date_val":null}"#);
    }

    #[test]
    fn extractor_names_are_unique() {
        let mut tables: Vec<&str> = Extractor::ALL.iter().map(|e| e.table()).collect();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), Extractor::ALL.len());
    }
}
