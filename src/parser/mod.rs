pub mod extract;
pub mod tree;

use std::path::PathBuf;

use thiserror::Error;

use crate::discover::SourceFile;
use extract::{ExtractError, Extractor, Row};
use tree::{ParseError, Tree};

/// A parsed markup document and the job identifier stamped on every row
/// extracted from it.
#[derive(Debug, Clone)]
pub struct Document {
    pub job_id: String,
    pub tree: Tree,
}

impl Document {
    pub fn parse(job_id: impl Into<String>, markup: &str) -> Result<Self, ParseError> {
        Ok(Document {
            job_id: job_id.into(),
            tree: Tree::parse(markup)?,
        })
    }
}

/// Failure that takes out every extractor for a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub struct ExtractorOutcome {
    pub extractor: Extractor,
    pub result: Result<Vec<Row>, ExtractError>,
}

pub struct ProcessedDocument {
    pub job_id: String,
    pub outcome: Result<Vec<ExtractorOutcome>, DocumentError>,
}

/// Read → parse → run every configured extractor.
pub fn process_file(source: &SourceFile, pipeline: &[Extractor]) -> ProcessedDocument {
    let outcome = std::fs::read_to_string(&source.path)
        .map_err(|e| DocumentError::Read {
            path: source.path.clone(),
            source: e,
        })
        .and_then(|markup| process_markup(&source.job_id, &markup, pipeline));
    ProcessedDocument {
        job_id: source.job_id.clone(),
        outcome,
    }
}

pub fn process_markup(
    job_id: &str,
    markup: &str,
    pipeline: &[Extractor],
) -> Result<Vec<ExtractorOutcome>, DocumentError> {
    let doc = Document::parse(job_id, markup)?;
    Ok(extract::extract_all(&doc, pipeline))
}
