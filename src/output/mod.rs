pub mod csv_sink;
pub mod sqlite_sink;

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::parser::extract::{Extractor, Row};
use crate::settings::OutputFormat;

/// Append-only destination for extracted rows, one table per extractor.
pub trait RowSink {
    fn append(&mut self, extractor: Extractor, rows: &[Row]) -> Result<()>;

    fn record_run(&mut self, _summary: &RunSummary) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub documents: usize,
    pub failed_documents: usize,
    pub failed_extractions: usize,
    pub rows: usize,
}

pub fn new_run_id(started_at: DateTime<Utc>) -> String {
    format!("run-{}", started_at.format("%Y%m%dT%H%M%S%.3fZ"))
}

pub fn open(format: OutputFormat, dir: &Path, pipeline: &[Extractor]) -> Result<Box<dyn RowSink>> {
    Ok(match format {
        OutputFormat::Csv => Box::new(csv_sink::CsvSink::create(dir, pipeline)?),
        OutputFormat::Sqlite => Box::new(sqlite_sink::SqliteSink::create(dir, pipeline)?),
    })
}

/// Rows currently stored per table; `None` when the table does not exist yet.
pub fn count_rows(
    format: OutputFormat,
    dir: &Path,
    extractors: &[Extractor],
) -> Result<Vec<(Extractor, Option<usize>)>> {
    match format {
        OutputFormat::Csv => csv_sink::count_rows(dir, extractors),
        OutputFormat::Sqlite => sqlite_sink::count_rows(dir, extractors),
    }
}
