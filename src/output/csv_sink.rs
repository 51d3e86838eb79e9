use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::RowSink;
use crate::parser::extract::{Extractor, Row};

/// One `<table>.csv` per extractor. Files are appended to; the header is
/// written only into a new or empty file.
pub struct CsvSink {
    writers: HashMap<Extractor, csv::Writer<File>>,
}

pub fn csv_path(dir: &Path, extractor: Extractor) -> PathBuf {
    dir.join(format!("{}.csv", extractor.table()))
}

impl CsvSink {
    pub fn create(dir: &Path, pipeline: &[Extractor]) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let mut writers = HashMap::new();
        for &extractor in pipeline {
            let path = csv_path(dir, extractor);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let is_new = file.metadata()?.len() == 0;

            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
            if is_new {
                writer.write_record(extractor.fields())?;
            }
            writers.insert(extractor, writer);
        }
        Ok(CsvSink { writers })
    }
}

impl RowSink for CsvSink {
    fn append(&mut self, extractor: Extractor, rows: &[Row]) -> Result<()> {
        let writer = self
            .writers
            .get_mut(&extractor)
            .ok_or_else(|| anyhow!("no CSV output opened for {}", extractor.name()))?;
        for row in rows {
            writer.write_record(row.values().iter().map(|v| v.as_deref().unwrap_or("")))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

pub fn count_rows(dir: &Path, extractors: &[Extractor]) -> Result<Vec<(Extractor, Option<usize>)>> {
    let mut counts = Vec::with_capacity(extractors.len());
    for &extractor in extractors {
        let path = csv_path(dir, extractor);
        if !path.exists() {
            counts.push((extractor, None));
            continue;
        }
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut n = 0;
        for record in reader.records() {
            record?;
            n += 1;
        }
        counts.push((extractor, Some(n)));
    }
    Ok(counts)
}
