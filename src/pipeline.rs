use anyhow::{bail, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::warn;

use crate::discover::SourceFile;
use crate::output::RowSink;
use crate::parser::{self, extract::Extractor};
use crate::settings::Settings;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub documents: usize,
    pub failed_documents: usize,
    pub failed_extractions: usize,
    /// Rows written per extractor, in first-seen order.
    pub rows: Vec<(Extractor, usize)>,
}

impl RunCounts {
    fn add_rows(&mut self, extractor: Extractor, n: usize) {
        match self.rows.iter_mut().find(|(e, _)| *e == extractor) {
            Some((_, total)) => *total += n,
            None => self.rows.push((extractor, n)),
        }
    }

    pub fn total_rows(&self) -> usize {
        self.rows.iter().map(|(_, n)| n).sum()
    }

    pub fn print(&self) {
        let per_table: Vec<String> = self
            .rows
            .iter()
            .map(|(e, n)| format!("{} {}", n, e.table()))
            .collect();
        println!(
            "Processed {} documents ({} unreadable, {} failed extractions). Saved {}.",
            self.documents,
            self.failed_documents,
            self.failed_extractions,
            per_table.join(", "),
        );
    }
}

/// Parses each chunk of `files` in parallel, then appends its rows to `sink`
/// in file order. Unreadable documents and failing extractors are counted and
/// skipped, unless `settings.fail_fast` is set: then the sink is flushed and
/// the first failure is returned.
pub fn process_files(
    files: &[SourceFile],
    settings: &Settings,
    sink: &mut dyn RowSink,
    pb: &ProgressBar,
) -> Result<RunCounts> {
    let mut counts = RunCounts::default();

    for chunk in files.chunks(settings.chunk_size.max(1)) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|f| parser::process_file(f, &settings.extractors))
            .collect();

        for doc in results {
            counts.documents += 1;
            let outcomes = match doc.outcome {
                Ok(outcomes) => outcomes,
                Err(e) => {
                    counts.failed_documents += 1;
                    pb.suspend(|| warn!(job_id = %doc.job_id, "Document skipped: {}", e));
                    if settings.fail_fast {
                        return abort(sink, &doc.job_id, &e);
                    }
                    continue;
                }
            };
            for outcome in outcomes {
                match outcome.result {
                    Ok(rows) => {
                        sink.append(outcome.extractor, &rows)?;
                        counts.add_rows(outcome.extractor, rows.len());
                    }
                    Err(e) => {
                        counts.failed_extractions += 1;
                        let extractor = outcome.extractor.name();
                        pb.suspend(|| warn!(job_id = %doc.job_id, extractor, "{}", e));
                        if settings.fail_fast {
                            return abort(sink, &doc.job_id, &e);
                        }
                    }
                }
            }
        }
        pb.inc(chunk.len() as u64);
    }

    Ok(counts)
}

fn abort(sink: &mut dyn RowSink, job_id: &str, err: &dyn std::fmt::Display) -> Result<RunCounts> {
    sink.finish()?;
    bail!("aborted at document {}: {}", job_id, err)
}
