use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::{RowSink, RunSummary};
use crate::parser::extract::{Extractor, Row};

const DB_FILE: &str = "sts.sqlite";

pub fn db_path(dir: &Path) -> PathBuf {
    dir.join(DB_FILE)
}

pub fn connect(dir: &Path) -> Result<Connection> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let conn = Connection::open(db_path(dir))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn create_table_sql(extractor: Extractor) -> String {
    let columns: Vec<String> = extractor
        .fields()
        .iter()
        .map(|f| format!("{} TEXT", quote(f)))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(extractor.table()),
        columns.join(", ")
    )
}

fn insert_sql(extractor: Extractor) -> String {
    let fields = extractor.fields();
    let columns: Vec<String> = fields.iter().map(|f| quote(f)).collect();
    let params: Vec<String> = (1..=fields.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(extractor.table()),
        columns.join(", "),
        params.join(", ")
    )
}

pub fn init_schema(conn: &Connection, pipeline: &[Extractor]) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS runs (
            run_id             TEXT PRIMARY KEY,
            started_at         TEXT NOT NULL,
            finished_at        TEXT NOT NULL,
            documents          INTEGER NOT NULL,
            failed_documents   INTEGER NOT NULL,
            failed_extractions INTEGER NOT NULL,
            row_count          INTEGER NOT NULL
        );
        ",
    )?;
    for &extractor in pipeline {
        conn.execute_batch(&create_table_sql(extractor))?;
        conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            quote(&format!("idx_{}_id", extractor.table())),
            quote(extractor.table()),
            quote("id")
        ))?;
    }
    Ok(())
}

/// One database in the output directory, one TEXT column per field; absent
/// values are stored as NULL.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn create(dir: &Path, pipeline: &[Extractor]) -> Result<Self> {
        let conn = connect(dir)?;
        init_schema(&conn, pipeline)?;
        Ok(SqliteSink { conn })
    }
}

impl RowSink for SqliteSink {
    fn append(&mut self, extractor: Extractor, rows: &[Row]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&insert_sql(extractor))?;
            for row in rows {
                stmt.execute(rusqlite::params_from_iter(row.values().iter()))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn record_run(&mut self, summary: &RunSummary) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO runs
             (run_id, started_at, finished_at, documents, failed_documents, failed_extractions, row_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                summary.run_id,
                summary.started_at.to_rfc3339(),
                summary.finished_at.to_rfc3339(),
                summary.documents as i64,
                summary.failed_documents as i64,
                summary.failed_extractions as i64,
                summary.rows as i64,
            ],
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

pub fn count_rows(dir: &Path, extractors: &[Extractor]) -> Result<Vec<(Extractor, Option<usize>)>> {
    if !db_path(dir).exists() {
        return Ok(extractors.iter().map(|&e| (e, None)).collect());
    }
    let conn = connect(dir)?;
    let mut counts = Vec::with_capacity(extractors.len());
    for &extractor in extractors {
        if !table_exists(&conn, extractor.table())? {
            counts.push((extractor, None));
            continue;
        }
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(extractor.table())),
            [],
            |row| row.get(0),
        )?;
        counts.push((extractor, Some(n as usize)));
    }
    Ok(counts)
}
