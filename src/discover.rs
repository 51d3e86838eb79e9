use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// One input document and the job id derived from its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub job_id: String,
}

impl SourceFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let job_id = job_id_for(&path)?;
        Some(SourceFile { path, job_id })
    }
}

/// Base name without extension: `data/xml/1739.xml` → `1739`.
pub fn job_id_for(path: &Path) -> Option<String> {
    path.file_stem()?.to_str().map(str::to_string)
}

/// List `*.xml` files directly inside `dir`, sorted by path.
pub fn discover(dir: &Path) -> Result<Vec<SourceFile>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_xml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
        if !is_xml || !path.is_file() {
            continue;
        }
        if let Some(source) = SourceFile::from_path(path) {
            files.push(source);
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));

    info!("Found {} XML documents in {}", files.len(), dir.display());
    Ok(files)
}
