use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::parser::extract::Extractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Sqlite,
}

/// Run settings. Sources, lowest priority first: defaults, `sts_extract.toml`
/// (or an explicit `--config` file), `STS_*` environment variables. CLI flags
/// are applied on top by the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub extractors: Vec<Extractor>,
    /// Documents parsed in parallel before their rows are written.
    pub chunk_size: usize,
    pub fail_fast: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/xml"),
            output_dir: PathBuf::from("data/csv"),
            format: OutputFormat::default(),
            extractors: Extractor::DEFAULT_PIPELINE.to_vec(),
            chunk_size: 64,
            fail_fast: false,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::load_with_env(path, None)
    }

    /// `env` replaces the process environment as the `STS_*` source when given.
    fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name("sts_extract").required(false),
        };
        config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("STS")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("extractors")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
