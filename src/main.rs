mod discover;
mod output;
mod parser;
mod pipeline;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use output::RunSummary;
use parser::extract::Extractor;
use settings::{OutputFormat, Settings};

#[derive(Parser)]
#[command(
    name = "sts_extract",
    about = "Extract tabular records from ISO/NISO STS documents"
)]
struct Cli {
    /// Settings file (default: ./sts_extract.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every XML document in the input directory
    Run {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
        /// Extractors to run, comma separated (default: all but sections)
        #[arg(long, value_enum, value_delimiter = ',')]
        only: Vec<Extractor>,
        /// Abort on the first document or extractor failure
        #[arg(long)]
        fail_fast: bool,
        /// Max documents to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Run extractors over one document and print the rows
    Extract {
        file: PathBuf,
        #[arg(long, value_enum, value_delimiter = ',')]
        only: Vec<Extractor>,
        /// Print JSON lines instead of CSV
        #[arg(long)]
        json: bool,
    },
    /// List extractors with their tables and fields
    Fields,
    /// Show row counts per output table
    Stats {
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Run {
            input,
            output: out_dir,
            format,
            only,
            fail_fast,
            limit,
        } => {
            if let Some(dir) = input {
                settings.input_dir = dir;
            }
            if let Some(dir) = out_dir {
                settings.output_dir = dir;
            }
            if let Some(f) = format {
                settings.format = f;
            }
            if !only.is_empty() {
                settings.extractors = only;
            }
            settings.fail_fast |= fail_fast;
            run(&settings, limit)
        }
        Commands::Extract { file, only, json } => {
            let pipeline = if only.is_empty() { settings.extractors } else { only };
            extract_one(&file, &pipeline, json)
        }
        Commands::Fields => {
            for &e in Extractor::ALL {
                let default = if Extractor::DEFAULT_PIPELINE.contains(&e) {
                    ""
                } else {
                    " (opt-in)"
                };
                println!(
                    "{:<15} {:<11} {}{}",
                    e.name(),
                    e.table(),
                    e.fields().join(","),
                    default
                );
            }
            Ok(())
        }
        Commands::Stats { output: out_dir, format } => {
            let dir = out_dir.unwrap_or(settings.output_dir);
            let format = format.unwrap_or(settings.format);
            for (e, count) in output::count_rows(format, &dir, Extractor::ALL)? {
                let count = count.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                println!("{:<11} {:>8}", e.table(), count);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run(settings: &Settings, limit: Option<usize>) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let started_at = Utc::now();
    let mut files = discover::discover(&settings.input_dir)?;
    if let Some(n) = limit {
        files.truncate(n);
    }
    if files.is_empty() {
        println!("No XML documents in {}.", settings.input_dir.display());
        return Ok(());
    }

    let mut sink = output::open(settings.format, &settings.output_dir, &settings.extractors)?;
    info!(
        format = ?settings.format,
        output = %settings.output_dir.display(),
        extractors = settings.extractors.len(),
        "Writing rows"
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let counts = pipeline::process_files(&files, settings, sink.as_mut(), &pb)?;
    pb.finish_and_clear();

    let summary = RunSummary {
        run_id: output::new_run_id(started_at),
        started_at,
        finished_at: Utc::now(),
        documents: counts.documents,
        failed_documents: counts.failed_documents,
        failed_extractions: counts.failed_extractions,
        rows: counts.total_rows(),
    };
    sink.record_run(&summary)?;
    sink.finish()?;
    info!(run_id = %summary.run_id, rows = summary.rows, "Run complete");
    counts.print();
    Ok(())
}

fn extract_one(file: &Path, pipeline: &[Extractor], json: bool) -> anyhow::Result<()> {
    let source = discover::SourceFile::from_path(file)
        .with_context(|| format!("Cannot derive a job id from {}", file.display()))?;
    let outcomes = parser::process_markup(
        &source.job_id,
        &std::fs::read_to_string(&source.path)
            .with_context(|| format!("Failed to read {}", source.path.display()))?,
        pipeline,
    )?;

    let stdout = std::io::stdout();
    for outcome in outcomes {
        let rows = match outcome.result {
            Ok(rows) => rows,
            Err(e) => {
                warn!(extractor = outcome.extractor.name(), "{}", e);
                continue;
            }
        };
        if json {
            for row in &rows {
                let line = serde_json::json!({ "table": outcome.extractor.table(), "row": row });
                println!("{}", line);
            }
        } else {
            println!("# {}", outcome.extractor.table());
            let mut writer = csv::Writer::from_writer(stdout.lock());
            writer.write_record(outcome.extractor.fields())?;
            for row in &rows {
                writer.write_record(row.values().iter().map(|v| v.as_deref().unwrap_or("")))?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
