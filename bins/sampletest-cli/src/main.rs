mod languages;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use languages::LanguageRegistry;
use sampletest_core::{discover, verify, CoreError, VerifyOptions};

#[derive(Parser)]
#[command(name = "sampletest")]
#[command(about = "Verify a solution against judge sample inputs/outputs", long_about = None)]
struct Cli {
    /// Solution file to verify
    file: PathBuf,

    /// Language name (default: detect from the file extension)
    #[arg(short, long)]
    language: Option<String>,

    /// Directory containing <id>.in / <id>.ans sample pairs
    #[arg(short, long, default_value = "samples")]
    samples: PathBuf,

    /// Compile with debug flags (e.g. -g, sanitizers) and echo stderr
    #[arg(short, long)]
    debug: bool,

    /// Stop running samples after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Exit 0 even when samples fail or none are found
    #[arg(short, long)]
    force: bool,

    /// Extra flag appended to the compile command (repeatable)
    #[arg(long = "compile-flag", value_name = "FLAG")]
    compile_flags: Vec<String>,

    /// Path to a languages.json overriding the built-in recipes
    #[arg(long, default_value = "config/languages.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if !cli.file.is_file() {
        anyhow::bail!("{} is not a file", cli.file.display());
    }

    let registry = LanguageRegistry::with_config(&cli.config)?;
    let spec = match &cli.language {
        Some(name) => registry.get(name)?,
        None => registry.for_file(&cli.file)?,
    };
    debug!(language = %spec.name, "selected language");

    let samples = match discover(&cli.samples) {
        Ok(samples) => samples,
        Err(CoreError::SamplesNotFound(dir)) if cli.force => {
            warn!("no samples in {}, continuing because of --force", dir.display());
            Vec::new()
        }
        Err(CoreError::SamplesNotFound(dir)) => {
            anyhow::bail!(
                "no samples found in {} (use --samples to point elsewhere, or --force to skip)",
                dir.display()
            );
        }
        Err(e) => return Err(e).context("failed to list samples"),
    };

    info!(
        language = %spec.name,
        sample_count = samples.len(),
        "verifying {}",
        cli.file.display()
    );

    let commands = spec.to_commands(cli.compile_flags.clone());
    let options = VerifyOptions {
        debug: cli.debug,
        fail_fast: cli.fail_fast,
    };

    let summary = verify(&cli.file, &commands, &samples, &options)
        .await
        .with_context(|| format!("verification of {} aborted", cli.file.display()))?;

    let passed = summary
        .reports
        .iter()
        .filter(|r| r.verdict.is_accepted())
        .count();
    println!();
    if summary.all_passed {
        println!("✓ {}/{} samples passed", passed, summary.reports.len());
    } else {
        println!("✗ {}/{} samples passed", passed, summary.reports.len());
    }

    if !summary.all_passed && !cli.force {
        std::process::exit(1);
    }
    Ok(())
}
