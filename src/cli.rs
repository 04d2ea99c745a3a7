use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use topic_nmf::algo::corpus;
use topic_nmf::algo::nmf::UpdateSchedule;
use topic_nmf::{ops, TrainConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "nmf",
    version,
    about = "Topic discovery with divergence-objective non-negative matrix factorization"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Factorize a document file and report the top terms per topic
    Train {
        /// Document file: one line per document, comma-separated `index:count` pairs
        #[arg(short, long)]
        data: PathBuf,
        /// Vocabulary file: one term per line, line i names word i
        #[arg(short, long)]
        vocab: Option<PathBuf>,
        /// Vocabulary size. Inferred from the largest word index if omitted
        #[arg(long)]
        words: Option<usize>,
        /// Write topics.csv, topics_grid.csv and objective.csv here
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// JSON config file. Falls back to $TOPIC_NMF_CONFIG, then built-in defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of topics (default: 25)
        #[arg(short, long)]
        rank: Option<usize>,
        /// Number of update iterations, always run to completion (default: 100)
        #[arg(short, long)]
        iterations: Option<usize>,
        /// Random seed for factor initialization (default: 42)
        #[arg(long)]
        seed: Option<u64>,
        /// Terms listed per topic (default: 10)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
        /// Reconstruction used by the W step: refreshed, stale
        #[arg(long)]
        schedule: Option<String>,
        /// Fail on NaN/Inf instead of carrying it through
        #[arg(long)]
        strict: bool,
    },
    /// Report shape and sparsity of a document file
    Inspect {
        /// Document file: one line per document, comma-separated `index:count` pairs
        #[arg(short, long)]
        data: PathBuf,
        /// Vocabulary size. Inferred from the largest word index if omitted
        #[arg(long)]
        words: Option<usize>,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("topic_nmf=info,nmf=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Train {
            data,
            vocab,
            words,
            out_dir,
            config,
            rank,
            iterations,
            seed,
            top_n,
            schedule,
            strict,
        } => {
            let mut cfg = TrainConfig::resolve(config.as_deref()).context("failed to resolve config")?;
            if let Some(rank) = rank {
                cfg.rank = rank;
            }
            if let Some(iterations) = iterations {
                cfg.iterations = iterations;
            }
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            if let Some(top_n) = top_n {
                cfg.top_n = top_n;
            }
            if let Some(name) = schedule {
                cfg.schedule = UpdateSchedule::from_str(&name).ok_or_else(|| {
                    anyhow!(
                        "Unknown schedule '{name}'. Use: {}",
                        UpdateSchedule::all_names().join(", ")
                    )
                })?;
            }
            cfg.strict |= strict;

            ops::op_train(&data, vocab.as_deref(), words, &cfg, out_dir.as_deref())
                .with_context(|| format!("training on '{}' failed", data.display()))?
        }
        Commands::Inspect { data, words } => {
            let x = corpus::load_counts(&data, words)
                .with_context(|| format!("failed to load '{}'", data.display()))?;
            ops::op_inspect(&x)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
