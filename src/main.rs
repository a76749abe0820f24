//! # gorag CLI
//!
//! The `gorag` binary runs the retrieval-augmented generation gateway and
//! offers a few commands for exercising the pipeline from a terminal.
//!
//! ## Usage
//!
//! ```bash
//! gorag --config ./config/gorag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gorag serve` | Start the HTTP gateway |
//! | `gorag ask "<query>"` | Run the full pipeline, streaming the answer to stdout |
//! | `gorag embed "<text>"` | Embed text and show the model, collection and vector shape |
//! | `gorag collection <model>` | Print the collection name for a model identity |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use gorag::collection::collection_name_for;
use gorag::config;
use gorag::error::GatewayError;
use gorag::pipeline::RagPipeline;
use gorag::{server, telemetry};

/// gorag: a retrieval-augmented generation gateway.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "gorag",
    about = "gorag: a retrieval-augmented generation gateway",
    version,
    long_about = "gorag embeds queries, retrieves grounding passages from a Qdrant collection \
    named after the embedding model, and streams grounded chat completions from an \
    OpenAI-compatible generation server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/gorag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway.
    ///
    /// Binds to `[server].bind` unless `--bind` is given.
    Serve {
        /// Address to listen on, e.g. `0.0.0.0:9091`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Answer a query with the full pipeline.
    ///
    /// Chunks from the generation service are written to stdout as they
    /// arrive, flushed one by one.
    Ask {
        /// The user query.
        query: String,

        /// Sampling temperature. Defaults to `[generation].temperature`.
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Embed text and describe the result.
    Embed {
        /// Text to embed, sent unmodified.
        text: String,
    },

    /// Print the collection name derived from a model identity.
    Collection {
        /// Model identity, e.g. `models/nomic_embed.Q8.gguf`.
        model: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Collection { model } = &cli.command {
        println!("{}", collection_name_for(model));
        return Ok(());
    }

    let mut cfg = config::load_or_default(&cli.config)?;
    // Flushes buffered file logs on exit.
    let _log_guard = telemetry::init(&cfg.logging)?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
        Commands::Ask { query, temperature } => {
            let pipeline = RagPipeline::from_config(&cfg)?;
            let temperature = temperature.unwrap_or(cfg.generation.temperature);
            let mut stdout = std::io::stdout().lock();

            pipeline
                .answer_with(&query, temperature, |chunk| {
                    stdout
                        .write_all(chunk.as_bytes())
                        .and_then(|_| stdout.flush())
                        .map_err(|_| GatewayError::ClientGone)
                })
                .await
                .context("ask failed")?;
            writeln!(stdout)?;
        }
        Commands::Embed { text } => {
            let pipeline = RagPipeline::from_config(&cfg)?;
            let result = pipeline.embedder().embed(&text).await?;
            println!("model:      {}", result.model);
            println!("collection: {}", collection_name_for(&result.model));
            println!("vectors:    {}", result.vectors.len());
            if let Some(first) = result.vectors.first() {
                println!("dims:       {}", first.len());
            }
        }
        Commands::Collection { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
