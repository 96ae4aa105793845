use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::element::ScreenplayDocument;
use crate::generation::SpeakableItemGenerationTask;
use crate::load_config::{finalize, load_config};
use crate::manager::BackgroundTaskManager;
use crate::normalizer::CharacterNormalizer;
use crate::processor::ScreenplaySpeechProcessor;
use crate::store::JsonLinesItemStore;
use crate::task::TaskState;

/// CLI for script-speech: turn parsed screenplays into speakable items.
#[derive(Parser)]
#[clap(
    name = "script-speech",
    version,
    about = "Convert parsed screenplay elements into speakable items for speech synthesis"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate speakable items for one screenplay document (JSON)
    Generate {
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Path to the parsed screenplay document
        #[clap(long)]
        input: PathBuf,
        /// Item store path, overriding `output.path` from the config
        #[clap(long)]
        output: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let result = dispatch(cli.command).await;

    let exit_span = tracing::info_span!("exit");
    exit_span.in_scope(|| {
        tracing::info!(ok = result.is_ok(), "exit");
    });

    result
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Generate {
            config,
            input,
            output,
        } => {
            let config = match config {
                Some(path) => load_config(path)?,
                None => finalize(AppConfig::default())?,
            };
            generate(config, input, output).await
        }
    }
}

async fn generate(config: AppConfig, input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let raw = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("Failed to read screenplay document {:?}", input))?;
    let mut document: ScreenplayDocument = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse screenplay document {:?}", input))?;
    if document.filename.is_none() {
        document.filename = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
    }

    let normalizer = CharacterNormalizer::new(config.rules.aliases.clone());
    let processor = Arc::new(ScreenplaySpeechProcessor::for_version(
        &config.rules.version,
        normalizer,
    )?);

    let output = output.unwrap_or_else(|| config.output.path.clone());
    let store = Arc::new(JsonLinesItemStore::open(&output).await?);

    let generation = SpeakableItemGenerationTask::new(document, processor, store)
        .with_save_interval(config.generation.save_interval)
        .replacing_existing(config.generation.replace_existing);

    let manager = BackgroundTaskManager::new();
    let task = manager.enqueue(generation.into_task());
    println!("Generation starting...");
    manager.run_until_idle().await;

    let snapshot = task.snapshot();
    match snapshot.state {
        TaskState::Completed => {
            println!("{}", snapshot.message);
            println!("Items written to {}", output.display());
            Ok(())
        }
        TaskState::Cancelled => {
            println!("Cancelled after {} of {} elements", snapshot.current_step, snapshot.total_steps);
            Ok(())
        }
        state => {
            let reason = snapshot.error.unwrap_or_else(|| snapshot.message.clone());
            eprintln!("[ERROR] Generation {}: {}", state.label(), reason);
            Err(anyhow::anyhow!("generation {}: {}", state.label(), reason))
        }
    }
}
