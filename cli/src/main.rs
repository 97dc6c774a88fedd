use clap::Parser;
use colored::*;
use medquery_core::{
    AskOutcome, ClientConfig, Dispatcher, FileStore, HttpBackend, KeyValueStore, MemoryStore,
    SessionManager,
};
use std::process::ExitCode;
use std::sync::Arc;

mod app;
mod cli;
mod logging;
mod output;

use crate::cli::Args;
use crate::logging::{init_logging, log_error, parse_level};
use crate::output::print_usage_instructions;

/// Main function - Loads configuration, restores the session and runs the chat
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from a .env file if present
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse();

    // Config file, then environment, then flags
    let file_config = match &args.config {
        Some(path) => ClientConfig::load_from_file(path)
            .map(|config| config.merge(&ClientConfig::from_env())),
        None => ClientConfig::load(),
    };
    let config = match file_config {
        Ok(config) => config.merge(&args.config_overrides()),
        Err(e) => {
            eprintln!("{}", format!("Error loading configuration: {}", e).red());
            return Err(e.into());
        }
    };

    init_logging(parse_level(config.log_level.as_deref()));

    let store: Arc<dyn KeyValueStore> = if args.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let path = config.storage_path()?;
        log::debug!("Using session storage at {}", path.display());
        Arc::new(FileStore::new(path))
    };

    let mut sessions = SessionManager::load(store);
    if args.new_session {
        let id = sessions.regenerate();
        log::info!("Starting a new session as requested: {}", id);
    }

    let dispatcher = Dispatcher::new(Arc::new(HttpBackend::from_config(&config)), sessions);

    if args.interactive {
        if let Err(e) = crate::app::run_interactive_chat(&dispatcher, &config).await {
            log_error(&format!("Error in interactive chat: {}", e));
            return Ok(ExitCode::FAILURE);
        }
    } else if let Some(prompt) = args.prompt {
        match crate::app::run_single_query(prompt, &dispatcher, &config).await {
            Ok(AskOutcome::Failed(_)) => return Ok(ExitCode::FAILURE),
            Ok(_) => {}
            Err(e) => {
                log_error(&format!("Error processing prompt: {}", e));
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        print_usage_instructions();
    }

    Ok(ExitCode::SUCCESS)
}
