use clap::Parser;
use medquery_core::{ClientConfig, BACKEND_URL_ENV};
use std::path::PathBuf;

/// Terminal chat client for the MedQuery backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The question to ask (single query mode)
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Start a new session, replacing the stored session ID
    #[arg(long, default_value_t = false)]
    pub new_session: bool,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Base URL of the backend serving `/ask`
    #[arg(long, env = BACKEND_URL_ENV)]
    pub backend_url: Option<String>,

    /// File holding the persisted session ID
    #[arg(long)]
    pub storage_file: Option<PathBuf>,

    /// Keep the session ID in memory only
    #[arg(long, default_value_t = false)]
    pub ephemeral: bool,

    /// Print citations expanded instead of collapsed
    #[arg(long, default_value_t = false)]
    pub show_citations: bool,

    /// Path to the config file (defaults to ~/.config/medquery/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Values given on the command line, to be merged over the config file
    pub fn config_overrides(&self) -> ClientConfig {
        ClientConfig {
            backend_url: self.backend_url.clone(),
            storage_file: self.storage_file.clone(),
            log_level: self.verbose.then(|| "debug".to_string()),
            show_citations: self.show_citations.then_some(true),
            ..ClientConfig::default()
        }
    }
}
