use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use medquery_core::render::{self, ViewState, THINKING};
use medquery_core::ChatItem;
use std::time::Duration;

/// Spinner shown while a question is in flight
pub fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(THINKING);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Header line plus the helper text
pub fn print_banner(view: &ViewState) {
    print!("{}", render::render_banner(view));
}

/// Expanded citations of the most recent answer that has any
pub fn print_last_citations(items: &[ChatItem]) {
    let latest = items.iter().rev().find(|item| !item.citations().is_empty());
    match latest {
        Some(item) => {
            for citation in item.citations() {
                println!("  {} {}", "•".yellow(), render::citation_line(citation).italic());
            }
        }
        None => println!("{}", "No citations yet.".dimmed()),
    }
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "medquery \"your question\"".green().bold());
    println!("    Ask a single question and print the answer");
    println!();
    println!("  {}", "medquery -i".green().bold());
    println!("    Start an interactive chat session");
    println!();
    println!("{}", "Interactive commands:".cyan());
    println!("  /new        Start a new chat with a fresh session");
    println!("  /citations  Show the citations of the last answer");
    println!("  /session    Print the current session ID");
    println!("  exit, quit  Leave the chat");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --backend-url <URL>   Backend base URL (or MEDQUERY_BACKEND_URL)");
    println!("  --new-session         Replace the stored session ID");
    println!("  --show-citations      Print citations expanded");
    println!("  --help                Show this help message");
    println!();
}
