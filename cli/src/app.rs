use anyhow::{Context, Result};
use colored::*;
use log::{debug, info};
use medquery_core::render::{RenderOptions, Transcript};
use medquery_core::{AskOutcome, ClientConfig, Dispatcher, PlaceholderTicker};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::output::{print_banner, print_last_citations, thinking_spinner};

/// Line typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    NewChat,
    Citations,
    Session,
    Ask(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return Self::Exit;
        }
        match line {
            "/new" => Self::NewChat,
            "/citations" => Self::Citations,
            "/session" => Self::Session,
            _ => Self::Ask(line.to_string()),
        }
    }
}

/// Asks one question, prints the exchange and returns what happened
pub async fn run_single_query(
    question: String,
    dispatcher: &Dispatcher,
    config: &ClientConfig,
) -> Result<AskOutcome> {
    info!("Running single query: {}", question);
    let options = RenderOptions {
        width: config.width(),
        expand_citations: true,
    };

    let spinner = thinking_spinner();
    let outcome = dispatcher.ask(Some(question.as_str())).await;
    spinner.finish_and_clear();

    // The question itself was typed on the command line, only the answer is new
    let view = dispatcher.snapshot("").await;
    let mut transcript = Transcript::new();
    let answers = view.items.get(1..).unwrap_or_default();
    print!("{}", transcript.render_new(answers, &options));

    Ok(outcome)
}

/// Runs an interactive chat session until `exit`, `quit` or end of input
pub async fn run_interactive_chat(dispatcher: &Dispatcher, config: &ClientConfig) -> Result<()> {
    let ticker = PlaceholderTicker::start(config.placeholder_interval());
    let options = RenderOptions {
        width: config.width(),
        expand_citations: config.show_citations(),
    };
    let mut transcript = Transcript::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_banner(&dispatcher.snapshot(ticker.current()).await);
    println!("Type 'exit' or 'quit' to end the session, '/new' for a new chat.");
    println!();

    loop {
        // New items since the last prompt, then the prompt with the current hint
        let view = dispatcher.snapshot(ticker.current()).await;
        print!("{}", transcript.render_frame(&view, &options));
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            println!();
            break;
        };

        match Command::parse(&line) {
            Command::Exit => {
                println!("Exiting chat session.");
                break;
            }
            Command::NewChat => {
                dispatcher.new_chat().await;
                transcript.reset();
                println!();
                print_banner(&dispatcher.snapshot(ticker.current()).await);
            }
            Command::Citations => {
                print_last_citations(&dispatcher.items().await);
            }
            Command::Session => match dispatcher.session_id().await {
                Some(id) => println!("session: {}", id.blue()),
                None => println!("session: —"),
            },
            Command::Ask(question) => {
                dispatcher.set_input(question).await;
                let spinner = thinking_spinner();
                let outcome = dispatcher.ask(None).await;
                spinner.finish_and_clear();
                debug!("Ask finished: {:?}", outcome);
            }
        }
    }

    ticker.stop();
    Ok(())
}
