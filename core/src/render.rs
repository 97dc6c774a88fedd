//! Terminal rendering of the chat.
//!
//! Everything here is a pure function of [`ViewState`] (or a piece of it) and
//! returns the text to print.

use colored::*;

use crate::types::{ChatItem, Citation};

pub const TITLE: &str = "MedQuery Chat";
pub const HELPER_TEXT: &str = "What would you like to know about the patient visit?";
pub const THINKING: &str = "Thinking…";

const SESSION_PREFIX_LEN: usize = 8;

/// Snapshot of everything visible on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub items: Vec<ChatItem>,
    pub loading: bool,
    pub placeholder: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: usize,
    pub expand_citations: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 80,
            expand_citations: false,
        }
    }
}

/// `abcdef12…` for a known id, `—` otherwise
pub fn short_session(session_id: Option<&str>) -> String {
    match session_id {
        Some(id) if !id.is_empty() => {
            let prefix: String = id.chars().take(SESSION_PREFIX_LEN).collect();
            format!("{}…", prefix)
        }
        _ => "—".to_string(),
    }
}

pub fn render_header(session_id: Option<&str>) -> String {
    format!(
        "{}  {}",
        TITLE.bold(),
        format!("session: {}", short_session(session_id)).dimmed()
    )
}

/// One citation as `<label> — <snippet>`
pub fn citation_line(citation: &Citation) -> String {
    format!(
        "{} — {}",
        citation.label(),
        citation.snippet.as_deref().unwrap_or("")
    )
}

fn render_citations(citations: &[Citation], expanded: bool) -> String {
    if !expanded {
        return format!(
            "│ {}\n",
            format!("▸ Show citations ({})", citations.len()).blue()
        );
    }

    let mut output = format!("│ {}\n", "▾ Citations".blue());
    for citation in citations {
        output.push_str(&format!(
            "│   {} {}\n",
            "•".yellow(),
            citation_line(citation).italic()
        ));
    }
    output
}

pub fn render_item(item: &ChatItem, options: &RenderOptions) -> String {
    match item {
        ChatItem::User { text } => {
            let mut output = String::new();
            for line in text.lines() {
                let padding = options.width.saturating_sub(line.chars().count());
                output.push_str(&" ".repeat(padding));
                output.push_str(&line.bright_blue().bold().to_string());
                output.push('\n');
            }
            output
        }
        ChatItem::Assistant { answer, citations } => {
            let mut output = format!("╭─ {}\n", "Assistant".blue().bold());
            for line in answer.lines() {
                output.push_str(&format!("│ {}\n", line));
            }
            if let Some(citations) = citations.as_deref().filter(|c| !c.is_empty()) {
                output.push_str(&render_citations(citations, options.expand_citations));
            }
            output.push_str("╰─\n");
            output
        }
    }
}

pub fn render_thinking() -> String {
    format!("{}\n", THINKING.dimmed())
}

/// Input prompt with the current hint
pub fn render_prompt(placeholder: &str) -> String {
    format!("{} {} ", format!("({})", placeholder).dimmed(), "›".green().bold())
}

/// Header plus helper text, drawn once per chat
pub fn render_banner(view: &ViewState) -> String {
    format!(
        "{}\n{}\n\n",
        render_header(view.session_id.as_deref()),
        HELPER_TEXT.dimmed()
    )
}

fn render_items(items: &[ChatItem], options: &RenderOptions) -> String {
    items
        .iter()
        .map(|item| render_item(item, options) + "\n")
        .collect()
}

/// Full screen: banner, conversation, loading indicator, prompt
pub fn render_view(view: &ViewState, options: &RenderOptions) -> String {
    let mut output = render_banner(view);
    output.push_str(&render_items(&view.items, options));
    if view.loading {
        output.push_str(&render_thinking());
    }
    output.push_str(&render_prompt(&view.placeholder));
    output
}

/// Tracks what has already been printed so only new items are emitted,
/// which keeps the terminal scrolled to the newest message.
#[derive(Debug, Default)]
pub struct Transcript {
    rendered: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.rendered = 0;
    }

    /// Renders items not printed yet
    pub fn render_new(&mut self, items: &[ChatItem], options: &RenderOptions) -> String {
        if items.len() < self.rendered {
            self.rendered = 0;
        }
        let output = render_items(&items[self.rendered..], options);
        self.rendered = items.len();
        output
    }

    /// What changed since the last frame followed by the prompt. Printed
    /// line after line this reproduces [`render_view`] without redrawing
    /// earlier items.
    pub fn render_frame(&mut self, view: &ViewState, options: &RenderOptions) -> String {
        let mut output = self.render_new(&view.items, options);
        if view.loading {
            output.push_str(&render_thinking());
        }
        output.push_str(&render_prompt(&view.placeholder));
        output
    }
}
