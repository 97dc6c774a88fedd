use serde::{Deserialize, Serialize};

/// A reference to a source passage supporting an answer. Display only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Citation {
    #[serde(default)]
    pub doc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Citation {
    /// Label shown in front of the snippet: `SOAP <section>` for the SOAP note,
    /// `Transcript` for everything else.
    pub fn label(&self) -> String {
        if self.doc_id == "soap" {
            format!("SOAP {}", self.section.as_deref().unwrap_or(""))
                .trim_end()
                .to_string()
        } else {
            "Transcript".to_string()
        }
    }
}

/// One entry of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatItem {
    User {
        text: String,
    },
    Assistant {
        answer: String,
        citations: Option<Vec<Citation>>,
    },
}

impl ChatItem {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn assistant(answer: impl Into<String>, citations: Option<Vec<Citation>>) -> Self {
        Self::Assistant {
            answer: answer.into(),
            citations,
        }
    }

    /// Citations attached to an assistant item, empty for user items.
    pub fn citations(&self) -> &[Citation] {
        match self {
            Self::Assistant {
                citations: Some(citations),
                ..
            } => citations,
            _ => &[],
        }
    }
}

/// Body of `POST {backend}/ask`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
    pub session_id: String,
}

/// Response of `POST {backend}/ask`. Fields are taken as-is; a missing answer
/// becomes an empty string.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct AskResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}
