use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::errors::{MedQueryError, MedQueryResult};
use crate::types::{AskRequest, AskResponse};

/// Anything that can answer a question for a session.
#[async_trait]
pub trait AskBackend: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> MedQueryResult<AskResponse>;
}

/// Client for the backend's `/ask` endpoint
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::from_config(&ClientConfig {
            backend_url: Some(base_url.into()),
            ..ClientConfig::default()
        })
    }

    /// Builds the client from configuration. A missing base URL is reported
    /// by the first `ask`, not here.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
        }
    }

    fn ask_url(&self) -> MedQueryResult<String> {
        let base = self.config.backend_url()?;
        Ok(format!("{}/ask", base.trim_end_matches('/')))
    }
}

#[async_trait]
impl AskBackend for HttpBackend {
    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    async fn ask(&self, request: &AskRequest) -> MedQueryResult<AskResponse> {
        let url = self.ask_url()?;
        debug!("Posting question to {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| MedQueryError::RequestError(format!("Failed to send request: {}", e)))?;

        // The body is read as JSON whatever the status, only the log differs.
        let status = response.status();
        if !status.is_success() {
            warn!("Backend answered with status {}", status);
        }

        let body = response.bytes().await.map_err(|e| {
            MedQueryError::RequestError(format!("Failed to read response: {}", e))
        })?;

        let parsed = serde_json::from_slice::<AskResponse>(&body)
            .map_err(|e| MedQueryError::ParsingError(format!("Failed to parse response: {}", e)))?;

        debug!(
            "Received answer ({} chars, {} citations)",
            parsed.answer.len(),
            parsed.citations.as_ref().map_or(0, Vec::len)
        );
        Ok(parsed)
    }
}
