use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::client::AskBackend;
use crate::render::ViewState;
use crate::session::SessionManager;
use crate::types::{AskRequest, ChatItem};

/// What a call to [`Dispatcher::ask`] ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// Blank question, nothing appended and nothing sent
    Ignored,
    /// The backend answer was appended
    Answered,
    /// The request failed and this error text was appended
    Failed(String),
    /// A new chat started while the request was in flight; the response was dropped
    Discarded,
}

#[derive(Debug)]
struct ChatState {
    items: Vec<ChatItem>,
    input: String,
    in_flight: usize,
    generation: u64,
    sessions: SessionManager,
}

/// Conversation state plus the operation that talks to the backend.
///
/// Cloning is cheap and every clone works on the same conversation, so a
/// clone can be moved into a spawned task. The state lock is never held
/// while waiting for the backend or for a session id write.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn AskBackend>,
    state: Arc<Mutex<ChatState>>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn AskBackend>, sessions: SessionManager) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(ChatState {
                items: Vec::new(),
                input: String::new(),
                in_flight: 0,
                generation: 0,
                sessions,
            })),
        }
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.state.lock().await.input = text.into();
    }

    pub async fn input(&self) -> String {
        self.state.lock().await.input.clone()
    }

    pub async fn items(&self) -> Vec<ChatItem> {
        self.state.lock().await.items.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.in_flight > 0
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .sessions
            .current()
            .map(str::to_string)
    }

    /// Everything the renderer needs, copied out of the lock
    pub async fn snapshot(&self, placeholder: &str) -> ViewState {
        let state = self.state.lock().await;
        ViewState {
            items: state.items.clone(),
            loading: state.in_flight > 0,
            placeholder: placeholder.to_string(),
            session_id: state.sessions.current().map(str::to_string),
        }
    }

    /// Sends a question to the backend and appends the exchange.
    ///
    /// `text` overrides the input field; when it is `None` the input field is
    /// used and cleared. Errors never escape: they become an assistant item.
    #[instrument(skip(self, text))]
    pub async fn ask(&self, text: Option<&str>) -> AskOutcome {
        let (request, generation, pending_write) = {
            let mut state = self.state.lock().await;
            let question = text.unwrap_or(state.input.as_str()).trim().to_string();
            if question.is_empty() {
                debug!("Ignoring blank question");
                return AskOutcome::Ignored;
            }
            if text.is_none() {
                state.input.clear();
            }

            let (session_id, pending_write) = state.sessions.ensure_deferred();
            state.items.push(ChatItem::user(question.clone()));
            state.in_flight += 1;
            (
                AskRequest {
                    question,
                    session_id,
                },
                state.generation,
                pending_write,
            )
        };

        if let Some(write) = pending_write {
            write.save().await;
        }

        debug!("Sending question for session {}", request.session_id);
        let result = self.backend.ask(&request).await;

        let mut state = self.state.lock().await;
        state.in_flight = state.in_flight.saturating_sub(1);

        if state.generation != generation {
            info!("Dropping response that belongs to a previous chat");
            return AskOutcome::Discarded;
        }

        match result {
            Ok(response) => {
                state
                    .items
                    .push(ChatItem::assistant(response.answer, response.citations));
                AskOutcome::Answered
            }
            Err(e) => {
                warn!("Backend request failed: {}", e);
                let message = format!("Error contacting backend: {}", e.describe());
                state.items.push(ChatItem::assistant(message.clone(), None));
                AskOutcome::Failed(message)
            }
        }
    }

    /// Clears the conversation and the input and starts a new session.
    /// Returns the new session id once it is persisted.
    pub async fn new_chat(&self) -> String {
        let (id, write) = {
            let mut state = self.state.lock().await;
            state.items.clear();
            state.input.clear();
            state.generation += 1;
            state.sessions.regenerate_deferred()
        };
        write.save().await;
        info!("Started new chat with session {}", id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{MedQueryError, MedQueryResult};
    use crate::render::{render_view, RenderOptions};
    use crate::session::{KeyValueStore, MemoryStore, SESSION_KEY};
    use crate::types::{AskResponse, Citation};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Semaphore;

    /// Replies with a canned result and records every request
    struct ScriptedBackend {
        reply: fn() -> MedQueryResult<AskResponse>,
        requests: StdMutex<Vec<AskRequest>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedBackend {
        fn new(reply: fn() -> MedQueryResult<AskResponse>) -> Self {
            Self {
                reply,
                requests: StdMutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(reply: fn() -> MedQueryResult<AskResponse>, gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(reply)
            }
        }

        fn requests(&self) -> Vec<AskRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AskBackend for ScriptedBackend {
        async fn ask(&self, request: &AskRequest) -> MedQueryResult<AskResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            (self.reply)()
        }
    }

    fn labs_answer() -> MedQueryResult<AskResponse> {
        Ok(AskResponse {
            answer: "CBC and lipid panel.".to_string(),
            citations: Some(vec![Citation {
                doc_id: "soap".to_string(),
                section: Some("Labs".to_string()),
                snippet: Some("CBC, lipid panel ordered".to_string()),
            }]),
        })
    }

    fn connection_refused() -> MedQueryResult<AskResponse> {
        Err(MedQueryError::RequestError("connection refused".to_string()))
    }

    fn silent_failure() -> MedQueryResult<AskResponse> {
        Err(MedQueryError::OtherError(String::new()))
    }

    fn dispatcher_with(backend: Arc<ScriptedBackend>) -> (Dispatcher, MemoryStore) {
        let store = MemoryStore::new();
        let sessions = SessionManager::load(Arc::new(store.clone()));
        (Dispatcher::new(backend, sessions), store)
    }

    #[tokio::test]
    async fn test_blank_question_is_ignored() {
        let backend = Arc::new(ScriptedBackend::new(labs_answer));
        let (dispatcher, _) = dispatcher_with(backend.clone());

        dispatcher.set_input("   \t ").await;
        assert_eq!(dispatcher.ask(None).await, AskOutcome::Ignored);
        assert_eq!(dispatcher.ask(Some("")).await, AskOutcome::Ignored);

        assert!(dispatcher.items().await.is_empty());
        assert!(backend.requests().is_empty());
        assert!(!dispatcher.is_loading().await);
    }

    #[tokio::test]
    async fn test_successful_ask_appends_user_then_assistant() {
        let backend = Arc::new(ScriptedBackend::new(labs_answer));
        let (dispatcher, _) = dispatcher_with(backend.clone());
        let session_id = dispatcher.session_id().await.unwrap();

        dispatcher.set_input("  What tests were ordered?  ").await;
        assert_eq!(dispatcher.ask(None).await, AskOutcome::Answered);

        let expected = labs_answer().unwrap();
        assert_eq!(
            dispatcher.items().await,
            vec![
                ChatItem::user("What tests were ordered?"),
                ChatItem::assistant(expected.answer, expected.citations),
            ]
        );
        assert_eq!(
            backend.requests(),
            vec![AskRequest {
                question: "What tests were ordered?".to_string(),
                session_id,
            }]
        );
        assert_eq!(dispatcher.input().await, "");
        assert!(!dispatcher.is_loading().await);
    }

    #[tokio::test]
    async fn test_explicit_text_keeps_input() {
        let backend = Arc::new(ScriptedBackend::new(labs_answer));
        let (dispatcher, _) = dispatcher_with(backend);

        dispatcher.set_input("draft").await;
        dispatcher.ask(Some("Has it worsened recently?")).await;
        assert_eq!(dispatcher.input().await, "draft");
    }

    #[tokio::test]
    async fn test_failed_ask_appends_error_text() {
        let backend = Arc::new(ScriptedBackend::new(connection_refused));
        let (dispatcher, _) = dispatcher_with(backend);

        let outcome = dispatcher.ask(Some("Any allergies?")).await;
        assert!(matches!(outcome, AskOutcome::Failed(_)));

        let items = dispatcher.items().await;
        assert_eq!(items.len(), 2);
        match &items[1] {
            ChatItem::Assistant { answer, citations } => {
                assert!(answer.starts_with("Error contacting backend:"));
                assert!(answer.contains("connection refused"));
                assert!(citations.is_none());
            }
            other => panic!("expected assistant item, got {:?}", other),
        }
        assert!(!dispatcher.is_loading().await);
    }

    #[tokio::test]
    async fn test_failure_without_description_says_unknown_error() {
        let backend = Arc::new(ScriptedBackend::new(silent_failure));
        let (dispatcher, _) = dispatcher_with(backend);

        assert_eq!(
            dispatcher.ask(Some("Any allergies?")).await,
            AskOutcome::Failed("Error contacting backend: unknown error".to_string())
        );
    }

    #[tokio::test]
    async fn test_new_chat_resets_conversation_and_session() {
        let backend = Arc::new(ScriptedBackend::new(labs_answer));
        let (dispatcher, store) = dispatcher_with(backend);
        let before = dispatcher.session_id().await.unwrap();

        dispatcher.ask(Some("What tests were ordered?")).await;
        dispatcher.set_input("half typed").await;
        let after = dispatcher.new_chat().await;

        assert_ne!(before, after);
        assert_eq!(store.get(SESSION_KEY).unwrap(), Some(after.clone()));
        assert_eq!(dispatcher.session_id().await, Some(after));
        assert!(dispatcher.items().await.is_empty());
        assert_eq!(dispatcher.input().await, "");
    }

    #[tokio::test]
    async fn test_missing_session_is_created_on_ask() {
        let backend = Arc::new(ScriptedBackend::new(labs_answer));
        let store = MemoryStore::new();
        let dispatcher = Dispatcher::new(
            backend.clone(),
            SessionManager::new(Arc::new(store.clone())),
        );
        assert!(dispatcher.session_id().await.is_none());

        dispatcher.ask(Some("Any recent travel or exposures?")).await;

        let stored = store.get(SESSION_KEY).unwrap().unwrap();
        assert_eq!(backend.requests()[0].session_id, stored);
    }

    #[tokio::test]
    async fn test_loading_while_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Arc::new(ScriptedBackend::gated(labs_answer, gate.clone()));
        let (dispatcher, _) = dispatcher_with(backend.clone());

        let pending = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.ask(Some("What follow-up was recommended?")).await }
        });
        while backend.requests().is_empty() {
            tokio::task::yield_now().await;
        }

        assert!(dispatcher.is_loading().await);
        assert_eq!(
            dispatcher.items().await,
            vec![ChatItem::user("What follow-up was recommended?")]
        );

        gate.add_permits(1);
        assert_eq!(pending.await.unwrap(), AskOutcome::Answered);
        assert!(!dispatcher.is_loading().await);
    }

    #[tokio::test]
    async fn test_response_after_new_chat_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Arc::new(ScriptedBackend::gated(labs_answer, gate.clone()));
        let (dispatcher, _) = dispatcher_with(backend.clone());

        let pending = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.ask(Some("What tests were ordered?")).await }
        });
        while backend.requests().is_empty() {
            tokio::task::yield_now().await;
        }

        dispatcher.new_chat().await;
        gate.add_permits(1);

        assert_eq!(pending.await.unwrap(), AskOutcome::Discarded);
        assert!(dispatcher.items().await.is_empty());
        assert!(!dispatcher.is_loading().await);
    }

    #[tokio::test]
    async fn test_overlapping_asks_both_complete() {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Arc::new(ScriptedBackend::gated(labs_answer, gate.clone()));
        let (dispatcher, _) = dispatcher_with(backend.clone());

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.ask(Some("first")).await }
        });
        let second = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.ask(Some("second")).await }
        });
        while backend.requests().len() < 2 {
            tokio::task::yield_now().await;
        }
        assert!(dispatcher.is_loading().await);

        gate.add_permits(2);
        assert_eq!(first.await.unwrap(), AskOutcome::Answered);
        assert_eq!(second.await.unwrap(), AskOutcome::Answered);

        let items = dispatcher.items().await;
        assert_eq!(items.len(), 4);
        let users = items
            .iter()
            .filter(|item| matches!(item, ChatItem::User { .. }))
            .count();
        assert_eq!(users, 2);
        assert!(!dispatcher.is_loading().await);
    }

    #[tokio::test]
    async fn test_snapshot_feeds_the_renderer() {
        colored::control::set_override(false);
        let gate = Arc::new(Semaphore::new(0));
        let backend = Arc::new(ScriptedBackend::gated(labs_answer, gate.clone()));
        let (dispatcher, _) = dispatcher_with(backend.clone());
        let session_id = dispatcher.session_id().await.unwrap();

        let pending = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.ask(Some("What tests were ordered?")).await }
        });
        while backend.requests().is_empty() {
            tokio::task::yield_now().await;
        }

        let view = dispatcher.snapshot("Has it worsened recently?").await;
        assert!(view.loading);
        assert_eq!(view.items, vec![ChatItem::user("What tests were ordered?")]);
        assert_eq!(view.placeholder, "Has it worsened recently?");
        assert_eq!(view.session_id.as_deref(), Some(session_id.as_str()));
        assert!(render_view(&view, &RenderOptions::default()).contains("Thinking…"));

        gate.add_permits(1);
        pending.await.unwrap();

        let view = dispatcher.snapshot("Has it worsened recently?").await;
        assert!(!view.loading);
        let options = RenderOptions {
            expand_citations: true,
            ..RenderOptions::default()
        };
        let screen = render_view(&view, &options);
        assert!(screen.contains(&format!("session: {}…", &session_id[..8])));
        assert!(screen.contains("CBC and lipid panel."));
        assert!(screen.contains("SOAP Labs — CBC, lipid panel ordered"));
        assert!(!screen.contains("Thinking…"));
    }
}
