//! Session store: the single live session and its transcript.
//!
//! The transcript is append-only for the lifetime of a session and is
//! mutated only through `open`, `append` and `reset`, so there is exactly
//! one writer surface for conversation state.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::{Backend, HistoryTurn};
use crate::models::{Message, Session};

#[derive(Default)]
struct StoreInner {
    session: Option<Session>,
    transcript: Vec<Message>,
}

/// Holds at most one `Session` and the ordered messages exchanged about it.
pub struct SessionStore {
    backend: Arc<dyn Backend>,
    inner: Mutex<StoreInner>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Install a freshly created session and seed the transcript with the
    /// locally synthesized greeting.
    pub async fn open(&self, session: Session) {
        let greeting = greeting_for(&session);
        let mut inner = self.inner.lock().await;
        inner.session = Some(session);
        inner.transcript = vec![greeting];
    }

    /// Append one message to the transcript of the live session.
    pub async fn append(&self, message: Message) {
        let mut inner = self.inner.lock().await;
        inner.transcript.push(message);
    }

    /// Identifier of the live session, if any.
    pub async fn session_id(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.session.as_ref().map(|s| s.session_id.clone())
    }

    /// Copy of the transcript in conversation order.
    pub async fn transcript(&self) -> Vec<Message> {
        let inner = self.inner.lock().await;
        inner.transcript.clone()
    }

    /// Atomically snapshot the prior transcript as `{role, content}` turns
    /// and append the new user message, so the replayed history never
    /// includes the question being asked. Citations are dropped from the
    /// snapshot: they are derived, not conversational state. The greeting is
    /// included as an ordinary assistant turn.
    ///
    /// Returns `None` (with no state change) when no session is live.
    pub async fn start_turn(&self, message: Message) -> Option<(String, Vec<HistoryTurn>)> {
        let mut inner = self.inner.lock().await;
        let session_id = inner.session.as_ref()?.session_id.clone();
        let history = inner
            .transcript
            .iter()
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();
        inner.transcript.push(message);
        Some((session_id, history))
    }

    /// Close the live session, clearing the transcript and asking the
    /// backend to delete its copy.
    ///
    /// The session is considered closed client-side as soon as the state is
    /// cleared; the deletion is best-effort and failures are swallowed.
    /// Calling `reset` with no live session is a no-op.
    pub async fn reset(&self) {
        let closed = {
            let mut inner = self.inner.lock().await;
            inner.transcript.clear();
            inner.session.take()
        };
        let Some(session) = closed else {
            return;
        };
        if let Err(err) = self.backend.delete_session(&session.session_id).await {
            tracing::debug!(session_id = %session.session_id, "session cleanup failed: {err}");
        }
    }
}

/// Greeting shown once a document is indexed. Interpolates the backend's
/// metadata; the bold marker is interpreted at render time.
fn greeting_for(session: &Session) -> Message {
    Message::assistant(
        format!(
            "**{}** is ready. I indexed {} pages into {} searchable chunks. \
             Ask me anything about the document.",
            session.filename, session.total_pages, session.total_chunks
        ),
        Vec::new(),
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::api::{ApiError, ChatReply};
    use crate::models::MessageRole;

    /// Backend stub that counts deletions and can be made to fail them.
    struct StubBackend {
        deletions: AtomicUsize,
        fail_delete: bool,
    }

    impl StubBackend {
        fn new(fail_delete: bool) -> Arc<Self> {
            Arc::new(Self {
                deletions: AtomicUsize::new(0),
                fail_delete,
            })
        }
    }

    #[async_trait]
    impl Backend for StubBackend {
        async fn upload_document(
            &self,
            _path: &Path,
            _progress: mpsc::Sender<u8>,
        ) -> Result<Session, ApiError> {
            unimplemented!("not exercised here")
        }

        async fn chat(
            &self,
            _session_id: &str,
            _question: &str,
            _history: &[HistoryTurn],
        ) -> Result<ChatReply, ApiError> {
            unimplemented!("not exercised here")
        }

        async fn session_info(&self, _session_id: &str) -> Result<Session, ApiError> {
            unimplemented!("not exercised here")
        }

        async fn delete_session(&self, _session_id: &str) -> Result<(), ApiError> {
            self.deletions.fetch_add(1, Ordering::SeqCst);
            if self.fail_delete {
                return Err(ApiError::Backend {
                    status: 500,
                    detail: "boom".into(),
                });
            }
            Ok(())
        }
    }

    fn sample_session() -> Session {
        Session::new("s1".into(), "report.pdf".into(), 12, 40)
    }

    #[tokio::test]
    async fn opening_a_session_seeds_the_greeting() {
        let store = SessionStore::new(StubBackend::new(false));
        store.open(sample_session()).await;

        let transcript = store.transcript().await;
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, MessageRole::Assistant);
        assert!(transcript[0].content.contains("report.pdf"));
        assert!(transcript[0].content.contains("12"));
        assert!(transcript[0].content.contains("40"));
        assert!(transcript[0].source_pages.is_empty());
    }

    #[tokio::test]
    async fn start_turn_snapshots_before_appending_and_drops_citations() {
        let store = SessionStore::new(StubBackend::new(false));
        store.open(sample_session()).await;
        store
            .append(Message::assistant("See page two.", vec![2]))
            .await;

        let (session_id, history) = store
            .start_turn(Message::user("Summarize this"))
            .await
            .expect("session is live");
        assert_eq!(session_id, "s1");
        // Greeting and prior answer, but not the question just asked.
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "See page two.");
        assert_eq!(store.transcript().await.len(), 3);
    }

    #[tokio::test]
    async fn start_turn_without_a_session_changes_nothing() {
        let store = SessionStore::new(StubBackend::new(false));
        assert!(store.start_turn(Message::user("hello")).await.is_none());
        assert!(store.transcript().await.is_empty());
    }

    #[tokio::test]
    async fn reset_twice_deletes_once() {
        let backend = StubBackend::new(false);
        let store = SessionStore::new(Arc::clone(&backend) as Arc<dyn Backend>);
        store.open(sample_session()).await;

        store.reset().await;
        store.reset().await;

        assert_eq!(backend.deletions.load(Ordering::SeqCst), 1);
        assert!(store.session_id().await.is_none());
        assert!(store.transcript().await.is_empty());
    }

    #[tokio::test]
    async fn reset_swallows_deletion_failures() {
        let backend = StubBackend::new(true);
        let store = SessionStore::new(Arc::clone(&backend) as Arc<dyn Backend>);
        store.open(sample_session()).await;

        store.reset().await;

        assert_eq!(backend.deletions.load(Ordering::SeqCst), 1);
        assert!(store.session_id().await.is_none());
    }
}
