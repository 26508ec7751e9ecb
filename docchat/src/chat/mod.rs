//! Conversation controller: one serialized question/answer turn at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::{ApiError, Backend};
use crate::models::Message;
use crate::session::SessionStore;

/// What happened to a `send` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The backend answered; an assistant message was appended.
    Answered,
    /// The backend call failed; the failure was recovered inline as an
    /// assistant message and the conversation stays usable.
    Recovered,
    /// The question was empty after trimming. No state changed.
    IgnoredEmpty,
    /// A previous send is still in flight. No state changed.
    IgnoredBusy,
    /// No session is live. No state changed.
    NoSession,
    /// The session was reset while the call was in flight; the late reply
    /// was discarded.
    Discarded,
}

/// Drives the multi-turn chat loop against the session store.
///
/// Turns are strictly serialized: admission is a compare-exchange on
/// `awaiting_response`, so a send issued while one is in flight is a no-op
/// rather than a queued request.
pub struct ConversationController {
    backend: Arc<dyn Backend>,
    store: Arc<SessionStore>,
    awaiting_response: AtomicBool,
}

impl ConversationController {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<SessionStore>) -> Self {
        Self {
            backend,
            store,
            awaiting_response: AtomicBool::new(false),
        }
    }

    /// Whether a turn is currently in flight.
    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response.load(Ordering::SeqCst)
    }

    /// Ask one question. Appends the user message immediately, then the
    /// assistant's answer (or an inline error reply) once the call resolves.
    pub async fn send(&self, question: &str) -> SendOutcome {
        let question = question.trim();
        if question.is_empty() {
            return SendOutcome::IgnoredEmpty;
        }
        if self
            .awaiting_response
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return SendOutcome::IgnoredBusy;
        }

        let outcome = self.run_turn(question).await;
        self.awaiting_response.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_turn(&self, question: &str) -> SendOutcome {
        // Snapshot history and append the user message in one step: the
        // question travels in its own field, not in the replayed history.
        let Some((session_id, history)) = self.store.start_turn(Message::user(question)).await
        else {
            return SendOutcome::NoSession;
        };

        let result = self.backend.chat(&session_id, question, &history).await;

        // A reset may have closed the session while the call was in flight.
        // The backend offers no cancellation channel, so a late reply for a
        // closed session is detected here and dropped.
        if self.store.session_id().await.as_deref() != Some(session_id.as_str()) {
            tracing::debug!(%session_id, "dropping reply for a closed session");
            return SendOutcome::Discarded;
        }

        match result {
            Ok(reply) => {
                self.store
                    .append(Message::assistant(reply.answer, reply.source_pages))
                    .await;
                SendOutcome::Answered
            }
            Err(err) => {
                tracing::warn!(%session_id, "chat turn failed: {err}");
                self.store
                    .append(Message::assistant(fallback_reply(&err), Vec::new()))
                    .await;
                SendOutcome::Recovered
            }
        }
    }
}

/// User-legible reply standing in for a failed turn, carrying the backend
/// detail when there is one.
fn fallback_reply(err: &ApiError) -> String {
    format!(
        "Sorry, I couldn't answer that ({}). Please try asking again.",
        err.user_message()
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::sync::Notify;

    use super::*;
    use crate::api::{ChatReply, HistoryTurn};
    use crate::models::{MessageRole, Session};

    /// Scriptable chat backend for driving the controller.
    #[derive(Default)]
    struct ScriptedBackend {
        /// Error detail to fail with instead of answering.
        fail_with: Option<String>,
        /// Block inside `chat` until released, to hold a turn in flight.
        hold: Option<(Arc<Notify>, Arc<Notify>)>,
        /// Reset this store from inside `chat`, simulating a mid-flight
        /// session close.
        reset_during_chat: tokio::sync::Mutex<Option<Arc<SessionStore>>>,
        calls: AtomicUsize,
        seen_history: tokio::sync::Mutex<Vec<HistoryTurn>>,
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
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
            question: &str,
            history: &[HistoryTurn],
        ) -> Result<ChatReply, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_history.lock().await = history.to_vec();

            if let Some((entered, release)) = &self.hold {
                entered.notify_one();
                release.notified().await;
            }
            if let Some(store) = self.reset_during_chat.lock().await.take() {
                store.reset().await;
            }
            if let Some(detail) = &self.fail_with {
                return Err(ApiError::Backend {
                    status: 503,
                    detail: detail.clone(),
                });
            }
            Ok(ChatReply {
                answer: format!("Answer to: {question}"),
                source_pages: vec![2, 5],
            })
        }

        async fn session_info(&self, _session_id: &str) -> Result<Session, ApiError> {
            unimplemented!("not exercised here")
        }

        async fn delete_session(&self, _session_id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    async fn harness(backend: Arc<ScriptedBackend>) -> (Arc<SessionStore>, ConversationController) {
        let store = Arc::new(SessionStore::new(
            Arc::clone(&backend) as Arc<dyn Backend>
        ));
        store
            .open(Session::new("s1".into(), "report.pdf".into(), 12, 40))
            .await;
        let controller =
            ConversationController::new(backend as Arc<dyn Backend>, Arc::clone(&store));
        (store, controller)
    }

    #[tokio::test]
    async fn successful_turns_grow_the_transcript_in_pairs() {
        let backend = Arc::new(ScriptedBackend::default());
        let (store, controller) = harness(Arc::clone(&backend)).await;

        for n in 1..=3 {
            assert_eq!(controller.send("Summarize this").await, SendOutcome::Answered);
            assert_eq!(store.transcript().await.len(), 1 + 2 * n);
        }

        let transcript = store.transcript().await;
        assert_eq!(transcript[0].role, MessageRole::Assistant);
        for pair in transcript[1..].chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1].role, MessageRole::Assistant);
        }
        assert_eq!(transcript[2].source_pages, vec![2, 5]);
        assert!(!controller.is_awaiting_response());
    }

    #[tokio::test]
    async fn replayed_history_excludes_the_question_being_asked() {
        let backend = Arc::new(ScriptedBackend::default());
        let (_store, controller) = harness(Arc::clone(&backend)).await;

        controller.send("Summarize this").await;

        let history = backend.seen_history.lock().await.clone();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, MessageRole::Assistant);
        assert!(history[0].content.contains("report.pdf"));
    }

    #[tokio::test]
    async fn blank_questions_are_ignored_without_state_change() {
        let backend = Arc::new(ScriptedBackend::default());
        let (store, controller) = harness(Arc::clone(&backend)).await;

        assert_eq!(controller.send("   ").await, SendOutcome::IgnoredEmpty);
        assert_eq!(store.transcript().await.len(), 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn a_send_while_one_is_in_flight_is_a_no_op() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend {
            hold: Some((Arc::clone(&entered), Arc::clone(&release))),
            ..ScriptedBackend::default()
        });
        let (store, controller) = harness(Arc::clone(&backend)).await;
        let controller = Arc::new(controller);

        let in_flight = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.send("first question").await })
        };
        entered.notified().await;

        assert!(controller.is_awaiting_response());
        assert_eq!(controller.send("second question").await, SendOutcome::IgnoredBusy);
        // Only the first user message was appended.
        assert_eq!(store.transcript().await.len(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        release.notify_one();
        assert_eq!(in_flight.await.unwrap(), SendOutcome::Answered);
        assert_eq!(store.transcript().await.len(), 3);
        assert!(!controller.is_awaiting_response());
    }

    #[tokio::test]
    async fn failures_are_recovered_inline_and_do_not_wedge_the_loop() {
        let backend = Arc::new(ScriptedBackend {
            fail_with: Some("model unavailable".into()),
            ..ScriptedBackend::default()
        });
        let (store, controller) = harness(Arc::clone(&backend)).await;

        assert_eq!(controller.send("???").await, SendOutcome::Recovered);

        let transcript = store.transcript().await;
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[2].role, MessageRole::Assistant);
        assert!(transcript[2].content.contains("model unavailable"));
        assert!(transcript[2].source_pages.is_empty());
        assert!(!controller.is_awaiting_response());
    }

    #[tokio::test]
    async fn a_reply_for_a_session_closed_mid_flight_is_discarded() {
        let backend = Arc::new(ScriptedBackend::default());
        let (store, controller) = harness(Arc::clone(&backend)).await;
        *backend.reset_during_chat.lock().await = Some(Arc::clone(&store));

        assert_eq!(controller.send("Summarize this").await, SendOutcome::Discarded);
        assert!(store.transcript().await.is_empty());
        assert!(!controller.is_awaiting_response());
    }

    #[tokio::test]
    async fn sending_without_a_session_is_refused() {
        let backend = Arc::new(ScriptedBackend::default());
        let store = Arc::new(SessionStore::new(
            Arc::clone(&backend) as Arc<dyn Backend>
        ));
        let controller =
            ConversationController::new(backend as Arc<dyn Backend>, Arc::clone(&store));

        assert_eq!(controller.send("hello").await, SendOutcome::NoSession);
        assert!(store.transcript().await.is_empty());
        assert!(!controller.is_awaiting_response());
    }
}
