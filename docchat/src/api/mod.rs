//! Backend transport layer.
//!
//! `ApiClient` is the concrete HTTP client; controllers depend on the
//! `Backend` trait so tests can substitute a mock transport.

pub mod client;
pub mod error;
pub mod types;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::Session;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{ChatReply, HistoryTurn};

/// Authenticated identity for the login-gated assist surface.
///
/// Passed explicitly to the client at construction; the transport never
/// reads tokens from ambient storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub access_token: String,
    pub username: String,
}

/// The document backend contract.
///
/// Each call is a single request/response; no retries happen here. Failures
/// propagate once to the calling controller.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Upload a document and wait for it to be indexed.
    ///
    /// Byte-transfer progress (0–100, monotonic non-decreasing) is reported
    /// on `progress` while the request body streams out; the channel closes
    /// when the transfer is done. The future resolves only once the backend
    /// has finished indexing.
    async fn upload_document(
        &self,
        path: &Path,
        progress: mpsc::Sender<u8>,
    ) -> Result<Session, ApiError>;

    /// Ask one question against an indexed document, replaying the prior
    /// conversation as context.
    async fn chat(
        &self,
        session_id: &str,
        question: &str,
        history: &[HistoryTurn],
    ) -> Result<ChatReply, ApiError>;

    /// Fetch the metadata of an existing session.
    async fn session_info(&self, session_id: &str) -> Result<Session, ApiError>;

    /// Delete a session server-side. Callers treat this as best-effort.
    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError>;
}
