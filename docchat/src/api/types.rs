//! Wire types for the document and assist backend surfaces.

use serde::{Deserialize, Serialize};

use crate::models::MessageRole;

/// Error body shape shared by every backend endpoint.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

// === Document surface ===

/// Response from `POST /api/upload` and `GET /api/session/{id}`.
#[derive(Debug, Deserialize)]
pub struct SessionPayload {
    pub session_id: String,
    pub filename: String,
    pub total_pages: u32,
    pub total_chunks: u32,
}

/// One prior turn replayed to the backend.
///
/// Citations are derived data, not conversational state, so history turns
/// carry only role and content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: MessageRole,
    pub content: String,
}

/// Request body for `POST /api/chat` on the document surface.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub session_id: &'a str,
    pub question: &'a str,
    pub chat_history: &'a [HistoryTurn],
}

/// One answered turn from the document surface.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    /// Pages cited as evidence; absent means no citations.
    #[serde(default)]
    pub source_pages: Vec<u32>,
}

// === Assist surface ===

/// Response from `POST /api/login`.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub token_type: String,
    pub username: String,
}

/// Request body for `POST /api/register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Request body for the assist `POST /api/chat`.
#[derive(Debug, Serialize)]
pub struct AssistQuery<'a> {
    pub query: &'a str,
    pub condition_context: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AssistReply {
    pub response: String,
}

/// Request body for `POST /api/breakdown-task` and `POST /api/time-estimator`.
#[derive(Debug, Serialize)]
pub struct TaskRequest<'a> {
    pub task_description: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct BreakdownReply {
    pub steps: Vec<String>,
}

/// Request body for `POST /api/simplify-text`.
#[derive(Debug, Serialize)]
pub struct TextRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SimplifyReply {
    pub simplified_text: String,
}

#[derive(Debug, Deserialize)]
pub struct EstimateReply {
    pub estimation: String,
}
