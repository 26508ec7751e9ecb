//! Session model representing one indexed document on the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session is the backend's handle to one uploaded, indexed document.
///
/// Produced exactly once per successful upload and immutable afterwards.
/// The `session_id` is the key for every subsequent chat call; the other
/// fields are display-only metadata reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier issued by the backend.
    pub session_id: String,
    /// Original file name of the uploaded document.
    pub filename: String,
    /// Number of pages the backend extracted.
    pub total_pages: u32,
    /// Number of chunks the backend indexed.
    pub total_chunks: u32,
    /// When the session was created client-side.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session from backend-reported metadata.
    pub fn new(session_id: String, filename: String, total_pages: u32, total_chunks: u32) -> Self {
        Self {
            session_id,
            filename,
            total_pages,
            total_chunks,
            created_at: Utc::now(),
        }
    }
}
