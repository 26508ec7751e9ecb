//! Error taxonomy for backend calls.

use std::path::PathBuf;

/// Failure of a single backend request.
///
/// The client never retries; each error propagates once to the calling
/// controller, which decides recovery policy.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status. `detail` is the
    /// backend-provided message when the error body carried one, or a
    /// generic fallback.
    #[error("{detail}")]
    Backend { status: u16, detail: String },

    /// The request never completed (connect failure, timeout, bad response
    /// body).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The file to upload could not be read.
    #[error("could not read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A login-gated endpoint was called without credentials.
    #[error("not logged in; run `docchat login` first")]
    Unauthenticated,
}

impl ApiError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
