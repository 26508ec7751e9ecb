//! Upload controller: drives one upload attempt through its state machine.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{ApiError, Backend};
use crate::models::{Session, UploadState};

/// The only file extension the backend accepts, matched case-insensitively.
pub const ACCEPTED_EXTENSION: &str = "pdf";

/// Notifications emitted while an attempt runs.
///
/// The stream has a defined end: exactly one of `Completed` or `Failed`
/// terminates it.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// Byte-transfer progress, 0–100, strictly increasing per attempt.
    Progress(u8),
    /// Transfer done; the backend is indexing. Indeterminate: the backend
    /// reports no partial-indexing signal.
    Processing,
    /// Terminal success.
    Completed(Session),
    /// Terminal failure with a user-facing message.
    Failed(String),
}

/// Terminal failure of an upload attempt.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The file name does not end in the accepted extension. Rejected
    /// before any network call.
    #[error("{0} is not a PDF file")]
    InvalidFileType(String),

    /// The transfer or the backend's indexing failed.
    #[error(transparent)]
    Upload(#[from] ApiError),

    /// The transfer task stopped without reporting an outcome.
    #[error("upload worker stopped unexpectedly")]
    WorkerFailed,
}

/// Drives the file-submission surface.
///
/// One attempt at a time: `submit` runs an attempt to its terminal outcome.
/// On success the produced `Session` is the only artifact handed upward and
/// the state machine is discarded back to `Idle`; on failure the machine
/// parks in `Error`, from which a new `submit` is allowed.
pub struct UploadController {
    backend: Arc<dyn Backend>,
    state: UploadState,
}

impl UploadController {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: UploadState::Idle,
        }
    }

    /// Current phase of the machine.
    pub const fn state(&self) -> &UploadState {
        &self.state
    }

    /// Submit a file for upload and indexing, streaming `UploadEvent`s to
    /// `events` while the attempt runs.
    pub async fn submit(
        &mut self,
        path: &Path,
        events: &mpsc::Sender<UploadEvent>,
    ) -> Result<Session, UploadError> {
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        if !has_accepted_extension(&file_name) {
            let err = UploadError::InvalidFileType(file_name.clone());
            self.state = UploadState::rejected(file_name, err.to_string());
            let _ = events.send(UploadEvent::Failed(err.to_string())).await;
            return Err(err);
        }

        self.state = UploadState::begin(file_name);
        let _ = events.send(UploadEvent::Progress(0)).await;

        let (progress_tx, mut progress_rx) = mpsc::channel::<u8>(16);
        let backend = Arc::clone(&self.backend);
        let path = path.to_path_buf();
        let mut call =
            tokio::spawn(async move { backend.upload_document(&path, progress_tx).await });

        let mut last_percent: u8 = 0;
        loop {
            tokio::select! {
                // Progress first, so queued reports are applied before the
                // terminal outcome is observed.
                biased;
                Some(percent) = progress_rx.recv() => {
                    let percent = percent.min(100);
                    if percent > last_percent {
                        last_percent = percent;
                        self.state = self.state.clone().with_progress(percent);
                        let _ = events.send(UploadEvent::Progress(percent)).await;
                    }
                    if percent >= 100 && !matches!(self.state, UploadState::Processing { .. }) {
                        self.state = self.state.clone().transfer_complete();
                        let _ = events.send(UploadEvent::Processing).await;
                    }
                }
                joined = &mut call => {
                    return self.finish(joined, events).await;
                }
            }
        }
    }

    async fn finish(
        &mut self,
        joined: Result<Result<Session, ApiError>, tokio::task::JoinError>,
        events: &mpsc::Sender<UploadEvent>,
    ) -> Result<Session, UploadError> {
        match joined {
            Ok(Ok(session)) => {
                tracing::info!(
                    session_id = %session.session_id,
                    pages = session.total_pages,
                    "upload complete"
                );
                // Terminal success: the state machine is discarded.
                self.state = UploadState::Idle;
                let _ = events.send(UploadEvent::Completed(session.clone())).await;
                Ok(session)
            }
            Ok(Err(err)) => {
                let message = err.user_message();
                tracing::warn!(
                    phase = self.state.phase(),
                    file = self.state.file_name().unwrap_or_default(),
                    "upload failed: {message}"
                );
                self.state = self.state.clone().failed(message.clone());
                let _ = events.send(UploadEvent::Failed(message)).await;
                Err(UploadError::Upload(err))
            }
            Err(join_err) => {
                tracing::error!("upload task aborted: {join_err}");
                let err = UploadError::WorkerFailed;
                self.state = self.state.clone().failed(err.to_string());
                let _ = events.send(UploadEvent::Failed(err.to_string())).await;
                Err(err)
            }
        }
    }
}

/// Validation precondition: the name must end in `.pdf`, case-insensitive.
fn has_accepted_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ACCEPTED_EXTENSION))
}
