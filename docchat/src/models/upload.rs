//! Upload state machine for a single upload attempt.
//!
//! The machine is transient: it exists only while the upload controller is
//! driving an attempt. Terminal success hands a `Session` upward and drops
//! the state back to `Idle`; terminal failure parks it in `Error`, which is
//! re-entrant (submitting a new file starts a fresh attempt).

/// Phase of one upload attempt.
///
/// `progress_percent` is meaningful only while `Uploading`; the backend
/// reports no partial-indexing signal, so `Processing` is indeterminate.
/// `file_name` is retained across `Error` for user feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    /// No attempt in flight.
    Idle,
    /// Bytes are being transferred to the backend.
    Uploading {
        file_name: String,
        progress_percent: u8,
    },
    /// Transfer finished; the backend is extracting and indexing.
    Processing { file_name: String },
    /// The attempt failed. Not sticky: a new submit leaves this state.
    Error { file_name: String, message: String },
}

impl UploadState {
    /// Start a fresh attempt for `file_name` at 0 %.
    pub fn begin(file_name: String) -> Self {
        Self::Uploading {
            file_name,
            progress_percent: 0,
        }
    }

    /// Reject a file before any transfer (validation failure).
    pub fn rejected(file_name: String, message: String) -> Self {
        Self::Error { file_name, message }
    }

    /// Record transfer progress.
    ///
    /// Progress is clamped to 0–100 and never moves backwards within one
    /// attempt. Outside `Uploading` the event is ignored.
    pub fn with_progress(self, percent: u8) -> Self {
        match self {
            Self::Uploading {
                file_name,
                progress_percent,
            } => Self::Uploading {
                file_name,
                progress_percent: progress_percent.max(percent.min(100)),
            },
            other @ (Self::Idle | Self::Processing { .. } | Self::Error { .. }) => other,
        }
    }

    /// The transfer reached 100 %; the backend is now indexing.
    pub fn transfer_complete(self) -> Self {
        match self {
            Self::Uploading { file_name, .. } => Self::Processing { file_name },
            other @ (Self::Idle | Self::Processing { .. } | Self::Error { .. }) => other,
        }
    }

    /// The attempt failed during transfer or indexing.
    pub fn failed(self, message: String) -> Self {
        match self {
            Self::Uploading { file_name, .. } | Self::Processing { file_name } => {
                Self::Error { file_name, message }
            }
            Self::Idle => Self::Error {
                file_name: String::new(),
                message,
            },
            Self::Error { file_name, .. } => Self::Error { file_name, message },
        }
    }

    /// The file name of the current or last attempt, if any.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Uploading { file_name, .. }
            | Self::Processing { file_name }
            | Self::Error { file_name, .. } => Some(file_name),
        }
    }

    /// Phase label for logging and display.
    pub const fn phase(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading { .. } => "uploading",
            Self::Processing { .. } => "processing",
            Self::Error { .. } => "error",
        }
    }

    /// Whether the machine is parked in a failed attempt.
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_within_an_attempt() {
        let state = UploadState::begin("report.pdf".into())
            .with_progress(50)
            .with_progress(30);
        assert_eq!(
            state,
            UploadState::Uploading {
                file_name: "report.pdf".into(),
                progress_percent: 50,
            }
        );
    }

    #[test]
    fn progress_is_clamped_to_one_hundred() {
        let state = UploadState::begin("report.pdf".into()).with_progress(200);
        assert_eq!(
            state,
            UploadState::Uploading {
                file_name: "report.pdf".into(),
                progress_percent: 100,
            }
        );
    }

    #[test]
    fn transfer_complete_moves_uploading_to_processing() {
        let state = UploadState::begin("report.pdf".into())
            .with_progress(100)
            .transfer_complete();
        assert_eq!(
            state,
            UploadState::Processing {
                file_name: "report.pdf".into()
            }
        );
        // Late progress after the transfer finished is ignored.
        assert_eq!(
            state.clone(),
            state.with_progress(99).transfer_complete(),
        );
    }

    #[test]
    fn failure_keeps_the_attempted_file_name() {
        let state = UploadState::begin("report.pdf".into())
            .with_progress(70)
            .failed("connection reset".into());
        assert_eq!(state.file_name(), Some("report.pdf"));
        assert!(state.is_error());
    }

    #[test]
    fn error_state_is_not_sticky() {
        let state = UploadState::rejected("notes.txt".into(), "not a PDF".into());
        let state = match state {
            UploadState::Error { .. } => UploadState::begin("report.pdf".into()),
            other => other,
        };
        assert_eq!(state.phase(), "uploading");
        assert_eq!(state.file_name(), Some("report.pdf"));
    }
}
