use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Lifecycle of a single upload attempt.
///
/// `Success` and `Error` are terminal for the attempt; a new file selection
/// starts the next cycle.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UploadStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SessionError {
    #[error("no file selected")]
    NoFileSelected,

    #[error("an upload is already in flight")]
    UploadInFlight,

    #[error("no upload in flight")]
    NotUploading,
}

/// File chosen by the user but not yet (or currently being) uploaded.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file_name: String,
    /// Size in bytes when known; `None` makes the progress indeterminate
    pub size: Option<u64>,
}

/// Byte-accurate upload progress.
///
/// The sent counter is shared with the streaming body through a
/// [`ProgressHandle`], so the percentage tracks real transfer, not a timer.
#[derive(Debug, Default)]
struct Progress {
    sent: Arc<AtomicU64>,
    total: Option<u64>,
    forced_complete: bool,
}

impl Progress {
    fn reset(&mut self, total: Option<u64>) {
        self.sent = Arc::new(AtomicU64::new(0));
        self.total = total;
        self.forced_complete = false;
    }

    fn percent(&self) -> Option<u8> {
        if self.forced_complete {
            return Some(100);
        }
        match self.total {
            Some(0) => Some(0),
            Some(total) => {
                let sent = self.sent.load(Ordering::Relaxed);
                Some((sent.saturating_mul(100) / total).min(100) as u8)
            }
            None => None,
        }
    }
}

/// Shared counter the upload body feeds as chunks go out on the wire.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    sent: Arc<AtomicU64>,
}

impl ProgressHandle {
    pub fn add(&self, bytes: u64) {
        self.sent.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// State machine for one client upload session.
///
/// Transitions:
/// - `select_file`: `Idle`/terminal -> `Idle` with a pending file; rejected
///   while an upload is in flight.
/// - `begin_upload`: `Idle` + pending file -> `Loading`.
/// - `finish_success` / `finish_error`: `Loading` -> terminal, pending file
///   cleared so the next submit needs a fresh selection.
#[derive(Debug)]
pub struct UploadSession {
    status: UploadStatus,
    pending: Option<PendingUpload>,
    message: Option<String>,
    progress: Progress,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            status: UploadStatus::Idle,
            pending: None,
            message: None,
            progress: Progress::default(),
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn pending_file(&self) -> Option<&PendingUpload> {
        self.pending.as_ref()
    }

    /// Progress percentage in `[0, 100]`, or `None` while the total size is
    /// unknown (indeterminate rather than a fake number).
    pub fn progress(&self) -> Option<u8> {
        self.progress.percent()
    }

    /// Record a file selection. Starting a new cycle from a terminal state
    /// returns to `Idle`.
    pub fn select_file(
        &mut self,
        file_name: impl Into<String>,
        size: Option<u64>,
    ) -> Result<(), SessionError> {
        if self.status == UploadStatus::Loading {
            return Err(SessionError::UploadInFlight);
        }

        self.status = UploadStatus::Idle;
        self.pending = Some(PendingUpload {
            file_name: file_name.into(),
            size,
        });
        self.progress.reset(size);
        Ok(())
    }

    /// Enter `Loading` and hand out the counter for the streaming body.
    pub fn begin_upload(&mut self) -> Result<ProgressHandle, SessionError> {
        if self.status == UploadStatus::Loading {
            return Err(SessionError::UploadInFlight);
        }
        let Some(pending) = &self.pending else {
            return Err(SessionError::NoFileSelected);
        };

        self.progress.reset(pending.size);
        self.message = None;
        self.status = UploadStatus::Loading;
        Ok(ProgressHandle {
            sent: self.progress.sent.clone(),
        })
    }

    /// Terminal success; `id` is the identifier assigned by the server.
    pub fn finish_success(&mut self, id: &str) -> Result<(), SessionError> {
        if self.status != UploadStatus::Loading {
            return Err(SessionError::NotUploading);
        }

        self.status = UploadStatus::Success;
        self.message = Some(format!("Upload successful! Video ID: {id}"));
        self.progress.forced_complete = true;
        self.pending = None;
        Ok(())
    }

    /// Terminal failure; the underlying cause is the caller's to log.
    pub fn finish_error(&mut self) -> Result<(), SessionError> {
        if self.status != UploadStatus::Loading {
            return Err(SessionError::NotUploading);
        }

        self.status = UploadStatus::Error;
        self.message = Some("Upload failed. Please try again.".to_string());
        self.progress.reset(Some(0));
        self.pending = None;
        Ok(())
    }
}
