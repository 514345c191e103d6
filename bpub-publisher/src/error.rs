//! Error types for bpub-publisher
//!
//! Severity follows the publish phase the error occurs in:
//! - before body rendering: fatal for the attempt
//! - during body rendering: recorded per block, rendering continues
//!   (except when the browser session itself is gone)
//! - during finalize: fatal, the confirm control is never clicked twice

use bpub_common::WaitTimeout;
use thiserror::Error;

/// Errors raised by an [`EditorDriver`](crate::driver::EditorDriver)
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// HTTP-level failure talking to the WebDriver endpoint
    #[error("WebDriver transport error: {0}")]
    Transport(String),

    /// The browser session no longer exists (crashed or closed)
    #[error("Browser session lost: {0}")]
    SessionLost(String),

    /// Element lookup found nothing
    #[error("No such element: {0}")]
    NoSuchElement(String),

    /// Element reference no longer attached to the document
    #[error("Stale element: {0}")]
    StaleElement(String),

    /// Any other command failure reported by the driver
    #[error("WebDriver command failed ({error}): {message}")]
    Command { error: String, message: String },

    /// Command issued before `start()` or after `quit()`
    #[error("Driver not started")]
    NotStarted,

    /// Driver process could not be spawned or never became ready
    #[error("Failed to launch driver: {0}")]
    Launch(String),
}

impl DriverError {
    /// True when no further command on this session can succeed
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            DriverError::Transport(_)
                | DriverError::SessionLost(_)
                | DriverError::NotStarted
                | DriverError::Launch(_)
        )
    }
}

impl From<reqwest::Error> for DriverError {
    fn from(err: reqwest::Error) -> Self {
        DriverError::Transport(err.to_string())
    }
}

/// Publish failure taxonomy
#[derive(Debug, Error)]
pub enum PublishError {
    /// Bad credentials or unresolved captcha (indistinguishable)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Editor page or nested editor context could not be resolved
    #[error("Editor unavailable: {0}")]
    EditorUnavailable(String),

    /// One block could not be rendered
    #[error("Failed to render {kind} block: {reason}")]
    BlockRender { kind: &'static str, reason: String },

    /// Uploaded image did not finish processing in time
    #[error("Media processing timed out for {image}: {timeout}")]
    MediaProcessingTimeout { image: String, timeout: WaitTimeout },

    /// A scheduling control could not be located
    #[error("Schedule control not found: {0}")]
    ScheduleStepNotFound(String),

    /// Scheduling target cannot be selected in the current calendar view
    #[error("Schedule target out of range: {0}")]
    ScheduleOutOfRange(String),

    /// Request failed validation before any browser work
    #[error("Invalid publish options: {0}")]
    InvalidOptions(String),

    /// Session operation called in the wrong lifecycle state
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Cooperative cancellation observed between steps
    #[error("Publish cancelled")]
    Cancelled,

    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Anything unexpected, surfaced with context
    #[error("Unknown failure: {0}")]
    Unknown(String),
}

impl PublishError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            PublishError::Auth(_) => "AUTH_ERROR",
            PublishError::EditorUnavailable(_) => "EDITOR_UNAVAILABLE",
            PublishError::BlockRender { .. } => "BLOCK_RENDER_ERROR",
            PublishError::MediaProcessingTimeout { .. } => "MEDIA_PROCESSING_TIMEOUT",
            PublishError::ScheduleStepNotFound(_) => "SCHEDULE_STEP_NOT_FOUND",
            PublishError::ScheduleOutOfRange(_) => "SCHEDULE_OUT_OF_RANGE",
            PublishError::InvalidOptions(_) => "INVALID_OPTIONS",
            PublishError::InvalidState(_) => "INVALID_STATE",
            PublishError::Cancelled => "CANCELLED",
            PublishError::Driver(_) => "DRIVER_ERROR",
            PublishError::Unknown(_) => "UNKNOWN_FAILURE",
        }
    }

    /// True when the error must abort body rendering instead of being
    /// recorded against a single block
    pub fn aborts_body(&self) -> bool {
        match self {
            PublishError::Driver(e) => e.is_session_fatal(),
            PublishError::Cancelled => true,
            _ => false,
        }
    }

    pub fn block(kind: &'static str, reason: impl Into<String>) -> Self {
        PublishError::BlockRender {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type for publisher operations
pub type PublishResult<T> = Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_fatal_driver_errors_abort_body() {
        let lost = PublishError::Driver(DriverError::SessionLost("gone".into()));
        assert!(lost.aborts_body());

        let missing = PublishError::Driver(DriverError::NoSuchElement(".x".into()));
        assert!(!missing.aborts_body());

        assert!(!PublishError::block("heading", "font menu missing").aborts_body());
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(PublishError::Auth("x".into()).code(), "AUTH_ERROR");
        assert_eq!(PublishError::Cancelled.code(), "CANCELLED");
        assert_eq!(
            PublishError::ScheduleStepNotFound("confirm".into()).code(),
            "SCHEDULE_STEP_NOT_FOUND"
        );
    }
}
