//! Publish workflow state machine
//!
//! A publish attempt progresses through:
//! IDLE → AUTHENTICATED → EDITOR_READY → TITLE_SET → BODY_RENDERED →
//! {SUBMITTING | SAVING | SCHEDULING} → DONE, or FAILED from any state.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PublishError;
use crate::models::PublishResponse;

/// Publish workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishState {
    /// Nothing done yet
    Idle,
    /// Login surface left
    Authenticated,
    /// Editor context resolved
    EditorReady,
    /// Title typed and confirmed
    TitleSet,
    /// All blocks attempted
    BodyRendered,
    /// Immediate publish in progress
    Submitting,
    /// Draft save in progress
    Saving,
    /// Scheduled publish in progress
    Scheduling,
    Done,
    Failed,
}

impl PublishState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PublishState::Done | PublishState::Failed)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub attempt_id: Uuid,
    pub from: PublishState,
    pub to: PublishState,
    pub at: NaiveDateTime,
}

/// Per-block render status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    Ok,
    Warn,
    Error,
}

/// Result of rendering one block
#[derive(Debug)]
pub enum RenderOutcome {
    Ok,
    /// Rendered, possibly degraded (skipped image, font step missing, ...)
    Warn(String),
    Error(PublishError),
}

impl RenderOutcome {
    pub fn status(&self) -> RenderStatus {
        match self {
            RenderOutcome::Ok => RenderStatus::Ok,
            RenderOutcome::Warn(_) => RenderStatus::Warn,
            RenderOutcome::Error(_) => RenderStatus::Error,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RenderOutcome::Ok)
    }
}

/// Aggregated per-block report entry
#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    pub index: usize,
    pub kind: &'static str,
    pub status: RenderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// In-memory record of one publish attempt
#[derive(Debug, Clone, Serialize)]
pub struct PublishAttempt {
    pub attempt_id: Uuid,
    pub state: PublishState,
    pub transitions: Vec<StateTransition>,
    pub warnings: Vec<String>,
    pub blocks: Vec<BlockReport>,
    pub started_at: NaiveDateTime,
    pub ended_at: Option<NaiveDateTime>,
}

impl PublishAttempt {
    pub fn new(started_at: NaiveDateTime) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            state: PublishState::Idle,
            transitions: Vec::new(),
            warnings: Vec::new(),
            blocks: Vec::new(),
            started_at,
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, to: PublishState, at: NaiveDateTime) -> StateTransition {
        let transition = StateTransition {
            attempt_id: self.attempt_id,
            from: self.state,
            to,
            at,
        };
        tracing::debug!(
            attempt_id = %self.attempt_id,
            from = ?transition.from,
            to = ?to,
            "Publish state transition"
        );
        self.state = to;
        self.transitions.push(transition.clone());
        if to.is_terminal() {
            self.ended_at = Some(at);
        }
        transition
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(attempt_id = %self.attempt_id, "{}", message);
        self.warnings.push(message);
    }

    /// Record a block outcome; warnings and errors also land in `warnings`
    pub fn record_block(&mut self, index: usize, kind: &'static str, outcome: &RenderOutcome) {
        let message = match outcome {
            RenderOutcome::Ok => None,
            RenderOutcome::Warn(reason) => Some(reason.clone()),
            RenderOutcome::Error(err) => Some(err.to_string()),
        };
        if let Some(msg) = &message {
            self.warnings.push(format!("block {} ({}): {}", index, kind, msg));
        }
        self.blocks.push(BlockReport {
            index,
            kind,
            status: outcome.status(),
            message,
        });
    }

    /// Count of blocks with the given status
    pub fn count_blocks(&self, status: RenderStatus) -> usize {
        self.blocks.iter().filter(|b| b.status == status).count()
    }
}

/// Final result of a publish attempt
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub attempt_id: Uuid,
    pub success: bool,
    pub published_url: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<&'static str>,
    pub final_state: PublishState,
    pub warnings: Vec<String>,
    pub blocks: Vec<BlockReport>,
    pub transitions: Vec<StateTransition>,
}

impl PublishOutcome {
    pub fn succeeded(attempt: PublishAttempt, published_url: Option<String>) -> Self {
        Self {
            attempt_id: attempt.attempt_id,
            success: true,
            published_url,
            error: None,
            error_code: None,
            final_state: attempt.state,
            warnings: attempt.warnings,
            blocks: attempt.blocks,
            transitions: attempt.transitions,
        }
    }

    pub fn failed(attempt: PublishAttempt, error: &PublishError) -> Self {
        Self {
            attempt_id: attempt.attempt_id,
            success: false,
            published_url: None,
            error: Some(error.to_string()),
            error_code: Some(error.code()),
            final_state: attempt.state,
            warnings: attempt.warnings,
            blocks: attempt.blocks,
            transitions: attempt.transitions,
        }
    }

    /// Success that carried warnings (degraded blocks, missing save control, ...)
    pub fn completed_with_warning(&self) -> bool {
        self.success && !self.warnings.is_empty()
    }

    pub fn to_response(&self) -> PublishResponse {
        PublishResponse {
            success: self.success,
            published_url: self.published_url.clone(),
            error: self.error.clone(),
        }
    }
}
