//! Publish request/response types and validated publish options

use crate::error::{PublishError, PublishResult};
use crate::models::{Block, ImageAsset, ImageSpec};
use crate::parser;
use crate::services::scheduling_planner;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Editor account credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Requested termination mode, as it appears on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    #[default]
    Immediate,
    Draft,
    Scheduled,
}

/// Validated termination mode; a schedule instant exists only when scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    Immediate,
    Draft,
    Scheduled { at: NaiveDateTime },
}

impl PublishMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            PublishMode::Immediate => ModeKind::Immediate,
            PublishMode::Draft => ModeKind::Draft,
            PublishMode::Scheduled { .. } => ModeKind::Scheduled,
        }
    }
}

/// Input accepted from the upstream producer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub credentials: Credentials,
    pub title: String,
    /// Raw block-grammar text
    pub content: String,
    #[serde(default)]
    pub images: Vec<ImageSpec>,
    #[serde(default)]
    pub mode: ModeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<NaiveDateTime>,
}

/// Everything one publish attempt needs, validated and parsed
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub title: String,
    pub blocks: Vec<Block>,
    pub images: Vec<ImageAsset>,
    pub mode: PublishMode,
}

impl PublishOptions {
    /// Validate a request and parse its content
    ///
    /// `now` is used only for the default schedule instant (tomorrow 10:00)
    /// when a scheduled request carries no explicit time.
    pub fn from_request(request: &PublishRequest, now: NaiveDateTime) -> PublishResult<Self> {
        if request.credentials.username.trim().is_empty() {
            return Err(PublishError::InvalidOptions("username is empty".to_string()));
        }
        if request.credentials.password.is_empty() {
            return Err(PublishError::InvalidOptions("password is empty".to_string()));
        }
        let title = request.title.trim();
        if title.is_empty() {
            return Err(PublishError::InvalidOptions("title is empty".to_string()));
        }

        let mode = match (request.mode, request.scheduled_at) {
            (ModeKind::Scheduled, Some(at)) => PublishMode::Scheduled { at },
            (ModeKind::Scheduled, None) => PublishMode::Scheduled {
                at: scheduling_planner::default_target(now),
            },
            (kind, Some(_)) => {
                return Err(PublishError::InvalidOptions(format!(
                    "scheduledAt given for {:?} mode",
                    kind
                )))
            }
            (ModeKind::Immediate, None) => PublishMode::Immediate,
            (ModeKind::Draft, None) => PublishMode::Draft,
        };

        Ok(Self {
            title: title.to_string(),
            blocks: parser::parse(&request.content),
            images: request.images.iter().map(ImageAsset::resolve).collect(),
            mode,
        })
    }
}

/// Service-surface response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
