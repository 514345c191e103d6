//! Data models for bpub-publisher

pub mod block;
pub mod image;
pub mod options;
pub mod publish_attempt;

pub use block::{Block, BoldRun};
pub use image::{ImageAsset, ImageSpec};
pub use options::{
    Credentials, ModeKind, PublishMode, PublishOptions, PublishRequest, PublishResponse,
};
pub use publish_attempt::{
    BlockReport, PublishAttempt, PublishOutcome, PublishState, RenderOutcome, RenderStatus,
    StateTransition,
};
