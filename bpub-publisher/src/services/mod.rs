//! Service modules for the publish pipeline
//!
//! - `editor_session`: browser session lifecycle and input primitives
//! - `block_renderer`: one block → editor actions
//! - `scheduling_planner`: schedule quantization and the scheduling widget
//! - `publish_coordinator`: the per-attempt state machine

pub mod block_renderer;
pub mod editor_session;
pub mod publish_coordinator;
pub mod scheduling_planner;

pub use block_renderer::BlockRenderer;
pub use editor_session::{EditorContext, EditorSession, SessionState};
pub use publish_coordinator::PublishCoordinator;
pub use scheduling_planner::ScheduleTarget;
