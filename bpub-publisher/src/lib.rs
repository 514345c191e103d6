//! bpub-publisher library interface
//!
//! Parses generated copy into blocks and reproduces it inside a browser-only
//! rich-text editor. The `bpub` binary is a thin CLI over these modules.

pub mod affordances;
pub mod batch;
pub mod driver;
pub mod error;
pub mod job;
pub mod locator;
pub mod models;
pub mod parser;
pub mod services;

pub use crate::error::{DriverError, PublishError, PublishResult};
