//! # bpub Common Library
//!
//! Shared code for the bpub publisher crates:
//! - Error and result types
//! - TOML configuration loading and config file resolution
//! - Injectable clock (wall time + sleeping)
//! - Bounded poll-and-wait primitive with backoff

pub mod clock;
pub mod config;
pub mod error;
pub mod wait;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use wait::{PollWait, WaitPolicy, WaitTimeout};
