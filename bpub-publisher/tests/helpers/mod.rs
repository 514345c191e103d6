//! Test Helper Utilities
//!
//! Shared fixtures for bpub-publisher integration tests

#![allow(dead_code)]

pub mod editor;
pub mod log_capture;

pub use editor::{
    bold_toggles, editor_config, ready_session, rehearsal_driver, request, start_time,
    test_clock, typed_text, write_image, TEST_START,
};
pub use log_capture::{capture_logs, LogCapture};
