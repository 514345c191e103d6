//! Job files
//!
//! A job file is a TOML rendition of one [`PublishRequest`]:
//!
//! ```toml
//! title = "가을 신상품 소개"
//! content_file = "post.txt"        # or inline: content = "..."
//! mode = "scheduled"               # immediate | draft | scheduled
//! scheduled_at = "2026-10-20T14:25:00"
//!
//! [credentials]                    # optional, else BPUB_USERNAME / BPUB_PASSWORD
//! username = "myblog"
//! password = "secret"
//!
//! [[images]]
//! path = "images/cover.png"        # relative to the job file
//! ```

use crate::models::{Credentials, ImageSpec, ModeKind, PublishRequest};
use bpub_common::{Error, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const USERNAME_ENV_VAR: &str = "BPUB_USERNAME";
pub const PASSWORD_ENV_VAR: &str = "BPUB_PASSWORD";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    title: String,
    content: Option<String>,
    content_file: Option<PathBuf>,
    #[serde(default)]
    mode: ModeKind,
    scheduled_at: Option<NaiveDateTime>,
    credentials: Option<Credentials>,
    #[serde(default)]
    images: Vec<ImageSpec>,
}

/// Credentials from `BPUB_USERNAME` / `BPUB_PASSWORD`, if both are set
pub fn credentials_from_env() -> Option<Credentials> {
    let username = std::env::var(USERNAME_ENV_VAR).ok()?;
    let password = std::env::var(PASSWORD_ENV_VAR).ok()?;
    if username.trim().is_empty() {
        return None;
    }
    Some(Credentials::new(username, password))
}

/// Load a job file into a publish request
///
/// Relative `content_file` and image paths resolve against the job file's
/// directory. Job-file credentials take priority over the environment.
pub fn load_job(path: &Path) -> Result<PublishRequest> {
    let text = std::fs::read_to_string(path)?;
    let job: JobFile = toml::from_str(&text)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let content = match (job.content, job.content_file) {
        (Some(content), None) => content,
        (None, Some(file)) => std::fs::read_to_string(base.join(file))?,
        (Some(_), Some(_)) => {
            return Err(Error::InvalidInput(format!(
                "{}: set either content or content_file, not both",
                path.display()
            )))
        }
        (None, None) => {
            return Err(Error::InvalidInput(format!(
                "{}: content or content_file is required",
                path.display()
            )))
        }
    };

    let credentials = job
        .credentials
        .or_else(credentials_from_env)
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "{}: no [credentials] and {} / {} not set",
                path.display(),
                USERNAME_ENV_VAR,
                PASSWORD_ENV_VAR
            ))
        })?;

    let images = job
        .images
        .into_iter()
        .map(|image| ImageSpec {
            path: base.join(&image.path),
            mime: image.mime,
        })
        .collect();

    tracing::debug!(job = %path.display(), mode = ?job.mode, "Loaded job file");

    Ok(PublishRequest {
        credentials,
        title: job.title,
        content,
        images,
        mode: job.mode,
        scheduled_at: job.scheduled_at,
    })
}
