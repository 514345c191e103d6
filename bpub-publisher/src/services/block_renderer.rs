//! Block renderer
//!
//! Reconstructs one [`Block`] inside the editor by synthesizing toolbar
//! clicks and keystrokes. A failed block never aborts the sequence: the
//! result is reported as [`RenderOutcome`] and the caller decides.
//!
//! Failure grading:
//! - styling steps (font size, quote variant) missing → `Warn`
//! - image unresolved, file missing, media still processing → `Warn`
//! - typing or toggling failures → `Error`

use crate::affordances;
use crate::driver::{EditorDriver, Key};
use crate::error::{PublishError, PublishResult};
use crate::models::{Block, ImageAsset, RenderOutcome};
use crate::parser;
use crate::services::editor_session::EditorSession;

/// Renders blocks in document order for one attempt
///
/// Holds the per-attempt state: the sequential image counter and whether
/// the base font size has been applied to body text yet.
#[derive(Debug, Default)]
pub struct BlockRenderer {
    image_counter: usize,
    base_font_applied: bool,
}

impl BlockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of image markers seen so far
    pub fn image_counter(&self) -> usize {
        self.image_counter
    }

    /// Resolve an image marker against the attempt's images
    ///
    /// Every marker advances the sequential counter; an explicit index
    /// wins over the counter value.
    pub fn resolve_image<'a>(
        &mut self,
        explicit_index: Option<usize>,
        images: &'a [ImageAsset],
    ) -> Option<&'a ImageAsset> {
        let sequential = self.image_counter;
        self.image_counter += 1;
        images.get(explicit_index.unwrap_or(sequential))
    }

    /// Render one block
    pub async fn render<D: EditorDriver>(
        &mut self,
        session: &mut EditorSession<D>,
        block: &Block,
        images: &[ImageAsset],
    ) -> RenderOutcome {
        let mut warnings = Vec::new();

        let result = self.render_inner(session, block, images, &mut warnings).await;
        match result {
            Err(e) => RenderOutcome::Error(e),
            Ok(()) if warnings.is_empty() => RenderOutcome::Ok,
            Ok(()) => RenderOutcome::Warn(warnings.join("; ")),
        }
    }

    async fn render_inner<D: EditorDriver>(
        &mut self,
        session: &mut EditorSession<D>,
        block: &Block,
        images: &[ImageAsset],
        warnings: &mut Vec<String>,
    ) -> PublishResult<()> {
        if block.is_body_text() && !self.base_font_applied {
            let base = session.editor().base_font_size.clone();
            self.set_font_size(session, &base, warnings).await;
            self.base_font_applied = true;
        }

        match block {
            Block::Heading { text } => self.heading(session, text, warnings).await,
            Block::Quote { text } => self.quote(session, text, warnings).await,
            Block::ImageMarker { explicit_index } => {
                self.image(session, *explicit_index, images, warnings).await
            }
            Block::MixedText { text } => mixed_text(session, text).await,
            Block::PlainText { text } => {
                session
                    .type_text_slowly(text)
                    .await
                    .map_err(|e| typing_error("plain_text", e))?;
                newline(session, "plain_text").await
            }
            Block::Empty => newline(session, "empty").await,
        }
    }

    async fn heading<D: EditorDriver>(
        &mut self,
        session: &mut EditorSession<D>,
        text: &str,
        warnings: &mut Vec<String>,
    ) -> PublishResult<()> {
        let large = session.editor().large_font_size.clone();
        let base = session.editor().base_font_size.clone();

        self.set_font_size(session, &large, warnings).await;
        toggle_bold(session, "heading").await?;
        session
            .type_text(text)
            .await
            .map_err(|e| typing_error("heading", e))?;
        newline(session, "heading").await?;
        toggle_bold(session, "heading").await?;
        self.set_font_size(session, &base, warnings).await;
        Ok(())
    }

    async fn quote<D: EditorDriver>(
        &mut self,
        session: &mut EditorSession<D>,
        text: &str,
        warnings: &mut Vec<String>,
    ) -> PublishResult<()> {
        if let Err(e) = session.click(&affordances::quote_tool()).await {
            escalate(&e)?;
            warnings.push(format!("quote tool unavailable: {}", e));
        } else {
            session.settle().await;
            match session.click_if_present(&affordances::quote_variant()).await {
                Ok(true) => session.settle().await,
                Ok(false) => warnings.push("quote variant not found".to_string()),
                Err(e) => {
                    escalate(&e)?;
                    warnings.push(format!("quote variant failed: {}", e));
                }
            }
        }

        toggle_bold(session, "quote").await?;
        session
            .type_text(text)
            .await
            .map_err(|e| typing_error("quote", e))?;
        toggle_bold(session, "quote").await?;

        // The editor traps the cursor inside the quote container; two
        // downward moves and a newline land in a fresh paragraph after it
        for key in [Key::ArrowDown, Key::ArrowDown, Key::Enter] {
            session
                .press(key)
                .await
                .map_err(|e| typing_error("quote", e))?;
        }

        let base = session.editor().base_font_size.clone();
        self.set_font_size(session, &base, warnings).await;
        Ok(())
    }

    async fn image<D: EditorDriver>(
        &mut self,
        session: &mut EditorSession<D>,
        explicit_index: Option<usize>,
        images: &[ImageAsset],
        warnings: &mut Vec<String>,
    ) -> PublishResult<()> {
        let Some(image) = self.resolve_image(explicit_index, images) else {
            warnings.push(format!(
                "no image for marker (index {:?}, {} images attached)",
                explicit_index,
                images.len()
            ));
            return Ok(());
        };
        if !image.is_available() {
            warnings.push(format!("image file missing: {}", image.path.display()));
            return Ok(());
        }
        if !image.is_image() {
            warnings.push(format!(
                "not an image ({}): {}",
                image.mime,
                image.path.display()
            ));
            return Ok(());
        }

        session
            .chord(Key::End)
            .await
            .map_err(|e| typing_error("image", e))?;

        match session.click_if_present(&affordances::image_tool()).await {
            Ok(_) => {}
            Err(e) => {
                escalate(&e)?;
                tracing::debug!(error = %e, "Image tool click failed, using file input directly");
            }
        }

        session
            .upload(&affordances::file_input(), &image.path)
            .await
            .map_err(|e| {
                if e.is_session_fatal() {
                    PublishError::Driver(e)
                } else {
                    PublishError::block("image", format!("upload failed: {}", e))
                }
            })?;
        tracing::debug!(image = %image.path.display(), mime = %image.mime, "Image attached");

        let label = image.path.display().to_string();
        match session.wait_for_media(&label).await {
            Ok(()) => {}
            Err(e @ PublishError::MediaProcessingTimeout { .. }) => warnings.push(e.to_string()),
            Err(e) => return Err(e),
        }

        // Two newlines leave the image component
        newline(session, "image").await?;
        newline(session, "image").await
    }

    /// Pick a font size from the toolbar dropdown; failures only warn
    async fn set_font_size<D: EditorDriver>(
        &mut self,
        session: &mut EditorSession<D>,
        size: &str,
        warnings: &mut Vec<String>,
    ) {
        let step = async {
            if !session.click_if_present(&affordances::font_size_button()).await? {
                return Ok::<bool, crate::error::DriverError>(false);
            }
            session.settle().await;
            let picked = session
                .click_if_present(&affordances::font_size_option(size))
                .await?;
            Ok(picked)
        };
        match step.await {
            Ok(true) => {}
            Ok(false) => warnings.push(format!("font size {} control not found", size)),
            Err(e) => warnings.push(format!("font size {} failed: {}", size, e)),
        }
    }
}

/// Type alternating plain/bold runs; bold is toggled around each bold run
async fn mixed_text<D: EditorDriver>(
    session: &mut EditorSession<D>,
    text: &str,
) -> PublishResult<()> {
    let runs = parser::split_bold_runs(text);
    if parser::has_stray_delimiter(&runs) {
        tracing::warn!(text = %text, "Unbalanced bold delimiter typed literally");
    }

    for run in &runs {
        if run.bold {
            toggle_bold(session, "mixed_text").await?;
        }
        if !run.text.is_empty() {
            session
                .type_text(&run.text)
                .await
                .map_err(|e| typing_error("mixed_text", e))?;
        }
        if run.bold {
            toggle_bold(session, "mixed_text").await?;
        }
    }
    newline(session, "mixed_text").await
}

async fn toggle_bold<D: EditorDriver>(
    session: &mut EditorSession<D>,
    kind: &'static str,
) -> PublishResult<()> {
    session
        .chord(Key::Char('b'))
        .await
        .map_err(|e| typing_error(kind, e))
}

async fn newline<D: EditorDriver>(
    session: &mut EditorSession<D>,
    kind: &'static str,
) -> PublishResult<()> {
    session
        .press(Key::Enter)
        .await
        .map_err(|e| typing_error(kind, e))
}

/// Session-level failures keep their identity so the caller can abort
fn typing_error(kind: &'static str, e: crate::error::DriverError) -> PublishError {
    if e.is_session_fatal() {
        PublishError::Driver(e)
    } else {
        PublishError::block(kind, e.to_string())
    }
}

fn escalate(e: &crate::error::DriverError) -> PublishResult<()> {
    if e.is_session_fatal() {
        Err(PublishError::Driver(e.clone()))
    } else {
        Ok(())
    }
}
