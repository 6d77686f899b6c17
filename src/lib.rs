#![warn(missing_docs)]
//! NanoEdit - AI photo enhancement and editing via the Gemini image model.
//!
//! Upload an image, describe the edit in natural language (or pick a preset
//! and move the adjustment sliders), send one request to Gemini, and save the
//! result.
//!
//! # Quick Start
//!
//! ```no_run
//! use nanoedit::{EditSession, GeminiEditor, GenerationOutcome};
//!
//! #[tokio::main]
//! async fn main() -> nanoedit::Result<()> {
//!     let editor = GeminiEditor::builder().build()?;
//!     let mut session = EditSession::new(editor);
//!
//!     session.load_image("photo.jpg").await?;
//!     session.set_sharpness(70);
//!
//!     match session.generate().await? {
//!         GenerationOutcome::Image(image) => image.save("result.png")?,
//!         GenerationOutcome::Failed(message) => eprintln!("{message}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Requires a `GOOGLE_API_KEY` (or an explicit key on the builder); a missing
//! credential fails at build time, before any request is attempted.

pub mod editor;
mod error;
pub mod ingest;
pub mod prompt;
pub mod session;

// Re-export error types at crate root
pub use error::{NanoEditError, Result};

// Re-export the types most callers need
pub use editor::{EditModel, EditedImage, GeminiEditor, GeminiEditorBuilder};
pub use ingest::{ingest_file, EncodedImage, MediaType, PreviewHandle};
pub use prompt::{Adjustment, Preset, DEFAULT_PROMPT, QUICK_ACTIONS, STYLE_PRESETS};
pub use session::{EditSession, GenerationOutcome, RequestState, SessionPhase, SettledState};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::editor::{EditedImage, GeminiEditor};
    pub use crate::error::{NanoEditError, Result};
    pub use crate::ingest::{EncodedImage, MediaType};
    pub use crate::prompt::Adjustment;
    pub use crate::session::{EditSession, GenerationOutcome, SessionPhase};
}
