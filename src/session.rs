//! Edit session: the single logical document owning image, prompt, and result.
//!
//! Session-scoped mutable state is modeled as an explicit state machine
//! rather than loose flags: one image, one prompt, at most one request in
//! flight, one stored outcome. Image loads and generations are serialized by
//! `&mut` access, so the most recent selection always wins.

use crate::editor::{EditedImage, GeminiEditor};
use crate::error::{NanoEditError, Result};
use crate::ingest::{ingest_file, EncodedImage};
use crate::prompt::{Adjustment, Preset, DEFAULT_PROMPT};
use std::path::Path;

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No image selected yet.
    Empty,
    /// An image is loaded; nothing generated so far.
    ImageLoaded,
    /// An edit request is in flight.
    Generating,
    /// The last request produced an image.
    Generated,
    /// The last request failed; the message is stored in the outcome.
    Errored,
}

/// Whether a settled request succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettledState {
    /// The request produced an image.
    Ok,
    /// The request failed.
    Error,
}

/// The request gate: at most one edit request runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// No request issued since the last reset or image change.
    Idle,
    /// A request is currently running; new triggers are rejected.
    InFlight,
    /// The last request finished.
    Settled(SettledState),
}

/// Result of the most recent edit request. The image and the failure message
/// are mutually exclusive; a session with no outcome has not run yet.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// The edited image returned by the service.
    Image(EditedImage),
    /// The normalized user-visible failure message.
    Failed(String),
}

/// One editing session: image, prompt, adjustment positions, last outcome.
pub struct EditSession {
    editor: GeminiEditor,
    image: Option<EncodedImage>,
    prompt: String,
    sharpness: i32,
    noise_reduction: i32,
    outcome: Option<GenerationOutcome>,
    busy: bool,
}

impl EditSession {
    /// Creates an empty session around a configured editor.
    pub fn new(editor: GeminiEditor) -> Self {
        Self {
            editor,
            image: None,
            prompt: String::new(),
            sharpness: 50,
            noise_reduction: 50,
            outcome: None,
            busy: false,
        }
    }

    /// Current phase of the session state machine.
    pub fn phase(&self) -> SessionPhase {
        if self.busy {
            return SessionPhase::Generating;
        }
        match (&self.image, &self.outcome) {
            (None, _) => SessionPhase::Empty,
            (Some(_), None) => SessionPhase::ImageLoaded,
            (Some(_), Some(GenerationOutcome::Image(_))) => SessionPhase::Generated,
            (Some(_), Some(GenerationOutcome::Failed(_))) => SessionPhase::Errored,
        }
    }

    /// Current position of the request gate.
    pub fn request_state(&self) -> RequestState {
        if self.busy {
            return RequestState::InFlight;
        }
        match &self.outcome {
            None => RequestState::Idle,
            Some(GenerationOutcome::Image(_)) => RequestState::Settled(SettledState::Ok),
            Some(GenerationOutcome::Failed(_)) => RequestState::Settled(SettledState::Error),
        }
    }

    /// The currently loaded image, if any.
    pub fn image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    /// The current prompt text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Replaces the prompt wholesale.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Applies a preset, discarding the current prompt including any
    /// slider-authored clauses.
    pub fn apply_preset(&mut self, preset: &Preset) {
        tracing::debug!(label = preset.label, "applying preset");
        self.prompt = preset.prompt.to_string();
    }

    /// Current sharpness position.
    pub fn sharpness(&self) -> i32 {
        self.sharpness
    }

    /// Current noise-reduction position.
    pub fn noise_reduction(&self) -> i32 {
        self.noise_reduction
    }

    /// Moves the sharpness control, splicing its clause into the prompt.
    pub fn set_sharpness(&mut self, value: i32) {
        let value = value.clamp(0, 100);
        self.sharpness = value;
        self.prompt = Adjustment::Sharpness.splice(&self.prompt, value);
    }

    /// Moves the noise-reduction control, splicing its clause into the prompt.
    pub fn set_noise_reduction(&mut self, value: i32) {
        let value = value.clamp(0, 100);
        self.noise_reduction = value;
        self.prompt = Adjustment::NoiseReduction.splice(&self.prompt, value);
    }

    /// Outcome of the most recent request, if one has settled.
    pub fn outcome(&self) -> Option<&GenerationOutcome> {
        self.outcome.as_ref()
    }

    /// The last generated image, if the most recent request succeeded.
    pub fn result(&self) -> Option<&EditedImage> {
        match &self.outcome {
            Some(GenerationOutcome::Image(image)) => Some(image),
            _ => None,
        }
    }

    /// The last failure message, if the most recent request failed.
    pub fn last_error(&self) -> Option<&str> {
        match &self.outcome {
            Some(GenerationOutcome::Failed(message)) => Some(message),
            _ => None,
        }
    }

    /// Returns true while an edit request is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Reads, validates, and installs an image from the filesystem.
    ///
    /// A validation failure leaves the session untouched.
    pub async fn load_image(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let encoded = ingest_file(path).await?;
        self.install_image(encoded);
        Ok(())
    }

    /// Installs an already-encoded image, superseding any previous one.
    ///
    /// Dropping the previous image releases its preview handle. Stale results
    /// are cleared, and an empty prompt is seeded with the default; text the
    /// user already authored is never overwritten.
    pub fn install_image(&mut self, image: EncodedImage) {
        tracing::debug!(mime_type = image.media_type().mime_type(), "image installed");
        self.image = Some(image);
        self.outcome = None;
        if self.prompt.is_empty() {
            self.prompt = DEFAULT_PROMPT.to_string();
        }
    }

    /// Issues one edit request for the current image and prompt.
    ///
    /// Precondition failures (a request already in flight, no image, an empty
    /// prompt) return an error without touching the stored outcome. Otherwise
    /// the outcome is cleared before dispatch, so a failed request shows "no
    /// result" rather than a stale success, and the settled outcome — the
    /// image, or a normalized user-visible message — is stored and returned.
    pub async fn generate(&mut self) -> Result<&GenerationOutcome> {
        if self.busy {
            return Err(NanoEditError::InvalidRequest(
                "a generation request is already in flight".into(),
            ));
        }

        let (image_base64, media_type) = match self.image.as_ref() {
            Some(image) => (image.base64().to_owned(), image.media_type()),
            None => {
                return Err(NanoEditError::InvalidRequest("no image loaded".into()));
            }
        };

        if self.prompt.trim().is_empty() {
            return Err(NanoEditError::InvalidRequest("prompt is empty".into()));
        }
        let prompt = self.prompt.clone();

        self.busy = true;
        self.outcome = None;

        let result = self.editor.edit(&image_base64, media_type, &prompt).await;
        self.busy = false;

        let outcome = match result {
            Ok(image) => GenerationOutcome::Image(image),
            Err(err) => {
                tracing::warn!(error = %err, "edit request failed");
                GenerationOutcome::Failed(err.user_message())
            }
        };

        Ok(self.outcome.insert(outcome))
    }

    /// Saves the last generated image to `path`.
    pub fn save_result(&self, path: impl AsRef<Path>) -> Result<()> {
        let image = self
            .result()
            .ok_or_else(|| NanoEditError::InvalidRequest("no generated image to save".into()))?;
        image.save(path)
    }

    /// Clears the session back to [`SessionPhase::Empty`], releasing the
    /// image preview.
    pub fn reset(&mut self) {
        self.image = None;
        self.prompt.clear();
        self.outcome = None;
    }
}
