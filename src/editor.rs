//! Gemini image-editing client: one request in, one edited image out.

use crate::error::{NanoEditError, Result};
use crate::ingest::MediaType;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default bound on a single edit exchange. The service offers no
/// cancellation once a request is issued, so a hung exchange is cut off
/// client-side instead.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditModel {
    /// Gemini 2.5 Flash Image (fast, economical).
    #[default]
    FlashImage,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    ProImage,
}

impl EditModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashImage => "gemini-2.5-flash-image",
            Self::ProImage => "nano-banana-pro-preview",
        }
    }
}

/// Builder for [`GeminiEditor`].
#[derive(Debug, Clone)]
pub struct GeminiEditorBuilder {
    api_key: Option<String>,
    model: EditModel,
    timeout: Duration,
}

impl Default for GeminiEditorBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            model: EditModel::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GeminiEditorBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: EditModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the editor, resolving the API key.
    ///
    /// A missing or empty key is a configuration error surfaced here,
    /// before any request can be attempted.
    pub fn build(self) -> Result<GeminiEditor> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                NanoEditError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        Ok(GeminiEditor {
            client,
            api_key,
            model: self.model,
        })
    }
}

/// Client for the Gemini image-editing capability.
///
/// Issues exactly one `generateContent` request per [`edit`](Self::edit)
/// call; gating concurrent invocations is the caller's responsibility.
#[derive(Debug)]
pub struct GeminiEditor {
    client: reqwest::Client,
    api_key: String,
    model: EditModel,
}

impl GeminiEditor {
    /// Creates a new [`GeminiEditorBuilder`].
    pub fn builder() -> GeminiEditorBuilder {
        GeminiEditorBuilder::new()
    }

    /// The model variant this editor targets.
    pub fn model(&self) -> EditModel {
        self.model
    }

    /// Sends one edit request carrying the inline image and the instruction
    /// text, and extracts the single returned image.
    ///
    /// Empty inputs are rejected before any network activity.
    pub async fn edit(
        &self,
        image_base64: &str,
        media_type: MediaType,
        prompt: &str,
    ) -> Result<EditedImage> {
        if image_base64.is_empty() {
            return Err(NanoEditError::InvalidRequest("image payload is empty".into()));
        }
        if prompt.trim().is_empty() {
            return Err(NanoEditError::InvalidRequest("prompt is empty".into()));
        }

        let start = Instant::now();

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model.as_str(),
        );

        let body = EditContentRequest::new(image_base64, media_type, prompt);

        tracing::debug!(
            model = self.model.as_str(),
            mime_type = media_type.mime_type(),
            prompt_len = prompt.len(),
            "dispatching edit request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status.as_u16(), &text));
        }

        let parsed: EditContentResponse = response.json().await?;
        let inline = extract_inline_image(parsed)?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(&inline.data)
            .map_err(|e| NanoEditError::Decode(e.to_string()))?;

        let media_type = MediaType::from_mime(&inline.mime_type).unwrap_or(MediaType::Png);

        tracing::debug!(
            bytes = data.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "edit request completed"
        );

        Ok(EditedImage::new(data, media_type, self.model.as_str()))
    }
}

/// The image returned by a successful edit request.
#[derive(Debug, Clone)]
#[must_use = "edited image should be saved or processed"]
pub struct EditedImage {
    data: Vec<u8>,
    media_type: MediaType,
    model: String,
}

impl EditedImage {
    /// Default artifact name for a saved result.
    pub const DEFAULT_FILENAME: &'static str = "result.png";

    /// Creates an edited image from decoded bytes.
    pub fn new(data: Vec<u8>, media_type: MediaType, model: impl Into<String>) -> Self {
        Self {
            data,
            media_type,
            model: model.into(),
        }
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The media type the service reported for the result.
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Model that produced this image.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Writes the image bytes to `path` directly, without re-encoding.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type.mime_type(),
            self.to_base64()
        )
    }
}

/// Applies the staged extraction contract to a decoded response.
///
/// Each absence is its own failure so callers can tell "the service returned
/// nothing usable" apart from a transport failure: zero candidates, a first
/// candidate without parts, and parts without inline data are distinct.
fn extract_inline_image(response: EditContentResponse) -> Result<InlineData> {
    // Blocked prompts come back as HTTP 200 with feedback attached
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            let message = feedback
                .block_reason_message
                .unwrap_or_else(|| format!("Prompt blocked: {reason}"));
            return Err(NanoEditError::ContentBlocked(message));
        }
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(NanoEditError::NoCandidates)?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if matches!(
            reason,
            "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "IMAGE_RECITATION"
                | "RECITATION"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST"
        ) {
            return Err(NanoEditError::ContentBlocked(format!(
                "Content blocked by Gemini safety filter: {reason}"
            )));
        }
    }

    let content = candidate.content.ok_or(NanoEditError::NoParts)?;
    if content.parts.is_empty() {
        return Err(NanoEditError::NoParts);
    }

    content
        .parts
        .into_iter()
        .find_map(|part| part.inline_data.filter(|inline| !inline.data.is_empty()))
        .ok_or(NanoEditError::NoImageData)
}

/// Maps a non-2xx exchange to an error, preferring the service-supplied
/// message over a raw body excerpt.
fn parse_api_error(status: u16, body: &str) -> NanoEditError {
    let message = service_message(body).unwrap_or_else(|| sanitize_body(body));

    if status == 401 || status == 403 {
        return NanoEditError::Auth(message);
    }

    let lower = message.to_lowercase();
    if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
        return NanoEditError::ContentBlocked(message);
    }

    NanoEditError::Api { status, message }
}

/// Pulls `error.message` out of a Gemini error body, if present.
fn service_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_owned)
        .filter(|m| !m.is_empty())
}

fn sanitize_body(body: &str) -> String {
    const MAX_CHARS: usize = 300;

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return crate::error::GENERIC_FAILURE.to_string();
    }

    let mut out: String = trimmed.chars().take(MAX_CHARS).collect();
    if trimmed.chars().count() > MAX_CHARS {
        out.push_str("...");
    }
    out
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditContentRequest {
    contents: Vec<ContentPayload>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct ContentPayload {
    parts: Vec<RequestPart>,
}

/// A part in an edit request - inline image data or instruction text.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlinePayload,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlinePayload {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

impl EditContentRequest {
    fn new(image_base64: &str, media_type: MediaType, prompt: &str) -> Self {
        // Input image first, then the instruction text
        let parts = vec![
            RequestPart::InlineData {
                inline_data: InlinePayload {
                    mime_type: media_type.mime_type().to_string(),
                    data: image_base64.to_string(),
                },
            },
            RequestPart::Text {
                text: prompt.to_string(),
            },
        ];

        Self {
            contents: vec![ContentPayload { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_model_as_str() {
        assert_eq!(EditModel::FlashImage.as_str(), "gemini-2.5-flash-image");
        assert_eq!(EditModel::ProImage.as_str(), "nano-banana-pro-preview");
    }

    #[test]
    fn test_edit_model_default() {
        assert_eq!(EditModel::default(), EditModel::FlashImage);
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let editor = GeminiEditorBuilder::new()
            .api_key("test-key")
            .model(EditModel::FlashImage)
            .build();
        assert!(editor.is_ok());
    }

    #[test]
    fn test_builder_rejects_empty_key() {
        // An explicitly empty key never falls back to the environment, so
        // this is deterministic regardless of GOOGLE_API_KEY being set.
        let err = GeminiEditorBuilder::new().api_key("").build().unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }

    #[tokio::test]
    async fn test_edit_rejects_empty_inputs_before_any_network_use() {
        let editor = GeminiEditor::builder().api_key("test-key").build().unwrap();

        let err = editor.edit("", MediaType::Png, "sharpen").await.unwrap_err();
        assert!(matches!(err, NanoEditError::InvalidRequest(_)));

        let err = editor.edit("AAAA", MediaType::Png, "  ").await.unwrap_err();
        assert!(matches!(err, NanoEditError::InvalidRequest(_)));
    }

    #[test]
    fn test_request_parts_order_and_modality() {
        let request = EditContentRequest::new("AAAA", MediaType::Jpeg, "Upscale this image");
        let json = serde_json::to_value(&request).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert!(parts[0].get("inlineData").is_some());
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "AAAA");
        assert_eq!(parts[1]["text"], "Upscale this image");

        assert_eq!(json["generationConfig"]["responseModalities"][0], "IMAGE");
        // camelCase on the wire, never snake_case
        assert!(json.get("generation_config").is_none());
    }

    #[test]
    fn test_extract_first_inline_payload() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your image" },
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } }
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let response: EditContentResponse = serde_json::from_str(json).unwrap();
        let inline = extract_inline_image(response).unwrap();
        assert_eq!(inline.data, "AAAA");
        assert_eq!(inline.mime_type, "image/png");
    }

    #[test]
    fn test_extract_no_candidates() {
        let response: EditContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        let err = extract_inline_image(response).unwrap_err();
        assert!(matches!(err, NanoEditError::NoCandidates));
        assert!(err.is_empty_response());
        assert!(err.to_string().contains("candidates"));
    }

    #[test]
    fn test_extract_no_parts() {
        let json = r#"{"candidates": [{"content": {"parts": []}}]}"#;
        let response: EditContentResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_inline_image(response).unwrap_err(),
            NanoEditError::NoParts
        ));

        let json = r#"{"candidates": [{"finishReason": "STOP"}]}"#;
        let response: EditContentResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_inline_image(response).unwrap_err(),
            NanoEditError::NoParts
        ));
    }

    #[test]
    fn test_extract_no_image_data() {
        let json = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "no image, sorry" }] }
            }]
        }"#;
        let response: EditContentResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_inline_image(response).unwrap_err(),
            NanoEditError::NoImageData
        ));
    }

    #[test]
    fn test_extract_prompt_feedback_block() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let response: EditContentResponse = serde_json::from_str(json).unwrap();
        let err = extract_inline_image(response).unwrap_err();
        assert!(matches!(err, NanoEditError::ContentBlocked(_)));
        assert!(err.to_string().contains("blocked due to safety"));
    }

    #[test]
    fn test_extract_safety_finish_reason() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let response: EditContentResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_inline_image(response).unwrap_err(),
            NanoEditError::ContentBlocked(_)
        ));
    }

    #[test]
    fn test_parse_api_error_prefers_service_message() {
        let body = r#"{"error": {"code": 400, "message": "Invalid image payload"}}"#;
        let err = parse_api_error(400, body);
        match err {
            NanoEditError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid image payload");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_api_error_auth_statuses() {
        assert!(parse_api_error(401, "unauthorized").is_configuration());
        assert!(parse_api_error(403, "forbidden").is_configuration());
    }

    #[test]
    fn test_parse_api_error_blocked_content() {
        let body = r#"{"error": {"message": "Request blocked by safety policy"}}"#;
        assert!(matches!(
            parse_api_error(400, body),
            NanoEditError::ContentBlocked(_)
        ));
    }

    #[test]
    fn test_parse_api_error_empty_body_falls_back() {
        let err = parse_api_error(502, "");
        match err {
            NanoEditError::Api { message, .. } => {
                assert_eq!(message, crate::error::GENERIC_FAILURE)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_edited_image_round_trip() {
        let image = EditedImage::new(vec![0, 0, 0], MediaType::Png, "gemini-2.5-flash-image");
        assert_eq!(image.size(), 3);
        assert_eq!(image.to_base64(), "AAAA");
        assert!(image.to_data_url().starts_with("data:image/png;base64,"));
    }
}
