//! Prompt synthesis: preset prompts and idempotent slider clause splicing.
//!
//! The prompt is a single free-text string. Presets replace it wholesale;
//! the two adjustment controls splice a recognizable sentence into it,
//! replacing their own previous clause in place so repeated changes never
//! accumulate duplicates and never disturb surrounding text.

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

/// Seeded into an empty prompt when an image is first selected.
pub const DEFAULT_PROMPT: &str =
    "Upscale this image to high resolution (1200 DPI look), increasing detail and texture fidelity.";

/// A named prompt applied as a wholesale replacement of the current text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    /// Short label shown to the user.
    pub label: &'static str,
    /// The full replacement prompt.
    pub prompt: &'static str,
}

/// Enhancement quick actions.
pub const QUICK_ACTIONS: &[Preset] = &[
    Preset {
        label: "Upscale (1200 DPI)",
        prompt: "Upscale this image to high resolution (1200 DPI look), increasing detail and texture fidelity.",
    },
    Preset {
        label: "Upscale (300 DPI)",
        prompt: "Upscale this image to standard print resolution (300 DPI), improving sharpness suitable for high-quality printing.",
    },
    Preset {
        label: "Upscale (4K)",
        prompt: "Upscale this image to 4K Ultra HD resolution, maximizing clarity and fine details.",
    },
    Preset {
        label: "Fix Lighting",
        prompt: "Fix lighting, balance exposure, and enhance colors for a natural, vibrant look.",
    },
    Preset {
        label: "Color Correction",
        prompt: "Color correct this image, neutralizing color casts and improving saturation for a professional look.",
    },
    Preset {
        label: "Remove Background",
        prompt: "Remove the background and leave the subject on a clean white background.",
    },
];

/// Creative style presets.
pub const STYLE_PRESETS: &[Preset] = &[
    Preset {
        label: "Retro Vintage",
        prompt: "Apply a retro vintage aesthetic with film grain and warm color grading.",
    },
    Preset {
        label: "Cyberpunk Neon",
        prompt: "Transform into a cyberpunk style with neon lights, dark tones, and futuristic vibes.",
    },
    Preset {
        label: "Pencil Sketch",
        prompt: "Convert this image into a detailed pencil sketch.",
    },
    Preset {
        label: "Oil Painting",
        prompt: "Turn this image into a classic oil painting with visible brushstrokes.",
    },
];

// Band wildcard, captured percentage, optional trailing period: tolerant of
// the band label changing but not of hand edits to the fixed sentence text.
static SHARPNESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Sharpen the image with .*? intensity \(\d+%\)\. Enhance fine details and edge contrast for a crisp, clear look\.?",
    )
    .expect("sharpness pattern is valid")
});

static NOISE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Reduce image noise with .*? intensity \(\d+%\)\. Smooth out grain and digital artifacts while preserving main details and textures\.?",
    )
    .expect("noise pattern is valid")
});

/// A numeric adjustment control that owns one spliceable prompt clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Edge and detail sharpening.
    Sharpness,
    /// Grain and artifact smoothing.
    NoiseReduction,
}

impl Adjustment {
    /// Label for the top intensity band; the only wording difference
    /// between the two controls.
    fn peak_band(&self) -> &'static str {
        match self {
            Self::Sharpness => "extreme",
            Self::NoiseReduction => "strong",
        }
    }

    /// Maps a control value to its intensity band label. Values clamp to
    /// [0, 100] before banding.
    pub fn band(&self, value: i32) -> &'static str {
        let value = value.clamp(0, 100);
        if value < 30 {
            "subtle"
        } else if value > 75 {
            self.peak_band()
        } else if value > 50 {
            "high"
        } else {
            "moderate"
        }
    }

    /// Renders the full clause for a control value.
    pub fn clause(&self, value: i32) -> String {
        let value = value.clamp(0, 100);
        let band = self.band(value);
        match self {
            Self::Sharpness => format!(
                "Sharpen the image with {band} intensity ({value}%). \
                 Enhance fine details and edge contrast for a crisp, clear look."
            ),
            Self::NoiseReduction => format!(
                "Reduce image noise with {band} intensity ({value}%). \
                 Smooth out grain and digital artifacts while preserving main details and textures."
            ),
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            Self::Sharpness => &SHARPNESS_PATTERN,
            Self::NoiseReduction => &NOISE_PATTERN,
        }
    }

    /// Splices this control's clause into `prompt` for the given value.
    ///
    /// If the control's previous clause is present it is replaced in place,
    /// preserving its position; otherwise the clause is appended, joined with
    /// `". "` when the existing text does not already end with a period.
    /// Repeated calls with the same value are idempotent, and other text
    /// (including the other control's clause) is left untouched.
    pub fn splice(&self, prompt: &str, value: i32) -> String {
        let clause = self.clause(value);
        let pattern = self.pattern();

        if pattern.is_match(prompt) {
            return pattern.replace(prompt, NoExpand(clause.as_str())).into_owned();
        }

        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            clause
        } else if trimmed.ends_with('.') {
            format!("{trimmed} {clause}")
        } else {
            format!("{trimmed}. {clause}")
        }
    }
}
