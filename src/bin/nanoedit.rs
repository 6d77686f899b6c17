//! CLI for NanoEdit - AI photo enhancement via the Gemini image model.

use clap::{Args, Parser, Subcommand, ValueEnum};
use nanoedit::prompt::{Adjustment, Preset, DEFAULT_PROMPT, QUICK_ACTIONS, STYLE_PRESETS};
use nanoedit::{EditModel, EditSession, EditedImage, GeminiEditor, GenerationOutcome};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "nanoedit")]
#[command(about = "Edit and enhance photos with the Gemini image model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit an image with a prompt, preset, or adjustment sliders
    Edit(EditArgs),

    /// Print the prompt that would be sent, without calling the API
    Prompt(PromptArgs),

    /// List quick actions and style presets
    Presets,
}

#[derive(Args)]
struct EditArgs {
    /// Input image (jpeg, png, webp, heic, heif)
    input: PathBuf,

    #[command(flatten)]
    shaping: PromptArgs,

    /// Output file path
    #[arg(short, long, default_value = EditedImage::DEFAULT_FILENAME)]
    output: PathBuf,

    /// Gemini model variant
    #[arg(long, value_enum, default_value = "flash")]
    model: ModelArg,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

#[derive(Args)]
struct PromptArgs {
    /// Free-text edit instruction
    #[arg(short, long)]
    prompt: Option<String>,

    /// Quick action preset (replaces the prompt)
    #[arg(long, value_enum, conflicts_with = "prompt")]
    action: Option<ActionArg>,

    /// Style preset (replaces the prompt)
    #[arg(long, value_enum, conflicts_with_all = ["prompt", "action"])]
    style: Option<StyleArg>,

    /// Sharpness level, 0-100 (spliced into the prompt)
    #[arg(long)]
    sharpness: Option<i32>,

    /// Noise reduction level, 0-100 (spliced into the prompt)
    #[arg(long)]
    denoise: Option<i32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Flash,
    Pro,
}

impl From<ModelArg> for EditModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Flash => EditModel::FlashImage,
            ModelArg::Pro => EditModel::ProImage,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
    #[value(name = "upscale-1200dpi")]
    Upscale1200Dpi,
    #[value(name = "upscale-300dpi")]
    Upscale300Dpi,
    #[value(name = "upscale-4k")]
    Upscale4k,
    FixLighting,
    ColorCorrection,
    RemoveBackground,
}

impl ActionArg {
    fn preset(self) -> &'static Preset {
        match self {
            Self::Upscale1200Dpi => &QUICK_ACTIONS[0],
            Self::Upscale300Dpi => &QUICK_ACTIONS[1],
            Self::Upscale4k => &QUICK_ACTIONS[2],
            Self::FixLighting => &QUICK_ACTIONS[3],
            Self::ColorCorrection => &QUICK_ACTIONS[4],
            Self::RemoveBackground => &QUICK_ACTIONS[5],
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StyleArg {
    RetroVintage,
    CyberpunkNeon,
    PencilSketch,
    OilPainting,
}

impl StyleArg {
    fn preset(self) -> &'static Preset {
        match self {
            Self::RetroVintage => &STYLE_PRESETS[0],
            Self::CyberpunkNeon => &STYLE_PRESETS[1],
            Self::PencilSketch => &STYLE_PRESETS[2],
            Self::OilPainting => &STYLE_PRESETS[3],
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Edit(args) => {
            run_edit(args, cli.json).await?;
        }
        Commands::Prompt(args) => {
            run_prompt(args, cli.json)?;
        }
        Commands::Presets => {
            list_presets(cli.json)?;
        }
    }

    Ok(())
}

async fn run_edit(args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    let editor = GeminiEditor::builder()
        .model(args.model.into())
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let mut session = EditSession::new(editor);
    session.load_image(&args.input).await?;
    apply_shaping(&mut session, &args.shaping);
    let prompt = session.prompt().to_string();

    match session.generate().await? {
        GenerationOutcome::Image(image) => {
            image.save(&args.output)?;

            if json_output {
                let result = serde_json::json!({
                    "success": true,
                    "output": args.output.display().to_string(),
                    "size_bytes": image.size(),
                    "media_type": image.media_type().mime_type(),
                    "model": image.model(),
                    "prompt": prompt,
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "Saved edited image: {} ({} bytes) via {}",
                    args.output.display(),
                    image.size(),
                    image.model()
                );
            }
            Ok(())
        }
        GenerationOutcome::Failed(message) => {
            if json_output {
                let result = serde_json::json!({
                    "success": false,
                    "error": message,
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            anyhow::bail!("{message}");
        }
    }
}

fn apply_shaping(session: &mut EditSession, args: &PromptArgs) {
    if let Some(ref prompt) = args.prompt {
        session.set_prompt(prompt);
    }
    if let Some(action) = args.action {
        session.apply_preset(action.preset());
    }
    if let Some(style) = args.style {
        session.apply_preset(style.preset());
    }
    if let Some(value) = args.sharpness {
        session.set_sharpness(value);
    }
    if let Some(value) = args.denoise {
        session.set_noise_reduction(value);
    }
}

fn run_prompt(args: PromptArgs, json_output: bool) -> anyhow::Result<()> {
    let mut prompt = args
        .prompt
        .clone()
        .or_else(|| args.action.map(|a| a.preset().prompt.to_string()))
        .or_else(|| args.style.map(|s| s.preset().prompt.to_string()))
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    if let Some(value) = args.sharpness {
        prompt = Adjustment::Sharpness.splice(&prompt, value);
    }
    if let Some(value) = args.denoise {
        prompt = Adjustment::NoiseReduction.splice(&prompt, value);
    }

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "prompt": prompt }))?
        );
    } else {
        println!("{prompt}");
    }

    Ok(())
}

fn list_presets(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct PresetInfo {
        label: &'static str,
        prompt: &'static str,
        group: &'static str,
    }

    let presets: Vec<PresetInfo> = QUICK_ACTIONS
        .iter()
        .map(|p| PresetInfo {
            label: p.label,
            prompt: p.prompt,
            group: "quick-action",
        })
        .chain(STYLE_PRESETS.iter().map(|p| PresetInfo {
            label: p.label,
            prompt: p.prompt,
            group: "style",
        }))
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&presets)?);
    } else {
        println!("QUICK ACTIONS:");
        for p in presets.iter().filter(|p| p.group == "quick-action") {
            println!("  {}", p.label);
            println!("    {}", p.prompt);
        }
        println!("\nSTYLES:");
        for p in presets.iter().filter(|p| p.group == "style") {
            println!("  {}", p.label);
            println!("    {}", p.prompt);
        }
    }

    Ok(())
}
