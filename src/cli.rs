use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::GeminiConfig;
use crate::provider::Engine;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze book text into scenes (no media).
    Analyze(AnalyzeArgs),
    /// Generate images and videos for an existing analysis.
    Render(RenderArgs),
    /// Analyze book text and generate images and videos for every scene.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ProviderArgs {
    /// Generation backend.
    #[arg(long, value_enum, env = "CINEBOOK_ENGINE", default_value_t = Engine::Gemini)]
    pub engine: Engine,

    /// Gemini API base URL (default: $CINEBOOK_GEMINI_BASE_URL or the public endpoint).
    #[arg(long)]
    pub gemini_base_url: Option<String>,

    /// Model used for book analysis.
    #[arg(long)]
    pub text_model: Option<String>,

    /// Model used for scene stills.
    #[arg(long)]
    pub image_model: Option<String>,

    /// Model used for scene clips.
    #[arg(long)]
    pub video_model: Option<String>,

    /// Delay between video operation polls.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Give up on a video after this many polls (0 = never).
    #[arg(long)]
    pub poll_max_attempts: Option<u32>,
}

impl ProviderArgs {
    /// Environment config with command-line overrides applied.
    pub fn gemini_config(&self) -> anyhow::Result<GeminiConfig> {
        let mut config = GeminiConfig::from_env()?;
        if let Some(base_url) = &self.gemini_base_url {
            config.base_url = base_url.clone();
        }
        if let Some(model) = &self.text_model {
            config.text_model = model.clone();
        }
        if let Some(model) = &self.image_model {
            config.image_model = model.clone();
        }
        if let Some(model) = &self.video_model {
            config.video_model = model.clone();
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll.interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = self.poll_max_attempts {
            config.poll.max_attempts = (attempts > 0).then_some(attempts);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Input path to the book text.
    #[arg(long)]
    pub input: String,

    /// Output file path for the analysis JSON.
    #[arg(long)]
    pub out: String,

    /// Overwrite the output file if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Input path to an analysis JSON (created by `analyze`).
    #[arg(long)]
    pub analysis: String,

    /// Output file path for the run report JSON.
    #[arg(long)]
    pub out: String,

    /// Overwrite the output file if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Input path to the book text.
    #[arg(long, required_unless_present = "example", conflicts_with = "example")]
    pub input: Option<String>,

    /// Use the bundled example text instead of --input.
    #[arg(long, default_value_t = false)]
    pub example: bool,

    /// Output file path for the run report JSON.
    #[arg(long)]
    pub out: String,

    /// Overwrite the output file if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[command(flatten)]
    pub provider: ProviderArgs,
}
