use std::time::Duration;

use anyhow::Context as _;

use crate::video_job::PollConfig;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub video_model: String,
    pub request_timeout: Duration,
    pub poll: PollConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            text_model: DEFAULT_TEXT_MODEL.to_owned(),
            image_model: DEFAULT_IMAGE_MODEL.to_owned(),
            video_model: DEFAULT_VIDEO_MODEL.to_owned(),
            request_timeout: Duration::from_secs(300),
            poll: PollConfig::default(),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from `CINEBOOK_*` variables, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(base_url) = read("CINEBOOK_GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(model) = read("CINEBOOK_TEXT_MODEL") {
            config.text_model = model;
        }
        if let Some(model) = read("CINEBOOK_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(model) = read("CINEBOOK_VIDEO_MODEL") {
            config.video_model = model;
        }
        if let Some(raw) = read("CINEBOOK_VIDEO_POLL_INTERVAL_MS") {
            let ms = raw.parse::<u64>().with_context(|| {
                format!("invalid CINEBOOK_VIDEO_POLL_INTERVAL_MS={raw:?}")
            })?;
            config.poll.interval = Duration::from_millis(ms);
        }
        if let Some(raw) = read("CINEBOOK_VIDEO_POLL_MAX_ATTEMPTS") {
            let attempts = raw.parse::<u32>().with_context(|| {
                format!("invalid CINEBOOK_VIDEO_POLL_MAX_ATTEMPTS={raw:?}")
            })?;
            config.poll.max_attempts = (attempts > 0).then_some(attempts);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid gemini base url: {}", self.base_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("gemini base url must be http/https: {}", self.base_url);
        }
        for (name, model) in [
            ("text", &self.text_model),
            ("image", &self.image_model),
            ("video", &self.video_model),
        ] {
            if model.trim().is_empty() {
                anyhow::bail!("{name} model is empty");
            }
        }
        Ok(())
    }
}
