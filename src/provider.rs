use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::credentials::CredentialStore;
use crate::error::{AnalysisError, GenerationError};
use crate::formats::BookAnalysis;
use crate::gemini::GeminiClient;
use crate::noop::NoopProvider;
use crate::video_job::{PolledVideoGenerator, TokioSleeper};

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Returns a complete scene list with narrative fields set and no media.
    async fn analyze(&self, text: &str) -> Result<BookAnalysis, AnalysisError>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn generate_video(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Process-wide credential status and the interactive re-selection trigger.
pub trait CredentialBroker: Send + Sync {
    fn has_credential(&self) -> bool;

    /// Asks the user to pick a credential. Must not block on the answer.
    fn request_credential(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Noop,
    Gemini,
}

/// The three generation collaborators a run needs.
#[derive(Clone)]
pub struct Providers {
    pub analyzer: Arc<dyn Analyzer>,
    pub images: Arc<dyn ImageGenerator>,
    pub videos: Arc<dyn VideoGenerator>,
    /// Whether a run must have an API key before it starts.
    pub requires_credential: bool,
}

impl Providers {
    pub fn build(
        engine: Engine,
        config: &GeminiConfig,
        credentials: Arc<CredentialStore>,
    ) -> anyhow::Result<Self> {
        match engine {
            Engine::Noop => {
                let noop = Arc::new(NoopProvider::default());
                Ok(Self {
                    analyzer: noop.clone(),
                    images: noop.clone(),
                    videos: noop,
                    requires_credential: false,
                })
            }
            Engine::Gemini => {
                let client = Arc::new(GeminiClient::new(config.clone(), credentials)?);
                let videos = PolledVideoGenerator::new(
                    client.clone(),
                    Arc::new(TokioSleeper),
                    config.poll.clone(),
                );
                Ok(Self {
                    analyzer: client.clone(),
                    images: client,
                    videos: Arc::new(videos),
                    requires_credential: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::ValueEnum as _;

    use super::Engine;

    #[test]
    fn engine_names_are_case_insensitive() {
        assert_eq!(Engine::from_str("noop", true).unwrap(), Engine::Noop);
        assert_eq!(Engine::from_str("Gemini", true).unwrap(), Engine::Gemini);
        assert!(Engine::from_str("openai", true).is_err());
    }

    #[test]
    fn engine_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Engine::Noop).unwrap(), "\"noop\"");
    }
}
