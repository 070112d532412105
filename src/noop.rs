use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::Engine as _;

use crate::analysis::{MAX_SCENES, truncate_chars};
use crate::error::{AnalysisError, GenerationError};
use crate::formats::{BookAnalysis, Scene};
use crate::provider::{Analyzer, ImageGenerator, VideoGenerator};

static PLACEHOLDER_PNG: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 4, 0,
    0, 0, 181, 28, 12, 2, 0, 0, 0, 11, 73, 68, 65, 84, 120, 218, 99, 252, 255, 23, 0, 2, 3, 1, 128,
    110, 220, 25, 0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

/// Offline provider: paragraphs become scenes, media are placeholders.
#[derive(Debug, Default)]
pub struct NoopProvider {
    videos: AtomicUsize,
}

#[async_trait]
impl Analyzer for NoopProvider {
    async fn analyze(&self, text: &str) -> Result<BookAnalysis, AnalysisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        tracing::info!(engine = "noop", "analyze book");
        Ok(analyze_paragraphs(text))
    }
}

#[async_trait]
impl ImageGenerator for NoopProvider {
    async fn generate_image(&self, _prompt: &str) -> Result<String, GenerationError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(PLACEHOLDER_PNG);
        Ok(format!("data:image/png;base64,{encoded}"))
    }
}

#[async_trait]
impl VideoGenerator for NoopProvider {
    async fn generate_video(&self, _prompt: &str) -> Result<String, GenerationError> {
        let n = self.videos.fetch_add(1, Ordering::SeqCst);
        Ok(format!("noop://video/{n}"))
    }
}

fn analyze_paragraphs(text: &str) -> BookAnalysis {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let title = lines
        .next()
        .map(|l| truncate_chars(l.trim_start_matches('#').trim(), 80).to_owned())
        .unwrap_or_else(|| "Untitled".to_owned());

    let paragraphs = text
        .split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty() && p.trim_start_matches('#').trim() != title)
        .collect::<Vec<_>>();

    let summary = paragraphs
        .first()
        .map(|p| truncate_chars(p, 200).to_owned())
        .unwrap_or_else(|| title.clone());

    let scenes = paragraphs
        .iter()
        .take(MAX_SCENES)
        .enumerate()
        .map(|(idx, paragraph)| {
            let description = truncate_chars(paragraph, 280).to_owned();
            Scene {
                title: format!("Scene {}", idx + 1),
                visual_prompt: format!("Cinematic still, dramatic lighting: {description}"),
                description,
                foreshadowing: String::new(),
                image: None,
                video_url: None,
            }
        })
        .collect::<Vec<_>>();

    let scenes = if scenes.is_empty() {
        vec![Scene {
            title: "Scene 1".to_owned(),
            description: title.clone(),
            foreshadowing: String::new(),
            visual_prompt: format!("Cinematic still, dramatic lighting: {title}"),
            image: None,
            video_url: None,
        }]
    } else {
        scenes
    };

    BookAnalysis {
        title,
        author: "Unknown".to_owned(),
        summary,
        themes: Vec::new(),
        scenes,
    }
}
