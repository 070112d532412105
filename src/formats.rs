use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAnalysis {
    pub title: String,
    pub author: String,
    pub summary: String,
    #[serde(default)]
    pub themes: Vec<String>,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub foreshadowing: String,
    pub visual_prompt: String,

    /// `data:` URL of the generated still.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Download URI of the generated clip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl BookAnalysis {
    /// Drops any media already attached, as the analysis step hands scenes to
    /// the pipeline with narrative fields only.
    #[must_use]
    pub fn without_media(mut self) -> Self {
        for scene in &mut self.scenes {
            scene.image = None;
            scene.video_url = None;
        }
        self
    }

    pub fn images_attached(&self) -> usize {
        self.scenes.iter().filter(|s| s.image.is_some()).count()
    }

    pub fn videos_attached(&self) -> usize {
        self.scenes.iter().filter(|s| s.video_url.is_some()).count()
    }
}

impl Scene {
    // Media fields only ever move from absent to present.
    pub fn attach_image(&mut self, image: String) {
        self.image = Some(image);
    }

    pub fn attach_video(&mut self, video_url: String) {
        self.video_url = Some(video_url);
    }
}
