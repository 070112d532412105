use std::sync::Arc;

use anyhow::Context as _;

use crate::formats::BookAnalysis;
use crate::pipeline::interrupt::{InterruptionHandler, VideoFailureAction};
use crate::pipeline::run::{Phase, RunStatus, RunTracker, SceneFailure};
use crate::pipeline::sink::{ProgressSink, Publish};
use crate::provider::{ImageGenerator, VideoGenerator};

pub const UNEXPECTED_FAILURE_MESSAGE: &str =
    "Something went wrong while generating visuals. Please start a new run.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseOutcome {
    Finished,
    Suspended,
}

/// Drives the image sweep and then the video sweep over a scene list.
///
/// Jobs run one at a time in scene order. Every successful job publishes a
/// full snapshot; failures are recorded on the run and skipped, except for an
/// access-denied video failure, which ends the run early (see
/// [`InterruptionHandler`]).
pub struct PipelineDriver {
    images: Arc<dyn ImageGenerator>,
    videos: Arc<dyn VideoGenerator>,
    interrupts: InterruptionHandler,
}

impl PipelineDriver {
    pub fn new(
        images: Arc<dyn ImageGenerator>,
        videos: Arc<dyn VideoGenerator>,
        interrupts: InterruptionHandler,
    ) -> Self {
        Self {
            images,
            videos,
            interrupts,
        }
    }

    /// Runs both phases and returns the final analysis. The outcome is
    /// reported through `tracker`; this never fails.
    pub async fn run(
        &self,
        tracker: &RunTracker,
        analysis: BookAnalysis,
        sink: &dyn ProgressSink,
    ) -> BookAnalysis {
        let mut analysis = analysis;
        if let Err(err) = self.try_run(tracker, &mut analysis, sink).await {
            tracing::error!(run_id = %tracker.run_id(), ?err, "pipeline failed");
            tracker.fail(UNEXPECTED_FAILURE_MESSAGE);
        }
        analysis
    }

    async fn try_run(
        &self,
        tracker: &RunTracker,
        analysis: &mut BookAnalysis,
        sink: &dyn ProgressSink,
    ) -> anyhow::Result<()> {
        tracker
            .transition(RunStatus::GeneratingImages)
            .context("start image phase")?;
        self.image_phase(tracker, analysis, sink).await;

        tracker
            .transition(RunStatus::GeneratingVideos)
            .context("start video phase")?;
        if self.video_phase(tracker, analysis, sink).await == PhaseOutcome::Suspended {
            tracing::info!(run_id = %tracker.run_id(), "video phase suspended");
        }

        tracker
            .transition(RunStatus::Completed)
            .context("complete run")?;
        Ok(())
    }

    async fn image_phase(
        &self,
        tracker: &RunTracker,
        analysis: &mut BookAnalysis,
        sink: &dyn ProgressSink,
    ) {
        let total = analysis.scenes.len();
        for index in 0..total {
            let prompt = analysis.scenes[index].visual_prompt.clone();
            match self.images.generate_image(&prompt).await {
                Ok(image) => {
                    analysis.scenes[index].attach_image(image);
                    publish(tracker, sink, analysis, Phase::Images, index);
                    tracing::info!(
                        run_id = %tracker.run_id(),
                        scene_index = index,
                        total,
                        "image generated"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        run_id = %tracker.run_id(),
                        scene_index = index,
                        error = %err,
                        "image generation failed; skipping scene"
                    );
                    tracker.record_failure(SceneFailure {
                        phase: Phase::Images,
                        scene_index: index,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    async fn video_phase(
        &self,
        tracker: &RunTracker,
        analysis: &mut BookAnalysis,
        sink: &dyn ProgressSink,
    ) -> PhaseOutcome {
        let total = analysis.scenes.len();
        for index in 0..total {
            let prompt = analysis.scenes[index].visual_prompt.clone();
            match self.videos.generate_video(&prompt).await {
                Ok(video_url) => {
                    analysis.scenes[index].attach_video(video_url);
                    publish(tracker, sink, analysis, Phase::Videos, index);
                    tracing::info!(
                        run_id = %tracker.run_id(),
                        scene_index = index,
                        total,
                        "video generated"
                    );
                }
                Err(err) => {
                    let current = sink.is_current(tracker.run_id());
                    match self
                        .interrupts
                        .handle_video_failure(tracker, index, &err, current)
                    {
                        VideoFailureAction::Continue => {}
                        VideoFailureAction::Suspend => return PhaseOutcome::Suspended,
                    }
                }
            }
        }
        PhaseOutcome::Finished
    }
}

fn publish(
    tracker: &RunTracker,
    sink: &dyn ProgressSink,
    analysis: &BookAnalysis,
    phase: Phase,
    scene_index: usize,
) {
    if sink.publish(tracker.run_id(), analysis) == Publish::Stale {
        tracing::debug!(
            run_id = %tracker.run_id(),
            ?phase,
            scene_index,
            "display moved on; snapshot dropped"
        );
    }
}
