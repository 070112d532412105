use std::sync::Arc;

use crate::classify::{ErrorClassifier, FailureClass};
use crate::error::GenerationError;
use crate::pipeline::run::{Phase, RunTracker, SceneFailure};
use crate::provider::CredentialBroker;

pub const CREDENTIAL_NEEDED_MESSAGE: &str = "The selected API key cannot access the video model. \
Select an API key from a paid Google Cloud project and start a new run.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFailureAction {
    /// Record the failure and move to the next scene.
    Continue,
    /// Stop the video phase; the run ends as completed.
    Suspend,
}

/// Decides what a failed video job means for the run.
pub struct InterruptionHandler {
    classifier: ErrorClassifier,
    credentials: Arc<dyn CredentialBroker>,
}

impl InterruptionHandler {
    pub fn new(credentials: Arc<dyn CredentialBroker>) -> Self {
        Self {
            classifier: ErrorClassifier::default(),
            credentials,
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// `run_is_current` is false once the host has moved on to another run;
    /// such a run still suspends but no longer asks for a new credential.
    pub fn handle_video_failure(
        &self,
        tracker: &RunTracker,
        scene_index: usize,
        err: &GenerationError,
        run_is_current: bool,
    ) -> VideoFailureAction {
        match self.classifier.classify(err) {
            FailureClass::AccessDenied => {
                tracing::warn!(
                    run_id = %tracker.run_id(),
                    scene_index,
                    error = %err,
                    "video model not accessible with current api key; suspending run"
                );
                tracker.mark_credential_needed(CREDENTIAL_NEEDED_MESSAGE);
                if run_is_current {
                    self.credentials.request_credential();
                } else {
                    tracing::info!(
                        run_id = %tracker.run_id(),
                        "run was abandoned; credential request skipped"
                    );
                }
                VideoFailureAction::Suspend
            }
            FailureClass::Transient => {
                tracing::warn!(
                    run_id = %tracker.run_id(),
                    scene_index,
                    error = %err,
                    "video generation failed; skipping scene"
                );
                tracker.record_failure(SceneFailure {
                    phase: Phase::Videos,
                    scene_index,
                    message: err.to_string(),
                });
                VideoFailureAction::Continue
            }
        }
    }
}
