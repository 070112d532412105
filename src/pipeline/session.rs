use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::analysis;
use crate::classify::ErrorClassifier;
use crate::formats::BookAnalysis;
use crate::pipeline::driver::{PipelineDriver, UNEXPECTED_FAILURE_MESSAGE};
use crate::pipeline::interrupt::InterruptionHandler;
use crate::pipeline::run::{RunState, RunStatus, RunTracker};
use crate::pipeline::sink::{ProgressSink as _, Publish, SceneBoard};
use crate::provider::{Analyzer, CredentialBroker, Providers};

pub const NO_CREDENTIAL_MESSAGE: &str =
    "No API key is selected. Select an API key from a paid Google Cloud project to continue.";

pub const SUPERSEDED_MESSAGE: &str = "This run was replaced by a newer one.";

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: RunState,
    pub analysis: Option<BookAnalysis>,
}

enum RunInput {
    Text(String),
    Analysis(BookAnalysis),
}

/// Host-side facade: one active run at a time plus the displayed scenes.
///
/// Starting a run (or resetting) swaps in a fresh [`RunTracker`] and hands the
/// board to it. Work from an earlier run may still complete, but it can no
/// longer show or publish scenes, and its state is no longer reported.
pub struct Session {
    ctx: RunContext,
    current: Mutex<Arc<RunTracker>>,
}

#[derive(Clone)]
struct RunContext {
    analyzer: Arc<dyn Analyzer>,
    driver: Arc<PipelineDriver>,
    credentials: Arc<dyn CredentialBroker>,
    board: Arc<SceneBoard>,
    requires_credential: bool,
}

impl Session {
    pub fn new(providers: Providers, credentials: Arc<dyn CredentialBroker>) -> Self {
        Self::with_classifier(providers, credentials, ErrorClassifier::default())
    }

    pub fn with_classifier(
        providers: Providers,
        credentials: Arc<dyn CredentialBroker>,
        classifier: ErrorClassifier,
    ) -> Self {
        let interrupts =
            InterruptionHandler::new(Arc::clone(&credentials)).with_classifier(classifier);
        let driver = PipelineDriver::new(providers.images, providers.videos, interrupts);
        let tracker = Arc::new(RunTracker::new());
        let board = Arc::new(SceneBoard::default());
        board.activate(tracker.run_id());
        Self {
            ctx: RunContext {
                analyzer: providers.analyzer,
                driver: Arc::new(driver),
                credentials,
                board,
                requires_credential: providers.requires_credential,
            },
            current: Mutex::new(tracker),
        }
    }

    pub fn board(&self) -> Arc<SceneBoard> {
        Arc::clone(&self.ctx.board)
    }

    pub fn current(&self) -> Arc<RunTracker> {
        Arc::clone(&self.lock_current())
    }

    pub fn state(&self) -> RunState {
        self.current().state()
    }

    pub fn displayed(&self) -> Option<BookAnalysis> {
        self.ctx.board.current()
    }

    /// Clears the display and abandons the active run.
    pub fn reset(&self) -> Arc<RunTracker> {
        let tracker = Arc::new(RunTracker::new());
        let mut current = self.lock_current();
        self.ctx.board.activate(tracker.run_id());
        *current = Arc::clone(&tracker);
        drop(current);
        tracing::info!(run_id = %tracker.run_id(), "session reset");
        tracker
    }

    /// Starts analysis plus both phases in the background.
    pub fn start_text(&self, text: String) -> Arc<RunTracker> {
        self.spawn(RunInput::Text(text))
    }

    /// Starts both phases for an existing analysis in the background.
    pub fn start_analysis(&self, analysis: BookAnalysis) -> Arc<RunTracker> {
        self.spawn(RunInput::Analysis(analysis))
    }

    pub async fn run_text(&self, text: String) -> RunReport {
        let tracker = self.reset();
        self.ctx
            .clone()
            .supervise(Arc::clone(&tracker), RunInput::Text(text))
            .await
    }

    pub async fn run_analysis(&self, analysis: BookAnalysis) -> RunReport {
        let tracker = self.reset();
        self.ctx
            .clone()
            .supervise(Arc::clone(&tracker), RunInput::Analysis(analysis))
            .await
    }

    fn spawn(&self, input: RunInput) -> Arc<RunTracker> {
        let tracker = self.reset();
        let ctx = self.ctx.clone();
        let task_tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            ctx.supervise(task_tracker, input).await;
        });
        tracker
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Arc<RunTracker>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RunContext {
    /// Runs `input` on its own task so a panicking collaborator ends the run
    /// in `Error` instead of leaving it mid-phase.
    async fn supervise(self, tracker: Arc<RunTracker>, input: RunInput) -> RunReport {
        let task_tracker = Arc::clone(&tracker);
        let handle = tokio::spawn(async move { self.execute(&task_tracker, input).await });
        let analysis = match handle.await {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::error!(run_id = %tracker.run_id(), ?err, "run task aborted");
                tracker.fail(UNEXPECTED_FAILURE_MESSAGE);
                None
            }
        };
        RunReport {
            state: tracker.state(),
            analysis,
        }
    }

    async fn execute(&self, tracker: &RunTracker, input: RunInput) -> Option<BookAnalysis> {
        if self.requires_credential && !self.credentials.has_credential() {
            tracker.mark_credential_needed(NO_CREDENTIAL_MESSAGE);
            if self.board.is_current(tracker.run_id()) {
                self.credentials.request_credential();
            }
            tracker.fail(NO_CREDENTIAL_MESSAGE);
            return None;
        }

        let analysis = match input {
            RunInput::Text(text) => self.analyze(tracker, &text).await?,
            RunInput::Analysis(analysis) => {
                if let Err(err) = analysis::validate(&analysis) {
                    tracker.fail(format!("The analysis cannot be rendered: {err}"));
                    return None;
                }
                analysis.without_media()
            }
        };

        if self.board.show(tracker.run_id(), analysis.clone()) == Publish::Stale {
            tracing::info!(run_id = %tracker.run_id(), "run superseded before generation");
            tracker.fail(SUPERSEDED_MESSAGE);
            return Some(analysis);
        }
        Some(self.driver.run(tracker, analysis, self.board.as_ref()).await)
    }

    async fn analyze(&self, tracker: &RunTracker, text: &str) -> Option<BookAnalysis> {
        if let Err(err) = tracker.transition(RunStatus::Analyzing) {
            tracing::error!(run_id = %tracker.run_id(), ?err, "cannot start analysis");
            tracker.fail(UNEXPECTED_FAILURE_MESSAGE);
            return None;
        }

        match self.analyzer.analyze(text).await {
            Ok(analysis) => {
                tracing::info!(
                    run_id = %tracker.run_id(),
                    title = %analysis.title,
                    scenes = analysis.scenes.len(),
                    "book analyzed"
                );
                Some(analysis)
            }
            Err(err) => {
                tracker.fail(format!("Could not analyze the book: {err}"));
                None
            }
        }
    }
}
