use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Analyzing,
    GeneratingImages,
    GeneratingVideos,
    Completed,
    Error,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use RunStatus::*;

        match (self, next) {
            (from, Error) => !from.is_terminal(),
            (Idle, Analyzing)
            | (Idle, GeneratingImages)
            | (Analyzing, GeneratingImages)
            | (GeneratingImages, GeneratingVideos)
            | (GeneratingVideos, Completed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Images,
    Videos,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SceneFailure {
    pub phase: Phase,
    pub scene_index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Last user-visible error or banner text.
    pub message: Option<String>,
    pub credential_needed: bool,
    pub failures: Vec<SceneFailure>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunState {
    fn idle(run_id: Uuid) -> Self {
        Self {
            run_id,
            status: RunStatus::Idle,
            message: None,
            credential_needed: false,
            failures: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Owns the state of one run and broadcasts every change to subscribers.
#[derive(Debug)]
pub struct RunTracker {
    state: watch::Sender<RunState>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        let (state, _) = watch::channel(RunState::idle(Uuid::new_v4()));
        Self { state }
    }

    pub fn run_id(&self) -> Uuid {
        self.state.borrow().run_id
    }

    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> RunStatus {
        self.state.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    pub fn transition(&self, next: RunStatus) -> anyhow::Result<()> {
        let mut result = Ok(());
        self.state.send_modify(|state| {
            if !state.status.can_transition_to(next) {
                result = Err(anyhow::anyhow!(
                    "illegal run transition: {:?} -> {:?}",
                    state.status,
                    next
                ));
                return;
            }
            let now = Utc::now();
            state.status = next;
            if state.started_at.is_none() {
                state.started_at = Some(now);
            }
            if next.is_terminal() {
                state.finished_at = Some(now);
            }
        });
        if result.is_ok() {
            tracing::info!(run_id = %self.run_id(), status = ?next, "run status");
        }
        result
    }

    pub fn record_failure(&self, failure: SceneFailure) {
        self.state.send_modify(|state| state.failures.push(failure));
    }

    pub fn mark_credential_needed(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.send_modify(|state| {
            state.credential_needed = true;
            state.message = Some(message);
        });
    }

    /// Moves the run to `Error` with a user-visible message. A run that already
    /// reached a terminal state keeps it.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        let mut applied = false;
        self.state.send_modify(|state| {
            if state.status.is_terminal() {
                return;
            }
            let now = Utc::now();
            state.status = RunStatus::Error;
            state.message = Some(message.clone());
            state.started_at.get_or_insert(now);
            state.finished_at = Some(now);
            applied = true;
        });
        if applied {
            tracing::error!(run_id = %self.run_id(), message = %message, "run failed");
        } else {
            tracing::warn!(
                run_id = %self.run_id(),
                message = %message,
                "run already finished; failure ignored"
            );
        }
    }

    pub async fn wait_terminal(&self) -> RunState {
        let mut rx = self.subscribe();
        match rx.wait_for(|state| state.status.is_terminal()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() -> anyhow::Result<()> {
        let tracker = RunTracker::new();
        tracker.transition(RunStatus::Analyzing)?;
        tracker.transition(RunStatus::GeneratingImages)?;
        tracker.transition(RunStatus::GeneratingVideos)?;
        tracker.transition(RunStatus::Completed)?;

        let state = tracker.state();
        assert_eq!(state.status, RunStatus::Completed);
        assert!(state.started_at.is_some());
        assert!(state.finished_at.is_some());
        Ok(())
    }

    #[test]
    fn rejects_skipping_phases_and_leaving_terminal_states() {
        let tracker = RunTracker::new();
        assert!(tracker.transition(RunStatus::GeneratingVideos).is_err());
        assert_eq!(tracker.status(), RunStatus::Idle);

        assert!(!RunStatus::Completed.can_transition_to(RunStatus::Error));
        assert!(!RunStatus::Error.can_transition_to(RunStatus::Analyzing));
        assert!(!RunStatus::GeneratingImages.can_transition_to(RunStatus::Completed));
    }

    #[test]
    fn error_is_reachable_from_every_running_state() {
        for status in [
            RunStatus::Idle,
            RunStatus::Analyzing,
            RunStatus::GeneratingImages,
            RunStatus::GeneratingVideos,
        ] {
            assert!(status.can_transition_to(RunStatus::Error), "{status:?}");
        }
    }

    #[test]
    fn fail_does_not_override_completed() -> anyhow::Result<()> {
        let tracker = RunTracker::new();
        tracker.transition(RunStatus::GeneratingImages)?;
        tracker.transition(RunStatus::GeneratingVideos)?;
        tracker.transition(RunStatus::Completed)?;

        tracker.fail("late failure");

        let state = tracker.state();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.message, None);
        Ok(())
    }

    #[tokio::test]
    async fn subscribers_observe_terminal_state() -> anyhow::Result<()> {
        let tracker = std::sync::Arc::new(RunTracker::new());
        let waiter = {
            let tracker = std::sync::Arc::clone(&tracker);
            tokio::spawn(async move { tracker.wait_terminal().await })
        };

        tracker.transition(RunStatus::Analyzing)?;
        tracker.fail("analysis failed");

        let state = waiter.await?;
        assert_eq!(state.status, RunStatus::Error);
        assert_eq!(state.message.as_deref(), Some("analysis failed"));
        Ok(())
    }
}
