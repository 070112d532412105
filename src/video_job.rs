//! Long-running video generation as an explicit state machine.
//!
//! A job is submitted once and then polled at a fixed interval until the
//! provider reports it done or failed:
//!
//! ```text
//! Submitted -> Polling -> Done
//!                      -> Failed
//! ```
//!
//! Sleeping goes through [`Sleeper`] so tests can drive the machine without
//! real delays.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::provider::VideoGenerator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Done { video_uri: String },
}

/// Submit/poll half of a long-running video provider.
#[async_trait]
pub trait VideoOperations: Send + Sync {
    async fn submit(&self, prompt: &str) -> Result<OperationHandle, GenerationError>;
    async fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, GenerationError>;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// `None` polls until the provider finishes.
    pub max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoJobState {
    Submitted(OperationHandle),
    Polling {
        handle: OperationHandle,
        attempts: u32,
    },
    Done(String),
    Failed(GenerationError),
}

impl VideoJobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

pub struct VideoJob<'a> {
    ops: &'a dyn VideoOperations,
    sleeper: &'a dyn Sleeper,
    config: &'a PollConfig,
}

impl<'a> VideoJob<'a> {
    pub fn new(
        ops: &'a dyn VideoOperations,
        sleeper: &'a dyn Sleeper,
        config: &'a PollConfig,
    ) -> Self {
        Self {
            ops,
            sleeper,
            config,
        }
    }

    pub async fn submit(&self, prompt: &str) -> VideoJobState {
        match self.ops.submit(prompt).await {
            Ok(handle) => {
                tracing::debug!(operation = %handle.name, "video job submitted");
                VideoJobState::Submitted(handle)
            }
            Err(err) => VideoJobState::Failed(err),
        }
    }

    /// Advances the job by one transition. Terminal states are returned as is.
    pub async fn step(&self, state: VideoJobState) -> VideoJobState {
        match state {
            VideoJobState::Submitted(handle) => VideoJobState::Polling {
                handle,
                attempts: 0,
            },
            VideoJobState::Polling { handle, attempts } => {
                if let Some(max) = self.config.max_attempts
                    && attempts >= max
                {
                    tracing::warn!(operation = %handle.name, attempts, "video job gave up");
                    return VideoJobState::Failed(GenerationError::new(format!(
                        "video operation did not finish after {attempts} polls"
                    )));
                }

                self.sleeper.sleep(self.config.interval).await;
                match self.ops.poll(&handle).await {
                    Ok(OperationStatus::Pending) => {
                        tracing::debug!(
                            operation = %handle.name,
                            attempt = attempts + 1,
                            "video job still running"
                        );
                        VideoJobState::Polling {
                            handle,
                            attempts: attempts + 1,
                        }
                    }
                    Ok(OperationStatus::Done { video_uri }) => VideoJobState::Done(video_uri),
                    Err(err) => VideoJobState::Failed(err),
                }
            }
            terminal => terminal,
        }
    }

    pub async fn run(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut state = self.submit(prompt).await;
        while !state.is_terminal() {
            state = self.step(state).await;
        }
        match state {
            VideoJobState::Done(uri) => Ok(uri),
            VideoJobState::Failed(err) => Err(err),
            VideoJobState::Submitted(_) | VideoJobState::Polling { .. } => Err(
                GenerationError::new("video job stopped before reaching a terminal state"),
            ),
        }
    }
}

/// [`VideoGenerator`] that runs a [`VideoJob`] per call.
pub struct PolledVideoGenerator {
    ops: Arc<dyn VideoOperations>,
    sleeper: Arc<dyn Sleeper>,
    config: PollConfig,
}

impl PolledVideoGenerator {
    pub fn new(
        ops: Arc<dyn VideoOperations>,
        sleeper: Arc<dyn Sleeper>,
        config: PollConfig,
    ) -> Self {
        Self {
            ops,
            sleeper,
            config,
        }
    }
}

#[async_trait]
impl VideoGenerator for PolledVideoGenerator {
    async fn generate_video(&self, prompt: &str) -> Result<String, GenerationError> {
        VideoJob::new(self.ops.as_ref(), self.sleeper.as_ref(), &self.config)
            .run(prompt)
            .await
    }
}
