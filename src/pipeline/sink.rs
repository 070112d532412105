use std::sync::Mutex;

use uuid::Uuid;

use crate::formats::BookAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    Applied,
    /// The host no longer displays this run; the snapshot was dropped.
    Stale,
}

/// Receives a full snapshot after every successful per-scene job.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, run_id: Uuid, snapshot: &BookAnalysis) -> Publish;

    /// Whether `run_id` is still the run the host cares about.
    fn is_current(&self, _run_id: Uuid) -> bool {
        true
    }
}

/// The analysis currently on display, owned by the session's active run.
///
/// Only the active run may show or publish. [`SceneBoard::activate`] hands
/// the board to a new run and drops whatever was displayed, so a run that
/// was superseded mid-flight can never bring its scenes back.
#[derive(Debug, Default)]
pub struct SceneBoard {
    inner: Mutex<Board>,
}

#[derive(Debug, Default)]
struct Board {
    active: Option<Uuid>,
    displayed: Option<BookAnalysis>,
}

impl SceneBoard {
    pub fn activate(&self, run_id: Uuid) {
        let mut board = self.lock();
        board.active = Some(run_id);
        board.displayed = None;
    }

    /// Puts the initial scene list on display for the active run.
    pub fn show(&self, run_id: Uuid, analysis: BookAnalysis) -> Publish {
        let mut board = self.lock();
        if board.active != Some(run_id) {
            return Publish::Stale;
        }
        board.displayed = Some(analysis);
        Publish::Applied
    }

    pub fn clear(&self) {
        let mut board = self.lock();
        board.active = None;
        board.displayed = None;
    }

    pub fn current(&self) -> Option<BookAnalysis> {
        self.lock().displayed.clone()
    }

    pub fn current_run(&self) -> Option<Uuid> {
        self.lock().active
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Board> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressSink for SceneBoard {
    fn publish(&self, run_id: Uuid, snapshot: &BookAnalysis) -> Publish {
        let mut board = self.lock();
        if board.active != Some(run_id) || board.displayed.is_none() {
            return Publish::Stale;
        }
        board.displayed = Some(snapshot.clone());
        Publish::Applied
    }

    fn is_current(&self, run_id: Uuid) -> bool {
        self.lock().active == Some(run_id)
    }
}
