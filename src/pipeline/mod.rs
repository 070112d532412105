//! Visual-generation orchestration: the image sweep, the video sweep, and the
//! run state that hosts observe while they proceed.

pub mod driver;
pub mod interrupt;
pub mod run;
pub mod session;
pub mod sink;

pub use driver::PipelineDriver;
pub use interrupt::{InterruptionHandler, VideoFailureAction};
pub use run::{Phase, RunState, RunStatus, RunTracker, SceneFailure};
pub use session::{RunReport, Session};
pub use sink::{ProgressSink, Publish, SceneBoard};
