//! Upload orchestration
//!
//! Builds the multipart payload for a [`Submission`], ships it to the backend
//! and keeps the user informed with simulated progress and toasts while the
//! backend computes the whole matrix synchronously.

mod orchestrator;
mod payload;
mod progress;

pub use orchestrator::submit;
pub use payload::Submission;
pub use progress::{JobProgress, JobStatus, ProgressSink};
