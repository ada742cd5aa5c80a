//! Experiment event logs
//!
//! Parses the manager's `time,eventType,content` log and replays it into a
//! session's tasks.

mod event;
mod replay;

pub use event::*;
pub use replay::*;
