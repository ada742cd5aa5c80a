//! Log replay
//!
//! Ingestion is a two-state machine (no active task / active task). [`step`]
//! is pure: it maps the current state and one event to the next state and at
//! most one [`Effect`], which [`apply`] then writes into the session.

use crate::action::Action;
use crate::error::AnalysisError;
use crate::eventlog::event::{EventKind, LogEvent};
use crate::session::{Session, TaskRef};
use serde::Serialize;
use tracing::{debug, info};

/// Ingestion cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestState {
    #[default]
    Idle,
    Active(TaskRef),
}

impl IngestState {
    pub fn active_task(&self) -> Option<TaskRef> {
        match self {
            IngestState::Idle => None,
            IngestState::Active(task) => Some(*task),
        }
    }
}

/// Session mutation produced by one event
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Session opened at `time`
    Opened { time: i64 },
    /// Task initialized: set its time and record a zero action
    Start {
        task: TaskRef,
        time: i64,
        channels: usize,
    },
    /// Append an action to the task
    Record { task: TaskRef, action: Action },
    /// Task solved at `time`
    Complete { task: TaskRef, time: i64 },
}

/// What happened to one event
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(Effect),
    /// Content did not match the expected pattern
    Skipped,
    /// Event type not used by ingestion
    Ignored,
}

/// Counts gathered while replaying a log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Events seen
    pub events: usize,
    /// Actions appended, including initial zero actions
    pub actions: usize,
    pub skipped: usize,
    pub ignored: usize,
}

/// Advance the state machine by one event without touching the session
pub fn step(
    session: &Session,
    state: IngestState,
    event: &LogEvent,
) -> Result<(IngestState, Outcome), AnalysisError> {
    match &event.kind {
        EventKind::Opened => {
            if event.content != session.name() {
                return Err(AnalysisError::SessionMismatch {
                    logged: event.content.clone(),
                    loaded: session.name().to_string(),
                });
            }
            Ok((state, Outcome::Applied(Effect::Opened { time: event.time })))
        }
        EventKind::Initialized => {
            let Some(init) = event.initialization() else {
                return Ok((state, Outcome::Skipped));
            };
            let task = session
                .find_task(&init.name)
                .ok_or_else(|| AnalysisError::UnknownProblem(init.name.clone()))?;
            Ok((
                IngestState::Active(task),
                Outcome::Applied(Effect::Start {
                    task,
                    time: event.time,
                    channels: init.target.len(),
                }),
            ))
        }
        EventKind::Updated => {
            let task = state
                .active_task()
                .ok_or(AnalysisError::TaskNotInitialized { time: event.time })?;
            let Some(update) = event.update() else {
                return Ok((state, Outcome::Skipped));
            };
            Ok((
                state,
                Outcome::Applied(Effect::Record {
                    task,
                    action: Action::new(event.time, update.input, update.output),
                }),
            ))
        }
        EventKind::Solved => {
            let task = state
                .active_task()
                .ok_or(AnalysisError::TaskNotInitialized { time: event.time })?;
            Ok((
                IngestState::Idle,
                Outcome::Applied(Effect::Complete {
                    task,
                    time: event.time,
                }),
            ))
        }
        EventKind::Other(_) => Ok((state, Outcome::Ignored)),
    }
}

/// Write an effect into the session
pub fn apply(session: &mut Session, effect: Effect) {
    match effect {
        Effect::Opened { time } => session.mark_opened(time),
        Effect::Start {
            task,
            time,
            channels,
        } => {
            if let Some(task) = session.task_mut(task) {
                task.start(time, channels);
            }
        }
        Effect::Record { task, action } => {
            if let Some(task) = session.task_mut(task) {
                task.record(action);
            }
        }
        Effect::Complete { task, time } => {
            if let Some(task) = session.task_mut(task) {
                task.mark_solved(time);
            }
        }
    }
}

/// Replay a full event stream into the session
pub fn ingest<'a, I>(session: &mut Session, events: I) -> Result<IngestSummary, AnalysisError>
where
    I: IntoIterator<Item = &'a LogEvent>,
{
    let mut state = IngestState::default();
    let mut summary = IngestSummary::default();

    for event in events {
        summary.events += 1;
        let (next, outcome) = step(session, state, event)?;
        match outcome {
            Outcome::Applied(effect) => {
                debug!(time = event.time, kind = event.kind.as_str(), "applying event");
                if matches!(effect, Effect::Start { .. } | Effect::Record { .. }) {
                    summary.actions += 1;
                }
                apply(session, effect);
            }
            Outcome::Skipped => {
                debug!(time = event.time, content = %event.content, "skipping unmatched content");
                summary.skipped += 1;
            }
            Outcome::Ignored => summary.ignored += 1,
        }
        state = next;
    }

    info!(
        session = session.name(),
        events = summary.events,
        actions = summary.actions,
        skipped = summary.skipped,
        "log replay complete"
    );
    Ok(summary)
}
