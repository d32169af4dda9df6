//! Tasks, their state machine's closed state/event sets, and sync points.

use serde::{Deserialize, Serialize};

use crate::capability::{Capabilities, Requirements};
use crate::location::Location;

/// Closed set of task states. Initial is [`TaskState::Undefined`]; terminal
/// (absorbing unless reset) are [`TaskState::Completed`] and
/// [`TaskState::Failure`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    #[default]
    #[serde(rename = "UNDEFINED")]
    Undefined,
    #[serde(rename = "AVAILABLE")]
    Available,
    #[serde(rename = "PLANNED")]
    Planned,
    #[serde(rename = "QUEUED")]
    Queued,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILURE")]
    Failure,
}

impl TaskState {
    /// Total order used to decide whether a state is "at least as
    /// advanced" as another, for cascading enablement.
    fn rank(self) -> u8 {
        match self {
            TaskState::Undefined => 0,
            TaskState::Available => 1,
            TaskState::Planned => 2,
            TaskState::Queued => 3,
            TaskState::Running => 4,
            TaskState::Completed => 5,
            TaskState::Failure => 5,
        }
    }

    pub fn is_at_least(self, other: TaskState) -> bool {
        self.rank() >= other.rank()
    }
}

/// Closed set of task events.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TaskEvent {
    #[serde(rename = "PLAN")]
    Plan,
    #[serde(rename = "ACCEPT")]
    Accept,
    #[serde(rename = "START")]
    Start,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "RESOLVED")]
    Resolved,
}

/// A time window in caller-defined units (seconds, ticks, ...), sourced from
/// the original `RequirementTime("time_window", start, end)` constructor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

/// One unit of planning: id, requirements, location, optional time window
/// and state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub local_id: String,
    pub name: String,
    pub state: TaskState,
    pub requirements: Requirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
}

impl Task {
    pub fn new(local_id: impl Into<String>, name: impl Into<String>) -> Self {
        let local_id = local_id.into();
        Self {
            id: local_id.clone(),
            local_id,
            name: name.into(),
            state: TaskState::Undefined,
            requirements: Requirements::new(),
            location: None,
            time_window: None,
        }
    }

    pub fn requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn time_window(mut self, start: i64, end: i64) -> Self {
        self.time_window = Some(TimeWindow { start, end });
        self
    }

    /// A sync point: empty requirements, used solely to join DAG branches.
    pub fn sync_point(local_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(local_id, name)
    }

    pub fn set_state(&mut self, state: TaskState) {
        tracing::debug!(task = %self.id, from = ?self.state, to = ?state, "task state change");
        self.state = state;
    }

    pub fn in_state(&self, state: TaskState) -> bool {
        self.state == state
    }

    pub fn has_requirement(&self, name: &str) -> bool {
        self.requirements.contains(name)
    }

    /// True iff `capabilities` satisfy this task's requirements.
    pub fn meet_capabilities(&self, capabilities: &Capabilities) -> bool {
        self.requirements.meet(capabilities)
    }
}
