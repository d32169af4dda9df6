//! The Process Board: holds active DAGs, runs the task state machine, and
//! answers capability-constrained reachability queries.

use std::collections::HashMap;

use fleetplanner_core::capability::{Capabilities, Requirements};
use fleetplanner_core::dag::Dag;
use fleetplanner_core::graph::Subgraph;
use fleetplanner_core::task::{Task, TaskEvent, TaskState};
use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoardError {
    #[error("task {0} is not in any board DAG")]
    TaskNotFound(String),
}

/// Legal `(from, event) -> to` transitions. Absent pairs are
/// not an error: `event_input` leaves the state unchanged and logs a
/// warning.
fn transition(state: TaskState, event: TaskEvent) -> Option<TaskState> {
    use TaskEvent as E;
    use TaskState as S;
    match (state, event) {
        (S::Available, E::Plan) => Some(S::Planned),
        (S::Planned, E::Accept) => Some(S::Queued),
        (S::Queued, E::Start) => Some(S::Running),
        (S::Running, E::Completed) => Some(S::Completed),
        (S::Running, E::Error) => Some(S::Failure),
        (S::Failure, E::Resolved) => Some(S::Planned),
        _ => None,
    }
}

/// Ordered collection of active DAGs, plus the state machine and queries
/// layered on top of it.
///
/// Wrapped in a [`parking_lot::RwLock`]: a single writer lock, with
/// concurrent readers permitted only while no mutating event is in flight.
#[derive(Default)]
pub struct Board {
    dags: RwLock<Vec<Dag>>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `dag`; every root of `dag` becomes `AVAILABLE`.
    pub fn execute(&self, mut dag: Dag) -> String {
        let root_ids: Vec<String> = dag.roots().into_iter().map(|t| t.id.clone()).collect();
        for id in root_ids {
            if let Some(task) = dag.task_mut(&id) {
                task.set_state(TaskState::Available);
            }
        }
        let id = dag.id.clone();
        self.dags.write().push(dag);
        id
    }

    pub fn dag_count(&self) -> usize {
        self.dags.read().len()
    }

    pub fn dag_ids(&self) -> Vec<String> {
        self.dags.read().iter().map(|d| d.id.clone()).collect()
    }

    /// Union of tasks across every DAG, keyed by task id.
    pub fn tasks(&self) -> HashMap<String, Task> {
        let dags = self.dags.read();
        dags.iter().flat_map(|d| d.tasks().values().cloned().map(|t| (t.id.clone(), t))).collect()
    }

    /// `(Task, dag_id)` for `task_id`. Errors with [`BoardError::TaskNotFound`]
    /// if no DAG on the board owns it.
    pub fn task_by_id(&self, task_id: &str) -> Result<(Task, String), BoardError> {
        let dags = self.dags.read();
        for dag in dags.iter() {
            if let Some(task) = dag.task(task_id) {
                return Ok((task.clone(), dag.id.clone()));
            }
        }
        Err(BoardError::TaskNotFound(task_id.to_string()))
    }

    /// Apply `event` to `task_id`. Unknown task ids and illegal
    /// `(state, event)` pairs are local and recoverable: they
    /// are logged and otherwise have no effect.
    pub fn event_input(&self, task_id: &str, event: TaskEvent) {
        let mut dags = self.dags.write();
        let Some(dag_index) = dags.iter().position(|d| d.task(task_id).is_some()) else {
            tracing::warn!(task = task_id, "event_input: task not found on board");
            return;
        };

        let current_state = dags[dag_index].task(task_id).unwrap().state;
        let Some(next_state) = transition(current_state, event) else {
            tracing::warn!(task = task_id, state = ?current_state, event = ?event, "event_input: no transition for (state, event)");
            return;
        };

        dags[dag_index].task_mut(task_id).unwrap().set_state(next_state);

        if current_state == TaskState::Running && next_state == TaskState::Completed {
            self.cascade_enable(&mut dags[dag_index], task_id);
        }
    }

    /// On `RUNNING -> COMPLETED`, every direct successor whose state is not
    /// already at least `AVAILABLE`-advanced becomes `AVAILABLE`. A
    /// successor already `PLANNED` or later is left untouched.
    fn cascade_enable(&self, dag: &mut Dag, task_id: &str) {
        let successors: Vec<String> = dag.downstream(task_id).to_vec();
        for successor_id in successors {
            if let Some(successor) = dag.task_mut(&successor_id) {
                if !successor.state.is_at_least(TaskState::Planned) {
                    successor.set_state(TaskState::Available);
                }
            }
        }
    }

    /// All `AVAILABLE` tasks, optionally filtered by `meet_capabilities`.
    pub fn get_openlist(&self, capabilities: Option<&Capabilities>) -> Vec<Task> {
        let dags = self.dags.read();
        dags.iter()
            .flat_map(|d| d.tasks().values())
            .filter(|t| t.in_state(TaskState::Available))
            .filter(|t| capabilities.map_or(true, |caps| t.meet_capabilities(caps)))
            .cloned()
            .collect()
    }

    /// Enumerate DAG paths from open tasks. With `capabilities`, truncate
    /// each path at the last prefix whose summed requirements still
    /// satisfy `capabilities`.
    pub fn get_tasklists(&self, capabilities: Option<&Capabilities>) -> Vec<Vec<Task>> {
        let dags = self.dags.read();
        let mut result = Vec::new();

        for dag in dags.iter() {
            for open_task in dag.tasks().values().filter(|t| t.in_state(TaskState::Available)) {
                let mut paths = Vec::new();
                Self::collect_paths(dag, &open_task.id, capabilities, Vec::new(), Requirements::new(), &mut paths);
                result.extend(paths);
            }
        }
        result
    }

    fn collect_paths(
        dag: &Dag,
        node_id: &str,
        capabilities: Option<&Capabilities>,
        path_so_far: Vec<Task>,
        accumulated: Requirements,
        out: &mut Vec<Vec<Task>>,
    ) {
        let Some(task) = dag.task(node_id) else { return };

        let mut tentative = accumulated.clone();
        for req in task.requirements.iter() {
            tentative.add(req.clone());
        }

        if let Some(caps) = capabilities {
            if !tentative.meet(caps) {
                if !path_so_far.is_empty() {
                    out.push(path_so_far);
                }
                return;
            }
        }

        let mut extended = path_so_far;
        extended.push(task.clone());

        let successors = dag.downstream(node_id);
        if successors.is_empty() {
            out.push(extended);
            return;
        }

        for successor_id in successors {
            Self::collect_paths(dag, successor_id, capabilities, extended.clone(), tentative.clone(), out);
        }
    }

    /// The induced subgraph over the union of tasks returned by
    /// `get_tasklists(capabilities)`.
    pub fn get_subgraph(&self, capabilities: Option<&Capabilities>) -> Subgraph {
        let tasklists = self.get_tasklists(capabilities);
        let dags = self.dags.read();

        let mut seen = HashMap::new();
        for path in &tasklists {
            for task in path {
                seen.entry(task.id.clone()).or_insert_with(|| task.clone());
            }
        }

        let mut edges = Vec::new();
        for dag in dags.iter() {
            for (u, v) in dag.edges() {
                if seen.contains_key(&u) && seen.contains_key(&v) {
                    edges.push((u, v));
                }
            }
        }
        edges.sort();

        let mut tasks: Vec<Task> = seen.into_values().collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));

        Subgraph::new(tasks, edges)
    }
}
