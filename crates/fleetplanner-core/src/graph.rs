//! Induced-subgraph value type returned by the Process Board's
//! `get_subgraph` query: an owned snapshot of tasks and
//! edges, not a view into a live [`crate::dag::Dag`].

use crate::task::Task;

/// Nodes and edges restricted to a computed task set, owned independently
/// of the source DAG. The Python original returns a `networkx` subgraph
/// view; we return an owned value since Rust has no equivalent zero-copy
/// view without borrowing the whole board.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subgraph {
    pub tasks: Vec<Task>,
    pub edges: Vec<(String, String)>,
}

impl Subgraph {
    pub fn new(tasks: Vec<Task>, edges: Vec<(String, String)>) -> Self {
        Self { tasks, edges }
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.id.as_str())
    }
}

pub use crate::location::LocationError;
