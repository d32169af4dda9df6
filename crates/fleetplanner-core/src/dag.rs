//! DAGs of [`Task`]s with precedence edges, and their JSON wire form.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::Task;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DagError {
    #[error("edge {0} -> {1} would create a cycle")]
    Cyclic(String, String),
    #[error("task id {0} is not a node of this DAG")]
    UnknownTask(String),
}

/// A directed acyclic graph of tasks. Invariants: acyclic, every edge
/// endpoint is a node, tasks are owned by exactly one DAG.
#[derive(Clone, Debug, Default)]
pub struct Dag {
    pub id: String,
    pub name: String,
    tasks: HashMap<String, Task>,
    // adjacency in insertion order so DFS/topological output is deterministic
    downstream: HashMap<String, Vec<String>>,
    upstream: HashMap<String, Vec<String>>,
}

impl Dag {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { id: name.clone(), name, ..Default::default() }
    }

    /// Add `task` to the DAG, rewriting `task.id` to `{dag.id}/{local_id}`.
    pub fn add_task(&mut self, mut task: Task) -> String {
        task.id = format!("{}/{}", self.id, task.local_id);
        let id = task.id.clone();
        self.downstream.entry(id.clone()).or_default();
        self.upstream.entry(id.clone()).or_default();
        self.tasks.insert(id.clone(), task);
        id
    }

    pub fn tasks(&self) -> &HashMap<String, Task> {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    /// Add a precedence edge `upstream -> downstream`. Rejected if it would
    /// create a cycle.
    pub fn set_downstream(&mut self, upstream: &str, downstream: &str) -> Result<(), DagError> {
        if !self.tasks.contains_key(upstream) {
            return Err(DagError::UnknownTask(upstream.to_string()));
        }
        if !self.tasks.contains_key(downstream) {
            return Err(DagError::UnknownTask(downstream.to_string()));
        }
        if upstream == downstream || self.has_path(downstream, upstream) {
            return Err(DagError::Cyclic(upstream.to_string(), downstream.to_string()));
        }

        self.downstream.entry(upstream.to_string()).or_default().push(downstream.to_string());
        self.upstream.entry(downstream.to_string()).or_default().push(upstream.to_string());
        Ok(())
    }

    pub fn downstream(&self, task_id: &str) -> &[String] {
        self.downstream.get(task_id).map_or(&[], Vec::as_slice)
    }

    pub fn upstream(&self, task_id: &str) -> &[String] {
        self.upstream.get(task_id).map_or(&[], Vec::as_slice)
    }

    /// Nodes with zero in-degree.
    pub fn roots(&self) -> Vec<&Task> {
        self.tasks
            .keys()
            .filter(|id| self.upstream.get(*id).map_or(true, Vec::is_empty))
            .filter_map(|id| self.tasks.get(id))
            .collect()
    }

    /// Nodes with zero out-degree.
    pub fn sinks(&self) -> Vec<&Task> {
        self.tasks
            .keys()
            .filter(|id| self.downstream.get(*id).map_or(true, Vec::is_empty))
            .filter_map(|id| self.tasks.get(id))
            .collect()
    }

    pub fn edges(&self) -> Vec<(String, String)> {
        let mut result = Vec::new();
        for (u, successors) in &self.downstream {
            for v in successors {
                result.push((u.clone(), v.clone()));
            }
        }
        result
    }

    fn has_path(&self, from: &str, to: &str) -> bool {
        self.ancestors_or_descendants(from, &self.downstream).contains(to)
    }

    /// All nodes reachable downstream from `task_id`, exclusive.
    pub fn descendants(&self, task_id: &str) -> HashSet<String> {
        self.ancestors_or_descendants(task_id, &self.downstream)
    }

    /// All nodes that can reach `task_id`, exclusive.
    pub fn ancestors(&self, task_id: &str) -> HashSet<String> {
        self.ancestors_or_descendants(task_id, &self.upstream)
    }

    fn ancestors_or_descendants(&self, start: &str, adjacency: &HashMap<String, Vec<String>>) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.to_string());
        while let Some(node) = queue.pop_front() {
            if let Some(neighbors) = adjacency.get(&node) {
                for next in neighbors {
                    if seen.insert(next.clone()) {
                        queue.push_back(next.clone());
                    }
                }
            }
        }
        seen
    }

    pub fn to_dict(&self) -> DagJson {
        let mut nodes: Vec<_> = self.tasks.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges = self.edges();
        edges.sort();
        DagJson { name: self.name.clone(), nodes, edges }
    }

    pub fn from_dict(value: DagJson) -> Result<Self, DagError> {
        let mut dag = Dag::new(value.name);
        dag.id = dag.name.clone();

        for task in value.nodes {
            let id = task.id.clone();
            dag.downstream.entry(id.clone()).or_default();
            dag.upstream.entry(id.clone()).or_default();
            dag.tasks.insert(id, task);
        }

        for (u, v) in value.edges {
            dag.set_downstream(&u, &v)?;
        }

        Ok(dag)
    }
}

/// DAG JSON wire form: `{name, nodes:[task_json], edges:[[u_id, v_id]]}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DagJson {
    pub name: String,
    pub nodes: Vec<Task>,
    pub edges: Vec<(String, String)>,
}
