//! The Problem Graph Builder (C5): augments a DAG with non-reachability
//! edges so the Route Optimizer can model a worker traversing between
//! unrelated tasks directly.

use std::collections::HashMap;

use fleetplanner_core::dag::Dag;

/// Dense integer-indexed graph derived from a [`Dag`]. `precedence_edges`
/// are the DAG's own edges (renumbered); `edges` is the full problem graph
/// `G'` (precedence edges plus the non-reachability augmentation).
#[derive(Clone, Debug, Default)]
pub struct ProblemGraph {
    /// Index -> DAG task id. Index 0..n-1 covers the DAG's own nodes;
    /// synthetic source/sink sync points (inserted when a DAG has more
    /// than one root or sink) are appended after them.
    pub nodes: Vec<String>,
    pub precedence_edges: Vec<(usize, usize)>,
    pub edges: Vec<(usize, usize)>,
    pub start: usize,
    pub end: usize,
}

impl ProblemGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn index_of(&self, task_id: &str) -> Option<usize> {
        self.nodes.iter().position(|id| id == task_id)
    }
}

const SYNTHETIC_SOURCE: &str = "__source__";
const SYNTHETIC_SINK: &str = "__sink__";

/// Build the problem graph for `dag`.
///
/// For every node `u`, add an edge `(u, v)` for every `v` not in
/// `ancestors(u) ∪ descendants(u) ∪ {u}`. If the DAG has more than one root
/// or sink, synthetic source/sink sync points are inserted so the optimizer
/// still has a unique `(start, end)` pair.
pub fn build_problem_graph(dag: &Dag) -> ProblemGraph {
    let mut ids: Vec<String> = dag.tasks().keys().cloned().collect();
    ids.sort();

    let mut index_of: HashMap<String, usize> = HashMap::new();
    for (i, id) in ids.iter().enumerate() {
        index_of.insert(id.clone(), i);
    }

    let mut precedence_edges = Vec::new();
    for (u, v) in dag.edges() {
        precedence_edges.push((index_of[&u], index_of[&v]));
    }

    let mut edges = precedence_edges.clone();
    for u in &ids {
        let ancestors = dag.ancestors(u);
        let descendants = dag.descendants(u);
        let ui = index_of[u];
        for v in &ids {
            if v == u || ancestors.contains(v) || descendants.contains(v) {
                continue;
            }
            edges.push((ui, index_of[v]));
        }
    }

    let mut roots: Vec<String> = dag.roots().into_iter().map(|t| t.id.clone()).collect();
    roots.sort();
    let mut sinks: Vec<String> = dag.sinks().into_iter().map(|t| t.id.clone()).collect();
    sinks.sort();

    let mut nodes = ids;
    let start = if roots.len() == 1 {
        index_of[&roots[0]]
    } else {
        let source_index = nodes.len();
        nodes.push(SYNTHETIC_SOURCE.to_string());
        for root in &roots {
            edges.push((source_index, index_of[root]));
            precedence_edges.push((source_index, index_of[root]));
        }
        source_index
    };
    let end = if sinks.len() == 1 {
        index_of[&sinks[0]]
    } else {
        let sink_index = nodes.len();
        nodes.push(SYNTHETIC_SINK.to_string());
        for sink in &sinks {
            edges.push((index_of[sink], sink_index));
            precedence_edges.push((index_of[sink], sink_index));
        }
        sink_index
    };

    ProblemGraph { nodes, precedence_edges, edges, start, end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetplanner_core::dag::Dag;
    use fleetplanner_core::task::Task;

    fn linear_dag(n: usize) -> Dag {
        let mut dag = Dag::new("d1");
        let ids: Vec<String> = (0..n).map(|i| dag.add_task(Task::new(format!("t{i}"), format!("task {i}")))).collect();
        for pair in ids.windows(2) {
            dag.set_downstream(&pair[0], &pair[1]).unwrap();
        }
        dag
    }

    #[test]
    fn invariant_3_edge_count_formula() {
        let dag = linear_dag(5);
        let graph = build_problem_graph(&dag);

        let e = dag.edges().len();
        let v = dag.tasks().len();
        let mut expected = e;
        for id in dag.tasks().keys() {
            let a = dag.ancestors(id).len();
            let d = dag.descendants(id).len();
            expected += v - a - d - 1;
        }

        assert_eq!(graph.edges.len(), expected);
    }

    #[test]
    fn single_root_and_sink_are_used_directly() {
        let dag = linear_dag(4);
        let graph = build_problem_graph(&dag);
        assert_eq!(graph.nodes[graph.start], "d1/t0");
        assert_eq!(graph.nodes[graph.end], "d1/t3");
    }

    #[test]
    fn multi_root_dag_gets_synthetic_source_and_sink() {
        let mut dag = Dag::new("d1");
        let a = dag.add_task(Task::new("a", "a"));
        let b = dag.add_task(Task::new("b", "b"));
        let c = dag.add_task(Task::new("c", "c"));
        dag.set_downstream(&a, &c).unwrap();
        dag.set_downstream(&b, &c).unwrap();
        // a, b are both roots; c is the only sink.
        let graph = build_problem_graph(&dag);
        assert_eq!(graph.nodes[graph.start], SYNTHETIC_SOURCE);
        assert_eq!(graph.nodes[graph.end], "d1/c");
    }
}
