//! Problem Graph Builder and Route Optimizer: turns a DAG into a dense
//! routing problem and solves it within a wall-clock budget.

pub mod optimizer;
pub mod problem_graph;

pub use optimizer::{
    CapacityConstraint, Dimension, DimensionError, NodeDimensionMeta, PairwiseConstraint, RouteMeta, RouteOptimizer,
    RouteSolution, DEFAULT_DROP_PENALTY, SENTINEL_COST,
};
pub use problem_graph::{build_problem_graph, ProblemGraph};
