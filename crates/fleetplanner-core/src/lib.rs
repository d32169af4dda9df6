//! Domain model shared by the fleet planning core: capability algebra,
//! locations and their graph layer, and the task/DAG model.
//!
//! This crate has no dependency on the Board or the Optimizer: every other
//! crate in the workspace builds on it, and it never depends back.

pub mod capability;
pub mod dag;
pub mod graph;
pub mod location;
pub mod task;

pub use capability::{Capabilities, Capability, CapabilityBag, CapabilityError, Requirement, Requirements};
pub use dag::{Dag, DagError, DagJson};
pub use graph::Subgraph;
pub use location::{GeodesicModel, GraphArena, GraphRef, Location, LocationError, NodeGraph, NodeIndex, Norm, PlanningContext, Wgs84Haversine};
pub use task::{Task, TaskEvent, TaskState, TimeWindow};
