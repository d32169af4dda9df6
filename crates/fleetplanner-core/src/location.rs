//! Locations, distance/path queries and the graph arena they run over.
//!
//! A [`Location`] is a tagged value type. The three "pure" variants
//! (`Cartesian`, `Geodesic`, `Zero`) compute distance from their own fields.
//! The two graph-backed variants (`GraphNode`, `LayeredGraphNode`) hold
//! integer indices into a [`GraphArena`] owned by the caller (the Board or
//! the Optimizer) rather than a reference to the graph itself, avoiding
//! cyclic ownership between locations and the graphs they point into — so
//! every graph-backed query takes a [`PlanningContext`] alongside `self`.

use std::cell::RefCell;
use std::collections::{BinaryHeap, HashMap};
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving a location or a graph reference.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocationError {
    #[error("unknown location type tag {0:?}")]
    UnknownType(String),
    #[error("graph reference {0} does not exist in this arena")]
    UnknownGraph(GraphRef),
    #[error("node {0} does not exist in graph {1}")]
    UnknownNode(NodeIndex, GraphRef),
}

/// Norm used by [`Location::Cartesian`] distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Norm {
    #[default]
    Euclidean,
    Manhattan,
}

impl Norm {
    fn apply(self, dx: f64, dy: f64) -> f64 {
        match self {
            Norm::Euclidean => (dx * dx + dy * dy).sqrt(),
            Norm::Manhattan => dx.abs() + dy.abs(),
        }
    }
}

/// Index of a [`NodeGraph`] inside a [`GraphArena`].
pub type GraphRef = usize;
/// Index of a node inside a particular [`NodeGraph`].
pub type NodeIndex = usize;

/// A location, tagged by variant. See module docs for the graph-backed
/// variants' indirection through [`PlanningContext`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Location {
    #[serde(rename = "cartesian")]
    Cartesian {
        x: f64,
        y: f64,
        #[serde(default)]
        z: Option<f64>,
        #[serde(default)]
        norm: Norm,
    },
    #[serde(rename = "gps")]
    Geodesic {
        #[serde(rename = "lat")]
        lat: f64,
        #[serde(rename = "lon")]
        lon: f64,
        #[serde(default, rename = "alt")]
        alt: Option<f64>,
    },
    #[serde(rename = "zero")]
    Zero,
    #[serde(rename = "nx")]
    GraphNode { base_graph_ref: GraphRef, selector: NodeIndex },
    #[serde(rename = "nx_layer")]
    LayeredGraphNode {
        layer_id: NodeIndex,
        base_id: NodeIndex,
        layer_graph_ref: GraphRef,
        base_graph_ref: GraphRef,
    },
}

impl Location {
    pub fn cartesian(x: f64, y: f64) -> Self {
        Location::Cartesian { x, y, z: None, norm: Norm::default() }
    }

    pub fn geodesic(lat: f64, lon: f64) -> Self {
        Location::Geodesic { lat, lon, alt: None }
    }

    /// `(x, y, z)` for the three self-contained variants. Graph-backed
    /// variants have no coordinates without a [`PlanningContext`] and
    /// return `None`; use [`Location::resolved_tuple`] for those.
    pub fn as_tuple(&self) -> Option<(f64, f64, Option<f64>)> {
        match self {
            Location::Cartesian { x, y, z, .. } => Some((*x, *y, *z)),
            Location::Geodesic { lat, lon, alt } => Some((*lon, *lat, *alt)),
            Location::Zero => Some((0.0, 0.0, None)),
            Location::GraphNode { .. } | Location::LayeredGraphNode { .. } => None,
        }
    }

    /// `as_tuple`, resolving graph-backed variants through `ctx`.
    pub fn resolved_tuple(&self, ctx: &dyn PlanningContext) -> Option<(f64, f64, Option<f64>)> {
        match self {
            Location::GraphNode { base_graph_ref, selector } => {
                let graph = ctx.graph(*base_graph_ref)?;
                graph.node_location(*selector)?.as_tuple()
            }
            Location::LayeredGraphNode { base_graph_ref, base_id, .. } => {
                let graph = ctx.graph(*base_graph_ref)?;
                graph.node_location(*base_id)?.as_tuple()
            }
            other => other.as_tuple(),
        }
    }

    /// Distance to `other`. Returns `None` where no path exists between
    /// graph-backed locations, or where the two variants are not directly
    /// comparable.
    pub fn distance_to(&self, other: &Location, ctx: &dyn PlanningContext) -> Option<f64> {
        match (self, other) {
            (Location::Zero, _) | (_, Location::Zero) => Some(0.0),
            (
                Location::Cartesian { x: x1, y: y1, norm, .. },
                Location::Cartesian { x: x2, y: y2, .. },
            ) => Some(norm.apply(x1 - x2, y1 - y2)),
            (Location::Geodesic { lat: lat1, lon: lon1, .. }, Location::Geodesic { lat: lat2, lon: lon2, .. }) => {
                Some(ctx.geodesic().distance_meters(*lat1, *lon1, *lat2, *lon2))
            }
            (
                Location::GraphNode { base_graph_ref: g1, selector: n1 },
                Location::GraphNode { base_graph_ref: g2, selector: n2 },
            ) if g1 == g2 => {
                let graph = ctx.graph(*g1)?;
                let path = graph.path_to(*n1, *n2, ctx)?;
                graph.path_length(&path)
            }
            (
                Location::LayeredGraphNode { layer_id: l1, base_graph_ref: bg1, base_id: b1, layer_graph_ref: lg1 },
                Location::LayeredGraphNode { layer_id: l2, base_graph_ref: bg2, base_id: b2, layer_graph_ref: lg2 },
            ) if bg1 == bg2 && lg1 == lg2 => {
                if l1 == l2 {
                    return Some(0.0);
                }
                let layer_graph = ctx.graph(*lg1)?;
                if !layer_graph.has_edge(*l1, *l2) {
                    return None;
                }
                let base_graph = ctx.graph(*bg1)?;
                let path = base_graph.path_to(*b1, *b2, ctx)?;
                base_graph.path_length(&path)
            }
            _ => None,
        }
    }

    /// Ordered list of base-graph node indices from this location to
    /// `other`, for `GraphNode`/`LayeredGraphNode` locations on the same
    /// graph. `None` if no path exists or the variants are incompatible.
    pub fn path_to(&self, other: &Location, ctx: &dyn PlanningContext) -> Option<Vec<NodeIndex>> {
        match (self, other) {
            (
                Location::GraphNode { base_graph_ref: g1, selector: n1 },
                Location::GraphNode { base_graph_ref: g2, selector: n2 },
            ) if g1 == g2 => ctx.graph(*g1)?.path_to(*n1, *n2, ctx),
            (
                Location::LayeredGraphNode { layer_id: l1, base_id: b1, base_graph_ref: bg1, layer_graph_ref: lg1 },
                Location::LayeredGraphNode { layer_id: l2, base_id: b2, base_graph_ref: bg2, layer_graph_ref: lg2 },
            ) if bg1 == bg2 && lg1 == lg2 => {
                if l1 == l2 {
                    return Some(vec![*l1]);
                }
                let layer_graph = ctx.graph(*lg1)?;
                if !layer_graph.has_edge(*l1, *l2) {
                    return None;
                }
                ctx.graph(*bg1)?.path_to(*b1, *b2, ctx)
            }
            _ => None,
        }
    }
}

/// WGS84 geodesic distance, consumed through a trait so the crate does not
/// take on a geodesy library dependency just for this one computation.
pub trait GeodesicModel {
    fn distance_meters(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64;
}

/// Mean-earth-radius haversine approximation, memoized per call-site pair.
#[derive(Debug, Default)]
pub struct Wgs84Haversine {
    cache: RefCell<HashMap<(u64, u64, u64, u64), f64>>,
}

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

impl Wgs84Haversine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeodesicModel for Wgs84Haversine {
    fn distance_meters(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let key = (lat1.to_bits(), lon1.to_bits(), lat2.to_bits(), lon2.to_bits());
        if let Some(&cached) = self.cache.borrow().get(&key) {
            return cached;
        }

        let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
        let d_phi = (lat2 - lat1).to_radians();
        let d_lambda = (lon2 - lon1).to_radians();
        let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        let distance = EARTH_RADIUS_METERS * c;

        self.cache.borrow_mut().insert(key, distance);
        distance
    }
}

/// What a graph-backed [`Location`] needs to resolve distance and path
/// queries: a geodesic model and access to the graph arena.
pub trait PlanningContext {
    fn geodesic(&self) -> &dyn GeodesicModel;
    fn graph(&self, r: GraphRef) -> Option<&NodeGraph>;
}

/// One node-and-edge graph, with node coordinates and a memoized A* path
/// cache. Lives inside a [`GraphArena`]; referenced by index from
/// [`Location::GraphNode`]/[`Location::LayeredGraphNode`].
#[derive(Debug, Default)]
pub struct NodeGraph {
    locations: Vec<Location>,
    adjacency: Vec<Vec<(NodeIndex, f64)>>,
    path_cache: RefCell<HashMap<(NodeIndex, NodeIndex), Option<Vec<NodeIndex>>>>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node at `location`, returning its index.
    pub fn add_node(&mut self, location: Location) -> NodeIndex {
        self.locations.push(location);
        self.adjacency.push(Vec::new());
        self.locations.len() - 1
    }

    pub fn node_location(&self, node: NodeIndex) -> Option<&Location> {
        self.locations.get(node)
    }

    pub fn node_count(&self) -> usize {
        self.locations.len()
    }

    /// Add an edge with an explicit `"length"` weight, or a uniform weight
    /// of `1.0` if `length` is `None`, mirroring the Python original's
    /// `weight="length"` fallback.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, length: Option<f64>) {
        self.adjacency[from].push((to, length.unwrap_or(1.0)));
    }

    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.adjacency.get(from).is_some_and(|edges| edges.iter().any(|(n, _)| *n == to))
    }

    /// Sum of edge weights along `path`. `None` if `path` has fewer than
    /// two nodes or an edge along it is missing.
    pub fn path_length(&self, path: &[NodeIndex]) -> Option<f64> {
        if path.len() < 2 {
            return Some(0.0);
        }
        let mut total = 0.0;
        for window in path.windows(2) {
            let (from, to) = (window[0], window[1]);
            let weight = self.adjacency[from].iter().find(|(n, _)| *n == to)?.1;
            total += weight;
        }
        Some(total)
    }

    /// A* shortest path from `from` to `to`, memoized by `(from, to)` for
    /// the lifetime of this graph. Heuristic is the direct `distance_to`
    /// between node locations (falls back to `0.0` — admissible — when the
    /// heuristic can't be computed, e.g. incompatible location variants).
    pub fn path_to(&self, from: NodeIndex, to: NodeIndex, ctx: &dyn PlanningContext) -> Option<Vec<NodeIndex>> {
        if let Some(cached) = self.path_cache.borrow().get(&(from, to)) {
            return cached.clone();
        }

        let result = self.astar(from, to, ctx);
        self.path_cache.borrow_mut().insert((from, to), result.clone());
        result
    }

    fn heuristic(&self, a: NodeIndex, b: NodeIndex, ctx: &dyn PlanningContext) -> f64 {
        match (self.locations.get(a), self.locations.get(b)) {
            (Some(la), Some(lb)) => la.distance_to(lb, ctx).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    fn astar(&self, start: NodeIndex, goal: NodeIndex, ctx: &dyn PlanningContext) -> Option<Vec<NodeIndex>> {
        if start == goal {
            return Some(vec![start]);
        }
        if start >= self.locations.len() || goal >= self.locations.len() {
            return None;
        }

        let mut open = BinaryHeap::new();
        let mut best_cost: HashMap<NodeIndex, f64> = HashMap::new();
        let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        best_cost.insert(start, 0.0);
        open.push(AstarEntry { node: start, priority: self.heuristic(start, goal, ctx) });

        while let Some(AstarEntry { node, .. }) = open.pop() {
            if node == goal {
                let mut path = vec![goal];
                let mut cur = goal;
                while let Some(&prev) = came_from.get(&cur) {
                    path.push(prev);
                    cur = prev;
                }
                path.reverse();
                return Some(path);
            }

            let cost_so_far = *best_cost.get(&node).unwrap_or(&f64::INFINITY);
            for &(neighbor, weight) in &self.adjacency[node] {
                let tentative = cost_so_far + weight;
                if tentative < *best_cost.get(&neighbor).unwrap_or(&f64::INFINITY) {
                    best_cost.insert(neighbor, tentative);
                    came_from.insert(neighbor, node);
                    open.push(AstarEntry {
                        node: neighbor,
                        priority: tentative + self.heuristic(neighbor, goal, ctx),
                    });
                }
            }
        }

        None
    }
}

struct AstarEntry {
    node: NodeIndex,
    priority: f64,
}

impl PartialEq for AstarEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}
impl Eq for AstarEntry {}
impl Ord for AstarEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the lowest priority pops first.
        other.priority.partial_cmp(&self.priority).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for AstarEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns every [`NodeGraph`] referenced by `GraphRef` from [`Location`]
/// values, and the geodesic model shared across them.
pub struct GraphArena<G: GeodesicModel = Wgs84Haversine> {
    graphs: Vec<NodeGraph>,
    geodesic_model: G,
}

impl GraphArena<Wgs84Haversine> {
    pub fn new() -> Self {
        Self { graphs: Vec::new(), geodesic_model: Wgs84Haversine::new() }
    }
}

impl Default for GraphArena<Wgs84Haversine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GeodesicModel> GraphArena<G> {
    pub fn with_geodesic_model(geodesic_model: G) -> Self {
        Self { graphs: Vec::new(), geodesic_model }
    }

    pub fn add_graph(&mut self, graph: NodeGraph) -> GraphRef {
        self.graphs.push(graph);
        self.graphs.len() - 1
    }

    pub fn graph_mut(&mut self, r: GraphRef) -> Option<&mut NodeGraph> {
        self.graphs.get_mut(r)
    }
}

impl<G: GeodesicModel> PlanningContext for GraphArena<G> {
    fn geodesic(&self) -> &dyn GeodesicModel {
        &self.geodesic_model
    }

    fn graph(&self, r: GraphRef) -> Option<&NodeGraph> {
        self.graphs.get(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cartesian_euclidean_distance() {
        let arena = GraphArena::new();
        let a = Location::cartesian(0.0, 0.0);
        let b = Location::cartesian(3.0, 4.0);
        assert_eq!(a.distance_to(&b, &arena), Some(5.0));
    }

    #[test]
    fn cartesian_manhattan_distance() {
        let arena = GraphArena::new();
        let a = Location::Cartesian { x: 0.0, y: 0.0, z: None, norm: Norm::Manhattan };
        let b = Location::Cartesian { x: 3.0, y: 4.0, z: None, norm: Norm::Manhattan };
        assert_eq!(a.distance_to(&b, &arena), Some(7.0));
    }

    #[test]
    fn zero_distance_to_anything_is_zero() {
        let arena = GraphArena::new();
        assert_eq!(Location::Zero.distance_to(&Location::cartesian(100.0, 100.0), &arena), Some(0.0));
        assert_eq!(Location::geodesic(1.0, 1.0).distance_to(&Location::Zero, &arena), Some(0.0));
    }

    #[test]
    fn geodesic_distance_is_memoized_referentially_transparent() {
        // Invariant 7: two calls return identical values.
        let arena = GraphArena::new();
        let a = Location::geodesic(51.5007, 0.1246);
        let b = Location::geodesic(48.8566, 2.3522);
        let d1 = a.distance_to(&b, &arena).unwrap();
        let d2 = a.distance_to(&b, &arena).unwrap();
        assert_eq!(d1, d2);
        assert!((d1 - 3_43500.0).abs() < 5_000.0, "distance London-Paris ~343km, got {d1}");
    }

    #[test]
    fn graph_node_distance_sums_path_length() {
        let mut arena = GraphArena::new();
        let mut graph = NodeGraph::new();
        let n0 = graph.add_node(Location::cartesian(0.0, 0.0));
        let n1 = graph.add_node(Location::cartesian(1.0, 0.0));
        let n2 = graph.add_node(Location::cartesian(2.0, 0.0));
        graph.add_edge(n0, n1, Some(1.0));
        graph.add_edge(n1, n2, Some(1.5));
        let graph_ref = arena.add_graph(graph);

        let a = Location::GraphNode { base_graph_ref: graph_ref, selector: n0 };
        let b = Location::GraphNode { base_graph_ref: graph_ref, selector: n2 };
        assert_eq!(a.distance_to(&b, &arena), Some(2.5));
        assert_eq!(a.path_to(&b, &arena), Some(vec![n0, n1, n2]));
    }

    #[test]
    fn graph_node_no_path_is_none() {
        let mut arena = GraphArena::new();
        let mut graph = NodeGraph::new();
        let n0 = graph.add_node(Location::cartesian(0.0, 0.0));
        let n1 = graph.add_node(Location::cartesian(1.0, 0.0));
        let graph_ref = arena.add_graph(graph);

        let a = Location::GraphNode { base_graph_ref: graph_ref, selector: n0 };
        let b = Location::GraphNode { base_graph_ref: graph_ref, selector: n1 };
        assert_eq!(a.distance_to(&b, &arena), None);
    }

    #[test]
    fn layered_graph_node_same_layer_is_zero() {
        let mut arena = GraphArena::new();
        let base = NodeGraph::new();
        let base_ref = arena.add_graph(base);
        let layer = NodeGraph::new();
        let layer_ref = arena.add_graph(layer);

        let a = Location::LayeredGraphNode { layer_id: 0, base_id: 0, layer_graph_ref: layer_ref, base_graph_ref: base_ref };
        let b = a.clone();
        assert_eq!(a.distance_to(&b, &arena), Some(0.0));
    }

    #[test]
    fn layered_graph_node_without_layer_edge_is_none() {
        let mut arena = GraphArena::new();
        let mut base = NodeGraph::new();
        let b0 = base.add_node(Location::cartesian(0.0, 0.0));
        let b1 = base.add_node(Location::cartesian(1.0, 0.0));
        let base_ref = arena.add_graph(base);

        let mut layer = NodeGraph::new();
        layer.add_node(Location::Zero);
        layer.add_node(Location::Zero);
        let layer_ref = arena.add_graph(layer);

        let a = Location::LayeredGraphNode { layer_id: 0, base_id: b0, layer_graph_ref: layer_ref, base_graph_ref: base_ref };
        let b = Location::LayeredGraphNode { layer_id: 1, base_id: b1, layer_graph_ref: layer_ref, base_graph_ref: base_ref };
        assert_eq!(a.distance_to(&b, &arena), None);
    }

    #[test]
    fn location_json_round_trips_by_type_tag() {
        let loc = Location::cartesian(1.0, 2.0);
        let json = serde_json::to_string(&loc).unwrap();
        assert!(json.contains("\"type\":\"cartesian\""));
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(loc, back);
    }
}
