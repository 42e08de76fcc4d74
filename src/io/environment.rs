//! Environment loading (§6 "Environment formats"): grid maps and point
//! graphs, each readable as JSON or XML, plus the sampled point-graph array
//! used by the stochastic scheduler (§4.5).

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{GrstapseError, Result};
use crate::geometry::{Graph, GraphNodeId, GridCell, GridMap};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMapDocument {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub obstacles: Vec<GridCell>,
}

impl From<GridMapDocument> for GridMap {
    fn from(doc: GridMapDocument) -> Self {
        let obstacles: HashSet<GridCell> = doc.obstacles.into_iter().collect();
        GridMap::new(doc.width, doc.height, obstacles)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexDocument {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDocument {
    pub v1: u32,
    pub v2: u32,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointGraphDocument {
    pub vertices: Vec<VertexDocument>,
    pub edges: Vec<EdgeDocument>,
}

impl PointGraphDocument {
    /// Builds a [`Graph`], remapping this document's (possibly sparse or
    /// out-of-order) external vertex ids onto [`Graph::add_node`]'s
    /// sequentially-assigned ids in insertion order.
    pub fn build(&self) -> Result<Graph> {
        let mut graph = Graph::new();
        let mut id_map: FxHashMap<u32, GraphNodeId> = FxHashMap::default();
        for vertex in &self.vertices {
            let node_id = graph.add_node((vertex.x, vertex.y), 1.0);
            id_map.insert(vertex.id, node_id);
        }
        for edge in &self.edges {
            let v1 = *id_map.get(&edge.v1).ok_or_else(|| unknown_vertex(edge.v1))?;
            let v2 = *id_map.get(&edge.v2).ok_or_else(|| unknown_vertex(edge.v2))?;
            graph.add_edge(v1, v2, edge.cost, 1.0);
        }
        Ok(graph)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampledPointGraphDocument {
    pub scenarios: Vec<PointGraphDocument>,
}

/// A point-graph document referencing a vertex id that was never declared —
/// malformed external input, not a contract violation by this crate's own
/// callers, so it surfaces as [`GrstapseError::InterfaceError`].
fn unknown_vertex(id: u32) -> GrstapseError {
    GrstapseError::interface(
        "point_graph",
        std::io::Error::new(std::io::ErrorKind::InvalidData, format!("edge references unknown vertex {id}")),
    )
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| GrstapseError::interface("file", e))
}

fn is_xml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("xml")
}

pub fn load_grid_map(path: &Path) -> Result<Arc<GridMap>> {
    let contents = read_to_string(path)?;
    let doc: GridMapDocument = if is_xml(path) {
        quick_xml::de::from_str(&contents).map_err(|e| GrstapseError::interface("xml", e))?
    } else {
        serde_json::from_str(&contents).map_err(|e| GrstapseError::interface("json", e))?
    };
    Ok(Arc::new(doc.into()))
}

pub fn load_point_graph(path: &Path) -> Result<Arc<Graph>> {
    let contents = read_to_string(path)?;
    let doc: PointGraphDocument = if is_xml(path) {
        quick_xml::de::from_str(&contents).map_err(|e| GrstapseError::interface("xml", e))?
    } else {
        serde_json::from_str(&contents).map_err(|e| GrstapseError::interface("json", e))?
    };
    Ok(Arc::new(doc.build()?))
}

pub fn load_sampled_point_graph(path: &Path) -> Result<Vec<Arc<Graph>>> {
    let contents = read_to_string(path)?;
    let doc: SampledPointGraphDocument = if is_xml(path) {
        quick_xml::de::from_str(&contents).map_err(|e| GrstapseError::interface("xml", e))?
    } else {
        serde_json::from_str(&contents).map_err(|e| GrstapseError::interface("json", e))?
    };
    doc.scenarios.iter().map(|scenario| Ok(Arc::new(scenario.build()?))).collect()
}

/// Which environment a problem resolves its motion-plan queries against.
/// §6's documents carry at most one of these; which one(s) are present must
/// match the `motion_planner_type` every species in the problem declares.
#[derive(Clone, Default)]
pub struct Environment {
    pub grid: Option<Arc<GridMap>>,
    pub point_graph: Option<Arc<Graph>>,
    pub sampled_point_graph: Option<Arc<crate::geometry::SampledPointGraphMotionPlanner>>,
}

impl Environment {
    pub fn from_spec(spec: &super::model::EnvironmentSpec) -> Result<Self> {
        use super::model::EnvironmentSpec;
        match spec {
            EnvironmentSpec::Grid(doc) => Ok(Environment {
                grid: Some(Arc::new(doc.clone().into())),
                point_graph: None,
                sampled_point_graph: None,
            }),
            EnvironmentSpec::PointGraph(doc) => Ok(Environment {
                grid: None,
                point_graph: Some(Arc::new(doc.build()?)),
                sampled_point_graph: None,
            }),
            EnvironmentSpec::SampledPointGraph(doc) => {
                let graphs = doc.scenarios.iter().map(|s| Ok(Arc::new(s.build()?))).collect::<Result<Vec<_>>>()?;
                Ok(Environment {
                    grid: None,
                    point_graph: None,
                    sampled_point_graph: Some(Arc::new(crate::geometry::SampledPointGraphMotionPlanner::new(graphs))),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_graph_document_remaps_sparse_external_ids() {
        let doc = PointGraphDocument {
            vertices: vec![
                VertexDocument { id: 100, x: 0.0, y: 0.0 },
                VertexDocument { id: 7, x: 1.0, y: 0.0 },
            ],
            edges: vec![EdgeDocument { v1: 100, v2: 7, cost: 1.0 }],
        };
        let graph = doc.build().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn edge_referencing_unknown_vertex_is_a_logic_error() {
        let doc = PointGraphDocument {
            vertices: vec![VertexDocument { id: 0, x: 0.0, y: 0.0 }],
            edges: vec![EdgeDocument { v1: 0, v2: 99, cost: 1.0 }],
        };
        assert!(doc.build().is_err());
    }

    #[test]
    fn grid_map_document_collects_obstacles() {
        let doc = GridMapDocument {
            width: 3,
            height: 3,
            obstacles: vec![GridCell::new(1, 1)],
        };
        let map: GridMap = doc.into();
        assert!(map.is_obstacle(1, 1));
        assert!(!map.is_obstacle(0, 0));
    }
}
