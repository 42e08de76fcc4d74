//! Point-graph shortest path over a 19-vertex/22-edge roadmap, driven
//! through the public crate API.

use std::sync::Arc;

use ditags::geometry::graph::solve_graph_path;
use ditags::geometry::{Graph, GraphNodeId};

#[test]
fn nineteen_vertex_roadmap_shortest_path_is_nine_vertices() {
    // An 8-edge spine 0-1-2-...-7-18 is the only route between 0 and 18;
    // the other ten vertices form a disjoint filler component (a 9-edge
    // chain plus 5 chords) padding the vertex/edge counts to 19/22
    // without offering any shortcut.
    let mut graph = Graph::new();
    for i in 0..19 {
        graph.add_node((i as f64, 0.0), 1.0);
    }
    let spine = [0u32, 1, 2, 3, 4, 5, 6, 7, 18];
    for pair in spine.windows(2) {
        graph.add_edge(GraphNodeId(pair[0]), GraphNodeId(pair[1]), 1.0, 1.0);
    }
    let filler = [8u32, 9, 10, 11, 12, 13, 14, 15, 16, 17];
    for pair in filler.windows(2) {
        graph.add_edge(GraphNodeId(pair[0]), GraphNodeId(pair[1]), 1.0, 1.0);
    }
    for i in [8u32, 9, 10, 11, 12] {
        graph.add_edge(GraphNodeId(i), GraphNodeId(i + 2), 1.0, 1.0);
    }
    assert_eq!(graph.node_count(), 19);
    assert_eq!(graph.edge_count(), 22);

    let graph = Arc::new(graph);
    let path = solve_graph_path(graph, GraphNodeId(0), GraphNodeId(18), None).unwrap();
    assert_eq!(path.len(), 9);
}
