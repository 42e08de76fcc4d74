//! Sampled point-graph motion planner (§4.3 "Sampled variant"): an ordered
//! array of point graphs, queried with an extra scenario index. Backs the
//! stochastic MILP scheduler's per-scenario duration queries (§4.5).

use std::sync::Arc;
use std::time::Duration;

use super::config::PointGraphConfiguration;
use super::graph::{solve_graph_path, Graph, GraphNodeId};
use super::motion_planner::{MemoizedMotionPlanner, MotionPlanResult, MotionPlanner};

/// A point-graph planner over one fixed roadmap, suitable for wrapping in
/// [`MemoizedMotionPlanner`].
pub struct PointGraphMotionPlanner {
    graph: Arc<Graph>,
}

impl PointGraphMotionPlanner {
    pub fn new(graph: Arc<Graph>) -> Self {
        PointGraphMotionPlanner { graph }
    }
}

impl MotionPlanner<String, PointGraphConfiguration> for PointGraphMotionPlanner {
    fn query(
        &self,
        _species: &String,
        from: &PointGraphConfiguration,
        to: &PointGraphConfiguration,
        timeout: Option<Duration>,
    ) -> MotionPlanResult<PointGraphConfiguration> {
        let path = solve_graph_path(
            self.graph.clone(),
            GraphNodeId(from.id),
            GraphNodeId(to.id),
            timeout,
        );
        match path {
            Some(vertices) => {
                let configs: Vec<_> = vertices
                    .into_iter()
                    .map(|id| self.graph.configuration(id))
                    .collect();
                let length = configs
                    .windows(2)
                    .map(|w| w[0].euclidean_distance(&w[1]))
                    .sum();
                MotionPlanResult::Success {
                    path: configs,
                    length,
                }
            }
            None => MotionPlanResult::Timeout,
        }
    }
}

/// An ordered array of `N` independently-memoized point-graph planners,
/// each corresponding to one stochastic scenario (§4.5). Queries take an
/// extra scenario index to pick which sample graph to search.
pub struct SampledPointGraphMotionPlanner {
    samples: Vec<MemoizedMotionPlanner<String, PointGraphConfiguration, PointGraphMotionPlanner>>,
}

impl SampledPointGraphMotionPlanner {
    pub fn new(graphs: Vec<Arc<Graph>>) -> Self {
        SampledPointGraphMotionPlanner {
            samples: graphs
                .into_iter()
                .map(|graph| MemoizedMotionPlanner::new(PointGraphMotionPlanner::new(graph)))
                .collect(),
        }
    }

    pub fn scenario_count(&self) -> usize {
        self.samples.len()
    }

    pub fn query(
        &self,
        scenario: usize,
        species_id: String,
        from: &PointGraphConfiguration,
        to: &PointGraphConfiguration,
        timeout: Option<Duration>,
    ) -> MotionPlanResult<PointGraphConfiguration> {
        let species = species_id.clone();
        self.samples[scenario].query(species_id, &species, from, to, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_graph(edge_cost: f64) -> Arc<Graph> {
        let mut graph = Graph::new();
        let a = graph.add_node((0.0, 0.0), 1.0);
        let b = graph.add_node((edge_cost, 0.0), 1.0);
        graph.add_edge(a, b, edge_cost, 1.0);
        Arc::new(graph)
    }

    #[test]
    fn each_scenario_has_independent_durations() {
        let sampled = SampledPointGraphMotionPlanner::new(vec![two_node_graph(1.0), two_node_graph(5.0)]);
        let from = PointGraphConfiguration::new(0, 0.0, 0.0);
        let to = PointGraphConfiguration::new(1, 1.0, 0.0);

        let fast = sampled.query(0, "bot".to_string(), &from, &to, None);
        let slow = sampled.query(1, "bot".to_string(), &from, &to, None);
        assert_eq!(fast.length(), Some(1.0));
        assert_eq!(slow.length(), Some(5.0));
    }
}
