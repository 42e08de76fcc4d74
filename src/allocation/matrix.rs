//! Incremental allocation node (§4.7 "Successor generation"): one
//! (task, robot) assignment per node, with the rest deferred to its parent —
//! the same arena-by-parent-chain idiom used for CBS's constraint tree.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::problem::Assignment;

#[derive(Debug)]
pub struct AllocationNode {
    id: u64,
    pub parent: Option<Arc<AllocationNode>>,
    /// `None` only for the root, which represents the empty allocation.
    pub assignment: Option<Assignment>,
}

impl PartialEq for AllocationNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for AllocationNode {}

impl Hash for AllocationNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl AllocationNode {
    pub fn root(id: u64) -> Arc<Self> {
        Arc::new(AllocationNode {
            id,
            parent: None,
            assignment: None,
        })
    }

    pub fn child(id: u64, parent: &Arc<Self>, assignment: Assignment) -> Arc<Self> {
        Arc::new(AllocationNode {
            id,
            parent: Some(parent.clone()),
            assignment: Some(assignment),
        })
    }

    /// Reconstructs the full task x robot 0/1 allocation matrix by walking
    /// the parent chain (§4.7 "Duplicate detection uses a hash over the full
    /// reconstructed allocation").
    pub fn reconstruct(self: &Arc<Self>, num_tasks: usize, num_robots: usize) -> AllocationMatrix {
        let mut cells = vec![vec![0.0; num_robots]; num_tasks];
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if let Some(assignment) = node.assignment {
                cells[assignment.task][assignment.robot] = 1.0;
            }
            current = node.parent.clone();
        }
        AllocationMatrix { cells }
    }
}

/// A dense task x robot 0/1 matrix (§6 "allocation matrix"). Reduction
/// treats any entry `> 0.5` as "assigned" (§4.6).
#[derive(Debug, Clone)]
pub struct AllocationMatrix {
    cells: Vec<Vec<f64>>,
}

impl AllocationMatrix {
    pub fn empty(num_tasks: usize, num_robots: usize) -> Self {
        AllocationMatrix {
            cells: vec![vec![0.0; num_robots]; num_tasks],
        }
    }

    pub fn num_tasks(&self) -> usize {
        self.cells.len()
    }

    pub fn num_robots(&self) -> usize {
        self.cells.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_assigned(&self, task: usize, robot: usize) -> bool {
        self.cells[task][robot] > 0.5
    }

    pub fn assigned_robots(&self, task: usize) -> Vec<usize> {
        (0..self.num_robots()).filter(|&r| self.is_assigned(task, r)).collect()
    }

    /// Flips a single cell on, bypassing the incremental-node machinery.
    /// Used to build matrices directly (tests, the full-allocation goal
    /// check) rather than by walking an [`AllocationNode`] parent chain.
    pub fn set_direct(&mut self, task: usize, robot: usize, value: f64) {
        self.cells[task][robot] = value;
    }

    pub fn cells(&self) -> &[Vec<f64>] {
        &self.cells
    }

    /// Whether any task in this allocation is assigned to `robot` (used by
    /// the DITAGS "robot lost" repair to find nodes that must be dropped).
    pub fn uses_robot(&self, robot: usize) -> bool {
        self.cells.iter().any(|row| row.get(robot).copied().unwrap_or(0.0) > 0.5)
    }

    /// A stable hash of the matrix's assigned cells, used as the search
    /// kernel's dedup key so that different insertion orders reaching the
    /// same allocation collapse onto one representative.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = fxhash::FxHasher::default();
        for (task, row) in self.cells.iter().enumerate() {
            for (robot, &value) in row.iter().enumerate() {
                if value > 0.5 {
                    (task, robot).hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }
}
