//! Robot-traits matrix reduction (§4.6 "Reduction function"): combines an
//! allocation with a team's trait matrix into the traits actually allocated
//! to each task.

use std::sync::Arc;

use fxhash::FxHashMap;

use super::matrix::AllocationMatrix;

pub type CustomReductionFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionKind {
    Sum,
    Product,
    Min,
    Max,
    Custom,
}

/// Per-cell reduction strategy (§9 "stringly-named reduction cells"):
/// `kinds[task][trait]` chooses how that cell of the allocated-traits matrix
/// is computed from the assigned robots' values for that trait.
#[derive(Clone)]
pub struct RobotTraitsMatrixReduction {
    kinds: Vec<Vec<ReductionKind>>,
    matrix_multiply: bool,
    custom: FxHashMap<(usize, usize), CustomReductionFn>,
}

impl std::fmt::Debug for RobotTraitsMatrixReduction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotTraitsMatrixReduction")
            .field("kinds", &self.kinds)
            .field("matrix_multiply", &self.matrix_multiply)
            .field("custom_cells", &self.custom.len())
            .finish()
    }
}

impl RobotTraitsMatrixReduction {
    /// The fast path: every cell reduces by summation, so reduction is
    /// literally `A · T` (§4.6 "the reduction equals the matrix product").
    pub fn matrix_multiply(num_tasks: usize, num_traits: usize) -> Self {
        RobotTraitsMatrixReduction {
            kinds: vec![vec![ReductionKind::Sum; num_traits]; num_tasks],
            matrix_multiply: true,
            custom: FxHashMap::default(),
        }
    }

    pub fn per_cell(kinds: Vec<Vec<ReductionKind>>) -> Self {
        let matrix_multiply = kinds.iter().flatten().all(|k| *k == ReductionKind::Sum);
        RobotTraitsMatrixReduction {
            kinds,
            matrix_multiply,
            custom: FxHashMap::default(),
        }
    }

    /// Binds a custom reduction callable to every cell marked
    /// [`ReductionKind::Custom`]. Panics if a custom cell has no bound
    /// callable (§9 "validate at construction").
    pub fn with_custom_functions(mut self, functions: FxHashMap<(usize, usize), CustomReductionFn>) -> Self {
        for (task, row) in self.kinds.iter().enumerate() {
            for (trait_idx, kind) in row.iter().enumerate() {
                if *kind == ReductionKind::Custom {
                    assert!(
                        functions.contains_key(&(task, trait_idx)),
                        "custom reduction cell ({task},{trait_idx}) has no bound function"
                    );
                }
            }
        }
        self.custom = functions;
        self
    }

    /// Reduces `allocation` and `robot_traits` (robot x trait) into the
    /// allocated-traits matrix P (task x trait).
    pub fn reduce(&self, allocation: &AllocationMatrix, robot_traits: &[Vec<f64>]) -> Vec<Vec<f64>> {
        if self.matrix_multiply {
            return self.reduce_matrix_multiply(allocation, robot_traits);
        }

        let num_traits = self.kinds.first().map(|r| r.len()).unwrap_or(0);
        (0..allocation.num_tasks())
            .map(|task| {
                let assigned = allocation.assigned_robots(task);
                (0..num_traits)
                    .map(|trait_idx| {
                        let values: Vec<f64> = assigned.iter().map(|&r| robot_traits[r][trait_idx]).collect();
                        self.reduce_cell(task, trait_idx, &values)
                    })
                    .collect()
            })
            .collect()
    }

    fn reduce_matrix_multiply(&self, allocation: &AllocationMatrix, robot_traits: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let num_traits = robot_traits.first().map(|r| r.len()).unwrap_or(0);
        allocation
            .cells()
            .iter()
            .map(|row| {
                (0..num_traits)
                    .map(|trait_idx| {
                        row.iter()
                            .enumerate()
                            .map(|(robot, &a)| a * robot_traits[robot][trait_idx])
                            .sum()
                    })
                    .collect()
            })
            .collect()
    }

    fn reduce_cell(&self, task: usize, trait_idx: usize, values: &[f64]) -> f64 {
        match self.kinds[task][trait_idx] {
            ReductionKind::Sum => values.iter().sum(),
            ReductionKind::Product => values.iter().product(),
            ReductionKind::Min => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().cloned().fold(f64::INFINITY, f64::min)
                }
            }
            ReductionKind::Max => values.iter().cloned().fold(0.0, f64::max),
            ReductionKind::Custom => {
                let f = &self.custom[&(task, trait_idx)];
                f(values)
            }
        }
    }
}

/// Ships a "threshold cumulative" custom reduction: counts how many of the
/// assigned robots' values for this trait exceed `threshold` (§4.6 "the
/// repository ships one such function").
pub fn threshold_cumulative(threshold: f64) -> CustomReductionFn {
    Arc::new(move |values: &[f64]| values.iter().filter(|&&v| v > threshold).count() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_from(cells: Vec<Vec<f64>>) -> AllocationMatrix {
        let num_tasks = cells.len();
        let num_robots = cells.first().map(|r| r.len()).unwrap_or(0);
        let mut matrix = AllocationMatrix::empty(num_tasks, num_robots);
        for (task, row) in cells.iter().enumerate() {
            for (robot, &v) in row.iter().enumerate() {
                if v > 0.5 {
                    matrix.set_for_test(task, robot);
                }
            }
        }
        matrix
    }

    #[test]
    fn matrix_multiply_matches_explicit_sum_reduction() {
        let allocation = matrix_from(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let robot_traits = vec![vec![1.0, 2.0], vec![3.0, 4.0]];

        let fast = RobotTraitsMatrixReduction::matrix_multiply(2, 2).reduce(&allocation, &robot_traits);
        let explicit =
            RobotTraitsMatrixReduction::per_cell(vec![vec![ReductionKind::Sum; 2]; 2]).reduce(&allocation, &robot_traits);

        assert_eq!(fast, explicit);
        assert_eq!(fast, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn max_reduction_picks_the_strongest_assigned_robot() {
        let allocation = matrix_from(vec![vec![1.0, 1.0]]);
        let robot_traits = vec![vec![1.0], vec![5.0]];
        let reduction = RobotTraitsMatrixReduction::per_cell(vec![vec![ReductionKind::Max]]);
        assert_eq!(reduction.reduce(&allocation, &robot_traits), vec![vec![5.0]]);
    }

    #[test]
    fn custom_reduction_counts_above_threshold() {
        let allocation = matrix_from(vec![vec![1.0, 1.0, 1.0]]);
        let robot_traits = vec![vec![0.1], vec![0.9], vec![0.95]];
        let mut functions: FxHashMap<(usize, usize), CustomReductionFn> = FxHashMap::default();
        functions.insert((0, 0), threshold_cumulative(0.5));
        let reduction =
            RobotTraitsMatrixReduction::per_cell(vec![vec![ReductionKind::Custom]]).with_custom_functions(functions);
        assert_eq!(reduction.reduce(&allocation, &robot_traits), vec![vec![2.0]]);
    }

    impl AllocationMatrix {
        fn set_for_test(&mut self, task: usize, robot: usize) {
            self.set_direct(task, robot, 1.0);
        }
    }
}
