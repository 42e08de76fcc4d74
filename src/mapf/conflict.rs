//! Conflict detection between per-agent solutions (§4.4.1 `getFirstConflict`).

use crate::geometry::GridCell;

use super::constraint::Constraint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    Vertex {
        agents: (usize, usize),
        time: u32,
        cell: GridCell,
    },
    Edge {
        agents: (usize, usize),
        time: u32,
        from: GridCell,
        to: GridCell,
    },
}

impl Conflict {
    /// Produces the per-agent constraint each conflicting agent must obey
    /// in the corresponding CBS child (§4.4 "Constraint production").
    pub fn to_constraints(&self) -> ((usize, Constraint), (usize, Constraint)) {
        match *self {
            Conflict::Vertex { agents: (a, b), time, cell } => (
                (a, Constraint::Vertex { time, cell }),
                (b, Constraint::Vertex { time, cell }),
            ),
            Conflict::Edge { agents: (a, b), time, from, to } => (
                (a, Constraint::Edge { time, from, to }),
                (b, Constraint::Edge { time, from: to, to: from }),
            ),
        }
    }
}

/// A single agent's space-time trajectory: `positions[t]` is its cell at
/// time `t`; an agent that reaches its goal early is considered to remain
/// there for all later times (§4.4.1 "or its final position if its path is
/// shorter").
pub fn position_at(positions: &[GridCell], time: u32) -> GridCell {
    let idx = (time as usize).min(positions.len() - 1);
    positions[idx]
}

/// Finds the first conflict across all agent pairs, scanning time steps in
/// order and preferring vertex conflicts over edge conflicts within the same
/// time step (§4.4.1).
pub fn get_first_conflict(solutions: &[Vec<GridCell>]) -> Option<Conflict> {
    let max_len = solutions.iter().map(|s| s.len()).max().unwrap_or(0);
    if max_len == 0 {
        return None;
    }
    let t_max = (max_len - 1) as u32;

    for t in 0..=t_max {
        for i in 0..solutions.len() {
            for j in (i + 1)..solutions.len() {
                let pi = position_at(&solutions[i], t);
                let pj = position_at(&solutions[j], t);
                if pi == pj {
                    return Some(Conflict::Vertex {
                        agents: (i, j),
                        time: t,
                        cell: pi,
                    });
                }
            }
        }

        if t < t_max {
            for i in 0..solutions.len() {
                for j in (i + 1)..solutions.len() {
                    let pi_t = position_at(&solutions[i], t);
                    let pi_t1 = position_at(&solutions[i], t + 1);
                    let pj_t = position_at(&solutions[j], t);
                    let pj_t1 = position_at(&solutions[j], t + 1);
                    if pi_t == pj_t1 && pi_t1 == pj_t && pi_t != pi_t1 {
                        return Some(Conflict::Edge {
                            agents: (i, j),
                            time: t,
                            from: pi_t,
                            to: pi_t1,
                        });
                    }
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s2_vertex_conflict_at_t1() {
        let a0 = vec![GridCell::new(0, 0), GridCell::new(1, 0), GridCell::new(2, 0)];
        let a1 = vec![GridCell::new(2, 0), GridCell::new(1, 0), GridCell::new(0, 0)];
        let conflict = get_first_conflict(&[a0, a1]).unwrap();
        assert_eq!(
            conflict,
            Conflict::Vertex {
                agents: (0, 1),
                time: 1,
                cell: GridCell::new(1, 0),
            }
        );
    }

    #[test]
    fn scenario_s3_edge_conflict_at_t0() {
        let a0 = vec![GridCell::new(0, 0), GridCell::new(1, 0)];
        let a1 = vec![GridCell::new(1, 0), GridCell::new(0, 0)];
        let conflict = get_first_conflict(&[a0, a1]).unwrap();
        assert_eq!(
            conflict,
            Conflict::Edge {
                agents: (0, 1),
                time: 0,
                from: GridCell::new(0, 0),
                to: GridCell::new(1, 0),
            }
        );
    }

    #[test]
    fn no_conflict_for_disjoint_paths() {
        let a0 = vec![GridCell::new(0, 0), GridCell::new(0, 1)];
        let a1 = vec![GridCell::new(5, 5), GridCell::new(5, 6)];
        assert!(get_first_conflict(&[a0, a1]).is_none());
    }
}
