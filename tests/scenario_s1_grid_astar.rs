//! 3x3 grid A* around an obstacle, driven through the public crate API.

use std::collections::HashSet;
use std::sync::Arc;

use ditags::geometry::grid::solve_grid_path;
use ditags::geometry::{GridCell, GridMap};

#[test]
fn three_by_three_grid_around_an_obstacle() {
    let mut obstacles = HashSet::new();
    obstacles.insert(GridCell::new(1, 1));
    obstacles.insert(GridCell::new(2, 2));
    let map = Arc::new(GridMap::new(3, 3, obstacles));

    let path = solve_grid_path(map, GridCell::new(0, 0), GridCell::new(1, 2), None).unwrap();

    assert_eq!(
        path,
        vec![GridCell::new(0, 0), GridCell::new(0, 1), GridCell::new(0, 2), GridCell::new(1, 2)]
    );
    assert_eq!(path.len() - 1, 3);
}
