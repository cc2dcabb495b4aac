use std::collections::{HashSet, VecDeque};
use serde::{Deserialize, Serialize};

use snake_arcade_common::{RandomSource, log_debug};
use snake_arcade_common::rng::pick;
use crate::geometry::{in_bounds, neighbors, random_cell};
use crate::types::{Direction, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallPattern {
    None,
    #[default]
    Simple,
    Cross,
    Maze,
    Random,
    Moving,
}

const SIMPLE: &[(i32, i32)] = &[
    (5, 5), (6, 5), (7, 5),
    (12, 14), (13, 14), (14, 14),
    (5, 14), (6, 14), (7, 14),
    (12, 5), (13, 5), (14, 5),
];

const CROSS: &[(i32, i32)] = &[
    (5, 10), (6, 10), (7, 10), (8, 10),
    (11, 10), (12, 10), (13, 10), (14, 10),
    (10, 5), (10, 6), (10, 7), (10, 8),
    (10, 11), (10, 12), (10, 13), (10, 14),
];

const MAZE: &[(i32, i32)] = &[
    (3, 3), (4, 3), (5, 3), (3, 4), (3, 5),
    (14, 3), (15, 3), (16, 3), (16, 4), (16, 5),
    (3, 14), (3, 15), (3, 16), (4, 16), (5, 16),
    (16, 14), (16, 15), (16, 16), (15, 16), (14, 16),
    (9, 9), (10, 9), (9, 10), (10, 10),
];

/// Stamps used for moving walls, as offsets from the placement origin.
const MOVING_TEMPLATES: &[&[(i32, i32)]] = &[
    &[(0, 0), (1, 0), (0, 1)],
    &[(0, 0), (0, 1), (0, 2)],
    &[(0, 0), (1, 0)],
    &[(0, 0), (1, 0), (2, 0)],
];

const MOVING_WALL_ATTEMPTS: usize = 50;

/// Hand-authored layout for the fixed patterns. Random and moving patterns
/// are generated procedurally and yield nothing here.
///
/// Layouts are authored for a 20x20 field; cells outside `grid_size` and cells
/// in `forbidden` are skipped.
pub fn static_pattern(pattern: WallPattern, grid_size: i32, forbidden: &[Position]) -> Vec<Position> {
    let cells: &[(i32, i32)] = match pattern {
        WallPattern::Simple => SIMPLE,
        WallPattern::Cross => CROSS,
        WallPattern::Maze => MAZE,
        WallPattern::None | WallPattern::Random | WallPattern::Moving => &[],
    };
    cells
        .iter()
        .map(|&(x, y)| Position::new(x, y))
        .filter(|p| in_bounds(*p, grid_size) && !forbidden.contains(p))
        .collect()
}

/// Scatters `count` walls over free cells, sometimes growing a wall into a
/// two-cell clump. Returns fewer walls if the attempt budget runs out.
pub fn generate_random_walls(
    count: usize,
    grid_size: i32,
    forbidden: &[Position],
    rng: &mut dyn RandomSource,
) -> Vec<Position> {
    let mut walls: Vec<Position> = Vec::with_capacity(count);
    let mut taken: HashSet<Position> = HashSet::new();
    let max_attempts = count * 50 + 100;

    for _ in 0..max_attempts {
        if walls.len() >= count {
            break;
        }

        let wall = random_cell(grid_size, rng);
        if forbidden.contains(&wall) || !taken.insert(wall) {
            continue;
        }
        walls.push(wall);

        if rng.chance(0.5) && walls.len() < count {
            let Some(&direction) = pick(rng, &Direction::ALL) else {
                continue;
            };
            let adjacent = wall.step(direction);
            if in_bounds(adjacent, grid_size)
                && !forbidden.contains(&adjacent)
                && taken.insert(adjacent)
            {
                walls.push(adjacent);
            }
        }
    }

    if walls.len() < count {
        log_debug!("Placed {} of {} random walls", walls.len(), count);
    }
    walls
}

/// Stamps small polyomino templates until at least `count` cells are placed
/// or the attempt cap is hit. Under-delivery is expected on crowded fields.
pub fn generate_moving_walls(
    count: usize,
    grid_size: i32,
    forbidden: &[Position],
    rng: &mut dyn RandomSource,
) -> Vec<Position> {
    let mut walls: Vec<Position> = Vec::new();
    let mut taken: HashSet<Position> = HashSet::new();
    let origin_span = (grid_size - 3).max(1) as usize;

    for _ in 0..MOVING_WALL_ATTEMPTS {
        if walls.len() >= count {
            break;
        }

        let Some(template) = pick(rng, MOVING_TEMPLATES) else {
            break;
        };
        let base_x = rng.next_below(origin_span) as i32;
        let base_y = rng.next_below(origin_span) as i32;

        let stamped: Vec<Position> = template
            .iter()
            .map(|&(dx, dy)| Position::new(base_x + dx, base_y + dy))
            .collect();

        let conflict = stamped.iter().any(|cell| {
            !in_bounds(*cell, grid_size) || forbidden.contains(cell) || taken.contains(cell)
        });
        if conflict {
            continue;
        }

        taken.extend(stamped.iter().copied());
        walls.extend(stamped);
    }

    walls
}

/// Splits walls into 4-connected clusters. Clusters appear in the order of
/// their first cell in `walls`.
pub fn wall_clusters(walls: &[Position]) -> Vec<Vec<Position>> {
    let wall_set: HashSet<Position> = walls.iter().copied().collect();
    let mut visited: HashSet<Position> = HashSet::with_capacity(walls.len());
    let mut clusters = Vec::new();

    for &start in walls {
        if !visited.insert(start) {
            continue;
        }

        let mut cluster = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            cluster.push(current);
            for next in neighbors(current) {
                if wall_set.contains(&next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        clusters.push(cluster);
    }

    clusters
}

/// Tries to shift every wall cluster one cell in a random cardinal direction.
/// A cluster moves only if all of its translated cells are inside the grid,
/// off `occupied`, and clear of every other cluster; otherwise it stays put.
pub fn move_walls(
    walls: &[Position],
    occupied: &HashSet<Position>,
    grid_size: i32,
    rng: &mut dyn RandomSource,
) -> Vec<Position> {
    let clusters = wall_clusters(walls);
    let mut placed: HashSet<Position> = walls.iter().copied().collect();
    let mut result = Vec::with_capacity(walls.len());

    for cluster in clusters {
        let Some(&direction) = pick(rng, &Direction::ALL) else {
            result.extend(cluster);
            continue;
        };

        for cell in &cluster {
            placed.remove(cell);
        }

        let moved: Vec<Position> = cluster.iter().map(|cell| cell.step(direction)).collect();
        let valid = moved.iter().all(|cell| {
            in_bounds(*cell, grid_size) && !occupied.contains(cell) && !placed.contains(cell)
        });

        let landed = if valid { moved } else { cluster };
        placed.extend(landed.iter().copied());
        result.extend(landed);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use snake_arcade_common::{SequenceRng, SessionRng};

    fn forbidden() -> Vec<Position> {
        vec![Position::new(10, 10), Position::new(8, 8), Position::new(15, 15)]
    }

    #[test]
    fn test_static_patterns() {
        assert!(static_pattern(WallPattern::None, 20, &[]).is_empty());
        assert!(static_pattern(WallPattern::Random, 20, &[]).is_empty());
        assert!(static_pattern(WallPattern::Moving, 20, &[]).is_empty());
        assert_eq!(static_pattern(WallPattern::Simple, 20, &[]).len(), 12);
        assert_eq!(static_pattern(WallPattern::Cross, 20, &[]).len(), 16);
    }

    #[test]
    fn test_static_pattern_skips_forbidden_and_out_of_grid() {
        let maze = static_pattern(WallPattern::Maze, 20, &forbidden());
        assert!(!maze.contains(&Position::new(10, 10)));
        assert_eq!(maze.len(), 23);

        let small = static_pattern(WallPattern::Maze, 15, &[]);
        assert!(small.iter().all(|p| in_bounds(*p, 15)));
    }

    #[test]
    fn test_random_walls_respect_forbidden_and_are_unique() {
        for seed in 0..20 {
            let mut rng = SessionRng::new(seed);
            let walls = generate_random_walls(15, 20, &forbidden(), &mut rng);
            assert_eq!(walls.len(), 15);
            let unique: HashSet<_> = walls.iter().collect();
            assert_eq!(unique.len(), walls.len());
            assert!(walls.iter().all(|w| !forbidden().contains(w)));
            assert!(walls.iter().all(|w| in_bounds(*w, 20)));
        }
    }

    #[test]
    fn test_random_walls_terminate_when_unreachable() {
        let mut rng = SessionRng::new(5);
        let walls = generate_random_walls(50, 5, &forbidden(), &mut rng);
        assert!(walls.len() <= 25);
        let unique: HashSet<_> = walls.iter().collect();
        assert_eq!(unique.len(), walls.len());
    }

    #[test]
    fn test_moving_walls_respect_forbidden_and_are_unique() {
        for seed in 0..20 {
            let mut rng = SessionRng::new(seed);
            let walls = generate_moving_walls(8, 20, &forbidden(), &mut rng);
            let unique: HashSet<_> = walls.iter().collect();
            assert_eq!(unique.len(), walls.len());
            assert!(walls.iter().all(|w| !forbidden().contains(w)));
            assert!(walls.iter().all(|w| in_bounds(*w, 20)));
        }
    }

    #[test]
    fn test_clusters_are_four_connected() {
        let walls = vec![
            Position::new(0, 0),
            Position::new(5, 5),
            Position::new(1, 0),
            Position::new(6, 6),
            Position::new(1, 1),
        ];
        let clusters = wall_clusters(&walls);
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].len(), 3);
        assert_eq!(clusters[1], vec![Position::new(5, 5)]);
        assert_eq!(clusters[2], vec![Position::new(6, 6)]);
    }

    #[test]
    fn test_move_walls_translates_cluster_rigidly() {
        let walls = vec![Position::new(5, 5), Position::new(6, 5)];
        // 0.3 picks Right out of [Up, Right, Down, Left].
        let mut rng = SequenceRng::constant(0.3);
        let moved = move_walls(&walls, &HashSet::new(), 20, &mut rng);
        assert_eq!(moved, vec![Position::new(6, 5), Position::new(7, 5)]);
    }

    #[test]
    fn test_blocked_cluster_is_unchanged() {
        let walls = vec![Position::new(19, 3), Position::new(19, 4)];
        let mut rng = SequenceRng::constant(0.3);
        assert_eq!(move_walls(&walls, &HashSet::new(), 20, &mut rng), walls);

        let walls = vec![Position::new(4, 4)];
        let occupied: HashSet<_> = [Position::new(5, 4)].into_iter().collect();
        assert_eq!(move_walls(&walls, &occupied, 20, &mut rng), walls);
    }

    #[test]
    fn test_move_walls_never_lands_on_occupied() {
        let mut rng = SessionRng::new(11);
        let mut walls = generate_moving_walls(8, 20, &forbidden(), &mut rng);
        let occupied: HashSet<Position> = (0..20).map(|x| Position::new(x, 10)).collect();
        walls.retain(|w| !occupied.contains(w));
        for _ in 0..100 {
            walls = move_walls(&walls, &occupied, 20, &mut rng);
            assert!(walls.iter().all(|w| in_bounds(*w, 20) && !occupied.contains(w)));
            let unique: HashSet<_> = walls.iter().collect();
            assert_eq!(unique.len(), walls.len());
        }
    }
}
