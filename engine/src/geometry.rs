use snake_arcade_common::RandomSource;
use crate::types::{Direction, Position};

pub fn in_bounds(pos: Position, grid_size: i32) -> bool {
    pos.x >= 0 && pos.x < grid_size && pos.y >= 0 && pos.y < grid_size
}

pub fn manhattan(a: Position, b: Position) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

pub fn euclidean(a: Position, b: Position) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

pub fn is_occupied<'a>(pos: Position, cells: impl IntoIterator<Item = &'a Position>) -> bool {
    cells.into_iter().any(|cell| *cell == pos)
}

pub fn neighbors(pos: Position) -> [Position; 4] {
    Direction::ALL.map(|direction| pos.step(direction))
}

/// Wraps a position onto the torus of side `grid_size`.
pub fn wrap(pos: Position, grid_size: i32) -> Position {
    Position::new(pos.x.rem_euclid(grid_size), pos.y.rem_euclid(grid_size))
}

/// Rejection-samples a uniformly random cell accepted by `is_free`.
/// Gives up after `attempts` draws.
pub fn random_free_cell(
    grid_size: i32,
    attempts: usize,
    rng: &mut dyn RandomSource,
    is_free: impl Fn(Position) -> bool,
) -> Option<Position> {
    for _ in 0..attempts {
        let pos = random_cell(grid_size, rng);
        if is_free(pos) {
            return Some(pos);
        }
    }
    None
}

pub fn random_cell(grid_size: i32, rng: &mut dyn RandomSource) -> Position {
    let x = rng.next_below(grid_size as usize) as i32;
    let y = rng.next_below(grid_size as usize) as i32;
    Position::new(x, y)
}
