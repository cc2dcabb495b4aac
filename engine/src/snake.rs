use std::collections::{HashSet, VecDeque};
use serde::{Deserialize, Serialize};

use snake_arcade_common::RandomSource;
use crate::events::CollisionKind;
use crate::geometry::{in_bounds, manhattan, wrap};
use crate::types::{Direction, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeleportKind {
    /// Jump to any free cell far enough from the head.
    Random,
    /// Slide along the current heading, wrapping at the edges.
    Directional,
}

/// Ordered body, head first. Repeated tail cells are legal right after a
/// growth effect; they unstack as the snake moves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snake {
    pub body: VecDeque<Position>,
    pub direction: Direction,
}

impl Snake {
    /// A straight snake of `length` cells trailing behind `head`.
    pub fn new(head: Position, direction: Direction, length: usize) -> Self {
        let trail = direction.opposite();
        let mut body = VecDeque::with_capacity(length);
        let mut cell = head;
        for _ in 0..length.max(1) {
            body.push_back(cell);
            cell = cell.step(trail);
        }
        Self { body, direction }
    }

    pub fn from_body(body: Vec<Position>, direction: Direction) -> Self {
        assert!(!body.is_empty(), "Snake body should never be empty");
        Self {
            body: body.into(),
            direction,
        }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn tail(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn next_head(&self) -> Position {
        self.head().step(self.direction)
    }

    /// Pushes a new head one step along the current heading. The tail is left
    /// alone; the caller pops it once it knows whether the snake grows.
    pub fn advance(&mut self) -> Position {
        let head = self.next_head();
        self.body.push_front(head);
        head
    }

    pub fn pop_tail(&mut self) -> Option<Position> {
        if self.body.len() <= 1 {
            return None;
        }
        self.body.pop_back()
    }

    /// Trims from the tail or repeats the tail cell until the body has
    /// `length` cells.
    pub fn resize(&mut self, length: usize) {
        let length = length.max(1);
        while self.body.len() > length {
            self.body.pop_back();
        }
        let tail = self.tail();
        while self.body.len() < length {
            self.body.push_back(tail);
        }
    }

    /// Applies `next` unless it would reverse the snake. Returns whether the
    /// heading was accepted.
    pub fn turn(&mut self, next: Direction) -> bool {
        if !Direction::is_valid_change(self.direction, next) {
            return false;
        }
        self.direction = next;
        true
    }

    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    pub fn body_occupies(&self, pos: Position) -> bool {
        self.body.iter().skip(1).any(|cell| *cell == pos)
    }

    /// The cell a plain move frees up, if any. A tail stacked on the segment
    /// before it is not freed.
    pub fn vacating_tail(&self) -> Option<Position> {
        let len = self.body.len();
        if len < 2 {
            return None;
        }
        let tail = self.body[len - 1];
        (self.body[len - 2] != tail).then_some(tail)
    }

    /// Moves only the head; the rest of the body stays where it was and
    /// catches up through normal movement.
    pub fn relocate_head(&mut self, target: Position) {
        self.body[0] = target;
    }
}

/// Everything a moving head can run into, apart from its own body.
pub struct Obstacles<'a> {
    pub grid_size: i32,
    pub walls: &'a HashSet<Position>,
    pub other_snake: Option<&'a Snake>,
    pub bots: &'a [Position],
}

/// Checks a candidate head in a fixed order: boundary, walls, own body,
/// opponent, bots. `growing` keeps the tail cell solid for this move.
pub fn check_collision(
    head: Position,
    snake: &Snake,
    growing: bool,
    obstacles: &Obstacles,
) -> Option<CollisionKind> {
    if !in_bounds(head, obstacles.grid_size) {
        return Some(CollisionKind::Boundary);
    }

    if obstacles.walls.contains(&head) {
        return Some(CollisionKind::Wall);
    }

    let freed = if growing { None } else { snake.vacating_tail() };
    let len = snake.len();
    let hits_self = snake
        .body
        .iter()
        .enumerate()
        .any(|(i, cell)| *cell == head && !(i == len - 1 && Some(*cell) == freed));
    if hits_self {
        return Some(CollisionKind::SelfBody);
    }

    if obstacles.other_snake.is_some_and(|other| other.occupies(head)) {
        return Some(CollisionKind::OtherSnake);
    }

    if obstacles.bots.contains(&head) {
        return Some(CollisionKind::Bot);
    }

    None
}

/// Every free cell at Manhattan distance `min_distance` or more from the head,
/// scanned column by column, then one picked uniformly.
pub fn random_teleport(
    snake: &Snake,
    walls: &HashSet<Position>,
    other_snake: Option<&Snake>,
    grid_size: i32,
    min_distance: i32,
    rng: &mut dyn RandomSource,
) -> Option<Position> {
    let head = snake.head();
    let mut candidates = Vec::new();

    for x in 0..grid_size {
        for y in 0..grid_size {
            let pos = Position::new(x, y);
            if manhattan(head, pos) < min_distance {
                continue;
            }
            if walls.contains(&pos)
                || snake.occupies(pos)
                || other_snake.is_some_and(|other| other.occupies(pos))
            {
                continue;
            }
            candidates.push(pos);
        }
    }

    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.next_below(candidates.len())])
}

const TELEPORT_PROBES: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
];

/// Walks from the head along `direction` with toroidal wraparound and returns
/// the first free cell. When a walked cell is blocked its eight neighbours are
/// probed in a fixed order. Falls back to the current head after
/// `2 * grid_size` steps.
pub fn directional_teleport(
    snake: &Snake,
    direction: Direction,
    walls: &HashSet<Position>,
    other_snake: Option<&Snake>,
    grid_size: i32,
) -> Position {
    let head = snake.head();
    let is_free = |pos: Position| {
        !walls.contains(&pos)
            && !other_snake.is_some_and(|other| other.occupies(pos))
            && !snake.body_occupies(pos)
    };

    let mut cursor = head;
    for _ in 0..(2 * grid_size) {
        cursor = wrap(cursor.step(direction), grid_size);
        if cursor == head {
            continue;
        }
        if is_free(cursor) {
            return cursor;
        }

        let probe = TELEPORT_PROBES
            .iter()
            .map(|&(dx, dy)| cursor.offset(dx, dy))
            .find(|pos| in_bounds(*pos, grid_size) && *pos != head && is_free(*pos));
        if let Some(pos) = probe {
            return pos;
        }
    }

    head
}
