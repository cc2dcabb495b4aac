use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unit heading on the grid. `y` grows downwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Clockwise from up; bots scan neighbours in this order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Direction::Up),
            (1, 0) => Some(Direction::Right),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    pub fn is_opposite(&self, other: &Direction) -> bool {
        self.opposite() == *other
    }

    /// A heading change is legal unless it reverses the snake onto itself.
    pub fn is_valid_change(current: Direction, next: Direction) -> bool {
        !current.is_opposite(&next)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    pub fn index(&self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    pub fn other(&self) -> PlayerSlot {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerSlot::One => write!(f, "player1"),
            PlayerSlot::Two => write!(f, "player2"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Player(PlayerSlot),
    Tie,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversals_are_the_only_invalid_changes() {
        let mut rejected = Vec::new();
        for current in Direction::ALL {
            for next in Direction::ALL {
                if !Direction::is_valid_change(current, next) {
                    rejected.push((current, next));
                }
            }
        }
        assert_eq!(
            rejected,
            vec![
                (Direction::Up, Direction::Down),
                (Direction::Right, Direction::Left),
                (Direction::Down, Direction::Up),
                (Direction::Left, Direction::Right),
            ]
        );
    }

    #[test]
    fn test_delta_round_trip() {
        for direction in Direction::ALL {
            let (dx, dy) = direction.delta();
            assert_eq!(Direction::from_delta(dx, dy), Some(direction));
        }
        assert_eq!(Direction::from_delta(0, 0), None);
    }

    #[test]
    fn test_step() {
        assert_eq!(Position::new(0, 0).step(Direction::Left), Position::new(-1, 0));
        assert_eq!(Position::new(3, 3).step(Direction::Down), Position::new(3, 4));
    }
}
