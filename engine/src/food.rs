use serde::{Deserialize, Serialize};

use snake_arcade_common::RandomSource;
use crate::geometry::random_free_cell;
use crate::snake::Snake;
use crate::types::Position;

pub const MIN_SNAKE_LENGTH: usize = 3;
pub const FOOD_SPAWN_ATTEMPTS: usize = 100;
pub const BULLETS_PER_PICKUP: u32 = 5;
pub const RANDOM_GROW_BONUS_PER_SEGMENT: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodKind {
    Apple,
    Golden,
    Berry,
    Super,
    Banana,
    Cherry,
    Watermelon,
    Mushroom,
    Poison,
    Bullet,
    Growth,
    Shrink,
    Magnet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoodEffect {
    Regular,
    Golden,
    Double,
    Shrink,
    Bullet,
    Magnet,
    RandomGrow,
    RandomShrink,
}

impl FoodEffect {
    /// Whether eating keeps the tail cell occupied this tick.
    pub fn keeps_tail(&self) -> bool {
        !matches!(self, FoodEffect::Shrink | FoodEffect::RandomShrink)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoodProperties {
    pub points: i32,
    pub spawn_weight: f64,
    pub effect: FoodEffect,
}

/// Draw order for [`select_food_kind`]. The order is part of the behaviour:
/// cumulative weights are walked front to back.
pub const FOOD_SPAWN_TABLE: [FoodKind; 13] = [
    FoodKind::Apple,
    FoodKind::Golden,
    FoodKind::Berry,
    FoodKind::Super,
    FoodKind::Banana,
    FoodKind::Cherry,
    FoodKind::Watermelon,
    FoodKind::Mushroom,
    FoodKind::Poison,
    FoodKind::Bullet,
    FoodKind::Growth,
    FoodKind::Shrink,
    FoodKind::Magnet,
];

impl FoodKind {
    pub const fn properties(&self) -> FoodProperties {
        let (points, spawn_weight, effect) = match self {
            FoodKind::Apple => (10, 0.22, FoodEffect::Regular),
            FoodKind::Golden => (50, 0.05, FoodEffect::Golden),
            FoodKind::Berry => (20, 0.14, FoodEffect::Regular),
            FoodKind::Super => (100, 0.03, FoodEffect::Regular),
            FoodKind::Banana => (15, 0.11, FoodEffect::Regular),
            FoodKind::Cherry => (25, 0.09, FoodEffect::Regular),
            FoodKind::Watermelon => (30, 0.05, FoodEffect::Regular),
            FoodKind::Mushroom => (5, 0.05, FoodEffect::Double),
            FoodKind::Poison => (-10, 0.05, FoodEffect::Shrink),
            FoodKind::Bullet => (20, 0.05, FoodEffect::Bullet),
            FoodKind::Growth => (15, 0.06, FoodEffect::RandomGrow),
            FoodKind::Shrink => (-5, 0.06, FoodEffect::RandomShrink),
            FoodKind::Magnet => (15, 0.04, FoodEffect::Magnet),
        };
        FoodProperties {
            points,
            spawn_weight,
            effect,
        }
    }

    pub fn points(&self) -> i32 {
        self.properties().points
    }

    pub fn effect(&self) -> FoodEffect {
        self.properties().effect
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub position: Position,
    pub kind: FoodKind,
    /// Game-clock time of the spawn; only used by presentation layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawned_at_ms: Option<u64>,
}

impl Food {
    pub fn new(position: Position, kind: FoodKind) -> Self {
        Self {
            position,
            kind,
            spawned_at_ms: None,
        }
    }
}

/// What a meal did to the eater, besides the body resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FoodOutcome {
    pub length_change: i32,
    pub score_delta: i32,
    pub ammo_delta: u32,
    pub magnet_delta: u32,
}

/// Walks the cumulative weight table; a draw past the total falls back to
/// apple.
pub fn select_food_kind(rng: &mut dyn RandomSource) -> FoodKind {
    let draw = rng.next_unit();
    let mut cumulative = 0.0;
    for kind in FOOD_SPAWN_TABLE {
        cumulative += kind.properties().spawn_weight;
        if draw < cumulative {
            return kind;
        }
    }
    FoodKind::Apple
}

/// Picks a free cell and a food kind for it. `None` when no free cell turned
/// up within the attempt budget; the caller simply skips the spawn.
pub fn spawn_food(
    grid_size: i32,
    rng: &mut dyn RandomSource,
    is_free: impl Fn(Position) -> bool,
) -> Option<Food> {
    let position = random_free_cell(grid_size, FOOD_SPAWN_ATTEMPTS, rng, is_free)?;
    Some(Food::new(position, select_food_kind(rng)))
}

/// Length after a shrink of `amount`, never going under the minimum and never
/// growing a snake that is already shorter than it.
fn shrunk_length(length: usize, amount: usize) -> usize {
    length.saturating_sub(amount).max(length.min(MIN_SNAKE_LENGTH))
}

/// Applies a meal to a snake whose head has just been pushed onto the food
/// cell (tail not popped yet). The body is resized relative to the pre-move
/// length: regular food keeps the tail, extra growth repeats the tail cell and
/// shrinking pops from the tail.
pub fn resolve_food_effect(snake: &mut Snake, kind: FoodKind, rng: &mut dyn RandomSource) -> FoodOutcome {
    let props = kind.properties();
    let length = snake.len().saturating_sub(1);

    let mut outcome = FoodOutcome {
        score_delta: props.points,
        ..FoodOutcome::default()
    };

    let target = match props.effect {
        FoodEffect::Regular => length + 1,
        FoodEffect::Golden => {
            outcome.score_delta = props.points * 2;
            length + 2
        }
        FoodEffect::Double => length + length.saturating_sub(1),
        FoodEffect::Shrink => shrunk_length(length, 2),
        FoodEffect::Bullet => {
            outcome.ammo_delta = BULLETS_PER_PICKUP;
            length + 1
        }
        FoodEffect::Magnet => {
            outcome.magnet_delta = rng.inclusive(1, 5);
            length + 1
        }
        FoodEffect::RandomGrow => {
            let growth = rng.inclusive(1, 3);
            outcome.score_delta += RANDOM_GROW_BONUS_PER_SEGMENT * growth as i32;
            length + growth as usize
        }
        FoodEffect::RandomShrink => shrunk_length(length, rng.inclusive(1, 3) as usize),
    };

    snake.resize(target);
    outcome.length_change = target as i32 - length as i32;
    outcome
}

/// Adds a signed delta to a running score, clamping at zero.
pub fn apply_score(score: u32, delta: i32) -> u32 {
    (score as i64 + delta as i64).clamp(0, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use snake_arcade_common::{SequenceRng, SessionRng};
    use crate::types::Direction;

    fn snake_of(length: i32) -> Snake {
        let body = (0..length).map(|i| Position::new(10 - i, 10)).collect();
        Snake::from_body(body, Direction::Right)
    }

    fn eat(length: i32, kind: FoodKind, rng: &mut dyn RandomSource) -> (Snake, FoodOutcome) {
        let mut snake = snake_of(length);
        snake.advance();
        let outcome = resolve_food_effect(&mut snake, kind, rng);
        (snake, outcome)
    }

    #[test]
    fn test_table_order_is_pinned() {
        assert_eq!(FOOD_SPAWN_TABLE[0], FoodKind::Apple);
        assert_eq!(FOOD_SPAWN_TABLE[8], FoodKind::Poison);
        assert_eq!(FOOD_SPAWN_TABLE[12], FoodKind::Magnet);
        let total: f64 = FOOD_SPAWN_TABLE.iter().map(|k| k.properties().spawn_weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_walks_cumulative_weights() {
        assert_eq!(select_food_kind(&mut SequenceRng::constant(0.0)), FoodKind::Apple);
        assert_eq!(select_food_kind(&mut SequenceRng::constant(0.21)), FoodKind::Apple);
        assert_eq!(select_food_kind(&mut SequenceRng::constant(0.23)), FoodKind::Golden);
        assert_eq!(select_food_kind(&mut SequenceRng::constant(0.28)), FoodKind::Berry);
        assert_eq!(select_food_kind(&mut SequenceRng::constant(0.97)), FoodKind::Magnet);
    }

    struct PastTheTable;

    impl RandomSource for PastTheTable {
        fn next_unit(&mut self) -> f64 {
            1.5
        }

        fn next_below(&mut self, _bound: usize) -> usize {
            0
        }
    }

    #[test]
    fn test_select_falls_back_to_apple() {
        assert_eq!(select_food_kind(&mut PastTheTable), FoodKind::Apple);
    }

    #[test]
    fn test_regular_food_grows_by_one_and_keeps_tail() {
        let mut rng = SequenceRng::constant(0.5);
        let (snake, outcome) = eat(5, FoodKind::Apple, &mut rng);
        assert_eq!(snake.len(), 6);
        assert_eq!(snake.tail(), Position::new(6, 10));
        assert_eq!(outcome.score_delta, 10);
        assert_eq!(outcome.length_change, 1);
    }

    #[test]
    fn test_golden_doubles_points_and_grows_two() {
        let mut rng = SequenceRng::constant(0.5);
        let (snake, outcome) = eat(5, FoodKind::Golden, &mut rng);
        assert_eq!(snake.len(), 7);
        assert_eq!(outcome.score_delta, 100);
    }

    #[test]
    fn test_mushroom_doubles_length() {
        let mut rng = SequenceRng::constant(0.5);
        let (snake, outcome) = eat(3, FoodKind::Mushroom, &mut rng);
        assert_eq!(snake.len(), 5);
        assert_eq!(outcome.score_delta, 5);

        let (snake, _) = eat(5, FoodKind::Mushroom, &mut rng);
        assert_eq!(snake.len(), 9);
    }

    #[test]
    fn test_poison_shrinks_with_floor() {
        let mut rng = SequenceRng::constant(0.5);
        let (snake, outcome) = eat(5, FoodKind::Poison, &mut rng);
        assert_eq!(snake.len(), 3);
        assert_eq!(outcome.score_delta, -10);

        let (snake, _) = eat(4, FoodKind::Poison, &mut rng);
        assert_eq!(snake.len(), 3);
        let (snake, _) = eat(3, FoodKind::Poison, &mut rng);
        assert_eq!(snake.len(), 3);
        let (snake, _) = eat(8, FoodKind::Poison, &mut rng);
        assert_eq!(snake.len(), 6);
    }

    #[test]
    fn test_bullet_and_magnet_grants() {
        let mut rng = SequenceRng::constant(0.99);
        let (snake, outcome) = eat(5, FoodKind::Bullet, &mut rng);
        assert_eq!(snake.len(), 6);
        assert_eq!(outcome.ammo_delta, 5);
        assert_eq!(outcome.score_delta, 20);

        let (snake, outcome) = eat(5, FoodKind::Magnet, &mut rng);
        assert_eq!(snake.len(), 6);
        assert_eq!(outcome.magnet_delta, 5);
    }

    #[test]
    fn test_random_grow_bonus() {
        // 0.99 draws the top of [1, 3].
        let mut rng = SequenceRng::constant(0.99);
        let (snake, outcome) = eat(5, FoodKind::Growth, &mut rng);
        assert_eq!(snake.len(), 8);
        assert_eq!(outcome.score_delta, 15 + 15);

        let mut rng = SequenceRng::constant(0.0);
        let (snake, outcome) = eat(5, FoodKind::Growth, &mut rng);
        assert_eq!(snake.len(), 6);
        assert_eq!(outcome.score_delta, 20);
    }

    #[test]
    fn test_random_shrink_floor() {
        let mut rng = SequenceRng::constant(0.99);
        let (snake, outcome) = eat(5, FoodKind::Shrink, &mut rng);
        assert_eq!(snake.len(), 3);
        assert_eq!(outcome.score_delta, -5);

        let mut rng = SequenceRng::constant(0.0);
        let (snake, _) = eat(5, FoodKind::Shrink, &mut rng);
        assert_eq!(snake.len(), 4);
    }

    #[test]
    fn test_score_never_negative() {
        let mut rng = SessionRng::new(9);
        let mut score = 0u32;
        for _ in 0..500 {
            let points = select_food_kind(&mut rng).points();
            let before = score;
            score = apply_score(score, points);
            assert_eq!(score as i64, (before as i64 + points as i64).max(0));
        }
        assert_eq!(apply_score(3, -10), 0);
        assert_eq!(apply_score(100, -10), 90);
    }

    #[test]
    fn test_spawn_food_respects_occupancy() {
        let mut rng = SessionRng::new(4);
        let food = spawn_food(20, &mut rng, |p| p.x >= 3).unwrap();
        assert!(food.position.x >= 3);
        assert!(spawn_food(20, &mut rng, |_| false).is_none());
    }
}
