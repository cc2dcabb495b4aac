use std::collections::HashSet;
use serde::{Deserialize, Serialize};

use snake_arcade_common::{RandomSource, log_debug};
use snake_arcade_common::rng::pick;
use crate::geometry::{euclidean, in_bounds, random_free_cell};
use crate::settings::BotDifficulty;
use crate::types::{Direction, Position};

pub const CHASER_AGGRO_RANGE: f64 = 6.0;
pub const GUARD_AGGRO_RANGE: f64 = 4.0;
pub const GUARD_LEASH: f64 = 3.0;
pub const RANDOM_TURN_CHANCE: f64 = 0.3;
const SPAWN_ATTEMPTS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotKind {
    Wanderer,
    Chaser,
    Guard,
    Patrol,
    Random,
}

impl BotKind {
    pub const ALL: [BotKind; 5] = [
        BotKind::Wanderer,
        BotKind::Chaser,
        BotKind::Guard,
        BotKind::Patrol,
        BotKind::Random,
    ];

    pub fn base_move_interval_ms(&self) -> u64 {
        match self {
            BotKind::Wanderer => 800,
            BotKind::Chaser => 600,
            BotKind::Guard => 1000,
            BotKind::Patrol => 700,
            BotKind::Random => 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BotBehavior {
    Wanderer,
    Chaser { aggro_range: f64 },
    Guard { home: Position, aggro_range: f64 },
    Patrol { waypoints: Vec<Position>, index: usize },
    Random,
}

impl BotBehavior {
    pub fn kind(&self) -> BotKind {
        match self {
            BotBehavior::Wanderer => BotKind::Wanderer,
            BotBehavior::Chaser { .. } => BotKind::Chaser,
            BotBehavior::Guard { .. } => BotKind::Guard,
            BotBehavior::Patrol { .. } => BotKind::Patrol,
            BotBehavior::Random => BotKind::Random,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    pub id: u32,
    pub position: Position,
    pub direction: Direction,
    pub move_interval_ms: u64,
    /// Game-clock time of the last step.
    pub last_move_ms: u64,
    pub behavior: BotBehavior,
}

impl Bot {
    pub fn kind(&self) -> BotKind {
        self.behavior.kind()
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_move_ms) >= self.move_interval_ms
    }
}

pub struct BotController;

impl BotController {
    /// Places a bot of `kind` on a random free cell, or `None` if no free cell
    /// turned up.
    pub fn spawn(
        id: u32,
        kind: BotKind,
        grid_size: i32,
        difficulty: BotDifficulty,
        now_ms: u64,
        rng: &mut dyn RandomSource,
        is_free: impl Fn(Position) -> bool,
    ) -> Option<Bot> {
        let position = random_free_cell(grid_size, SPAWN_ATTEMPTS, rng, is_free)?;
        let direction = *pick(rng, &Direction::ALL)?;

        let behavior = match kind {
            BotKind::Wanderer => BotBehavior::Wanderer,
            BotKind::Chaser => BotBehavior::Chaser {
                aggro_range: CHASER_AGGRO_RANGE,
            },
            BotKind::Guard => BotBehavior::Guard {
                home: position,
                aggro_range: GUARD_AGGRO_RANGE,
            },
            BotKind::Patrol => {
                let count = rng.inclusive(3, 5) as usize;
                let waypoints = (0..count)
                    .map(|_| {
                        Position::new(
                            rng.next_below(grid_size as usize) as i32,
                            rng.next_below(grid_size as usize) as i32,
                        )
                    })
                    .collect();
                BotBehavior::Patrol { waypoints, index: 0 }
            }
            BotKind::Random => BotBehavior::Random,
        };

        let move_interval_ms =
            (kind.base_move_interval_ms() as f64 * difficulty.interval_factor()).round() as u64;

        Some(Bot {
            id,
            position,
            direction,
            move_interval_ms,
            last_move_ms: now_ms,
            behavior,
        })
    }

    /// Spawns up to `count` bots of random kinds on distinct cells outside
    /// `occupied`.
    pub fn spawn_bots(
        count: usize,
        grid_size: i32,
        difficulty: BotDifficulty,
        now_ms: u64,
        occupied: &HashSet<Position>,
        rng: &mut dyn RandomSource,
    ) -> Vec<Bot> {
        let mut taken = occupied.clone();
        let mut bots = Vec::with_capacity(count);

        for id in 0..count as u32 {
            let Some(&kind) = pick(rng, &BotKind::ALL) else {
                break;
            };
            let spawned = Self::spawn(id, kind, grid_size, difficulty, now_ms, rng, |pos| {
                !taken.contains(&pos)
            });
            match spawned {
                Some(bot) => {
                    taken.insert(bot.position);
                    log_debug!("Spawned {:?} bot {} at {}", bot.kind(), bot.id, bot.position);
                    bots.push(bot);
                }
                None => log_debug!("No room for bot {}", id),
            }
        }

        bots
    }

    /// Steps every due bot once. Bots treat `obstacles` and each other as
    /// solid; `targets` are the player heads chasers hunt.
    pub fn update_all(
        bots: &mut [Bot],
        now_ms: u64,
        grid_size: i32,
        targets: &[Position],
        obstacles: &HashSet<Position>,
        rng: &mut dyn RandomSource,
    ) -> usize {
        let mut blocked = obstacles.clone();
        blocked.extend(bots.iter().map(|bot| bot.position));

        let mut moved = 0;
        for bot in bots.iter_mut() {
            let from = bot.position;
            if Self::update(bot, now_ms, grid_size, targets, &blocked, rng) {
                blocked.remove(&from);
                blocked.insert(bot.position);
                moved += 1;
            }
        }
        moved
    }

    /// Advances one bot if its move interval has elapsed. Returns whether it
    /// stepped. A trapped bot stays put and picks a fresh heading.
    pub fn update(
        bot: &mut Bot,
        now_ms: u64,
        grid_size: i32,
        targets: &[Position],
        blocked: &HashSet<Position>,
        rng: &mut dyn RandomSource,
    ) -> bool {
        if !bot.is_due(now_ms) {
            return false;
        }

        let valid = Self::valid_moves(bot.position, grid_size, blocked);
        if valid.is_empty() {
            if let Some(&direction) = pick(rng, &Direction::ALL) {
                bot.direction = direction;
            }
            return false;
        }

        let Some(direction) = Self::choose_direction(bot, targets, &valid, rng) else {
            return false;
        };

        bot.direction = direction;
        bot.position = bot.position.step(direction);
        bot.last_move_ms = now_ms;
        true
    }

    fn choose_direction(
        bot: &mut Bot,
        targets: &[Position],
        valid: &[Direction],
        rng: &mut dyn RandomSource,
    ) -> Option<Direction> {
        let position = bot.position;
        let heading = bot.direction;

        match &mut bot.behavior {
            BotBehavior::Wanderer => pick(rng, valid).copied(),
            BotBehavior::Chaser { aggro_range } => {
                let nearest = targets.iter().copied().min_by(|a, b| {
                    euclidean(position, *a).total_cmp(&euclidean(position, *b))
                });
                match nearest {
                    Some(target) if euclidean(position, target) <= *aggro_range => {
                        Self::steer(position, target, valid, rng)
                    }
                    _ => pick(rng, valid).copied(),
                }
            }
            BotBehavior::Guard { home, .. } => {
                if euclidean(position, *home) > GUARD_LEASH {
                    Self::steer(position, *home, valid, rng)
                } else {
                    pick(rng, valid).copied()
                }
            }
            BotBehavior::Patrol { waypoints, index } => {
                let Some(&target) = waypoints.get(*index) else {
                    return pick(rng, valid).copied();
                };
                if euclidean(position, target) <= 1.0 {
                    *index = (*index + 1) % waypoints.len();
                    pick(rng, valid).copied()
                } else {
                    Self::steer(position, target, valid, rng)
                }
            }
            BotBehavior::Random => {
                if rng.chance(RANDOM_TURN_CHANCE) || !valid.contains(&heading) {
                    pick(rng, valid).copied()
                } else {
                    Some(heading)
                }
            }
        }
    }

    pub fn valid_moves(from: Position, grid_size: i32, blocked: &HashSet<Position>) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|direction| {
                let next = from.step(*direction);
                in_bounds(next, grid_size) && !blocked.contains(&next)
            })
            .collect()
    }

    /// Headings that close in on `to`: the axis with the larger gap first
    /// (x on ties), then the other axis.
    pub fn directions_towards(from: Position, to: Position) -> Vec<Direction> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let horizontal = Direction::from_delta(dx.signum(), 0);
        let vertical = Direction::from_delta(0, dy.signum());

        let ordered = if dx.abs() >= dy.abs() {
            [horizontal, vertical]
        } else {
            [vertical, horizontal]
        };
        ordered.into_iter().flatten().collect()
    }

    fn steer(
        from: Position,
        to: Position,
        valid: &[Direction],
        rng: &mut dyn RandomSource,
    ) -> Option<Direction> {
        Self::directions_towards(from, to)
            .into_iter()
            .find(|direction| valid.contains(direction))
            .or_else(|| pick(rng, valid).copied())
    }
}
