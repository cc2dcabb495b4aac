use serde::{Deserialize, Serialize};

use crate::food::FoodKind;
use crate::snake::TeleportKind;
use crate::types::{PlayerSlot, Position, Winner};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionKind {
    Boundary,
    Wall,
    SelfBody,
    OtherSnake,
    Bot,
    HeadToHead,
    Bullet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Solo { score: u32 },
    Decided { winner: Winner },
}

impl MatchOutcome {
    pub fn winner(&self) -> Option<Winner> {
        match self {
            MatchOutcome::Solo { .. } => None,
            MatchOutcome::Decided { winner } => Some(*winner),
        }
    }
}

/// Discrete things that happened during one tick, in the order they happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickEvent {
    FoodEaten {
        player: PlayerSlot,
        food: FoodKind,
        position: Position,
        score_delta: i32,
        length: usize,
    },
    FoodSpawned {
        food: FoodKind,
        position: Position,
    },
    AmmoGained {
        player: PlayerSlot,
        amount: u32,
    },
    MagnetGained {
        player: PlayerSlot,
        amount: u32,
    },
    ScoreChanged {
        player: PlayerSlot,
        delta: i32,
        total: u32,
    },
    BulletFired {
        owner: PlayerSlot,
        position: Position,
    },
    WallDestroyed {
        position: Position,
        by: PlayerSlot,
    },
    BulletImpact {
        target: PlayerSlot,
        owner: PlayerSlot,
        position: Position,
    },
    TeleportUsed {
        player: PlayerSlot,
        teleport: TeleportKind,
        from: Position,
        to: Position,
    },
    WallsShifted {
        changed_cells: usize,
    },
    Collision {
        player: PlayerSlot,
        collision: CollisionKind,
        position: Position,
    },
    GameOver {
        outcome: MatchOutcome,
    },
}

impl TickEvent {
    pub fn is_game_over(&self) -> bool {
        matches!(self, TickEvent::GameOver { .. })
    }
}
