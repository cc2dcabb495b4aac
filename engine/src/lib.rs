pub mod bots;
pub mod bullets;
pub mod clock;
pub mod events;
pub mod food;
pub mod game_state;
pub mod geometry;
pub mod progression;
pub mod session;
pub mod settings;
pub mod snake;
pub mod types;
pub mod walls;

pub use bots::{Bot, BotBehavior, BotController, BotKind};
pub use bullets::Bullet;
pub use clock::GameClock;
pub use events::{CollisionKind, MatchOutcome, TickEvent};
pub use food::{Food, FoodEffect, FoodKind, FoodOutcome};
pub use game_state::{GameProgress, Player, PlayerInput, TickInput, TickOutcome};
pub use progression::{MatchStats, ProgressionData, ProgressionStore};
pub use session::{
    GameListener, GamePhase, MatchSession, MatchSummary, SessionCommand, SessionError,
    SessionRunner,
};
pub use settings::{BotDifficulty, GameMode, GameSettings, Speed};
pub use snake::{Snake, TeleportKind};
pub use types::{Direction, PlayerSlot, Position, Winner};
pub use walls::WallPattern;
