use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use snake_arcade_common::config::{ConfigManager, FileContentConfigProvider, Validate, YamlConfigSerializer};
use crate::types::{Direction, Position};
use crate::walls::WallPattern;

pub const MIN_GRID_SIZE: i32 = 10;
pub const MAX_GRID_SIZE: i32 = 60;
pub const MAX_BOTS: usize = 5;
pub const STARTING_LENGTH: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl Speed {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(match self {
            Speed::Slow => 200,
            Speed::Normal => 120,
            Speed::Fast => 70,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl BotDifficulty {
    /// Multiplier on a bot's base move interval; lower is faster.
    pub fn interval_factor(&self) -> f64 {
        match self {
            BotDifficulty::Easy => 1.25,
            BotDifficulty::Medium => 1.0,
            BotDifficulty::Hard => 0.75,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Single,
    Multiplayer,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub grid_size: i32,
    pub speed: Speed,
    pub wall_pattern: WallPattern,
    pub max_foods: usize,
    pub teleport_enabled: bool,
    pub bots_enabled: bool,
    pub bot_count: usize,
    pub bot_difficulty: BotDifficulty,
    pub mode: GameMode,
    pub random_wall_count: usize,
    pub moving_wall_count: usize,
    pub wall_shift_interval_ms: u64,
    pub extra_food_chance: f64,
    pub teleport_cooldown_ms: u64,
    pub teleport_min_distance: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            grid_size: 20,
            speed: Speed::Normal,
            wall_pattern: WallPattern::Simple,
            max_foods: 3,
            teleport_enabled: false,
            bots_enabled: false,
            bot_count: 2,
            bot_difficulty: BotDifficulty::Medium,
            mode: GameMode::Single,
            random_wall_count: 15,
            moving_wall_count: 8,
            wall_shift_interval_ms: 10_000,
            extra_food_chance: 0.1,
            teleport_cooldown_ms: 5_000,
            teleport_min_distance: 5,
            seed: None,
        }
    }
}

impl Validate for GameSettings {
    fn validate(&self) -> Result<(), String> {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(format!(
                "Grid size must be between {} and {}",
                MIN_GRID_SIZE, MAX_GRID_SIZE
            ));
        }
        if self.max_foods < 1 || self.max_foods > 20 {
            return Err("Max food count must be between 1 and 20".to_string());
        }
        if self.bots_enabled && !(1..=MAX_BOTS).contains(&self.bot_count) {
            return Err(format!("Bot count must be between 1 and {}", MAX_BOTS));
        }
        if self.random_wall_count > 200 || self.moving_wall_count > 200 {
            return Err("Wall count must not exceed 200".to_string());
        }
        if self.wall_shift_interval_ms < 100 {
            return Err("Wall shift interval must be at least 100ms".to_string());
        }
        if !(0.0..=1.0).contains(&self.extra_food_chance) {
            return Err("Extra food chance must be between 0.0 and 1.0".to_string());
        }
        if self.teleport_min_distance < 0 {
            return Err("Teleport minimum distance must not be negative".to_string());
        }
        Ok(())
    }
}

impl GameSettings {
    pub fn is_multiplayer(&self) -> bool {
        self.mode == GameMode::Multiplayer
    }

    pub fn tick_interval(&self) -> Duration {
        self.speed.tick_interval()
    }

    pub fn player_one_spawn(&self) -> (Position, Direction) {
        let center = self.grid_size / 2;
        (Position::new(center, center), Direction::Right)
    }

    pub fn player_two_spawn(&self) -> (Position, Direction) {
        let corner = self.grid_size / 2 - 2;
        (Position::new(corner, corner), Direction::Right)
    }

    pub fn first_food_position(&self) -> Position {
        let cell = self.grid_size * 3 / 4;
        Position::new(cell, cell)
    }

    /// Cells generated walls must never cover: both spawn heads and the first
    /// food, regardless of mode.
    pub fn forbidden_cells(&self) -> Vec<Position> {
        vec![
            self.player_one_spawn().0,
            self.player_two_spawn().0,
            self.first_food_position(),
        ]
    }
}

pub fn settings_manager(
    path: impl Into<PathBuf>,
) -> ConfigManager<FileContentConfigProvider, GameSettings, YamlConfigSerializer> {
    ConfigManager::from_yaml_file(path)
}

/// Reads settings from a YAML file; a missing file yields the defaults.
pub fn load_settings(path: impl Into<PathBuf>) -> Result<GameSettings, String> {
    settings_manager(path).get_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use snake_arcade_common::config::{ConfigSerializer, InMemoryContentProvider};

    #[test]
    fn test_defaults_are_valid() {
        assert!(GameSettings::default().validate().is_ok());
    }

    #[test]
    fn test_speed_intervals() {
        assert_eq!(Speed::Slow.tick_interval(), Duration::from_millis(200));
        assert_eq!(Speed::Normal.tick_interval(), Duration::from_millis(120));
        assert_eq!(Speed::Fast.tick_interval(), Duration::from_millis(70));
    }

    #[test]
    fn test_invalid_grid_is_rejected() {
        let settings = GameSettings {
            grid_size: 0,
            ..GameSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err("Grid size must be between 10 and 60".to_string())
        );
    }

    #[test]
    fn test_bot_count_only_checked_when_enabled() {
        let mut settings = GameSettings {
            bot_count: 9,
            ..GameSettings::default()
        };
        assert!(settings.validate().is_ok());
        settings.bots_enabled = true;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_spawn_layout_scales_with_grid() {
        let settings = GameSettings {
            grid_size: 30,
            ..GameSettings::default()
        };
        assert_eq!(settings.player_one_spawn().0, Position::new(15, 15));
        assert_eq!(settings.player_two_spawn().0, Position::new(13, 13));
        assert_eq!(settings.first_food_position(), Position::new(22, 22));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let serializer = YamlConfigSerializer::new();
        let settings: GameSettings = serializer
            .deserialize("grid_size: 25\nspeed: fast\nwall_pattern: maze\nmode: multiplayer\n")
            .unwrap();
        assert_eq!(settings.grid_size, 25);
        assert_eq!(settings.speed, Speed::Fast);
        assert_eq!(settings.wall_pattern, WallPattern::Maze);
        assert!(settings.is_multiplayer());
        assert_eq!(settings.max_foods, 3);
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn test_manager_rejects_invalid_file_content() {
        let manager = ConfigManager::new(
            InMemoryContentProvider::with_content("grid_size: 5\n"),
            YamlConfigSerializer::new(),
        );
        let result: Result<GameSettings, String> = manager.get_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let mut path = std::env::temp_dir();
        path.push(format!("snake_arcade_missing_{}.yaml", std::process::id()));
        let settings = load_settings(path).unwrap();
        assert_eq!(settings, GameSettings::default());
    }
}
