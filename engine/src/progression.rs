use std::path::PathBuf;
use chrono::Local;
use serde::{Deserialize, Serialize};

use snake_arcade_common::config::{
    ConfigContentProvider, ConfigManager, FileContentConfigProvider, Validate, YamlConfigSerializer,
};
use snake_arcade_common::log;
use crate::events::TickEvent;
use crate::settings::GameMode;
use crate::types::PlayerSlot;

pub const HIGH_SCORE_SLOTS: usize = 5;
const PERFECT_GAME_SCORE: u32 = 500;

/// What one player did during a single match, folded from tick events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub foods_eaten: u32,
    pub walls_broken: u32,
    pub bullets_fired: u32,
    pub teleports: u32,
    pub longest_snake: usize,
    pub survival_ms: u64,
}

impl MatchStats {
    pub fn observe(&mut self, slot: PlayerSlot, event: &TickEvent) {
        match event {
            TickEvent::FoodEaten { player, length, .. } if *player == slot => {
                self.foods_eaten += 1;
                self.record_length(*length);
            }
            TickEvent::WallDestroyed { by, .. } if *by == slot => self.walls_broken += 1,
            TickEvent::BulletFired { owner, .. } if *owner == slot => self.bullets_fired += 1,
            TickEvent::TeleportUsed { player, .. } if *player == slot => self.teleports += 1,
            _ => {}
        }
    }

    pub fn observe_all<'a>(&mut self, slot: PlayerSlot, events: impl IntoIterator<Item = &'a TickEvent>) {
        for event in events {
            self.observe(slot, event);
        }
    }

    pub fn record_length(&mut self, length: usize) {
        self.longest_snake = self.longest_snake.max(length);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLevel {
    pub level: u32,
    pub experience: u64,
    pub experience_to_next: u64,
    pub total_experience: u64,
}

impl Default for PlayerLevel {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
            experience_to_next: experience_to_next(1),
            total_experience: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    pub total_games: u32,
    pub total_score: u64,
    pub highest_score: u32,
    pub total_foods_eaten: u64,
    pub total_walls_broken: u64,
    pub total_survival_ms: u64,
    pub perfect_games: u32,
    pub total_bullets_fired: u64,
    pub total_teleports: u64,
    pub longest_snake: usize,
    pub average_game_ms: u64,
    pub favorite_mode: GameMode,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionData {
    pub level: PlayerLevel,
    pub stats: PlayerStats,
    /// Best scores, highest first.
    pub high_scores: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_played: Option<String>,
}

impl Validate for ProgressionData {
    fn validate(&self) -> Result<(), String> {
        if self.level.level < 1 {
            return Err("Level must be at least 1".to_string());
        }
        if self.level.experience_to_next == 0 {
            return Err("Experience to next level must be positive".to_string());
        }
        if self.high_scores.len() > HIGH_SCORE_SLOTS {
            return Err(format!("At most {} high scores are kept", HIGH_SCORE_SLOTS));
        }
        if self.high_scores.windows(2).any(|pair| pair[0] < pair[1]) {
            return Err("High scores must be sorted from highest".to_string());
        }
        Ok(())
    }
}

/// Summary handed back after a match is recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchReport {
    pub experience_gained: u64,
    pub new_level: Option<u32>,
    pub new_high_score: bool,
}

pub fn experience_to_next(level: u32) -> u64 {
    (100.0 * 1.5_f64.powi(level.saturating_sub(1) as i32)).floor() as u64
}

pub fn match_experience(score: u32, stats: &MatchStats) -> u64 {
    let mut experience = (score / 10) as u64;
    experience += stats.survival_ms / 1000;
    experience += stats.foods_eaten as u64 * 2;

    if score >= 1000 {
        experience += 50;
    }
    if stats.survival_ms >= 60_000 {
        experience += 30;
    }
    if stats.longest_snake >= 20 {
        experience += 25;
    }
    experience
}

impl ProgressionData {
    /// Returns the new level if the gain crossed one or more thresholds.
    pub fn add_experience(&mut self, amount: u64) -> Option<u32> {
        let level = &mut self.level;
        level.experience += amount;
        level.total_experience += amount;

        let start = level.level;
        while level.experience >= level.experience_to_next {
            level.experience -= level.experience_to_next;
            level.level += 1;
            level.experience_to_next = experience_to_next(level.level);
        }
        (level.level > start).then_some(level.level)
    }

    pub fn record_match(&mut self, stats: &MatchStats, score: u32, mode: GameMode) -> MatchReport {
        let new_high_score = score > 0 && score > self.stats.highest_score;

        let totals = &mut self.stats;
        totals.total_games += 1;
        totals.total_score += score as u64;
        totals.highest_score = totals.highest_score.max(score);
        totals.total_foods_eaten += stats.foods_eaten as u64;
        totals.total_walls_broken += stats.walls_broken as u64;
        totals.total_survival_ms += stats.survival_ms;
        totals.total_bullets_fired += stats.bullets_fired as u64;
        totals.total_teleports += stats.teleports as u64;
        totals.longest_snake = totals.longest_snake.max(stats.longest_snake);
        totals.average_game_ms = totals.total_survival_ms / totals.total_games as u64;
        if score >= PERFECT_GAME_SCORE && stats.walls_broken == 0 {
            totals.perfect_games += 1;
        }
        totals.favorite_mode = mode;

        self.high_scores.push(score);
        self.high_scores.sort_unstable_by(|a, b| b.cmp(a));
        self.high_scores.truncate(HIGH_SCORE_SLOTS);

        let experience_gained = match_experience(score, stats);
        let new_level = self.add_experience(experience_gained);
        self.last_played = Some(Local::now().to_rfc3339());

        MatchReport {
            experience_gained,
            new_level,
            new_high_score,
        }
    }
}

/// Long-lived player progression, loaded and saved explicitly around matches.
pub struct ProgressionStore<P: ConfigContentProvider> {
    manager: ConfigManager<P, ProgressionData, YamlConfigSerializer>,
    data: ProgressionData,
}

impl ProgressionStore<FileContentConfigProvider> {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileContentConfigProvider::new(path))
    }
}

impl<P: ConfigContentProvider> ProgressionStore<P> {
    pub fn new(provider: P) -> Self {
        Self {
            manager: ConfigManager::new(provider, YamlConfigSerializer::new()),
            data: ProgressionData::default(),
        }
    }

    pub fn load(&mut self) -> Result<&ProgressionData, String> {
        self.data = self.manager.get_config()?;
        Ok(&self.data)
    }

    pub fn save(&self) -> Result<(), String> {
        self.manager.set_config(&self.data)
    }

    pub fn data(&self) -> &ProgressionData {
        &self.data
    }

    pub fn provider(&self) -> &P {
        self.manager.provider()
    }

    pub fn record_match(&mut self, stats: &MatchStats, score: u32, mode: GameMode) -> MatchReport {
        let report = self.data.record_match(stats, score, mode);
        log!(
            "Recorded match: score {}, +{} XP, level {}",
            score,
            report.experience_gained,
            self.data.level.level
        );
        report
    }
}
