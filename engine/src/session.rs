use std::fmt;
use std::future::Future;
use std::time::Duration;
use ringbuffer::{AllocRingBuffer, RingBuffer};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval};

use snake_arcade_common::config::{ConfigContentProvider, Validate};
use snake_arcade_common::{SessionRng, log, log_warn};
use crate::clock::GameClock;
use crate::events::{MatchOutcome, TickEvent};
use crate::game_state::{GameProgress, TickInput};
use crate::progression::{MatchReport, MatchStats, ProgressionStore};
use crate::settings::{GameMode, GameSettings};
use crate::snake::TeleportKind;
use crate::types::{Direction, PlayerSlot};

pub const EVENT_HISTORY_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GamePhase {
    Menu,
    Playing,
    Paused,
    GameOver,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GamePhase::Menu => write!(f, "menu"),
            GamePhase::Playing => write!(f, "playing"),
            GamePhase::Paused => write!(f, "paused"),
            GamePhase::GameOver => write!(f, "game over"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    InvalidSettings(String),
    InvalidTransition { from: GamePhase, action: &'static str },
    Snapshot(String),
    Persistence(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidSettings(e) => write!(f, "Invalid settings: {}", e),
            SessionError::InvalidTransition { from, action } => {
                write!(f, "Cannot {} while in {}", action, from)
            }
            SessionError::Snapshot(e) => write!(f, "Snapshot error: {}", e),
            SessionError::Persistence(e) => write!(f, "Persistence error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Direction(PlayerSlot, Direction),
    Fire(PlayerSlot),
    Teleport(PlayerSlot, TeleportKind),
    Pause,
    Resume,
    Quit,
}

/// Input collected between ticks. Directions overwrite each other; fire and
/// teleport stay set until the next drain.
#[derive(Debug, Default)]
struct InputQueue {
    pending: TickInput,
}

impl InputQueue {
    fn push(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Direction(slot, direction) => {
                self.pending.player_mut(slot).direction = Some(direction);
            }
            SessionCommand::Fire(slot) => self.pending.player_mut(slot).fire = true,
            SessionCommand::Teleport(slot, kind) => {
                self.pending.player_mut(slot).teleport = Some(kind);
            }
            SessionCommand::Pause | SessionCommand::Resume | SessionCommand::Quit => {}
        }
    }

    fn drain(&mut self) -> TickInput {
        std::mem::take(&mut self.pending)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchSummary {
    pub mode: GameMode,
    /// `None` when the match was abandoned before it ended.
    pub outcome: Option<MatchOutcome>,
    pub scores: Vec<(PlayerSlot, u32)>,
    pub ticks: u64,
    pub duration_ms: u64,
    pub stats: MatchStats,
}

impl MatchSummary {
    pub fn score(&self, slot: PlayerSlot) -> u32 {
        self.scores
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, score)| *score)
            .unwrap_or(0)
    }
}

/// Seed for a match restored at `tick`. Snapshots do not carry generator
/// state, so every restore of the same seeded snapshot replays the same stream.
fn resume_seed(seed: u64, tick: u64) -> u64 {
    seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// One player's view of a match: phase machine, game clock, queued input and
/// the current snapshot.
pub struct MatchSession {
    settings: GameSettings,
    phase: GamePhase,
    clock: GameClock,
    rng: SessionRng,
    inputs: InputQueue,
    progress: Option<GameProgress>,
    history: AllocRingBuffer<TickEvent>,
    stats: MatchStats,
}

impl MatchSession {
    pub fn new(settings: GameSettings) -> Result<Self, SessionError> {
        settings.validate().map_err(SessionError::InvalidSettings)?;
        let rng = match settings.seed {
            Some(seed) => SessionRng::new(seed),
            None => SessionRng::from_random(),
        };
        Ok(Self {
            settings,
            phase: GamePhase::Menu,
            clock: GameClock::new(),
            rng,
            inputs: InputQueue::default(),
            progress: None,
            history: AllocRingBuffer::new(EVENT_HISTORY_SIZE),
            stats: MatchStats::default(),
        })
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn progress(&self) -> Option<&GameProgress> {
        self.progress.as_ref()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Most recent events, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TickEvent> {
        self.history.iter()
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    fn transition(&mut self, to: GamePhase) {
        log!("Session {} -> {}", self.phase, to);
        self.phase = to;
    }

    /// Lays out a new match from the menu or straight after a finished one.
    pub fn start(&mut self) -> Result<&GameProgress, SessionError> {
        if !matches!(self.phase, GamePhase::Menu | GamePhase::GameOver) {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                action: "start",
            });
        }

        let progress = GameProgress::new(&self.settings, &mut self.rng)
            .map_err(SessionError::InvalidSettings)?;
        self.stats = MatchStats::default();
        if let Some(player) = progress.player(PlayerSlot::One) {
            self.stats.record_length(player.snake.len());
        }
        self.history.clear();
        self.inputs = InputQueue::default();
        self.clock.start();
        self.transition(GamePhase::Playing);
        Ok(self.progress.insert(progress))
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.phase != GamePhase::Playing {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                action: "pause",
            });
        }
        self.clock.pause();
        self.transition(GamePhase::Paused);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.phase != GamePhase::Paused {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                action: "resume",
            });
        }
        self.clock.resume();
        self.transition(GamePhase::Playing);
        Ok(())
    }

    /// Drops the current match, finished or not.
    pub fn return_to_menu(&mut self) -> Result<(), SessionError> {
        if self.phase == GamePhase::Menu {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                action: "return to menu",
            });
        }
        self.clock.pause();
        self.progress = None;
        self.inputs = InputQueue::default();
        self.transition(GamePhase::Menu);
        Ok(())
    }

    /// Queues player input for the next tick. Input outside of play is
    /// dropped; pause and resume go through the phase machine.
    pub fn handle(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::Pause => self.pause(),
            SessionCommand::Resume => self.resume(),
            SessionCommand::Quit => self.return_to_menu(),
            input => {
                if self.phase == GamePhase::Playing {
                    self.inputs.push(input);
                }
                Ok(())
            }
        }
    }

    /// Runs one simulation step with `elapsed` real time since the previous
    /// one. Does nothing unless the match is being played.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<TickEvent> {
        if self.phase != GamePhase::Playing {
            return Vec::new();
        }
        let Some(progress) = self.progress.as_mut() else {
            return Vec::new();
        };

        self.clock.advance(elapsed);
        let input = self.inputs.drain();
        let events = progress.apply_tick(&input, self.clock.now_ms(), &mut self.rng);

        self.stats.observe_all(PlayerSlot::One, &events);
        if let Some(player) = progress.player(PlayerSlot::One) {
            self.stats.record_length(player.snake.len());
        }
        self.stats.survival_ms = self.clock.now_ms();
        for event in &events {
            self.history.enqueue(event.clone());
        }

        if progress.is_over() {
            self.clock.pause();
            self.transition(GamePhase::GameOver);
        }
        events
    }

    pub fn snapshot(&self) -> Result<String, SessionError> {
        let progress = self.progress.as_ref().ok_or_else(|| {
            SessionError::Snapshot("No match in progress".to_string())
        })?;
        progress.to_yaml().map_err(SessionError::Snapshot)
    }

    /// Loads a saved match. An unfinished match comes back paused.
    pub fn restore(&mut self, snapshot: &str) -> Result<(), SessionError> {
        if !matches!(self.phase, GamePhase::Menu | GamePhase::GameOver) {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                action: "restore",
            });
        }

        let progress = GameProgress::from_yaml(snapshot).map_err(SessionError::Snapshot)?;
        if let Some(seed) = progress.settings.seed {
            self.rng = SessionRng::new(resume_seed(seed, progress.tick));
        }
        self.clock.restore(Duration::from_millis(progress.now_ms));
        self.settings = progress.settings.clone();
        self.stats = MatchStats::default();
        self.history.clear();
        self.inputs = InputQueue::default();
        let phase = if progress.is_over() {
            GamePhase::GameOver
        } else {
            GamePhase::Paused
        };
        self.progress = Some(progress);
        self.transition(phase);
        Ok(())
    }

    pub fn summary(&self) -> MatchSummary {
        let (outcome, scores, ticks) = match &self.progress {
            Some(progress) => (
                progress.outcome,
                progress.players.iter().map(|p| (p.slot, p.score)).collect(),
                progress.tick,
            ),
            None => (None, Vec::new(), 0),
        };
        MatchSummary {
            mode: self.settings.mode,
            outcome,
            scores,
            ticks,
            duration_ms: self.clock.now_ms(),
            stats: self.stats.clone(),
        }
    }

    /// Folds a finished match into the player's progression and saves it.
    pub fn record_progression<P: ConfigContentProvider>(
        &self,
        store: &mut ProgressionStore<P>,
    ) -> Result<MatchReport, SessionError> {
        if self.phase != GamePhase::GameOver {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                action: "record progression",
            });
        }
        let summary = self.summary();
        let report = store.record_match(
            &summary.stats,
            summary.score(PlayerSlot::One),
            summary.mode,
        );
        store.save().map_err(SessionError::Persistence)?;
        Ok(report)
    }
}

/// Receives every tick of a running match. Implementations render, play
/// sounds or forward state elsewhere.
pub trait GameListener: Send + Sync {
    fn on_tick(
        &self,
        progress: &GameProgress,
        events: &[TickEvent],
    ) -> impl Future<Output = ()> + Send;

    fn on_phase_change(&self, phase: GamePhase) -> impl Future<Output = ()> + Send;

    fn on_match_end(&self, summary: &MatchSummary) -> impl Future<Output = ()> + Send;
}

/// Drives a [`MatchSession`] off a fixed-rate timer until the match ends or
/// the player quits.
pub struct SessionRunner<L: GameListener> {
    session: MatchSession,
    listener: L,
}

impl<L: GameListener> SessionRunner<L> {
    pub fn new(session: MatchSession, listener: L) -> Self {
        Self { session, listener }
    }

    pub fn session(&self) -> &MatchSession {
        &self.session
    }

    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) -> Result<MatchSummary, SessionError> {
        if self.session.phase() != GamePhase::Playing && self.session.phase() != GamePhase::Paused {
            self.session.start()?;
        }
        self.listener.on_phase_change(self.session.phase()).await;

        let mut tick_timer = interval(self.session.settings().tick_interval());
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                _ = tick_timer.tick() => {
                    if self.session.phase() != GamePhase::Playing {
                        continue;
                    }

                    let now = Instant::now();
                    let events = self.session.tick(now - last_tick);
                    last_tick = now;

                    if let Some(progress) = self.session.progress() {
                        self.listener.on_tick(progress, &events).await;
                    }

                    if self.session.phase() == GamePhase::GameOver {
                        self.listener.on_phase_change(GamePhase::GameOver).await;
                        break;
                    }
                }
                command = commands.recv() => {
                    match command {
                        None | Some(SessionCommand::Quit) => {
                            log!("Player left the match");
                            break;
                        }
                        Some(SessionCommand::Resume) => {
                            match self.session.resume() {
                                Ok(()) => {
                                    last_tick = Instant::now();
                                    tick_timer.reset();
                                    self.listener.on_phase_change(GamePhase::Playing).await;
                                }
                                Err(e) => log_warn!("{}", e),
                            }
                        }
                        Some(SessionCommand::Pause) => {
                            match self.session.pause() {
                                Ok(()) => self.listener.on_phase_change(GamePhase::Paused).await,
                                Err(e) => log_warn!("{}", e),
                            }
                        }
                        Some(input) => self.session.handle(input)?,
                    }
                }
            }
        }

        let summary = self.session.summary();
        self.listener.on_match_end(&summary).await;
        Ok(summary)
    }
}
