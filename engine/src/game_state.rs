use std::collections::HashSet;
use serde::{Deserialize, Serialize};

use snake_arcade_common::config::{ConfigSerializer, Validate, YamlConfigSerializer};
use snake_arcade_common::{RandomSource, log, log_debug};
use crate::bots::{Bot, BotController};
use crate::bullets::{self, Bullet};
use crate::events::{CollisionKind, MatchOutcome, TickEvent};
use crate::food::{Food, FoodKind, apply_score, resolve_food_effect, spawn_food};
use crate::geometry::{in_bounds, is_occupied};
use crate::settings::{GameSettings, STARTING_LENGTH};
use crate::snake::{
    Obstacles, Snake, TeleportKind, check_collision, directional_teleport, random_teleport,
};
use crate::types::{Direction, PlayerSlot, Position, Winner};
use crate::walls::{
    WallPattern, generate_moving_walls, generate_random_walls, move_walls, static_pattern,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub slot: PlayerSlot,
    pub snake: Snake,
    pub score: u32,
    pub ammo: u32,
    pub magnet_charges: u32,
    pub teleport_cooldown_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defeated: Option<CollisionKind>,
}

impl Player {
    pub fn new(slot: PlayerSlot, snake: Snake) -> Self {
        Self {
            slot,
            snake,
            score: 0,
            ammo: 0,
            magnet_charges: 0,
            teleport_cooldown_ms: 0,
            defeated: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.defeated.is_none()
    }
}

/// Actions queued by one player since the previous tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerInput {
    pub direction: Option<Direction>,
    pub fire: bool,
    pub teleport: Option<TeleportKind>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickInput {
    pub players: [PlayerInput; 2],
}

impl TickInput {
    pub fn player(&self, slot: PlayerSlot) -> &PlayerInput {
        &self.players[slot.index()]
    }

    pub fn player_mut(&mut self, slot: PlayerSlot) -> &mut PlayerInput {
        &mut self.players[slot.index()]
    }

    pub fn steer(slot: PlayerSlot, direction: Direction) -> Self {
        let mut input = Self::default();
        input.player_mut(slot).direction = Some(direction);
        input
    }
}

#[derive(Clone, Debug)]
pub struct TickOutcome {
    pub progress: GameProgress,
    pub events: Vec<TickEvent>,
}

/// The authoritative match snapshot. Everything a tick reads or writes lives
/// here, so a saved snapshot resumes exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameProgress {
    pub settings: GameSettings,
    pub players: Vec<Player>,
    pub foods: Vec<Food>,
    pub walls: Vec<Position>,
    pub bullets: Vec<Bullet>,
    pub bots: Vec<Bot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MatchOutcome>,
    pub tick: u64,
    /// Game-clock time of the last applied tick.
    pub now_ms: u64,
    pub last_wall_shift_ms: u64,
}

impl GameProgress {
    /// Lays out a fresh match. Fails only on invalid settings.
    pub fn new(settings: &GameSettings, rng: &mut dyn RandomSource) -> Result<Self, String> {
        settings.validate()?;

        let (head, direction) = settings.player_one_spawn();
        let mut players = vec![Player::new(
            PlayerSlot::One,
            Snake::new(head, direction, STARTING_LENGTH),
        )];
        if settings.is_multiplayer() {
            let (head, direction) = settings.player_two_spawn();
            players.push(Player::new(
                PlayerSlot::Two,
                Snake::new(head, direction, STARTING_LENGTH),
            ));
        }

        let mut forbidden = settings.forbidden_cells();
        forbidden.extend(players.iter().flat_map(|p| p.snake.body.iter().copied()));
        let grid_size = settings.grid_size;
        let walls = match settings.wall_pattern {
            WallPattern::Random => {
                generate_random_walls(settings.random_wall_count, grid_size, &forbidden, rng)
            }
            WallPattern::Moving => {
                generate_moving_walls(settings.moving_wall_count, grid_size, &forbidden, rng)
            }
            pattern => static_pattern(pattern, grid_size, &forbidden),
        };

        let first_food = Food {
            spawned_at_ms: Some(0),
            ..Food::new(settings.first_food_position(), FoodKind::Apple)
        };

        let mut progress = Self {
            settings: settings.clone(),
            players,
            foods: vec![first_food],
            walls,
            bullets: Vec::new(),
            bots: Vec::new(),
            outcome: None,
            tick: 0,
            now_ms: 0,
            last_wall_shift_ms: 0,
        };

        while progress.foods.len() < settings.max_foods {
            let Some(food) = progress.place_food(rng) else {
                break;
            };
            progress.foods.push(food);
        }

        if settings.bots_enabled {
            let occupied = progress.occupied_cells();
            progress.bots = BotController::spawn_bots(
                settings.bot_count,
                grid_size,
                settings.bot_difficulty,
                0,
                &occupied,
                rng,
            );
        }

        log!(
            "New {:?} match on {}x{} grid: {} walls, {} foods, {} bots",
            settings.mode,
            grid_size,
            grid_size,
            progress.walls.len(),
            progress.foods.len(),
            progress.bots.len()
        );
        Ok(progress)
    }

    pub fn player(&self, slot: PlayerSlot) -> Option<&Player> {
        self.players.iter().find(|p| p.slot == slot)
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn winner(&self) -> Option<Winner> {
        self.outcome.and_then(|outcome| outcome.winner())
    }

    pub fn food_at(&self, pos: Position) -> Option<&Food> {
        self.foods.iter().find(|food| food.position == pos)
    }

    /// Pure transition: returns the next snapshot and leaves `self` untouched.
    pub fn step(&self, input: &TickInput, now_ms: u64, rng: &mut dyn RandomSource) -> TickOutcome {
        let mut progress = self.clone();
        let events = progress.apply_tick(input, now_ms, rng);
        TickOutcome { progress, events }
    }

    /// Advances the match by one tick at game-clock time `now_ms`. A finished
    /// match is left as is.
    pub fn apply_tick(
        &mut self,
        input: &TickInput,
        now_ms: u64,
        rng: &mut dyn RandomSource,
    ) -> Vec<TickEvent> {
        let mut events = Vec::new();
        if self.is_over() {
            return events;
        }

        let delta_ms = now_ms.saturating_sub(self.now_ms);
        self.now_ms = now_ms;
        self.tick += 1;
        for player in &mut self.players {
            player.teleport_cooldown_ms = player.teleport_cooldown_ms.saturating_sub(delta_ms);
        }

        self.apply_inputs(input, rng, &mut events);
        self.move_snakes(rng, &mut events);
        self.resolve_bullets(input, &mut events);
        self.update_bots(rng, &mut events);
        self.shift_walls(rng, &mut events);
        self.resolve_outcome(&mut events);
        events
    }

    pub fn to_yaml(&self) -> Result<String, String> {
        YamlConfigSerializer::new().serialize(self)
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let progress: GameProgress = YamlConfigSerializer::new().deserialize(content)?;
        progress.settings.validate()?;
        if progress.players.iter().any(|p| p.snake.is_empty()) {
            return Err("Snapshot contains an empty snake".to_string());
        }
        Ok(progress)
    }

    fn apply_inputs(&mut self, input: &TickInput, rng: &mut dyn RandomSource, events: &mut Vec<TickEvent>) {
        for index in 0..self.players.len() {
            let player = &mut self.players[index];
            if !player.is_alive() {
                continue;
            }
            let command = input.player(player.slot);
            if let Some(direction) = command.direction {
                player.snake.turn(direction);
            }
            if let Some(kind) = command.teleport
                && self.settings.teleport_enabled
                && player.teleport_cooldown_ms == 0
            {
                self.teleport(index, kind, rng, events);
            }
        }
    }

    fn teleport(
        &mut self,
        index: usize,
        kind: TeleportKind,
        rng: &mut dyn RandomSource,
        events: &mut Vec<TickEvent>,
    ) {
        let walls: HashSet<Position> = self.walls.iter().copied().collect();
        let grid_size = self.settings.grid_size;
        let snake = &self.players[index].snake;
        let other = self.opponent_snake(index);
        let from = snake.head();

        let target = match kind {
            TeleportKind::Random => random_teleport(
                snake,
                &walls,
                other,
                grid_size,
                self.settings.teleport_min_distance,
                rng,
            ),
            TeleportKind::Directional => Some(directional_teleport(
                snake,
                snake.direction,
                &walls,
                other,
                grid_size,
            )),
        };

        let Some(to) = target.filter(|to| *to != from) else {
            log_debug!("No teleport target for {}", self.players[index].slot);
            return;
        };

        let player = &mut self.players[index];
        player.snake.relocate_head(to);
        player.teleport_cooldown_ms = self.settings.teleport_cooldown_ms;
        events.push(TickEvent::TeleportUsed {
            player: player.slot,
            teleport: kind,
            from,
            to,
        });
        log!("{} teleported from {} to {}", player.slot, from, to);
    }

    fn move_snakes(&mut self, rng: &mut dyn RandomSource, events: &mut Vec<TickEvent>) {
        let walls: HashSet<Position> = self.walls.iter().copied().collect();
        let bot_cells: Vec<Position> = self.bots.iter().map(|bot| bot.position).collect();
        let alive: Vec<usize> = (0..self.players.len())
            .filter(|index| self.players[*index].is_alive())
            .collect();

        let mut collisions = Vec::new();
        for &index in &alive {
            let snake = &self.players[index].snake;
            let head = snake.next_head();
            let growing = self
                .food_at(head)
                .is_some_and(|food| food.kind.effect().keeps_tail());
            let obstacles = Obstacles {
                grid_size: self.settings.grid_size,
                walls: &walls,
                other_snake: self.opponent_snake(index),
                bots: &bot_cells,
            };
            if let Some(kind) = check_collision(head, snake, growing, &obstacles) {
                collisions.push((index, kind, head));
            }
        }

        if let [first, second] = alive[..] {
            let head = self.players[first].snake.next_head();
            if head == self.players[second].snake.next_head() {
                collisions.retain(|(index, ..)| *index != first && *index != second);
                collisions.push((first, CollisionKind::HeadToHead, head));
                collisions.push((second, CollisionKind::HeadToHead, head));
            }
        }

        for (index, kind, position) in collisions {
            let player = &mut self.players[index];
            player.defeated = Some(kind);
            events.push(TickEvent::Collision {
                player: player.slot,
                collision: kind,
                position,
            });
            log!("{} crashed at {} ({:?})", player.slot, position, kind);
        }

        for index in alive {
            if !self.players[index].is_alive() {
                continue;
            }
            let head = self.players[index].snake.advance();
            match self.foods.iter().position(|food| food.position == head) {
                Some(food_index) => {
                    let food = self.foods.remove(food_index);
                    self.eat(index, food, rng, events);
                }
                None => {
                    self.players[index].snake.pop_tail();
                }
            }
        }

        if self.foods.len() < self.settings.max_foods && rng.chance(self.settings.extra_food_chance) {
            self.spawn_into_field(rng, events);
        }
    }

    fn eat(&mut self, index: usize, food: Food, rng: &mut dyn RandomSource, events: &mut Vec<TickEvent>) {
        let player = &mut self.players[index];
        let outcome = resolve_food_effect(&mut player.snake, food.kind, rng);
        let previous = player.score;
        player.score = apply_score(player.score, outcome.score_delta);
        player.ammo += outcome.ammo_delta;
        player.magnet_charges += outcome.magnet_delta;

        let slot = player.slot;
        events.push(TickEvent::FoodEaten {
            player: slot,
            food: food.kind,
            position: food.position,
            score_delta: outcome.score_delta,
            length: player.snake.len(),
        });
        events.push(TickEvent::ScoreChanged {
            player: slot,
            delta: (player.score as i64 - previous as i64) as i32,
            total: player.score,
        });
        if outcome.ammo_delta > 0 {
            events.push(TickEvent::AmmoGained {
                player: slot,
                amount: outcome.ammo_delta,
            });
        }
        if outcome.magnet_delta > 0 {
            events.push(TickEvent::MagnetGained {
                player: slot,
                amount: outcome.magnet_delta,
            });
        }
        log_debug!(
            "{} ate {:?} at {}, length {}",
            slot,
            food.kind,
            food.position,
            player.snake.len()
        );

        if self.foods.len() < self.settings.max_foods {
            self.spawn_into_field(rng, events);
        }
    }

    fn resolve_bullets(&mut self, input: &TickInput, events: &mut Vec<TickEvent>) {
        let grid_size = self.settings.grid_size;
        let mut fired = Vec::new();
        for player in self.players.iter_mut().filter(|p| p.is_alive()) {
            if !input.player(player.slot).fire || player.ammo == 0 {
                continue;
            }
            player.ammo -= 1;
            let bullet = Bullet::fire(player.snake.head(), player.snake.direction, player.slot);
            events.push(TickEvent::BulletFired {
                owner: player.slot,
                position: bullet.position,
            });
            fired.push(bullet);
        }

        bullets::advance(&mut self.bullets, grid_size);
        self.bullets
            .extend(fired.into_iter().filter(|bullet| in_bounds(bullet.position, grid_size)));

        for (position, by) in bullets::resolve_wall_hits(&mut self.bullets, &mut self.walls) {
            events.push(TickEvent::WallDestroyed { position, by });
            log!("{} shot down the wall at {}", by, position);
        }

        let hits = {
            let snakes: Vec<(PlayerSlot, &Snake)> =
                self.players.iter().map(|p| (p.slot, &p.snake)).collect();
            bullets::resolve_snake_hits(&mut self.bullets, &snakes)
        };
        for hit in hits {
            events.push(TickEvent::BulletImpact {
                target: hit.target,
                owner: hit.owner,
                position: hit.position,
            });
            if let Some(player) = self.players.iter_mut().find(|p| p.slot == hit.target)
                && player.is_alive()
            {
                player.defeated = Some(CollisionKind::Bullet);
                events.push(TickEvent::Collision {
                    player: player.slot,
                    collision: CollisionKind::Bullet,
                    position: hit.position,
                });
                log!("{} was shot by {} at {}", player.slot, hit.owner, hit.position);
            }
        }
    }

    fn update_bots(&mut self, rng: &mut dyn RandomSource, events: &mut Vec<TickEvent>) {
        if self.bots.is_empty() {
            return;
        }

        let mut blocked: HashSet<Position> = self.walls.iter().copied().collect();
        for player in &self.players {
            blocked.extend(player.snake.body.iter().skip(1).copied());
        }
        let targets: Vec<Position> = self
            .players
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| p.snake.head())
            .collect();

        BotController::update_all(
            &mut self.bots,
            self.now_ms,
            self.settings.grid_size,
            &targets,
            &blocked,
            rng,
        );

        for player in self.players.iter_mut().filter(|p| p.is_alive()) {
            let head = player.snake.head();
            if self.bots.iter().any(|bot| bot.position == head) {
                player.defeated = Some(CollisionKind::Bot);
                events.push(TickEvent::Collision {
                    player: player.slot,
                    collision: CollisionKind::Bot,
                    position: head,
                });
                log!("{} was caught by a bot at {}", player.slot, head);
            }
        }
    }

    fn shift_walls(&mut self, rng: &mut dyn RandomSource, events: &mut Vec<TickEvent>) {
        if self.settings.wall_pattern != WallPattern::Moving
            || self.now_ms.saturating_sub(self.last_wall_shift_ms) < self.settings.wall_shift_interval_ms
        {
            return;
        }
        self.last_wall_shift_ms = self.now_ms;

        let mut occupied: HashSet<Position> = self
            .players
            .iter()
            .flat_map(|p| p.snake.body.iter().copied())
            .collect();
        occupied.extend(self.foods.iter().map(|food| food.position));
        occupied.extend(self.bots.iter().map(|bot| bot.position));
        // Walls never land on a live bullet.
        occupied.extend(self.bullets.iter().map(|bullet| bullet.position));

        let previous: HashSet<Position> = self.walls.iter().copied().collect();
        let shifted = move_walls(&self.walls, &occupied, self.settings.grid_size, rng);
        let changed_cells = shifted.iter().filter(|cell| !previous.contains(cell)).count();
        self.walls = shifted;

        events.push(TickEvent::WallsShifted { changed_cells });
        log_debug!("Walls shifted, {} cells changed", changed_cells);
    }

    fn resolve_outcome(&mut self, events: &mut Vec<TickEvent>) {
        let outcome = if self.settings.is_multiplayer() && self.players.len() > 1 {
            let defeated: Vec<PlayerSlot> = self
                .players
                .iter()
                .filter(|p| !p.is_alive())
                .map(|p| p.slot)
                .collect();
            match defeated[..] {
                [] => return,
                [loser] => MatchOutcome::Decided {
                    winner: Winner::Player(loser.other()),
                },
                _ => MatchOutcome::Decided { winner: Winner::Tie },
            }
        } else {
            match self.players.first() {
                Some(player) if !player.is_alive() => MatchOutcome::Solo {
                    score: player.score,
                },
                _ => return,
            }
        };

        self.outcome = Some(outcome);
        events.push(TickEvent::GameOver { outcome });
        log!("Game over after {} ticks: {:?}", self.tick, outcome);
    }

    fn opponent_snake(&self, index: usize) -> Option<&Snake> {
        self.players
            .iter()
            .enumerate()
            .find(|(other, _)| *other != index)
            .map(|(_, player)| &player.snake)
    }

    fn is_free(&self, pos: Position) -> bool {
        !is_occupied(pos, &self.walls)
            && self.food_at(pos).is_none()
            && !self.players.iter().any(|p| p.snake.occupies(pos))
            && !self.bots.iter().any(|bot| bot.position == pos)
    }

    fn occupied_cells(&self) -> HashSet<Position> {
        let mut cells: HashSet<Position> = self.walls.iter().copied().collect();
        cells.extend(self.foods.iter().map(|food| food.position));
        cells.extend(self.players.iter().flat_map(|p| p.snake.body.iter().copied()));
        cells.extend(self.bots.iter().map(|bot| bot.position));
        cells
    }

    fn place_food(&self, rng: &mut dyn RandomSource) -> Option<Food> {
        let mut food = spawn_food(self.settings.grid_size, rng, |pos| self.is_free(pos))?;
        food.spawned_at_ms = Some(self.now_ms);
        Some(food)
    }

    fn spawn_into_field(&mut self, rng: &mut dyn RandomSource, events: &mut Vec<TickEvent>) {
        match self.place_food(rng) {
            Some(food) => {
                events.push(TickEvent::FoodSpawned {
                    food: food.kind,
                    position: food.position,
                });
                log_debug!("Spawned {:?} at {}", food.kind, food.position);
                self.foods.push(food);
            }
            None => log_debug!("No free cell for food"),
        }
    }
}
