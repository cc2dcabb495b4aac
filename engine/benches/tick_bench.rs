use criterion::{criterion_group, criterion_main, Criterion, SamplingMode};
use std::hint::black_box;
use std::time::Duration;
use snake_arcade::{
    BotDifficulty, Direction, GameMode, GameProgress, GameSettings, PlayerSlot, TickInput,
    WallPattern,
};
use snake_arcade_common::SessionRng;

fn busy_settings() -> GameSettings {
    GameSettings {
        grid_size: 40,
        wall_pattern: WallPattern::Moving,
        moving_wall_count: 40,
        wall_shift_interval_ms: 500,
        max_foods: 10,
        teleport_enabled: true,
        bots_enabled: true,
        bot_count: 5,
        bot_difficulty: BotDifficulty::Hard,
        mode: GameMode::Multiplayer,
        seed: Some(42),
        ..GameSettings::default()
    }
}

/// Plays until the match ends or 500 ticks pass, circling both snakes.
fn bench_full_match() {
    let settings = busy_settings();
    let mut rng = SessionRng::new(42);
    let Ok(mut progress) = GameProgress::new(&settings, &mut rng) else {
        return;
    };

    for tick in 1..=500u64 {
        let direction = Direction::ALL[(tick / 4 % 4) as usize];
        let mut input = TickInput::steer(PlayerSlot::One, direction);
        input.player_mut(PlayerSlot::Two).direction = Some(direction.opposite());
        input.player_mut(PlayerSlot::One).fire = tick % 3 == 0;
        progress.apply_tick(&input, tick * 70, &mut rng);
        if progress.is_over() {
            break;
        }
    }
}

fn bench_single_step(progress: &GameProgress) {
    let mut rng = SessionRng::new(7);
    let input = TickInput::steer(PlayerSlot::One, Direction::Down);
    black_box(progress.step(&input, progress.now_ms + 70, &mut rng));
}

fn tick_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    group
        .sampling_mode(SamplingMode::Flat)
        .sample_size(20)
        .measurement_time(Duration::from_secs(20));

    group.bench_function("full_match", |b| {
        b.iter(bench_full_match)
    });

    let mut rng = SessionRng::new(42);
    if let Ok(progress) = GameProgress::new(&busy_settings(), &mut rng) {
        group.bench_function("single_step", |b| {
            b.iter(|| bench_single_step(&progress))
        });
    }

    group.finish();
}

criterion_group!(benches, tick_bench);
criterion_main!(benches);
