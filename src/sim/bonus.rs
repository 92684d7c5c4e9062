//! Bonus level rule sets
//!
//! A bonus level is a normal [`Game`] whose bricks are driven by one of six
//! rule sets. Each variant of [`BonusRules`] carries its own parameters and
//! every rule runs through [`apply_bonus_rules`]; the rest of the engine
//! only raises events.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::grid::{Brick, BrickGrid, BrickKind, is_brick_area};
use super::state::{Game, LevelOutcome};
use super::timer::{Counter, CounterMode};
use crate::consts::*;

/// Bricks reaching this row end the level (barrier, invaders)
pub const DANGER_ROW: i32 = EDIT_HEIGHT as i32 + 1;

pub const BARRIER_MAX_SIZE: u32 = 12;
pub const BARRIER_MOVE_MS: u32 = 6_000;
pub const BARRIER_PRIZE: i32 = 1_000;

pub const DUCK_TARGETS: u32 = 25;
pub const DUCK_MAX_PRIZE: i32 = 1_000;
pub const DUCK_MIN_PRIZE: i32 = 100;
/// Prize lost per 100 ms
pub const DUCK_DECAY: i32 = 10;

pub const INVADER_SPAWN_MS: u32 = 1_000;
pub const INVADER_PRIZE: i32 = 100;

pub const OUTBREAK_SPREAD_MS: u32 = 500;
pub const OUTBREAK_SIM_LIMIT: u32 = 30;
pub const OUTBREAK_START_CELLS: u32 = 3;

pub const HUNTER_TIME_MS: u32 = 20_000;
pub const HUNTER_MAX_PRIZE: i32 = 2_000;

pub const JACK_JUMP_MS: u32 = 4_000;
pub const JACK_TIME_MS: u32 = 60_000;
pub const JACK_MAX_PRIZE: i32 = 1_000;

/// Bonus level types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonusKind {
    Barrier,
    SittingDucks,
    Invaders,
    Outbreak,
    Hunter,
    JumpingJack,
}

impl BonusKind {
    pub const ALL: [BonusKind; 6] = [
        BonusKind::JumpingJack,
        BonusKind::Outbreak,
        BonusKind::Barrier,
        BonusKind::SittingDucks,
        BonusKind::Hunter,
        BonusKind::Invaders,
    ];

    /// Level title marking this type
    pub fn title(self) -> &'static str {
        match self {
            BonusKind::Barrier => "!BARRIER!",
            BonusKind::SittingDucks => "!SITTING_DUCKS!",
            BonusKind::Invaders => "!INVADERS!",
            BonusKind::Outbreak => "!OUTBREAK!",
            BonusKind::Hunter => "!HUNTER!",
            BonusKind::JumpingJack => "!JUMPING_JACK!",
        }
    }

    pub fn from_title(title: &str) -> Option<Self> {
        let title = title.trim();
        Self::ALL.into_iter().find(|k| k.title() == title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierRules {
    /// Completed barriers + 1
    pub level: u32,
    pub move_timer: Counter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuckRules {
    pub hits: u32,
    pub prize: i32,
    pub decay: Counter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvaderRules {
    pub wave: u32,
    pub killed: u32,
    /// Kills needed to finish the wave
    pub limit: u32,
    pub spawn: Counter,
    pub step: Counter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutbreakRules {
    pub wave: u32,
    /// Infections so far this wave
    pub infections: u32,
    /// Infections that make the wave fail
    pub limit: u32,
    pub spread: Counter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HunterRules {
    pub hits: u32,
    pub time_left: Counter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JackRules {
    pub hits: u32,
    pub jump: Counter,
    pub time_left: Counter,
    pub target: Option<(i32, i32)>,
}

/// Rule set of the running bonus level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BonusRules {
    Barrier(BarrierRules),
    SittingDucks(DuckRules),
    Invaders(InvaderRules),
    Outbreak(OutbreakRules),
    Hunter(HunterRules),
    JumpingJack(JackRules),
}

/// Things the engine tells the rules about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusEvent {
    /// Level just started
    Setup,
    Tick(u32),
    BrickRemoved { x: i32, y: i32 },
}

impl InvaderRules {
    fn for_wave(wave: u32) -> Self {
        let step_ms = 2_000u32.saturating_sub(150 * wave).max(600);
        Self {
            wave,
            killed: 0,
            limit: 10 + 5 * wave,
            spawn: Counter::timeout(INVADER_SPAWN_MS),
            step: Counter::timeout(step_ms),
        }
    }

    /// Invaders on the field at once
    fn cap(&self) -> u32 {
        (5 + self.wave).min(12)
    }
}

impl OutbreakRules {
    fn for_wave(wave: u32) -> Self {
        Self {
            wave,
            infections: 0,
            limit: 20 + 5 * wave,
            spread: Counter::timeout(OUTBREAK_SPREAD_MS),
        }
    }

    fn spread_chance(&self) -> f64 {
        (0.2 + 0.05 * self.wave as f64).min(0.6)
    }
}

impl BonusRules {
    pub fn new(kind: BonusKind) -> Self {
        match kind {
            BonusKind::Barrier => BonusRules::Barrier(BarrierRules {
                level: 1,
                move_timer: Counter::timeout(BARRIER_MOVE_MS),
            }),
            BonusKind::SittingDucks => BonusRules::SittingDucks(DuckRules {
                hits: 0,
                prize: DUCK_MAX_PRIZE,
                decay: Counter::smooth(CounterMode::Repeat, 0.0, 1.0, 100.0),
            }),
            BonusKind::Invaders => BonusRules::Invaders(InvaderRules::for_wave(0)),
            BonusKind::Outbreak => BonusRules::Outbreak(OutbreakRules::for_wave(0)),
            BonusKind::Hunter => BonusRules::Hunter(HunterRules {
                hits: 0,
                time_left: Counter::timeout(HUNTER_TIME_MS),
            }),
            BonusKind::JumpingJack => BonusRules::JumpingJack(JackRules {
                hits: 0,
                jump: Counter::smooth(CounterMode::Repeat, 0.0, 1.0, JACK_JUMP_MS as f64),
                time_left: Counter::timeout(JACK_TIME_MS),
                target: None,
            }),
        }
    }

    pub fn kind(&self) -> BonusKind {
        match self {
            BonusRules::Barrier(_) => BonusKind::Barrier,
            BonusRules::SittingDucks(_) => BonusKind::SittingDucks,
            BonusRules::Invaders(_) => BonusKind::Invaders,
            BonusRules::Outbreak(_) => BonusKind::Outbreak,
            BonusRules::Hunter(_) => BonusKind::Hunter,
            BonusRules::JumpingJack(_) => BonusKind::JumpingJack,
        }
    }

    /// Status line shown while the level runs
    pub fn info(&self, bricks_left: u32) -> String {
        match self {
            BonusRules::Barrier(r) => {
                format!("Level: {}, Size: {}/{}", r.level, barrier_size(r.level), BARRIER_MAX_SIZE)
            }
            BonusRules::SittingDucks(r) => {
                format!("Total Hits: {}, Current Prize: {}", r.hits, r.prize)
            }
            BonusRules::Invaders(r) => format!(
                "Wave: {}, Invaders: {}/{} (Active: {})",
                r.wave + 1,
                r.killed,
                r.limit,
                bricks_left
            ),
            BonusRules::Outbreak(r) => format!(
                "Wave: {}, Infections: {}/{}, Active: {}/{}",
                r.wave + 1,
                r.infections,
                r.limit,
                bricks_left,
                OUTBREAK_SIM_LIMIT
            ),
            BonusRules::Hunter(r) => format!(
                "Hits: {}, Current Prize: {}, Time: {} secs",
                r.hits,
                hunter_prize(r),
                r.time_left.remaining_ms() / 1000
            ),
            BonusRules::JumpingJack(r) => format!(
                "Hits: {}, Current Prize: {}, Time: {} secs",
                r.hits,
                jack_prize(r),
                r.time_left.remaining_ms() / 1000
            ),
        }
    }
}

fn barrier_size(level: u32) -> u32 {
    (level + 2).min(BARRIER_MAX_SIZE)
}

fn hunter_prize(r: &HunterRules) -> i32 {
    (HUNTER_MAX_PRIZE as i64 * r.time_left.remaining_ms() as i64 / HUNTER_TIME_MS as i64) as i32
}

fn jack_prize(r: &JackRules) -> i32 {
    (JACK_MAX_PRIZE as i64 * r.time_left.remaining_ms() as i64 / JACK_TIME_MS as i64) as i32
}

fn target_brick(id: u8) -> Brick {
    Brick::new(BrickKind::Regular, id, 1, 0)
}

/// Put a brick on a random vacant tile of the brick area (rows limited to
/// `rows`); gives up after a bounded number of tries
fn place_random(game: &mut Game, brick: Brick, rows: std::ops::RangeInclusive<i32>) -> Option<(i32, i32)> {
    for _ in 0..64 {
        let x = game.rng.random_range(1..=EDIT_WIDTH as i32);
        let y = game.rng.random_range(rows.clone());
        if game.grid.get(x, y).is_some_and(|b| b.is_vacant()) && !game.ball_overlaps_tile(x, y) {
            game.grid.place(x, y, brick);
            return Some((x, y));
        }
    }
    None
}

/// Clear every brick of the brick area
fn clear_area(grid: &mut BrickGrid) {
    for x in 1..=EDIT_WIDTH as i32 {
        for y in 1..MAP_HEIGHT as i32 - 1 {
            grid.clear(x, y);
        }
    }
}

/// Move every brick of the area one row down; returns the lowest occupied
/// row afterwards. Nothing moves while a ball sits on a tile a brick would
/// enter (None).
fn shift_down(game: &mut Game) -> Option<i32> {
    let occupied: Vec<(i32, i32)> = (1..DANGER_ROW)
        .flat_map(|y| (1..=EDIT_WIDTH as i32).map(move |x| (x, y)))
        .filter(|&(x, y)| game.grid.get(x, y).is_some_and(|b| !b.is_empty()))
        .collect();
    if occupied.iter().any(|&(x, y)| game.ball_overlaps_tile(x, y + 1)) {
        log::trace!("Row shift deferred, ball in the way");
        return None;
    }

    let mut lowest = 0;
    for &(x, y) in occupied.iter().rev() {
        let Some(brick) = game.grid.get(x, y).copied() else {
            continue;
        };
        game.grid.clear(x, y);
        game.grid.place(x, y + 1, brick);
        lowest = lowest.max(y + 1);
    }
    Some(lowest)
}

fn fail(game: &mut Game, why: &str) {
    log::info!("Bonus level failed: {}", why);
    game.level_over = Some(LevelOutcome::Lost);
}

fn build_barrier(game: &mut Game, level: u32) {
    clear_area(&mut game.grid);
    for y in 1..=barrier_size(level) as i32 {
        for x in 1..=EDIT_WIDTH as i32 {
            game.grid.place(x, y, target_brick(((x + y) % 9 + 2) as u8));
        }
    }
}

fn barrier(game: &mut Game, r: &mut BarrierRules, event: BonusEvent) {
    match event {
        BonusEvent::Setup => build_barrier(game, r.level),
        BonusEvent::Tick(ms) => {
            // An expired timer keeps retrying a deferred shift
            if r.move_timer.update(ms) || r.move_timer.expired() {
                if let Some(lowest) = shift_down(game) {
                    r.move_timer.reset();
                    if lowest >= DANGER_ROW {
                        fail(game, "barrier reached the paddle");
                    }
                }
            }
        }
        BonusEvent::BrickRemoved { .. } => {
            if game.grid.bricks_left() == 0 {
                game.paddle.score += BARRIER_PRIZE * r.level as i32;
                r.level += 1;
                r.move_timer.reset();
                build_barrier(game, r.level);
            }
        }
    }
}

fn sitting_ducks(game: &mut Game, r: &mut DuckRules, event: BonusEvent) {
    match event {
        BonusEvent::Setup => {
            place_random(game, target_brick(5), 1..=EDIT_HEIGHT as i32);
        }
        BonusEvent::Tick(ms) => {
            // Counter wraps once per 100 ms
            let mut left = ms;
            while left > 0 {
                let step = left.min(100);
                if r.decay.update(step) {
                    r.prize = (r.prize - DUCK_DECAY).max(DUCK_MIN_PRIZE);
                }
                left -= step;
            }
        }
        BonusEvent::BrickRemoved { .. } => {
            game.paddle.score += r.prize;
            r.hits += 1;
            r.prize = DUCK_MAX_PRIZE;
            if r.hits >= DUCK_TARGETS {
                game.level_over = Some(LevelOutcome::Won);
            } else {
                place_random(game, target_brick(5), 1..=EDIT_HEIGHT as i32);
            }
        }
    }
}

fn invaders(game: &mut Game, r: &mut InvaderRules, event: BonusEvent) {
    match event {
        BonusEvent::Setup => clear_area(&mut game.grid),
        BonusEvent::Tick(ms) => {
            if r.spawn.update(ms) {
                r.spawn.reset();
                let active = game.grid.bricks_left();
                if active < r.cap() && r.killed + active < r.limit {
                    place_random(game, target_brick(9), 1..=1);
                }
            }
            if r.step.update(ms) || r.step.expired() {
                if let Some(lowest) = shift_down(game) {
                    r.step.reset();
                    if lowest >= DANGER_ROW {
                        fail(game, "invaders landed");
                    }
                }
            }
        }
        BonusEvent::BrickRemoved { .. } => {
            r.killed += 1;
            game.paddle.score += INVADER_PRIZE * (r.wave as i32 + 1);
            if r.killed >= r.limit {
                log::debug!("Invader wave {} done", r.wave + 1);
                *r = InvaderRules::for_wave(r.wave + 1);
                clear_area(&mut game.grid);
            }
        }
    }
}

fn seed_outbreak(game: &mut Game) {
    for _ in 0..OUTBREAK_START_CELLS {
        place_random(game, target_brick(7), 1..=EDIT_HEIGHT as i32);
    }
}

fn outbreak(game: &mut Game, r: &mut OutbreakRules, event: BonusEvent) {
    match event {
        BonusEvent::Setup => {
            clear_area(&mut game.grid);
            seed_outbreak(game);
        }
        BonusEvent::Tick(ms) => {
            if !r.spread.update(ms) {
                return;
            }
            r.spread.reset();
            let cells: Vec<(i32, i32)> = game
                .grid
                .iter()
                .filter(|(_, _, b)| b.counts_for_clear())
                .map(|(x, y, _)| (x, y))
                .collect();
            let chance = r.spread_chance();
            for (x, y) in cells {
                if game.grid.bricks_left() >= OUTBREAK_SIM_LIMIT {
                    break;
                }
                if !game.rng.random_bool(chance) {
                    continue;
                }
                let free: Vec<(i32, i32)> = BrickGrid::neighbours(x, y, 1)
                    .into_iter()
                    .filter(|&(nx, ny)| {
                        is_brick_area(nx, ny)
                            && game.grid.get(nx, ny).is_some_and(|b| b.is_vacant())
                            && !game.ball_overlaps_tile(nx, ny)
                    })
                    .collect();
                if free.is_empty() {
                    continue;
                }
                let (nx, ny) = free[game.rng.random_range(0..free.len())];
                game.grid.place(nx, ny, target_brick(7));
                r.infections += 1;
                if r.infections >= r.limit {
                    fail(game, "outbreak out of control");
                    return;
                }
            }
        }
        BonusEvent::BrickRemoved { .. } => {
            if game.grid.bricks_left() == 0 {
                game.paddle.score += 500 * (r.wave as i32 + 1);
                *r = OutbreakRules::for_wave(r.wave + 1);
                seed_outbreak(game);
            }
        }
    }
}

fn hunter(game: &mut Game, r: &mut HunterRules, event: BonusEvent) {
    match event {
        BonusEvent::Setup => {
            clear_area(&mut game.grid);
            place_random(game, target_brick(10), 1..=EDIT_HEIGHT as i32);
        }
        BonusEvent::Tick(ms) => {
            if r.time_left.update(ms) {
                fail(game, "hunter ran out of time");
            }
        }
        BonusEvent::BrickRemoved { .. } => {
            game.paddle.score += hunter_prize(r);
            r.hits += 1;
            r.time_left.reset();
            place_random(game, target_brick(10), 1..=EDIT_HEIGHT as i32);
        }
    }
}

fn jumping_jack(game: &mut Game, r: &mut JackRules, event: BonusEvent) {
    let rows = 1..=EDIT_HEIGHT as i32;
    match event {
        BonusEvent::Setup => {
            clear_area(&mut game.grid);
            r.target = place_random(game, target_brick(11), rows);
        }
        BonusEvent::Tick(ms) => {
            if r.time_left.update(ms) {
                log::info!("Jumping jack over with {} hits", r.hits);
                game.level_over = Some(LevelOutcome::Won);
                return;
            }
            if r.jump.update(ms) {
                if let Some((x, y)) = r.target.take() {
                    game.grid.clear(x, y);
                }
                r.target = place_random(game, target_brick(11), rows);
            }
        }
        BonusEvent::BrickRemoved { .. } => {
            game.paddle.score += jack_prize(r);
            r.hits += 1;
            r.jump.reset();
            r.target = place_random(game, target_brick(11), rows);
        }
    }
}

/// Run the bonus rules of `game` for an event (no-op on normal levels)
pub fn apply_bonus_rules(game: &mut Game, event: BonusEvent) {
    let Some(mut rules) = game.bonus.take() else {
        return;
    };
    match &mut rules {
        BonusRules::Barrier(r) => barrier(game, r, event),
        BonusRules::SittingDucks(r) => sitting_ducks(game, r, event),
        BonusRules::Invaders(r) => invaders(game, r, event),
        BonusRules::Outbreak(r) => outbreak(game, r, event),
        BonusRules::Hunter(r) => hunter(game, r, event),
        BonusRules::JumpingJack(r) => jumping_jack(game, r, event),
    }
    game.bonus = Some(rules);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::Level;
    use crate::sim::state::GameConfig;
    use glam::DVec2;

    fn bonus_game(kind: BonusKind) -> Game {
        Game::new(&Level::empty(kind.title(), "bonus"), GameConfig::default(), 5)
    }

    fn first_brick(game: &Game) -> (i32, i32) {
        game.grid
            .iter()
            .find(|(_, _, b)| b.counts_for_clear())
            .map(|(x, y, _)| (x, y))
            .expect("a target brick")
    }

    #[test]
    fn test_title_roundtrip() {
        for kind in BonusKind::ALL {
            assert_eq!(BonusKind::from_title(kind.title()), Some(kind));
        }
        assert_eq!(BonusKind::from_title("Level 1"), None);
    }

    #[test]
    fn test_barrier_setup_and_descent() {
        let mut g = bonus_game(BonusKind::Barrier);
        assert!(g.is_bonus_level());
        assert_eq!(g.bricks_left(), 3 * EDIT_WIDTH as u32);
        // Barrier rows 1..=3 need 16 moves to reach the danger row
        for _ in 0..(DANGER_ROW - 3 - 1) {
            apply_bonus_rules(&mut g, BonusEvent::Tick(BARRIER_MOVE_MS));
            assert_eq!(g.level_over, None);
        }
        apply_bonus_rules(&mut g, BonusEvent::Tick(BARRIER_MOVE_MS));
        assert_eq!(g.level_over, Some(LevelOutcome::Lost));
    }

    #[test]
    fn test_barrier_waits_for_ball_below() {
        let mut g = bonus_game(BonusKind::Barrier);
        let ball = &mut g.balls[0];
        ball.state = crate::sim::ball::BallState::Free;
        ball.pos = crate::tile_center(5, 4);
        ball.vel = DVec2::new(0.0, 0.3);

        apply_bonus_rules(&mut g, BonusEvent::Tick(BARRIER_MOVE_MS));
        assert!(!g.is_brick_at(5, 4), "no brick dropped onto the ball");
        assert!(g.is_brick_at(5, 3));

        g.balls[0].pos = crate::tile_center(5, 12);
        apply_bonus_rules(&mut g, BonusEvent::Tick(10));
        assert!(g.is_brick_at(5, 4));
        assert!(!g.is_brick_at(5, 1));
        assert_eq!(g.bricks_left(), 3 * EDIT_WIDTH as u32);
    }

    #[test]
    fn test_barrier_cleared_grows() {
        let mut g = bonus_game(BonusKind::Barrier);
        let targets: Vec<(i32, i32)> = g
            .grid
            .iter()
            .filter(|(_, _, b)| b.counts_for_clear())
            .map(|(x, y, _)| (x, y))
            .collect();
        for (x, y) in targets {
            g.remove_brick(x, y, DVec2::NEG_Y, false, false, None);
        }
        assert_eq!(g.paddle.score, BARRIER_PRIZE);
        assert_eq!(g.bricks_left(), 4 * EDIT_WIDTH as u32);
        assert!(g.bonus.as_ref().is_some_and(|b| b.info(0).starts_with("Level: 2, Size: 4/12")));
    }

    #[test]
    fn test_sitting_ducks_prize_decays() {
        let mut g = bonus_game(BonusKind::SittingDucks);
        assert_eq!(g.bricks_left(), 1);
        apply_bonus_rules(&mut g, BonusEvent::Tick(1_000));
        let (x, y) = first_brick(&g);
        g.remove_brick(x, y, DVec2::NEG_Y, false, false, None);
        assert_eq!(g.paddle.score, DUCK_MAX_PRIZE - 10 * DUCK_DECAY);
        assert_eq!(g.bricks_left(), 1, "next duck placed");
    }

    #[test]
    fn test_sitting_ducks_finish() {
        let mut g = bonus_game(BonusKind::SittingDucks);
        for _ in 0..DUCK_TARGETS {
            let (x, y) = first_brick(&g);
            g.remove_brick(x, y, DVec2::NEG_Y, false, false, None);
        }
        assert_eq!(g.level_over, Some(LevelOutcome::Won));
    }

    #[test]
    fn test_invaders_spawn_and_quota() {
        let mut g = bonus_game(BonusKind::Invaders);
        assert_eq!(g.bricks_left(), 0);
        apply_bonus_rules(&mut g, BonusEvent::Tick(INVADER_SPAWN_MS));
        assert_eq!(g.bricks_left(), 1);
        for _ in 0..10 {
            let (x, y) = first_brick(&g);
            g.remove_brick(x, y, DVec2::NEG_Y, false, false, None);
            apply_bonus_rules(&mut g, BonusEvent::Tick(INVADER_SPAWN_MS));
        }
        match &g.bonus {
            Some(BonusRules::Invaders(r)) => {
                assert_eq!(r.wave, 1);
                assert_eq!(r.limit, 15);
            }
            other => panic!("unexpected rules {other:?}"),
        }
    }

    #[test]
    fn test_outbreak_spreads_within_limit() {
        let mut g = bonus_game(BonusKind::Outbreak);
        assert_eq!(g.bricks_left(), OUTBREAK_START_CELLS);
        for _ in 0..200 {
            apply_bonus_rules(&mut g, BonusEvent::Tick(OUTBREAK_SPREAD_MS));
            assert!(g.bricks_left() <= OUTBREAK_SIM_LIMIT);
            if g.level_over.is_some() {
                break;
            }
        }
        assert_eq!(g.level_over, Some(LevelOutcome::Lost));
    }

    #[test]
    fn test_hunter_timeout_fails() {
        let mut g = bonus_game(BonusKind::Hunter);
        let (x, y) = first_brick(&g);
        apply_bonus_rules(&mut g, BonusEvent::Tick(HUNTER_TIME_MS / 2));
        g.remove_brick(x, y, DVec2::NEG_Y, false, false, None);
        assert_eq!(g.paddle.score, HUNTER_MAX_PRIZE / 2);
        apply_bonus_rules(&mut g, BonusEvent::Tick(HUNTER_TIME_MS));
        assert_eq!(g.level_over, Some(LevelOutcome::Lost));
    }

    #[test]
    fn test_jumping_jack_jumps_and_ends() {
        let mut g = bonus_game(BonusKind::JumpingJack);
        apply_bonus_rules(&mut g, BonusEvent::Tick(JACK_JUMP_MS));
        assert_eq!(g.bricks_left(), 1, "target moved, not duplicated");
        apply_bonus_rules(&mut g, BonusEvent::Tick(JACK_TIME_MS));
        assert_eq!(g.level_over, Some(LevelOutcome::Won));
    }
}
