//! Extras: falling pickups and the timed modifiers they start
//!
//! Every extra kind has one row in [`EXTRA_TABLE`] describing its scope,
//! duration, exclusion group and the effects run when it is collected and
//! when it runs out. Collection, expiry, `Disable` and `TimeAdd` only ever
//! walk this table; nothing else in the engine switches on the kind.

use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::Game;
use super::timer::Counter;
use crate::consts::*;

pub const EXTRA_COUNT: usize = 29;

/// Half extents of a falling extra
const EXTRA_HALF_SIZE: DVec2 = DVec2::new(BRICK_WIDTH / 2.0, BRICK_HEIGHT / 2.0);

/// All extra kinds, in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraKind {
    Score200,
    Score500,
    Score1000,
    Score2000,
    Score5000,
    Score10000,
    GoldShower,
    Lengthen,
    Shorten,
    Life,
    Slime,
    Metal,
    Ball,
    Wall,
    Frozen,
    Weapon,
    Random,
    Fast,
    Slow,
    Joker,
    Darkness,
    Chaos,
    GhostPaddle,
    Disable,
    TimeAdd,
    ExplBall,
    BonusMagnet,
    MalusMagnet,
    WeakBall,
}

impl ExtraKind {
    pub const ALL: [ExtraKind; EXTRA_COUNT] = [
        ExtraKind::Score200,
        ExtraKind::Score500,
        ExtraKind::Score1000,
        ExtraKind::Score2000,
        ExtraKind::Score5000,
        ExtraKind::Score10000,
        ExtraKind::GoldShower,
        ExtraKind::Lengthen,
        ExtraKind::Shorten,
        ExtraKind::Life,
        ExtraKind::Slime,
        ExtraKind::Metal,
        ExtraKind::Ball,
        ExtraKind::Wall,
        ExtraKind::Frozen,
        ExtraKind::Weapon,
        ExtraKind::Random,
        ExtraKind::Fast,
        ExtraKind::Slow,
        ExtraKind::Joker,
        ExtraKind::Darkness,
        ExtraKind::Chaos,
        ExtraKind::GhostPaddle,
        ExtraKind::Disable,
        ExtraKind::TimeAdd,
        ExtraKind::ExplBall,
        ExtraKind::BonusMagnet,
        ExtraKind::MalusMagnet,
        ExtraKind::WeakBall,
    ];

    #[inline]
    pub fn def(self) -> &'static ExtraDef {
        &EXTRA_TABLE[self as usize]
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn from_symbol(ch: u8) -> Option<Self> {
        EXTRA_TABLE.iter().find(|d| d.symbol == ch).map(|d| d.kind)
    }

    /// Level file character
    #[inline]
    pub fn symbol(self) -> u8 {
        self.def().symbol
    }

    #[inline]
    pub fn is_beneficial(self) -> bool {
        self.def().beneficial
    }
}

/// Who owns the timer of an extra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraScope {
    /// Applied once on collection
    Instant,
    /// Affects the whole game (all balls)
    Game,
    /// Affects the collecting paddle
    Paddle,
}

/// At most one member of a group is active at a time; the last one
/// collected wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionGroup {
    BallModifier,
    BallSpeed,
    Magnet,
}

/// Table row for one extra kind
pub struct ExtraDef {
    pub kind: ExtraKind,
    pub symbol: u8,
    pub beneficial: bool,
    pub scope: ExtraScope,
    pub duration_ms: u32,
    pub group: Option<ExclusionGroup>,
    pub on_collect: fn(&mut Game),
    pub on_expire: fn(&mut Game),
}

const fn instant(kind: ExtraKind, symbol: u8, beneficial: bool, on_collect: fn(&mut Game)) -> ExtraDef {
    ExtraDef {
        kind,
        symbol,
        beneficial,
        scope: ExtraScope::Instant,
        duration_ms: 0,
        group: None,
        on_collect,
        on_expire: noop,
    }
}

const fn timed(
    kind: ExtraKind,
    symbol: u8,
    beneficial: bool,
    scope: ExtraScope,
    duration_ms: u32,
    group: Option<ExclusionGroup>,
) -> ExtraDef {
    ExtraDef {
        kind,
        symbol,
        beneficial,
        scope,
        duration_ms,
        group,
        on_collect: noop,
        on_expire: noop,
    }
}

const DEFAULT_DURATION_MS: u32 = 20_000;

use ExclusionGroup::{BallModifier as Modifier, BallSpeed as Speed, Magnet};
use ExtraScope::{Game as G, Paddle as P};

pub static EXTRA_TABLE: [ExtraDef; EXTRA_COUNT] = [
    instant(ExtraKind::Score200, b'0', true, add_score::<200>),
    instant(ExtraKind::Score500, b'1', true, add_score::<500>),
    instant(ExtraKind::Score1000, b'2', true, add_score::<1000>),
    instant(ExtraKind::Score2000, b'3', true, add_score::<2000>),
    instant(ExtraKind::Score5000, b'4', true, add_score::<5000>),
    instant(ExtraKind::Score10000, b'5', true, add_score::<10000>),
    ExtraDef {
        on_collect: gold_shower_start,
        ..timed(ExtraKind::GoldShower, b'g', true, P, DEFAULT_DURATION_MS, None)
    },
    instant(ExtraKind::Lengthen, b'+', true, lengthen),
    instant(ExtraKind::Shorten, b'-', false, shorten),
    // Lives are owned by the session, which reads the collected list
    instant(ExtraKind::Life, b'l', true, noop),
    timed(ExtraKind::Slime, b's', true, P, DEFAULT_DURATION_MS, None),
    ExtraDef {
        on_collect: sync_balls,
        on_expire: sync_balls,
        ..timed(ExtraKind::Metal, b'm', true, G, 6_000, Some(Modifier))
    },
    instant(ExtraKind::Ball, b'b', true, extra_ball),
    timed(ExtraKind::Wall, b'w', true, P, 10_000, None),
    ExtraDef {
        on_collect: freeze,
        ..timed(ExtraKind::Frozen, b'f', false, P, 1_500, None)
    },
    timed(ExtraKind::Weapon, b'p', true, P, 5_000, None),
    instant(ExtraKind::Random, b'?', false, random_extra),
    timed(ExtraKind::Fast, b'>', false, G, DEFAULT_DURATION_MS, Some(Speed)),
    timed(ExtraKind::Slow, b'<', true, G, DEFAULT_DURATION_MS, Some(Speed)),
    instant(ExtraKind::Joker, b'j', true, joker),
    timed(ExtraKind::Darkness, b'd', false, G, DEFAULT_DURATION_MS, None),
    ExtraDef {
        on_collect: sync_balls,
        on_expire: sync_balls,
        ..timed(ExtraKind::Chaos, b'c', false, G, 10_000, None)
    },
    ExtraDef {
        on_expire: ghost_stop,
        ..timed(ExtraKind::GhostPaddle, b'~', false, P, DEFAULT_DURATION_MS, None)
    },
    instant(ExtraKind::Disable, b'!', false, disable_all),
    instant(ExtraKind::TimeAdd, b'&', true, time_add),
    ExtraDef {
        on_collect: sync_balls,
        on_expire: sync_balls,
        ..timed(ExtraKind::ExplBall, b'*', true, G, 10_000, Some(Modifier))
    },
    timed(ExtraKind::BonusMagnet, b'}', true, P, DEFAULT_DURATION_MS, Some(Magnet)),
    timed(ExtraKind::MalusMagnet, b'{', false, P, DEFAULT_DURATION_MS, Some(Magnet)),
    ExtraDef {
        on_collect: weak_start,
        on_expire: sync_balls,
        ..timed(ExtraKind::WeakBall, b'W', false, G, 10_000, Some(Modifier))
    },
];

fn noop(_: &mut Game) {}

fn add_score<const N: i32>(game: &mut Game) {
    game.paddle.score += N;
}

fn gold_shower_start(game: &mut Game) {
    game.gold_drop = Counter::timeout(GOLDSHOWER_DELAY_MS);
}

fn lengthen(game: &mut Game) {
    game.paddle.resize(PADDLE_SIZE_STEP);
}

fn shorten(game: &mut Game) {
    game.paddle.resize(-PADDLE_SIZE_STEP);
}

fn sync_balls(game: &mut Game) {
    game.sync_ball_modifiers();
}

fn weak_start(game: &mut Game) {
    for ball in &mut game.balls {
        ball.energy = WEAK_BALL_ENERGY;
    }
    game.sync_ball_modifiers();
}

fn extra_ball(game: &mut Game) {
    game.spawn_extra_ball();
}

fn freeze(game: &mut Game) {
    game.paddle.v_x = 0.0;
}

fn ghost_stop(game: &mut Game) {
    game.paddle.invisible = false;
}

fn random_extra(game: &mut Game) {
    // Any kind but Random itself
    let mut i = game.rng.random_range(0..EXTRA_COUNT - 1);
    if i >= ExtraKind::Random as usize {
        i += 1;
    }
    collect_extra(game, ExtraKind::ALL[i]);
}

fn joker(game: &mut Game) {
    let pool: Vec<ExtraKind> = ExtraKind::ALL
        .iter()
        .copied()
        .filter(|k| k.is_beneficial() && *k != ExtraKind::Joker)
        .collect();
    let kind = pool[game.rng.random_range(0..pool.len())];
    collect_extra(game, kind);
}

fn disable_all(game: &mut Game) {
    for kind in ExtraKind::ALL {
        expire_extra(game, kind);
    }
}

fn time_add(game: &mut Game) {
    game.active.extend_all(TIME_ADD_MS);
    game.paddle.extras.extend_all(TIME_ADD_MS);
}

/// Timers of the extras currently running in one scope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveExtras {
    timers: [Option<Counter>; EXTRA_COUNT],
}

impl ActiveExtras {
    #[inline]
    pub fn is_active(&self, kind: ExtraKind) -> bool {
        self.timers[kind as usize].is_some()
    }

    /// Start (or restart) a timer
    pub fn start(&mut self, kind: ExtraKind, ms: u32) {
        self.timers[kind as usize] = Some(Counter::timeout(ms));
    }

    /// Returns true if the extra was running
    pub fn stop(&mut self, kind: ExtraKind) -> bool {
        self.timers[kind as usize].take().is_some()
    }

    pub fn remaining_ms(&self, kind: ExtraKind) -> Option<u32> {
        self.timers[kind as usize].map(|t| t.remaining_ms())
    }

    /// Advance all timers; returns kinds that ran out (still marked active)
    pub fn update(&mut self, ms: u32) -> Vec<ExtraKind> {
        let mut expired = Vec::new();
        for (i, timer) in self.timers.iter_mut().enumerate() {
            if let Some(t) = timer {
                if t.update(ms) || t.expired() {
                    expired.push(ExtraKind::ALL[i]);
                }
            }
        }
        expired
    }

    pub fn extend_all(&mut self, ms: u32) {
        for t in self.timers.iter_mut().flatten() {
            t.add(ms);
        }
    }

    pub fn active(&self) -> impl Iterator<Item = ExtraKind> + '_ {
        self.timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_some())
            .map(|(i, _)| ExtraKind::ALL[i])
    }

    pub fn any(&self) -> bool {
        self.timers.iter().any(Option::is_some)
    }
}

/// A pickup falling toward the paddle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallingExtra {
    pub kind: ExtraKind,
    /// Center position
    pub pos: DVec2,
}

fn is_active(game: &Game, kind: ExtraKind) -> bool {
    match kind.def().scope {
        ExtraScope::Instant => false,
        ExtraScope::Game => game.active.is_active(kind),
        ExtraScope::Paddle => game.paddle.extras.is_active(kind),
    }
}

/// Apply a collected extra
pub fn collect_extra(game: &mut Game, kind: ExtraKind) {
    let def = kind.def();
    log::debug!("Collected extra {:?}", kind);
    game.mods.collected_extras.push(kind);

    if let Some(group) = def.group {
        for other in ExtraKind::ALL {
            if other != kind && other.def().group == Some(group) && is_active(game, other) {
                expire_extra(game, other);
            }
        }
    }
    match def.scope {
        ExtraScope::Instant => {}
        ExtraScope::Game => game.active.start(kind, def.duration_ms),
        ExtraScope::Paddle => game.paddle.extras.start(kind, def.duration_ms),
    }
    (def.on_collect)(game);
}

/// Stop a running extra and revert its effect (no-op if not running)
pub fn expire_extra(game: &mut Game, kind: ExtraKind) {
    let def = kind.def();
    let was_active = match def.scope {
        ExtraScope::Instant => false,
        ExtraScope::Game => game.active.stop(kind),
        ExtraScope::Paddle => game.paddle.extras.stop(kind),
    };
    if was_active {
        log::debug!("Extra {:?} expired", kind);
        (def.on_expire)(game);
    }
}

/// Timers, falling pickups and the gold shower
pub fn update_extras(game: &mut Game, ms: u32) {
    for kind in game.active.update(ms) {
        expire_extra(game, kind);
    }
    for kind in game.paddle.extras.update(ms) {
        expire_extra(game, kind);
    }

    update_falling(game, ms);

    if game.paddle.has(ExtraKind::GoldShower) && game.gold_drop.update(ms) {
        game.gold_drop.reset();
        let score_kinds = &ExtraKind::ALL[..6];
        let kind = score_kinds[game.rng.random_range(0..score_kinds.len())];
        let x = game
            .rng
            .random_range(BRICK_WIDTH..FIELD_WIDTH - BRICK_WIDTH);
        game.extras.push(FallingExtra {
            kind,
            pos: DVec2::new(x, BRICK_HEIGHT * 1.5),
        });
    }
}

fn update_falling(game: &mut Game, ms: u32) {
    let paddle_min = DVec2::new(game.paddle.x, game.paddle.y);
    let paddle_max = paddle_min + DVec2::new(game.paddle.w, PADDLE_HEIGHT);
    let paddle_center = game.paddle.center_x();
    let bonus_magnet = game.paddle.has(ExtraKind::BonusMagnet);
    let malus_magnet = game.paddle.has(ExtraKind::MalusMagnet);

    let mut collected = Vec::new();
    game.extras.retain_mut(|extra| {
        extra.pos.y += EXTRA_FALL_SPEED * ms as f64;
        let pulled = if extra.kind.is_beneficial() {
            bonus_magnet
        } else {
            malus_magnet
        };
        if pulled {
            let dx = paddle_center - extra.pos.x;
            let step = EXTRA_MAGNET_SPEED * ms as f64;
            extra.pos.x += dx.clamp(-step, step);
        }

        let min = extra.pos - EXTRA_HALF_SIZE;
        let max = extra.pos + EXTRA_HALF_SIZE;
        if min.x < paddle_max.x && max.x > paddle_min.x && min.y < paddle_max.y && max.y > paddle_min.y
        {
            collected.push(extra.kind);
            return false;
        }
        min.y <= FIELD_HEIGHT
    });

    for kind in collected {
        collect_extra(game, kind);
    }
}
