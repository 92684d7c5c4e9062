//! Game state and core simulation types
//!
//! One [`Game`] exists per running level. It owns everything the tick
//! mutates; the presentation layer only reads it between ticks, mostly
//! through the [`Modifications`] report of the last tick.

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ball::{Ball, BallModifier, BallSpeed, BallState};
use super::bonus::{BonusEvent, BonusRules, apply_bonus_rules};
use super::extras::{ActiveExtras, EXTRA_COUNT, ExtraKind, FallingExtra};
use super::grid::{BrickGrid, BrickKind, HitOutcome};
use super::level::Level;
use super::paddle::{Paddle, Shot};
use super::timer::Counter;
use crate::consts::*;
use crate::settings::{Difficulty, DifficultyParams};
use crate::tile_center;

/// Ball collision check strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BccType {
    /// Predict the first contact along the path and resolve there
    #[default]
    Trajectory,
    /// Move in small steps and push out of overlapping tiles
    Clipping,
}

/// How a level attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelOutcome {
    /// Cleared (or warped, or bonus level completed)
    Won,
    /// All balls lost, or a bonus level failed
    Lost,
}

/// What happened to a brick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitKind {
    Damaged,
    Removed,
    Grown,
    Regenerated,
}

/// One brick event of the last tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrickHit {
    pub x: i32,
    pub y: i32,
    pub kind: HitKind,
    pub brick: BrickKind,
    /// Removed by an explosion
    pub draw_explosion: bool,
    /// Direction of the hitting ball or shot
    pub dir: DVec2,
    pub by_shot: bool,
}

/// Events of the last tick, consumed by sound and particle effects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifications {
    pub brick_hits: Vec<BrickHit>,
    pub paddle_reflected_balls: u32,
    pub brick_reflected_balls: u32,
    pub attached_balls: u32,
    pub fired_shots: u32,
    pub collected_extras: Vec<ExtraKind>,
    pub lost_balls: u32,
}

impl Modifications {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Per-game options, derived from the settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub params: DifficultyParams,
    pub bcc: BccType,
    pub convex: bool,
    /// Idle balls come back on their own (otherwise on recall)
    pub auto_return: bool,
    pub random_angle: bool,
    /// Balls always run at maximum speed
    pub auto_turbo: bool,
    /// Units per millisecond
    pub max_ball_speed: f64,
    /// Percentage of bricks to destroy before warping is allowed
    pub rel_warp_limit: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            params: Difficulty::Medium.params(),
            bcc: BccType::Trajectory,
            convex: true,
            auto_return: true,
            random_angle: false,
            auto_turbo: false,
            max_ball_speed: 0.7,
            rel_warp_limit: 80,
        }
    }
}

/// Response of a brick to a ball contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrickContact {
    /// Ball bounces off
    pub reflect: bool,
    /// Bounce gets a random deflection
    pub chaotic: bool,
    /// The brick was damaged or destroyed (resets idle, speeds up)
    pub effective: bool,
    /// A weak ball spent energy
    pub weakened: bool,
}

/// Complete state of one level
#[derive(Debug, Clone)]
pub struct Game {
    pub title: String,
    pub author: String,
    pub grid: BrickGrid,
    /// Active balls (sorted by id for determinism)
    pub balls: Vec<Ball>,
    pub paddle: Paddle,
    pub extras: Vec<FallingExtra>,
    pub shots: Vec<Shot>,
    /// Game-scoped extras
    pub active: ActiveExtras,
    pub gold_drop: Counter,
    pub config: GameConfig,
    pub speed: BallSpeed,
    pub bonus: Option<BonusRules>,
    pub level_over: Option<LevelOutcome>,
    /// Bricks to clear at level start
    pub brick_count: u32,
    /// Warping is allowed while fewer bricks than this are left
    pub warp_limit: u32,
    pub mods: Modifications,
    pub rng: Pcg32,
    next_id: u32,
}

impl Game {
    /// Set up a level
    pub fn new(level: &Level, config: GameConfig, seed: u64) -> Self {
        let p = config.params;
        let mut game = Self {
            title: level.title.clone(),
            author: level.author.clone(),
            grid: level.build_grid(),
            balls: Vec::new(),
            paddle: Paddle::new(p.paddle_size, p.paddle_min, p.paddle_max),
            extras: Vec::new(),
            shots: Vec::new(),
            active: ActiveExtras::default(),
            gold_drop: Counter::default(),
            config,
            speed: BallSpeed::new(p.ball_min_speed, config.max_ball_speed, p.ball_speed_step),
            bonus: level.bonus_kind().map(BonusRules::new),
            level_over: None,
            brick_count: 0,
            warp_limit: 0,
            mods: Modifications::default(),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        };
        game.spawn_ball_attached();
        apply_bonus_rules(&mut game, BonusEvent::Setup);
        game.mods.clear();

        game.brick_count = game.grid.bricks_left();
        game.warp_limit = game.brick_count * (100 - config.rel_warp_limit.min(100)) / 100;
        log::info!(
            "Level '{}' by {}: {} bricks, warp below {}",
            game.title,
            game.author,
            game.brick_count,
            game.warp_limit
        );
        game
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn a ball attached to the paddle center
    pub fn spawn_ball_attached(&mut self) {
        let id = self.next_entity_id();
        let mut ball = Ball::new_attached(id, self.paddle.w / 2.0);
        ball.update_attached(&self.paddle);
        self.balls.push(ball);
        self.sync_ball_modifiers();
    }

    /// Ball extra: split the first free ball, or add one to the paddle
    pub fn spawn_extra_ball(&mut self) {
        if self.balls.len() >= MAX_BALLS {
            return;
        }
        let Some(src) = self.balls.iter().find(|b| !b.is_attached()).cloned() else {
            self.spawn_ball_attached();
            return;
        };
        let id = self.next_entity_id();
        let mut ball = src;
        ball.id = id;
        ball.vel.x = -ball.vel.x;
        if ball.vel.x == 0.0 {
            ball.vel = crate::rotate(ball.vel, 0.3);
        }
        ball.reset_idle();
        self.balls.push(ball);
    }

    #[inline]
    pub fn is_bonus_level(&self) -> bool {
        self.bonus.is_some()
    }

    #[inline]
    pub fn bricks_left(&self) -> u32 {
        self.grid.bricks_left()
    }

    /// Enough bricks destroyed to warp to the next level
    #[inline]
    pub fn warp_ok(&self) -> bool {
        self.bricks_left() < self.warp_limit
    }

    #[inline]
    pub fn has_extra(&self, kind: ExtraKind) -> bool {
        self.active.is_active(kind) || self.paddle.has(kind)
    }

    /// Any game or paddle extra running
    pub fn extras_active(&self) -> bool {
        self.active.any() || self.paddle.extras.any()
    }

    /// Mirror the game extras onto the balls (metal > explosive > weak)
    pub fn sync_ball_modifiers(&mut self) {
        let metal = self.active.is_active(ExtraKind::Metal);
        let expl = self.active.is_active(ExtraKind::ExplBall);
        let weak = self.active.is_active(ExtraKind::WeakBall);
        let chaos = self.active.is_active(ExtraKind::Chaos);
        for ball in &mut self.balls {
            ball.modifier = if metal {
                BallModifier::Metal
            } else if expl {
                BallModifier::Explosive
            } else if weak && ball.energy > 0 {
                BallModifier::Weak
            } else {
                BallModifier::Normal
            };
            ball.chaotic = chaos;
        }
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
    }

    fn record_hit(&mut self, x: i32, y: i32, kind: HitKind, brick: BrickKind, dir: DVec2, by_shot: bool, draw_explosion: bool) {
        self.mods.brick_hits.push(BrickHit {
            x,
            y,
            kind,
            brick,
            draw_explosion,
            dir,
            by_shot,
        });
    }

    /// Ball touches the solid tile `x, y`
    pub fn ball_hits_brick(&mut self, x: i32, y: i32, modifier: BallModifier, dir: DVec2) -> BrickContact {
        let mut contact = BrickContact {
            reflect: true,
            chaotic: false,
            effective: false,
            weakened: false,
        };
        let Some(brick) = self.grid.get(x, y).copied() else {
            return contact;
        };
        if brick.kind == BrickKind::Wall || !brick.is_solid() {
            return contact;
        }

        match modifier {
            BallModifier::Metal => {
                self.remove_brick(x, y, dir, false, false, None);
                contact.reflect = false;
                contact.effective = true;
                return contact;
            }
            BallModifier::Explosive if brick.kind.counts_for_clear() => {
                self.grid.start_explosion(x, y, true, None);
                contact.reflect = false;
                contact.effective = true;
                return contact;
            }
            BallModifier::Weak => {
                if let Some(b) = self.grid.get_mut(x, y) {
                    b.invisible = false;
                }
                contact.weakened = true;
                contact.chaotic = brick.kind == BrickKind::Chaotic;
                return contact;
            }
            _ => {}
        }

        match self.grid.damage(x, y) {
            HitOutcome::Unharmed => {
                contact.chaotic = brick.kind == BrickKind::Chaotic;
            }
            HitOutcome::Damaged => {
                self.record_hit(x, y, HitKind::Damaged, brick.kind, dir, false, false);
                contact.effective = true;
            }
            HitOutcome::Broken => {
                if brick.kind == BrickKind::Explosive {
                    self.grid.start_explosion(x, y, true, None);
                } else {
                    self.remove_brick(x, y, dir, false, false, None);
                }
                contact.effective = true;
            }
        }
        contact
    }

    /// Weapon shot reaches the solid tile `x, y`
    pub fn shot_hits_brick(&mut self, x: i32, y: i32) {
        let Some(kind) = self.grid.get(x, y).map(|b| b.kind) else {
            return;
        };
        match self.grid.damage(x, y) {
            HitOutcome::Unharmed => {}
            HitOutcome::Damaged => {
                self.record_hit(x, y, HitKind::Damaged, kind, DVec2::NEG_Y, true, false);
            }
            HitOutcome::Broken if kind == BrickKind::Explosive => {
                self.grid.start_explosion(x, y, true, None);
            }
            HitOutcome::Broken => {
                self.remove_brick(x, y, DVec2::NEG_Y, true, false, None);
            }
        }
    }

    /// Remove a brick with scoring, extra release and bonus rules
    pub fn remove_brick(
        &mut self,
        x: i32,
        y: i32,
        dir: DVec2,
        by_shot: bool,
        draw_explosion: bool,
        score: Option<i32>,
    ) -> bool {
        let Some(removed) = self.grid.remove(x, y) else {
            return false;
        };
        self.paddle.score += score.unwrap_or(removed.score);
        self.record_hit(x, y, HitKind::Removed, removed.kind, dir, by_shot, draw_explosion);

        let drop = match removed.extra {
            Some(kind) => Some(kind),
            None if !self.is_bonus_level()
                && removed.kind.counts_for_clear()
                && self.rng.random_bool(self.config.params.drop_chance) =>
            {
                Some(ExtraKind::ALL[self.rng.random_range(0..EXTRA_COUNT)])
            }
            None => None,
        };
        if let Some(kind) = drop {
            self.extras.push(FallingExtra {
                kind,
                pos: tile_center(x, y),
            });
        }

        if self.is_bonus_level() {
            apply_bonus_rules(self, BonusEvent::BrickRemoved { x, y });
        }
        true
    }

    /// Debug destruction: explode the brick at `x, y` for a score penalty
    /// of ten percent of `current_score`. Returns false for empty, border
    /// or already exploding tiles.
    pub fn destroy_brick(&mut self, x: i32, y: i32, current_score: i32) -> bool {
        if !crate::sim::grid::is_interior(x, y) {
            log::warn!("destroy_brick: {},{} is outside the playfield", x, y);
            return false;
        }
        self.grid
            .start_explosion(x, y, false, Some(-10 * current_score / 100))
    }

    /// Intact, visible brick at `x, y`
    pub fn is_brick_at(&self, x: i32, y: i32) -> bool {
        match self.grid.get(x, y) {
            Some(b) => b.is_solid() && b.kind != BrickKind::Wall,
            None => {
                log::warn!("is_brick_at: {},{} is outside the map", x, y);
                false
            }
        }
    }

    /// Balls touching the tile `x, y`
    pub fn ball_overlaps_tile(&self, x: i32, y: i32) -> bool {
        let min = crate::tile_origin(x, y) - DVec2::splat(BALL_RADIUS);
        let max = crate::tile_origin(x + 1, y + 1) + DVec2::splat(BALL_RADIUS);
        self.balls.iter().any(|b| {
            b.pos.x > min.x && b.pos.x < max.x && b.pos.y > min.y && b.pos.y < max.y
        })
    }

    /// Number of balls riding on the paddle
    pub fn attached_ball_count(&self) -> usize {
        self.balls.iter().filter(|b| matches!(b.state, BallState::Attached { .. })).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grid::Brick;

    fn game_with(bricks: &[(usize, usize, u8)]) -> Game {
        let mut level = Level::empty("test", "tester");
        for &(x, y, ch) in bricks {
            level.set_brick(x, y, ch);
        }
        Game::new(&level, GameConfig::default(), 7)
    }

    #[test]
    fn test_new_game_has_attached_ball() {
        let g = game_with(&[(0, 0, b'a')]);
        assert_eq!(g.balls.len(), 1);
        assert_eq!(g.attached_ball_count(), 1);
        assert_eq!(g.brick_count, 1);
        assert!(!g.is_bonus_level());
    }

    #[test]
    fn test_warp_limit() {
        let mut level = Level::empty("warp", "t");
        let mut n = 0;
        'fill: for y in 0..EDIT_HEIGHT {
            for x in 0..EDIT_WIDTH {
                if n == 100 {
                    break 'fill;
                }
                level.set_brick(x, y, b'a');
                n += 1;
            }
        }
        let g = Game::new(&level, GameConfig::default(), 1);
        assert_eq!(g.brick_count, 100);
        assert_eq!(g.warp_limit, 20);
    }

    #[test]
    fn test_metal_ball_passes_through() {
        let mut g = game_with(&[(2, 2, b'#')]);
        let c = g.ball_hits_brick(3, 3, BallModifier::Metal, DVec2::NEG_Y);
        assert!(!c.reflect);
        assert!(!g.is_brick_at(3, 3));
        // Walls never go
        let c = g.ball_hits_brick(0, 3, BallModifier::Metal, DVec2::NEG_X);
        assert!(c.reflect);
        assert!(g.grid.get(0, 3).is_some_and(|b| b.is_solid()));
    }

    #[test]
    fn test_normal_ball_damages() {
        let mut g = game_with(&[(2, 2, b'v')]);
        let c = g.ball_hits_brick(3, 3, BallModifier::Normal, DVec2::NEG_Y);
        assert!(c.reflect && c.effective);
        assert_eq!(g.mods.brick_hits.len(), 1);
        assert_eq!(g.mods.brick_hits[0].kind, HitKind::Damaged);
        g.ball_hits_brick(3, 3, BallModifier::Normal, DVec2::NEG_Y);
        assert!(!g.is_brick_at(3, 3));
        assert_eq!(g.mods.brick_hits[1].kind, HitKind::Removed);
        assert_eq!(g.paddle.score, 200);
    }

    #[test]
    fn test_weak_ball_does_no_damage() {
        let mut g = game_with(&[(2, 2, b'a')]);
        let c = g.ball_hits_brick(3, 3, BallModifier::Weak, DVec2::NEG_Y);
        assert!(c.reflect && c.weakened && !c.effective);
        assert!(g.is_brick_at(3, 3));
    }

    #[test]
    fn test_explosive_ball_starts_blast() {
        let mut g = game_with(&[(2, 2, b'a')]);
        let c = g.ball_hits_brick(3, 3, BallModifier::Explosive, DVec2::NEG_Y);
        assert!(!c.reflect);
        assert!(g.grid.get(3, 3).is_some_and(|b| b.is_exploding()));
    }

    #[test]
    fn test_destroy_brick_penalty_and_idempotence() {
        let mut g = game_with(&[(4, 4, b'a')]);
        assert!(!g.destroy_brick(2, 2, 1000), "empty tile");
        assert!(!g.destroy_brick(0, 2, 1000), "border tile");
        assert!(g.destroy_brick(5, 5, 1000));
        assert!(!g.destroy_brick(5, 5, 1000), "already exploding");
        assert_eq!(g.paddle.score, 0);
    }

    #[test]
    fn test_level_extra_released() {
        let mut level = Level::empty("x", "y");
        level.set_brick(3, 3, b'a');
        level.set_extra(3, 3, b'l');
        let mut g = Game::new(&level, GameConfig::default(), 3);
        g.remove_brick(4, 4, DVec2::NEG_Y, false, false, None);
        assert_eq!(g.extras.len(), 1);
        assert_eq!(g.extras[0].kind, ExtraKind::Life);
    }

    #[test]
    fn test_ball_overlap_query() {
        let mut g = game_with(&[]);
        g.grid.place(6, 6, Brick::new(BrickKind::Regular, 2, 1, 100));
        g.balls[0].pos = tile_center(6, 6);
        assert!(g.ball_overlaps_tile(6, 6));
        assert!(!g.ball_overlaps_tile(9, 9));
    }
}
