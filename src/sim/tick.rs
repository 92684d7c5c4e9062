//! Variable timestep simulation tick
//!
//! Advances a [`Game`] by the milliseconds elapsed since the last frame.
//! Order per tick: paddle input, extras, ball launch and motion, weapon
//! shots, brick timers, bonus rules, level-over check.

use glam::DVec2;
use rand::Rng;

use super::bonus::{BonusEvent, apply_bonus_rules};
use super::collision;
use super::extras::{self, ExtraKind};
use super::grid::{Brick, BrickGrid, BrickKind, is_brick_area};
use super::paddle::Shot;
use super::state::{BrickHit, Game, HitKind, LevelOutcome};
use crate::consts::*;
use crate::{launch_direction, tile_at};

/// Paddle control for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// New paddle left edge (None keeps the current position)
    pub paddle_x: Option<f64>,
    pub fire_left: bool,
    pub fire_right: bool,
    /// Bring idle balls back
    pub recall: bool,
    /// Maximum ball speed while held
    pub speed_up: bool,
}

/// Score of bricks created by growing bricks
const GROWN_BRICK_SCORE: i32 = 50;

impl Game {
    /// Store the paddle intent for the next update
    pub fn set_paddle_state(&mut self, input: &TickInput) {
        if let Some(x) = input.paddle_x {
            self.paddle.set_x(x);
        }
        self.paddle.fire_left = input.fire_left;
        self.paddle.fire_right = input.fire_right;
        self.paddle.recall = input.recall;
        self.paddle.speed_request = input.speed_up;
    }

    /// Advance the level by `ms` milliseconds
    pub fn update(&mut self, ms: u32) {
        if self.level_over.is_some() || ms == 0 {
            return;
        }
        self.mods.clear();

        self.paddle.update_ghost(ms);
        extras::update_extras(self, ms);
        self.sync_ball_modifiers();

        self.launch_attached_balls();
        self.update_weapon(ms);
        self.update_balls(ms);
        self.update_shots(ms);

        self.update_explosions(ms);
        self.update_regeneration(ms);
        self.update_growth(ms);

        apply_bonus_rules(self, BonusEvent::Tick(ms));

        if self.level_over.is_none() {
            if self.balls.is_empty() {
                log::debug!("All balls lost");
                self.level_over = Some(LevelOutcome::Lost);
            } else if !self.is_bonus_level()
                && self.bricks_left() == 0
                && !self.grid.explosions_pending()
            {
                log::info!("Level '{}' cleared", self.title);
                self.level_over = Some(LevelOutcome::Won);
            }
        }
    }

    /// Fire buttons launch balls riding on the paddle
    fn launch_attached_balls(&mut self) {
        let (left, right) = (self.paddle.fire_left, self.paddle.fire_right);
        if !left && !right {
            return;
        }
        let speed = self.ball_speed_target();
        for i in 0..self.balls.len() {
            if !self.balls[i].is_attached() {
                continue;
            }
            let angle = if self.config.random_angle {
                self.rng.random_range(-BALL_LAUNCH_ANGLE..BALL_LAUNCH_ANGLE)
            } else if left {
                -BALL_LAUNCH_ANGLE
            } else {
                BALL_LAUNCH_ANGLE
            };
            self.balls[i].launch(launch_direction(angle), speed);
        }
    }

    /// Speed all free balls should have right now
    pub fn ball_speed_target(&self) -> f64 {
        let slow = self.active.is_active(ExtraKind::Slow);
        let fast = self.active.is_active(ExtraKind::Fast)
            || self.paddle.speed_request
            || self.config.auto_turbo;
        self.speed.target(slow, fast)
    }

    fn update_balls(&mut self, ms: u32) {
        let target = self.ball_speed_target();
        let auto_return = self.config.auto_return;
        let mut balls = std::mem::take(&mut self.balls);

        for ball in &mut balls {
            if ball.is_attached() {
                ball.update_attached(&self.paddle);
                continue;
            }
            ball.set_speed(target);
            collision::advance_ball(self, ball, ms);
            ball.update_idle(ms);

            if ball.return_ready && (auto_return || self.paddle.recall) {
                log::debug!("Ball {} returned to paddle", ball.id);
                ball.pos.x = self.paddle.center_x();
                ball.attach(&self.paddle);
            }
        }

        let before = balls.len();
        balls.retain(|b| b.pos.y - BALL_RADIUS <= FIELD_HEIGHT);
        self.mods.lost_balls += (before - balls.len()) as u32;

        balls.append(&mut self.balls);
        self.balls = balls;
        self.normalize_order();
    }

    fn update_weapon(&mut self, ms: u32) {
        if self.paddle.try_fire_weapon(ms) {
            for pos in self.paddle.gun_positions() {
                self.shots.push(Shot { pos });
            }
            self.mods.fired_shots += 2;
        }
    }

    fn update_shots(&mut self, ms: u32) {
        let mut shots = std::mem::take(&mut self.shots);
        shots.retain_mut(|shot| {
            shot.step(ms);
            let (x, y) = tile_at(shot.pos);
            if y < 0 {
                return false;
            }
            if self.grid.is_solid_at(x, y) {
                self.shot_hits_brick(x, y);
                return false;
            }
            true
        });
        self.shots = shots;
    }

    fn update_explosions(&mut self, ms: u32) {
        // Chains started here finish on a later tick
        for done in self.grid.update_explosions(ms) {
            self.remove_brick(done.x, done.y, DVec2::ZERO, false, true, done.score);
            if !done.blast {
                continue;
            }
            for (nx, ny) in BrickGrid::neighbours(done.x, done.y, 1) {
                let blast = self
                    .grid
                    .get(nx, ny)
                    .is_some_and(|b| b.kind == BrickKind::Explosive);
                self.grid.start_explosion(nx, ny, blast, None);
            }
        }
    }

    fn update_regeneration(&mut self, ms: u32) {
        for (x, y) in self.grid.update_regeneration(ms) {
            // Wait until no ball sits in the way
            if self.ball_overlaps_tile(x, y) {
                continue;
            }
            if self.grid.regenerate(x, y) {
                self.record_tile_event(x, y, HitKind::Regenerated);
            }
        }
    }

    fn update_growth(&mut self, ms: u32) {
        for (x, y) in self.grid.update_growth(ms) {
            let free: Vec<(i32, i32)> = BrickGrid::neighbours(x, y, 1)
                .into_iter()
                .filter(|&(nx, ny)| {
                    is_brick_area(nx, ny)
                        && self.grid.get(nx, ny).is_some_and(|b| b.is_vacant())
                        && !self.ball_overlaps_tile(nx, ny)
                })
                .collect();
            if free.is_empty() {
                continue;
            }
            let (nx, ny) = free[self.rng.random_range(0..free.len())];
            self.grid
                .place(nx, ny, Brick::new(BrickKind::Regular, 2, 1, GROWN_BRICK_SCORE));
            self.record_tile_event(nx, ny, HitKind::Grown);
        }
    }

    fn record_tile_event(&mut self, x: i32, y: i32, kind: HitKind) {
        let brick = self.grid.get(x, y).map_or(BrickKind::Empty, |b| b.kind);
        self.mods.brick_hits.push(BrickHit {
            x,
            y,
            kind,
            brick,
            draw_explosion: false,
            dir: DVec2::ZERO,
            by_shot: false,
        });
    }
}

/// Apply input and advance the game by `ms` milliseconds
pub fn tick(game: &mut Game, input: &TickInput, ms: u32) {
    game.set_paddle_state(input);
    game.update(ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallState;
    use crate::sim::level::Level;
    use crate::sim::state::GameConfig;
    use crate::tile_center;

    fn game_with(bricks: &[(usize, usize, u8)]) -> Game {
        let mut level = Level::empty("tick", "tester");
        for &(x, y, ch) in bricks {
            level.set_brick(x, y, ch);
        }
        Game::new(&level, GameConfig::default(), 12345)
    }

    #[test]
    fn test_fire_launches_ball() {
        let mut game = game_with(&[(0, 0, b'#'), (13, 0, b'a')]);
        tick(&mut game, &TickInput::default(), 10);
        assert!(game.balls[0].is_attached());

        let input = TickInput {
            fire_left: true,
            ..Default::default()
        };
        tick(&mut game, &input, 10);
        assert!(matches!(game.balls[0].state, BallState::Free));
        assert!(game.balls[0].vel.x < 0.0, "left fire leans left");
        assert!(game.balls[0].vel.y < 0.0);
    }

    #[test]
    fn test_single_brick_scenario() {
        let mut game = game_with(&[(4, 4, b'a'), (0, 0, b'a')]);
        let ball = &mut game.balls[0];
        ball.state = BallState::Free;
        ball.pos = tile_center(5, 5) + DVec2::new(0.0, 40.0);
        ball.vel = DVec2::new(0.0, -0.3);

        game.update(100);
        assert!(!game.is_brick_at(5, 5));
        let removed: Vec<_> = game
            .mods
            .brick_hits
            .iter()
            .filter(|h| h.kind == HitKind::Removed)
            .collect();
        assert_eq!(removed.len(), 1);
        assert_eq!((removed[0].x, removed[0].y), (5, 5));
        assert!(game.balls[0].vel.y > 0.0);
        assert_eq!(game.level_over, None, "one brick still standing");
    }

    #[test]
    fn test_level_cleared() {
        let mut game = game_with(&[(4, 4, b'a')]);
        let ball = &mut game.balls[0];
        ball.state = BallState::Free;
        ball.pos = tile_center(5, 5) + DVec2::new(0.0, 40.0);
        ball.vel = DVec2::new(0.0, -0.3);
        game.update(100);
        assert_eq!(game.level_over, Some(LevelOutcome::Won));
    }

    #[test]
    fn test_last_brick_explosion_finishes_before_win() {
        let mut game = game_with(&[(4, 4, b'a')]);
        extras::collect_extra(&mut game, ExtraKind::ExplBall);
        let ball = &mut game.balls[0];
        ball.state = BallState::Free;
        ball.pos = tile_center(5, 5) + DVec2::new(0.0, 40.0);
        ball.vel = DVec2::new(0.0, -0.3);

        for _ in 0..50 {
            game.update(10);
            if game.grid.get(5, 5).is_some_and(|b| b.is_exploding()) {
                break;
            }
        }
        assert!(game.grid.get(5, 5).is_some_and(|b| b.is_exploding()));
        assert_eq!(game.bricks_left(), 0);
        assert_eq!(game.level_over, None, "explosion still running");
        assert_eq!(game.paddle.score, 0);

        for _ in 0..50 {
            game.update(10);
            if game.level_over.is_some() {
                break;
            }
        }
        assert_eq!(game.level_over, Some(LevelOutcome::Won));
        assert_eq!(game.paddle.score, 100);
        assert!(game.grid.get(5, 5).is_some_and(|b| b.is_empty()));
    }

    #[test]
    fn test_destroyed_last_brick_applies_penalty() {
        let mut game = game_with(&[(4, 4, b'a')]);
        assert!(game.destroy_brick(5, 5, 1000));
        game.update(10);
        assert_eq!(game.level_over, None);

        game.update(BRICK_EXP_TIME_MS);
        assert_eq!(game.level_over, Some(LevelOutcome::Won));
        assert_eq!(game.paddle.score, -100);
        let removed = game.mods.brick_hits.iter().filter(|h| h.kind == HitKind::Removed).count();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_ball_lost_ends_attempt() {
        let mut game = game_with(&[(4, 4, b'a')]);
        let ball = &mut game.balls[0];
        ball.state = BallState::Free;
        ball.pos = DVec2::new(BRICK_WIDTH * 1.5, FIELD_HEIGHT - 2.0);
        ball.vel = DVec2::new(0.0, 0.3);
        game.update(100);
        assert!(game.balls.is_empty());
        assert_eq!(game.mods.lost_balls, 1);
        assert_eq!(game.level_over, Some(LevelOutcome::Lost));
    }

    #[test]
    fn test_speed_stays_in_bounds() {
        let mut game = game_with(&[(4, 4, b'w'), (6, 2, b'x'), (0, 0, b'#')]);
        game.speed.step = 0.05;
        let input = TickInput {
            fire_right: true,
            ..Default::default()
        };
        for i in 0..2_000 {
            let input = TickInput {
                paddle_x: game.balls.first().map(|b| b.pos.x - game.paddle.w / 2.0),
                speed_up: i % 7 == 0,
                ..input.clone()
            };
            tick(&mut game, &input, 10);
            for b in game.balls.iter().filter(|b| !b.is_attached()) {
                let v = b.speed();
                assert!(v >= game.speed.min - 1e-9 && v <= game.speed.max + 1e-9, "speed {v}");
            }
            if game.level_over.is_some() {
                break;
            }
        }
    }

    #[test]
    fn test_explosion_chain() {
        let mut game = game_with(&[(4, 4, b'*'), (4, 5, b'*'), (4, 6, b'a'), (10, 10, b'a')]);
        game.grid.start_explosion(5, 5, true, None);
        game.update(BRICK_EXP_TIME_MS);
        assert!(!game.is_brick_at(5, 5));
        // Neighbour below is now exploding
        assert!(game.grid.get(5, 6).is_some_and(|b| b.is_exploding()));
        game.update(BRICK_EXP_TIME_MS);
        game.update(BRICK_EXP_TIME_MS);
        assert!(!game.is_brick_at(5, 7));
        assert!(game.is_brick_at(11, 11));
        assert!(game.mods.brick_hits.iter().all(|h| h.draw_explosion));
    }

    #[test]
    fn test_border_survives_explosions() {
        let mut game = game_with(&[(0, 0, b'*'), (0, 1, b'*'), (10, 10, b'a')]);
        game.grid.start_explosion(1, 1, true, None);
        for _ in 0..5 {
            game.update(BRICK_EXP_TIME_MS);
        }
        for (x, y) in [(0, 0), (0, 1), (1, 0), (0, 2), (2, 0)] {
            assert_eq!(game.grid.get(x, y).map(|b| b.kind), Some(BrickKind::Wall));
        }
    }

    #[test]
    fn test_weapon_fires_shots() {
        let mut game = game_with(&[(4, 4, b'a'), (0, 0, b'#')]);
        game.paddle.extras.start(ExtraKind::Weapon, 5_000);
        // Release the ball first so fire only shoots
        game.balls[0].state = BallState::Free;
        game.balls[0].pos = DVec2::new(BRICK_WIDTH * 1.5, 300.0);
        game.balls[0].vel = DVec2::new(0.0, -0.3);
        let input = TickInput {
            fire_left: true,
            ..Default::default()
        };
        tick(&mut game, &input, 10);
        assert_eq!(game.mods.fired_shots, 2);
        assert_eq!(game.shots.len(), 2);
    }

    #[test]
    fn test_determinism() {
        let level = {
            let mut l = Level::empty("det", "t");
            for x in 0..EDIT_WIDTH {
                l.set_brick(x, 2, b'a');
                l.set_brick(x, 3, b'*');
            }
            l
        };
        let mut g1 = Game::new(&level, GameConfig::default(), 99999);
        let mut g2 = Game::new(&level, GameConfig::default(), 99999);
        let inputs = [
            TickInput {
                paddle_x: Some(200.0),
                ..Default::default()
            },
            TickInput {
                fire_right: true,
                ..Default::default()
            },
            TickInput::default(),
        ];
        for _ in 0..300 {
            for input in &inputs {
                tick(&mut g1, input, 16);
                tick(&mut g2, input, 16);
            }
        }
        assert_eq!(g1.paddle.score, g2.paddle.score);
        assert_eq!(g1.bricks_left(), g2.bricks_left());
        assert_eq!(g1.balls, g2.balls);
    }
}
