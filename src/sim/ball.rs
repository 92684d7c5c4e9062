//! Balls and ball speed

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::paddle::Paddle;
use super::timer::Counter;
use crate::consts::*;

/// Ball state - attached to paddle or free-moving
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallState {
    /// Riding on the paddle at a horizontal offset from its left edge
    Attached { offset: f64 },
    Free,
}

/// Behaviour on brick contact, mirrored from the active game extras
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BallModifier {
    #[default]
    Normal,
    /// Destroys any brick without reflecting
    Metal,
    /// Makes hit bricks explode
    Explosive,
    /// Bounces off without doing damage
    Weak,
}

/// A ball entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    /// Center position
    pub pos: DVec2,
    /// Units per millisecond
    pub vel: DVec2,
    pub state: BallState,
    /// Time since the last effective brick hit
    pub idle: Counter,
    /// Idle long enough to be brought back to the paddle
    pub return_ready: bool,
    pub modifier: BallModifier,
    /// Remaining weak hits
    pub energy: u8,
    /// Random deflection on every bounce (chaos extra)
    pub chaotic: bool,
}

impl Ball {
    pub fn new_attached(id: u32, offset: f64) -> Self {
        Self {
            id,
            pos: DVec2::ZERO,
            vel: DVec2::ZERO,
            state: BallState::Attached { offset },
            idle: Counter::timeout(BALL_IDLE_RETURN_MS),
            return_ready: false,
            modifier: BallModifier::Normal,
            energy: 0,
            chaotic: false,
        }
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        matches!(self.state, BallState::Attached { .. })
    }

    /// Keep an attached ball resting on the paddle
    pub fn update_attached(&mut self, paddle: &Paddle) {
        if let BallState::Attached { offset } = self.state {
            self.pos = DVec2::new(paddle.x + offset, paddle.y - BALL_RADIUS - 0.5);
        }
    }

    /// Attach to the paddle at the current position
    pub fn attach(&mut self, paddle: &Paddle) {
        let offset = (self.pos.x - paddle.x).clamp(0.0, paddle.w);
        self.state = BallState::Attached { offset };
        self.vel = DVec2::ZERO;
        self.reset_idle();
        self.update_attached(paddle);
    }

    /// Leave the paddle along `dir` at `speed`
    pub fn launch(&mut self, dir: DVec2, speed: f64) {
        if self.is_attached() {
            self.vel = dir.normalize_or(DVec2::NEG_Y) * speed;
            self.state = BallState::Free;
            self.reset_idle();
        }
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.vel.length()
    }

    /// Rescale to `speed` and keep a minimum vertical component so the ball
    /// can't get stuck bouncing sideways
    pub fn set_speed(&mut self, speed: f64) {
        let mut dir = self.vel.normalize_or(DVec2::NEG_Y);
        if dir.y.abs() < BALL_MIN_VERTICAL {
            let sy = if dir.y < 0.0 { -1.0 } else { 1.0 };
            let sx = if dir.x < 0.0 { -1.0 } else { 1.0 };
            dir = DVec2::new(
                sx * (1.0 - BALL_MIN_VERTICAL * BALL_MIN_VERTICAL).sqrt(),
                sy * BALL_MIN_VERTICAL,
            );
        }
        self.vel = dir * speed;
    }

    pub fn reset_idle(&mut self) {
        self.idle = Counter::timeout(BALL_IDLE_RETURN_MS);
        self.return_ready = false;
    }

    /// Advance the idle timer; sets `return_ready` once it runs out
    pub fn update_idle(&mut self, ms: u32) {
        if !self.is_attached() && self.idle.update(ms) {
            self.return_ready = true;
        }
    }
}

/// Ball speed limits and the per-hit acceleration ramp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSpeed {
    pub min: f64,
    pub max: f64,
    /// Current base speed
    pub cur: f64,
    /// Added per effective brick hit
    pub step: f64,
}

impl BallSpeed {
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        let max = max.max(min);
        Self {
            min,
            max,
            cur: min,
            step,
        }
    }

    pub fn accelerate(&mut self) {
        self.cur = (self.cur + self.step).min(self.max);
    }

    /// Speed every free ball should have this tick
    pub fn target(&self, slow: bool, fast: bool) -> f64 {
        let v = if slow {
            self.min
        } else if fast {
            self.max
        } else {
            self.cur
        };
        v.clamp(self.min, self.max)
    }
}
