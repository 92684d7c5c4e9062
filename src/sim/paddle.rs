//! The player's paddle and its weapon shots

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::extras::{ActiveExtras, ExtraKind};
use super::timer::Counter;
use crate::consts::*;

/// The bottom paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    pub w: f64,
    pub min_w: f64,
    pub max_w: f64,
    /// Horizontal velocity handed to balls on flat paddles (units/ms)
    pub v_x: f64,
    pub score: i32,
    /// Paddle-scoped extras
    pub extras: ActiveExtras,
    pub fire_left: bool,
    pub fire_right: bool,
    pub recall: bool,
    /// Maximum ball speed requested (speed-up key)
    pub speed_request: bool,
    pub weapon_delay: Counter,
    /// Ghost paddle: time standing still before it fades
    pub ghost_hide: Counter,
    /// Ghost paddle currently faded out (not solid)
    pub invisible: bool,
    moved: bool,
}

impl Paddle {
    pub fn new(w: f64, min_w: f64, max_w: f64) -> Self {
        Self {
            x: (FIELD_WIDTH - w) / 2.0,
            y: PADDLE_Y,
            w,
            min_w,
            max_w,
            v_x: 0.0,
            score: 0,
            extras: ActiveExtras::default(),
            fire_left: false,
            fire_right: false,
            recall: false,
            speed_request: false,
            weapon_delay: Counter::default(),
            ghost_hide: Counter::timeout(GHOST_HIDE_MS),
            invisible: false,
            moved: false,
        }
    }

    #[inline]
    pub fn center_x(&self) -> f64 {
        self.x + self.w / 2.0
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    #[inline]
    pub fn has(&self, kind: ExtraKind) -> bool {
        self.extras.is_active(kind)
    }

    /// Balls bounce off it (ghost paddles only while visible)
    #[inline]
    pub fn is_solid(&self) -> bool {
        !self.invisible
    }

    /// Move the left edge, clamped between the side walls; frozen paddles
    /// stay put
    pub fn set_x(&mut self, x: f64) {
        if self.has(ExtraKind::Frozen) {
            return;
        }
        let x = x.clamp(BRICK_WIDTH, FIELD_WIDTH - BRICK_WIDTH - self.w);
        if x != self.x {
            self.moved = true;
        }
        self.x = x;
    }

    /// Grow or shrink around the center within the size limits
    pub fn resize(&mut self, delta: f64) {
        let center = self.center_x();
        self.w = (self.w + delta).clamp(self.min_w, self.max_w);
        self.x = (center - self.w / 2.0).clamp(BRICK_WIDTH, FIELD_WIDTH - BRICK_WIDTH - self.w);
    }

    /// Ghost paddles fade out when standing still and reappear on motion
    pub fn update_ghost(&mut self, ms: u32) {
        if !self.has(ExtraKind::GhostPaddle) {
            self.invisible = false;
        } else if self.moved {
            self.ghost_hide = Counter::timeout(GHOST_HIDE_MS);
            self.invisible = false;
        } else if self.ghost_hide.update(ms) || self.ghost_hide.expired() {
            self.invisible = true;
        }
        self.moved = false;
    }

    /// Returns true when the weapon is ready and fire is held; restarts the
    /// delay
    pub fn try_fire_weapon(&mut self, ms: u32) -> bool {
        self.weapon_delay.update(ms);
        if !self.has(ExtraKind::Weapon) || !(self.fire_left || self.fire_right) {
            return false;
        }
        if self.weapon_delay.is_running() {
            return false;
        }
        self.weapon_delay = Counter::timeout(WEAPON_DELAY_MS);
        true
    }

    /// Muzzle positions of the two guns
    pub fn gun_positions(&self) -> [DVec2; 2] {
        [
            DVec2::new(self.x + self.w / 4.0, self.y),
            DVec2::new(self.right() - self.w / 4.0, self.y),
        ]
    }
}

/// A weapon shot travelling up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub pos: DVec2,
}

impl Shot {
    pub fn step(&mut self, ms: u32) {
        self.pos.y -= SHOT_SPEED * ms as f64;
    }
}
