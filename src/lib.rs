//! Brickworks - a hex-grid Breakout engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (balls, paddle, bricks, extras, bonus levels)
//! - `session`: Player turns, lives and level progression on top of `sim`
//! - `settings`: Game configuration (flat key=value file)
//! - `highscores`: Per-levelset hiscore charts
//! - `persistence`: key=value codec and save games

pub mod highscores;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod sim;

pub use highscores::{HiscoreChart, Hiscores};
pub use session::{PaddleInput, Player, Session, TickFlags};
pub use settings::{Difficulty, Settings};

use glam::DVec2;

/// Game configuration constants
pub mod consts {
    /// Map dimensions in tiles (including the border walls)
    pub const MAP_WIDTH: usize = 16;
    pub const MAP_HEIGHT: usize = 24;

    /// Editable brick area (level files store this many columns/rows,
    /// placed at tile offset 1,1)
    pub const EDIT_WIDTH: usize = MAP_WIDTH - 2;
    pub const EDIT_HEIGHT: usize = 18;

    /// Tile size in map units
    pub const BRICK_WIDTH: f64 = 40.0;
    pub const BRICK_HEIGHT: f64 = 20.0;

    /// Playfield bounds in map units
    pub const FIELD_WIDTH: f64 = MAP_WIDTH as f64 * BRICK_WIDTH;
    pub const FIELD_HEIGHT: f64 = MAP_HEIGHT as f64 * BRICK_HEIGHT;

    /// Paddle defaults
    pub const PADDLE_Y: f64 = (MAP_HEIGHT - 2) as f64 * BRICK_HEIGHT;
    pub const PADDLE_HEIGHT: f64 = 10.0;
    pub const PADDLE_SIZE_STEP: f64 = 20.0;
    /// Share of the paddle velocity handed to the ball on flat paddles
    pub const PADDLE_FRICTION: f64 = 0.3;
    /// Maximum deflection from vertical on convex paddles (radians, ~60 degrees)
    pub const CONVEX_MAX_ANGLE: f64 = 1.05;

    /// Bottom wall (wall extra) surface
    pub const WALL_Y: f64 = (MAP_HEIGHT - 1) as f64 * BRICK_HEIGHT;

    /// Ball defaults
    pub const BALL_RADIUS: f64 = 6.0;
    pub const MAX_BALLS: usize = 20;
    /// Collision resolutions per ball and tick in trajectory mode
    pub const MAX_BOUNCES_PER_TICK: usize = 8;
    /// Minimum share of the speed that must point vertically
    pub const BALL_MIN_VERTICAL: f64 = 0.25;
    /// Launch angle from vertical for fire buttons (radians)
    pub const BALL_LAUNCH_ANGLE: f64 = 0.5;
    /// Idle time without an effective brick hit before a ball may return
    pub const BALL_IDLE_RETURN_MS: u32 = 10_000;

    /// Brick timings
    pub const BRICK_EXP_TIME_MS: u32 = 150;
    pub const REGEN_TIME_MS: u32 = 8_000;
    pub const GROW_TIME_MS: u32 = 10_000;

    /// Extras
    pub const EXTRA_FALL_SPEED: f64 = 0.05;
    pub const EXTRA_MAGNET_SPEED: f64 = 0.1;
    pub const TIME_ADD_MS: u32 = 7_000;
    pub const GOLDSHOWER_DELAY_MS: u32 = 1_000;
    pub const WEAK_BALL_ENERGY: u8 = 5;
    pub const GHOST_HIDE_MS: u32 = 250;

    /// Weapon
    pub const WEAPON_DELAY_MS: u32 = 150;
    pub const SHOT_SPEED: f64 = 0.2;
}

use consts::*;

/// Top-left corner of a tile in map units
#[inline]
pub fn tile_origin(x: i32, y: i32) -> DVec2 {
    DVec2::new(x as f64 * BRICK_WIDTH, y as f64 * BRICK_HEIGHT)
}

/// Center of a tile in map units
#[inline]
pub fn tile_center(x: i32, y: i32) -> DVec2 {
    tile_origin(x, y) + DVec2::new(BRICK_WIDTH / 2.0, BRICK_HEIGHT / 2.0)
}

/// Tile containing a point (may be outside the map)
#[inline]
pub fn tile_at(pos: DVec2) -> (i32, i32) {
    (
        (pos.x / BRICK_WIDTH).floor() as i32,
        (pos.y / BRICK_HEIGHT).floor() as i32,
    )
}

/// Rotate a vector by an angle in radians
#[inline]
pub fn rotate(v: DVec2, angle: f64) -> DVec2 {
    let (s, c) = angle.sin_cos();
    DVec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Direction for an angle measured from straight up (negative = left)
#[inline]
pub fn launch_direction(angle: f64) -> DVec2 {
    DVec2::new(angle.sin(), -angle.cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_roundtrip() {
        let c = tile_center(5, 7);
        assert_eq!(tile_at(c), (5, 7));
        assert_eq!(tile_at(DVec2::new(-1.0, 0.0)), (-1, 0));
    }

    #[test]
    fn test_launch_direction_points_up() {
        let d = launch_direction(0.0);
        assert!(d.x.abs() < 1e-9);
        assert!((d.y + 1.0).abs() < 1e-9);
        assert!(launch_direction(0.3).x > 0.0);
        assert!(launch_direction(-0.3).x < 0.0);
    }

    #[test]
    fn test_rotate_keeps_length() {
        let v = DVec2::new(0.3, -0.4);
        let r = rotate(v, 1.1);
        assert!((r.length() - v.length()).abs() < 1e-12);
    }
}
