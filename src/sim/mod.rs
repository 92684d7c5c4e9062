//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Variable timestep driven only by the caller's elapsed milliseconds
//! - Seeded RNG only
//! - Stable iteration order (by entity ID, bricks column-major)
//! - No rendering or platform dependencies

pub mod ball;
pub mod bonus;
pub mod collision;
pub mod extras;
pub mod grid;
pub mod level;
pub mod paddle;
pub mod state;
pub mod tick;
pub mod timer;

pub use ball::{Ball, BallModifier, BallSpeed, BallState};
pub use bonus::{BonusKind, BonusRules};
pub use collision::{CollisionResult, Contact};
pub use extras::{ActiveExtras, ExtraKind, FallingExtra};
pub use grid::{Brick, BrickGrid, BrickKind, goto_tile, tile_distance};
pub use level::{Level, LevelError, LevelSet};
pub use paddle::{Paddle, Shot};
pub use state::{BccType, BrickHit, Game, GameConfig, HitKind, LevelOutcome, Modifications};
pub use tick::{TickInput, tick};
pub use timer::{Counter, CounterMode};
