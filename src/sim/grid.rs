//! Brick grid and brick lifecycle
//!
//! The map is a `MAP_WIDTH` x `MAP_HEIGHT` tile grid. Odd columns are treated
//! as shifted half a tile down when walking neighbours (hex offset layout), so
//! explosions, growth and outbreaks spread over six neighbours.

use serde::{Deserialize, Serialize};

use super::extras::ExtraKind;
use super::timer::Counter;
use crate::consts::*;

/// Brick types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrickKind {
    #[default]
    Empty,
    /// Border tile, never destroyed
    Wall,
    Regular,
    /// Only energy balls and explosions remove it; doesn't count for clear
    Indestructible,
    /// Indestructible, reflects balls in a random direction
    Chaotic,
    /// Blasts its neighbours when destroyed
    Explosive,
    /// Comes back after `REGEN_TIME_MS`
    Regenerative,
    /// Periodically fills an empty neighbour with a new brick
    Growing,
    MultiHit,
}

impl BrickKind {
    /// Returns true if this brick must be destroyed to clear the level
    pub fn counts_for_clear(self) -> bool {
        matches!(
            self,
            BrickKind::Regular
                | BrickKind::Explosive
                | BrickKind::Regenerative
                | BrickKind::Growing
                | BrickKind::MultiHit
        )
    }
}

/// Lifecycle of a single tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BrickState {
    Intact {
        hits: u8,
    },
    /// Removed when the countdown elapses
    Exploding {
        countdown: Counter,
        /// Destroy the neighbours too
        blast: bool,
        /// Score override (debug destruction applies a penalty here)
        score: Option<i32>,
    },
    Empty {
        /// Pending regeneration
        regen: Option<Counter>,
    },
}

/// A single tile of the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brick {
    pub kind: BrickKind,
    /// Visual id (index into the brick conversion table)
    pub id: u8,
    pub max_hits: u8,
    pub score: i32,
    /// Extra released on destruction
    pub extra: Option<ExtraKind>,
    /// Hidden until hit once
    pub invisible: bool,
    pub state: BrickState,
    /// Growth timer of growing bricks
    pub grow: Option<Counter>,
}

impl Brick {
    pub fn new(kind: BrickKind, id: u8, hits: u8, score: i32) -> Self {
        let grow = (kind == BrickKind::Growing).then(|| Counter::timeout(GROW_TIME_MS));
        Self {
            kind,
            id,
            max_hits: hits.max(1),
            score,
            extra: None,
            invisible: false,
            state: BrickState::Intact { hits: hits.max(1) },
            grow,
        }
    }

    pub fn empty() -> Self {
        Self {
            kind: BrickKind::Empty,
            id: 0,
            max_hits: 0,
            score: 0,
            extra: None,
            invisible: false,
            state: BrickState::Empty { regen: None },
            grow: None,
        }
    }

    pub fn wall() -> Self {
        Self::new(BrickKind::Wall, 0, 1, 0)
    }

    /// Balls and shots collide with it
    #[inline]
    pub fn is_solid(&self) -> bool {
        matches!(self.state, BrickState::Intact { .. })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self.state, BrickState::Empty { .. })
    }

    /// Free tile without pending regeneration
    #[inline]
    pub fn is_vacant(&self) -> bool {
        matches!(self.state, BrickState::Empty { regen: None })
    }

    #[inline]
    pub fn is_exploding(&self) -> bool {
        matches!(self.state, BrickState::Exploding { .. })
    }

    pub fn hits(&self) -> u8 {
        match self.state {
            BrickState::Intact { hits } => hits,
            _ => 0,
        }
    }

    /// Intact brick that still has to be cleared
    pub fn counts_for_clear(&self) -> bool {
        self.is_solid() && self.kind.counts_for_clear()
    }
}

/// Result of a normal (non-energy) hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Brick ignores the hit (wall, indestructible, chaotic)
    Unharmed,
    /// Lost a hit point but stands
    Damaged,
    /// Out of hit points; caller removes or explodes it
    Broken,
}

/// What was on a tile that just got removed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemovedBrick {
    pub x: i32,
    pub y: i32,
    pub kind: BrickKind,
    pub score: i32,
    pub extra: Option<ExtraKind>,
}

/// A brick explosion whose countdown elapsed this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinishedExplosion {
    pub x: i32,
    pub y: i32,
    pub blast: bool,
    pub score: Option<i32>,
}

/// Move one tile from `x,y` in hex direction `dir`
/// (0 up, clockwise, 5 left-up; odd columns sit half a tile lower)
pub fn goto_tile(x: &mut i32, y: &mut i32, dir: u8) {
    match dir {
        0 => *y -= 1,
        1 => {
            if *x & 1 == 0 {
                *y -= 1;
            }
            *x += 1;
        }
        2 => {
            if *x & 1 == 1 {
                *y += 1;
            }
            *x += 1;
        }
        3 => *y += 1,
        4 => {
            if *x & 1 == 1 {
                *y += 1;
            }
            *x -= 1;
        }
        5 => {
            if *x & 1 == 0 {
                *y -= 1;
            }
            *x -= 1;
        }
        _ => {}
    }
}

/// Number of hex steps between two tiles
pub fn tile_distance(mut x1: i32, mut y1: i32, x2: i32, y2: i32) -> u32 {
    let mut range = 0;
    while x1 != x2 || y1 != y2 {
        if y1 < y2 {
            if x1 < x2 {
                goto_tile(&mut x1, &mut y1, 2);
            } else if x1 > x2 {
                goto_tile(&mut x1, &mut y1, 4);
            } else {
                y1 += 1;
            }
        } else if y1 > y2 {
            if x1 < x2 {
                goto_tile(&mut x1, &mut y1, 1);
            } else if x1 > x2 {
                goto_tile(&mut x1, &mut y1, 5);
            } else {
                y1 -= 1;
            }
        } else if x1 < x2 {
            x1 += 1;
        } else {
            x1 -= 1;
        }
        range += 1;
    }
    range
}

/// Inside the border, the only place bricks may ever be destroyed
#[inline]
pub fn is_interior(x: i32, y: i32) -> bool {
    x >= 1 && y >= 1 && x <= MAP_WIDTH as i32 - 2 && y <= MAP_HEIGHT as i32 - 2
}

/// Inside the area level files can fill (growth and spreading stay here)
#[inline]
pub fn is_brick_area(x: i32, y: i32) -> bool {
    x >= 1 && y >= 1 && x <= EDIT_WIDTH as i32 && y <= EDIT_HEIGHT as i32
}

/// The brick map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrickGrid {
    tiles: Vec<Brick>,
}

impl Default for BrickGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl BrickGrid {
    /// Empty map surrounded by walls (left, right and top)
    pub fn new() -> Self {
        let mut grid = Self {
            tiles: vec![Brick::empty(); MAP_WIDTH * MAP_HEIGHT],
        };
        for x in 0..MAP_WIDTH as i32 {
            grid.tiles[Self::index(x, 0)] = Brick::wall();
        }
        for y in 0..MAP_HEIGHT as i32 {
            grid.tiles[Self::index(0, y)] = Brick::wall();
            grid.tiles[Self::index(MAP_WIDTH as i32 - 1, y)] = Brick::wall();
        }
        grid
    }

    #[inline]
    fn index(x: i32, y: i32) -> usize {
        x as usize * MAP_HEIGHT + y as usize
    }

    #[inline]
    pub fn in_bounds(x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < MAP_WIDTH as i32 && y < MAP_HEIGHT as i32
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Brick> {
        Self::in_bounds(x, y).then(|| &self.tiles[Self::index(x, y)])
    }

    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Brick> {
        if Self::in_bounds(x, y) {
            Some(&mut self.tiles[Self::index(x, y)])
        } else {
            None
        }
    }

    /// Solid for collision purposes; beyond the side and top edges counts as
    /// wall, below the map is open
    pub fn is_solid_at(&self, x: i32, y: i32) -> bool {
        if y >= MAP_HEIGHT as i32 {
            return false;
        }
        match self.get(x, y) {
            Some(brick) => brick.is_solid(),
            None => true,
        }
    }

    /// Occupied by an intact brick that removal may touch
    pub fn is_destructible(&self, x: i32, y: i32) -> bool {
        is_interior(x, y)
            && self
                .get(x, y)
                .is_some_and(|b| b.kind != BrickKind::Wall && b.is_solid())
    }

    /// Put a brick on an interior tile
    pub fn place(&mut self, x: i32, y: i32, brick: Brick) -> bool {
        if !is_interior(x, y) {
            log::warn!("place: tile {},{} is not inside the playfield", x, y);
            return false;
        }
        self.tiles[Self::index(x, y)] = brick;
        true
    }

    /// Clear an interior tile without any side effects
    pub fn clear(&mut self, x: i32, y: i32) {
        if is_interior(x, y) {
            self.tiles[Self::index(x, y)] = Brick::empty();
        }
    }

    /// Apply a normal hit
    pub fn damage(&mut self, x: i32, y: i32) -> HitOutcome {
        if !self.is_destructible(x, y) {
            return HitOutcome::Unharmed;
        }
        let brick = &mut self.tiles[Self::index(x, y)];
        brick.invisible = false;
        if !brick.kind.counts_for_clear() {
            return HitOutcome::Unharmed;
        }
        if let BrickState::Intact { hits } = &mut brick.state {
            *hits = hits.saturating_sub(1);
            if *hits == 0 {
                return HitOutcome::Broken;
            }
        }
        HitOutcome::Damaged
    }

    /// Remove a brick (intact or exploding); regenerative bricks leave a
    /// pending regeneration behind
    pub fn remove(&mut self, x: i32, y: i32) -> Option<RemovedBrick> {
        if !is_interior(x, y) {
            return None;
        }
        let brick = self.tiles[Self::index(x, y)];
        if brick.kind == BrickKind::Wall || brick.is_empty() {
            return None;
        }
        let removed = RemovedBrick {
            x,
            y,
            kind: brick.kind,
            score: brick.score,
            extra: brick.extra,
        };
        let slot = &mut self.tiles[Self::index(x, y)];
        if brick.kind == BrickKind::Regenerative {
            slot.state = BrickState::Empty {
                regen: Some(Counter::timeout(REGEN_TIME_MS)),
            };
            slot.extra = None;
        } else {
            *slot = Brick::empty();
        }
        Some(removed)
    }

    /// Start the explosion countdown of an intact brick
    pub fn start_explosion(&mut self, x: i32, y: i32, blast: bool, score: Option<i32>) -> bool {
        if !self.is_destructible(x, y) {
            return false;
        }
        self.tiles[Self::index(x, y)].state = BrickState::Exploding {
            countdown: Counter::timeout(BRICK_EXP_TIME_MS),
            blast,
            score,
        };
        true
    }

    /// Advance explosion countdowns; finished explosions are returned in
    /// column-major tile order and left for the caller to remove
    pub fn update_explosions(&mut self, ms: u32) -> Vec<FinishedExplosion> {
        let mut finished = Vec::new();
        for x in 1..MAP_WIDTH as i32 - 1 {
            for y in 1..MAP_HEIGHT as i32 - 1 {
                let brick = &mut self.tiles[Self::index(x, y)];
                if let BrickState::Exploding {
                    countdown,
                    blast,
                    score,
                } = &mut brick.state
                {
                    if countdown.expired() || countdown.update(ms) {
                        finished.push(FinishedExplosion {
                            x,
                            y,
                            blast: *blast,
                            score: *score,
                        });
                    }
                }
            }
        }
        finished
    }

    /// Advance regeneration timers; returns tiles ready to come back
    pub fn update_regeneration(&mut self, ms: u32) -> Vec<(i32, i32)> {
        let mut ready = Vec::new();
        for x in 1..MAP_WIDTH as i32 - 1 {
            for y in 1..MAP_HEIGHT as i32 - 1 {
                let brick = &mut self.tiles[Self::index(x, y)];
                if let BrickState::Empty { regen: Some(timer) } = &mut brick.state {
                    if timer.expired() || timer.update(ms) {
                        ready.push((x, y));
                    }
                }
            }
        }
        ready
    }

    /// Bring a regenerative brick back with full hit points
    pub fn regenerate(&mut self, x: i32, y: i32) -> bool {
        let Some(brick) = self.get_mut(x, y) else {
            return false;
        };
        if !matches!(brick.state, BrickState::Empty { regen: Some(_) }) {
            return false;
        }
        brick.state = BrickState::Intact {
            hits: brick.max_hits,
        };
        true
    }

    /// Advance growth timers; returns growing bricks due to spread
    pub fn update_growth(&mut self, ms: u32) -> Vec<(i32, i32)> {
        let mut due = Vec::new();
        for x in 1..MAP_WIDTH as i32 - 1 {
            for y in 1..MAP_HEIGHT as i32 - 1 {
                let brick = &mut self.tiles[Self::index(x, y)];
                if !brick.is_solid() {
                    continue;
                }
                if let Some(timer) = &mut brick.grow {
                    if timer.update(ms) {
                        timer.reset();
                        due.push((x, y));
                    }
                }
            }
        }
        due
    }

    /// Tiles within `radius` hex steps (excluding the tile itself), in
    /// row-major order
    pub fn neighbours(x: i32, y: i32, radius: u32) -> Vec<(i32, i32)> {
        let r = radius as i32;
        let mut out = Vec::new();
        for ny in (y - r)..=(y + r) {
            for nx in (x - r)..=(x + r) {
                if (nx, ny) == (x, y) || !Self::in_bounds(nx, ny) {
                    continue;
                }
                if tile_distance(x, y, nx, ny) <= radius {
                    out.push((nx, ny));
                }
            }
        }
        out
    }

    /// Intact bricks that still have to be cleared
    pub fn bricks_left(&self) -> u32 {
        self.tiles.iter().filter(|b| b.counts_for_clear()).count() as u32
    }

    /// Some brick is still counting down to its explosion
    pub fn explosions_pending(&self) -> bool {
        self.tiles.iter().any(Brick::is_exploding)
    }

    /// Iterate over `(x, y, brick)` for every tile
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &Brick)> {
        self.tiles.iter().enumerate().map(|(i, b)| {
            (
                (i / MAP_HEIGHT) as i32,
                (i % MAP_HEIGHT) as i32,
                b,
            )
        })
    }
}
