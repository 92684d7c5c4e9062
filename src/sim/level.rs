//! Levels and level sets
//!
//! A level stores its bricks and extras as one character per tile of the
//! editable area. The conversion tables below turn those characters into
//! bricks and extras when a level is loaded into a [`BrickGrid`].

use std::fmt;
use std::path::Path;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bonus::BonusKind;
use super::extras::ExtraKind;
use super::grid::{Brick, BrickGrid, BrickKind};
use crate::consts::*;

/// Character of an empty tile in both grids
pub const EMPTY_CHAR: u8 = b'.';

/// Brick conversion table row
#[derive(Debug, Clone, Copy)]
pub struct BrickDef {
    pub ch: u8,
    pub kind: BrickKind,
    pub hits: u8,
    pub score: i32,
    pub invisible: bool,
}

const fn def(ch: u8, kind: BrickKind, hits: u8, score: i32) -> BrickDef {
    BrickDef {
        ch,
        kind,
        hits,
        score,
        invisible: false,
    }
}

/// Brick characters; the row index is the brick id used by the editor
pub const BRICK_TABLE: &[BrickDef] = &[
    def(b'#', BrickKind::Indestructible, 1, 1000),
    def(b'@', BrickKind::Chaotic, 1, 1000),
    def(b'a', BrickKind::Regular, 1, 100),
    def(b'b', BrickKind::Regular, 1, 100),
    def(b'c', BrickKind::Regular, 1, 100),
    def(b'd', BrickKind::Regular, 1, 100),
    def(b'e', BrickKind::Regular, 1, 100),
    def(b'f', BrickKind::Regular, 1, 100),
    def(b'g', BrickKind::Growing, 1, 100),
    def(b'h', BrickKind::Regular, 1, 100),
    def(b'j', BrickKind::Regular, 1, 100),
    def(b'k', BrickKind::Regular, 1, 100),
    def(b'v', BrickKind::MultiHit, 2, 200),
    def(b'w', BrickKind::MultiHit, 3, 300),
    def(b'x', BrickKind::MultiHit, 4, 400),
    BrickDef {
        ch: b'i',
        kind: BrickKind::MultiHit,
        hits: 2,
        score: 200,
        invisible: true,
    },
    def(b'*', BrickKind::Explosive, 1, 100),
    def(b'r', BrickKind::Regenerative, 1, 100),
];

/// Look up a brick character; returns the brick id and its definition
pub fn brick_def(ch: u8) -> Option<(u8, &'static BrickDef)> {
    BRICK_TABLE
        .iter()
        .enumerate()
        .find(|(_, d)| d.ch == ch)
        .map(|(i, d)| (i as u8, d))
}

/// Create the brick for a level character (`None` for empty or unknown)
pub fn brick_from_char(ch: u8) -> Option<Brick> {
    if ch == EMPTY_CHAR {
        return None;
    }
    let Some((id, d)) = brick_def(ch) else {
        log::warn!("Unknown brick character '{}'", ch as char);
        return None;
    };
    let mut brick = Brick::new(d.kind, id, d.hits, d.score);
    brick.invisible = d.invisible;
    Some(brick)
}

/// Errors from parsing level text
#[derive(Debug)]
pub enum LevelError {
    Io(std::io::Error),
    /// Expected a section header such as `Bricks:`
    MissingSection { line: usize, expected: &'static str },
    /// A grid row ended early or the file was truncated
    ShortRow { line: usize },
    /// No `Level:` entries at all
    Empty,
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io(e) => write!(f, "level file: {e}"),
            LevelError::MissingSection { line, expected } => {
                write!(f, "line {line}: expected '{expected}'")
            }
            LevelError::ShortRow { line } => write!(f, "line {line}: grid row too short"),
            LevelError::Empty => write!(f, "levelset contains no levels"),
        }
    }
}

impl std::error::Error for LevelError {}

impl From<std::io::Error> for LevelError {
    fn from(e: std::io::Error) -> Self {
        LevelError::Io(e)
    }
}

/// A single level layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub author: String,
    pub title: String,
    /// Brick characters, column-major (`x * EDIT_HEIGHT + y`)
    bricks: Vec<u8>,
    /// Extra characters, same layout
    extras: Vec<u8>,
}

impl Default for Level {
    fn default() -> Self {
        Self::empty("untitled", "unknown")
    }
}

impl Level {
    pub fn empty(title: &str, author: &str) -> Self {
        Self {
            author: author.to_string(),
            title: title.to_string(),
            bricks: vec![EMPTY_CHAR; EDIT_WIDTH * EDIT_HEIGHT],
            extras: vec![EMPTY_CHAR; EDIT_WIDTH * EDIT_HEIGHT],
        }
    }

    #[inline]
    fn index(x: usize, y: usize) -> Option<usize> {
        (x < EDIT_WIDTH && y < EDIT_HEIGHT).then_some(x * EDIT_HEIGHT + y)
    }

    /// Brick character at editor position `x, y`
    pub fn brick_char(&self, x: usize, y: usize) -> u8 {
        Self::index(x, y).map_or(EMPTY_CHAR, |i| self.bricks[i])
    }

    pub fn extra_char(&self, x: usize, y: usize) -> u8 {
        Self::index(x, y).map_or(EMPTY_CHAR, |i| self.extras[i])
    }

    /// Non-ASCII characters are stored as empty tiles
    pub fn set_brick(&mut self, x: usize, y: usize, ch: u8) {
        if let Some(i) = Self::index(x, y) {
            self.bricks[i] = layout_char(ch);
        }
    }

    pub fn set_extra(&mut self, x: usize, y: usize, ch: u8) {
        if let Some(i) = Self::index(x, y) {
            self.extras[i] = layout_char(ch);
        }
    }

    /// Bonus level type encoded in the title
    pub fn bonus_kind(&self) -> Option<BonusKind> {
        BonusKind::from_title(&self.title)
    }

    /// Build a level from the editor's working arrays, where each entry is a
    /// conversion table index or -1 for nothing
    pub fn from_editor_grid(
        title: &str,
        author: &str,
        bricks: &[[i32; EDIT_HEIGHT]; EDIT_WIDTH],
        extras: &[[i32; EDIT_HEIGHT]; EDIT_WIDTH],
    ) -> Self {
        let mut level = Self::empty(title, author);
        for x in 0..EDIT_WIDTH {
            for y in 0..EDIT_HEIGHT {
                if let Some(d) = usize::try_from(bricks[x][y])
                    .ok()
                    .and_then(|i| BRICK_TABLE.get(i))
                {
                    level.set_brick(x, y, d.ch);
                }
                if let Some(kind) = usize::try_from(extras[x][y])
                    .ok()
                    .and_then(ExtraKind::from_index)
                {
                    level.set_extra(x, y, kind.symbol());
                }
            }
        }
        level
    }

    /// Fill a fresh grid from this layout (editor area starts at tile 1,1)
    pub fn build_grid(&self) -> BrickGrid {
        let mut grid = BrickGrid::new();
        for x in 0..EDIT_WIDTH {
            for y in 0..EDIT_HEIGHT {
                let Some(mut brick) = brick_from_char(self.brick_char(x, y)) else {
                    continue;
                };
                let extra = self.extra_char(x, y);
                if extra != EMPTY_CHAR {
                    brick.extra = ExtraKind::from_symbol(extra);
                    if brick.extra.is_none() {
                        log::warn!("Unknown extra character '{}'", extra as char);
                    }
                }
                grid.place(x as i32 + 1, y as i32 + 1, brick);
            }
        }
        grid
    }

    fn write_text(&self, out: &mut String) {
        out.push_str("Level:\n");
        out.push_str(&self.author);
        out.push('\n');
        out.push_str(&self.title);
        out.push('\n');
        for (header, grid) in [("Bricks:", &self.bricks), ("Bonus:", &self.extras)] {
            out.push_str(header);
            out.push('\n');
            for y in 0..EDIT_HEIGHT {
                for x in 0..EDIT_WIDTH {
                    out.push(grid[x * EDIT_HEIGHT + y] as char);
                }
                out.push('\n');
            }
        }
    }
}

/// Layouts hold printable ASCII only, so level text round-trips
fn layout_char(ch: u8) -> u8 {
    if ch.is_ascii_graphic() {
        ch
    } else {
        log::warn!("Layout character {:#04x} replaced by '.'", ch);
        EMPTY_CHAR
    }
}

/// An ordered collection of levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSet {
    pub name: String,
    pub levels: Vec<Level>,
}

/// Line cursor used by the parser
struct Lines<'a> {
    iter: std::iter::Peekable<std::iter::Enumerate<std::str::Lines<'a>>>,
    last: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.lines().enumerate().peekable(),
            last: 0,
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        self.iter.next().map(|(i, l)| {
            self.last = i + 1;
            l.trim_end_matches('\r')
        })
    }

    fn peek(&mut self) -> Option<&'a str> {
        self.iter.peek().map(|(_, l)| l.trim_end_matches('\r'))
    }

    fn expect(&mut self, header: &'static str) -> Result<(), LevelError> {
        match self.next() {
            Some(l) if l.trim() == header => Ok(()),
            _ => Err(LevelError::MissingSection {
                line: self.last,
                expected: header,
            }),
        }
    }

    fn grid(&mut self) -> Result<Vec<u8>, LevelError> {
        let mut grid = vec![EMPTY_CHAR; EDIT_WIDTH * EDIT_HEIGHT];
        for y in 0..EDIT_HEIGHT {
            let row = self
                .next()
                .ok_or(LevelError::ShortRow { line: self.last + 1 })?;
            let mut cells = row.chars();
            for x in 0..EDIT_WIDTH {
                let ch = cells.next().ok_or(LevelError::ShortRow { line: self.last })?;
                grid[x * EDIT_HEIGHT + y] = u8::try_from(ch).map_or(EMPTY_CHAR, layout_char);
            }
        }
        Ok(grid)
    }
}

impl LevelSet {
    pub fn new(name: &str, levels: Vec<Level>) -> Self {
        Self {
            name: name.to_string(),
            levels,
        }
    }

    /// Fallback set used when loading fails
    pub fn single_empty(name: &str) -> Self {
        Self::new(name, vec![Level::default()])
    }

    pub fn count(&self) -> usize {
        self.levels.len()
    }

    /// Parse levelset text
    pub fn parse(name: &str, text: &str) -> Result<Self, LevelError> {
        let mut lines = Lines::new(text);
        let mut levels = Vec::new();

        if lines.peek().is_some_and(|l| l.starts_with("Version:")) {
            lines.next();
        }
        loop {
            while lines.peek().is_some_and(|l| l.trim().is_empty()) {
                lines.next();
            }
            if lines.peek().is_none() {
                break;
            }
            lines.expect("Level:")?;
            let author = lines.next().unwrap_or_default().trim().to_string();
            let title = lines.next().unwrap_or_default().trim().to_string();
            lines.expect("Bricks:")?;
            let bricks = lines.grid()?;
            lines.expect("Bonus:")?;
            let extras = lines.grid()?;
            levels.push(Level {
                author,
                title,
                bricks,
                extras,
            });
        }

        if levels.is_empty() {
            return Err(LevelError::Empty);
        }
        log::info!("Parsed levelset '{}' with {} levels", name, levels.len());
        Ok(Self::new(name, levels))
    }

    /// Load a levelset file; the set is named after the file
    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "levels".to_string());
        Self::parse(&name, &text)
    }

    /// Load a levelset, falling back to a single empty level
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(set) => set,
            Err(e) => {
                log::error!("Could not load levelset {}: {}", path.display(), e);
                Self::single_empty("empty")
            }
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::from("Version: 1.01\n");
        for level in &self.levels {
            level.write_text(&mut out);
        }
        out
    }

    /// Insert a bonus level after every fourth level, cycling the bonus types
    pub fn with_bonus_levels(mut self) -> Self {
        let mut levels = Vec::with_capacity(self.levels.len() + self.levels.len() / 4);
        let mut next_bonus = 0;
        for (i, level) in self.levels.drain(..).enumerate() {
            levels.push(level);
            if (i + 1) % 4 == 0 {
                let kind = BonusKind::ALL[next_bonus % BonusKind::ALL.len()];
                levels.push(Level::empty(kind.title(), "bonus"));
                next_bonus += 1;
            }
        }
        self.levels = levels;
        self
    }

    /// Merge sets into one shuffled tournament set
    pub fn tournament(sets: Vec<LevelSet>, seed: u64, add_bonus_levels: bool) -> Self {
        let mut levels: Vec<Level> = sets
            .into_iter()
            .flat_map(|s| s.levels)
            .filter(|l| l.bonus_kind().is_none())
            .collect();
        let mut rng = Pcg32::seed_from_u64(seed);
        levels.shuffle(&mut rng);
        let set = Self::new("TOURNAMENT", levels);
        if add_bonus_levels {
            set.with_bonus_levels()
        } else {
            set
        }
    }
}
