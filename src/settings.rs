//! Game settings and preferences
//!
//! Persisted separately from save games as a flat key=value file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::persistence::{KvDoc, PersistError};
use crate::session::MAX_PLAYERS;
use crate::sim::state::{BccType, GameConfig};

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Kids,
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Values a difficulty level sets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyParams {
    pub lives: u32,
    pub max_lives: u32,
    pub paddle_size: f64,
    pub paddle_min: f64,
    pub paddle_max: f64,
    /// Units per millisecond
    pub ball_min_speed: f64,
    /// Speed gained per effective brick hit
    pub ball_speed_step: f64,
    /// Chance of a random extra from a destroyed brick
    pub drop_chance: f64,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Kids,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Kids => "Kids",
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kids" => Some(Difficulty::Kids),
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Index as stored in files (0 = kids)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Out of range values clamp to the hardest level
    pub fn from_index(i: usize) -> Self {
        Self::ALL[i.min(Self::ALL.len() - 1)]
    }

    pub fn params(self) -> DifficultyParams {
        match self {
            Difficulty::Kids => DifficultyParams {
                lives: 9,
                max_lives: 12,
                paddle_size: 120.0,
                paddle_min: 80.0,
                paddle_max: 200.0,
                ball_min_speed: 0.20,
                ball_speed_step: 0.0005,
                drop_chance: 0.12,
            },
            Difficulty::Easy => DifficultyParams {
                lives: 5,
                max_lives: 9,
                paddle_size: 100.0,
                paddle_min: 60.0,
                paddle_max: 180.0,
                ball_min_speed: 0.24,
                ball_speed_step: 0.0008,
                drop_chance: 0.08,
            },
            Difficulty::Medium => DifficultyParams {
                lives: 4,
                max_lives: 7,
                paddle_size: 80.0,
                paddle_min: 40.0,
                paddle_max: 160.0,
                ball_min_speed: 0.27,
                ball_speed_step: 0.001,
                drop_chance: 0.08,
            },
            Difficulty::Hard => DifficultyParams {
                lives: 3,
                max_lives: 5,
                paddle_size: 60.0,
                paddle_min: 40.0,
                paddle_max: 140.0,
                ball_min_speed: 0.30,
                ball_speed_step: 0.0012,
                drop_chance: 0.05,
            },
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // === Players ===
    pub player_count: usize,
    pub player_names: [String; MAX_PLAYERS],

    // === Game ===
    pub difficulty: Difficulty,
    pub start_level: usize,
    /// Percentage of bricks to clear before warping is allowed
    pub rel_warp_limit: u32,
    /// Insert a bonus level after every fourth level
    pub add_bonus_levels: bool,
    /// Seed for tournament shuffles
    pub freakout_seed: u64,

    // === Controls ===
    /// Mouse moves the paddle relatively (otherwise absolute)
    pub rel_motion: bool,
    /// Relative motion scale in percent
    pub motion_mod: u32,
    pub invert: bool,
    /// Key movement speed in thousandths of a unit per ms
    pub i_key_speed: u32,
    /// Idle balls only return on click (otherwise automatically)
    pub return_on_click: bool,

    // === Physics ===
    pub convex: bool,
    pub random_angle: bool,
    /// Maximum ball speed in thousandths of a unit per ms
    pub max_ball_speed: u32,
    pub ball_auto_turbo: bool,
    pub bcc: BccType,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            player_count: 1,
            player_names: std::array::from_fn(|i| format!("Player{}", i + 1)),

            difficulty: Difficulty::Medium,
            start_level: 0,
            rel_warp_limit: 80,
            add_bonus_levels: true,
            freakout_seed: 1,

            rel_motion: false,
            motion_mod: 100,
            invert: false,
            i_key_speed: 600,
            return_on_click: false,

            convex: true,
            random_angle: true,
            max_ball_speed: 700,
            ball_auto_turbo: false,
            bcc: BccType::Trajectory,
        }
    }
}

impl Settings {
    /// Paddle key speed in units per ms
    pub fn key_speed(&self) -> f64 {
        0.001 * self.i_key_speed as f64
    }

    /// Names of the players taking part
    pub fn active_names(&self) -> &[String] {
        &self.player_names[..self.player_count.clamp(1, MAX_PLAYERS)]
    }

    /// Per-level options for the simulation
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            params: self.difficulty.params(),
            bcc: self.bcc,
            convex: self.convex,
            auto_return: !self.return_on_click,
            random_angle: self.random_angle,
            auto_turbo: self.ball_auto_turbo,
            max_ball_speed: self.max_ball_speed as f64 / 1000.0,
            rel_warp_limit: self.rel_warp_limit.min(100),
        }
    }

    pub fn to_kv(&self) -> KvDoc {
        let mut doc = KvDoc::new();
        doc.set("player_count", self.player_count);
        for (i, name) in self.player_names.iter().enumerate() {
            doc.set(&format!("player{i}"), name);
        }
        doc.set("diff", self.difficulty.index());
        doc.set("starting_level", self.start_level);
        doc.set("rel_warp_limit", self.rel_warp_limit);
        doc.set("add_bonus_levels", self.add_bonus_levels as u8);
        doc.set("freakout_seed", self.freakout_seed);
        doc.set("rel_motion", self.rel_motion as u8);
        doc.set("motion_mod", self.motion_mod);
        doc.set("invert", self.invert as u8);
        doc.set("i_key_speed", self.i_key_speed);
        doc.set("return_on_click", self.return_on_click as u8);
        doc.set("convex", self.convex as u8);
        doc.set("random_angle", self.random_angle as u8);
        doc.set("maxballspeed", self.max_ball_speed);
        doc.set("ball_auto_turbo", self.ball_auto_turbo as u8);
        doc.set(
            "bcc_type",
            match self.bcc {
                BccType::Trajectory => 0,
                BccType::Clipping => 1,
            },
        );
        doc
    }

    /// Missing or malformed keys keep their defaults
    pub fn from_kv(doc: &KvDoc) -> Self {
        let mut s = Self::default();
        doc.read_into("player_count", &mut s.player_count);
        s.player_count = s.player_count.clamp(1, MAX_PLAYERS);
        for (i, name) in s.player_names.iter_mut().enumerate() {
            doc.read_into(&format!("player{i}"), name);
        }

        let mut diff = s.difficulty.index();
        doc.read_into("diff", &mut diff);
        s.difficulty = Difficulty::from_index(diff);
        doc.read_into("starting_level", &mut s.start_level);
        doc.read_into("rel_warp_limit", &mut s.rel_warp_limit);
        s.rel_warp_limit = s.rel_warp_limit.min(100);
        read_flag(doc, "add_bonus_levels", &mut s.add_bonus_levels);
        doc.read_into("freakout_seed", &mut s.freakout_seed);

        read_flag(doc, "rel_motion", &mut s.rel_motion);
        doc.read_into("motion_mod", &mut s.motion_mod);
        read_flag(doc, "invert", &mut s.invert);
        doc.read_into("i_key_speed", &mut s.i_key_speed);
        read_flag(doc, "return_on_click", &mut s.return_on_click);

        read_flag(doc, "convex", &mut s.convex);
        read_flag(doc, "random_angle", &mut s.random_angle);
        doc.read_into("maxballspeed", &mut s.max_ball_speed);
        read_flag(doc, "ball_auto_turbo", &mut s.ball_auto_turbo);
        let mut bcc = 0u8;
        doc.read_into("bcc_type", &mut bcc);
        s.bcc = if bcc == 1 {
            BccType::Clipping
        } else {
            BccType::Trajectory
        };
        s
    }

    /// Load settings; a missing or unreadable file gives defaults
    pub fn load(path: &Path) -> Self {
        match KvDoc::load(path) {
            Ok(doc) => {
                log::info!("Loaded settings from {}", path.display());
                Self::from_kv(&doc)
            }
            Err(e) => {
                log::info!("Using default settings ({e})");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        self.to_kv().save(path)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

fn read_flag(doc: &KvDoc, key: &str, flag: &mut bool) {
    let mut v = *flag as u8;
    doc.read_into(key, &mut v);
    *flag = v != 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parsing() {
        assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("med"), Some(Difficulty::Medium));
        assert_eq!(Difficulty::from_str("nightmare"), None);
        assert_eq!(Difficulty::from_index(9), Difficulty::Hard);
        for d in Difficulty::ALL {
            assert_eq!(Difficulty::from_index(d.index()), d);
        }
    }

    #[test]
    fn test_harder_means_fewer_lives() {
        let lives: Vec<u32> = Difficulty::ALL.iter().map(|d| d.params().lives).collect();
        assert!(lives.windows(2).all(|w| w[0] > w[1]));
        for d in Difficulty::ALL {
            let p = d.params();
            assert!(p.paddle_min <= p.paddle_size && p.paddle_size <= p.paddle_max);
            assert!(p.lives <= p.max_lives);
        }
    }

    #[test]
    fn test_game_config_conversion() {
        let s = Settings {
            return_on_click: true,
            max_ball_speed: 900,
            bcc: BccType::Clipping,
            ..Default::default()
        };
        let cfg = s.game_config();
        assert!(!cfg.auto_return);
        assert_eq!(cfg.max_ball_speed, 0.9);
        assert_eq!(cfg.bcc, BccType::Clipping);
        assert_eq!(cfg.rel_warp_limit, 80);
        assert!((s.key_speed() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_kv_round_trip() {
        let mut s = Settings {
            player_count: 3,
            difficulty: Difficulty::Kids,
            rel_motion: true,
            convex: false,
            bcc: BccType::Clipping,
            freakout_seed: 42,
            ..Default::default()
        };
        s.player_names[2] = "Cleo".into();
        let text = s.to_kv().to_text();
        assert_eq!(Settings::from_kv(&KvDoc::parse(&text)), s);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let doc = KvDoc::parse("player_count=99\ndiff=x\nconvex=0\nrel_warp_limit=300\n");
        let s = Settings::from_kv(&doc);
        assert_eq!(s.player_count, MAX_PLAYERS);
        assert_eq!(s.difficulty, Difficulty::Medium);
        assert!(!s.convex);
        assert_eq!(s.rel_warp_limit, 100);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let s = Settings::load(Path::new("/nonexistent/brickworks.conf"));
        assert_eq!(s, Settings::default());
    }
}
