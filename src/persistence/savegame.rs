//! Saved game progress
//!
//! Only per-player progress is stored (level, score, lives); a resumed
//! game restarts the saved level from its canonical layout.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{KvDoc, PersistError};
use crate::settings::Difficulty;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPlayer {
    pub name: String,
    pub level: usize,
    pub score: i32,
    pub lives: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGame {
    pub levelset: String,
    pub difficulty: Difficulty,
    pub cur_player: usize,
    pub players: Vec<SavedPlayer>,
}

impl SaveGame {
    pub fn to_kv(&self) -> KvDoc {
        let mut doc = KvDoc::new();
        doc.set("levelset", &self.levelset);
        doc.set("difficulty", self.difficulty.index());
        doc.set("curplayer", self.cur_player);
        doc.set("players", self.players.len());
        for (i, p) in self.players.iter().enumerate() {
            doc.set(&format!("player{i}.name"), &p.name);
            doc.set(&format!("player{i}.level"), p.level);
            doc.set(&format!("player{i}.score"), p.score);
            doc.set(&format!("player{i}.lives"), p.lives);
        }
        doc
    }

    /// Missing level set name or player count makes the save unusable;
    /// other missing fields fall back to defaults
    pub fn from_kv(doc: &KvDoc) -> Result<Self, PersistError> {
        let levelset = doc
            .get("levelset")
            .ok_or_else(|| PersistError::Corrupted("no levelset name".into()))?
            .to_string();
        let count: usize = doc
            .parse_value("players")?
            .ok_or_else(|| PersistError::Corrupted("no player count".into()))?;
        if count == 0 || count > crate::session::MAX_PLAYERS {
            return Err(PersistError::Corrupted(format!("bad player count {count}")));
        }

        let mut difficulty = Difficulty::default().index();
        doc.read_into("difficulty", &mut difficulty);

        let mut cur_player = 0usize;
        doc.read_into("curplayer", &mut cur_player);
        if cur_player >= count {
            cur_player = 0;
        }

        let players = (0..count)
            .map(|i| {
                let mut p = SavedPlayer {
                    name: format!("Player{}", i + 1),
                    level: 0,
                    score: 0,
                    lives: 3,
                };
                doc.read_into(&format!("player{i}.name"), &mut p.name);
                doc.read_into(&format!("player{i}.level"), &mut p.level);
                doc.read_into(&format!("player{i}.score"), &mut p.score);
                doc.read_into(&format!("player{i}.lives"), &mut p.lives);
                p
            })
            .collect();

        Ok(Self {
            levelset,
            difficulty: Difficulty::from_index(difficulty),
            cur_player,
            players,
        })
    }

    pub fn parse(text: &str) -> Result<Self, PersistError> {
        Self::from_kv(&KvDoc::parse(text))
    }

    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let save = Self::from_kv(&KvDoc::load(path)?)?;
        log::info!("Loaded saved game from {}", path.display());
        Ok(save)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        self.to_kv().save(path)?;
        log::info!("Game saved to {}", path.display());
        Ok(())
    }
}
