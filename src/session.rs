//! Players, turns and level progression
//!
//! A [`Session`] runs one level at a time through a [`Game`] and decides
//! what happens when it ends: advance, lose a life, pass the turn to the
//! next player, or end the whole game. It also turns raw controls into
//! paddle motion.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::{EDIT_HEIGHT, EDIT_WIDTH};
use crate::highscores::Hiscores;
use crate::persistence::{SaveGame, SavedPlayer};
use crate::settings::Settings;
use crate::sim::extras::ExtraKind;
use crate::sim::level::{Level, LevelError, LevelSet};
use crate::sim::state::{Game, LevelOutcome};
use crate::sim::tick::TickInput;
use crate::sim::timer::Counter;

pub const MAX_PLAYERS: usize = 4;

/// Interval for refreshing extra timers and bonus info
const EXTRAS_UPDATE_MS: u32 = 200;
/// Flat paddles keep their velocity this long after the last motion
const FRICTION_TIMEOUT_MS: u32 = 200;
/// Mouse-driven paddle velocity limit (units/ms)
const MAX_MOUSE_VELOCITY: f64 = 5.0;
/// Key acceleration from half to full speed takes this long
const KEY_ACCEL_MS: f64 = 300.0;

bitflags! {
    /// What changed during [`Session::update`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TickFlags: u32 {
        const UPDATE_BACKGROUND = 1 << 0;
        const UPDATE_BRICKS = 1 << 1;
        const UPDATE_SCORE = 1 << 2;
        const UPDATE_EXTRAS = 1 << 3;
        const NEW_LEVEL = 1 << 4;
        const GAME_OVER = 1 << 5;
        /// [`Session::message`] has something to show
        const PLAYER_MESSAGE = 1 << 6;
        const NEW_ANIMATIONS = 1 << 7;
        const LIFE_LOST = 1 << 8;
        const LAST_LIFE_LOST = 1 << 9;
        /// Enough bricks cleared to warp
        const WARP_OK = 1 << 10;
        const UPDATE_INFO = 1 << 11;
        const RESTART_LEVEL = 1 << 12;
    }
}

/// Controls held during a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddleInput {
    pub left: bool,
    pub right: bool,
    /// Doubles key movement
    pub turbo: bool,
    pub fire_left: bool,
    pub fire_right: bool,
    pub speed_up: bool,
    pub recall: bool,
    pub warp: bool,
}

/// One participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub lives: u32,
    pub max_lives: u32,
    pub score: i32,
    /// Index of the current level in the level set
    pub level: usize,
    /// Layout the next attempt starts from
    pub snapshot: Level,
}

impl Player {
    pub fn new(name: &str, lives: u32, max_lives: u32) -> Self {
        log::info!("Added player {}", name);
        Self {
            name: name.to_string(),
            lives,
            max_lives,
            score: 0,
            level: 0,
            snapshot: Level::default(),
        }
    }

    pub fn gain_life(&mut self) {
        if self.lives < self.max_lives {
            self.lives += 1;
        }
    }

    /// Returns the lives left
    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    pub fn add_score(&mut self, score: i32) -> i32 {
        self.score += score;
        self.score
    }

    pub fn next_level(&mut self) -> usize {
        self.level += 1;
        self.level
    }
}

/// A running game for one or more players
pub struct Session {
    pub settings: Settings,
    pub hiscores: Hiscores,
    levelset: LevelSet,
    game: Game,
    players: Vec<Player>,
    cur_player: usize,
    /// Player whose last life went, for continuing
    last_dead: Option<usize>,
    msg: String,
    seed: u64,
    games_started: u64,

    extras_active: bool,
    extras_timeout: Counter,
    friction_timeout: Counter,
    last_px: f64,
    pvel: f64,
    pvel_dir: i8,
    pvel_min: f64,
    pvel_max: f64,
    pacc: f64,
}

impl Session {
    /// Session with an empty placeholder level; call [`Session::init`] to
    /// start playing. `seed` drives all randomness of the games it runs.
    pub fn new(settings: Settings, seed: u64) -> Self {
        let pvel_max = settings.key_speed();
        let pvel_min = pvel_max / 2.0;
        let levelset = LevelSet::single_empty("none");
        let game = Game::new(&levelset.levels[0], settings.game_config(), seed);
        Self {
            settings,
            hiscores: Hiscores::new(),
            levelset,
            game,
            players: Vec::new(),
            cur_player: 0,
            last_dead: None,
            msg: String::new(),
            seed,
            games_started: 0,
            extras_active: false,
            extras_timeout: Counter::timeout(EXTRAS_UPDATE_MS),
            friction_timeout: Counter::default(),
            last_px: -1.0,
            pvel: pvel_min,
            pvel_dir: 0,
            pvel_min,
            pvel_max,
            pacc: (pvel_max - pvel_min) / KEY_ACCEL_MS,
        }
    }

    /// Start a game on `levelset` at `level_id` for the configured players
    pub fn init(&mut self, levelset: LevelSet, level_id: usize) -> Result<(), LevelError> {
        if levelset.count() == 0 {
            log::error!("Levelset {} is empty", levelset.name);
            return Err(LevelError::Empty);
        }
        let level_id = if level_id < levelset.count() {
            level_id
        } else {
            log::warn!(
                "Start level {} outside levelset {}, starting at 0",
                level_id,
                levelset.name
            );
            0
        };

        let params = self.settings.difficulty.params();
        self.players = self
            .settings
            .active_names()
            .iter()
            .map(|name| {
                let mut p = Player::new(name, params.lives, params.max_lives);
                p.level = level_id;
                p.snapshot = levelset.levels[level_id].clone();
                p
            })
            .collect();
        self.levelset = levelset;
        self.reset_controls();
        self.start_current_player();
        log::info!(
            "Started levelset {} at level {} with {} players",
            self.levelset.name,
            level_id,
            self.players.len()
        );
        Ok(())
    }

    /// Single level game from editor arrays (conversion table indices, -1
    /// for nothing)
    pub fn init_test_level(
        &mut self,
        title: &str,
        author: &str,
        bricks: &[[i32; EDIT_HEIGHT]; EDIT_WIDTH],
        extras: &[[i32; EDIT_HEIGHT]; EDIT_WIDTH],
    ) {
        let level = Level::from_editor_grid(title, author, bricks, extras);
        let params = self.settings.difficulty.params();
        let mut player = Player::new("Testplayer", params.lives, params.max_lives);
        player.snapshot = level.clone();
        self.players = vec![player];
        self.levelset = LevelSet::new("test", vec![level]);
        self.reset_controls();
        self.start_current_player();
    }

    fn reset_controls(&mut self) {
        // Key speed may have changed since the last game
        self.pvel_max = self.settings.key_speed();
        self.pvel_min = self.pvel_max / 2.0;
        self.pacc = (self.pvel_max - self.pvel_min) / KEY_ACCEL_MS;
        self.cur_player = 0;
        self.last_dead = None;
        self.msg.clear();
        self.extras_active = false;
        self.pvel = self.pvel_min;
        self.pvel_dir = 0;
        self.last_px = -1.0;
    }

    /// New game from the current player's snapshot, score carried over
    fn start_current_player(&mut self) {
        let seed = self.seed.wrapping_add(self.games_started);
        self.games_started += 1;
        let Some(player) = self.players.get(self.cur_player) else {
            log::error!("No player {} to start", self.cur_player);
            return;
        };
        self.game = Game::new(&player.snapshot, self.settings.game_config(), seed);
        self.game.paddle.score = player.score;
    }

    /// Player `id` has lives and levels left
    fn is_eligible(&self, id: usize) -> bool {
        self.players
            .get(id)
            .is_some_and(|p| p.lives > 0 && p.level < self.levelset.count())
    }

    /// Move on to the next player with lives and levels left; None if
    /// nobody is left
    fn next_player(&mut self) -> Option<usize> {
        if self.players.is_empty() {
            return None;
        }
        let start = self.cur_player;
        loop {
            self.cur_player = (self.cur_player + 1) % self.players.len();
            if self.is_eligible(self.cur_player) {
                return Some(self.cur_player);
            }
            if self.cur_player == start {
                return None;
            }
        }
    }

    /// Advance by `ms`. `rx` is a relative paddle motion or an absolute
    /// paddle position, depending on the motion setting.
    pub fn update(&mut self, ms: u32, rx: f64, input: &PaddleInput) -> TickFlags {
        let mut flags = TickFlags::empty();
        if self.players.is_empty() {
            return flags;
        }
        let old_score = self.game.paddle.score;

        if self.extras_timeout.update(ms) {
            let was_active = self.extras_active;
            self.extras_active = self.game.extras_active();
            if self.extras_active || was_active {
                flags |= TickFlags::UPDATE_EXTRAS;
            }
            self.extras_timeout.reset();
            if self.game.is_bonus_level() {
                flags |= TickFlags::UPDATE_INFO;
            }
        }

        let px = self.paddle_motion(ms, rx, input);
        self.game.set_paddle_state(&TickInput {
            paddle_x: Some(px),
            fire_left: input.fire_left,
            fire_right: input.fire_right,
            recall: input.recall,
            speed_up: input.speed_up,
        });
        self.game.update(ms);

        if input.warp && self.game.level_over.is_none() && self.game.warp_ok() {
            log::info!("Warping to the next level");
            self.game.level_over = Some(LevelOutcome::Won);
        }

        if self.game.level_over.is_some() {
            return flags | self.finish_level();
        }

        let lives_gained = self
            .game
            .mods
            .collected_extras
            .iter()
            .filter(|&&k| k == ExtraKind::Life)
            .count();
        for _ in 0..lives_gained {
            self.players[self.cur_player].gain_life();
            flags |= TickFlags::UPDATE_BACKGROUND;
        }

        if !self.game.mods.brick_hits.is_empty() {
            flags |= TickFlags::UPDATE_BRICKS | TickFlags::NEW_ANIMATIONS;
            if self.game.warp_ok() {
                flags |= TickFlags::WARP_OK;
            }
        }
        if self.game.paddle.score != old_score {
            self.players[self.cur_player].score = self.game.paddle.score;
            flags |= TickFlags::UPDATE_SCORE;
        }
        flags
    }

    /// Resulting paddle left edge for this frame
    fn paddle_motion(&mut self, ms: u32, rx: f64, input: &PaddleInput) -> f64 {
        let paddle = &self.game.paddle;
        let mut px = paddle.x;
        let mut rx = rx;
        let keys = input.left || input.right;

        if paddle.has(ExtraKind::Frozen) {
            rx = 0.0;
        } else if keys {
            let step_ms = if input.turbo { 2.0 * ms as f64 } else { ms as f64 };
            if input.left {
                if self.pvel_dir != -1 {
                    self.pvel = self.pvel_min;
                    self.pvel_dir = -1;
                }
                px -= self.pvel * step_ms;
            }
            if input.right {
                if self.pvel_dir != 1 {
                    self.pvel = self.pvel_min;
                    self.pvel_dir = 1;
                }
                px += self.pvel * step_ms;
            }
            self.pvel = (self.pvel + self.pacc * ms as f64).min(self.pvel_max);
        } else if self.settings.rel_motion {
            let sign = if self.settings.invert { -1.0 } else { 1.0 };
            px += sign * rx * self.settings.motion_mod as f64 / 100.0;
        } else if rx != self.last_px {
            // Absolute positions only apply when they change so keys keep
            // working
            px = rx;
            self.last_px = px;
        }
        if !keys {
            self.pvel_dir = 0;
            self.pvel = self.pvel_min;
        }

        if !self.settings.convex && !paddle.has(ExtraKind::Frozen) {
            if !self.settings.rel_motion {
                rx = px - paddle.x;
            }
            let paddle = &mut self.game.paddle;
            if rx != 0.0 || keys {
                paddle.v_x = (px - paddle.x) / ms.max(1) as f64;
                if rx != 0.0 {
                    paddle.v_x = paddle.v_x.clamp(-MAX_MOUSE_VELOCITY, MAX_MOUSE_VELOCITY);
                }
                self.friction_timeout = Counter::timeout(FRICTION_TIMEOUT_MS);
            } else if self.friction_timeout.update(ms) {
                paddle.v_x = 0.0;
            }
        }
        px
    }

    /// Decide what follows the end of the current level
    fn finish_level(&mut self) -> TickFlags {
        let mut flags = TickFlags::empty();
        let won = self.game.level_over == Some(LevelOutcome::Won);
        let bonus = self.game.is_bonus_level();
        let count = self.levelset.count();
        let idx = self.cur_player;
        self.players[idx].score = self.game.paddle.score;

        if won || bonus {
            // Bonus levels are passed whatever the result
            let level = self.players[idx].next_level();
            if level < count {
                self.players[idx].snapshot = self.levelset.levels[level].clone();
            } else {
                let name = &self.players[idx].name;
                self.msg = if bonus && count == 1 {
                    format!("Game over, {name}!")
                } else {
                    format!("Congratulations, {name}, you cleared all levels!")
                };
                flags |= TickFlags::PLAYER_MESSAGE;
            }
        } else {
            let player = &mut self.players[idx];
            if let Some(level) = self.levelset.levels.get(player.level) {
                player.snapshot = level.clone();
            }
            flags |= TickFlags::LIFE_LOST;
            if player.lose_life() == 0 {
                self.msg = format!("Game over, {}!", player.name);
                flags |= TickFlags::LAST_LIFE_LOST | TickFlags::PLAYER_MESSAGE;
                self.last_dead = Some(idx);
            }
        }

        match self.next_player() {
            None => {
                log::debug!("Game over!");
                flags | TickFlags::GAME_OVER
            }
            Some(next) => {
                log::debug!("Next player: {}", self.players[next].name);
                self.start_current_player();
                flags | TickFlags::NEW_LEVEL
            }
        }
    }

    /// Give the player who lost their last life a fresh start (score
    /// cleared, lives restored). Returns false if nobody is waiting.
    pub fn continue_game(&mut self) -> bool {
        let Some(dead) = self.last_dead.take() else {
            return false;
        };
        let was_current = self.players[self.cur_player].lives == 0;
        let player = &mut self.players[dead];
        player.score = 0;
        player.lives = self.settings.difficulty.params().lives;
        log::info!("{} continues", player.name);
        if was_current && self.next_player().is_some() {
            self.start_current_player();
        }
        true
    }

    /// Give up the current attempt for a life and pass the turn. Refused
    /// on the last life.
    pub fn restart_level(&mut self) -> TickFlags {
        let count = self.levelset.count();
        let Some(player) = self.players.get_mut(self.cur_player) else {
            return TickFlags::empty();
        };
        if player.lives <= 1 || player.level >= count {
            log::warn!("Restart refused for {}", player.name);
            return TickFlags::empty();
        }
        log::debug!("Restarting level ...");
        player.lose_life();
        player.snapshot = self.levelset.levels[player.level].clone();
        if self.next_player().is_none() {
            log::error!("No next player while restarting");
            return TickFlags::GAME_OVER;
        }
        self.start_current_player();
        TickFlags::RESTART_LEVEL | TickFlags::LIFE_LOST
    }

    /// Debug: blow up the brick at `x, y` for ten percent of the current
    /// player's score
    pub fn destroy_brick(&mut self, x: i32, y: i32) -> bool {
        let score = self.players.get(self.cur_player).map_or(0, |p| p.score);
        self.game.destroy_brick(x, y, score)
    }

    pub fn is_brick_at(&self, x: i32, y: i32) -> bool {
        self.game.is_brick_at(x, y)
    }

    /// Enter every player into the chart of the current level set
    pub fn update_hiscores(&mut self) {
        let chart = self.hiscores.get(&self.levelset.name);
        for p in &self.players {
            chart.add(&p.name, p.level as u32, p.score);
        }
    }

    /// Restore a player's progress. Levels past the end of the set mark
    /// the player as finished.
    pub fn resume_player(&mut self, id: usize, lives: u32, score: i32, level: usize) {
        let count = self.levelset.count();
        let Some(player) = self.players.get_mut(id) else {
            log::warn!("resume_player: no player {}", id);
            return;
        };
        if level > count {
            log::warn!(
                "resume_player: level {} outside levelset of {}, {} has finished",
                level,
                count,
                player.name
            );
        }
        player.lives = lives.min(player.max_lives);
        player.score = score;
        player.level = level.min(count);
        match self.levelset.levels.get(player.level) {
            Some(l) => player.snapshot = l.clone(),
            None => player.snapshot = Level::default(),
        }
    }

    /// Hand the turn to player `id` and restart the game on their level.
    /// Returns false for players without lives or levels left.
    pub fn set_current_player(&mut self, id: usize) -> bool {
        if !self.is_eligible(id) {
            log::warn!("set_current_player: player {} cannot play", id);
            return false;
        }
        self.cur_player = id;
        self.start_current_player();
        true
    }

    pub fn save_game(&self) -> SaveGame {
        SaveGame {
            levelset: self.levelset.name.clone(),
            difficulty: self.settings.difficulty,
            cur_player: self.cur_player,
            players: self
                .players
                .iter()
                .map(|p| SavedPlayer {
                    name: p.name.clone(),
                    level: p.level,
                    score: p.score,
                    lives: p.lives,
                })
                .collect(),
        }
    }

    /// Continue a saved game on `levelset` (loaded by the caller from the
    /// saved set name)
    pub fn resume_game(&mut self, save: &SaveGame, levelset: LevelSet) -> Result<(), LevelError> {
        if save.levelset != levelset.name {
            log::warn!(
                "Saved game is for levelset {}, resuming on {}",
                save.levelset,
                levelset.name
            );
        }
        self.settings.difficulty = save.difficulty;
        self.settings.player_count = save.players.len().clamp(1, MAX_PLAYERS);
        for (slot, p) in self.settings.player_names.iter_mut().zip(&save.players) {
            slot.clone_from(&p.name);
        }

        self.init(levelset, 0)?;
        for (i, p) in save.players.iter().enumerate().take(MAX_PLAYERS) {
            self.resume_player(i, p.lives, p.score, p.level);
        }
        let cur = if save.cur_player < self.players.len() {
            save.cur_player
        } else {
            0
        };
        if !self.set_current_player(cur) {
            // Saved turn belongs to a player who is out; pass it on
            self.cur_player = cur;
            if self.next_player().is_some() {
                self.start_current_player();
            } else {
                log::warn!("Nobody in the saved game can play on");
                self.msg = "Game over!".to_string();
            }
        }
        log::info!("Resumed game of {} players", self.players.len());
        Ok(())
    }

    /// Status line of the running bonus level
    pub fn bonus_level_info(&self) -> String {
        match &self.game.bonus {
            Some(rules) => rules.info(self.game.bricks_left()),
            None => "normal level".to_string(),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn levelset(&self) -> &LevelSet {
        &self.levelset
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn current_player_id(&self) -> usize {
        self.cur_player
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.cur_player)
    }

    /// Last message for the players
    pub fn message(&self) -> &str {
        &self.msg
    }
}
