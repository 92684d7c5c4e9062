//! Brickworks headless driver
//!
//! Plays a level set with a simple autopilot at a fixed frame time and
//! prints a JSON summary of the run.
//!
//! ```text
//! brickworks [--levels FILE] [--settings FILE] [--hiscores FILE]
//!            [--save FILE] [--seed N] [--frames N] [--tournament]
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use brickworks::consts::*;
use brickworks::session::MAX_PLAYERS;
use brickworks::sim::{Game, Level, LevelSet};
use brickworks::{Hiscores, PaddleInput, Session, Settings, TickFlags};

/// Fixed frame time of the autopilot loop
const FRAME_MS: u32 = 10;
const DEFAULT_FRAMES: u64 = 360_000;

#[derive(Parser, Debug)]
#[command(name = "brickworks")]
#[command(about = "Play a level set headless with an autopilot and print a JSON summary")]
struct Args {
    /// Level set file (built-in demo set if omitted)
    #[arg(long)]
    levels: Option<PathBuf>,

    /// Settings file (defaults if omitted or missing)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Hiscore file, read at start and updated at game over
    #[arg(long)]
    hiscores: Option<PathBuf>,

    /// Write a save game here when the run stops
    #[arg(long)]
    save: Option<PathBuf>,

    /// Seed for all game randomness
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Frames to simulate before stopping
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    frames: u64,

    /// Shuffle the levels into a tournament
    #[arg(long)]
    tournament: bool,
}

/// Small built-in set used when no level file is given
fn demo_levelset() -> LevelSet {
    let mut rows = Level::empty("Rows", "brickworks");
    for x in 0..EDIT_WIDTH {
        rows.set_brick(x, 2, b'a');
        rows.set_brick(x, 3, b'b');
        rows.set_brick(x, 4, if x % 3 == 0 { b'v' } else { b'c' });
    }
    rows.set_extra(6, 3, b'+');
    rows.set_extra(9, 4, b'b');

    let mut blast = Level::empty("Blast", "brickworks");
    for x in 1..EDIT_WIDTH - 1 {
        blast.set_brick(x, 5, b'*');
        blast.set_brick(x, 4, b'd');
        blast.set_brick(x, 6, b'e');
    }
    blast.set_brick(0, 8, b'#');
    blast.set_brick(EDIT_WIDTH - 1, 8, b'#');
    blast.set_extra(4, 4, b'm');

    let mut mixed = Level::empty("Mixed", "brickworks");
    for x in 2..EDIT_WIDTH - 2 {
        mixed.set_brick(x, 3, b'w');
        mixed.set_brick(x, 6, if x % 2 == 0 { b'r' } else { b'f' });
    }
    mixed.set_brick(7, 9, b'g');
    mixed.set_brick(3, 10, b'@');
    mixed.set_extra(5, 3, b'l');

    LevelSet::new("Demo", vec![rows, blast, mixed])
}

/// Follow the lowest descending ball, fire when balls wait on the paddle
fn autopilot(game: &Game) -> (f64, PaddleInput) {
    let paddle = &game.paddle;
    let target = game
        .balls
        .iter()
        .filter(|b| !b.is_attached() && b.vel.y > 0.0)
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
        .or_else(|| game.balls.iter().find(|b| !b.is_attached()))
        .map_or(paddle.center_x(), |b| b.pos.x);
    // Aim slightly off centre so convex paddles send the ball sideways
    let offset = if (game.mods.paddle_reflected_balls % 2) == 0 { 0.15 } else { -0.15 };
    let px = target - paddle.w * (0.5 + offset);

    let input = PaddleInput {
        fire_right: game.attached_ball_count() > 0,
        recall: true,
        warp: game.warp_ok(),
        ..Default::default()
    };
    (px, input)
}

#[derive(Debug, Serialize)]
struct PlayerSummary {
    name: String,
    level: usize,
    score: i32,
    lives: u32,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    levelset: String,
    levels: usize,
    seed: u64,
    frames: u64,
    game_over: bool,
    message: String,
    players: Vec<PlayerSummary>,
}

fn run(args: Args) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let mut settings = args
        .settings
        .as_deref()
        .map(Settings::load)
        .unwrap_or_default();
    // The autopilot hands over absolute paddle positions
    settings.rel_motion = false;
    settings.player_count = settings.player_count.clamp(1, MAX_PLAYERS);

    let levelset = match &args.levels {
        Some(path) => LevelSet::load_or_default(path),
        None => demo_levelset(),
    };
    let levelset = if args.tournament {
        LevelSet::tournament(vec![levelset], settings.freakout_seed, settings.add_bonus_levels)
    } else if settings.add_bonus_levels {
        levelset.with_bonus_levels()
    } else {
        levelset
    };

    let start_level = settings.start_level;
    let mut session = Session::new(settings, args.seed);
    if let Some(path) = &args.hiscores {
        session.hiscores = Hiscores::load(path);
    }
    session.init(levelset, start_level)?;

    let mut frames = 0;
    let mut game_over = false;
    while frames < args.frames {
        let (px, input) = autopilot(session.game());
        let flags = session.update(FRAME_MS, px, &input);
        frames += 1;

        if flags.contains(TickFlags::PLAYER_MESSAGE) {
            log::info!("{}", session.message());
        }
        if flags.contains(TickFlags::NEW_LEVEL) {
            log::info!(
                "Level '{}' for {}",
                session.game().title,
                session.current_player().map_or("?", |p| p.name.as_str())
            );
        }
        if flags.contains(TickFlags::UPDATE_INFO) && session.game().is_bonus_level() {
            log::debug!("{}", session.bonus_level_info());
        }
        if flags.contains(TickFlags::GAME_OVER) {
            game_over = true;
            break;
        }
    }

    if let Some(path) = &args.save {
        session.save_game().save(path)?;
    }
    if game_over {
        session.update_hiscores();
        if let Some(path) = &args.hiscores {
            session.hiscores.save(path)?;
        }
    }

    Ok(RunSummary {
        levelset: session.levelset().name.clone(),
        levels: session.levelset().count(),
        seed: args.seed,
        frames,
        game_over,
        message: session.message().to_string(),
        players: session
            .players()
            .iter()
            .map(|p| PlayerSummary {
                name: p.name.clone(),
                level: p.level,
                score: p.score,
                lives: p.lives,
            })
            .collect(),
    })
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    let args = Args::parse();
    log::info!("Brickworks starting...");

    match run(args) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Could not encode summary: {e}"),
        },
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["brickworks"]).unwrap();
        assert_eq!(args.seed, 1);
        assert_eq!(args.frames, DEFAULT_FRAMES);
        assert!(args.levels.is_none());
        assert!(!args.tournament);
    }

    #[test]
    fn test_args_parse_values() {
        let args = Args::try_parse_from([
            "brickworks",
            "--levels",
            "sets/original",
            "--seed",
            "42",
            "--frames",
            "100",
            "--tournament",
        ])
        .unwrap();
        assert_eq!(args.levels, Some(PathBuf::from("sets/original")));
        assert_eq!(args.seed, 42);
        assert_eq!(args.frames, 100);
        assert!(args.tournament);
        assert!(Args::try_parse_from(["brickworks", "--seed", "x"]).is_err());
    }
}
