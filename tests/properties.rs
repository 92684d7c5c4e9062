//! Property tests for the simulation and session invariants

use brickworks::consts::*;
use brickworks::persistence::{SaveGame, SavedPlayer};
use brickworks::settings::Difficulty;
use brickworks::sim::ball::BallState;
use brickworks::sim::extras::{self, ExtraKind};
use brickworks::sim::grid::BrickKind;
use brickworks::sim::{Game, GameConfig, HitKind, Level, LevelSet, TickInput, tick};
use brickworks::tile_center;
use brickworks::{PaddleInput, Session, Settings, TickFlags};
use glam::DVec2;
use proptest::prelude::*;

const BRICK_CHARS: &[u8] = b"..........aabcvwx*#@rg";

fn level_from(cells: &[u8]) -> Level {
    let mut level = Level::empty("prop", "proptest");
    for (i, &c) in cells.iter().enumerate() {
        let ch = BRICK_CHARS[c as usize % BRICK_CHARS.len()];
        level.set_brick(i % EDIT_WIDTH, i / EDIT_WIDTH, ch);
    }
    level
}

fn border_intact(game: &Game) -> bool {
    let right = MAP_WIDTH as i32 - 1;
    (0..MAP_HEIGHT as i32).all(|y| {
        game.grid.get(0, y).is_some_and(|b| b.kind == BrickKind::Wall && b.is_solid())
            && game.grid.get(right, y).is_some_and(|b| b.kind == BrickKind::Wall && b.is_solid())
    }) && (0..MAP_WIDTH as i32).all(|x| game.grid.get(x, 0).is_some_and(|b| b.kind == BrickKind::Wall))
}

fn grid_signature(game: &Game) -> Vec<(i32, i32, BrickKind, bool, bool)> {
    game.grid
        .iter()
        .map(|(x, y, b)| (x, y, b.kind, b.is_solid(), b.is_exploding()))
        .collect()
}

#[derive(Debug, Clone)]
struct Frame {
    paddle_x: Option<f64>,
    fire: bool,
    speed_up: bool,
    ms: u32,
}

fn frame_strategy() -> impl Strategy<Value = Frame> {
    (
        proptest::option::of(0.0..FIELD_WIDTH),
        any::<bool>(),
        any::<bool>(),
        1u32..40,
    )
        .prop_map(|(paddle_x, fire, speed_up, ms)| Frame {
            paddle_x,
            fire,
            speed_up,
            ms,
        })
}

fn lose_all_balls(s: &mut Session) -> TickFlags {
    for b in &mut s.game_mut().balls {
        b.state = BallState::Free;
        b.pos = DVec2::new(BRICK_WIDTH * 1.5, FIELD_HEIGHT - 1.0);
        b.vel = DVec2::new(0.0, 0.3);
    }
    s.update(50, -1.0, &PaddleInput::default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_border_never_destroyed(
        cells in proptest::collection::vec(any::<u8>(), EDIT_WIDTH * EDIT_HEIGHT),
        blasts in proptest::collection::vec((-2i32..18, -2i32..26), 1..30),
        seed in any::<u64>(),
    ) {
        let mut game = Game::new(&level_from(&cells), GameConfig::default(), seed);
        for (x, y) in blasts {
            game.destroy_brick(x, y, 1000);
            game.update(BRICK_EXP_TIME_MS);
            prop_assert!(border_intact(&game));
        }
        for _ in 0..20 {
            game.update(BRICK_EXP_TIME_MS);
        }
        prop_assert!(border_intact(&game));
    }

    #[test]
    fn prop_ball_speed_within_limits(
        cells in proptest::collection::vec(any::<u8>(), EDIT_WIDTH * EDIT_HEIGHT),
        frames in proptest::collection::vec(frame_strategy(), 1..300),
        seed in any::<u64>(),
    ) {
        let mut game = Game::new(&level_from(&cells), GameConfig::default(), seed);
        for f in frames {
            let input = TickInput {
                paddle_x: f.paddle_x,
                fire_left: f.fire,
                speed_up: f.speed_up,
                ..Default::default()
            };
            tick(&mut game, &input, f.ms);
            for ball in game.balls.iter().filter(|b| !b.is_attached()) {
                let v = ball.speed();
                prop_assert!(v >= game.speed.min - 1e-9, "speed {} below {}", v, game.speed.min);
                prop_assert!(v <= game.speed.max + 1e-9, "speed {} above {}", v, game.speed.max);
            }
            if game.level_over.is_some() {
                break;
            }
        }
    }

    #[test]
    fn prop_destroy_empty_tile_is_noop(x in -3i32..20, y in -3i32..28, score in 0i32..100_000) {
        let mut game = Game::new(&Level::empty("e", "t"), GameConfig::default(), 1);
        let before = grid_signature(&game);
        prop_assert!(!game.destroy_brick(x, y, score));
        prop_assert!(!game.destroy_brick(x, y, score));
        prop_assert_eq!(grid_signature(&game), before);
        prop_assert_eq!(game.paddle.score, 0);
    }

    #[test]
    fn prop_save_round_trip(
        set in "[A-Za-z][A-Za-z0-9_]{0,12}",
        diff in 0usize..4,
        players in proptest::collection::vec(
            ("[A-Za-z][A-Za-z0-9]{0,8}", 0usize..40, -5_000i32..1_000_000, 0u32..12),
            1..=4,
        ),
        cur in 0usize..4,
    ) {
        let save = SaveGame {
            levelset: set,
            difficulty: Difficulty::from_index(diff),
            cur_player: cur % players.len(),
            players: players
                .into_iter()
                .map(|(name, level, score, lives)| SavedPlayer { name, level, score, lives })
                .collect(),
        };
        let text = save.to_kv().to_text();
        prop_assert_eq!(SaveGame::parse(&text).unwrap(), save);
    }

    #[test]
    fn prop_exclusive_extras(kinds in proptest::collection::vec(0usize..29, 1..40), seed in any::<u64>()) {
        let mut game = Game::new(&level_from(&[]), GameConfig::default(), seed);
        for i in kinds {
            let Some(kind) = ExtraKind::from_index(i) else { continue };
            extras::collect_extra(&mut game, kind);
            let mut groups = std::collections::HashMap::new();
            for k in ExtraKind::ALL {
                if let Some(group) = k.def().group {
                    if game.has_extra(k) {
                        *groups.entry(format!("{group:?}")).or_insert(0) += 1;
                    }
                }
            }
            prop_assert!(groups.values().all(|&n| n <= 1), "{:?}", groups);
        }
    }

    #[test]
    fn prop_single_brick_removed_from_below(col in 1i32..=EDIT_WIDTH as i32, seed in any::<u64>()) {
        let mut level = Level::empty("single", "t");
        level.set_brick(col as usize - 1, 4, b'a');
        level.set_brick(0, 0, b'#');
        let mut game = Game::new(&level, GameConfig::default(), seed);
        let ball = &mut game.balls[0];
        ball.state = BallState::Free;
        ball.pos = tile_center(col, 5) + DVec2::new(0.0, 40.0);
        ball.vel = DVec2::new(0.0, -0.3);

        game.update(100);
        prop_assert!(!game.is_brick_at(col, 5));
        let removed: Vec<_> = game
            .mods
            .brick_hits
            .iter()
            .filter(|h| h.kind == HitKind::Removed)
            .map(|h| (h.x, h.y))
            .collect();
        prop_assert_eq!(removed, vec![(col, 5)]);
        prop_assert_eq!(game.mods.brick_hits.len(), 1);
        prop_assert_eq!(game.mods.brick_reflected_balls, 1);
        prop_assert!(game.balls[0].vel.y > 0.0, "ball bounced back down");
        prop_assert_eq!(game.paddle.score, 100);
    }

    #[test]
    fn prop_turn_order_round_robin(players in 1usize..=4, seed in any::<u64>()) {
        let settings = Settings {
            player_count: players,
            difficulty: Difficulty::Hard,
            ..Default::default()
        };
        let lives = Difficulty::Hard.params().lives as usize;
        let mut s = Session::new(settings, seed);
        s.init(LevelSet::new("turns", vec![level_from(&[10; 30])]), 0).unwrap();

        for loss in 0..players * lives {
            prop_assert_eq!(s.current_player_id(), loss % players);
            let flags = lose_all_balls(&mut s);
            prop_assert!(flags.contains(TickFlags::LIFE_LOST));
            prop_assert_eq!(flags.contains(TickFlags::GAME_OVER), loss + 1 == players * lives);
        }
        prop_assert!(s.players().iter().all(|p| p.lives == 0));
    }
}

#[test]
fn test_warp_threshold() {
    let mut level = Level::empty("warp", "t");
    let mut placed = Vec::new();
    'fill: for y in 0..EDIT_HEIGHT {
        for x in 0..EDIT_WIDTH {
            if placed.len() == 100 {
                break 'fill;
            }
            level.set_brick(x, y, b'a');
            placed.push((x as i32 + 1, y as i32 + 1));
        }
    }
    let mut game = Game::new(&level, GameConfig::default(), 5);
    assert_eq!(game.warp_limit, 20);

    for &(x, y) in &placed[..79] {
        game.grid.remove(x, y);
    }
    assert_eq!(game.bricks_left(), 21);
    assert!(!game.warp_ok());
    game.grid.remove(placed[79].0, placed[79].1);
    assert!(!game.warp_ok(), "20 left is not below the limit");
    game.grid.remove(placed[80].0, placed[80].1);
    assert_eq!(game.bricks_left(), 19);
    assert!(game.warp_ok());
}
