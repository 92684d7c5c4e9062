//! Ball collision resolution
//!
//! Two strategies move a free ball through one tick:
//! - trajectory: sweep the ball along its path, resolve the first contact
//!   exactly and continue with the remaining time
//! - clipping: move in steps no longer than the ball radius and push the
//!   ball out of whatever it overlaps
//!
//! Both visit candidate tiles in the same order: rows in the ball's vertical
//! travel direction, columns in its horizontal travel direction. On equal
//! contact times the earlier visited tile wins, which favours the tile beside
//! the ball over the one above or below it.

use glam::DVec2;
use rand::Rng;

use super::ball::{Ball, BallModifier};
use super::extras::ExtraKind;
use super::state::{BccType, Game};
use crate::consts::*;
use crate::{launch_direction, rotate, tile_at, tile_origin};

/// Distance a resolved ball is placed away from the surface it touched
const SEPARATION: f64 = 1e-6;

/// Largest random deflection of chaotic bounces (radians)
const CHAOS_ANGLE: f64 = 0.4;

/// What the ball ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Tile { x: i32, y: i32 },
    Paddle,
    /// Bottom wall of the wall extra
    Wall,
}

/// Earliest contact along a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Fraction of the path travelled before contact (0..=1)
    pub t: f64,
    pub contact: Contact,
    /// Surface normal has an x component (reflect vx)
    pub flip_x: bool,
    /// Surface normal has a y component (reflect vy)
    pub flip_y: bool,
}

/// Sweep a point from `p` along `d` against the box `min..max`.
/// Returns the entry fraction and which axes were crossed last; starting
/// inside the box yields no contact.
pub fn sweep_box(p: DVec2, d: DVec2, min: DVec2, max: DVec2) -> Option<(f64, bool, bool)> {
    let mut enter = [f64::NEG_INFINITY; 2];
    let mut exit = [f64::INFINITY; 2];
    for axis in 0..2 {
        let (p, d, lo, hi) = (p[axis], d[axis], min[axis], max[axis]);
        if d == 0.0 {
            if p <= lo || p >= hi {
                return None;
            }
        } else {
            let t1 = (lo - p) / d;
            let t2 = (hi - p) / d;
            enter[axis] = t1.min(t2);
            exit[axis] = t1.max(t2);
        }
    }
    let t_enter = enter[0].max(enter[1]);
    let t_exit = exit[0].min(exit[1]);
    if t_enter < 0.0 || t_enter > 1.0 || t_enter >= t_exit {
        return None;
    }
    let eps = 1e-12;
    let flip_x = enter[0] >= enter[1] - eps;
    let flip_y = enter[1] >= enter[0] - eps;
    Some((t_enter, flip_x, flip_y))
}

/// Inclusive range in the given travel direction
fn ordered(a: i32, b: i32, descending: bool) -> Vec<i32> {
    if descending {
        (a..=b).rev().collect()
    } else {
        (a..=b).collect()
    }
}

/// Tiles touched by a box, in deterministic visit order
fn candidate_tiles(lo: DVec2, hi: DVec2, dir: DVec2) -> Vec<(i32, i32)> {
    let (x0, y0) = tile_at(lo);
    let (x1, y1) = tile_at(hi);
    let cols = ordered(x0, x1, dir.x < 0.0);
    let mut out = Vec::new();
    for y in ordered(y0, y1, dir.y < 0.0) {
        for &x in &cols {
            out.push((x, y));
        }
    }
    out
}

/// Expanded tile box (tile grown by the ball radius)
#[inline]
fn tile_box(x: i32, y: i32) -> (DVec2, DVec2) {
    let r = DVec2::splat(BALL_RADIUS);
    (tile_origin(x, y) - r, tile_origin(x + 1, y + 1) + r)
}

/// First solid tile on the path `p -> p + d`
fn first_tile_contact(game: &Game, p: DVec2, d: DVec2) -> Option<CollisionResult> {
    let end = p + d;
    let r = DVec2::splat(BALL_RADIUS);
    let mut best: Option<CollisionResult> = None;
    for (x, y) in candidate_tiles(p.min(end) - r, p.max(end) + r, d) {
        if !game.grid.is_solid_at(x, y) {
            continue;
        }
        let (min, max) = tile_box(x, y);
        if let Some((t, flip_x, flip_y)) = sweep_box(p, d, min, max) {
            if best.is_none_or(|b| t < b.t) {
                best = Some(CollisionResult {
                    t,
                    contact: Contact::Tile { x, y },
                    flip_x,
                    flip_y,
                });
            }
        }
    }
    best
}

/// Contact with a horizontal surface at `surface_y` (center coordinates)
/// spanning `x0..x1`, approached from above
fn surface_contact(p: DVec2, d: DVec2, surface_y: f64, x0: f64, x1: f64) -> Option<f64> {
    if d.y <= 0.0 || p.y > surface_y {
        return None;
    }
    let t = (surface_y - p.y) / d.y;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    let x = p.x + d.x * t;
    (x >= x0 && x <= x1).then_some(t)
}

fn paddle_contact(game: &Game, p: DVec2, d: DVec2) -> Option<f64> {
    let paddle = &game.paddle;
    if !paddle.is_solid() {
        return None;
    }
    surface_contact(
        p,
        d,
        paddle.y - BALL_RADIUS,
        paddle.x - BALL_RADIUS,
        paddle.right() + BALL_RADIUS,
    )
}

fn wall_contact(game: &Game, p: DVec2, d: DVec2) -> Option<f64> {
    if !game.paddle.has(ExtraKind::Wall) {
        return None;
    }
    surface_contact(p, d, WALL_Y - BALL_RADIUS, 0.0, FIELD_WIDTH)
}

/// Find the earliest contact of a ball moving along `d`
pub fn find_contact(game: &Game, p: DVec2, d: DVec2) -> Option<CollisionResult> {
    let mut best = first_tile_contact(game, p, d);
    for (t, contact) in [
        (paddle_contact(game, p, d), Contact::Paddle),
        (wall_contact(game, p, d), Contact::Wall),
    ] {
        if let Some(t) = t {
            if best.is_none_or(|b| t < b.t) {
                best = Some(CollisionResult {
                    t,
                    contact,
                    flip_x: false,
                    flip_y: true,
                });
            }
        }
    }
    best
}

/// Bounce off the paddle (or stick to it with slime)
pub fn paddle_bounce(game: &mut Game, ball: &mut Ball) {
    let paddle = &game.paddle;
    if paddle.has(ExtraKind::Slime) {
        ball.attach(paddle);
        game.mods.attached_balls += 1;
        return;
    }

    let speed = ball.speed();
    if game.config.convex {
        let half = paddle.w / 2.0 + BALL_RADIUS;
        let offset = ((ball.pos.x - paddle.center_x()) / half).clamp(-1.0, 1.0);
        ball.vel = launch_direction(offset * CONVEX_MAX_ANGLE) * speed;
    } else {
        ball.vel.y = -ball.vel.y.abs();
        ball.vel.x += paddle.v_x * PADDLE_FRICTION;
        ball.set_speed(speed);
    }
    ball.pos.y = paddle.y - BALL_RADIUS - SEPARATION;
    game.mods.paddle_reflected_balls += 1;
}

fn chaotic_deflect(game: &mut Game, ball: &mut Ball) {
    let angle = game.rng.random_range(-CHAOS_ANGLE..CHAOS_ANGLE);
    let speed = ball.speed();
    ball.vel = rotate(ball.vel, angle);
    ball.set_speed(speed);
}

/// Apply the brick response and bounce; returns true if the ball reflected
fn resolve_tile(game: &mut Game, ball: &mut Ball, x: i32, y: i32, flip_x: bool, flip_y: bool) -> bool {
    let contact = game.ball_hits_brick(x, y, ball.modifier, ball.vel.normalize_or_zero());
    if contact.effective {
        ball.reset_idle();
        game.speed.accelerate();
    }
    if contact.weakened {
        ball.energy = ball.energy.saturating_sub(1);
        if ball.energy == 0 {
            ball.modifier = BallModifier::Normal;
        }
    }
    if !contact.reflect {
        return false;
    }
    if flip_x {
        ball.vel.x = -ball.vel.x;
    }
    if flip_y {
        ball.vel.y = -ball.vel.y;
    }
    if contact.chaotic || ball.chaotic {
        chaotic_deflect(game, ball);
    }
    game.mods.brick_reflected_balls += 1;
    true
}

/// Trajectory mode: resolve contacts exactly along the path
pub fn advance_trajectory(game: &mut Game, ball: &mut Ball, ms: u32) {
    let mut remaining = ms as f64;
    for _ in 0..MAX_BOUNCES_PER_TICK {
        if remaining <= 0.0 || ball.is_attached() {
            return;
        }
        let d = ball.vel * remaining;
        let Some(hit) = find_contact(game, ball.pos, d) else {
            ball.pos += d;
            return;
        };
        ball.pos += d * hit.t;
        remaining *= 1.0 - hit.t;

        match hit.contact {
            Contact::Tile { x, y } => {
                if resolve_tile(game, ball, x, y, hit.flip_x, hit.flip_y) {
                    if hit.flip_x {
                        ball.pos.x += ball.vel.x.signum() * SEPARATION;
                    }
                    if hit.flip_y {
                        ball.pos.y += ball.vel.y.signum() * SEPARATION;
                    }
                }
            }
            Contact::Paddle => paddle_bounce(game, ball),
            Contact::Wall => {
                ball.vel.y = -ball.vel.y.abs();
                ball.pos.y = WALL_Y - BALL_RADIUS - SEPARATION;
            }
        }
    }
}

/// First solid tile the ball overlaps, with the push-out axes
fn first_overlap(game: &Game, ball: &Ball) -> Option<(i32, i32, DVec2, bool, bool)> {
    let r = DVec2::splat(BALL_RADIUS);
    let (lo, hi) = (ball.pos - r, ball.pos + r);
    for (x, y) in candidate_tiles(lo, hi, ball.vel) {
        if !game.grid.is_solid_at(x, y) {
            continue;
        }
        let t_min = tile_origin(x, y);
        let t_max = tile_origin(x + 1, y + 1);
        if hi.x <= t_min.x || lo.x >= t_max.x || hi.y <= t_min.y || lo.y >= t_max.y {
            continue;
        }
        // Push toward the nearer side on each axis
        let left = hi.x - t_min.x;
        let right = t_max.x - lo.x;
        let up = hi.y - t_min.y;
        let down = t_max.y - lo.y;
        let push = DVec2::new(
            if left < right { -left } else { right },
            if up < down { -up } else { down },
        );
        let (px, py) = (push.x.abs(), push.y.abs());
        let eps = 1e-9;
        let along_x = px <= py + eps;
        let along_y = py <= px + eps;
        return Some((x, y, push, along_x, along_y));
    }
    None
}

/// Clipping mode: small steps, push out of overlaps
pub fn advance_clipping(game: &mut Game, ball: &mut Ball, ms: u32) {
    let dist = ball.speed() * ms as f64;
    let steps = (dist / BALL_RADIUS).ceil().max(1.0) as u32;
    let step_ms = ms as f64 / steps as f64;

    for _ in 0..steps {
        if ball.is_attached() {
            return;
        }
        ball.pos += ball.vel * step_ms;

        let paddle = &game.paddle;
        if paddle.is_solid()
            && ball.vel.y > 0.0
            && ball.pos.y + BALL_RADIUS >= paddle.y
            && ball.pos.y <= paddle.y + PADDLE_HEIGHT
            && ball.pos.x >= paddle.x - BALL_RADIUS
            && ball.pos.x <= paddle.right() + BALL_RADIUS
        {
            paddle_bounce(game, ball);
            continue;
        }
        if game.paddle.has(ExtraKind::Wall) && ball.vel.y > 0.0 && ball.pos.y + BALL_RADIUS >= WALL_Y {
            ball.vel.y = -ball.vel.y;
            ball.pos.y = WALL_Y - BALL_RADIUS - SEPARATION;
            continue;
        }

        if let Some((x, y, push, along_x, along_y)) = first_overlap(game, ball) {
            // Only bounce when moving into the surface
            let flip_x = along_x && push.x * ball.vel.x < 0.0;
            let flip_y = along_y && push.y * ball.vel.y < 0.0;
            if resolve_tile(game, ball, x, y, flip_x, flip_y) {
                if along_x {
                    ball.pos.x += push.x + push.x.signum() * SEPARATION;
                }
                if along_y {
                    ball.pos.y += push.y + push.y.signum() * SEPARATION;
                }
            }
        }
    }
}

/// Move a free ball through one tick with the configured strategy
pub fn advance_ball(game: &mut Game, ball: &mut Ball, ms: u32) {
    match game.config.bcc {
        BccType::Trajectory => advance_trajectory(game, ball, ms),
        BccType::Clipping => advance_clipping(game, ball, ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallState;
    use crate::sim::level::Level;
    use crate::sim::state::GameConfig;
    use crate::tile_center;

    fn game(bricks: &[(usize, usize)], bcc: BccType) -> Game {
        let mut level = Level::empty("c", "t");
        for &(x, y) in bricks {
            level.set_brick(x, y, b'a');
        }
        let config = GameConfig {
            bcc,
            ..Default::default()
        };
        Game::new(&level, config, 11)
    }

    fn free_ball(pos: DVec2, vel: DVec2) -> Ball {
        let mut b = Ball::new_attached(99, 0.0);
        b.state = BallState::Free;
        b.pos = pos;
        b.vel = vel;
        b
    }

    #[test]
    fn test_sweep_box_entry() {
        let hit = sweep_box(
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(5.0, -1.0),
            DVec2::new(6.0, 1.0),
        );
        let (t, fx, fy) = hit.expect("hit");
        assert!((t - 0.5).abs() < 1e-12);
        assert!(fx && !fy);
        // Starting inside gives nothing
        assert!(sweep_box(DVec2::ZERO, DVec2::X, DVec2::splat(-1.0), DVec2::splat(1.0)).is_none());
        // Too short
        assert!(sweep_box(DVec2::ZERO, DVec2::X, DVec2::new(5.0, -1.0), DVec2::new(6.0, 1.0)).is_none());
    }

    #[test]
    fn test_side_wall_reflects() {
        let mut g = game(&[], BccType::Trajectory);
        let mut b = free_ball(DVec2::new(BRICK_WIDTH + 20.0, 200.0), DVec2::new(-0.3, -0.1));
        advance_trajectory(&mut g, &mut b, 100);
        assert!(b.vel.x > 0.0);
        assert!(b.pos.x >= BRICK_WIDTH + BALL_RADIUS - 1e-6);
    }

    #[test]
    fn test_brick_hit_from_below() {
        for bcc in [BccType::Trajectory, BccType::Clipping] {
            let mut g = game(&[(4, 4)], bcc);
            let start = tile_center(5, 5) + DVec2::new(0.0, 40.0);
            let mut b = free_ball(start, DVec2::new(0.0, -0.3));
            advance_ball(&mut g, &mut b, 100);
            assert!(b.vel.y > 0.0, "{bcc:?}");
            assert!(!g.is_brick_at(5, 5), "{bcc:?}");
            assert_eq!(g.mods.brick_hits.len(), 1, "{bcc:?}");
            assert_eq!(g.mods.brick_reflected_balls, 1, "{bcc:?}");
        }
    }

    #[test]
    fn test_tie_break_prefers_side_tile() {
        // Ball heading up-right into the corner between the tile above it
        // and the tile to its right, both reached at the same time
        let mut g = game(&[(4, 3), (5, 4)], BccType::Trajectory);
        let (above, beside) = ((5, 4), (6, 5));
        let corner = tile_origin(6, 5);
        let start = corner + DVec2::new(-BALL_RADIUS - 10.0, BALL_RADIUS + 10.0);
        let d = DVec2::new(20.0, -20.0);
        let hit = first_tile_contact(&g, start, d).expect("contact");
        assert_eq!(hit.contact, Contact::Tile { x: beside.0, y: beside.1 });
        let mut b = free_ball(start, d / 100.0);
        advance_trajectory(&mut g, &mut b, 100);
        // Side tile is resolved first, then the ball still touches the one
        // above and bounces back out of the corner
        let hits: Vec<(i32, i32)> = g.mods.brick_hits.iter().map(|h| (h.x, h.y)).collect();
        assert_eq!(hits, vec![beside, above]);
        assert!(b.vel.x < 0.0 && b.vel.y > 0.0);
    }

    #[test]
    fn test_clipping_tie_break_prefers_side_tile() {
        let mut g = game(&[(4, 3), (5, 4)], BccType::Clipping);
        let (above, beside) = ((5, 4), (6, 5));
        // Overlapping the corner of both tiles, moving up-right
        let pos = tile_origin(6, 5) + DVec2::new(-3.0, 3.0);
        let mut b = free_ball(pos, DVec2::new(0.2, -0.2));
        let (x, y, push, along_x, along_y) = first_overlap(&g, &b).expect("overlap");
        assert_eq!((x, y), beside);
        assert!(push.x < 0.0 && along_x && !along_y);

        advance_clipping(&mut g, &mut b, 1);
        let hits: Vec<(i32, i32)> = g.mods.brick_hits.iter().map(|h| (h.x, h.y)).collect();
        assert_eq!(hits, vec![beside]);
        assert!(g.is_brick_at(above.0, above.1));
        assert!(b.vel.x < 0.0 && b.vel.y < 0.0);
    }

    #[test]
    fn test_weak_ball_reverts_when_spent() {
        let mut g = game(&[(4, 4)], BccType::Trajectory);
        crate::sim::extras::collect_extra(&mut g, ExtraKind::WeakBall);
        assert_eq!(g.balls[0].modifier, BallModifier::Weak);

        let start = tile_center(5, 5) + DVec2::new(0.0, 40.0);
        let mut b = free_ball(start, DVec2::new(0.0, -0.3));
        b.modifier = BallModifier::Weak;
        b.energy = 1;
        advance_trajectory(&mut g, &mut b, 100);
        assert!(b.vel.y > 0.0, "weak balls still bounce");
        assert!(g.is_brick_at(5, 5), "no damage");
        assert!(g.mods.brick_hits.is_empty());
        assert_eq!(b.energy, 0);
        assert_eq!(b.modifier, BallModifier::Normal);

        // The running extra does not bring a spent ball back
        g.balls = vec![b];
        g.sync_ball_modifiers();
        assert_eq!(g.balls[0].modifier, BallModifier::Normal);
    }

    #[test]
    fn test_convex_paddle_angles() {
        let mut g = game(&[], BccType::Trajectory);
        let right_edge = g.paddle.right();
        let mut b = free_ball(DVec2::new(right_edge, g.paddle.y - 20.0), DVec2::new(0.0, 0.3));
        advance_trajectory(&mut g, &mut b, 100);
        assert!(b.vel.y < 0.0);
        assert!(b.vel.x > 0.0, "right side deflects right");
        assert_eq!(g.mods.paddle_reflected_balls, 1);
    }

    #[test]
    fn test_flat_paddle_velocity_transfer() {
        let mut g = game(&[], BccType::Trajectory);
        g.config.convex = false;
        g.paddle.v_x = 0.5;
        let c = g.paddle.center_x();
        let mut b = free_ball(DVec2::new(c, g.paddle.y - 20.0), DVec2::new(0.0, 0.3));
        advance_trajectory(&mut g, &mut b, 100);
        assert!(b.vel.y < 0.0);
        assert!(b.vel.x > 0.0);
        assert!((b.speed() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_slime_attaches() {
        let mut g = game(&[], BccType::Clipping);
        g.paddle.extras.start(ExtraKind::Slime, 1_000);
        let c = g.paddle.center_x();
        let mut b = free_ball(DVec2::new(c, g.paddle.y - 20.0), DVec2::new(0.0, 0.3));
        advance_ball(&mut g, &mut b, 100);
        assert!(b.is_attached());
        assert_eq!(g.mods.attached_balls, 1);
    }

    #[test]
    fn test_wall_extra_saves_ball() {
        let mut g = game(&[], BccType::Trajectory);
        g.paddle.extras.start(ExtraKind::Wall, 1_000);
        let mut b = free_ball(DVec2::new(BRICK_WIDTH * 2.0, WALL_Y - 30.0), DVec2::new(0.0, 0.3));
        advance_trajectory(&mut g, &mut b, 200);
        assert!(b.vel.y < 0.0);
        assert!(b.pos.y < WALL_Y);
    }

    #[test]
    fn test_metal_ball_no_reflect() {
        let mut g = game(&[(4, 4)], BccType::Trajectory);
        let start = tile_center(5, 5) + DVec2::new(0.0, 40.0);
        let mut b = free_ball(start, DVec2::new(0.0, -0.3));
        b.modifier = BallModifier::Metal;
        advance_trajectory(&mut g, &mut b, 100);
        assert!(b.vel.y < 0.0);
        assert!(!g.is_brick_at(5, 5));
    }
}
