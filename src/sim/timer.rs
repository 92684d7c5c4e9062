//! Countdown and smooth counter primitive
//!
//! Every timed piece of game state (extras, explosions, regeneration, bonus
//! level clocks, input friction) is a [`Counter`] advanced by the elapsed
//! milliseconds of a tick.

use serde::{Deserialize, Serialize};

/// What happens when a counter reaches its end value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CounterMode {
    /// Stop at the end value
    #[default]
    Once,
    /// Jump back to the start value
    Repeat,
    /// Reverse direction at either end
    UpDown,
}

/// Counts continuously from a start value to an end value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Counter {
    mode: CounterMode,
    /// Change per millisecond (sign gives direction)
    rate: f64,
    initial_rate: f64,
    start: f64,
    cur: f64,
    min: f64,
    max: f64,
    running: bool,
    done: bool,
}

impl Counter {
    /// Count from `start` to `end`, taking `delay_ms` milliseconds per unit
    pub fn smooth(mode: CounterMode, start: f64, end: f64, delay_ms: f64) -> Self {
        let mut rate = if delay_ms > 0.0 { 1.0 / delay_ms } else { 0.0 };
        let (min, max) = if end >= start {
            (start, end)
        } else {
            rate = -rate;
            (end, start)
        };
        Self {
            mode,
            rate,
            initial_rate: rate,
            start,
            cur: start,
            min,
            max,
            running: true,
            done: false,
        }
    }

    /// Millisecond countdown that stops at zero
    pub fn timeout(ms: u32) -> Self {
        Self::smooth(CounterMode::Once, ms as f64, 0.0, 1.0)
    }

    /// Repeating frame index in `0..count`, advancing one frame per `delay_ms`
    pub fn frames(count: u32, delay_ms: f64) -> Self {
        Self::smooth(CounterMode::Repeat, 0.0, count as f64 - 0.01, delay_ms)
    }

    /// Advance by `ms`; returns true when an end value was reached
    pub fn update(&mut self, ms: u32) -> bool {
        if !self.running {
            return false;
        }
        self.cur += self.rate * ms as f64;

        let hit_max = self.rate >= 0.0 && self.cur >= self.max;
        let hit_min = self.rate < 0.0 && self.cur <= self.min;
        if !hit_max && !hit_min {
            return false;
        }

        match self.mode {
            CounterMode::Once => {
                self.cur = if hit_max { self.max } else { self.min };
                self.running = false;
                self.done = true;
            }
            CounterMode::Repeat => {
                self.cur = if hit_max { self.min } else { self.max };
            }
            CounterMode::UpDown => {
                self.cur = if hit_max { self.max } else { self.min };
                self.rate = -self.rate;
            }
        }
        true
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.cur
    }

    /// Frame index for counters built with [`Counter::frames`]
    #[inline]
    pub fn frame(&self) -> u32 {
        self.cur.max(0.0) as u32
    }

    /// Remaining milliseconds of a countdown
    #[inline]
    pub fn remaining_ms(&self) -> u32 {
        self.cur.max(0.0).round() as u32
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// A `Once` counter that reached its end
    #[inline]
    pub fn expired(&self) -> bool {
        self.done
    }

    /// Extend a running countdown by `ms`
    pub fn add(&mut self, ms: u32) {
        self.cur += ms as f64;
        self.max = self.max.max(self.cur);
    }

    /// Restart from the start value
    pub fn reset(&mut self) {
        self.cur = self.start;
        self.rate = self.initial_rate;
        self.running = true;
        self.done = false;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_expires_exactly() {
        let mut t = Counter::timeout(100);
        assert!(!t.update(60));
        assert_eq!(t.remaining_ms(), 40);
        assert!(t.update(40));
        assert!(t.expired());
        assert!(!t.is_running());
        // Expired timeouts stay quiet
        assert!(!t.update(10));
    }

    #[test]
    fn test_timeout_add_extends() {
        let mut t = Counter::timeout(100);
        t.update(90);
        t.add(50);
        assert_eq!(t.remaining_ms(), 60);
        assert!(!t.update(59));
        assert!(t.update(1));
    }

    #[test]
    fn test_repeat_wraps() {
        let mut c = Counter::smooth(CounterMode::Repeat, 0.0, 2.0, 10.0);
        assert!(!c.update(10));
        assert!((c.get() - 1.0).abs() < 1e-9);
        assert!(c.update(10));
        assert_eq!(c.get(), 0.0);
        assert!(c.is_running());
    }

    #[test]
    fn test_updown_bounces() {
        let mut c = Counter::smooth(CounterMode::UpDown, 0.0, 1.0, 100.0);
        assert!(c.update(100));
        assert_eq!(c.get(), 1.0);
        c.update(50);
        assert!((c.get() - 0.5).abs() < 1e-9);
        assert!(c.update(50));
        assert_eq!(c.get(), 0.0);
    }

    #[test]
    fn test_frames() {
        let mut f = Counter::frames(4, 50.0);
        f.update(120);
        assert_eq!(f.frame(), 2);
        f.update(100);
        assert_eq!(f.frame(), 0);
    }

    #[test]
    fn test_reset_restarts() {
        let mut t = Counter::timeout(20);
        t.update(20);
        t.reset();
        assert!(t.is_running());
        assert_eq!(t.remaining_ms(), 20);
    }

    #[test]
    fn test_default_is_idle() {
        let mut c = Counter::default();
        assert!(!c.is_running());
        assert!(!c.expired());
        assert!(!c.update(100));
    }
}
