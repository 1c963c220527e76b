//! Virtual-time scheduling primitives.
//!
//! Nothing here owns a thread or a real timer. Components keep a [`Timer`] or
//! a [`Throttle`] and the host feeds them the current time from a [`Clock`],
//! so tests can drive time with a [`ManualClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, measured from an arbitrary epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock measured from the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the editor.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set(&self, at: Duration) {
        self.now.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// A cancellable one-shot deadline.
///
/// Re-arming replaces the previous deadline, which is what gives a debounce
/// its "reset on every call" behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    due: Option<Duration>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the timer to fire `delay` after `now`.
    pub fn arm(&mut self, now: Duration, delay: Duration) {
        self.due = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    pub fn due(&self) -> Option<Duration> {
        self.due
    }

    /// Disarm and return true if the deadline has passed.
    pub fn fire(&mut self, now: Duration) -> bool {
        match self.due {
            Some(due) if due <= now => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// Admits at most one call per interval and drops the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    interval: Duration,
    last: Option<Duration>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Returns true and records `now` if the interval has elapsed.
    pub fn admit(&mut self, now: Duration) -> bool {
        if let Some(last) = self.last {
            if now.saturating_sub(last) < self.interval {
                return false;
            }
        }
        self.last = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance_ms(250);
        assert_eq!(clock.now(), Duration::from_millis(250));
    }

    #[test]
    fn test_timer_fires_once_after_deadline() {
        let mut timer = Timer::new();
        timer.arm(Duration::ZERO, Duration::from_millis(300));
        assert!(!timer.fire(Duration::from_millis(299)));
        assert!(timer.fire(Duration::from_millis(300)));
        assert!(!timer.fire(Duration::from_millis(400)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_timer_rearm_pushes_deadline() {
        let mut timer = Timer::new();
        timer.arm(Duration::ZERO, Duration::from_millis(300));
        timer.arm(Duration::from_millis(200), Duration::from_millis(300));
        assert!(!timer.fire(Duration::from_millis(300)));
        assert!(timer.fire(Duration::from_millis(500)));
    }

    #[test]
    fn test_timer_cancel() {
        let mut timer = Timer::new();
        timer.arm(Duration::ZERO, Duration::from_millis(10));
        timer.cancel();
        assert!(!timer.fire(Duration::from_secs(1)));
    }

    #[test]
    fn test_throttle_drops_frames_inside_interval() {
        let mut throttle = Throttle::new(Duration::from_millis(16));
        assert!(throttle.admit(Duration::from_millis(100)));
        assert!(!throttle.admit(Duration::from_millis(110)));
        assert!(throttle.admit(Duration::from_millis(116)));
        throttle.reset();
        assert!(throttle.admit(Duration::from_millis(117)));
    }

    #[test]
    fn test_system_clock_is_past_epoch() {
        assert!(SystemClock.now() > Duration::ZERO);
    }
}
