//! Per-listener throttling of hold-repeats
//!
//! A fresh press always fires. Repeats fire unthrottled, never (until the
//! next fresh press), or at most once per window.

use std::time::{Duration, Instant};

use crate::events::IrEvent;

/// Throttle policy for one listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Throttle {
    /// Every matching event fires
    #[default]
    Unthrottled,
    /// Fire once per hold; repeats are suppressed
    OncePerHold,
    /// Fire repeats at most once per window
    Window(Duration),
}

impl Throttle {
    /// Build from an optional throttle in milliseconds
    pub fn from_millis(throttle_ms: Option<u64>) -> Self {
        match throttle_ms {
            None => Throttle::Unthrottled,
            Some(0) => Throttle::OncePerHold,
            Some(ms) => Throttle::Window(Duration::from_millis(ms)),
        }
    }

    /// Throttle in milliseconds, `None` when unthrottled
    pub fn as_millis(&self) -> Option<u64> {
        match self {
            Throttle::Unthrottled => None,
            Throttle::OncePerHold => Some(0),
            Throttle::Window(window) => Some(window.as_millis() as u64),
        }
    }
}

/// Throttle policy plus the time of the last firing
#[derive(Debug, Clone)]
pub(crate) struct ThrottleTracker {
    throttle: Throttle,
    last_fire_at: Option<Instant>,
}

impl ThrottleTracker {
    pub(crate) fn new(throttle: Throttle) -> Self {
        Self {
            throttle,
            last_fire_at: None,
        }
    }

    pub(crate) fn throttle(&self) -> Throttle {
        self.throttle
    }

    /// Decide whether `event`, seen at `now`, fires; records the firing
    pub(crate) fn should_fire(&mut self, event: &IrEvent, now: Instant) -> bool {
        let fire = if event.is_fresh_press() {
            true
        } else {
            match self.throttle {
                Throttle::Unthrottled => true,
                Throttle::OncePerHold => false,
                Throttle::Window(window) => self
                    .last_fire_at
                    .map_or(true, |last| now.saturating_duration_since(last) >= window),
            }
        };

        if fire {
            self.last_fire_at = Some(now);
        }
        fire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press() -> IrEvent {
        IrEvent::new("0000000000f40bf0", 0, "KEY_UP", "tv")
    }

    fn repeat(n: u64) -> IrEvent {
        IrEvent::new("0000000000f40bf0", n, "KEY_UP", "tv")
    }

    /// Feed a press followed by `repeats` repeats, `spacing` apart
    fn hold(tracker: &mut ThrottleTracker, start: Instant, repeats: u64, spacing: Duration) -> usize {
        let mut fired = usize::from(tracker.should_fire(&press(), start));
        for n in 1..=repeats {
            let at = start + spacing * n as u32;
            fired += usize::from(tracker.should_fire(&repeat(n), at));
        }
        fired
    }

    #[test]
    fn test_from_millis() {
        assert_eq!(Throttle::from_millis(None), Throttle::Unthrottled);
        assert_eq!(Throttle::from_millis(Some(0)), Throttle::OncePerHold);
        assert_eq!(
            Throttle::from_millis(Some(250)),
            Throttle::Window(Duration::from_millis(250))
        );
        assert_eq!(Throttle::from_millis(Some(250)).as_millis(), Some(250));
    }

    #[test]
    fn test_unthrottled_fires_every_repeat() {
        let mut tracker = ThrottleTracker::new(Throttle::Unthrottled);
        let fired = hold(&mut tracker, Instant::now(), 39, Duration::from_millis(110));
        assert_eq!(fired, 40);
    }

    #[test]
    fn test_once_per_hold() {
        let mut tracker = ThrottleTracker::new(Throttle::OncePerHold);
        let start = Instant::now();
        assert_eq!(hold(&mut tracker, start, 39, Duration::from_millis(110)), 1);

        // A fresh press after the hold fires again
        let later = start + Duration::from_secs(10);
        assert!(tracker.should_fire(&press(), later));
        assert!(!tracker.should_fire(&repeat(1), later + Duration::from_millis(110)));
    }

    #[test]
    fn test_window_fires_once_per_window() {
        let mut tracker = ThrottleTracker::new(Throttle::Window(Duration::from_millis(1000)));
        // 40 events 110ms apart span 4.29s: press at 0, then 1.1s, 2.2s, 3.3s
        let fired = hold(&mut tracker, Instant::now(), 39, Duration::from_millis(110));
        assert_eq!(fired, 4);
    }

    #[test]
    fn test_window_always_fires_fresh_press() {
        let mut tracker = ThrottleTracker::new(Throttle::Window(Duration::from_millis(1000)));
        let start = Instant::now();
        assert!(tracker.should_fire(&press(), start));
        assert!(!tracker.should_fire(&repeat(1), start + Duration::from_millis(100)));
        assert!(tracker.should_fire(&press(), start + Duration::from_millis(200)));
        // The press restarted the window
        assert!(!tracker.should_fire(&repeat(1), start + Duration::from_millis(1100)));
        assert!(tracker.should_fire(&repeat(2), start + Duration::from_millis(1200)));
    }

    #[test]
    fn test_window_fires_repeat_without_prior_press() {
        let mut tracker = ThrottleTracker::new(Throttle::Window(Duration::from_millis(500)));
        let start = Instant::now();
        assert!(tracker.should_fire(&repeat(7), start));
        assert!(!tracker.should_fire(&repeat(8), start + Duration::from_millis(100)));
    }

    #[test]
    fn test_trackers_are_independent() {
        let mut once = ThrottleTracker::new(Throttle::OncePerHold);
        let mut every = ThrottleTracker::new(Throttle::Unthrottled);
        let start = Instant::now();

        assert_eq!(hold(&mut once, start, 5, Duration::from_millis(100)), 1);
        assert_eq!(hold(&mut every, start, 5, Duration::from_millis(100)), 6);
    }
}
