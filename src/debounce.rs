//! Collapses switch contact bounce into one logical activation per press.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct Debouncer {
    window: Duration,
    last_accepted: HashMap<u8, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// Returns true at most once per physical press: an edge is accepted
    /// only if the window has fully elapsed since the last accepted edge on
    /// the same pin. State is updated on acceptance only, so a burst of
    /// bounces collapses to the single event at its start. Debounce state is
    /// per pin; simultaneous presses on different pins are independent.
    pub fn filter(&mut self, pin: u8, at: Instant) -> bool {
        if let Some(&prev) = self.last_accepted.get(&pin) {
            if at.duration_since(prev) < self.window {
                return false;
            }
        }
        self.last_accepted.insert(pin, at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(50);

    #[test]
    fn burst_within_window_collapses_to_one() {
        let mut debouncer = Debouncer::new(WINDOW);
        let start = Instant::now();

        assert!(debouncer.filter(26, start));
        for ms in [1, 5, 10, 30, 49] {
            assert!(!debouncer.filter(26, start + Duration::from_millis(ms)));
        }
    }

    #[test]
    fn new_press_registers_after_window_elapses() {
        let mut debouncer = Debouncer::new(WINDOW);
        let start = Instant::now();

        assert!(debouncer.filter(26, start));
        assert!(!debouncer.filter(26, start + Duration::from_millis(30)));
        assert!(debouncer.filter(26, start + Duration::from_millis(50)));
        // Rejected bounces did not move the window.
        assert!(!debouncer.filter(26, start + Duration::from_millis(80)));
    }

    #[test]
    fn pins_are_independent() {
        let mut debouncer = Debouncer::new(WINDOW);
        let start = Instant::now();

        assert!(debouncer.filter(26, start));
        assert!(debouncer.filter(19, start + Duration::from_millis(1)));
        assert!(!debouncer.filter(26, start + Duration::from_millis(2)));
        assert!(!debouncer.filter(19, start + Duration::from_millis(2)));
    }
}
