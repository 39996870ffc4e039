//! Generation tokens for invalidating callbacks after teardown
//!
//! Every session owns a [`GenerationCounter`]. Work that completes later
//! (timeouts, detection signals, asset loads) carries the [`Generation`]
//! that was current when it was scheduled, and is dropped if the counter
//! has moved on in the meantime. Values are drawn from one process-wide
//! sequence, so a token minted by one session never matches another.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_value() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Token identifying one live registration of a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Counter handing out generations
#[derive(Debug, Clone)]
pub struct GenerationCounter {
    current: u64,
}

impl Default for GenerationCounter {
    fn default() -> Self {
        Self {
            current: next_value(),
        }
    }
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The generation callbacks must present to be accepted
    pub fn current(&self) -> Generation {
        Generation(self.current)
    }

    /// Invalidate every outstanding token and return the new one
    pub fn bump(&mut self) -> Generation {
        self.current = next_value();
        Generation(self.current)
    }

    pub fn is_current(&self, token: Generation) -> bool {
        token.0 == self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_invalidates_old_tokens() {
        let mut counter = GenerationCounter::new();
        let first = counter.current();
        assert!(counter.is_current(first));

        let second = counter.bump();
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
        assert_ne!(first, second);
    }

    #[test]
    fn test_counters_never_share_tokens() {
        let mut a = GenerationCounter::new();
        let mut b = GenerationCounter::new();
        assert!(!b.is_current(a.current()));
        assert!(!a.is_current(b.bump()));
        assert!(!b.is_current(a.bump()));
    }
}
