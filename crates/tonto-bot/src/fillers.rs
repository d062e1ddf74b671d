//! Filler replies for links the bot could not handle.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Replies used instead of an error message when a link fails.
pub const FILLER_REPLIES: &[&str] = &[
    ":(",
    "):",
    "?",
    "WAT",
    "No pos no",
    "link no worky",
    "chupa limon",
];

/// Picks a random filler reply from an injectable RNG.
pub struct FillerPicker {
    rng: Mutex<StdRng>,
}

impl FillerPicker {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Deterministic picker, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn pick(&self) -> &'static str {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        FILLER_REPLIES[rng.random_range(0..FILLER_REPLIES.len())]
    }
}

impl Default for FillerPicker {
    fn default() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_from_set() {
        let picker = FillerPicker::default();
        for _ in 0..50 {
            assert!(FILLER_REPLIES.contains(&picker.pick()));
        }
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let a = FillerPicker::seeded(7);
        let b = FillerPicker::seeded(7);
        let first: Vec<_> = (0..20).map(|_| a.pick()).collect();
        let second: Vec<_> = (0..20).map(|_| b.pick()).collect();
        assert_eq!(first, second);
    }
}
