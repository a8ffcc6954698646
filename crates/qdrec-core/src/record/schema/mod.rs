//! Dataset schemas of the supported simulation flavors.
//!
//! Each flavor module pairs a `register` function, which declares the
//! datasets a given [`OutputLevel`] enables, with `save_*` functions called
//! once per timestep. The save functions write unconditionally; whatever the
//! level left unregistered is dropped by the recorder, so a driver never
//! branches on the level itself.

pub mod exact;
pub mod heom;
pub mod tsh;

/// Detail selector for a recording run. Level `n` enables every dataset
/// tier up to and including `n`; level 0 records nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OutputLevel(pub u8);

impl OutputLevel {
    pub fn enables(self, tier: u8) -> bool {
        self.0 >= tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_enable_all_lower_tiers() {
        let level = OutputLevel(3);
        assert!(level.enables(1));
        assert!(level.enables(3));
        assert!(!level.enables(4));
        assert!(!OutputLevel(0).enables(1));
    }
}
