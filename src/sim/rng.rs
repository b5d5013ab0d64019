//! Random source for the simulation
//!
//! Core operations take `&mut impl rand::Rng`; the arena owns one PCG stream.
//! Runs are unseeded by default and reproducible when a seed is injected.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Generator used by the arena
pub type SimRng = Pcg32;

/// Seed record (kept so a run can be reported and replayed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    /// Whether the seed came from the host rather than entropy
    pub injected: bool,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            injected: true,
        }
    }

    /// Fresh seed from the thread RNG
    pub fn from_entropy() -> Self {
        Self {
            seed: rand::random(),
            injected: false,
        }
    }

    pub fn resolve(seed: Option<u64>) -> Self {
        seed.map(Self::new).unwrap_or_else(Self::from_entropy)
    }

    pub fn to_rng(&self) -> SimRng {
        Pcg32::seed_from_u64(self.seed)
    }
}
