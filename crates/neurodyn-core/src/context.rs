use crate::error::{DynamicsError, DynamicsResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generator used by every stochastic component. ChaCha8 keeps streams
/// identical across platforms and `rand` patch releases.
pub type SimRng = ChaCha8Rng;

pub const DEFAULT_DT: f64 = 0.1;

/// Seeded randomness and run-wide timing shared by reference at construction.
///
/// Components never reach for a global generator: each one takes a
/// [`SimulationContext::fork`] when it is built, so the sequence of forks is
/// part of the run's identity and two contexts with the same seed hand out
/// the same streams in the same order.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    seed: u64,
    dt: f64,
    rng: SimRng,
    forks: u32,
}

impl SimulationContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            dt: DEFAULT_DT,
            rng: SimRng::seed_from_u64(seed),
            forks: 0,
        }
    }

    pub fn with_dt(mut self, dt: f64) -> DynamicsResult<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(DynamicsError::InvalidTimeStep(dt));
        }
        self.dt = dt;
        Ok(self)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn rng(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    /// Independent child generator for one component.
    pub fn fork(&mut self) -> SimRng {
        self.forks += 1;
        SimRng::seed_from_u64(self.rng.gen())
    }

    pub fn forks(&self) -> u32 {
        self.forks
    }
}
