//! Seeded disorder simulations: configuration, task inputs, neuromodulation,
//! the composed closed loop, assessment and seed sweeps.

pub mod assessment;
pub mod config;
pub mod driver;
pub mod error;
pub mod neuromodulation;
pub mod simulator;
pub mod sweep;

#[cfg(test)]
mod tests;

pub use assessment::{decline_rate, AssessmentResult, StabilitySummary};
pub use config::{
    BaselineParams, DistractionEvent, DoseEvent, EngineConfig, SimulationConfig, TaskProtocol,
    ThreatEvent,
};
pub use driver::{BaselineDynamics, InputDriver};
pub use error::{SimError, SimResult};
pub use neuromodulation::{MedicationSummary, NeuromodulationLoop};
pub use simulator::{DisorderSimulator, SimulationRun};
pub use sweep::{aggregate, ScoreDistribution, SeedOutcome, SeedSweep, SweepReport};
