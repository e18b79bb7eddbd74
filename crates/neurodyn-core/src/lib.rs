//! Continuous-state closed-loop dynamics with dopamine and medication models.

pub mod buffer;
pub mod context;
pub mod dopamine;
pub mod dynamics;
pub mod error;
pub mod medication;
pub mod state;


pub use buffer::RingBuffer;
pub use context::{SimRng, SimulationContext, DEFAULT_DT};
pub use dopamine::{DopamineParams, DopamineState, DopamineSummary, DopamineSystem};
pub use dynamics::{
    check_stability, ClosedLoopDynamics, FeedbackLoop, FnFeedback, InstabilityReport, Stability,
    StepOutcome, Violation, DEFAULT_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY,
};
pub use error::{DynamicsError, DynamicsResult};
pub use medication::{
    EmaxCurve, MedicationAdministration, MedicationProfile, MedicationSimulator, MedicationTable,
    PharmacodynamicEffect, PkModel,
};
pub use state::{ClampPolicy, StateField, StateSnapshot, StateVector};
