//! Disorder engines. Each one is usable on its own through its typed API and
//! also plugs into `ClosedLoopDynamics` as a `FeedbackLoop`.

pub mod attention;
pub mod cognitive_control;
pub mod energy;
pub mod hyperactivity;
pub mod hyperarousal;
pub mod impulse;
pub mod loop_core;
pub mod motivation;
pub mod negative_bias;
pub mod params;

#[cfg(test)]
mod tests;

pub use attention::{AttentionEngine, AttentionParams, AttentionResult};
pub use cognitive_control::{
    override_probability, CognitiveControlEngine, CognitiveControlParams, CognitiveControlResult,
    ControlAttempt,
};
pub use energy::{EnergyDepletionEngine, EnergyParams, EnergyResult, EnergyStep, MAX_ENERGY};
pub use hyperactivity::{HyperactivityEngine, HyperactivityParams, HyperactivityResult, MAX_WINDOW};
pub use hyperarousal::{HyperarousalEngine, HyperarousalParams, HyperarousalResult};
pub use impulse::{
    Choice, ImpulseDecision, ImpulseEngine, ImpulseParams, ImpulseResult, ImpulseScenario,
};
pub use loop_core::{LoopCore, LoopParameters};
pub use motivation::{
    ActionEvaluation, MotivationEngine, MotivationParams, MotivationResult, RewardOutcome,
};
pub use negative_bias::{Appraisal, NegativeBiasEngine, NegativeBiasParams, NegativeBiasResult};
pub use params::{DisorderParameters, Preset};
