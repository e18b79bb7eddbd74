use crate::buffer::RingBuffer;
use crate::error::{DynamicsError, DynamicsResult};
use crate::state::{StateField, StateSnapshot, StateVector};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use tracing::warn;

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
/// Largest snapshot history a run may request.
pub const MAX_HISTORY_CAPACITY: usize = 1_000_000;

/// One contribution to the closed loop. Implementations read and write the
/// shared state in place; registration order is execution order.
pub trait FeedbackLoop: Send {
    fn name(&self) -> &str;

    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()>;

    /// Typed read-back for engines that keep results beside the state.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Named closure adapter for ad-hoc loops.
pub struct FnFeedback<F> {
    name: String,
    f: F,
}

impl<F> FnFeedback<F>
where
    F: FnMut(&mut StateVector, f64) -> DynamicsResult<()> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> FeedbackLoop for FnFeedback<F>
where
    F: FnMut(&mut StateVector, f64) -> DynamicsResult<()> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, state: &mut StateVector, dt: f64) -> DynamicsResult<()> {
        (self.f)(state, dt)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A field that received non-finite writes during the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub field: StateField,
    /// Bound the write was coerced to.
    pub value: f64,
    pub coerced_writes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstabilityReport {
    pub step: u64,
    pub time: f64,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Stability {
    Stable,
    Unstable(InstabilityReport),
}

impl Stability {
    pub fn is_stable(&self) -> bool {
        matches!(self, Stability::Stable)
    }
}

/// Result of one `ClosedLoopDynamics::step`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step: u64,
    pub time: f64,
    pub snapshot: StateSnapshot,
    pub stability: Stability,
}

impl StepOutcome {
    /// Escalate an instability report into an error.
    pub fn into_result(self) -> DynamicsResult<StateSnapshot> {
        match self.stability {
            Stability::Stable => Ok(self.snapshot),
            Stability::Unstable(report) => Err(DynamicsError::InstabilityDetected {
                step: report.step,
                violations: report.violations.len(),
            }),
        }
    }
}

/// Report every field coerced from a non-finite write since the previous
/// check. Stored values never leave their ranges, so a coerced write is the
/// only way a step can blow up.
pub fn check_stability(
    state: &StateVector,
    coerced: &[u32; StateField::COUNT],
    step: u64,
    time: f64,
) -> Stability {
    let violations: Vec<Violation> = StateField::ALL
        .iter()
        .filter(|field| coerced[field.index()] > 0)
        .map(|&field| Violation {
            field,
            value: state.value(field),
            coerced_writes: coerced[field.index()],
        })
        .collect();
    if violations.is_empty() {
        Stability::Stable
    } else {
        Stability::Unstable(InstabilityReport {
            step,
            time,
            violations,
        })
    }
}

/// Owns the state vector and the ordered feedback loops; advances simulated time.
pub struct ClosedLoopDynamics {
    state: StateVector,
    loops: Vec<Box<dyn FeedbackLoop>>,
    history: RingBuffer<StateSnapshot>,
    time: f64,
    steps: u64,
    unstable: bool,
    instability_count: u64,
    first_instability: Option<InstabilityReport>,
}

impl fmt::Debug for ClosedLoopDynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosedLoopDynamics")
            .field("loops", &self.loop_names())
            .field("time", &self.time)
            .field("steps", &self.steps)
            .field("unstable", &self.unstable)
            .finish()
    }
}

impl ClosedLoopDynamics {
    pub fn new(state: StateVector) -> Self {
        Self::with_history_capacity(state, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(state: StateVector, capacity: usize) -> Self {
        Self {
            state,
            loops: Vec::new(),
            history: RingBuffer::new(capacity),
            time: 0.0,
            steps: 0,
            unstable: false,
            instability_count: 0,
            first_instability: None,
        }
    }

    pub fn register_feedback_loop<L>(&mut self, feedback: L)
    where
        L: FeedbackLoop + 'static,
    {
        self.loops.push(Box::new(feedback));
    }

    pub fn register_boxed(&mut self, feedback: Box<dyn FeedbackLoop>) {
        self.loops.push(feedback);
    }

    /// Run every loop once, in registration order, then check stability.
    ///
    /// A loop error aborts the step after earlier loops have already written
    /// their contributions; time and history are left untouched.
    pub fn step(&mut self, dt: f64) -> DynamicsResult<StepOutcome> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(DynamicsError::InvalidTimeStep(dt));
        }
        for feedback in self.loops.iter_mut() {
            feedback.apply(&mut self.state, dt)?;
        }
        self.time += dt;
        self.steps += 1;

        let coerced = self.state.drain_coerced();
        let stability = check_stability(&self.state, &coerced, self.steps, self.time);
        if let Stability::Unstable(report) = &stability {
            if !self.unstable {
                warn!(
                    step = report.step,
                    time = report.time,
                    violations = report.violations.len(),
                    "closed loop became unstable"
                );
            }
            self.unstable = true;
            self.instability_count += 1;
            if self.first_instability.is_none() {
                self.first_instability = Some(report.clone());
            }
        }

        let snapshot = self.state.snapshot();
        self.history.push(snapshot.clone());
        Ok(StepOutcome {
            step: self.steps,
            time: self.time,
            snapshot,
            stability,
        })
    }

    pub fn find_loop<T: 'static>(&self) -> Option<&T> {
        self.loops
            .iter()
            .find_map(|feedback| feedback.as_any().downcast_ref::<T>())
    }

    pub fn find_loop_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.loops
            .iter_mut()
            .find_map(|feedback| feedback.as_any_mut().downcast_mut::<T>())
    }

    pub fn loop_names(&self) -> Vec<&str> {
        self.loops.iter().map(|l| l.name()).collect()
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    /// Direct access for drivers writing external inputs between steps.
    pub fn state_mut(&mut self) -> &mut StateVector {
        &mut self.state
    }

    pub fn history(&self) -> &RingBuffer<StateSnapshot> {
        &self.history
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Sticky: once set it stays set for the rest of the run.
    pub fn is_unstable(&self) -> bool {
        self.unstable
    }

    pub fn instability_count(&self) -> u64 {
        self.instability_count
    }

    pub fn first_instability(&self) -> Option<&InstabilityReport> {
        self.first_instability.as_ref()
    }
}
