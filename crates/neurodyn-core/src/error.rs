use thiserror::Error;

/// Errors raised by state access, loop stepping, dopamine and medication models.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DynamicsError {
    #[error("configuration error: {field} = {value} is outside [{min}, {max}]")]
    Configuration {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("invalid dose {0}: dose must be finite and positive")]
    InvalidDose(f64),
    #[error("dose {dose} of {medication} exceeds the configured maximum {max}")]
    DoseAboveMaximum {
        medication: String,
        dose: f64,
        max: f64,
    },
    #[error("unknown medication: {0}")]
    UnknownMedication(String),
    #[error("invalid time step {0}: dt must be finite and > 0")]
    InvalidTimeStep(f64),
    #[error("invalid input {name} = {value}: {reason}")]
    InvalidInput {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("unknown state field: {0}")]
    UnknownField(String),
    #[error("non-finite value {value} written to {field} in strict mode")]
    NonFiniteValue { field: &'static str, value: f64 },
    #[error("instability detected at step {step}: {violations} field(s) out of bounds")]
    InstabilityDetected { step: u64, violations: usize },
}

pub type DynamicsResult<T> = Result<T, DynamicsError>;

/// Fail fast when a construction parameter leaves its documented range.
pub fn ensure_in_range(field: &'static str, value: f64, min: f64, max: f64) -> DynamicsResult<f64> {
    if value.is_finite() && value >= min && value <= max {
        Ok(value)
    } else {
        Err(DynamicsError::Configuration {
            field,
            value,
            min,
            max,
        })
    }
}

/// Shorthand for the common [0, 1] severity knobs.
pub fn ensure_unit(field: &'static str, value: f64) -> DynamicsResult<f64> {
    ensure_in_range(field, value, 0.0, 1.0)
}

/// Positive, finite rate or scale constant.
pub fn ensure_positive(field: &'static str, value: f64) -> DynamicsResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DynamicsError::Configuration {
            field,
            value,
            min: f64::MIN_POSITIVE,
            max: f64::MAX,
        })
    }
}

pub fn ensure_non_negative(field: &'static str, value: f64) -> DynamicsResult<f64> {
    ensure_in_range(field, value, 0.0, f64::MAX)
}

/// Runtime step input that must be finite (and optionally non-negative).
pub fn ensure_input(name: &'static str, value: f64, non_negative: bool) -> DynamicsResult<f64> {
    if !value.is_finite() {
        return Err(DynamicsError::InvalidInput {
            name,
            value,
            reason: "value must be finite",
        });
    }
    if non_negative && value < 0.0 {
        return Err(DynamicsError::InvalidInput {
            name,
            value,
            reason: "value must be non-negative",
        });
    }
    Ok(value)
}
