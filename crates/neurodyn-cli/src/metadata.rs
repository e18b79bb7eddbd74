use anyhow::Result;
use chrono::{DateTime, Utc};
use disorder_sim::SimulationConfig;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Identifies one CLI invocation and the exact configuration it ran.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentMetadata {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub seeds: Vec<u64>,
    /// Hex SHA-256 of the compact JSON config.
    pub config_hash: String,
    pub version: &'static str,
}

impl ExperimentMetadata {
    pub fn new(config: &SimulationConfig, seeds: Vec<u64>) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            seeds,
            config_hash: config_hash(config)?,
            version: env!("CARGO_PKG_VERSION"),
        })
    }
}

pub fn config_hash(config: &SimulationConfig) -> Result<String> {
    let canonical = serde_json::to_vec(config)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}
