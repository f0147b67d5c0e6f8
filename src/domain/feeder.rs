use serde::{Deserialize, Serialize};

use super::CapacitorPattern;
use crate::error::{EnvError, EnvResult};

/// Fixed feeder topology as seen by the environment
///
/// Captured once at construction and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeederModel {
    load_ids: Vec<String>,
    base_load_kw: Vec<f64>,
    capacitor_ids: [String; 2],
    bus_count: usize,
}

impl FeederModel {
    pub fn new(
        load_ids: Vec<String>,
        base_load_kw: Vec<f64>,
        capacitor_ids: [String; 2],
        bus_count: usize,
    ) -> EnvResult<Self> {
        if load_ids.len() != base_load_kw.len() {
            return Err(EnvError::InvalidConfig(format!(
                "{} load ids but {} base loads",
                load_ids.len(),
                base_load_kw.len()
            )));
        }
        if let Some(kw) = base_load_kw.iter().find(|kw| !kw.is_finite() || **kw < 0.0) {
            return Err(EnvError::InvalidConfig(format!(
                "base load must be a non-negative number, got {kw}"
            )));
        }
        if bus_count == 0 {
            return Err(EnvError::InvalidConfig("feeder has no buses".to_string()));
        }
        Ok(Self {
            load_ids,
            base_load_kw,
            capacitor_ids,
            bus_count,
        })
    }

    pub fn load_ids(&self) -> &[String] {
        &self.load_ids
    }

    pub fn base_load_kw(&self) -> &[f64] {
        &self.base_load_kw
    }

    pub fn capacitor_ids(&self) -> &[String; 2] {
        &self.capacitor_ids
    }

    pub fn bus_count(&self) -> usize {
        self.bus_count
    }

    pub fn load_count(&self) -> usize {
        self.load_ids.len()
    }

    /// The unperturbed load vector
    pub fn base_configuration(&self) -> LoadConfiguration {
        LoadConfiguration(self.base_load_kw.clone())
    }
}

/// Real-power setpoints (kW), one per load in the feeder's load order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadConfiguration(Vec<f64>);

impl LoadConfiguration {
    pub fn new(setpoints_kw: Vec<f64>) -> EnvResult<Self> {
        if let Some(kw) = setpoints_kw.iter().find(|kw| !kw.is_finite() || **kw < 0.0) {
            return Err(EnvError::InvalidConfig(format!(
                "load setpoint must be a non-negative number, got {kw}"
            )));
        }
        Ok(Self(setpoints_kw))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_kw(&self) -> f64 {
        self.0.iter().sum()
    }
}

/// Switch state of the two capacitor banks
///
/// Persists across steps and across episode resets; only `step` changes it,
/// one bank at a time as each switch write succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitorState {
    ids: [String; 2],
    pattern: CapacitorPattern,
}

impl CapacitorState {
    /// Both banks open
    pub fn new(ids: [String; 2]) -> Self {
        Self {
            ids,
            pattern: CapacitorPattern::ALL_OFF,
        }
    }

    pub fn pattern(&self) -> CapacitorPattern {
        self.pattern
    }

    /// Record one bank's switch position (0 = cap1, 1 = cap2)
    pub fn set_bank(&mut self, bank: usize, closed: bool) {
        match bank {
            0 => self.pattern.cap1 = closed,
            1 => self.pattern.cap2 = closed,
            _ => {}
        }
    }

    pub fn is_closed(&self, id: &str) -> Option<bool> {
        self.iter().find(|(cap, _)| *cap == id).map(|(_, closed)| closed)
    }

    /// `(id, closed)` in bank order
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.ids
            .iter()
            .map(String::as_str)
            .zip(self.pattern.as_array())
    }
}
