//! Voltage-zone reward shaping
//!
//! Buses are sorted into three disjoint per-unit bands and each bus outside the
//! nominal band adds a fixed penalty. The reward is never positive and is zero
//! exactly when every bus sits in the nominal band.

use serde::{Deserialize, Serialize};

/// Zone thresholds (p.u.) and per-bus penalties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoltageZones {
    pub zone1_lb: f64,
    pub zone1_ub: f64,
    pub zone2_lb: f64,
    pub zone2_ub: f64,
    /// Penalty per bus in the moderate band
    pub zone1_penalty: f64,
    /// Penalty per bus in the severe band
    pub zone2_penalty: f64,
}

impl Default for VoltageZones {
    fn default() -> Self {
        Self {
            zone1_lb: 0.95,
            zone1_ub: 1.05,
            zone2_lb: 0.90,
            zone2_ub: 1.10,
            zone1_penalty: -200.0,
            zone2_penalty: -400.0,
        }
    }
}

impl VoltageZones {
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            ("zone1_lb", self.zone1_lb),
            ("zone1_ub", self.zone1_ub),
            ("zone2_lb", self.zone2_lb),
            ("zone2_ub", self.zone2_ub),
            ("zone1_penalty", self.zone1_penalty),
            ("zone2_penalty", self.zone2_penalty),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{name} is not finite: {value}"));
        }

        if !(self.zone2_lb < self.zone1_lb
            && self.zone1_lb <= self.zone1_ub
            && self.zone1_ub < self.zone2_ub)
        {
            return Err(format!(
                "zone thresholds must satisfy zone2_lb < zone1_lb <= zone1_ub < zone2_ub, got {} / {} / {} / {}",
                self.zone2_lb, self.zone1_lb, self.zone1_ub, self.zone2_ub
            ));
        }

        if self.zone1_penalty > 0.0 || self.zone2_penalty > 0.0 {
            return Err("zone penalties must not be positive".to_string());
        }

        Ok(())
    }

    /// Classify one bus voltage
    pub fn classify(&self, v_pu: f64) -> VoltageZone {
        if !v_pu.is_finite() || v_pu >= self.zone2_ub || v_pu <= self.zone2_lb {
            VoltageZone::Severe
        } else if v_pu >= self.zone1_lb && v_pu <= self.zone1_ub {
            VoltageZone::Nominal
        } else {
            VoltageZone::Moderate
        }
    }
}

/// Voltage band of a single bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoltageZone {
    /// Inside `[zone1_lb, zone1_ub]`
    Nominal,
    /// Between the nominal and severe bands
    Moderate,
    /// At or beyond `zone2_lb` / `zone2_ub`
    Severe,
}

/// Number of buses per zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCounts {
    pub nominal: usize,
    pub moderate: usize,
    pub severe: usize,
}

impl ZoneCounts {
    pub fn total(&self) -> usize {
        self.nominal + self.moderate + self.severe
    }
}

/// Maps an observation to a scalar penalty
#[derive(Debug, Clone, Default)]
pub struct RewardShaper {
    zones: VoltageZones,
}

impl RewardShaper {
    pub fn new(zones: VoltageZones) -> Self {
        Self { zones }
    }

    pub fn zone_counts(&self, voltages_pu: &[f64]) -> ZoneCounts {
        voltages_pu
            .iter()
            .fold(ZoneCounts::default(), |mut counts, v| {
                match self.zones.classify(*v) {
                    VoltageZone::Nominal => counts.nominal += 1,
                    VoltageZone::Moderate => counts.moderate += 1,
                    VoltageZone::Severe => counts.severe += 1,
                }
                counts
            })
    }

    /// Sum of per-bus zone penalties
    pub fn reward(&self, voltages_pu: &[f64]) -> f64 {
        let counts = self.zone_counts(voltages_pu);
        counts.moderate as f64 * self.zones.zone1_penalty
            + counts.severe as f64 * self.zones.zone2_penalty
    }
}
