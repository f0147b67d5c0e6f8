//! Feasible load configuration search
//!
//! Rejection sampling with a hard attempt cap: each attempt scales the feeder's
//! base load vector at random, solves, and accepts the first candidate whose bus
//! voltages all fall inside a loose legality band. No state is carried between
//! attempts.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{FeederModel, LoadConfiguration, Observation};
use crate::error::{EnvError, EnvResult};
use crate::solver::{PowerFlowSolver, SolverError};

/// How load scale factors are drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Independent factor per load
    #[default]
    PerLoad,
    /// One factor shared by every load on the feeder
    Feeder,
}

/// Sampling law for load perturbation
///
/// Setpoint = base kW × factor, factor ~ Uniform[min_scale, max_scale].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingPolicy {
    pub mode: ScalingMode,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ScalingPolicy {
    fn default() -> Self {
        Self {
            mode: ScalingMode::PerLoad,
            min_scale: 0.6,
            max_scale: 1.4,
        }
    }
}

impl ScalingPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if !self.min_scale.is_finite() || !self.max_scale.is_finite() {
            return Err("scale bounds must be finite".to_string());
        }
        if self.min_scale < 0.0 {
            return Err(format!("min_scale cannot be negative: {}", self.min_scale));
        }
        if self.max_scale < self.min_scale {
            return Err(format!(
                "max_scale ({}) must be >= min_scale ({})",
                self.max_scale, self.min_scale
            ));
        }
        Ok(())
    }

    /// Draw one candidate from the base load vector
    pub fn sample(&self, base_kw: &[f64], rng: &mut StdRng) -> Vec<f64> {
        let factor = Uniform::new_inclusive(self.min_scale, self.max_scale);
        match self.mode {
            ScalingMode::PerLoad => base_kw.iter().map(|kw| kw * factor.sample(rng)).collect(),
            ScalingMode::Feeder => {
                let k = factor.sample(rng);
                base_kw.iter().map(|kw| kw * k).collect()
            }
        }
    }
}

/// Search limits and legality band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum candidates (and solves) per search
    pub max_attempts: usize,
    /// Lowest legal bus voltage (p.u.)
    pub min_bus_volt: f64,
    /// Highest legal bus voltage (p.u.)
    pub max_bus_volt: f64,
    pub scaling: ScalingPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            min_bus_volt: 0.8,
            max_bus_volt: 1.2,
            scaling: ScalingPolicy::default(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if !self.min_bus_volt.is_finite() || !self.max_bus_volt.is_finite() {
            return Err("bus voltage bounds must be finite".to_string());
        }
        if self.min_bus_volt >= self.max_bus_volt {
            return Err(format!(
                "min_bus_volt ({}) must be below max_bus_volt ({})",
                self.min_bus_volt, self.max_bus_volt
            ));
        }
        self.scaling.validate()
    }
}

/// Why a candidate was turned down
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Diverged(String),
    NoBuses,
    OutOfBand { min_pu: f64, max_pu: f64 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Diverged(reason) => write!(f, "solver diverged: {reason}"),
            Rejection::NoBuses => write!(f, "solver reported no bus voltages"),
            Rejection::OutOfBand { min_pu, max_pu } => {
                write!(f, "voltages span {min_pu:.4}..{max_pu:.4} p.u.")
            }
        }
    }
}

/// Write a load configuration to the solver, one load at a time in feeder order
pub fn apply_load_configuration<S: PowerFlowSolver + ?Sized>(
    solver: &mut S,
    feeder: &FeederModel,
    loads: &LoadConfiguration,
) -> Result<(), SolverError> {
    for (id, kw) in feeder.load_ids().iter().zip(loads.as_slice()) {
        solver.set_load_kw(id, *kw)?;
    }
    Ok(())
}

/// Write the base load vector back, continuing past individual write failures
///
/// Returns the first failure, if any, after every load has been attempted.
fn restore_base_configuration<S: PowerFlowSolver + ?Sized>(
    solver: &mut S,
    feeder: &FeederModel,
) -> Result<(), SolverError> {
    let mut first_err = None;
    for (id, kw) in feeder.load_ids().iter().zip(feeder.base_load_kw()) {
        if let Err(err) = solver.set_load_kw(id, *kw) {
            first_err.get_or_insert(err);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Randomized search for a voltage-legal load configuration
pub struct LoadConfigSearch {
    config: SearchConfig,
    rng: StdRng,
}

impl LoadConfigSearch {
    /// Create a search; `seed = None` draws from OS entropy
    pub fn new(config: SearchConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Find the first candidate whose solved voltages lie in the legality band
    ///
    /// Solver divergence rejects the candidate; any other solver fault is
    /// returned. Every failure path writes the base load vector back before
    /// returning, so the solver never keeps a rejected or half-written candidate.
    pub fn generate<S: PowerFlowSolver + ?Sized>(
        &mut self,
        solver: &mut S,
        feeder: &FeederModel,
    ) -> EnvResult<LoadConfiguration> {
        let max_attempts = self.config.max_attempts;

        match self.first_legal(solver, feeder) {
            Ok(Some(candidate)) => Ok(candidate),
            Ok(None) => {
                warn!(
                    attempts = max_attempts,
                    min_bus_volt = self.config.min_bus_volt,
                    max_bus_volt = self.config.max_bus_volt,
                    "no voltage-legal load configuration found"
                );
                restore_base_configuration(solver, feeder)?;
                Err(EnvError::ConfigurationSearchExhausted {
                    attempts: max_attempts,
                })
            }
            Err(err) => {
                if let Err(restore_err) = restore_base_configuration(solver, feeder) {
                    warn!(error = %restore_err, "base loads only partially restored");
                }
                Err(err)
            }
        }
    }

    fn first_legal<S: PowerFlowSolver + ?Sized>(
        &mut self,
        solver: &mut S,
        feeder: &FeederModel,
    ) -> EnvResult<Option<LoadConfiguration>> {
        for attempt in 1..=self.config.max_attempts {
            let setpoints = self.config.scaling.sample(feeder.base_load_kw(), &mut self.rng);
            let candidate = LoadConfiguration::new(setpoints)?;
            debug!(
                attempt,
                total_kw = candidate.total_kw(),
                "evaluating load configuration candidate"
            );

            match self.evaluate(solver, feeder, &candidate)? {
                None => {
                    info!(
                        attempt,
                        total_kw = candidate.total_kw(),
                        "accepted load configuration"
                    );
                    return Ok(Some(candidate));
                }
                Some(rejection) => {
                    debug!(attempt, reason = %rejection, "rejected load configuration");
                }
            }
        }
        Ok(None)
    }

    /// Apply, solve and check one candidate; `None` means accepted
    fn evaluate<S: PowerFlowSolver + ?Sized>(
        &self,
        solver: &mut S,
        feeder: &FeederModel,
        candidate: &LoadConfiguration,
    ) -> EnvResult<Option<Rejection>> {
        apply_load_configuration(solver, feeder, candidate)?;

        match solver.solve() {
            Ok(()) => {}
            Err(SolverError::Divergence(reason)) => return Ok(Some(Rejection::Diverged(reason))),
            Err(other) => return Err(EnvError::Solver(other)),
        }

        let observation = Observation::new(solver.bus_voltage_magnitudes()?);
        if observation.is_empty() {
            return Ok(Some(Rejection::NoBuses));
        }
        if observation.all_within(self.config.min_bus_volt, self.config.max_bus_volt) {
            return Ok(None);
        }

        Ok(Some(Rejection::OutOfBand {
            min_pu: observation.min().unwrap_or(f64::NAN),
            max_pu: observation.max().unwrap_or(f64::NAN),
        }))
    }
}
