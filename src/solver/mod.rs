//! # Power Flow Solver Adapter
//!
//! The narrow capability seam between the environment and the power flow engine.
//! The environment never reasons about line models or load-flow iteration: it
//! writes element settings, asks for a solve and reads back per-unit bus voltages.
//!
//! - **`PowerFlowSolver`**: the adapter trait every engine binding implements
//! - **`SimulatedFeeder`**: in-process IEEE 13-bus approximation used for
//!   development, tests and the smoke driver

pub mod simulated;

pub use simulated::SimulatedFeeder;

use thiserror::Error;

/// Solver adapter errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("No circuit compiled")]
    NotCompiled,
    #[error("Failed to compile model '{model}': {reason}")]
    Compile { model: String, reason: String },
    #[error("Unknown element: {0}")]
    UnknownElement(String),
    #[error("Unknown property '{property}' on {element}")]
    UnknownProperty { element: String, property: String },
    #[error("Invalid value '{value}' for {element}.{property}")]
    InvalidValue {
        element: String,
        property: String,
        value: String,
    },
    #[error("Solution did not converge: {0}")]
    Divergence(String),
}

/// Adapter over an external power flow engine
///
/// Calls are synchronous and block until the engine returns. Implementations
/// are owned exclusively by one environment, hence `&mut self` on writes.
#[cfg_attr(test, mockall::automock)]
pub trait PowerFlowSolver {
    /// Load a fixed network description
    fn compile(&mut self, model: &str) -> Result<(), SolverError>;

    /// Write a named property on a fully qualified element (`class.name`)
    fn set_element_property(
        &mut self,
        element: &str,
        property: &str,
        value: &str,
    ) -> Result<(), SolverError>;

    /// Set a load's real power demand in kW
    fn set_load_kw(&mut self, load: &str, kw: f64) -> Result<(), SolverError>;

    /// Read a load's current real power demand in kW
    fn load_kw(&self, load: &str) -> Result<f64, SolverError>;

    /// Close (`true`) or open (`false`) a switchable element
    fn set_switch_state(&mut self, switch: &str, closed: bool) -> Result<(), SolverError>;

    /// Run one power flow solution
    fn solve(&mut self) -> Result<(), SolverError>;

    /// Per-unit voltage magnitude of every bus, in the engine's fixed bus order
    fn bus_voltage_magnitudes(&self) -> Result<Vec<f64>, SolverError>;

    /// All load identifiers, in the engine's fixed order
    fn load_ids(&self) -> Result<Vec<String>, SolverError>;

    /// All switchable capacitor identifiers, in the engine's fixed order
    fn switch_ids(&self) -> Result<Vec<String>, SolverError>;
}
