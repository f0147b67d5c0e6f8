//! Capacitor switching on the IEEE 13-bus distribution feeder as a
//! reinforcement learning environment.
//!
//! A [`solver::PowerFlowSolver`] computes bus voltages. Each episode starts from a
//! randomly scaled, voltage-legal load configuration ([`search`]); the agent picks
//! one of four capacitor patterns and is scored by voltage zone ([`reward`]).

pub mod config;
pub mod domain;
pub mod env;
pub mod error;
pub mod reward;
pub mod search;
pub mod solver;
pub mod telemetry;

pub use error::{EnvError, EnvResult};
