//! # Reinforcement Learning Environment
//!
//! - **`Environment`**: the reset/step/render contract agents drive
//! - **`FeederEnv`**: capacitor switching on the 13-bus feeder, a one-step MDP
//! - **Spaces**: declared action and observation bounds

pub mod feeder_env;
pub mod spaces;

pub use feeder_env::FeederEnv;
pub use spaces::{BoxSpace, DiscreteSpace};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EnvResult;

/// Auxiliary step data
pub type Info = BTreeMap<String, serde_json::Value>;

/// Render targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    Human,
}

/// Outcome of one `step`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step<O> {
    pub observation: O,
    pub reward: f64,
    pub done: bool,
    pub info: Info,
}

/// Environment interface consumed by agents
pub trait Environment {
    type Observation;
    /// Raw action as issued by the agent
    type Action;

    /// Start a new episode and return its first observation
    fn reset(&mut self) -> EnvResult<Self::Observation>;

    /// Apply an action and advance the environment
    fn step(&mut self, action: Self::Action) -> EnvResult<Step<Self::Observation>>;

    fn render(&self, mode: RenderMode);

    fn action_space(&self) -> &DiscreteSpace;

    fn observation_space(&self) -> &BoxSpace;
}
