#![allow(dead_code)]
//! Shared test doubles for the integration suites

use std::collections::VecDeque;

use feeder_env::solver::{PowerFlowSolver, SolverError};

/// One adapter call, in the order the environment issued it
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Compile(String),
    Property(String, String, String),
    LoadKw(String, f64),
    Switch(String, bool),
    Solve,
}

/// Fake engine: fixed element names, scripted solve results, full call log
pub struct RecordingSolver {
    pub calls: Vec<Call>,
    outcomes: VecDeque<Result<Vec<f64>, SolverError>>,
    fallback: Vec<f64>,
    voltages: Vec<f64>,
    reject_closing: Option<&'static str>,
}

impl RecordingSolver {
    /// Every solve yields `voltages` unless a scripted outcome is queued
    pub fn new(voltages: Vec<f64>) -> Self {
        Self {
            calls: Vec::new(),
            outcomes: VecDeque::new(),
            fallback: voltages,
            voltages: Vec::new(),
            reject_closing: None,
        }
    }

    /// Refuse every attempt to close `switch`; opening it still succeeds
    pub fn rejecting_close_of(mut self, switch: &'static str) -> Self {
        self.reject_closing = Some(switch);
        self
    }

    /// Engine-side switch position from the last successful write
    pub fn switch_closed(&self, switch: &str) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::Switch(id, closed) if id == switch => Some(*closed),
            _ => None,
        })
    }

    /// Queue the result of the next unscripted solve
    pub fn then(mut self, outcome: Result<Vec<f64>, SolverError>) -> Self {
        self.outcomes.push_back(outcome);
        self
    }

    pub fn solves(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Solve).count()
    }

    /// Calls issued after the `n`-th solve (1-based)
    pub fn calls_after_solve(&self, n: usize) -> &[Call] {
        let mut seen = 0;
        for (idx, call) in self.calls.iter().enumerate() {
            if *call == Call::Solve {
                seen += 1;
                if seen == n {
                    return &self.calls[idx + 1..];
                }
            }
        }
        &[]
    }
}

pub const LOAD_IDS: [&str; 3] = ["671", "634a", "675a"];
pub const BASE_KW: [f64; 3] = [1155.0, 160.0, 485.0];

impl PowerFlowSolver for RecordingSolver {
    fn compile(&mut self, model: &str) -> Result<(), SolverError> {
        self.calls.push(Call::Compile(model.to_string()));
        Ok(())
    }

    fn set_element_property(
        &mut self,
        element: &str,
        property: &str,
        value: &str,
    ) -> Result<(), SolverError> {
        self.calls.push(Call::Property(
            element.to_string(),
            property.to_string(),
            value.to_string(),
        ));
        Ok(())
    }

    fn set_load_kw(&mut self, load: &str, kw: f64) -> Result<(), SolverError> {
        self.calls.push(Call::LoadKw(load.to_string(), kw));
        Ok(())
    }

    fn load_kw(&self, load: &str) -> Result<f64, SolverError> {
        LOAD_IDS
            .iter()
            .position(|id| *id == load)
            .map(|i| BASE_KW[i])
            .ok_or_else(|| SolverError::UnknownElement(format!("load.{load}")))
    }

    fn set_switch_state(&mut self, switch: &str, closed: bool) -> Result<(), SolverError> {
        if closed && self.reject_closing.is_some_and(|id| id == switch) {
            return Err(SolverError::UnknownElement(switch.to_string()));
        }
        self.calls.push(Call::Switch(switch.to_string(), closed));
        Ok(())
    }

    fn solve(&mut self) -> Result<(), SolverError> {
        self.calls.push(Call::Solve);
        let outcome = match self.outcomes.pop_front() {
            Some(outcome) => outcome,
            None => Ok(self.fallback.clone()),
        };
        self.voltages = outcome?;
        Ok(())
    }

    fn bus_voltage_magnitudes(&self) -> Result<Vec<f64>, SolverError> {
        Ok(self.voltages.clone())
    }

    fn load_ids(&self) -> Result<Vec<String>, SolverError> {
        Ok(LOAD_IDS.iter().map(|s| s.to_string()).collect())
    }

    fn switch_ids(&self) -> Result<Vec<String>, SolverError> {
        Ok(vec!["cap1".to_string(), "cap2".to_string()])
    }
}
