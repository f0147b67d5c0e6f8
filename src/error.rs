use thiserror::Error;

use crate::solver::SolverError;

/// Errors surfaced by the feeder environment
///
/// Every variant is fatal for the call that produced it. The only place solver
/// failures are absorbed is the load configuration search, which treats a
/// divergent candidate as rejected.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Power flow engine failed to start: {0}")]
    EngineStartup(#[source] SolverError),

    #[error("No voltage-legal load configuration found in {attempts} attempts")]
    ConfigurationSearchExhausted { attempts: usize },

    #[error("Power flow did not converge: {0}")]
    SolveDivergence(String),

    #[error("Invalid action: {0} (expected 0..=3)")]
    InvalidAction(i64),

    #[error("Solver error: {0}")]
    Solver(#[source] SolverError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<SolverError> for EnvError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::Divergence(reason) => EnvError::SolveDivergence(reason),
            other => EnvError::Solver(other),
        }
    }
}

pub type EnvResult<T> = Result<T, EnvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divergence_maps_to_solve_divergence() {
        let err: EnvError = SolverError::Divergence("no fixed point".into()).into();
        assert!(matches!(err, EnvError::SolveDivergence(_)));
    }

    #[test]
    fn test_other_solver_faults_are_wrapped() {
        let err: EnvError = SolverError::UnknownElement("load.999".into()).into();
        assert!(matches!(err, EnvError::Solver(SolverError::UnknownElement(_))));
    }
}
