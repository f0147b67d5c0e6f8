use serde::{Deserialize, Serialize};

use crate::domain::Observation;

/// Finite set of integer actions `0..n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteSpace {
    pub n: usize,
}

impl DiscreteSpace {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn contains(&self, action: i64) -> bool {
        usize::try_from(action).map(|a| a < self.n).unwrap_or(false)
    }
}

/// Bounded real vector with the same bounds on every entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: f64,
    pub high: f64,
    pub dim: usize,
}

impl BoxSpace {
    pub fn new(low: f64, high: f64, dim: usize) -> Self {
        Self { low, high, dim }
    }

    pub fn contains(&self, observation: &Observation) -> bool {
        observation.len() == self.dim && observation.all_within(self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_space_bounds() {
        let space = DiscreteSpace::new(4);
        assert!((0..4).all(|a| space.contains(a)));
        assert!(!space.contains(4));
        assert!(!space.contains(-1));
    }

    #[test]
    fn test_box_space_checks_shape_and_bounds() {
        let space = BoxSpace::new(0.0, 2.0, 3);
        assert!(space.contains(&Observation::new(vec![0.0, 1.0, 2.0])));
        assert!(!space.contains(&Observation::new(vec![1.0, 1.0])));
        assert!(!space.contains(&Observation::new(vec![1.0, 1.0, 2.1])));
    }
}
