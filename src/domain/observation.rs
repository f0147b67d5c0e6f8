use serde::{Deserialize, Serialize};

/// Per-unit voltage magnitude of every bus after a solve
///
/// Bus order is whatever the solver reports. An observation is replaced
/// wholesale after each solve, never patched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation(Vec<f64>);

impl Observation {
    pub fn new(voltages_pu: Vec<f64>) -> Self {
        Self(voltages_pu)
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

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    /// True if every bus lies in `[min_pu, max_pu]`; NaN never does
    pub fn all_within(&self, min_pu: f64, max_pu: f64) -> bool {
        self.0.iter().all(|v| (min_pu..=max_pu).contains(v))
    }

    pub fn min(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::max)
    }
}

impl From<Vec<f64>> for Observation {
    fn from(voltages_pu: Vec<f64>) -> Self {
        Self(voltages_pu)
    }
}

impl AsRef<[f64]> for Observation {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_within_band() {
        let obs = Observation::new(vec![0.95, 1.0, 1.05]);
        assert!(obs.all_within(0.8, 1.2));
        assert!(obs.all_within(0.95, 1.05));
        assert!(!obs.all_within(0.96, 1.05));
    }

    #[test]
    fn test_nan_is_never_within_band() {
        let obs = Observation::new(vec![1.0, f64::NAN]);
        assert!(!obs.all_within(0.0, 2.0));
    }

    #[test]
    fn test_extremes() {
        let obs = Observation::new(vec![1.02, 0.93, 1.07]);
        assert_eq!(obs.min(), Some(0.93));
        assert_eq!(obs.max(), Some(1.07));
        assert_eq!(Observation::default().min(), None);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let obs = Observation::new(vec![1.0, 0.5]);
        assert_eq!(serde_json::to_string(&obs).unwrap(), "[1.0,0.5]");
    }
}
