use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::EnvError;

/// Number of discrete actions (2 capacitor banks, on/off each)
pub const ACTION_COUNT: usize = 4;

/// On/off pattern for the two capacitor banks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitorPattern {
    pub cap1: bool,
    pub cap2: bool,
}

impl CapacitorPattern {
    pub const ALL_OFF: Self = Self {
        cap1: false,
        cap2: false,
    };

    /// Flags in bank order
    pub fn as_array(&self) -> [bool; 2] {
        [self.cap1, self.cap2]
    }
}

/// Agent action: one combination of the two capacitor banks' states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    AllOff,
    Cap1On,
    Cap2On,
    BothOn,
}

impl Action {
    /// Capacitor pattern this action switches to
    pub fn pattern(&self) -> CapacitorPattern {
        match self {
            Action::AllOff => CapacitorPattern {
                cap1: false,
                cap2: false,
            },
            Action::Cap1On => CapacitorPattern {
                cap1: true,
                cap2: false,
            },
            Action::Cap2On => CapacitorPattern {
                cap1: false,
                cap2: true,
            },
            Action::BothOn => CapacitorPattern {
                cap1: true,
                cap2: true,
            },
        }
    }

    /// Integer encoding used by agents
    pub fn index(&self) -> i64 {
        match self {
            Action::AllOff => 0,
            Action::Cap1On => 1,
            Action::Cap2On => 2,
            Action::BothOn => 3,
        }
    }
}

impl TryFrom<i64> for Action {
    type Error = EnvError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::AllOff),
            1 => Ok(Action::Cap1On),
            2 => Ok(Action::Cap2On),
            3 => Ok(Action::BothOn),
            other => Err(EnvError::InvalidAction(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case(0, false, false)]
    #[case(1, true, false)]
    #[case(2, false, true)]
    #[case(3, true, true)]
    fn test_action_decodes_to_pattern(#[case] raw: i64, #[case] cap1: bool, #[case] cap2: bool) {
        let action = Action::try_from(raw).unwrap();
        assert_eq!(action.pattern(), CapacitorPattern { cap1, cap2 });
        assert_eq!(action.index(), raw);
    }

    #[rstest]
    #[case(-1)]
    #[case(4)]
    #[case(i64::MAX)]
    fn test_out_of_range_action_rejected(#[case] raw: i64) {
        assert!(matches!(
            Action::try_from(raw),
            Err(EnvError::InvalidAction(v)) if v == raw
        ));
    }

    #[test]
    fn test_patterns_are_distinct() {
        let patterns: Vec<_> = Action::iter().map(|a| a.pattern()).collect();
        assert_eq!(patterns.len(), ACTION_COUNT);
        for (i, a) in patterns.iter().enumerate() {
            assert!(patterns[i + 1..].iter().all(|b| a != b));
        }
    }
}
