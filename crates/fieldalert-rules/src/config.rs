//! Rule thresholds

use crate::EvaluationError;
use serde::{Deserialize, Serialize};

/// Thresholds used by the evaluator
///
/// Passed explicitly into [`crate::Evaluator`]; nothing is read from ambient
/// state, so boundary days can be tested deterministically.
///
/// # Examples
///
/// ```
/// use fieldalert_rules::RuleConfig;
///
/// let config = RuleConfig::default();
/// assert_eq!(config.household_window_start_days, 3);
/// assert_eq!(config.household_window_end_days, 7);
/// assert_eq!(config.visit_grace_period_days, 28);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// First day after a dose on which the household visit is due (inclusive)
    pub household_window_start_days: u32,

    /// Last day after a dose on which the household visit is still due
    /// (inclusive); later than this the window has expired
    pub household_window_end_days: u32,

    /// Days a scheduled visit may be late before the participant counts as
    /// non-compliant. Four weeks, as defined by the trial's PI.
    pub visit_grace_period_days: u32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            household_window_start_days: 3,
            household_window_end_days: 7,
            visit_grace_period_days: 28,
        }
    }
}

impl RuleConfig {
    /// Create a configuration with explicit thresholds
    pub fn new(window_start_days: u32, window_end_days: u32, grace_period_days: u32) -> Self {
        Self {
            household_window_start_days: window_start_days,
            household_window_end_days: window_end_days,
            visit_grace_period_days: grace_period_days,
        }
    }

    /// Check that the thresholds are coherent
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if self.household_window_start_days > self.household_window_end_days {
            return Err(EvaluationError::Config(format!(
                "household window start ({}) is after its end ({})",
                self.household_window_start_days, self.household_window_end_days
            )));
        }
        Ok(())
    }
}
