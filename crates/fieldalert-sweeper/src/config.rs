//! Configuration for sweep runs

use serde::{Deserialize, Serialize};

/// Operational switches for the sweeper
///
/// Rule thresholds live in [`fieldalert_rules::RuleConfig`]; this only
/// controls how decisions are applied.
///
/// # Examples
///
/// ```
/// use fieldalert_sweeper::SweepConfig;
///
/// let config = SweepConfig::default();
/// assert!(!config.dry_run);
/// assert!(config.retry_on_conflict);
///
/// let preview = SweepConfig::dry_run();
/// assert!(preview.dry_run);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Dry-run mode: decide and log, but never write
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// Repeat fetch-evaluate-write once when a write hits a concurrent edit
    /// Default: true
    #[serde(default = "default_retry_on_conflict")]
    pub retry_on_conflict: bool,
}

fn default_retry_on_conflict() -> bool {
    true
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            retry_on_conflict: true,
        }
    }
}

impl SweepConfig {
    /// Configuration that plans actions without writing them
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Number of write attempts per participant
    pub fn write_attempts(&self) -> u32 {
        if self.retry_on_conflict {
            2
        } else {
            1
        }
    }
}
