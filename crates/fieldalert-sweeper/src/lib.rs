//! FieldAlert Sweeper
//!
//! Keeps the alert flag of every participant record in line with what the
//! rules say the participant needs.
//!
//! # Overview
//!
//! One sweep (`run_once`) does, per participant:
//! 1. **Fetch** the dosing/visit history and the stored flag
//! 2. **Evaluate** the required alert (see `fieldalert-rules`)
//! 3. **Reconcile** stored flag and classification into `SetTo`, `Clear` or `NoOp`
//! 4. **Write** the flag through a conflict-checked partial update, unless `NoOp`
//!
//! Failures are isolated per participant and collected in a [`RunReport`].
//! A fatal gateway error aborts the rest of the sweep; updates already
//! written stay written.
//!
//! ## Reconciliation Policy
//!
//! | Stored | Classification | Action |
//! |--------|----------------|--------|
//! | same as classification | any | `NoOp` |
//! | some alert | none | `Clear` |
//! | anything else | some alert | `SetTo(alert)` |
//! | custom staff status | any | skipped |
//!
//! # Usage
//!
//! ```
//! use chrono::NaiveDate;
//! use fieldalert_domain::{AlertKind, DoseEvent, ParticipantHistory, ParticipantId};
//! use fieldalert_rules::RuleConfig;
//! use fieldalert_sweeper::{CancelToken, MemoryGateway, SweepConfig, Sweeper};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dosed = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
//! let mut gateway = MemoryGateway::new();
//! gateway.insert(ParticipantHistory::new("101").with_dose(DoseEvent::new(1, dosed)));
//!
//! let sweeper = Sweeper::new(RuleConfig::default(), SweepConfig::default())?;
//! let as_of = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
//! let report = sweeper.run_once(&mut gateway, as_of, &CancelToken::new());
//!
//! assert_eq!(report.total_set(), 1);
//! assert_eq!(
//!     gateway.managed_flag(&ParticipantId::new("101")),
//!     Some(Some(AlertKind::HouseholdVisit))
//! );
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [sweep]
//! dry_run = false
//! retry_on_conflict = true
//! ```

#![warn(missing_docs)]

mod config;
mod error;
pub mod memory;
pub mod reconciler;
mod report;
mod sweeper;

pub use config::SweepConfig;
pub use error::SweepError;
pub use memory::MemoryGateway;
pub use reconciler::{reconcile, ReconcileAction};
pub use report::{FailureKind, ParticipantFailure, RunOutcome, RunReport};
pub use sweeper::{CancelToken, Preview, Sweeper};
