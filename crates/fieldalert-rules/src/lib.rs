//! FieldAlert Rules
//!
//! Classifies which unscheduled visit, if any, a participant requires.
//!
//! The evaluator applies:
//! - Record validation (fail closed on missing or inconsistent dates)
//! - The post-dose household-visit window
//! - Missed scheduled visits not yet followed by a non-compliance visit
//! - Precedence (non-compliant beats household)
//!
//! # Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use fieldalert_domain::{AlertKind, DoseEvent, ParticipantHistory};
//! use fieldalert_rules::{Evaluator, RuleConfig};
//!
//! let dosed = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
//! let history = ParticipantHistory::new("1042").with_dose(DoseEvent::new(1, dosed));
//!
//! let evaluator = Evaluator::new(RuleConfig::default());
//! let as_of = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
//! assert_eq!(evaluator.classify(&history, as_of).unwrap(), Some(AlertKind::HouseholdVisit));
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod evaluator;

pub use config::RuleConfig;
pub use error::EvaluationError;
pub use evaluator::{Assessment, Evaluator};
