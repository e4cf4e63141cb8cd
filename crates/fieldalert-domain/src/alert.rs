//! Alert module - the two visit alerts surfaced to field workers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of unscheduled visit a participant currently requires
///
/// The variant order encodes precedence: a non-compliant visit is the more
/// urgent operational signal, so `NonCompliantVisit > HouseholdVisit` and the
/// combined classification is simply the maximum of the candidates.
///
/// The absence of an alert is `None` in an `Option<AlertKind>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    /// Post-dose household follow-up visit is due
    HouseholdVisit,

    /// A scheduled study visit was missed and not yet followed up
    NonCompliantVisit,
}

impl AlertKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::HouseholdVisit => "household-visit",
            AlertKind::NonCompliantVisit => "non-compliant-visit",
        }
    }

    /// Parse a kind from a string (accepts short forms)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "household-visit" | "household" | "hh" | "tbv" => Some(AlertKind::HouseholdVisit),
            "non-compliant-visit" | "non-compliant" | "nc" => Some(AlertKind::NonCompliantVisit),
            _ => None,
        }
    }

    /// Combine two candidate classifications, honouring precedence
    ///
    /// # Examples
    ///
    /// ```
    /// use fieldalert_domain::AlertKind;
    ///
    /// let hh = Some(AlertKind::HouseholdVisit);
    /// let nc = Some(AlertKind::NonCompliantVisit);
    /// assert_eq!(AlertKind::prevailing(hh, nc), nc);
    /// assert_eq!(AlertKind::prevailing(hh, None), hh);
    /// assert_eq!(AlertKind::prevailing(None, None), None);
    /// ```
    pub fn prevailing(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        // None < Some(_) for Option, so max keeps any alert over no alert
        a.max(b)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid alert kind: {}", s))
    }
}
