//! Alert labels stored in the REDCap alert field
//!
//! Field workers read the alert field directly, so it holds a short label
//! such as `TBV@Maluana AZi/Pbo@Mar 04` rather than an enum value. Only the
//! prefix matters when reading a label back.

use crate::config::LabelConfig;
use chrono::NaiveDate;
use fieldalert_domain::{AlertKind, ParticipantHistory, StoredFlag, VisitStatus, VisitType};
use std::collections::HashMap;

/// Placeholder shown when a participant has no known community
const UNKNOWN_COMMUNITY: &str = "?";

/// Values interpolated into a label template
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelContext {
    /// Community name
    pub community: Option<String>,
    /// Date of the most recent dose
    pub last_dose: Option<NaiveDate>,
    /// Whole weeks since the oldest outstanding return date
    pub weeks: i64,
}

impl LabelContext {
    /// Gather label values from a participant history
    ///
    /// `weeks` counts from the most recent return date before `as_of` that
    /// was not followed by a visit.
    pub fn from_history(history: &ParticipantHistory, as_of: NaiveDate) -> Self {
        let last_dose = history.latest_dose().and_then(|d| d.administered_on);
        let overdue_since = history
            .visits
            .iter()
            .filter(|v| v.visit_type == VisitType::Scheduled)
            .filter(|v| v.status != VisitStatus::Done && v.scheduled_on < as_of)
            .map(|v| v.scheduled_on)
            .max();
        let weeks = overdue_since
            .map(|since| (as_of - since).num_days() / 7)
            .unwrap_or(0);

        Self {
            community: history.community.clone(),
            last_dose,
            weeks,
        }
    }
}

/// Renders and recognises alert labels
#[derive(Debug, Clone)]
pub struct LabelCodec {
    config: LabelConfig,
}

impl LabelCodec {
    /// Create a codec for the given templates
    pub fn new(config: LabelConfig) -> Self {
        Self { config }
    }

    /// Render the label for an alert
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use fieldalert_domain::AlertKind;
    /// use fieldalert_redcap::{LabelCodec, LabelConfig, LabelContext};
    ///
    /// let codec = LabelCodec::new(LabelConfig::default());
    /// let context = LabelContext {
    ///     community: Some("Maluana".to_string()),
    ///     last_dose: NaiveDate::from_ymd_opt(2024, 3, 4),
    ///     weeks: 0,
    /// };
    /// assert_eq!(
    ///     codec.render(AlertKind::HouseholdVisit, &context),
    ///     "TBV@Maluana AZi/Pbo@Mar 04"
    /// );
    /// ```
    pub fn render(&self, kind: AlertKind, context: &LabelContext) -> String {
        let community = context.community.as_deref().unwrap_or(UNKNOWN_COMMUNITY);
        match kind {
            AlertKind::HouseholdVisit => {
                let last_dose = context
                    .last_dose
                    .map(|d| d.format(&self.config.date_format).to_string())
                    .unwrap_or_default();
                self.config
                    .household_template
                    .replace("{community}", community)
                    .replace("{last_dose}", &last_dose)
            }
            AlertKind::NonCompliantVisit => self
                .config
                .non_compliant_template
                .replace("{community}", community)
                .replace("{weeks}", &context.weeks.to_string()),
        }
    }

    /// Interpret a stored alert field value
    ///
    /// Empty means no alert; a known prefix means an engine-managed alert;
    /// anything else was typed by staff.
    pub fn parse(&self, value: &str) -> StoredFlag {
        let value = value.trim();
        if value.is_empty() {
            StoredFlag::Managed(None)
        } else if value.starts_with(&self.config.household_prefix) {
            StoredFlag::Managed(Some(AlertKind::HouseholdVisit))
        } else if value.starts_with(&self.config.non_compliant_prefix) {
            StoredFlag::Managed(Some(AlertKind::NonCompliantVisit))
        } else {
            StoredFlag::Custom(value.to_string())
        }
    }
}

/// Parse a REDCap choice list (`"1, Maluana | 2, Taninga"`) into code -> label
pub fn parse_choices(choices: &str, choice_sep: &str, code_sep: &str) -> HashMap<String, String> {
    choices
        .split(choice_sep)
        .filter_map(|choice| {
            let (code, label) = choice.split_once(code_sep)?;
            Some((code.trim().to_string(), label.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldalert_domain::{DoseEvent, ScheduledVisit};

    fn codec() -> LabelCodec {
        LabelCodec::new(LabelConfig::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_render_non_compliant() {
        let context = LabelContext {
            community: Some("Taninga".to_string()),
            last_dose: None,
            weeks: 5,
        };
        assert_eq!(
            codec().render(AlertKind::NonCompliantVisit, &context),
            "NC@Taninga (5 weeks)"
        );
    }

    #[test]
    fn test_render_without_community() {
        let label = codec().render(AlertKind::NonCompliantVisit, &LabelContext::default());
        assert_eq!(label, "NC@? (0 weeks)");
    }

    #[test]
    fn test_parse_labels() {
        let codec = codec();
        assert_eq!(codec.parse(""), StoredFlag::Managed(None));
        assert_eq!(codec.parse("   "), StoredFlag::Managed(None));
        assert_eq!(
            codec.parse("TBV@Maluana AZi/Pbo@Mar 04"),
            StoredFlag::Managed(Some(AlertKind::HouseholdVisit))
        );
        assert_eq!(
            codec.parse("NC@Taninga (9 weeks)"),
            StoredFlag::Managed(Some(AlertKind::NonCompliantVisit))
        );
        assert_eq!(
            codec.parse("Moved to Maputo"),
            StoredFlag::Custom("Moved to Maputo".to_string())
        );
    }

    #[test]
    fn test_rendered_labels_parse_back() {
        let codec = codec();
        let context = LabelContext {
            community: Some("Ilha Josina".to_string()),
            last_dose: Some(date(2024, 1, 15)),
            weeks: 3,
        };
        for kind in [AlertKind::HouseholdVisit, AlertKind::NonCompliantVisit] {
            let label = codec.render(kind, &context);
            assert_eq!(codec.parse(&label), StoredFlag::Managed(Some(kind)));
        }
    }

    #[test]
    fn test_parse_choices() {
        let choices = parse_choices("1, Maluana | 2, Taninga | 3, Ilha Josina", " | ", ", ");
        assert_eq!(choices.len(), 3);
        assert_eq!(choices["1"], "Maluana");
        assert_eq!(choices["3"], "Ilha Josina");
    }

    #[test]
    fn test_parse_choices_ignores_garbage() {
        let choices = parse_choices("1, Maluana | broken", " | ", ", ");
        assert_eq!(choices.len(), 1);
    }

    #[test]
    fn test_context_weeks_from_latest_outstanding_visit() {
        let history = ParticipantHistory::new("1")
            .with_community("Maluana")
            .with_dose(DoseEvent::new(1, date(2024, 1, 2)))
            .with_visit(ScheduledVisit::done(
                VisitType::Scheduled,
                date(2024, 1, 2),
                date(2024, 1, 3),
            ))
            .with_visit(ScheduledVisit::pending(VisitType::Scheduled, date(2024, 2, 1)));

        let context = LabelContext::from_history(&history, date(2024, 3, 1));
        assert_eq!(context.weeks, 4);
        assert_eq!(context.last_dose, Some(date(2024, 1, 2)));
        assert_eq!(context.community.as_deref(), Some("Maluana"));
    }
}
