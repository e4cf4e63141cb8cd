//! REDCap connection settings and data dictionary mapping

use crate::RedcapError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// REDCap gateway configuration
///
/// One API URL shared by every project; each project (health facility) has
/// its own token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedcapConfig {
    /// API endpoint, e.g. `https://redcap.example.org/api/`
    pub url: String,

    /// Per-request timeout in seconds
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Field and event names of the data dictionary
    #[serde(default)]
    pub fields: FieldMap,

    /// Alert label templates
    #[serde(default)]
    pub labels: LabelConfig,

    /// Projects to sweep, in order
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl RedcapConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Look up a project by name
    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Check the settings that can be checked without network access
    pub fn validate(&self) -> Result<(), RedcapError> {
        if self.url.trim().is_empty() {
            return Err(RedcapError::Config("redcap.url is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(RedcapError::Config(
                "redcap.timeout_secs must be positive".to_string(),
            ));
        }
        if self.fields.dose_events.is_empty() {
            return Err(RedcapError::Config(
                "redcap.fields.dose_events must list at least one event".to_string(),
            ));
        }
        for project in &self.projects {
            if project.token.is_none() && project.token_env.is_none() {
                return Err(RedcapError::Config(format!(
                    "project '{}' needs either token or token_env",
                    project.name
                )));
            }
        }
        Ok(())
    }
}

/// One REDCap project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Display name (usually the health facility code)
    pub name: String,

    /// API token, inline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Name of an environment variable holding the API token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl ProjectConfig {
    /// Resolve the API token; an inline token wins over `token_env`
    pub fn resolve_token(&self) -> Result<String, RedcapError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let var = self.token_env.as_deref().ok_or_else(|| {
            RedcapError::Config(format!("project '{}' has no token", self.name))
        })?;
        std::env::var(var).map_err(|_| {
            RedcapError::Config(format!(
                "environment variable {} (token of project '{}') is not set",
                var, self.name
            ))
        })
    }
}

/// Where each piece of a participant history lives in the project
///
/// Defaults match the trial's data dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    /// Record identifier field
    pub record_id: String,

    /// Field holding the alert label
    pub alert_field: String,

    /// Event the alert field belongs to
    pub alert_event: String,

    /// Community code field (choices resolved from the data dictionary)
    pub community_field: String,

    /// Set to `"1"` when a study dose was given at the visit
    pub dose_flag_field: String,

    /// Date of an intervention visit
    pub visit_date_field: String,

    /// Return date agreed at an intervention visit
    pub next_visit_field: String,

    /// Dosing events, in schedule order; the position gives the dose sequence
    pub dose_events: Vec<String>,

    /// Repeating instrument of household follow-ups
    pub household_instrument: String,

    /// Date of a household follow-up
    pub household_date_field: String,

    /// Set to `"1"` when the field worker saw the child
    pub household_seen_field: String,

    /// How the follow-up was made (`"1"` = phone call)
    pub household_type_field: String,

    /// Set to `"1"` when the phone call reached the caretaker
    pub phone_success_field: String,

    /// Set to `"1"` when the caretaker reported a drug reaction
    pub drug_reaction_field: String,

    /// Set to `"1"` when the caretaker reported a health complaint
    pub health_complaint_field: String,

    /// Date of a non-compliance visit
    pub non_compliance_date_field: String,

    /// Non-empty once the participant withdrew
    pub withdrawal_field: String,

    /// Last event of the dosing schedule
    pub epi_complete_event: String,

    /// Form status field of that event (`"2"` = complete); once complete no
    /// further return visit is expected
    pub epi_complete_field: String,

    /// Event of the end-of-follow-up household visit; seeing the child there
    /// ends follow-up
    pub end_of_follow_up_event: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            record_id: "record_id".to_string(),
            alert_field: "child_fu_status".to_string(),
            alert_event: "epipenta1_v0_recru_arm_1".to_string(),
            community_field: "community".to_string(),
            dose_flag_field: "int_azi".to_string(),
            visit_date_field: "int_date".to_string(),
            next_visit_field: "int_next_visit".to_string(),
            dose_events: vec![
                "epipenta1_v0_recru_arm_1".to_string(),
                "epipenta2_v1_iptis_arm_1".to_string(),
                "epipenta3_v2_iptis_arm_1".to_string(),
                "epimvr1_v4_iptisp4_arm_1".to_string(),
                "epimvr2_v6_iptisp6_arm_1".to_string(),
            ],
            household_instrument: "household_follow_up".to_string(),
            household_date_field: "hh_date".to_string(),
            household_seen_field: "hh_child_seen".to_string(),
            household_type_field: "fu_type".to_string(),
            phone_success_field: "phone_success".to_string(),
            drug_reaction_field: "hh_drug_react".to_string(),
            health_complaint_field: "hh_health_complaint".to_string(),
            non_compliance_date_field: "comp_date".to_string(),
            withdrawal_field: "wdrawal_date".to_string(),
            epi_complete_event: "epimvr2_v6_iptisp6_arm_1".to_string(),
            epi_complete_field: "intervention_complete".to_string(),
            end_of_follow_up_event: "hhat_18th_month_of_arm_1".to_string(),
        }
    }
}

impl FieldMap {
    /// Fields exported to rebuild a participant history
    pub fn history_fields(&self) -> Vec<String> {
        vec![
            self.record_id.clone(),
            self.alert_field.clone(),
            self.community_field.clone(),
            self.dose_flag_field.clone(),
            self.visit_date_field.clone(),
            self.next_visit_field.clone(),
            self.household_date_field.clone(),
            self.household_seen_field.clone(),
            self.household_type_field.clone(),
            self.phone_success_field.clone(),
            self.drug_reaction_field.clone(),
            self.health_complaint_field.clone(),
            self.non_compliance_date_field.clone(),
            self.withdrawal_field.clone(),
            self.epi_complete_field.clone(),
        ]
    }

    /// Fields exported to decide which participants a run visits
    pub fn listing_fields(&self) -> Vec<String> {
        vec![
            self.record_id.clone(),
            self.alert_field.clone(),
            self.withdrawal_field.clone(),
            self.household_seen_field.clone(),
        ]
    }

    /// Dose sequence number of an event (1-based)
    pub fn dose_sequence(&self, event: &str) -> Option<u32> {
        self.dose_events
            .iter()
            .position(|e| e == event)
            .map(|i| i as u32 + 1)
    }
}

/// Alert label templates and REDCap choice separators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Prefix identifying household-visit labels
    pub household_prefix: String,

    /// Household label; placeholders `{community}` and `{last_dose}`
    pub household_template: String,

    /// Prefix identifying non-compliance labels
    pub non_compliant_prefix: String,

    /// Non-compliance label; placeholders `{community}` and `{weeks}`
    pub non_compliant_template: String,

    /// chrono format of `{last_dose}`
    pub date_format: String,

    /// Separator between choices in the data dictionary
    pub choice_sep: String,

    /// Separator between code and label of a choice
    pub code_sep: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            household_prefix: "TBV".to_string(),
            household_template: "TBV@{community} AZi/Pbo@{last_dose}".to_string(),
            non_compliant_prefix: "NC".to_string(),
            non_compliant_template: "NC@{community} ({weeks} weeks)".to_string(),
            date_format: "%b %d".to_string(),
            choice_sep: " | ".to_string(),
            code_sep: ", ".to_string(),
        }
    }
}
