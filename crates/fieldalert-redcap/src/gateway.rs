//! [`RecordGateway`] over one REDCap project

use crate::client::{ExportRequest, RedcapApi, RedcapClient, Row, EVENT_COLUMN};
use crate::decode::{decode_history, enrollment, stored_flag};
use crate::label::{parse_choices, LabelContext};
use crate::{FieldMap, LabelCodec, ProjectConfig, RedcapConfig, RedcapError};
use chrono::NaiveDate;
use fieldalert_domain::{
    describe_flag, AlertUpdate, GatewayError, ParticipantHistory, ParticipantId, RecordGateway,
    StoredFlag,
};
use std::collections::{BTreeMap, HashMap};

/// REDCap-backed record gateway
///
/// Labels written to the alert field are rendered from the history re-read at
/// write time, as of the day given at construction.
pub struct RedcapGateway<A: RedcapApi = RedcapClient> {
    api: A,
    project: String,
    fields: FieldMap,
    codec: LabelCodec,
    communities: HashMap<String, String>,
    as_of: NaiveDate,
}

impl RedcapGateway<RedcapClient> {
    /// Connect to one configured project over HTTP
    pub fn for_project(
        config: &RedcapConfig,
        project: &ProjectConfig,
        as_of: NaiveDate,
    ) -> Result<Self, RedcapError> {
        let token = project.resolve_token()?;
        let client = RedcapClient::new(&config.url, token, config.timeout())?;
        Self::connect(client, config, &project.name, as_of)
    }
}

impl<A: RedcapApi> RedcapGateway<A> {
    /// Wrap an API and load the community names of the project
    pub fn connect(
        api: A,
        config: &RedcapConfig,
        project: &str,
        as_of: NaiveDate,
    ) -> Result<Self, RedcapError> {
        let labels = &config.labels;
        let communities = api
            .export_field_choices(&config.fields.community_field)?
            .map(|choices| parse_choices(&choices, &labels.choice_sep, &labels.code_sep))
            .unwrap_or_default();

        tracing::debug!(
            "Project {}: {} communities in data dictionary",
            project,
            communities.len()
        );

        Ok(Self {
            api,
            project: project.to_string(),
            fields: config.fields.clone(),
            codec: LabelCodec::new(config.labels.clone()),
            communities,
            as_of,
        })
    }

    /// Project name
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Underlying API
    pub fn api(&self) -> &A {
        &self.api
    }

    fn record_rows(&self, id: &ParticipantId) -> Result<Vec<Row>, RedcapError> {
        self.api.export_records(&ExportRequest {
            records: vec![id.as_str().to_string()],
            fields: self.fields.history_fields(),
            events: Vec::new(),
        })
    }

    fn history(&self, id: &ParticipantId) -> Result<ParticipantHistory, GatewayError> {
        let rows = self.record_rows(id)?;
        if rows.is_empty() {
            return Err(GatewayError::NotFound(id.clone()));
        }
        Ok(decode_history(
            id.as_str(),
            &rows,
            &self.fields,
            &self.codec,
            &self.communities,
        )?)
    }
}

impl<A: RedcapApi> RecordGateway for RedcapGateway<A> {
    fn list_active_participants(&self) -> Result<Vec<ParticipantId>, GatewayError> {
        let rows = self.api.export_records(&ExportRequest {
            records: Vec::new(),
            fields: self.fields.listing_fields(),
            events: Vec::new(),
        })?;

        let mut by_record: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        for row in rows {
            if let Some(id) = row.get(&self.fields.record_id).cloned() {
                by_record.entry(id).or_default().push(row);
            }
        }

        let ids: Vec<ParticipantId> = by_record
            .into_iter()
            .filter(|(_, rows)| {
                enrollment(rows, &self.fields).is_active()
                    || matches!(
                        stored_flag(rows, &self.fields, &self.codec),
                        StoredFlag::Managed(Some(_))
                    )
            })
            .map(|(id, _)| ParticipantId::new(id))
            .collect();

        tracing::info!("Project {}: {} participants to sweep", self.project, ids.len());
        Ok(ids)
    }

    fn fetch_participant_history(
        &self,
        id: &ParticipantId,
    ) -> Result<ParticipantHistory, GatewayError> {
        self.history(id)
    }

    fn update_alert_flag(&mut self, update: &AlertUpdate) -> Result<(), GatewayError> {
        let id = &update.participant_id;

        // REDCap has no conditional write: re-read right before importing
        let history = self.history(id)?;
        match &history.stored_flag {
            StoredFlag::Managed(current) if *current == update.expected_previous => {}
            StoredFlag::Managed(current) => {
                return Err(GatewayError::Conflict {
                    participant: id.clone(),
                    expected: describe_flag(update.expected_previous),
                    found: describe_flag(*current),
                });
            }
            StoredFlag::Custom(value) => {
                return Err(GatewayError::Conflict {
                    participant: id.clone(),
                    expected: describe_flag(update.expected_previous),
                    found: value.clone(),
                });
            }
        }

        let label = match update.new_value {
            Some(kind) => self
                .codec
                .render(kind, &LabelContext::from_history(&history, self.as_of)),
            None => String::new(),
        };

        let row = Row::from([
            (self.fields.record_id.clone(), id.as_str().to_string()),
            (EVENT_COLUMN.to_string(), self.fields.alert_event.clone()),
            (self.fields.alert_field.clone(), label.clone()),
        ]);

        let imported = self.api.import_records(&[row])?;
        if imported == 0 {
            return Err(GatewayError::NotFound(id.clone()));
        }

        tracing::debug!("Project {}: {} <- {:?}", self.project, id, label);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LabelConfig;
    use fieldalert_domain::AlertKind;
    use std::cell::RefCell;

    /// Canned API: serves rows from memory and records imports
    #[derive(Default)]
    struct FakeApi {
        rows: RefCell<Vec<Row>>,
        imports: RefCell<Vec<Row>>,
    }

    impl FakeApi {
        fn with_rows(rows: Vec<Row>) -> Self {
            Self {
                rows: RefCell::new(rows),
                imports: RefCell::default(),
            }
        }
    }

    impl RedcapApi for FakeApi {
        fn export_records(&self, request: &ExportRequest) -> Result<Vec<Row>, RedcapError> {
            Ok(self
                .rows
                .borrow()
                .iter()
                .filter(|row| {
                    request.records.is_empty() || request.records.contains(&row["record_id"])
                })
                .cloned()
                .collect())
        }

        fn export_field_choices(&self, _field: &str) -> Result<Option<String>, RedcapError> {
            Ok(Some("1, Maluana | 2, Taninga".to_string()))
        }

        fn import_records(&self, rows: &[Row]) -> Result<usize, RedcapError> {
            let mut stored = self.rows.borrow_mut();
            for import in rows {
                if let Some(target) = stored.iter_mut().find(|r| {
                    r["record_id"] == import["record_id"]
                        && r["redcap_event_name"] == import["redcap_event_name"]
                }) {
                    target.insert(
                        "child_fu_status".to_string(),
                        import["child_fu_status"].clone(),
                    );
                }
            }
            self.imports.borrow_mut().extend(rows.iter().cloned());
            Ok(rows.len())
        }
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn config() -> RedcapConfig {
        RedcapConfig {
            url: "https://redcap.example.org/api/".to_string(),
            timeout_secs: 30,
            fields: FieldMap::default(),
            labels: LabelConfig::default(),
            projects: Vec::new(),
        }
    }

    fn gateway(rows: Vec<Row>) -> RedcapGateway<FakeApi> {
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        RedcapGateway::connect(FakeApi::with_rows(rows), &config(), "HF01", as_of).unwrap()
    }

    fn dosed(record: &str, status: &str) -> Row {
        row(&[
            ("record_id", record),
            ("redcap_event_name", "epipenta1_v0_recru_arm_1"),
            ("redcap_repeat_instrument", ""),
            ("community", "1"),
            ("int_azi", "1"),
            ("int_date", "2024-01-10"),
            ("int_next_visit", "2024-02-07"),
            ("child_fu_status", status),
            ("wdrawal_date", ""),
        ])
    }

    #[test]
    fn test_listing_skips_inactive_without_alert() {
        let withdrawn_clean = row(&[
            ("record_id", "2"),
            ("redcap_event_name", "withdrawal_arm_1"),
            ("wdrawal_date", "2024-01-01"),
        ]);
        let withdrawn_alerted = row(&[
            ("record_id", "3"),
            ("redcap_event_name", "withdrawal_arm_1"),
            ("wdrawal_date", "2024-01-01"),
        ]);
        let gateway = gateway(vec![
            dosed("1", ""),
            withdrawn_clean,
            dosed("3", "NC@Maluana (5 weeks)"),
            withdrawn_alerted,
        ]);

        let ids = gateway.list_active_participants().unwrap();
        assert_eq!(ids, vec![ParticipantId::new("1"), ParticipantId::new("3")]);
    }

    #[test]
    fn test_fetch_resolves_community() {
        let gateway = gateway(vec![dosed("1", "")]);
        let history = gateway
            .fetch_participant_history(&ParticipantId::new("1"))
            .unwrap();
        assert_eq!(history.community.as_deref(), Some("Maluana"));
        assert_eq!(history.stored_flag, StoredFlag::Managed(None));
    }

    #[test]
    fn test_fetch_unknown_record() {
        let gateway = gateway(vec![dosed("1", "")]);
        assert!(matches!(
            gateway.fetch_participant_history(&ParticipantId::new("99")),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_imports_only_alert_field() {
        let mut gateway = gateway(vec![dosed("1", "")]);
        gateway
            .update_alert_flag(&AlertUpdate {
                participant_id: ParticipantId::new("1"),
                new_value: Some(AlertKind::HouseholdVisit),
                expected_previous: None,
            })
            .unwrap();

        let imports = gateway.api().imports.borrow();
        assert_eq!(imports.len(), 1);
        let keys: Vec<&str> = imports[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["child_fu_status", "record_id", "redcap_event_name"]);
        assert_eq!(imports[0]["child_fu_status"], "TBV@Maluana AZi/Pbo@Jan 10");
    }

    #[test]
    fn test_clear_writes_blank_label() {
        let mut gateway = gateway(vec![dosed("1", "TBV@Maluana AZi/Pbo@Jan 10")]);
        gateway
            .update_alert_flag(&AlertUpdate {
                participant_id: ParticipantId::new("1"),
                new_value: None,
                expected_previous: Some(AlertKind::HouseholdVisit),
            })
            .unwrap();
        assert_eq!(gateway.api().imports.borrow()[0]["child_fu_status"], "");
    }

    #[test]
    fn test_update_conflicts_when_flag_changed() {
        let mut gateway = gateway(vec![dosed("1", "Refused visit")]);
        let err = gateway
            .update_alert_flag(&AlertUpdate {
                participant_id: ParticipantId::new("1"),
                new_value: Some(AlertKind::HouseholdVisit),
                expected_previous: None,
            })
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict { .. }));
        assert!(gateway.api().imports.borrow().is_empty());
    }
}
