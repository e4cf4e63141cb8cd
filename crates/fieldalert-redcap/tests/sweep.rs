//! Full sweeps through the REDCap gateway against a canned API

use chrono::NaiveDate;
use fieldalert_domain::AlertKind;
use fieldalert_redcap::client::{ExportRequest, Row};
use fieldalert_redcap::{FieldMap, LabelConfig, RedcapApi, RedcapConfig, RedcapError, RedcapGateway};
use fieldalert_rules::RuleConfig;
use fieldalert_sweeper::{CancelToken, SweepConfig, Sweeper};
use std::cell::{Cell, RefCell};

struct CannedApi {
    rows: RefCell<Vec<Row>>,
    imports: Cell<usize>,
}

impl RedcapApi for CannedApi {
    fn export_records(&self, request: &ExportRequest) -> Result<Vec<Row>, RedcapError> {
        Ok(self
            .rows
            .borrow()
            .iter()
            .filter(|row| request.records.is_empty() || request.records.contains(&row["record_id"]))
            .cloned()
            .collect())
    }

    fn export_field_choices(&self, _field: &str) -> Result<Option<String>, RedcapError> {
        Ok(Some("1, Maluana | 2, Taninga".to_string()))
    }

    fn import_records(&self, rows: &[Row]) -> Result<usize, RedcapError> {
        let mut stored = self.rows.borrow_mut();
        for import in rows {
            for row in stored.iter_mut().filter(|r| {
                r["record_id"] == import["record_id"]
                    && r["redcap_event_name"] == import["redcap_event_name"]
            }) {
                row.insert("child_fu_status".to_string(), import["child_fu_status"].clone());
            }
        }
        self.imports.set(self.imports.get() + rows.len());
        Ok(rows.len())
    }
}

fn row(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn project_rows() -> Vec<Row> {
    vec![
        // dosed four days ago, no alert yet
        row(&[
            ("record_id", "1"),
            ("redcap_event_name", "epipenta1_v0_recru_arm_1"),
            ("community", "2"),
            ("int_azi", "1"),
            ("int_date", "2024-01-10 08:00:00"),
            ("int_next_visit", "2024-02-07"),
            ("child_fu_status", ""),
        ]),
        // flagged non-compliant, but came back the day after the return date
        row(&[
            ("record_id", "2"),
            ("redcap_event_name", "epipenta1_v0_recru_arm_1"),
            ("community", "1"),
            ("int_azi", "1"),
            ("int_date", "2023-11-01"),
            ("int_next_visit", "2023-12-01"),
            ("child_fu_status", "NC@Maluana (6 weeks)"),
        ]),
        row(&[
            ("record_id", "2"),
            ("redcap_event_name", "epipenta2_v1_iptis_arm_1"),
            ("int_azi", "0"),
            ("int_date", "2023-12-02"),
            ("int_next_visit", "2024-03-01"),
        ]),
        // staff note, never touched
        row(&[
            ("record_id", "3"),
            ("redcap_event_name", "epipenta1_v0_recru_arm_1"),
            ("community", "1"),
            ("int_azi", "1"),
            ("int_date", "2024-01-11"),
            ("child_fu_status", "Moved to Maputo"),
        ]),
    ]
}

fn alert_value(api: &CannedApi, record: &str) -> String {
    api.rows
        .borrow()
        .iter()
        .find(|r| r["record_id"] == record && r["redcap_event_name"] == "epipenta1_v0_recru_arm_1")
        .map(|r| r["child_fu_status"].clone())
        .unwrap_or_default()
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

fn gateway(rows: Vec<Row>, as_of: NaiveDate) -> RedcapGateway<CannedApi> {
    let api = CannedApi {
        rows: RefCell::new(rows),
        imports: Cell::new(0),
    };
    RedcapGateway::connect(api, &config(), "HF01", as_of).unwrap()
}

#[test]
fn sweep_sets_clears_and_settles() {
    let as_of = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
    let mut gateway = gateway(project_rows(), as_of);
    let sweeper = Sweeper::new(RuleConfig::default(), SweepConfig::default()).unwrap();

    let first = sweeper.run_once(&mut gateway, as_of, &CancelToken::new());
    assert!(first.failures.is_empty(), "{:?}", first.failures);
    assert_eq!(first.set_count(AlertKind::HouseholdVisit), 1);
    assert_eq!(first.cleared, 1);
    assert_eq!(first.skipped_custom, 1);
    assert_eq!(alert_value(gateway.api(), "1"), "TBV@Taninga AZi/Pbo@Jan 10");
    assert_eq!(alert_value(gateway.api(), "2"), "");
    assert_eq!(alert_value(gateway.api(), "3"), "Moved to Maputo");

    let second = sweeper.run_once(&mut gateway, as_of, &CancelToken::new());
    assert_eq!(second.total_writes(), 0);
    assert_eq!(gateway.api().imports.get(), 2);
}

#[test]
fn final_dose_raises_household_alert() {
    let rows = vec![
        row(&[
            ("record_id", "9"),
            ("redcap_event_name", "epipenta1_v0_recru_arm_1"),
            ("community", "1"),
            ("int_azi", "1"),
            ("int_date", "2024-01-01"),
            ("int_next_visit", "2024-02-01"),
            ("child_fu_status", ""),
        ]),
        // last dosing visit, form marked complete
        row(&[
            ("record_id", "9"),
            ("redcap_event_name", "epimvr2_v6_iptisp6_arm_1"),
            ("int_azi", "1"),
            ("int_date", "2024-06-01"),
            ("intervention_complete", "2"),
        ]),
    ];
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
    let mut gateway = gateway(rows, as_of);
    let sweeper = Sweeper::new(RuleConfig::default(), SweepConfig::default()).unwrap();

    let report = sweeper.run_once(&mut gateway, as_of, &CancelToken::new());
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.processed, 1);
    assert_eq!(report.set_count(AlertKind::HouseholdVisit), 1);
    assert_eq!(alert_value(gateway.api(), "9"), "TBV@Maluana AZi/Pbo@Jun 01");
}
