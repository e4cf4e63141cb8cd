//! REDCap API client

use crate::RedcapError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// One row of a flat REDCap export: field name -> raw value
pub type Row = BTreeMap<String, String>;

/// Column REDCap adds to every row of a longitudinal project
pub const EVENT_COLUMN: &str = "redcap_event_name";

/// Column REDCap adds to rows of repeating instruments
pub const REPEAT_INSTRUMENT_COLUMN: &str = "redcap_repeat_instrument";

/// Selection for a record export; empty lists mean "all"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRequest {
    /// Record identifiers
    pub records: Vec<String>,
    /// Field names
    pub fields: Vec<String>,
    /// Event names
    pub events: Vec<String>,
}

/// The three API calls the gateway needs
///
/// Implemented by [`RedcapClient`] over HTTP and by fakes in tests.
pub trait RedcapApi {
    /// Export records as flat rows (one per record, event and repeat instance)
    fn export_records(&self, request: &ExportRequest) -> Result<Vec<Row>, RedcapError>;

    /// Choice list of a categorical field from the data dictionary
    fn export_field_choices(&self, field: &str) -> Result<Option<String>, RedcapError>;

    /// Import rows, overwriting the given fields (blank values included)
    ///
    /// Returns the number of records REDCap reports as imported.
    fn import_records(&self, rows: &[Row]) -> Result<usize, RedcapError>;
}

/// Blocking HTTP client for one REDCap project
pub struct RedcapClient {
    http: reqwest::blocking::Client,
    url: String,
    token: String,
}

impl RedcapClient {
    /// Create a client with a per-request timeout
    pub fn new(url: &str, token: String, timeout: Duration) -> Result<Self, RedcapError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            token,
        })
    }

    /// POST an API request and return the body of a successful response
    fn post(&self, mut params: Vec<(String, String)>) -> Result<String, RedcapError> {
        params.push(("token".to_string(), self.token.clone()));
        params.push(("format".to_string(), "json".to_string()));
        params.push(("returnFormat".to_string(), "json".to_string()));

        let response = self.http.post(&self.url).form(&params).send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(RedcapError::from_status(status.as_u16(), &body));
        }
        Ok(body)
    }
}

impl RedcapApi for RedcapClient {
    fn export_records(&self, request: &ExportRequest) -> Result<Vec<Row>, RedcapError> {
        let mut params = vec![
            ("content".to_string(), "record".to_string()),
            ("type".to_string(), "flat".to_string()),
            ("rawOrLabel".to_string(), "raw".to_string()),
        ];
        push_array(&mut params, "records", &request.records);
        push_array(&mut params, "fields", &request.fields);
        push_array(&mut params, "events", &request.events);

        let body = self.post(params)?;
        parse_rows(&body)
    }

    fn export_field_choices(&self, field: &str) -> Result<Option<String>, RedcapError> {
        let mut params = vec![("content".to_string(), "metadata".to_string())];
        push_array(&mut params, "fields", &[field.to_string()]);

        let body = self.post(params)?;
        let metadata: Vec<Value> = serde_json::from_str(&body)?;
        Ok(metadata
            .iter()
            .find(|m| m.get("field_name").and_then(Value::as_str) == Some(field))
            .and_then(|m| m.get("select_choices_or_calculations"))
            .and_then(Value::as_str)
            .filter(|choices| !choices.is_empty())
            .map(str::to_string))
    }

    fn import_records(&self, rows: &[Row]) -> Result<usize, RedcapError> {
        let params = vec![
            ("content".to_string(), "record".to_string()),
            ("type".to_string(), "flat".to_string()),
            ("overwriteBehavior".to_string(), "overwrite".to_string()),
            ("returnContent".to_string(), "count".to_string()),
            ("data".to_string(), serde_json::to_string(rows)?),
        ];

        let body = self.post(params)?;
        parse_import_count(&body)
    }
}

/// REDCap array parameters are sent as `name[0]=a&name[1]=b`
fn push_array(params: &mut Vec<(String, String)>, name: &str, values: &[String]) {
    for (i, value) in values.iter().enumerate() {
        params.push((format!("{}[{}]", name, i), value.clone()));
    }
}

/// Parse an export body into rows, stringifying non-string values
pub fn parse_rows(body: &str) -> Result<Vec<Row>, RedcapError> {
    let records: Vec<serde_json::Map<String, Value>> = serde_json::from_str(body)?;
    Ok(records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|(field, value)| {
                    let value = match value {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (field, value)
                })
                .collect()
        })
        .collect())
}

/// Parse the `{"count": n}` answer of an import
pub fn parse_import_count(body: &str) -> Result<usize, RedcapError> {
    let value: Value = serde_json::from_str(body)?;
    let count = value
        .get("count")
        .ok_or_else(|| RedcapError::Decode(format!("import answer without count: {}", body)))?;
    let parsed = match count {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| RedcapError::Decode(format!("invalid import count: {}", count)))
}
