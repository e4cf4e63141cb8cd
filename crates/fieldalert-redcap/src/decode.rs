//! Decoding flat REDCap rows into participant histories

use crate::client::{Row, EVENT_COLUMN, REPEAT_INSTRUMENT_COLUMN};
use crate::{FieldMap, LabelCodec, RedcapError};
use chrono::{NaiveDate, NaiveDateTime};
use fieldalert_domain::{
    DoseEvent, EnrollmentStatus, ParticipantHistory, ParticipantId, ScheduledVisit, StoredFlag,
    VisitType,
};
use std::collections::HashMap;

/// Form status value REDCap uses for "Complete"
const FORM_COMPLETE: &str = "2";

/// Checkbox/yes-no value for "yes"
const YES: &str = "1";

/// Follow-up type value for a phone call
const PHONE: &str = "1";

/// Non-empty, trimmed value of a field
fn value<'a>(row: &'a Row, field: &str) -> Option<&'a str> {
    row.get(field).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn event(row: &Row) -> &str {
    value(row, EVENT_COLUMN).unwrap_or_default()
}

fn is_repeat_of(row: &Row, instrument: &str) -> bool {
    value(row, REPEAT_INSTRUMENT_COLUMN) == Some(instrument)
}

/// Parse a REDCap date or datetime (`2024-03-04` or `2024-03-04 10:15[:00]`)
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
                .ok()
                .map(|dt| dt.date())
        })
}

fn date_field(row: &Row, field: &str, record: &str) -> Result<Option<NaiveDate>, RedcapError> {
    match value(row, field) {
        None => Ok(None),
        Some(raw) => parse_date(raw).map(Some).ok_or_else(|| {
            RedcapError::malformed(
                record,
                format!("{} = {:?} at {} is not a date", field, raw, event(row)),
            )
        }),
    }
}

/// Value of the alert field, read from the alert event
pub fn stored_flag(rows: &[Row], fields: &FieldMap, codec: &LabelCodec) -> StoredFlag {
    rows.iter()
        .filter(|row| event(row) == fields.alert_event && value(row, REPEAT_INSTRUMENT_COLUMN).is_none())
        .find_map(|row| value(row, &fields.alert_field))
        .map(|raw| codec.parse(raw))
        .unwrap_or_else(StoredFlag::empty)
}

/// Enrollment status: withdrawal wins over completion
///
/// Follow-up ends when the child is seen at the end-of-follow-up household
/// visit. Finishing the dosing schedule does not end it.
pub fn enrollment(rows: &[Row], fields: &FieldMap) -> EnrollmentStatus {
    if rows.iter().any(|row| value(row, &fields.withdrawal_field).is_some()) {
        return EnrollmentStatus::Withdrawn;
    }
    let completed = rows.iter().any(|row| {
        event(row) == fields.end_of_follow_up_event
            && value(row, &fields.household_seen_field) == Some(YES)
    });
    if completed {
        EnrollmentStatus::Completed
    } else {
        EnrollmentStatus::Active
    }
}

/// Whether the form of the last dosing event is complete
pub fn epi_complete(rows: &[Row], fields: &FieldMap) -> bool {
    rows.iter().any(|row| {
        event(row) == fields.epi_complete_event
            && value(row, &fields.epi_complete_field) == Some(FORM_COMPLETE)
    })
}

/// Whether a household follow-up counts as the post-dose check
///
/// A home visit counts when the child was seen. A phone call counts when it
/// reached the caretaker and no drug reaction or health complaint came up.
fn follow_up_reached_child(row: &Row, fields: &FieldMap) -> bool {
    if value(row, &fields.household_seen_field) == Some(YES) {
        return true;
    }
    value(row, &fields.household_type_field) == Some(PHONE)
        && value(row, &fields.phone_success_field) == Some(YES)
        && value(row, &fields.drug_reaction_field) != Some(YES)
        && value(row, &fields.health_complaint_field) != Some(YES)
}

/// Rebuild the history of one record from its rows
///
/// # Errors
///
/// [`RedcapError::Malformed`] when a date does not parse or a dose is
/// recorded at an event outside the dosing schedule.
pub fn decode_history(
    record: &str,
    rows: &[Row],
    fields: &FieldMap,
    codec: &LabelCodec,
    communities: &HashMap<String, String>,
) -> Result<ParticipantHistory, RedcapError> {
    let mut history = ParticipantHistory::new(ParticipantId::new(record))
        .with_enrollment(enrollment(rows, fields))
        .with_flag(stored_flag(rows, fields, codec));

    history.community = rows
        .iter()
        .find_map(|row| value(row, &fields.community_field))
        .map(|code| communities.get(code).cloned().unwrap_or_else(|| code.to_string()));

    let interventions: Vec<&Row> = rows
        .iter()
        .filter(|row| value(row, REPEAT_INSTRUMENT_COLUMN).is_none())
        .collect();

    let mut visit_dates = Vec::new();
    for row in &interventions {
        if let Some(date) = date_field(row, &fields.visit_date_field, record)? {
            visit_dates.push(date);
        }
    }
    visit_dates.sort();
    // no return visit is expected after the last dosing event
    let schedule_done = epi_complete(rows, fields);

    for row in &interventions {
        if value(row, &fields.dose_flag_field) == Some(YES) {
            let sequence = fields.dose_sequence(event(row)).ok_or_else(|| {
                RedcapError::malformed(
                    record,
                    format!("dose recorded at {}, which is not a dosing event", event(row)),
                )
            })?;
            history.doses.push(DoseEvent {
                sequence,
                administered_on: date_field(row, &fields.visit_date_field, record)?,
            });
        }

        if let Some(scheduled_on) = date_field(row, &fields.next_visit_field, record)? {
            let visited_on = date_field(row, &fields.visit_date_field, record)?;
            // the return visit happened if any later intervention visit exists
            let returned_on = visited_on
                .and_then(|visited| visit_dates.iter().copied().find(|d| *d > visited));
            match returned_on {
                Some(done) => history
                    .visits
                    .push(ScheduledVisit::done(VisitType::Scheduled, scheduled_on, done)),
                None if schedule_done => {}
                None => history
                    .visits
                    .push(ScheduledVisit::pending(VisitType::Scheduled, scheduled_on)),
            }
        }
    }

    for row in rows {
        if is_repeat_of(row, &fields.household_instrument) && follow_up_reached_child(row, fields) {
            if let Some(date) = date_field(row, &fields.household_date_field, record)? {
                history
                    .visits
                    .push(ScheduledVisit::done(VisitType::PostDoseCheck, date, date));
            }
        }

        if let Some(date) = date_field(row, &fields.non_compliance_date_field, record)? {
            history
                .visits
                .push(ScheduledVisit::done(VisitType::NonComplianceCheck, date, date));
        }
    }

    Ok(history)
}
