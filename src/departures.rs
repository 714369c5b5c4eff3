//! Departure extraction and stop-id validation on top of the EFA client.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::efa::response::DepartureMonitorResponse;
use crate::efa::{EfaClient, EfaError};

/// Placeholder for missing line labels.
pub const UNKNOWN_LINE_FIELD: &str = "???";

/// One upcoming departure inside the monitored time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartureRecord {
    /// Minutes until departure as reported by the provider, never negative.
    pub minutes_left: u32,
    /// Real-time delay in minutes, 0 when the trip has no live data.
    pub delay_minutes: i64,
    /// Vehicle category label (e.g. "Bus", "Straßenbahn").
    pub vehicle_type: String,
    pub line_number: String,
    pub destination: String,
    pub origin: String,
    /// Nominal departure time, provider local.
    pub scheduled: NaiveDateTime,
    /// Expected departure time; equals `scheduled` when no live data exists.
    pub actual: NaiveDateTime,
}

impl DepartureRecord {
    /// Nominal time as zero-padded `HH:MM`.
    pub fn scheduled_display(&self) -> String {
        self.scheduled.format("%H:%M").to_string()
    }

    /// Expected time as zero-padded `HH:MM`.
    pub fn actual_display(&self) -> String {
        self.actual.format("%H:%M").to_string()
    }
}

/// Extract the departures within `time_window_minutes` from a monitor
/// response, preserving provider order.
///
/// Entries are skipped when they lack a parseable countdown, a
/// destination, an origin or a nominal date/time. Missing delay falls
/// back to 0, missing line labels to [`UNKNOWN_LINE_FIELD`], a missing
/// real-time block to the nominal time.
pub fn parse_departures(
    response: &DepartureMonitorResponse,
    time_window_minutes: u32,
) -> Vec<DepartureRecord> {
    let mut records = Vec::new();

    for raw in response.departures() {
        let countdown = match raw.countdown_minutes() {
            Some(c) => c,
            None => continue,
        };
        if countdown >= time_window_minutes as i64 {
            continue;
        }

        let destination = match raw.destination() {
            Some(d) => d.to_string(),
            None => continue,
        };
        let origin = match raw.origin() {
            Some(o) => o.to_string(),
            None => continue,
        };
        let scheduled = match raw.scheduled_time() {
            Some(t) => t,
            None => continue,
        };

        records.push(DepartureRecord {
            // Trips already at the platform can report a negative countdown.
            minutes_left: countdown.max(0) as u32,
            delay_minutes: raw.delay_minutes().unwrap_or(0),
            vehicle_type: raw.vehicle_type().unwrap_or(UNKNOWN_LINE_FIELD).to_string(),
            line_number: raw.line_number().unwrap_or(UNKNOWN_LINE_FIELD).to_string(),
            destination,
            origin,
            scheduled,
            actual: raw.actual_time().unwrap_or(scheduled),
        });
    }

    records
}

/// Fetch and extract the departures for a stop.
pub async fn fetch_departures(
    client: &EfaClient,
    stop_id: &str,
    time_window_minutes: u32,
) -> Result<Vec<DepartureRecord>, EfaError> {
    let response = client.departure_monitor(stop_id).await?;
    let records = parse_departures(&response, time_window_minutes);
    debug!(stop_id = %stop_id, count = records.len(), "Parsed departures");
    Ok(records)
}

/// Outcome of probing a stop id against the departure monitor.
#[derive(Debug, Clone, PartialEq)]
pub enum StopValidation {
    Valid {
        /// Resolved stop name when the provider echoed one.
        stop_name: Option<String>,
    },
    Invalid {
        /// Provider error code from the message block, e.g. -2000.
        code: Option<i64>,
        message: Option<String>,
    },
}

impl StopValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, StopValidation::Valid { .. })
    }
}

/// Check whether a stop id resolves by requesting its departure monitor.
pub async fn validate_stop_id(client: &EfaClient, stop_id: &str) -> StopValidation {
    match client.departure_monitor(stop_id).await {
        Ok(response) => validation_from_response(&response),
        Err(e) => StopValidation::Invalid {
            code: None,
            message: Some(e.to_string()),
        },
    }
}

fn validation_from_response(response: &DepartureMonitorResponse) -> StopValidation {
    if response.has_departures() {
        return StopValidation::Valid {
            stop_name: response.stop_name().map(str::to_string),
        };
    }

    match &response.dm {
        Some(dm) => StopValidation::Invalid {
            code: dm.message_code(),
            message: dm.message_error().map(str::to_string),
        },
        None => StopValidation::Invalid {
            code: None,
            message: None,
        },
    }
}
