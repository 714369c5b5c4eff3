//! Per-stop monitoring state: poll cycle, filtered departures and the
//! nearest-departure summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::departures::{fetch_departures, DepartureRecord};
use crate::efa::EfaClient;
use crate::filter::DepartureFilter;

/// Fallback value for the nearest-departure fields while no departure is
/// known.
pub const UNKNOWN_NEAREST: &str = "Unknown";

/// Summary of the next upcoming departure after filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestDeparture {
    /// One-line form, e.g. `"(3 min) Bus 12 (Gerbrunn)"`.
    pub summary: String,
    pub minutes_left: u32,
    pub delay_minutes: i64,
    pub vehicle_type: String,
    pub line_number: String,
}

impl Default for NearestDeparture {
    fn default() -> Self {
        Self {
            summary: UNKNOWN_NEAREST.to_string(),
            minutes_left: 0,
            delay_minutes: 0,
            vehicle_type: UNKNOWN_NEAREST.to_string(),
            line_number: UNKNOWN_NEAREST.to_string(),
        }
    }
}

/// Summarize the first departure of an already filtered, nearest-first
/// list. Falls back to the `Unknown` defaults on an empty list.
pub fn summarize(departures: &[DepartureRecord]) -> NearestDeparture {
    match departures.first() {
        Some(nearest) => NearestDeparture {
            summary: format!(
                "({} min) {} {} ({})",
                nearest.minutes_left, nearest.vehicle_type, nearest.line_number, nearest.destination
            ),
            minutes_left: nearest.minutes_left,
            delay_minutes: nearest.delay_minutes,
            vehicle_type: nearest.vehicle_type.clone(),
            line_number: nearest.line_number.clone(),
        },
        None => NearestDeparture::default(),
    }
}

/// Monitoring state for one stop.
///
/// `poll` never fails: on a fetch error the previous departures stay
/// visible and the monitor is marked stale until the next success.
pub struct StopMonitor {
    client: EfaClient,
    stop_id: String,
    stop_name: String,
    time_window_minutes: u32,
    filters: DepartureFilter,
    departures: Vec<DepartureRecord>,
    nearest: NearestDeparture,
    is_stale: bool,
    last_error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
}

impl StopMonitor {
    pub fn new(
        client: EfaClient,
        stop_id: String,
        stop_name: String,
        time_window_minutes: u32,
    ) -> Self {
        Self {
            client,
            stop_id,
            stop_name,
            time_window_minutes,
            filters: DepartureFilter::new(),
            departures: Vec::new(),
            nearest: NearestDeparture::default(),
            is_stale: false,
            last_error: None,
            last_updated: None,
        }
    }

    pub fn stop_id(&self) -> &str {
        &self.stop_id
    }

    pub fn stop_name(&self) -> &str {
        &self.stop_name
    }

    pub fn time_window_minutes(&self) -> u32 {
        self.time_window_minutes
    }

    /// Change the time window for subsequent polls.
    pub fn set_time_window_minutes(&mut self, minutes: u32) {
        self.time_window_minutes = minutes;
    }

    pub fn filters(&self) -> &DepartureFilter {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut DepartureFilter {
        &mut self.filters
    }

    /// Filtered departures of the last successful poll, nearest first.
    pub fn departures(&self) -> &[DepartureRecord] {
        &self.departures
    }

    pub fn nearest(&self) -> &NearestDeparture {
        &self.nearest
    }

    /// True when the last poll failed and the data shown is from an
    /// earlier cycle.
    pub fn is_stale(&self) -> bool {
        self.is_stale
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Run one poll cycle: fetch, filter, sort, summarize.
    pub async fn poll(&mut self) {
        match fetch_departures(&self.client, &self.stop_id, self.time_window_minutes).await {
            Ok(departures) => self.apply_update(departures),
            Err(e) => self.apply_failure(e.to_string()),
        }
    }

    fn apply_update(&mut self, departures: Vec<DepartureRecord>) {
        let mut departures = self.filters.apply(departures);
        // Stable, so provider order survives among equal countdowns.
        departures.sort_by_key(|d| d.minutes_left);

        self.nearest = summarize(&departures);
        self.departures = departures;
        self.is_stale = false;
        self.last_error = None;
        self.last_updated = Some(Utc::now());

        debug!(
            stop_id = %self.stop_id,
            count = self.departures.len(),
            nearest = %self.nearest.summary,
            "Updated departures"
        );
    }

    fn apply_failure(&mut self, error: String) {
        warn!(
            stop_id = %self.stop_id,
            error = %error,
            "Failed to fetch departures, keeping existing data"
        );
        self.is_stale = true;
        self.last_error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(
        minutes_left: u32,
        vehicle_type: &str,
        line_number: &str,
        destination: &str,
    ) -> DepartureRecord {
        let scheduled = NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(14, 7, 0)
            .unwrap();
        DepartureRecord {
            minutes_left,
            delay_minutes: 1,
            vehicle_type: vehicle_type.to_string(),
            line_number: line_number.to_string(),
            destination: destination.to_string(),
            origin: "Würzburg Sanderau".to_string(),
            scheduled,
            actual: scheduled,
        }
    }

    fn test_monitor() -> StopMonitor {
        let client = EfaClient::with_base_url("http://127.0.0.1:1").unwrap();
        StopMonitor::new(
            client,
            "3700105".to_string(),
            "Würzburg, Hauptbahnhof".to_string(),
            15,
        )
    }

    #[test]
    fn test_summarize_first_departure() {
        let departures = vec![
            record(3, "Bus", "12", "Gerbrunn"),
            record(7, "Straßenbahn", "1", "Grombühl"),
        ];

        let nearest = summarize(&departures);
        assert_eq!(nearest.summary, "(3 min) Bus 12 (Gerbrunn)");
        assert_eq!(nearest.minutes_left, 3);
        assert_eq!(nearest.delay_minutes, 1);
        assert_eq!(nearest.vehicle_type, "Bus");
        assert_eq!(nearest.line_number, "12");
    }

    #[test]
    fn test_summarize_empty_list_falls_back() {
        let nearest = summarize(&[]);
        assert_eq!(nearest.summary, UNKNOWN_NEAREST);
        assert_eq!(nearest.minutes_left, 0);
        assert_eq!(nearest.delay_minutes, 0);
        assert_eq!(nearest.vehicle_type, UNKNOWN_NEAREST);
        assert_eq!(nearest.line_number, UNKNOWN_NEAREST);
    }

    #[test]
    fn test_new_monitor_starts_empty() {
        let monitor = test_monitor();
        assert_eq!(monitor.stop_id(), "3700105");
        assert_eq!(monitor.stop_name(), "Würzburg, Hauptbahnhof");
        assert_eq!(monitor.time_window_minutes(), 15);
        assert!(monitor.departures().is_empty());
        assert_eq!(monitor.nearest(), &NearestDeparture::default());
        assert!(!monitor.is_stale());
        assert_eq!(monitor.last_error(), None);
        assert_eq!(monitor.last_updated(), None);
    }

    #[test]
    fn test_time_window_can_be_changed() {
        let mut monitor = test_monitor();
        monitor.set_time_window_minutes(5);
        assert_eq!(monitor.time_window_minutes(), 5);
    }

    #[test]
    fn test_update_sorts_by_countdown() {
        let mut monitor = test_monitor();
        monitor.apply_update(vec![
            record(9, "Bus", "14", "Gerbrunn"),
            record(3, "Bus", "12", "Versbach"),
            record(6, "Straßenbahn", "1", "Grombühl"),
        ]);

        let minutes: Vec<u32> = monitor.departures().iter().map(|d| d.minutes_left).collect();
        assert_eq!(minutes, vec![3, 6, 9]);
        assert_eq!(monitor.nearest().summary, "(3 min) Bus 12 (Versbach)");
        assert!(monitor.last_updated().is_some());
    }

    #[test]
    fn test_update_applies_filters() {
        let mut monitor = test_monitor();
        monitor.filters_mut().set_vehicle_types(vec!["Straßenbahn".to_string()]);
        monitor.apply_update(vec![
            record(3, "Bus", "12", "Versbach"),
            record(6, "Straßenbahn", "1", "Grombühl"),
        ]);

        assert_eq!(monitor.departures().len(), 1);
        assert_eq!(monitor.nearest().summary, "(6 min) Straßenbahn 1 (Grombühl)");
    }

    #[test]
    fn test_failure_preserves_previous_data() {
        let mut monitor = test_monitor();
        monitor.apply_update(vec![record(3, "Bus", "12", "Gerbrunn")]);
        let updated_at = monitor.last_updated();

        monitor.apply_failure("Network error: timed out".to_string());

        assert!(monitor.is_stale());
        assert_eq!(monitor.last_error(), Some("Network error: timed out"));
        assert_eq!(monitor.departures().len(), 1);
        assert_eq!(monitor.nearest().summary, "(3 min) Bus 12 (Gerbrunn)");
        assert_eq!(monitor.last_updated(), updated_at);
    }

    #[test]
    fn test_success_clears_staleness() {
        let mut monitor = test_monitor();
        monitor.apply_failure("Network error: timed out".to_string());
        assert!(monitor.is_stale());

        monitor.apply_update(vec![record(2, "Bus", "14", "Gerbrunn")]);
        assert!(!monitor.is_stale());
        assert_eq!(monitor.last_error(), None);
    }

    #[tokio::test]
    async fn test_poll_failure_marks_stale_and_keeps_data() {
        let mut monitor = test_monitor();
        monitor.apply_update(vec![record(3, "Bus", "12", "Gerbrunn")]);

        // Port 1 refuses connections, so the poll fails fast.
        monitor.poll().await;

        assert!(monitor.is_stale());
        assert!(monitor.last_error().is_some());
        assert_eq!(monitor.departures().len(), 1);
    }
}
