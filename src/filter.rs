//! Departure filtering by vehicle type, line number and direction.

use serde::Serialize;

use crate::departures::DepartureRecord;

pub const VEHICLE_TYPE_TRAM: &str = "Straßenbahn";
pub const VEHICLE_TYPE_BUS: &str = "Bus";
pub const VEHICLE_TYPE_REGIONAL_BUS: &str = "Regionalbus";
pub const VEHICLE_TYPE_NIGHT_BUS: &str = "Nachtbus";
pub const VEHICLE_TYPE_REPLACEMENT: &str = "Ersatzverkehr";
pub const VEHICLE_TYPE_S_BAHN: &str = "S-Bahn";
pub const VEHICLE_TYPE_U_BAHN: &str = "U-Bahn";

/// Vehicle category labels used by the VVM deployment.
pub const KNOWN_VEHICLE_TYPES: [&str; 7] = [
    VEHICLE_TYPE_TRAM,
    VEHICLE_TYPE_BUS,
    VEHICLE_TYPE_REGIONAL_BUS,
    VEHICLE_TYPE_NIGHT_BUS,
    VEHICLE_TYPE_REPLACEMENT,
    VEHICLE_TYPE_S_BAHN,
    VEHICLE_TYPE_U_BAHN,
];

/// Conjunctive departure filter. An empty dimension leaves that dimension
/// unconstrained, so the default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepartureFilter {
    /// Vehicle category labels, matched exactly and case-sensitive.
    vehicle_types: Vec<String>,
    /// Line numbers, stored lower-case and trimmed.
    line_numbers: Vec<String>,
    /// Destination substrings, stored lower-case and trimmed.
    directions: Vec<String>,
}

/// Parse a comma-separated filter string into normalized elements.
/// `""` and `"*"` mean match-all and yield an empty list.
fn parse_filter_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "*" {
        return Vec::new();
    }
    raw.split(',')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

impl DepartureFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vehicle_types(&self) -> &[String] {
        &self.vehicle_types
    }

    pub fn line_numbers(&self) -> &[String] {
        &self.line_numbers
    }

    pub fn directions(&self) -> &[String] {
        &self.directions
    }

    /// Replace the vehicle-type dimension. Labels are taken as-is since
    /// matching against them is case-sensitive.
    pub fn set_vehicle_types(&mut self, types: Vec<String>) {
        self.vehicle_types = types;
    }

    pub fn set_line_numbers(&mut self, raw: &str) {
        self.line_numbers = parse_filter_list(raw);
    }

    pub fn set_directions(&mut self, raw: &str) {
        self.directions = parse_filter_list(raw);
    }

    /// Comma-joined line numbers, the text form shown to users.
    pub fn line_numbers_text(&self) -> String {
        self.line_numbers.join(",")
    }

    /// Comma-joined direction substrings.
    pub fn directions_text(&self) -> String {
        self.directions.join(",")
    }

    /// Whether departures of the given vehicle type pass the type
    /// dimension. True for every type while the dimension is empty.
    pub fn vehicle_type_enabled(&self, vehicle_type: &str) -> bool {
        if self.vehicle_types.is_empty() {
            return true;
        }
        let target = vehicle_type.to_lowercase();
        self.vehicle_types.iter().any(|t| t.to_lowercase() == target)
    }

    pub fn enable_vehicle_type(&mut self, vehicle_type: &str) {
        if !self.vehicle_type_enabled(vehicle_type) {
            self.vehicle_types.push(vehicle_type.to_string());
        }
    }

    /// Disable one vehicle type. An empty dimension means all types are
    /// enabled, so it first expands to the full known catalog before the
    /// type is removed.
    pub fn disable_vehicle_type(&mut self, vehicle_type: &str) {
        if self.vehicle_types.is_empty() {
            self.vehicle_types = KNOWN_VEHICLE_TYPES.iter().map(|t| t.to_string()).collect();
        }
        let target = vehicle_type.to_lowercase();
        self.vehicle_types.retain(|t| t.to_lowercase() != target);
    }

    /// Whether a departure passes all three dimensions.
    pub fn matches(&self, departure: &DepartureRecord) -> bool {
        if !self.vehicle_types.is_empty()
            && !self.vehicle_types.iter().any(|t| t == &departure.vehicle_type)
        {
            return false;
        }

        if !self.line_numbers.is_empty() {
            let number = departure.line_number.to_lowercase();
            if !self.line_numbers.iter().any(|n| n == &number) {
                return false;
            }
        }

        if !self.directions.is_empty() {
            let destination = departure.destination.to_lowercase();
            if !self.directions.iter().any(|d| destination.contains(d.as_str())) {
                return false;
            }
        }

        true
    }

    /// Keep the matching departures, preserving order.
    pub fn apply(&self, departures: Vec<DepartureRecord>) -> Vec<DepartureRecord> {
        departures.into_iter().filter(|d| self.matches(d)).collect()
    }
}
