//! Response models for the legacy EFA JSON format (`outputFormat=json`).
//!
//! The format predates rapidJSON-style EFA output: every scalar is a
//! string (`"countdown": "4"`), keys are omitted instead of being sent as
//! null or empty, and single-element collections collapse to a bare object.
//! All fields are therefore optional and numeric parsing happens in the
//! accessors, so extraction sites decide their own fallbacks.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Departure monitor (XML_DM_REQUEST)

/// Top-level payload of the departure monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartureMonitorResponse {
    /// Request echo block; carries the resolved stop point on a match and
    /// the provider's message entries (error code etc.) otherwise.
    pub dm: Option<DmBlock>,
    /// Upcoming departures. Absent or null when the stop id did not
    /// resolve or nothing is scheduled.
    #[serde(rename = "departureList")]
    pub departure_list: Option<Vec<RawDeparture>>,
}

impl DepartureMonitorResponse {
    pub fn departures(&self) -> &[RawDeparture] {
        self.departure_list.as_deref().unwrap_or_default()
    }

    pub fn has_departures(&self) -> bool {
        !self.departures().is_empty()
    }

    /// Display name of the stop the provider resolved the request to.
    pub fn stop_name(&self) -> Option<&str> {
        self.dm
            .as_ref()?
            .points
            .as_ref()?
            .first()?
            .name
            .as_deref()
    }
}

/// The `dm` request echo block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmBlock {
    pub points: Option<PointsBlock>,
    /// `{name, value}` entries; on unresolved stop ids these include a
    /// numeric `code` and an `error` text.
    pub message: Option<Vec<NameValue>>,
}

impl DmBlock {
    pub fn message_code(&self) -> Option<i64> {
        self.message_value("code")?.trim().parse().ok()
    }

    pub fn message_error(&self) -> Option<&str> {
        self.message_value("error")
    }

    fn message_value(&self, name: &str) -> Option<&str> {
        self.message
            .as_ref()?
            .iter()
            .find(|m| m.name.as_deref() == Some(name))?
            .value
            .as_deref()
    }
}

/// Point collection in one-or-many form: a unique match arrives as
/// `{"point": {...}}`, several candidates as a plain array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointsBlock {
    Unique { point: StopPoint },
    Multiple(Vec<StopPoint>),
}

impl PointsBlock {
    pub fn as_slice(&self) -> &[StopPoint] {
        match self {
            PointsBlock::Unique { point } => std::slice::from_ref(point),
            PointsBlock::Multiple(points) => points.as_slice(),
        }
    }

    pub fn first(&self) -> Option<&StopPoint> {
        self.as_slice().first()
    }
}

/// A stop candidate, shared between the stop finder and the departure
/// monitor echo block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopPoint {
    pub name: Option<String>,
    /// Stateless stop id, the identifier the departure monitor accepts.
    pub stateless: Option<String>,
    #[serde(rename = "type")]
    pub point_type: Option<String>,
    #[serde(rename = "anyType")]
    pub any_type: Option<String>,
}

impl StopPoint {
    /// Stop-finder results mix stops with streets, POIs and addresses;
    /// only generic points of type stop are usable monitor targets.
    pub fn is_stop(&self) -> bool {
        self.point_type.as_deref() == Some("any") && self.any_type.as_deref() == Some("stop")
    }
}

/// One entry of `departureList`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDeparture {
    #[serde(rename = "stopID")]
    pub stop_id: Option<String>,
    #[serde(rename = "platformName")]
    pub platform_name: Option<String>,
    pub countdown: Option<String>,
    /// Nominal departure time.
    #[serde(rename = "dateTime")]
    pub date_time: Option<EfaDateTime>,
    /// Real-time departure time; only present when the trip reports live
    /// data.
    #[serde(rename = "realDateTime")]
    pub real_date_time: Option<EfaDateTime>,
    #[serde(rename = "servingLine")]
    pub serving_line: Option<ServingLine>,
}

impl RawDeparture {
    /// Provider-reported minutes until departure, as of fetch time.
    pub fn countdown_minutes(&self) -> Option<i64> {
        self.countdown.as_deref()?.trim().parse().ok()
    }

    /// Real-time delay in minutes; only sent along with real-time data.
    pub fn delay_minutes(&self) -> Option<i64> {
        self.serving_line.as_ref()?.delay.as_deref()?.trim().parse().ok()
    }

    /// Line category label (e.g. "Bus", "Straßenbahn").
    pub fn vehicle_type(&self) -> Option<&str> {
        self.serving_line.as_ref()?.name.as_deref()
    }

    pub fn line_number(&self) -> Option<&str> {
        self.serving_line.as_ref()?.number.as_deref()
    }

    pub fn destination(&self) -> Option<&str> {
        self.serving_line.as_ref()?.direction.as_deref()
    }

    pub fn origin(&self) -> Option<&str> {
        self.serving_line.as_ref()?.direction_from.as_deref()
    }

    pub fn scheduled_time(&self) -> Option<NaiveDateTime> {
        self.date_time.as_ref()?.to_naive()
    }

    pub fn actual_time(&self) -> Option<NaiveDateTime> {
        self.real_date_time.as_ref()?.to_naive()
    }
}

/// Line block of a departure entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingLine {
    /// Line category label, not the line name ("Bus", "Straßenbahn").
    pub name: Option<String>,
    pub number: Option<String>,
    pub direction: Option<String>,
    #[serde(rename = "directionFrom")]
    pub direction_from: Option<String>,
    pub delay: Option<String>,
}

/// Split date/time block (`{"year": "2024", "month": "1", ...}`), provider
/// local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfaDateTime {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub hour: Option<String>,
    pub minute: Option<String>,
}

impl EfaDateTime {
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(
            field(&self.year)? as i32,
            field(&self.month)?,
            field(&self.day)?,
        )?;
        date.and_hms_opt(field(&self.hour)?, field(&self.minute)?, 0)
    }
}

fn field(value: &Option<String>) -> Option<u32> {
    value.as_deref()?.trim().parse().ok()
}

// Stop finder (XML_STOPFINDER_REQUEST)

/// Top-level payload of the stop finder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopFinderResponse {
    #[serde(rename = "stopFinder")]
    pub stop_finder: Option<StopFinderBlock>,
}

impl StopFinderResponse {
    /// All returned points, in provider order, regardless of the
    /// one-or-many shape.
    pub fn points(&self) -> &[StopPoint] {
        self.stop_finder
            .as_ref()
            .and_then(|sf| sf.points.as_ref())
            .map(PointsBlock::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopFinderBlock {
    pub points: Option<PointsBlock>,
}

// Coordinate search (XML_COORD_REQUEST)

/// Top-level payload of the coordinate search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordSearchResponse {
    #[serde(default)]
    pub pins: Vec<CoordPin>,
}

/// A map pin around the queried coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordPin {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub pin_type: Option<String>,
    pub locality: Option<String>,
    pub desc: Option<String>,
    /// Distance in meters from the queried coordinate, as a string.
    pub distance: Option<String>,
    #[serde(default)]
    pub attrs: Vec<NameValue>,
}

impl CoordPin {
    pub fn is_stop(&self) -> bool {
        self.pin_type.as_deref() == Some("STOP")
    }

    /// Look up a named pin attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.as_deref() == Some(name))?
            .value
            .as_deref()
    }

    /// Best display name: the place-qualified attribute when present, the
    /// short description otherwise.
    pub fn display_name(&self) -> Option<&str> {
        self.attr("STOP_NAME_WITH_PLACE").or(self.desc.as_deref())
    }
}

/// Generic `{name, value}` pair used by message blocks and pin attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameValue {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dm_response(json: &str) -> DepartureMonitorResponse {
        serde_json::from_str(json).expect("fixture should deserialize")
    }

    #[test]
    fn test_deserialize_departure_monitor() {
        let response = dm_response(
            r#"{
                "dm": {
                    "points": {
                        "point": {
                            "usage": "dm",
                            "type": "any",
                            "name": "Würzburg, Hauptbahnhof",
                            "stateless": "3700105",
                            "anyType": "stop"
                        }
                    }
                },
                "departureList": [
                    {
                        "stopID": "3700105",
                        "platformName": "Bussteig 2",
                        "countdown": "4",
                        "dateTime": {
                            "year": "2024",
                            "month": "1",
                            "day": "9",
                            "weekday": "3",
                            "hour": "14",
                            "minute": "7"
                        },
                        "realDateTime": {
                            "year": "2024",
                            "month": "1",
                            "day": "9",
                            "hour": "14",
                            "minute": "9"
                        },
                        "servingLine": {
                            "key": "23",
                            "code": "1",
                            "number": "14",
                            "symbol": "14",
                            "motType": "5",
                            "realtime": "1",
                            "direction": "Gerbrunn",
                            "directionFrom": "Würzburg Sanderau",
                            "name": "Bus",
                            "delay": "2"
                        }
                    }
                ]
            }"#,
        );

        assert!(response.has_departures());
        assert_eq!(response.stop_name(), Some("Würzburg, Hauptbahnhof"));

        let dep = &response.departures()[0];
        assert_eq!(dep.countdown_minutes(), Some(4));
        assert_eq!(dep.delay_minutes(), Some(2));
        assert_eq!(dep.vehicle_type(), Some("Bus"));
        assert_eq!(dep.line_number(), Some("14"));
        assert_eq!(dep.destination(), Some("Gerbrunn"));
        assert_eq!(dep.origin(), Some("Würzburg Sanderau"));

        let scheduled = dep.scheduled_time().expect("nominal time");
        assert_eq!(scheduled.format("%Y-%m-%d %H:%M").to_string(), "2024-01-09 14:07");
        let actual = dep.actual_time().expect("real time");
        assert_eq!(actual.format("%H:%M").to_string(), "14:09");
    }

    #[test]
    fn test_departure_accessors_tolerate_missing_blocks() {
        let response = dm_response(r#"{"departureList": [{"countdown": "3"}]}"#);
        let dep = &response.departures()[0];

        assert_eq!(dep.countdown_minutes(), Some(3));
        assert_eq!(dep.delay_minutes(), None);
        assert_eq!(dep.vehicle_type(), None);
        assert_eq!(dep.destination(), None);
        assert_eq!(dep.scheduled_time(), None);
        assert_eq!(dep.actual_time(), None);
    }

    #[test]
    fn test_missing_departure_list_is_empty() {
        let response = dm_response(r#"{"dm": {}}"#);
        assert!(!response.has_departures());
        assert!(response.departures().is_empty());

        let response = dm_response(r#"{"departureList": null}"#);
        assert!(response.departures().is_empty());
    }

    #[test]
    fn test_points_block_one_or_many() {
        let unique = dm_response(
            r#"{"dm": {"points": {"point": {"name": "Dom", "stateless": "3700012"}}}}"#,
        );
        assert_eq!(unique.stop_name(), Some("Dom"));

        let multiple = dm_response(
            r#"{"dm": {"points": [
                {"name": "Dom", "stateless": "3700012"},
                {"name": "Rathaus", "stateless": "3700013"}
            ]}}"#,
        );
        assert_eq!(multiple.stop_name(), Some("Dom"));
        let points = multiple.dm.as_ref().unwrap().points.as_ref().unwrap();
        assert_eq!(points.as_slice().len(), 2);
    }

    #[test]
    fn test_message_code_and_error() {
        let response = dm_response(
            r#"{"dm": {"message": [
                {"name": "code", "value": "-2000"},
                {"name": "error", "value": "stop invalid"},
                {"name": "itdLayoutParams", "value": ""}
            ]}}"#,
        );
        let dm = response.dm.as_ref().unwrap();
        assert_eq!(dm.message_code(), Some(-2000));
        assert_eq!(dm.message_error(), Some("stop invalid"));
    }

    #[test]
    fn test_message_block_absent() {
        let response = dm_response(r#"{"dm": {}}"#);
        let dm = response.dm.as_ref().unwrap();
        assert_eq!(dm.message_code(), None);
        assert_eq!(dm.message_error(), None);
    }

    #[test]
    fn test_efa_datetime_rejects_unparseable_fields() {
        let block = EfaDateTime {
            year: Some("2024".to_string()),
            month: Some("13".to_string()),
            day: Some("9".to_string()),
            hour: Some("14".to_string()),
            minute: Some("7".to_string()),
        };
        assert_eq!(block.to_naive(), None);

        let block = EfaDateTime {
            year: None,
            month: Some("1".to_string()),
            day: Some("9".to_string()),
            hour: Some("14".to_string()),
            minute: Some("7".to_string()),
        };
        assert_eq!(block.to_naive(), None);
    }

    #[test]
    fn test_stop_finder_point_filtering() {
        let response: StopFinderResponse = serde_json::from_str(
            r#"{"stopFinder": {"points": [
                {"name": "Würzburg, Hauptbahnhof", "stateless": "3700105", "type": "any", "anyType": "stop"},
                {"name": "Hauptbahnhofstraße", "stateless": "street:123", "type": "any", "anyType": "street"},
                {"name": "Würzburg, Residenz", "stateless": "poi:9", "type": "poi"}
            ]}}"#,
        )
        .unwrap();

        let stops: Vec<_> = response.points().iter().filter(|p| p.is_stop()).collect();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].stateless.as_deref(), Some("3700105"));
    }

    #[test]
    fn test_stop_finder_unique_point() {
        let response: StopFinderResponse = serde_json::from_str(
            r#"{"stopFinder": {"points": {"point":
                {"name": "Würzburg, Dom", "stateless": "3700012", "type": "any", "anyType": "stop"}
            }}}"#,
        )
        .unwrap();

        assert_eq!(response.points().len(), 1);
        assert!(response.points()[0].is_stop());
    }

    #[test]
    fn test_coord_pin_name_fallbacks() {
        let response: CoordSearchResponse = serde_json::from_str(
            r#"{"pins": [
                {
                    "id": "3700105",
                    "type": "STOP",
                    "desc": "Hauptbahnhof",
                    "attrs": [
                        {"name": "STOP_MAJOR_MEANS", "value": "1"},
                        {"name": "STOP_NAME_WITH_PLACE", "value": "Würzburg Hauptbahnhof"}
                    ]
                },
                {"id": "3700012", "type": "STOP", "desc": "Dom"},
                {"id": "3700013", "type": "STOP"},
                {"id": "gsp:49:9", "type": "GIS_POINT", "desc": "Parkhaus"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(response.pins[0].display_name(), Some("Würzburg Hauptbahnhof"));
        assert_eq!(response.pins[1].display_name(), Some("Dom"));
        assert_eq!(response.pins[2].display_name(), None);
        assert!(!response.pins[3].is_stop());
    }
}
