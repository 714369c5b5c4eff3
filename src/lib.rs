//! Departure monitoring for the VVM public transport network.
//!
//! Polls the legacy EFA deployment behind the VVM mobile app for the
//! departures of configured stops, filters them by vehicle type, line
//! number and direction, and keeps a nearest-departure summary per stop.

pub mod config;
pub mod departures;
pub mod efa;
pub mod filter;
pub mod monitor;

pub use config::{Config, ConfigError, StopConfig};
pub use departures::{DepartureRecord, StopValidation};
pub use efa::{EfaClient, EfaError, StopMatch};
pub use filter::DepartureFilter;
pub use monitor::{NearestDeparture, StopMonitor};
