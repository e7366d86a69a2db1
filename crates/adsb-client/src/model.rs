// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire model for the ADS-B state backend.
//!
//! The backend answers both endpoints with a `{ "states": [...] }` envelope.
//! The full listing is only read for its `hex` field, while the single-aircraft
//! endpoint yields complete [`AircraftState`] snapshots.

use serde::{Deserialize, Deserializer, Serialize};

/// Text shown wherever a callsign is missing.
pub const MISSING_CALLSIGN: &str = "N/A";

/// Last-known state of one aircraft, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    /// ICAO 24-bit address (hex string).
    pub hex: String,
    /// Callsign, possibly empty or padded with spaces. `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub flight: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude in feet.
    pub altitude: f64,
    /// Ground speed in km/h.
    pub speed: f64,
    /// Heading in degrees, clockwise from north.
    #[serde(default)]
    pub heading: Option<f64>,
}

impl AircraftState {
    /// Position of this snapshot as a track point.
    #[must_use]
    pub fn position(&self) -> TrackPoint {
        TrackPoint {
            lat: self.lat,
            lon: self.lon,
        }
    }

    /// Trimmed callsign, or [`MISSING_CALLSIGN`] when there is none.
    #[must_use]
    pub fn callsign_or_na(&self) -> &str {
        let trimmed = self.flight.trim();
        if trimmed.is_empty() {
            MISSING_CALLSIGN
        } else {
            trimmed
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope returned by `GET /adsb/state?icao=<id>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatesResponse {
    /// A missing key is read as "no data".
    #[serde(default)]
    pub states: Vec<AircraftState>,
}

/// One element of the `GET /adsb/states` listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryEntry {
    #[serde(default)]
    pub hex: Option<String>,
}

/// Envelope returned by `GET /adsb/states`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryResponse {
    #[serde(default)]
    pub states: Vec<DirectoryEntry>,
}

impl DirectoryResponse {
    /// Identifiers in backend order, skipping missing or empty `hex` values.
    #[must_use]
    pub fn into_identifiers(self) -> Vec<String> {
        self.states
            .into_iter()
            .filter_map(|entry| entry.hex)
            .filter(|hex| !hex.is_empty())
            .collect()
    }
}

/// A visited position on the selected aircraft's trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
}

impl TrackPoint {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Bitwise equality of both coordinates.
    ///
    /// Unlike `==`, `-0.0` and `0.0` differ and a `NaN` equals an identical `NaN`.
    #[must_use]
    pub fn same_bits(&self, other: &TrackPoint) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lon.to_bits() == other.lon.to_bits()
    }
}
