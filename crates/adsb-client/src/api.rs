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

//! HTTP access to the ADS-B state backend.
//!
//! The backend exposes two read-only endpoints:
//!
//! - `GET /adsb/states` - every aircraft currently known, used for its `hex` field
//! - `GET /adsb/state?icao=<id>` - the snapshot of one aircraft
//!
//! [`StateApi`] abstracts both so the poller and the session logic can be driven
//! by a fake backend in tests. [`HttpBackend`] is the `reqwest` implementation.

use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::Url;
use thiserror::Error;

use crate::model::{AircraftState, DirectoryResponse, StatesResponse};

/// Backend used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid backend URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Trim and lowercase a user-supplied identifier.
///
/// Returns `None` when nothing is left, so callers can refuse to issue a request.
#[must_use]
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Parse a `GET /adsb/states` body into the identifier list.
pub fn parse_identifiers(body: &str) -> Result<Vec<String>, ApiError> {
    let response: DirectoryResponse = serde_json::from_str(body)?;
    Ok(response.into_identifiers())
}

/// Parse a `GET /adsb/state` body, keeping only the first snapshot.
pub fn parse_first_state(body: &str) -> Result<Option<AircraftState>, ApiError> {
    let response: StatesResponse = serde_json::from_str(body)?;
    Ok(response.states.into_iter().next())
}

/// Read access to the state backend.
pub trait StateApi: Send + Sync + 'static {
    /// Fetch the identifiers of every aircraft the backend currently knows.
    fn fetch_identifiers(&self) -> impl Future<Output = Result<Vec<String>, ApiError>> + Send;

    /// Fetch the latest snapshot for `icao`. `Ok(None)` means "no data".
    fn fetch_state(
        &self,
        icao: &str,
    ) -> impl Future<Output = Result<Option<AircraftState>, ApiError>> + Send;
}

/// [`StateApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend client rooted at `base_url` (for example `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn states_url(&self) -> String {
        format!("{}/adsb/states", self.base_url)
    }

    fn state_url(&self, icao: &str) -> Result<Url, ApiError> {
        let endpoint = format!("{}/adsb/state", self.base_url);
        Url::parse_with_params(&endpoint, &[("icao", icao)]).map_err(|e| ApiError::InvalidUrl {
            url: endpoint.clone(),
            reason: e.to_string(),
        })
    }

    async fn get_body(&self, url: Url) -> Result<String, ApiError> {
        debug!("GET {url}");
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        Ok(response.text().await?)
    }
}

impl StateApi for HttpBackend {
    async fn fetch_identifiers(&self) -> Result<Vec<String>, ApiError> {
        let url = self.states_url();
        let url = Url::parse(&url).map_err(|e| ApiError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let body = self.get_body(url).await?;
        parse_identifiers(&body)
    }

    async fn fetch_state(&self, icao: &str) -> Result<Option<AircraftState>, ApiError> {
        let url = self.state_url(icao)?;
        let body = self.get_body(url).await?;
        parse_first_state(&body)
    }
}
