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

//! View session: which aircraft is selected and what is known about it.
//!
//! All transitions are plain methods on [`ViewSession`] so the UI thread owns the
//! state and background tasks only deliver results. Every fetch is issued a
//! [`FetchTicket`]; a result is applied only if its ticket is still the latest,
//! so a slow response can never overwrite a newer selection.

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::api::{normalize_identifier, ApiError};
use crate::model::AircraftState;
use crate::track::{Track, TrackUpdate};

/// Outcome of a state fetch as delivered to the session.
pub type FetchOutcome = Result<Option<AircraftState>, ApiError>;

/// What triggered a state fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// Typed identifier, submitted with the button or Enter.
    Search,
    /// Click on an entry of the identifier directory.
    Directory,
}

/// Permission to issue one state request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub origin: FetchOrigin,
    /// Lowercased identifier to request.
    pub icao: String,
}

/// Where the view stands for the active selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewPhase {
    #[default]
    NoSelection,
    Pending,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Enter an ICAO identifier")]
    EmptyIdentifier,
}

/// Category of a user-facing alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    EmptyIdentifier,
    NotFound,
    BackendError,
}

/// Blocking alert to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn new(kind: NoticeKind) -> Self {
        let message = match kind {
            NoticeKind::EmptyIdentifier => SessionError::EmptyIdentifier.to_string(),
            NoticeKind::NotFound => "ICAO not found or no data".to_string(),
            NoticeKind::BackendError => "Error querying backend".to_string(),
        };
        Self { kind, message }
    }
}

impl From<SessionError> for Notice {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::EmptyIdentifier => Notice::new(NoticeKind::EmptyIdentifier),
        }
    }
}

/// State container for the active aircraft.
#[derive(Debug, Default)]
pub struct ViewSession {
    selection: Option<String>,
    current: Option<AircraftState>,
    track: Track,
    phase: ViewPhase,
    next_ticket: u64,
    latest_ticket: Option<u64>,
}

impl ViewSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a search for a typed identifier.
    ///
    /// Empty input issues no ticket, so no request is made.
    pub fn begin_search(&mut self, raw_input: &str) -> Result<FetchTicket, SessionError> {
        let icao = normalize_identifier(raw_input).ok_or(SessionError::EmptyIdentifier)?;
        Ok(self.issue(icao, FetchOrigin::Search))
    }

    /// Make a directory entry the active selection and request its state.
    pub fn select(&mut self, identifier: &str) -> Result<FetchTicket, SessionError> {
        let icao = normalize_identifier(identifier).ok_or(SessionError::EmptyIdentifier)?;
        Ok(self.issue(icao, FetchOrigin::Directory))
    }

    fn issue(&mut self, icao: String, origin: FetchOrigin) -> FetchTicket {
        self.next_ticket += 1;
        let id = self.next_ticket;
        self.latest_ticket = Some(id);
        self.selection = Some(icao.clone());
        self.phase = ViewPhase::Pending;

        info!("Requesting state for {icao} ({origin:?}, ticket {id})");
        FetchTicket { id, origin, icao }
    }

    /// Whether `ticket` belongs to the most recent request.
    #[must_use]
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.latest_ticket == Some(ticket.id)
    }

    /// Apply a completed fetch. Returns the alert to show, if any.
    pub fn apply(&mut self, ticket: &FetchTicket, outcome: FetchOutcome) -> Option<Notice> {
        if !self.is_current(ticket) {
            debug!(
                "Discarding superseded response for {} (ticket {}, latest {:?})",
                ticket.icao, ticket.id, self.latest_ticket
            );
            return None;
        }

        self.phase = ViewPhase::Resolved;

        match outcome {
            Ok(Some(state)) => {
                self.set_current(Some(state));
                None
            }
            Ok(None) => {
                warn!("No state available for {}", ticket.icao);
                self.set_current(None);
                Some(Notice::new(NoticeKind::NotFound))
            }
            Err(e) => {
                error!("Failed to fetch state for {}: {e}", ticket.icao);
                match ticket.origin {
                    FetchOrigin::Search => Some(Notice::new(NoticeKind::BackendError)),
                    FetchOrigin::Directory => None,
                }
            }
        }
    }

    fn set_current(&mut self, state: Option<AircraftState>) {
        self.current = state;
        let update = self.track.observe(self.current.as_ref());
        if update == TrackUpdate::Restarted {
            debug!("Track restarted for {:?}", self.track.owner());
        }
    }

    /// Identifier driving the state fetches.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    #[must_use]
    pub fn current(&self) -> Option<&AircraftState> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn track(&self) -> &Track {
        &self.track
    }

    #[must_use]
    pub fn phase(&self) -> ViewPhase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackPoint;

    fn state(hex: &str, lat: f64, lon: f64) -> AircraftState {
        AircraftState {
            hex: hex.to_string(),
            flight: String::new(),
            lat,
            lon,
            altitude: 3000.0,
            speed: 410.0,
            heading: None,
        }
    }

    #[test]
    fn test_search_lowercases_and_issues_one_ticket() {
        let mut session = ViewSession::new();
        let ticket = session.begin_search("E48F12").unwrap();
        assert_eq!(ticket.icao, "e48f12");
        assert_eq!(ticket.origin, FetchOrigin::Search);
        assert_eq!(session.selection(), Some("e48f12"));
        assert_eq!(session.phase(), ViewPhase::Pending);
    }

    #[test]
    fn test_empty_search_issues_nothing() {
        let mut session = ViewSession::new();
        let err = session.begin_search("").unwrap_err();
        assert_eq!(err, SessionError::EmptyIdentifier);
        assert_eq!(Notice::from(err).kind, NoticeKind::EmptyIdentifier);
        assert_eq!(session.phase(), ViewPhase::NoSelection);
        assert!(session.selection().is_none());
    }

    #[test]
    fn test_found_state_becomes_current() {
        let mut session = ViewSession::new();
        let ticket = session.select("e48f12").unwrap();
        let notice = session.apply(&ticket, Ok(Some(state("e48f12", 1.0, 2.0))));
        assert!(notice.is_none());
        assert_eq!(session.phase(), ViewPhase::Resolved);
        assert_eq!(session.current().map(|s| s.hex.as_str()), Some("e48f12"));
        assert_eq!(session.track().points(), &[TrackPoint::new(1.0, 2.0)]);
    }

    #[test]
    fn test_track_collapses_repeated_fetches() {
        let mut session = ViewSession::new();
        for (lat, lon) in [(1.0, 1.0), (2.0, 2.0), (2.0, 2.0), (3.0, 3.0)] {
            let ticket = session.select("e48f12").unwrap();
            session.apply(&ticket, Ok(Some(state("e48f12", lat, lon))));
        }
        assert_eq!(
            session.track().points(),
            &[
                TrackPoint::new(1.0, 1.0),
                TrackPoint::new(2.0, 2.0),
                TrackPoint::new(3.0, 3.0)
            ]
        );
    }

    #[test]
    fn test_not_found_clears_current_but_keeps_track() {
        let mut session = ViewSession::new();
        let t1 = session.begin_search("e48f12").unwrap();
        session.apply(&t1, Ok(Some(state("e48f12", 1.0, 1.0))));
        let t2 = session.begin_search("e48f12").unwrap();
        session.apply(&t2, Ok(Some(state("e48f12", 2.0, 2.0))));

        let t3 = session.begin_search("e48f12").unwrap();
        let notice = session.apply(&t3, Ok(None)).unwrap();
        assert_eq!(notice.kind, NoticeKind::NotFound);
        assert!(session.current().is_none());
        assert_eq!(session.track().len(), 2);

        // The reset waits for a different identifier
        let t4 = session.select("a0b1c2").unwrap();
        session.apply(&t4, Ok(Some(state("a0b1c2", 5.0, 5.0))));
        assert_eq!(session.track().points(), &[TrackPoint::new(5.0, 5.0)]);
    }

    #[test]
    fn test_not_found_alerts_for_directory_too() {
        let mut session = ViewSession::new();
        let ticket = session.select("e48f12").unwrap();
        let notice = session.apply(&ticket, Ok(None));
        assert_eq!(notice.map(|n| n.kind), Some(NoticeKind::NotFound));
    }

    #[test]
    fn test_failure_alerts_only_for_search() {
        let mut session = ViewSession::new();

        let search = session.begin_search("e48f12").unwrap();
        let notice = session.apply(&search, Err(ApiError::Status(502)));
        assert_eq!(notice.map(|n| n.kind), Some(NoticeKind::BackendError));

        let click = session.select("e48f12").unwrap();
        assert!(session.apply(&click, Err(ApiError::Status(502))).is_none());
    }

    #[test]
    fn test_failure_keeps_previous_state() {
        let mut session = ViewSession::new();
        let t1 = session.select("e48f12").unwrap();
        session.apply(&t1, Ok(Some(state("e48f12", 1.0, 1.0))));

        let t2 = session.select("e48f12").unwrap();
        session.apply(&t2, Err(ApiError::Status(500)));
        assert!(session.current().is_some());
    }

    #[test]
    fn test_superseded_response_is_discarded() {
        let mut session = ViewSession::new();
        let slow = session.select("e48f12").unwrap();
        let fast = session.select("a0b1c2").unwrap();

        session.apply(&fast, Ok(Some(state("a0b1c2", 5.0, 5.0))));
        let notice = session.apply(&slow, Ok(None));

        assert!(notice.is_none());
        assert!(!session.is_current(&slow));
        assert_eq!(session.current().map(|s| s.hex.as_str()), Some("a0b1c2"));
        assert_eq!(session.selection(), Some("a0b1c2"));
    }
}
