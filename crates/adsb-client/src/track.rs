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

//! Visited-position trail of the selected aircraft.
//!
//! The trail belongs to a single identifier. A snapshot for another identifier
//! discards it, a snapshot repeating the last point is ignored, and anything else
//! is appended. There is no length limit and no time-based pruning.

use log::debug;

use crate::model::{AircraftState, TrackPoint};

/// Result of feeding one snapshot into a [`Track`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackUpdate {
    /// The point was appended to the existing trail.
    Appended,
    /// The identifier changed; the trail restarted with this point.
    Restarted,
    /// The point repeated the last one and was dropped.
    Duplicate,
    /// No snapshot; the trail was left as it was.
    Unchanged,
}

/// Accumulated positions for one aircraft.
#[derive(Debug, Clone, Default)]
pub struct Track {
    owner: Option<String>,
    points: Vec<TrackPoint>,
}

impl Track {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current aircraft state after it changed.
    ///
    /// `None` leaves the trail alone. The reset happens when the next snapshot
    /// carries a different identifier.
    pub fn observe(&mut self, state: Option<&AircraftState>) -> TrackUpdate {
        let Some(state) = state else {
            return TrackUpdate::Unchanged;
        };

        let point = state.position();

        if self.owner.as_deref() != Some(state.hex.as_str()) {
            if self.owner.is_some() {
                debug!(
                    "Track owner changed {:?} -> {}, dropping {} points",
                    self.owner,
                    state.hex,
                    self.points.len()
                );
            }
            self.owner = Some(state.hex.clone());
            self.points.clear();
            self.points.push(point);
            return TrackUpdate::Restarted;
        }

        if self.points.last().is_some_and(|last| last.same_bits(&point)) {
            return TrackUpdate::Duplicate;
        }

        self.points.push(point);
        TrackUpdate::Appended
    }

    /// Identifier the trail belongs to.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    #[must_use]
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A line needs at least two points.
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.points.len() > 1
    }
}
