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

//! Client library for an ADS-B state backend.
//!
//! The backend is a plain HTTP service that lists the aircraft it knows and
//! returns the last state of any one of them. This crate turns it into the data
//! flow a viewer needs:
//!
//! - **API layer**: [`StateApi`] and its `reqwest` implementation [`HttpBackend`]
//! - **Directory layer**: [`IdentifierDirectory`] refreshed by a [`DirectoryPoller`]
//! - **Session layer**: [`ViewSession`], the selection/current-state/track container
//! - **Client**: [`Client`] runs the background tasks and hands results back as
//!   [`ClientEvent`]s for the UI thread to apply
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use adsb_client::{Client, ClientConfig, ClientEvent, HttpBackend, ViewSession};
//! use adsb_client::api::DEFAULT_REQUEST_TIMEOUT;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = HttpBackend::new("http://localhost:3000", DEFAULT_REQUEST_TIMEOUT).unwrap();
//!     let mut client = Client::spawn(Arc::new(backend), ClientConfig::default(), Arc::new(|| {}));
//!     let mut session = ViewSession::new();
//!
//!     let ticket = session.begin_search("E48F12").unwrap();
//!     client.request_state(ticket);
//!
//!     while let Some(event) = client.next_event().await {
//!         if let ClientEvent::State { ticket, outcome } = event {
//!             session.apply(&ticket, outcome);
//!             println!("{:?}", session.current());
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod api;
pub mod directory;
pub mod model;
pub mod session;
pub mod track;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use api::{normalize_identifier, ApiError, HttpBackend, StateApi};
pub use directory::{DirectoryPoller, IdentifierDirectory, DEFAULT_POLL_INTERVAL};
pub use model::{AircraftState, TrackPoint};
pub use session::{
    FetchOrigin, FetchOutcome, FetchTicket, Notice, NoticeKind, SessionError, ViewPhase,
    ViewSession,
};
pub use track::{Track, TrackUpdate};

/// Hook invoked after every event, typically to request a UI repaint.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Configuration for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Interval between directory polls.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Results delivered by the background tasks.
#[derive(Debug)]
pub enum ClientEvent {
    /// One directory poll finished.
    Directory(Result<Vec<String>, ApiError>),
    /// A state request finished.
    State {
        ticket: FetchTicket,
        outcome: FetchOutcome,
    },
}

/// Runs the directory poller and state requests on a tokio runtime.
///
/// Dropping the client cancels every task it started, including requests
/// still in flight.
pub struct Client<A: StateApi> {
    api: Arc<A>,
    runtime: Handle,
    event_tx: mpsc::UnboundedSender<ClientEvent>,
    event_rx: mpsc::UnboundedReceiver<ClientEvent>,
    cancel_token: CancellationToken,
    poller: DirectoryPoller,
    waker: Waker,
}

impl<A: StateApi> std::fmt::Debug for Client<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("poller", &self.poller)
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<A: StateApi> Client<A> {
    /// Start the client. Must be called from within a tokio runtime; later
    /// calls such as [`Client::request_state`] may come from any thread.
    #[must_use]
    pub fn spawn(api: Arc<A>, config: ClientConfig, waker: Waker) -> Self {
        let runtime = Handle::current();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        let sink_tx = event_tx.clone();
        let sink_waker = Arc::clone(&waker);
        let poller = DirectoryPoller::spawn(
            Arc::clone(&api),
            config.poll_interval,
            Box::new(move |result| {
                if sink_tx.send(ClientEvent::Directory(result)).is_ok() {
                    sink_waker();
                }
            }),
            cancel_token.child_token(),
        );

        info!("ADS-B client started");

        Self {
            api,
            runtime,
            event_tx,
            event_rx,
            cancel_token,
            poller,
            waker,
        }
    }

    /// Fetch the state named by `ticket` in the background.
    ///
    /// Earlier requests are not cancelled; the session discards their results.
    pub fn request_state(&self, ticket: FetchTicket) {
        let api = Arc::clone(&self.api);
        let event_tx = self.event_tx.clone();
        let cancel_token = self.cancel_token.clone();
        let waker = Arc::clone(&self.waker);

        self.runtime.spawn(async move {
            let outcome = tokio::select! {
                outcome = api.fetch_state(&ticket.icao) => outcome,
                () = cancel_token.cancelled() => {
                    debug!("State request for {} cancelled", ticket.icao);
                    return;
                }
            };

            if event_tx.send(ClientEvent::State { ticket, outcome }).is_ok() {
                waker();
            }
        });
    }

    /// Next pending event, without waiting.
    pub fn try_next_event(&mut self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait for the next event.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.event_rx.recv().await
    }

    /// Cancel the poller and every in-flight request.
    pub fn shutdown(&self) {
        if !self.cancel_token.is_cancelled() {
            info!("Shutting down ADS-B client");
        }
        self.cancel_token.cancel();
        self.poller.shutdown();
    }
}

impl<A: StateApi> Drop for Client<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
