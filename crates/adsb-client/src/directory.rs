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

//! Directory of currently known aircraft identifiers.
//!
//! [`DirectoryPoller`] asks the backend for the full listing right away and then
//! on a fixed interval. Each successful poll replaces [`IdentifierDirectory`]
//! wholesale; a failed poll is logged and leaves the previous list in place.
//! The next tick is the only retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, StateApi};

/// Default interval between directory polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Callback receiving the outcome of every poll.
pub type PollSink = Box<dyn Fn(Result<Vec<String>, ApiError>) + Send + Sync>;

/// Ordered list of identifiers from the last successful poll.
#[derive(Debug, Clone, Default)]
pub struct IdentifierDirectory {
    identifiers: Vec<String>,
    last_refreshed: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl IdentifierDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list. No merge, no dedup beyond what the backend sends.
    pub fn replace(&mut self, identifiers: Vec<String>) {
        self.identifiers = identifiers;
        self.last_refreshed = Some(Utc::now());
        self.last_error = None;
    }

    /// Apply one poll outcome. Returns true when the list was replaced.
    pub fn apply_poll(&mut self, result: Result<Vec<String>, ApiError>) -> bool {
        match result {
            Ok(identifiers) => {
                self.replace(identifiers);
                true
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    #[must_use]
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Time of the last successful poll.
    #[must_use]
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    /// Error of the most recent poll, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Handle to the background polling task.
///
/// Dropping the handle cancels the task.
pub struct DirectoryPoller {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for DirectoryPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryPoller")
            .field("cancelled", &self.cancel_token.is_cancelled())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl DirectoryPoller {
    /// Start polling on the current tokio runtime.
    ///
    /// The task stops when `cancel_token` (or the returned handle) is cancelled.
    #[must_use]
    pub fn spawn<A: StateApi>(
        api: Arc<A>,
        interval: Duration,
        sink: PollSink,
        cancel_token: CancellationToken,
    ) -> Self {
        let task_cancel = cancel_token.clone();
        let task = tokio::spawn(async move {
            poll_loop(api, interval, sink, task_cancel).await;
        });

        Self { cancel_token, task }
    }

    /// Stop polling. Idempotent.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DirectoryPoller {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn poll_loop<A: StateApi>(
    api: Arc<A>,
    interval: Duration,
    sink: PollSink,
    cancel_token: CancellationToken,
) {
    info!("Directory polling every {} ms", interval.as_millis());

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = cancel_token.cancelled() => {
                info!("Directory polling stopped");
                return;
            }
        }

        let result = tokio::select! {
            result = api.fetch_identifiers() => result,
            () = cancel_token.cancelled() => {
                info!("Directory polling stopped during request");
                return;
            }
        };

        match &result {
            Ok(identifiers) => debug!("Directory poll returned {} identifiers", identifiers.len()),
            Err(e) => warn!("Failed to refresh aircraft directory: {e}"),
        }

        sink(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    use crate::model::AircraftState;

    struct ScriptedDirectory {
        responses: Mutex<VecDeque<Result<Vec<String>, ApiError>>>,
    }

    impl ScriptedDirectory {
        fn new(responses: Vec<Result<Vec<String>, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    impl StateApi for ScriptedDirectory {
        async fn fetch_identifiers(&self) -> Result<Vec<String>, ApiError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn fetch_state(&self, _icao: &str) -> Result<Option<AircraftState>, ApiError> {
            Ok(None)
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_replace_is_not_a_merge() {
        let mut directory = IdentifierDirectory::new();
        assert!(directory.apply_poll(Ok(ids(&["a", "b"]))));
        assert!(directory.apply_poll(Ok(ids(&["b", "c"]))));
        assert_eq!(directory.identifiers(), ids(&["b", "c"]).as_slice());
        assert!(directory.last_refreshed().is_some());
    }

    #[test]
    fn test_failed_poll_keeps_previous_list() {
        let mut directory = IdentifierDirectory::new();
        directory.apply_poll(Ok(ids(&["a", "b"])));

        let err = serde_json::from_str::<serde_json::Value>("oops").unwrap_err();
        assert!(!directory.apply_poll(Err(ApiError::Decode(err))));
        assert_eq!(directory.identifiers(), ids(&["a", "b"]).as_slice());
        assert!(directory.last_error().is_some());

        directory.apply_poll(Ok(Vec::new()));
        assert!(directory.is_empty());
        assert!(directory.last_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_polls_immediately_then_on_interval() {
        let api = Arc::new(ScriptedDirectory::new(vec![
            Ok(ids(&["a", "b"])),
            Err(ApiError::Status(500)),
            Ok(ids(&["b", "c"])),
        ]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink: PollSink = Box::new(move |result| {
            let _ = tx.send(result.map_err(|e| e.to_string()));
        });

        let poller = DirectoryPoller::spawn(
            api,
            Duration::from_millis(5000),
            sink,
            CancellationToken::new(),
        );

        assert_eq!(rx.recv().await.unwrap(), Ok(ids(&["a", "b"])));
        assert!(rx.recv().await.unwrap().is_err());
        assert_eq!(rx.recv().await.unwrap(), Ok(ids(&["b", "c"])));

        poller.shutdown();
        tokio::time::sleep(Duration::from_millis(20_000)).await;
        assert!(poller.is_finished());

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_task() {
        let api = Arc::new(ScriptedDirectory::new(Vec::new()));
        let token = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let sink: PollSink = Box::new(move |_| {
            let _ = tx.send(());
        });

        let poller = DirectoryPoller::spawn(api, DEFAULT_POLL_INTERVAL, sink, token.clone());
        rx.recv().await.unwrap();
        drop(poller);

        assert!(token.is_cancelled());
        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 3).await;
        // Sender is dropped with the finished task, so the channel closes
        assert!(rx.recv().await.is_none());
    }
}
