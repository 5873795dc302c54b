//! In-memory language clients driven by the real [`StateTracker`].

use std::sync::{Arc, Mutex};

use lsp_types::TraceValue;

use super::lock;
use crate::client::{
    ClientError, ClientFactory, LanguageClient, SessionState, StateObserver, StateTracker,
    Subscription,
};
use crate::launcher::LaunchPlan;

/// What happened to one created client.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// Plan the client was created from.
    pub plan: LaunchPlan,
    /// Number of `start` calls.
    pub starts: usize,
    /// Number of `stop` calls.
    pub stops: usize,
    /// Trace levels applied, in order.
    pub traces: Vec<TraceValue>,
    tracker: StateTracker,
}

impl ClientRecord {
    /// Current state of the client.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.tracker.state()
    }

    /// Number of observers still subscribed.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tracker.observer_count()
    }
}

#[derive(Debug, Default)]
struct FactoryState {
    records: Vec<ClientRecord>,
    fail_start: bool,
    fail_set_trace: bool,
}

/// Factory creating [`FakeLanguageClient`]s that share one record log.
#[derive(Debug, Clone, Default)]
pub struct FakeClientFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl FakeClientFactory {
    /// Creates a factory whose clients start successfully.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `start` calls fail.
    pub fn fail_start(&self, fail: bool) {
        lock(&self.state).fail_start = fail;
    }

    /// Makes subsequent `set_trace` calls fail.
    pub fn fail_set_trace(&self, fail: bool) {
        lock(&self.state).fail_set_trace = fail;
    }

    /// Snapshot of every created client, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<ClientRecord> {
        lock(&self.state).records.clone()
    }

    /// Number of clients created.
    #[must_use]
    pub fn created(&self) -> usize {
        lock(&self.state).records.len()
    }

    /// Simulates the server of client `index` exiting on its own.
    pub fn crash(&self, index: usize) {
        let tracker = lock(&self.state)
            .records
            .get(index)
            .map(|record| record.tracker.clone());
        if let Some(tracker) = tracker {
            tracker.transition(SessionState::Stopped);
        }
    }
}

impl ClientFactory for FakeClientFactory {
    fn create(&self, plan: LaunchPlan) -> Box<dyn LanguageClient> {
        let tracker = StateTracker::new();
        let mut state = lock(&self.state);
        let index = state.records.len();
        state.records.push(ClientRecord {
            plan,
            starts: 0,
            stops: 0,
            traces: Vec::new(),
            tracker: tracker.clone(),
        });
        Box::new(FakeLanguageClient {
            index,
            tracker,
            state: Arc::clone(&self.state),
        })
    }
}

/// Language client that records calls instead of spawning a process.
#[derive(Debug)]
pub struct FakeLanguageClient {
    index: usize,
    tracker: StateTracker,
    state: Arc<Mutex<FactoryState>>,
}

impl FakeLanguageClient {
    fn with_record<T>(&self, update: impl FnOnce(&mut ClientRecord, bool, bool) -> T) -> Option<T> {
        let mut state = lock(&self.state);
        let fail_start = state.fail_start;
        let fail_set_trace = state.fail_set_trace;
        state
            .records
            .get_mut(self.index)
            .map(|record| update(record, fail_start, fail_set_trace))
    }
}

impl LanguageClient for FakeLanguageClient {
    fn start(&mut self) -> Result<(), ClientError> {
        let fail = self
            .with_record(|record, fail_start, _| {
                record.starts += 1;
                fail_start
            })
            .unwrap_or(false);
        self.tracker.transition(SessionState::Starting);
        if fail {
            self.tracker.transition(SessionState::Stopped);
            return Err(ClientError::InitializationFailed {
                message: String::from("scripted start failure"),
            });
        }
        self.tracker.transition(SessionState::Running);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ClientError> {
        self.with_record(|record, _, _| record.stops += 1);
        self.tracker.transition(SessionState::Stopped);
        Ok(())
    }

    fn set_trace(&mut self, level: TraceValue) -> Result<(), ClientError> {
        let fail = self
            .with_record(|record, _, fail_set_trace| {
                record.traces.push(level);
                fail_set_trace
            })
            .unwrap_or(false);
        if fail {
            return Err(ClientError::ProcessExited);
        }
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.tracker.state()
    }

    fn on_state_change(&self, observer: StateObserver) -> Subscription {
        self.tracker.subscribe(observer)
    }
}
