use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{FetchCapability, HttpResponse};
use crate::retry::RemoteError;

type Scripted = Result<HttpResponse, RemoteError>;

#[derive(Default)]
struct MockState {
    scripts: HashMap<String, VecDeque<Scripted>>,
    fixed: HashMap<String, Scripted>,
    calls: HashMap<String, usize>,
}

/// Replays scripted responses per URL and counts calls.
///
/// Queued responses (`push`) are consumed first; afterwards the `always` response for the URL
/// is returned, and unknown URLs get a 404.
#[derive(Default)]
pub struct MockFetcher {
    state: Mutex<MockState>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one response for `url`.
    pub fn push(&self, url: &str, response: Scripted) -> &Self {
        self.state
            .lock()
            .scripts
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Sets the response returned once the queue for `url` is empty.
    pub fn always(&self, url: &str, response: Scripted) -> &Self {
        self.state.lock().fixed.insert(url.to_string(), response);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.state.lock().calls.get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }
}

#[async_trait]
impl FetchCapability for MockFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, RemoteError> {
        let mut state = self.state.lock();
        *state.calls.entry(url.to_string()).or_default() += 1;

        if let Some(next) = state.scripts.get_mut(url).and_then(VecDeque::pop_front) {
            return next;
        }
        state
            .fixed
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(HttpResponse::new(404, "not found")))
    }
}
