//! In-memory capabilities for unit tests.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::clock::{Clock, SyncError, TimeSync};
use crate::network::ConnectivityProbe;
use crate::transport::{HttpResponse, HttpsTransport, TransportError};

/// A time after the default threshold.
pub const VALID_NOW: i64 = 1_800_000_000;

#[derive(Clone)]
pub struct FakeProbe(Arc<AtomicBool>);

impl FakeProbe {
    pub fn new(connected: bool) -> Self {
        Self(Arc::new(AtomicBool::new(connected)))
    }

    pub fn set(&self, connected: bool) {
        self.0.store(connected, Ordering::SeqCst);
    }
}

impl ConnectivityProbe for FakeProbe {
    fn is_connected(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct FakeClock(Arc<AtomicI64>);

impl FakeClock {
    pub fn new(now: i64) -> Self {
        Self(Arc::new(AtomicI64::new(now)))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counts attempts; optionally moves the clock forward as a real sync would.
#[derive(Clone)]
pub struct FakeSync {
    attempts: Arc<AtomicUsize>,
    clock: Option<(FakeClock, i64)>,
}

impl FakeSync {
    /// Every attempt fails.
    pub fn failing() -> Self {
        Self {
            attempts: Arc::new(AtomicUsize::new(0)),
            clock: None,
        }
    }

    /// Every attempt succeeds and sets `clock` to `synced`.
    pub fn setting(clock: &FakeClock, synced: i64) -> Self {
        Self {
            attempts: Arc::new(AtomicUsize::new(0)),
            clock: Some((clock.clone(), synced)),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl TimeSync for FakeSync {
    fn try_sync(&self) -> Result<(), SyncError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.clock {
            Some((clock, synced)) => {
                clock.set(*synced);
                Ok(())
            }
            None => Err(SyncError::Unavailable),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Clone)]
enum Reply {
    Status(u16),
    Fail,
}

#[derive(Clone)]
pub struct FakeTransport {
    reply: Arc<Mutex<Reply>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeTransport {
    pub fn status(status: u16) -> Self {
        Self {
            reply: Arc::new(Mutex::new(Reply::Status(status))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        let transport = Self::status(0);
        transport.fail();
        transport
    }

    pub fn respond_with(&self, status: u16) {
        *self.reply.lock().unwrap() = Reply::Status(status);
    }

    pub fn fail(&self) {
        *self.reply.lock().unwrap() = Reply::Fail;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpsTransport for FakeTransport {
    fn post(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        match *self.reply.lock().unwrap() {
            Reply::Status(status) => Ok(HttpResponse {
                status,
                body: b"{\"ok\":true}".to_vec(),
            }),
            Reply::Fail => Err(TransportError::Request("connection refused".into())),
        }
    }
}
