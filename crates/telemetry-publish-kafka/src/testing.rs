//! In-memory sinks for exercising the publisher and supervisor without a broker.

use crate::error::PublishError;
use crate::sink::{SinkConnector, TelemetrySink};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Sink that records payloads and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingSink {
    payloads: Mutex<Vec<Vec<u8>>>,
    send_calls: AtomicU64,
    close_calls: AtomicU64,
    fail_sends: bool,
    fail_close: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `send` returns an error.
    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    /// `close` returns an error.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn send_calls(&self) -> u64 {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> u64 {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Payloads accepted so far.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    async fn send(&self, payload: &[u8]) -> Result<(), PublishError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends {
            return Err(PublishError::Send("hub unavailable".to_string()));
        }
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.push(payload.to_vec());
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), PublishError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(PublishError::Close("connection reset".to_string()));
        }
        Ok(())
    }
}

/// Connector whose first `failing_opens` attempts fail.
///
/// Each successful open hands out a fresh `RecordingSink`; all of them are
/// kept so tests can inspect them afterwards.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    failing_opens: u32,
    open_calls: AtomicU32,
    fail_close: bool,
    fail_sends: bool,
    opened: Mutex<Vec<Arc<RecordingSink>>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` opens.
    pub fn failing_opens(mut self, n: u32) -> Self {
        self.failing_opens = n;
        self
    }

    /// Every opened sink fails on close.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Every opened sink fails on send.
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn open_calls(&self) -> u32 {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<Arc<RecordingSink>> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SinkConnector for ScriptedConnector {
    type Sink = Arc<RecordingSink>;

    async fn open(&self) -> Result<Self::Sink, PublishError> {
        let attempt = self.open_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failing_opens {
            return Err(PublishError::InvalidDescriptor(format!(
                "open attempt {attempt} refused"
            )));
        }

        let mut sink = if self.fail_sends {
            RecordingSink::failing()
        } else {
            RecordingSink::new()
        };
        if self.fail_close {
            sink = sink.failing_close();
        }

        let sink = Arc::new(sink);
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(Arc::clone(&sink));
        }
        Ok(sink)
    }

    fn describe(&self) -> String {
        "scripted sink".to_string()
    }
}
