//! In-memory transport for engine and family tests.
//!
//! Frames pushed with [`MockTransport::push`] come out of `read_frame` in
//! order. Everything written is recorded and can be awaited with
//! [`MockTransport::next_written`]. An optional responder turns each written
//! frame into zero or more inbound replies, which is how tests play the
//! server side of a request/ack exchange.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};

use super::{Transport, TransportError};

type Responder = Box<dyn Fn(&[u8]) -> Vec<Vec<u8>> + Send + Sync>;

pub struct MockTransport {
    inbound_tx: mpsc::UnboundedSender<Result<Vec<u8>, TransportError>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Vec<u8>, TransportError>>>,
    written: Mutex<Vec<Vec<u8>>>,
    cursor: AtomicUsize,
    write_notify: Notify,
    responder: Mutex<Option<Responder>>,
    connect_error: Mutex<Option<TransportError>>,
    write_error: Mutex<Option<TransportError>>,
    close_error: Mutex<Option<TransportError>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            written: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            write_notify: Notify::new(),
            responder: Mutex::new(None),
            connect_error: Mutex::new(None),
            write_error: Mutex::new(None),
            close_error: Mutex::new(None),
            connects: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// Queue an inbound frame.
    pub fn push(&self, frame: impl Into<Vec<u8>>) {
        let _ = self.inbound_tx.send(Ok(frame.into()));
    }

    /// Queue a read failure.
    pub fn push_error(&self, err: TransportError) {
        let _ = self.inbound_tx.send(Err(err));
    }

    /// Reply to every written frame with the frames `f` returns.
    pub fn respond_with(&self, f: impl Fn(&[u8]) -> Vec<Vec<u8>> + Send + Sync + 'static) {
        *self.responder.lock() = Some(Box::new(f));
    }

    /// Make the next `connect` fail with `err`.
    pub fn fail_connect(&self, err: TransportError) {
        *self.connect_error.lock() = Some(err);
    }

    /// Make every write fail with `err` until cleared with `None`.
    pub fn fail_writes(&self, err: Option<TransportError>) {
        *self.write_error.lock() = err;
    }

    /// Make `close` return `err`.
    pub fn fail_close(&self, err: TransportError) {
        *self.close_error.lock() = Some(err);
    }

    /// Wait for the next written frame not yet returned by this method.
    pub async fn next_written(&self) -> Vec<u8> {
        loop {
            let notified = self.write_notify.notified();
            {
                let written = self.written.lock();
                let idx = self.cursor.load(Ordering::Acquire);
                if idx < written.len() {
                    self.cursor.store(idx + 1, Ordering::Release);
                    return written[idx].clone();
                }
            }
            notified.await;
        }
    }

    /// Next written frame as a string.
    pub async fn next_written_text(&self) -> String {
        String::from_utf8_lossy(&self.next_written().await).into_owned()
    }

    /// Every frame written so far.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.connects.load(Ordering::Acquire)
    }

    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::Acquire)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connects.fetch_add(1, Ordering::AcqRel);
        match self.connect_error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn read_frame(&self) -> Result<Vec<u8>, TransportError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.unwrap_or(Err(TransportError::UnexpectedEof))
    }

    async fn write_frame(&self, frame: &[u8]) -> Result<(), TransportError> {
        if let Some(err) = self.write_error.lock().clone() {
            return Err(err);
        }
        self.written.lock().push(frame.to_vec());
        self.write_notify.notify_one();

        let replies = match self.responder.lock().as_ref() {
            Some(respond) => respond(frame),
            None => Vec::new(),
        };
        for reply in replies {
            self.push(reply);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::AcqRel);
        self.push_error(TransportError::ReadInterrupted);
        match self.close_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
