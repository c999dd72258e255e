//! Test doubles shared across module tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::app::{RelayError, Result};
use crate::fetcher::Fetcher;
use crate::publisher::{Notification, Sink};

/// Serves canned bodies or errors by URL and counts requests.
#[derive(Default)]
pub struct StubFetcher {
    responses: Mutex<HashMap<String, std::result::Result<Vec<u8>, String>>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.set_body(url, body);
        self
    }

    pub fn with_error(self, url: &str, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn set_body(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.into()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(RelayError::Other(message.clone())),
            None => Err(RelayError::Other(format!("no stub for {url}"))),
        }
    }
}

/// Records every message it accepts.
pub struct RecordingSink {
    destinations: HashSet<String>,
    sent: Mutex<Vec<(String, Notification)>>,
    reject_containing: Option<String>,
    ready_failures: AtomicUsize,
    ready_calls: AtomicUsize,
}

impl RecordingSink {
    pub fn new<'a>(destinations: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            destinations: destinations.into_iter().map(str::to_string).collect(),
            sent: Mutex::new(Vec::new()),
            reject_containing: None,
            ready_failures: AtomicUsize::new(0),
            ready_calls: AtomicUsize::new(0),
        }
    }

    /// Reject messages whose title contains `needle`.
    pub fn rejecting(mut self, needle: &str) -> Self {
        self.reject_containing = Some(needle.to_string());
        self
    }

    /// Fail the first `times` readiness probes.
    pub fn failing_ready(self, times: usize) -> Self {
        self.ready_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, n)| n.title).collect()
    }

    pub fn ready_calls(&self) -> usize {
        self.ready_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn resolves(&self, destination: &str) -> bool {
        self.destinations.contains(destination)
    }

    async fn ready(&self) -> Result<()> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.ready_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.ready_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RelayError::Other("gateway not ready".into()));
        }
        Ok(())
    }

    async fn send(&self, destination: &str, message: &Notification) -> Result<()> {
        if let Some(needle) = &self.reject_containing {
            if message.title.contains(needle.as_str()) {
                return Err(RelayError::sink(destination, "rejected"));
            }
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), message.clone()));
        Ok(())
    }
}

/// A complete HTTP/1.1 response that closes the connection.
pub fn http_response(status: u16, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!(
        "HTTP/1.1 {status} Canned\r\ncontent-length: {}\r\nconnection: close\r\n",
        body.len()
    );
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(body);
    response
}

/// Serve `responses` in order, one per connection, on a loopback port.
/// Returns the base URL and the number of requests answered so far.
pub async fn serve_canned(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            read_request(&mut stream).await;
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (base, hits)
}

/// Consume one request: headers plus a `content-length` body.
async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + body_len {
            return;
        }
    }
}
