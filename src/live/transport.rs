//! Push channel transport: a long-lived HTTP response carrying JSON
//! messages, one per line (NDJSON) or one per event-stream event.

use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Longest line or event kept while waiting for its terminator
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into complete messages.
///
/// A plain line is one message. Event-stream `data:` lines are collected
/// and joined with `\n` until the blank line that ends the event.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
    event_data: Vec<String>,
    event_bytes: usize,
    /// Dropping the rest of an oversized line
    skipping: bool,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every message it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.skipping {
                self.skipping = false;
                continue;
            }
            if let Some(message) = self.take_line(&String::from_utf8_lossy(&line)) {
                messages.push(message);
            }
        }

        if self.buffer.len() > MAX_MESSAGE_BYTES {
            warn!(
                "Discarding push message longer than {} bytes without a line break",
                MAX_MESSAGE_BYTES
            );
            self.buffer.clear();
            self.skipping = true;
        }
        messages
    }

    fn take_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return self.finish_event();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.strip_prefix(' ').unwrap_or(data);
            self.event_bytes += data.len();
            if self.event_bytes > MAX_MESSAGE_BYTES {
                warn!("Discarding push event larger than {} bytes", MAX_MESSAGE_BYTES);
                self.event_data.clear();
                self.event_bytes = 0;
                return None;
            }
            self.event_data.push(data.to_string());
            return None;
        }
        // Other event-stream fields (event:, id:, retry:) carry nothing we use
        if ["event:", "id:", "retry:"].iter().any(|field| line.starts_with(field)) {
            return None;
        }
        Some(line.to_string())
    }

    fn finish_event(&mut self) -> Option<String> {
        self.event_bytes = 0;
        if self.event_data.is_empty() {
            return None;
        }
        let data = self.event_data.join("\n");
        self.event_data.clear();
        (!data.trim().is_empty()).then_some(data)
    }
}

/// Read the push stream on a background task, reconnecting after drops.
///
/// The task ends once the returned receiver is dropped.
pub fn spawn_push_reader(config: &Config) -> (mpsc::Receiver<String>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(256);
    let url = config.push_url.clone();
    let user_agent = config.http.user_agent.clone();
    let delay = config.reconnect_delay();

    let handle = tokio::spawn(async move {
        let client = match Client::builder().user_agent(user_agent).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Push listener disabled, could not build HTTP client: {}", e);
                return;
            }
        };

        while !tx.is_closed() {
            match read_stream(&client, &url, &tx).await {
                Ok(()) => info!("Push stream {} closed by server", url),
                Err(e) => warn!("Push stream {} failed: {}", url, e),
            }
            if tx.is_closed() {
                break;
            }
            tokio::time::sleep(delay).await;
        }
        debug!("Push reader for {} stopped", url);
    });

    (rx, handle)
}

async fn read_stream(client: &Client, url: &str, tx: &mpsc::Sender<String>) -> anyhow::Result<()> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/x-ndjson, text/event-stream")
        .send()
        .await?
        .error_for_status()?;
    info!("Connected to push stream {}", url);

    let mut splitter = LineSplitter::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        for message in splitter.push(&chunk?) {
            if tx.send(message).await.is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}
