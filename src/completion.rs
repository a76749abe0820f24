//! Streaming chat-completion relay.
//!
//! Opens one streaming `POST /v1/chat/completions` request against the
//! generation service and hands its output back one chunk at a time. A
//! chunk is one newline-terminated line of the upstream body, newline
//! included, exactly as received.
//!
//! [`CompletionStream`] is pull-based: the next network read happens only
//! after every buffered line has been handed out, so the relay never reads
//! ahead of what the consumer has taken. Dropping the stream drops the
//! upstream response and releases the connection, which is how a client
//! disconnect cancels generation.
//!
//! ```text
//! generation service ──bytes──▶ CompletionStream ──line──▶ on_chunk / HTTP body
//!                               (split on '\n')
//! ```

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::Serialize;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::GatewayError;
use crate::models::{CompletionChunk, PromptMessage};

const SERVICE: &str = "generation service";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [PromptMessage],
    stream: bool,
    temperature: f32,
}

/// Client for the remote text-generation service.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
    idle_timeout: Duration,
}

impl CompletionClient {
    /// `http` should carry a connect timeout but no total timeout, since a
    /// completion stream may legitimately run for minutes.
    pub fn new(http: reqwest::Client, config: &GenerationConfig) -> Self {
        Self {
            http,
            endpoint: format!("{}/v1/chat/completions", config.url.trim_end_matches('/')),
            idle_timeout: config.idle_timeout(),
        }
    }

    /// Establish the streaming request and return the chunk stream.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UpstreamUnavailable`] if the request cannot be
    ///   established or the service answers 5xx.
    /// - [`GatewayError::UpstreamProtocolError`] for any other non-success status.
    #[tracing::instrument(
        name = "Opening completion stream",
        skip(self, messages),
        fields(messages = messages.len())
    )]
    pub async fn open(
        &self,
        messages: &[PromptMessage],
        temperature: f32,
    ) -> Result<CompletionStream, GatewayError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&CompletionRequest {
                messages,
                stream: true,
                temperature,
            })
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(GatewayError::from_status(SERVICE, status, &body));
        }

        Ok(CompletionStream::new(
            response.bytes_stream().boxed(),
            self.idle_timeout,
        ))
    }

    /// Stream a completion, calling `on_chunk` once per chunk in arrival order.
    ///
    /// If `on_chunk` fails, consumption stops at once and its error is
    /// returned; the upstream connection is released without draining.
    ///
    /// # Errors
    ///
    /// Everything [`open`](Self::open) returns, plus
    /// [`GatewayError::StreamInterrupted`] if the body breaks mid-stream.
    pub async fn stream<F>(
        &self,
        messages: &[PromptMessage],
        temperature: f32,
        mut on_chunk: F,
    ) -> Result<(), GatewayError>
    where
        F: FnMut(CompletionChunk) -> Result<(), GatewayError>,
    {
        let mut stream = self.open(messages, temperature).await?;
        while let Some(chunk) = stream.next_chunk().await? {
            on_chunk(chunk)?;
        }
        tracing::debug!(chunks = stream.delivered(), "Completion stream finished");
        Ok(())
    }
}

/// A live completion response, read line by line on demand.
pub struct CompletionStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: BytesMut,
    idle_timeout: Duration,
    finished: bool,
    delivered: usize,
}

impl CompletionStream {
    fn new(body: BoxStream<'static, reqwest::Result<Bytes>>, idle_timeout: Duration) -> Self {
        Self {
            body,
            buffer: BytesMut::new(),
            idle_timeout,
            finished: false,
            delivered: 0,
        }
    }

    /// Number of chunks handed out so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Next chunk, or `None` once the upstream body has ended cleanly.
    ///
    /// A trailing line without a final newline is delivered as the last
    /// chunk. After an error the stream is finished and any partial line
    /// is discarded.
    ///
    /// # Errors
    ///
    /// [`GatewayError::StreamInterrupted`] if the connection drops or stays
    /// silent longer than the idle timeout.
    pub async fn next_chunk(&mut self) -> Result<Option<CompletionChunk>, GatewayError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line = self.buffer.split_to(pos + 1).freeze();
                return Ok(Some(self.hand_out(line)));
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = self.buffer.split().freeze();
                return Ok(Some(self.hand_out(rest)));
            }

            match tokio::time::timeout(self.idle_timeout, self.body.next()).await {
                Ok(Some(Ok(bytes))) => self.buffer.extend_from_slice(&bytes),
                Ok(None) => self.finished = true,
                Ok(Some(Err(e))) => {
                    return Err(self.interrupt(e.to_string()));
                }
                Err(_) => {
                    return Err(self.interrupt(format!(
                        "no data from upstream for {}s",
                        self.idle_timeout.as_secs()
                    )));
                }
            }
        }
    }

    /// Turn this into a `futures` stream. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<CompletionChunk, GatewayError>> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut this = state?;
            match this.next_chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(this))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    fn hand_out(&mut self, bytes: Bytes) -> CompletionChunk {
        self.delivered += 1;
        CompletionChunk::new(bytes)
    }

    fn interrupt(&mut self, reason: String) -> GatewayError {
        self.finished = true;
        self.buffer.clear();
        GatewayError::StreamInterrupted(reason)
    }
}
