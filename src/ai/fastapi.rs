use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::decode::Utf8Decoder;
use super::{CancelToken, ChatBackend, ChatError, ChatResult, StreamSink};

/// Server-sent-events chat endpoint (`POST {base}/chat/stream`).
pub struct FastApiBackend {
    client: Client,
    endpoint: String,
}

impl FastApiBackend {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/stream", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct StreamRequest<'a> {
    query: &'a str,
    thread_id: Option<&'a str>,
}

/// One `data:` record of the event stream.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct StreamChunk {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum SsePayload {
    Done,
    Chunk(StreamChunk),
}

pub fn parse_sse_payload(data: &str) -> Option<SsePayload> {
    let trimmed = data.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "[DONE]" {
        return Some(SsePayload::Done);
    }
    serde_json::from_str::<StreamChunk>(trimmed)
        .ok()
        .map(SsePayload::Chunk)
}

/// Splits decoded text into records on blank lines and yields `data: ` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.extend(text.chars().filter(|c| *c != '\r'));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let record: String = self.buffer.drain(..pos + 2).collect();
            payloads.extend(data_lines(&record));
        }
        payloads
    }

    /// Payloads of a final record that was not followed by a blank line.
    pub fn finish(&mut self) -> Vec<String> {
        let record = std::mem::take(&mut self.buffer);
        data_lines(&record).collect()
    }
}

fn data_lines(record: &str) -> impl Iterator<Item = String> + '_ {
    record
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_string)
}

/// Applies one payload. Returns `true` once the terminal record is seen.
fn apply_payload(
    data: &str,
    thread_id: &mut Option<String>,
    sink: &mut dyn StreamSink,
) -> ChatResult<bool> {
    match parse_sse_payload(data) {
        Some(SsePayload::Done) => {
            sink.on_complete(thread_id.as_deref());
            Ok(true)
        }
        Some(SsePayload::Chunk(chunk)) => {
            if let Some(id) = chunk.thread_id.filter(|id| !id.is_empty()) {
                if thread_id.as_deref() != Some(id.as_str()) {
                    debug!(thread_id = %id, "server assigned thread");
                }
                *thread_id = Some(id);
            }
            if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                sink.on_chunk(&content);
            }
            match chunk.error.filter(|e| !e.is_empty()) {
                Some(message) => Err(ChatError::Protocol(message)),
                None => Ok(false),
            }
        }
        None => {
            debug!(len = data.len(), "skipping unparseable SSE payload");
            Ok(false)
        }
    }
}

#[async_trait]
impl ChatBackend for FastApiBackend {
    fn name(&self) -> &'static str {
        "fastapi"
    }

    async fn stream(
        &self,
        query: &str,
        thread_id: Option<&str>,
        sink: &mut dyn StreamSink,
        cancel: &mut CancelToken,
    ) -> ChatResult<()> {
        let request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "text/event-stream")
            .json(&StreamRequest { query, thread_id });

        let response = cancel.run(request.send()).await??;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status { status, body });
        }

        let mut current_thread = thread_id.map(str::to_string);
        let mut utf8 = Utf8Decoder::default();
        let mut sse = SseDecoder::default();
        let mut body = response.bytes_stream();

        while let Some(item) = cancel.run(body.next()).await? {
            let bytes = item?;
            for data in sse.push(&utf8.decode(&bytes)) {
                cancel.check()?;
                if apply_payload(&data, &mut current_thread, sink)? {
                    return Ok(());
                }
            }
        }

        let tail = utf8.finish();
        let mut leftover = sse.push(&tail);
        leftover.extend(sse.finish());
        for data in leftover {
            cancel.check()?;
            if apply_payload(&data, &mut current_thread, sink)? {
                return Ok(());
            }
        }

        cancel.check()?;
        match current_thread {
            Some(id) => {
                debug!(thread_id = %id, "event stream closed without [DONE]");
                sink.on_complete(Some(&id));
            }
            None => warn!("event stream closed without [DONE] or a thread id"),
        }
        Ok(())
    }
}
