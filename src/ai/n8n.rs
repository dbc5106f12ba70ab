use async_trait::async_trait;
use futures::StreamExt;
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::header::TRANSFER_ENCODING;
use reqwest::{Client, Response};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::decode::Utf8Decoder;
use super::events::{EventInterpreter, Flow};
use super::extract::ObjectExtractor;
use super::{CancelToken, ChatBackend, ChatError, ChatResult, StreamSink};

/// N8N RAG workflow exposed through a webhook node.
///
/// The webhook either answers with one `{"output": ...}` document or streams
/// concatenated event objects with no separator between them.
pub struct N8nBackend {
    client: Client,
    webhook_url: String,
    email: Option<String>,
}

impl N8nBackend {
    pub fn new(client: Client, webhook_url: impl Into<String>, email: Option<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
            email,
        }
    }
}

#[derive(Serialize)]
struct WebhookRequest<'a> {
    query: &'a str,
    thread_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

/// Client-side thread id: `thread_<unix millis>_<9 lowercase alphanumerics>`.
pub fn generate_thread_id() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("thread_{millis}_{suffix}")
}

const PREVIEW_CHARS: usize = 200;

/// Keeps the first `PREVIEW_CHARS` characters of a response for error messages.
fn extend_preview(preview: &mut String, text: &str) {
    let room = PREVIEW_CHARS.saturating_sub(preview.chars().count());
    preview.extend(text.chars().take(room));
}

/// A response with a declared length and no chunked encoding is read whole.
fn is_buffered(response: &Response) -> bool {
    let chunked = response
        .headers()
        .get(TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    !chunked && response.content_length().is_some()
}

#[async_trait]
impl ChatBackend for N8nBackend {
    fn name(&self) -> &'static str {
        "n8n"
    }

    async fn stream(
        &self,
        query: &str,
        thread_id: Option<&str>,
        sink: &mut dyn StreamSink,
        cancel: &mut CancelToken,
    ) -> ChatResult<()> {
        if self.webhook_url.trim().is_empty() {
            return Err(ChatError::Config("N8N webhook URL is not configured".into()));
        }

        let request = self.client.post(&self.webhook_url).json(&WebhookRequest {
            query,
            thread_id,
            email: self.email.as_deref(),
        });

        let response = cancel.run(request.send()).await??;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status { status, body });
        }

        let thread = thread_id
            .map(str::to_string)
            .unwrap_or_else(generate_thread_id);
        let mut interpreter = EventInterpreter::new(thread);
        let mut extractor = ObjectExtractor::new();
        let mut preview = String::new();

        if is_buffered(&response) {
            let body = cancel.run(response.text()).await??;
            extend_preview(&mut preview, &body);
            extractor.push(&body);
            if interpreter.drain(&mut extractor, sink, cancel)? == Flow::Finished {
                return Ok(());
            }
        } else {
            let mut utf8 = Utf8Decoder::default();
            let mut body = response.bytes_stream();
            while let Some(item) = cancel.run(body.next()).await? {
                let bytes = item?;
                let text = utf8.decode(&bytes);
                extend_preview(&mut preview, &text);
                extractor.push(&text);
                if interpreter.drain(&mut extractor, sink, cancel)? == Flow::Finished {
                    return Ok(());
                }
            }
            let text = utf8.finish();
            extend_preview(&mut preview, &text);
            extractor.push(&text);
            if interpreter.drain(&mut extractor, sink, cancel)? == Flow::Finished {
                return Ok(());
            }
        }

        cancel.check()?;
        let pending = extractor.pending().trim();
        if interpreter.handled() == 0 {
            let preview = preview.trim();
            let preview = if preview.is_empty() { "an empty body" } else { preview };
            return Err(ChatError::Decode(format!(
                "expected an `output` field or stream events, got: {preview}"
            )));
        }
        if !pending.is_empty() {
            debug!(len = pending.len(), "discarding incomplete trailing object");
        }
        warn!(
            thread_id = interpreter.thread_id(),
            "webhook response ended without an end event"
        );
        sink.on_complete(Some(interpreter.thread_id()));
        Ok(())
    }
}
