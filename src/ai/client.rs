use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

use super::sink::Collector;
use super::{
    CancelToken, ChatBackend, ChatError, ChatResult, FastApiBackend, N8nBackend, StreamSink,
};
use crate::config::ChatConfig;

/// The backend shape, fixed when the client is built.
pub enum Backend {
    FastApi(FastApiBackend),
    N8n(N8nBackend),
}

impl Backend {
    /// A non-empty webhook URL selects N8N; otherwise the SSE endpoint.
    pub fn from_config(config: &ChatConfig, client: Client) -> Self {
        match config.n8n_webhook_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                Backend::N8n(N8nBackend::new(client, url, config.user_email.clone()))
            }
            _ => Backend::FastApi(FastApiBackend::new(client, &config.api_url)),
        }
    }
}

#[async_trait]
impl ChatBackend for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::FastApi(backend) => backend.name(),
            Backend::N8n(backend) => backend.name(),
        }
    }

    async fn stream(
        &self,
        query: &str,
        thread_id: Option<&str>,
        sink: &mut dyn StreamSink,
        cancel: &mut CancelToken,
    ) -> ChatResult<()> {
        match self {
            Backend::FastApi(backend) => backend.stream(query, thread_id, sink, cancel).await,
            Backend::N8n(backend) => backend.stream(query, thread_id, sink, cancel).await,
        }
    }
}

/// How a send ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    /// The stream closed without a terminal event and no thread id was known.
    Ended,
    Failed,
    Cancelled,
}

/// A full reply gathered from a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub thread_id: Option<String>,
}

/// Notes whether completion reached the caller's sink.
struct Tracked<'a> {
    inner: &'a mut dyn StreamSink,
    completed: bool,
}

impl StreamSink for Tracked<'_> {
    fn on_chunk(&mut self, piece: &str) {
        self.inner.on_chunk(piece);
    }

    fn on_complete(&mut self, thread_id: Option<&str>) {
        self.completed = true;
        self.inner.on_complete(thread_id);
    }

    fn on_error(&mut self, err: &ChatError) {
        self.inner.on_error(err);
    }
}

pub struct ChatClient {
    backend: Backend,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> ChatResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self::with_backend(Backend::from_config(config, client)))
    }

    pub fn with_backend(backend: Backend) -> Self {
        Self { backend }
    }

    /// Stream the reply to `query` into `sink`.
    ///
    /// Every failure is reported through `sink.on_error`; cancellation is
    /// reported to neither callback.
    pub async fn send_message(
        &self,
        query: &str,
        thread_id: Option<&str>,
        sink: &mut dyn StreamSink,
        mut cancel: CancelToken,
    ) -> SendOutcome {
        info!(
            backend = self.backend.name(),
            resume = thread_id.is_some(),
            "sending chat message"
        );

        let mut tracked = Tracked {
            inner: sink,
            completed: false,
        };
        let result = self
            .backend
            .stream(query, thread_id, &mut tracked, &mut cancel)
            .await;

        match result {
            Ok(()) if tracked.completed => SendOutcome::Completed,
            Ok(()) => SendOutcome::Ended,
            Err(ChatError::Cancelled) => {
                debug!("chat stream cancelled");
                SendOutcome::Cancelled
            }
            Err(err) => {
                error!(error = %err, "chat stream failed");
                tracked.on_error(&err);
                SendOutcome::Failed
            }
        }
    }

    /// Send `query` and wait for the whole reply.
    pub async fn reply(&self, query: &str, thread_id: Option<&str>) -> ChatResult<Reply> {
        let mut collector = Collector::default();
        let outcome = self
            .send_message(query, thread_id, &mut collector, CancelToken::never())
            .await;

        if let Some(err) = collector.error {
            return Err(err);
        }
        match outcome {
            SendOutcome::Cancelled => Err(ChatError::Cancelled),
            _ => Ok(Reply {
                content: collector.content,
                thread_id: collector.thread_id,
            }),
        }
    }
}
