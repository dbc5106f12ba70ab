/// Streaming chat client for the assistant backends.
///
/// Two backend shapes sit behind one `send_message` contract:
///
/// - `fastapi` - a server-sent-events endpoint that assigns thread ids
/// - `n8n` - a webhook that replies with one JSON document or a raw stream of
///   concatenated JSON objects
///
/// The backend is chosen once, when the `ChatClient` is built from a
/// `ChatConfig`. Progress is reported through a `StreamSink`.
///
/// # Usage
///
/// ```rust,no_run
/// use hearth::ai::{CancelToken, Callbacks, ChatClient};
/// use hearth::config::ChatConfig;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = ChatClient::new(&ChatConfig::from_env()?)?;
/// let mut sink = Callbacks::new(
///     |piece: &str| print!("{piece}"),
///     |thread: Option<&str>| println!("\n[thread {thread:?}]"),
///     |err: &hearth::ai::ChatError| eprintln!("error: {err}"),
/// );
/// client
///     .send_message("When is rent due?", None, &mut sink, CancelToken::never())
///     .await;
/// # Ok(())
/// # }
/// ```
mod cancel;
mod client;
mod decode;
mod error;
pub mod events;
pub mod extract;
pub mod fastapi;
pub mod n8n;
mod sink;

use async_trait::async_trait;

pub use cancel::{CancelHandle, CancelToken};
pub use client::{Backend, ChatClient, Reply, SendOutcome};
pub use decode::Utf8Decoder;
pub use error::{ChatError, ChatResult};
pub use fastapi::FastApiBackend;
pub use n8n::N8nBackend;
pub use sink::{Callbacks, StreamSink};

/// One wire shape of the assistant backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send `query` and stream the reply into `sink`.
    ///
    /// Chunks go to the sink as they arrive, and so does completion. Errors are
    /// returned rather than reported; `ChatClient` routes them to the sink.
    async fn stream(
        &self,
        query: &str,
        thread_id: Option<&str>,
        sink: &mut dyn StreamSink,
        cancel: &mut CancelToken,
    ) -> ChatResult<()>;
}
