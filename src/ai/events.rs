//! Interpretation of the objects an N8N webhook writes into its response.
//!
//! Each object is one of:
//!
//! - `{"type":"item","content":"..."}`: a piece of the reply
//! - `{"type":"end"}`: the reply is complete
//! - `{"error":"..."}`: the workflow failed; a `content` on the same object is
//!   delivered before the error
//! - `{"output":"..."}`: a whole reply from a non-streaming workflow
//!
//! Anything else (for example `{"type":"begin"}`) is ignored.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::extract::ObjectExtractor;
use super::{CancelToken, ChatError, ChatResult, StreamSink};

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<Value>,
    error: Option<Value>,
    output: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Item(String),
    End,
    Error {
        content: Option<String>,
        message: String,
    },
    Output(String),
    Other,
}

/// Whether the caller should keep reading from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finished,
}

fn value_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Classify one extracted object. `None` means it was not valid JSON.
pub fn parse_event(object: &str) -> Option<StreamEvent> {
    let raw: RawEvent = serde_json::from_str(object).ok()?;

    if let Some(message) = value_text(raw.error).filter(|m| !m.is_empty()) {
        let content = value_text(raw.content).filter(|c| !c.is_empty());
        return Some(StreamEvent::Error { content, message });
    }

    let event = match raw.kind.as_deref() {
        Some("item") => StreamEvent::Item(value_text(raw.content).unwrap_or_default()),
        Some("end") => StreamEvent::End,
        _ => match value_text(raw.output) {
            Some(output) => StreamEvent::Output(output),
            None => StreamEvent::Other,
        },
    };
    Some(event)
}

/// Drives a sink from the events of one response.
#[derive(Debug)]
pub struct EventInterpreter {
    thread_id: String,
    handled: usize,
}

impl EventInterpreter {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            handled: 0,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Number of recognised events seen so far.
    pub fn handled(&self) -> usize {
        self.handled
    }

    pub fn handle(&mut self, event: StreamEvent, sink: &mut dyn StreamSink) -> ChatResult<Flow> {
        match event {
            StreamEvent::Item(content) => {
                self.handled += 1;
                if !content.is_empty() {
                    sink.on_chunk(&content);
                }
                Ok(Flow::Continue)
            }
            StreamEvent::End => {
                self.handled += 1;
                sink.on_complete(Some(&self.thread_id));
                Ok(Flow::Finished)
            }
            StreamEvent::Output(output) => {
                self.handled += 1;
                if !output.is_empty() {
                    sink.on_chunk(&output);
                }
                sink.on_complete(Some(&self.thread_id));
                Ok(Flow::Finished)
            }
            StreamEvent::Error { content, message } => {
                self.handled += 1;
                if let Some(content) = content {
                    sink.on_chunk(&content);
                }
                Err(ChatError::Protocol(message))
            }
            StreamEvent::Other => Ok(Flow::Continue),
        }
    }

    /// Handle every complete object currently in `extractor`.
    ///
    /// Stops at the first terminal event; anything after it stays unread.
    /// A sink may cancel from inside a callback, so `cancel` is checked before
    /// each object rather than only at network reads.
    pub fn drain(
        &mut self,
        extractor: &mut ObjectExtractor,
        sink: &mut dyn StreamSink,
        cancel: &CancelToken,
    ) -> ChatResult<Flow> {
        loop {
            cancel.check()?;
            let Some(object) = extractor.next_object() else {
                break;
            };
            let Some(event) = parse_event(&object) else {
                debug!(len = object.len(), "ignoring object that is not valid JSON");
                continue;
            };
            if event == StreamEvent::Other {
                debug!(%object, "ignoring unrecognised stream object");
            }
            if self.handle(event, sink)? == Flow::Finished {
                return Ok(Flow::Finished);
            }
        }
        Ok(Flow::Continue)
    }
}
