//! Message list for one conversation view.
//!
//! The conversation is itself the `StreamSink` of its sends, so the assistant
//! message is only ever mutated from the stream callbacks, and only one send
//! can be in flight at a time.

use tracing::debug;

use crate::ai::{CancelToken, ChatClient, ChatError, ChatResult, SendOutcome, StreamSink};
use crate::types::{ChatMessage, Role};

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    thread_id: Option<String>,
    streaming: bool,
    last_error: Option<ChatError>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue an existing server thread.
    pub fn resume(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn last_error(&self) -> Option<&ChatError> {
        self.last_error.as_ref()
    }

    /// Append the user turn and an empty assistant message to stream into.
    pub fn begin_turn(&mut self, query: &str) -> ChatResult<()> {
        if self.streaming {
            return Err(ChatError::Busy);
        }
        self.messages.push(ChatMessage::user(query));
        self.messages.push(ChatMessage::assistant());
        self.streaming = true;
        self.last_error = None;
        Ok(())
    }

    /// Mark the current turn finished without a completion event.
    pub fn end_turn(&mut self) {
        self.streaming = false;
    }

    /// Send `query` and stream the reply into this conversation.
    ///
    /// Partial content is kept when the stream fails or is cancelled.
    pub async fn send(
        &mut self,
        client: &ChatClient,
        query: &str,
        cancel: CancelToken,
    ) -> ChatResult<SendOutcome> {
        self.begin_turn(query)?;
        let thread_id = self.thread_id.clone();
        let outcome = client
            .send_message(query, thread_id.as_deref(), &mut *self, cancel)
            .await;
        if self.streaming {
            debug!(?outcome, "turn ended without completion");
            self.end_turn();
        }
        Ok(outcome)
    }

    fn streaming_reply(&mut self) -> Option<&mut ChatMessage> {
        if !self.streaming {
            return None;
        }
        self.messages
            .last_mut()
            .filter(|msg| msg.role == Role::Assistant)
    }
}

impl StreamSink for Conversation {
    fn on_chunk(&mut self, piece: &str) {
        if let Some(reply) = self.streaming_reply() {
            reply.content.push_str(piece);
        }
    }

    fn on_complete(&mut self, thread_id: Option<&str>) {
        if let Some(id) = thread_id {
            self.thread_id = Some(id.to_string());
        }
        self.streaming = false;
    }

    fn on_error(&mut self, err: &ChatError) {
        self.last_error = Some(err.clone());
        self.streaming = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_fill_the_assistant_message() {
        let mut conv = Conversation::new();
        conv.begin_turn("Is the unit pet friendly?").unwrap();
        conv.on_chunk("Yes, ");
        conv.on_chunk("cats only.");
        conv.on_complete(Some("t-9"));

        let messages = conv.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].content, "Yes, cats only.");
        assert_eq!(conv.thread_id(), Some("t-9"));
        assert!(!conv.is_streaming());
    }

    #[test]
    fn second_turn_while_streaming_is_rejected() {
        let mut conv = Conversation::new();
        conv.begin_turn("first").unwrap();
        assert!(matches!(conv.begin_turn("second"), Err(ChatError::Busy)));
        assert_eq!(conv.messages().len(), 2);
    }

    #[test]
    fn error_keeps_partial_content() {
        let mut conv = Conversation::new();
        conv.begin_turn("q").unwrap();
        conv.on_chunk("half an ans");
        conv.on_error(&ChatError::Protocol("boom".into()));

        assert_eq!(conv.messages()[1].content, "half an ans");
        assert_eq!(conv.last_error().map(ToString::to_string).as_deref(), Some("boom"));
        assert!(!conv.is_streaming());
        assert!(conv.begin_turn("retry").is_ok());
        assert!(conv.last_error().is_none());
    }

    #[test]
    fn chunks_after_completion_are_dropped() {
        let mut conv = Conversation::new();
        conv.begin_turn("q").unwrap();
        conv.on_chunk("done");
        conv.on_complete(None);
        conv.on_chunk(" late");
        assert_eq!(conv.messages()[1].content, "done");
    }

    #[test]
    fn resume_keeps_thread_without_completion_id() {
        let mut conv = Conversation::resume("thread_1");
        conv.begin_turn("q").unwrap();
        conv.on_complete(None);
        assert_eq!(conv.thread_id(), Some("thread_1"));
    }
}
