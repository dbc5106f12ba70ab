use super::ChatError;

/// Receiver for the progress of one send.
///
/// `on_chunk` may fire any number of times, followed by at most one of
/// `on_complete` or `on_error`. A cancelled send calls neither.
pub trait StreamSink: Send {
    fn on_chunk(&mut self, piece: &str);

    fn on_complete(&mut self, thread_id: Option<&str>);

    fn on_error(&mut self, err: &ChatError);
}

/// Closure-backed sink for callers that do not want to define a type.
pub struct Callbacks<C, D, E> {
    on_chunk: C,
    on_complete: D,
    on_error: E,
}

impl<C, D, E> Callbacks<C, D, E>
where
    C: FnMut(&str) + Send,
    D: FnMut(Option<&str>) + Send,
    E: FnMut(&ChatError) + Send,
{
    pub fn new(on_chunk: C, on_complete: D, on_error: E) -> Self {
        Self {
            on_chunk,
            on_complete,
            on_error,
        }
    }
}

impl<C, D, E> StreamSink for Callbacks<C, D, E>
where
    C: FnMut(&str) + Send,
    D: FnMut(Option<&str>) + Send,
    E: FnMut(&ChatError) + Send,
{
    fn on_chunk(&mut self, piece: &str) {
        (self.on_chunk)(piece)
    }

    fn on_complete(&mut self, thread_id: Option<&str>) {
        (self.on_complete)(thread_id)
    }

    fn on_error(&mut self, err: &ChatError) {
        (self.on_error)(err)
    }
}

/// Buffers a whole reply; used by `ChatClient::reply`.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    pub content: String,
    pub thread_id: Option<String>,
    pub error: Option<ChatError>,
}

impl StreamSink for Collector {
    fn on_chunk(&mut self, piece: &str) {
        self.content.push_str(piece);
    }

    fn on_complete(&mut self, thread_id: Option<&str>) {
        self.thread_id = thread_id.map(str::to_string);
    }

    fn on_error(&mut self, err: &ChatError) {
        self.error = Some(err.clone());
    }
}

/// Test double recording every callback in order.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub chunks: Vec<String>,
    pub completions: Vec<Option<String>>,
    pub errors: Vec<String>,
}

#[cfg(test)]
impl StreamSink for Recorder {
    fn on_chunk(&mut self, piece: &str) {
        self.chunks.push(piece.to_string());
    }

    fn on_complete(&mut self, thread_id: Option<&str>) {
        self.completions.push(thread_id.map(str::to_string));
    }

    fn on_error(&mut self, err: &ChatError) {
        self.errors.push(err.to_string());
    }
}
