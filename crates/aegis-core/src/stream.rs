use regex::Regex;
use serde_json::Value;

/// Something StreamBuffer surfaces to the owning [`crate::communicator::MCPCommunicator`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A complete, successfully parsed JSON-RPC message.
    Message(Value),
    /// A newline-terminated line that could not be parsed as JSON even after
    /// every later newline in the buffer was tried as the frame boundary.
    ParseError(String),
}

/// Accumulates raw stdout/stderr bytes from the child process and frames
/// complete JSON-RPC messages out of stdout.
///
/// A message is framed by a single trailing `\n` that is not inside a JSON
/// string literal. Because a JSON parser can only tell a string literal from
/// a line ending in hindsight, framing works by attempting to parse
/// increasingly long prefixes of the buffer, cut at each newline in turn,
/// until one parses or the buffer runs out of newlines (in which case the
/// buffer waits for more data). See `SPEC_FULL.md` §4.1.
pub struct StreamBuffer {
    stdout: Vec<u8>,
    stderr: String,
    ready_pattern: Option<Regex>,
    ready: bool,
}

impl StreamBuffer {
    pub fn new(ready_pattern: Option<Regex>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: String::new(),
            ready_pattern,
            ready: false,
        }
    }

    /// Appends a stdout chunk and returns every message framed as a result,
    /// in wire order. Partial frames remain buffered for the next call.
    pub fn process_stdout(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.stdout.extend_from_slice(chunk);
        self.drain_frames()
    }

    /// Call once the child's stdout has closed. Any content still buffered
    /// did not terminate cleanly; it is reported as a single parse error and
    /// the buffer is cleared.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = self.drain_frames();
        if !self.stdout.is_empty() {
            let text = String::from_utf8_lossy(&self.stdout).into_owned();
            events.push(StreamEvent::ParseError(text));
            self.stdout.clear();
        }
        events
    }

    fn drain_frames(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        loop {
            match self.next_frame() {
                Some(Frame::Blank(end)) => {
                    self.stdout.drain(0..=end);
                }
                Some(Frame::Message(value, end)) => {
                    events.push(StreamEvent::Message(value));
                    self.stdout.drain(0..=end);
                }
                None => break,
            }
        }
        events
    }

    /// Finds the earliest newline position whose preceding bytes parse as
    /// JSON (or are blank), extending the candidate frame past newlines that
    /// land inside an embedded string literal.
    fn next_frame(&self) -> Option<Frame> {
        let mut search_from = 0usize;
        loop {
            let relative = self.stdout[search_from..].iter().position(|&b| b == b'\n')?;
            let newline_at = search_from + relative;
            let candidate = &self.stdout[..newline_at];
            if candidate.iter().all(u8::is_ascii_whitespace) {
                return Some(Frame::Blank(newline_at));
            }
            match serde_json::from_slice::<Value>(candidate) {
                Ok(value) => return Some(Frame::Message(value, newline_at)),
                Err(_) => search_from = newline_at + 1,
            }
        }
    }

    /// Appends a stderr chunk. Returns `true` the first time the configured
    /// `readyPattern` matches (subsequent matches are silent per §4.1).
    pub fn process_stderr(&mut self, chunk: &[u8]) -> bool {
        self.stderr.push_str(&String::from_utf8_lossy(chunk));
        if self.ready {
            return false;
        }
        let fired = self
            .ready_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(&self.stderr));
        if fired {
            self.ready = true;
        }
        fired
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn has_ready_pattern(&self) -> bool {
        self.ready_pattern.is_some()
    }

    pub fn clear_stdout(&mut self) {
        self.stdout.clear();
    }

    pub fn clear_stderr(&mut self) {
        self.stderr.clear();
    }

    pub fn reset_state(&mut self) {
        self.clear_stdout();
        self.clear_stderr();
        self.ready = false;
    }
}

enum Frame {
    Blank(usize),
    Message(Value, usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_message_per_line() {
        let mut buf = StreamBuffer::new(None);
        let events = buf.process_stdout(b"{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(
            events,
            vec![
                StreamEvent::Message(serde_json::json!({"a": 1})),
                StreamEvent::Message(serde_json::json!({"b": 2})),
            ]
        );
    }

    #[test]
    fn buffers_partial_fragment_across_chunks() {
        let mut buf = StreamBuffer::new(None);
        assert!(buf.process_stdout(b"{\"a\":").is_empty());
        assert!(buf.process_stdout(b"1").is_empty());
        let events = buf.process_stdout(b"}\n");
        assert_eq!(events, vec![StreamEvent::Message(serde_json::json!({"a": 1}))]);
    }

    #[test]
    fn joins_across_embedded_newline_in_string() {
        let mut buf = StreamBuffer::new(None);
        // a raw newline byte sits inside the "text" string value
        let payload = b"{\"text\":\"line one\nline two\"}\n";
        let events = buf.process_stdout(payload);
        assert_eq!(
            events,
            vec![StreamEvent::Message(serde_json::json!({"text": "line one\nline two"}))]
        );
    }

    #[test]
    fn handles_many_small_chunks_for_one_large_message() {
        let mut buf = StreamBuffer::new(None);
        let message = serde_json::json!({"data": "x".repeat(5_000)});
        let mut wire = serde_json::to_vec(&message).unwrap();
        wire.push(b'\n');

        let mut events = Vec::new();
        for byte in wire.chunks(7) {
            events.extend(buf.process_stdout(byte));
        }
        assert_eq!(events, vec![StreamEvent::Message(message)]);
    }

    #[test]
    fn reports_unparsable_tail_on_finish() {
        let mut buf = StreamBuffer::new(None);
        buf.process_stdout(b"not json at all\n");
        let events = buf.finish();
        assert_eq!(events, vec![StreamEvent::ParseError("not json at all".into())]);
    }

    #[test]
    fn ready_pattern_fires_once() {
        let mut buf = StreamBuffer::new(Some(Regex::new("Server ready").unwrap()));
        assert!(!buf.process_stderr(b"booting up\n"));
        assert!(buf.process_stderr(b"Server ready on :3000\n"));
        assert!(!buf.process_stderr(b"Server ready again\n"));
        assert!(buf.is_ready());
    }

    #[test]
    fn clear_and_reset_wipe_buffers() {
        let mut buf = StreamBuffer::new(Some(Regex::new("ready").unwrap()));
        buf.process_stdout(b"{\"a\":1}");
        buf.process_stderr(b"ready\n");
        buf.reset_state();
        assert_eq!(buf.stderr(), "");
        assert!(!buf.is_ready());
        // the dangling partial stdout fragment is gone too
        assert!(buf.process_stdout(b"}\n").is_empty());
    }
}
