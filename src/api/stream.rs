use super::logging::{emit_stream_frame, stream_debug_enabled};

/// One parsed event off the analysis connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisEvent {
    /// Text payload of a message frame. May embed segment separators.
    Fragment(String),
    /// The named "end" frame, an alternative completion signal.
    End,
}

#[derive(Default)]
pub struct StreamParser {
    buffer: String,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and drain every frame completed by it.
    /// Frames split across chunks are held until the closing blank line
    /// arrives.
    pub fn process(&mut self, chunk: &[u8]) -> Vec<AnalysisEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(end) = self.buffer[start..].find("\n\n") {
            let frame_end = start + end + 2;
            let frame = &self.buffer[start..frame_end];
            if stream_debug_enabled() {
                emit_stream_frame(frame);
            }

            if let Some(event) = parse_frame(frame) {
                events.push(event);
            }

            start = frame_end;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        events
    }
}

// The service emits bare `data:` frames for messages; an `event:` line only
// appears on the named "end" frame. Multi-line data is joined with newlines
// and exactly one space after the colon is eaten, nothing more.
fn parse_frame(frame: &str) -> Option<AnalysisEvent> {
    let mut event_name: Option<&str> = None;
    let mut data: Option<String> = None;

    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event_name = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix("data:") {
            let piece = rest.strip_prefix(' ').unwrap_or(rest);
            match &mut data {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(piece);
                }
                None => data = Some(piece.to_string()),
            }
        }
    }

    match event_name {
        Some("end") => Some(AnalysisEvent::End),
        Some("message") | None => data.map(AnalysisEvent::Fragment),
        Some(_) => None,
    }
}
