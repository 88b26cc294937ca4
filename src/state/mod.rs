pub mod session;
pub mod transcript;
pub mod uploads;

pub use session::{spawn_stream_task, AnalysisSession, SessionState, SessionUpdate, StreamSignal};
pub use transcript::{line_is_flagged, Transcript, END_SENTINEL, SEGMENT_SEPARATOR};
pub use uploads::{UploadKind, UploadSlot, UploadStatus};
