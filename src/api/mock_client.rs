use crate::api::client::{ByteStream, MockStreamProducer, TransferError};
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// One canned analysis run: SSE frames delivered in order, with `Err`
/// entries standing in for transport failures mid-stream.
pub type MockRun = Vec<Result<String, String>>;

#[derive(Clone)]
pub struct MockAnalysisService {
    runs: Arc<Mutex<Vec<MockRun>>>,
}

impl MockAnalysisService {
    pub fn new(runs: Vec<MockRun>) -> Self {
        Self {
            runs: Arc::new(Mutex::new(runs)),
        }
    }
}

impl MockStreamProducer for MockAnalysisService {
    fn create_mock_stream(&self) -> Result<ByteStream, TransferError> {
        let mut runs_guard = self.runs.lock().unwrap();
        if runs_guard.is_empty() {
            return Err(TransferError::Other {
                url: "mock".to_string(),
                message: "no more runs configured".to_string(),
            });
        }
        let run = runs_guard.remove(0);

        let chunks: Vec<Result<Bytes, TransferError>> = run
            .into_iter()
            .map(|item| match item {
                Ok(frame) => {
                    let framed = if frame.ends_with("\n\n") {
                        frame
                    } else {
                        format!("{frame}\n\n")
                    };
                    Ok(Bytes::from(framed))
                }
                Err(message) => Err(TransferError::Other {
                    url: "mock".to_string(),
                    message,
                }),
            })
            .collect();

        Ok(Box::pin(stream::iter(chunks)))
    }
}
