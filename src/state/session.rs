use super::transcript::{Transcript, END_SENTINEL};
use crate::api::stream::{AnalysisEvent, StreamParser};
use crate::api::ApiClient;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    /// One text payload off the connection, sentinel included.
    Fragment(String),
    /// The named "end" frame arrived.
    Finished,
    /// Transport-level failure before any terminal signal.
    Failed(String),
}

/// One delivery from the connection task. The run tag lets the session drop
/// anything a stale connection managed to send after a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub run: u64,
    pub signal: StreamSignal,
}

/// Lifecycle owner for a single server-pushed analysis run. The session is
/// the only writer of its transcript; rendering code gets a read-only view.
pub struct AnalysisSession {
    state: SessionState,
    transcript: Transcript,
    run: u64,
    cancel: Option<CancellationToken>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            transcript: Transcript::new(),
            run: 0,
            cancel: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    /// Enter a new run: the previous connection (if any) is cancelled before
    /// the new one may open, the transcript is replaced with a fresh one, and
    /// the state becomes `Streaming`. Returns the new run tag and the token
    /// the connection task must honor. Works identically from `Idle`,
    /// `Completed`, `Failed`, or mid-`Streaming` restart.
    pub fn begin_run(&mut self) -> (u64, CancellationToken) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.run += 1;
        self.transcript = Transcript::new();
        self.state = SessionState::Streaming;

        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        (self.run, token)
    }

    /// Cancel the live connection without consuming a terminal signal.
    /// Used on teardown; the state is left as-is.
    pub fn shutdown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    /// Fold one delivery into the session. Updates tagged with a stale run
    /// are dropped, as is anything arriving after a terminal transition, so
    /// a second completion signal (or a late fragment) is a no-op.
    pub fn apply(&mut self, update: SessionUpdate) {
        if update.run != self.run || self.state != SessionState::Streaming {
            return;
        }

        match update.signal {
            StreamSignal::Fragment(payload) => {
                if payload == END_SENTINEL {
                    self.complete(SessionState::Completed);
                } else {
                    self.transcript.absorb(&payload);
                }
            }
            StreamSignal::Finished => self.complete(SessionState::Completed),
            StreamSignal::Failed(_) => self.complete(SessionState::Failed),
        }
    }

    fn complete(&mut self, terminal: SessionState) {
        self.state = terminal;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

/// Drive one analysis connection for the given run, forwarding everything it
/// produces over `update_tx`. The task ends on the first terminal signal, on
/// transport failure, or as soon as the run's token is cancelled.
pub fn spawn_stream_task(
    client: Arc<ApiClient>,
    run: u64,
    cancel: CancellationToken,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
) {
    tokio::spawn(async move {
        let mut stream = match client.analysis_stream().await {
            Ok(stream) => stream,
            Err(error) => {
                let _ = update_tx.send(SessionUpdate {
                    run,
                    signal: StreamSignal::Failed(error.to_string()),
                });
                return;
            }
        };

        let mut parser = StreamParser::new();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return,
                next = stream.next() => next,
            };

            let Some(chunk) = next else {
                // Connection closed without either terminal signal.
                let _ = update_tx.send(SessionUpdate {
                    run,
                    signal: StreamSignal::Failed(
                        "analysis stream closed before completion".to_string(),
                    ),
                });
                return;
            };

            match chunk {
                Ok(bytes) => {
                    for event in parser.process(&bytes) {
                        match event {
                            AnalysisEvent::Fragment(payload) => {
                                let is_sentinel = payload == END_SENTINEL;
                                let _ = update_tx.send(SessionUpdate {
                                    run,
                                    signal: StreamSignal::Fragment(payload),
                                });
                                if is_sentinel {
                                    return;
                                }
                            }
                            AnalysisEvent::End => {
                                let _ = update_tx.send(SessionUpdate {
                                    run,
                                    signal: StreamSignal::Finished,
                                });
                                return;
                            }
                        }
                    }
                }
                Err(error) => {
                    let _ = update_tx.send(SessionUpdate {
                        run,
                        signal: StreamSignal::Failed(error.to_string()),
                    });
                    return;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::{MockAnalysisService, MockRun};

    fn fragment(run: u64, payload: &str) -> SessionUpdate {
        SessionUpdate {
            run,
            signal: StreamSignal::Fragment(payload.to_string()),
        }
    }

    async fn run_to_terminal(session: &mut AnalysisSession, runs: Vec<MockRun>) {
        let client = Arc::new(ApiClient::new_mock(Arc::new(MockAnalysisService::new(
            runs,
        ))));
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        let (run, cancel) = session.begin_run();
        spawn_stream_task(client, run, cancel, update_tx);

        while session.is_streaming() {
            let update = update_rx.recv().await.expect("task ended mid-run");
            session.apply(update);
        }
    }

    #[test]
    fn test_fragments_split_and_append_in_order() {
        let mut session = AnalysisSession::new();
        let (run, _cancel) = session.begin_run();

        session.apply(fragment(run, "a:newline:b"));
        session.apply(fragment(run, "c"));

        assert_eq!(session.transcript().lines(), ["a", "b", "c"]);
        assert_eq!(session.state(), SessionState::Streaming);
    }

    #[test]
    fn test_sentinel_as_only_payload_completes_with_empty_transcript() {
        let mut session = AnalysisSession::new();
        let (run, _cancel) = session.begin_run();

        session.apply(fragment(run, END_SENTINEL));

        assert!(session.transcript().is_empty());
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn test_transport_failure_retains_partial_transcript() {
        let mut session = AnalysisSession::new();
        let (run, _cancel) = session.begin_run();

        session.apply(fragment(run, "kept"));
        session.apply(SessionUpdate {
            run,
            signal: StreamSignal::Failed("connection reset".to_string()),
        });

        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.transcript().lines(), ["kept"]);
    }

    #[test]
    fn test_fragments_after_terminal_state_are_dropped() {
        let mut session = AnalysisSession::new();
        let (run, _cancel) = session.begin_run();

        session.apply(fragment(run, END_SENTINEL));
        session.apply(fragment(run, "late"));
        session.apply(SessionUpdate {
            run,
            signal: StreamSignal::Finished,
        });

        assert!(session.transcript().is_empty());
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn test_dual_termination_signals_are_idempotent() {
        let mut session = AnalysisSession::new();
        let (run, _cancel) = session.begin_run();

        session.apply(fragment(run, "finding"));
        session.apply(SessionUpdate {
            run,
            signal: StreamSignal::Finished,
        });
        // The sentinel payload may still arrive for the same run.
        session.apply(fragment(run, END_SENTINEL));

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.transcript().lines(), ["finding"]);
    }

    #[test]
    fn test_restart_drops_stale_run_updates_and_cancels_prior_connection() {
        let mut session = AnalysisSession::new();
        let (first_run, first_cancel) = session.begin_run();
        session.apply(fragment(first_run, "from the first run"));

        let (second_run, _second_cancel) = session.begin_run();
        assert!(first_cancel.is_cancelled());
        assert!(session.transcript().is_empty());

        session.apply(fragment(first_run, "stale"));
        session.apply(fragment(second_run, "fresh"));

        assert_eq!(session.transcript().lines(), ["fresh"]);
    }

    #[test]
    fn test_restart_after_failure_resets_like_initial_start() {
        let mut session = AnalysisSession::new();
        let (run, _cancel) = session.begin_run();
        session.apply(fragment(run, "partial"));
        session.apply(SessionUpdate {
            run,
            signal: StreamSignal::Failed("reset".to_string()),
        });
        assert_eq!(session.state(), SessionState::Failed);

        let (next_run, _next_cancel) = session.begin_run();
        assert_eq!(session.state(), SessionState::Streaming);
        assert!(session.transcript().is_empty());

        session.apply(fragment(next_run, "clean"));
        assert_eq!(session.transcript().lines(), ["clean"]);
    }

    #[test]
    fn test_terminal_transition_releases_the_connection_token() {
        let mut session = AnalysisSession::new();
        let (run, cancel) = session.begin_run();

        session.apply(fragment(run, END_SENTINEL));
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_mock_stream_end_to_end_completes() {
        let mut session = AnalysisSession::new();
        run_to_terminal(
            &mut session,
            vec![vec![
                Ok("data: a:newline:b".to_string()),
                Ok("data: c".to_string()),
                Ok(format!("data: {END_SENTINEL}")),
            ]],
        )
        .await;

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.transcript().lines(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_stream_named_end_event_completes() {
        let mut session = AnalysisSession::new();
        run_to_terminal(
            &mut session,
            vec![vec![
                Ok("data: x".to_string()),
                Ok("event: end\ndata: done".to_string()),
            ]],
        )
        .await;

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.transcript().lines(), ["x"]);
    }

    #[tokio::test]
    async fn test_mock_stream_transport_error_fails_with_partial_transcript() {
        let mut session = AnalysisSession::new();
        run_to_terminal(
            &mut session,
            vec![vec![
                Ok("data: before the cut".to_string()),
                Err("connection reset".to_string()),
            ]],
        )
        .await;

        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.transcript().lines(), ["before the cut"]);
    }

    #[tokio::test]
    async fn test_mock_stream_eof_without_terminal_signal_fails() {
        let mut session = AnalysisSession::new();
        run_to_terminal(
            &mut session,
            vec![vec![Ok("data: half an analysis".to_string())]],
        )
        .await;

        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.transcript().lines(), ["half an analysis"]);
    }
}
