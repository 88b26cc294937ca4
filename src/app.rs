use crate::api::logging::emit_transfer_failure;
use crate::api::{ApiClient, TransferError};
use crate::config::Config;
use crate::render::render_value;
use crate::state::{
    spawn_stream_task, AnalysisSession, SessionState, SessionUpdate, UploadKind, UploadSlot,
    UploadStatus,
};
use crate::terminal::TerminalType;
use crate::ui::layout::split_app_layout;
use crate::ui::render::{
    render_content_pane, render_input, render_notice_line, render_status_line, render_transcript,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(16);
const PAGE_SCROLL_LINES: usize = 10;

pub struct UploadOutcome {
    pub kind: UploadKind,
    pub result: Result<Value, TransferError>,
}

pub struct App {
    client: Arc<ApiClient>,
    session: AnalysisSession,
    contract: UploadSlot,
    tasks: UploadSlot,
    contract_lines: Option<Vec<String>>,
    tasks_lines: Option<Vec<String>>,
    input: String,
    cursor: usize,
    error: Option<String>,
    transcript_scroll: usize,
    upload_tx: mpsc::UnboundedSender<UploadOutcome>,
    upload_rx: mpsc::UnboundedReceiver<UploadOutcome>,
    stream_tx: mpsc::UnboundedSender<SessionUpdate>,
    stream_rx: mpsc::UnboundedReceiver<SessionUpdate>,
    quit: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let (upload_tx, upload_rx) = mpsc::unbounded_channel();
        let (stream_tx, stream_rx) = mpsc::unbounded_channel();
        Self {
            client: Arc::new(ApiClient::new(config)),
            session: AnalysisSession::new(),
            contract: UploadSlot::default(),
            tasks: UploadSlot::default(),
            contract_lines: None,
            tasks_lines: None,
            input: String::new(),
            cursor: 0,
            error: None,
            transcript_scroll: 0,
            upload_tx,
            upload_rx,
            stream_tx,
            stream_rx,
            quit: false,
        }
    }

    pub async fn run(&mut self, terminal: &mut TerminalType) -> Result<()> {
        while !self.quit {
            self.drain_updates();
            self.draw(terminal)?;
            self.poll_input()?;
        }
        self.session.shutdown();
        Ok(())
    }

    fn drain_updates(&mut self) {
        while let Ok(outcome) = self.upload_rx.try_recv() {
            self.apply_upload_outcome(outcome);
        }
        while let Ok(update) = self.stream_rx.try_recv() {
            self.apply_stream_update(update);
        }
    }

    fn apply_upload_outcome(&mut self, outcome: UploadOutcome) {
        match outcome.result {
            Ok(value) => {
                let lines = render_value(&value);
                match outcome.kind {
                    UploadKind::Contract => {
                        self.contract.complete(value);
                        self.contract_lines = Some(lines);
                    }
                    UploadKind::Tasks => {
                        self.tasks.complete(value);
                        self.tasks_lines = Some(lines);
                    }
                }
            }
            Err(error) => {
                emit_transfer_failure("upload", &error.to_string());
                self.slot_mut(outcome.kind).fail();
                self.error = Some(format!(
                    "Failed to upload the {} file. Please try again.",
                    outcome.kind.label()
                ));
            }
        }
    }

    fn apply_stream_update(&mut self, update: SessionUpdate) {
        let was_streaming = self.session.is_streaming();
        self.session.apply(update);
        if was_streaming && self.session.state() == SessionState::Failed {
            self.error = Some("Failed to analyze the files. Please try again.".to_string());
        }
    }

    pub fn handle_command(&mut self, line: &str) {
        // A new action clears the previous message before doing its own work.
        self.error = None;

        let trimmed = line.trim();
        let (command, argument) = match trimmed.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (trimmed, ""),
        };

        match command {
            "docx" => self.start_upload(UploadKind::Contract, argument),
            "xlsx" => self.start_upload(UploadKind::Tasks, argument),
            "analyze" => self.start_analysis(),
            "quit" | "q" => self.quit = true,
            "" => {}
            _ => {
                self.error = Some(format!(
                    "Unknown command '{command}'. Use: docx <path>, xlsx <path>, analyze, quit."
                ));
            }
        }
    }

    fn start_upload(&mut self, kind: UploadKind, argument: &str) {
        if argument.is_empty() {
            self.error = Some(
                match kind {
                    UploadKind::Contract => "Please select a DOCX file first.",
                    UploadKind::Tasks => "Please select an XLSX file first.",
                }
                .to_string(),
            );
            return;
        }

        self.slot_mut(kind).begin();
        let client = Arc::clone(&self.client);
        let path = PathBuf::from(argument);
        let outcome_tx = self.upload_tx.clone();
        tokio::spawn(async move {
            let result = match kind {
                UploadKind::Contract => client.upload_docx(&path).await,
                UploadKind::Tasks => client.upload_xlsx(&path).await,
            };
            let _ = outcome_tx.send(UploadOutcome { kind, result });
        });
    }

    fn start_analysis(&mut self) {
        if !(self.contract.is_uploaded() && self.tasks.is_uploaded()) {
            self.error = Some("Please upload both the DOCX and XLSX files first.".to_string());
            return;
        }

        self.transcript_scroll = 0;
        let (run, cancel) = self.session.begin_run();
        spawn_stream_task(
            Arc::clone(&self.client),
            run,
            cancel,
            self.stream_tx.clone(),
        );
    }

    fn slot_mut(&mut self, kind: UploadKind) -> &mut UploadSlot {
        match kind {
            UploadKind::Contract => &mut self.contract,
            UploadKind::Tasks => &mut self.tasks,
        }
    }

    fn is_busy(&self) -> bool {
        self.session.is_streaming()
            || self.contract.status() == UploadStatus::Uploading
            || self.tasks.status() == UploadStatus::Uploading
    }

    pub fn status_line(&self) -> String {
        format!(
            "docx:{}  xlsx:{}  analysis:{}  lines:{}",
            status_word(self.contract.status()),
            status_word(self.tasks.status()),
            state_word(self.session.state()),
            self.session.transcript().len(),
        )
    }

    fn draw(&mut self, terminal: &mut TerminalType) -> Result<()> {
        let status = self.status_line();
        terminal.draw(|frame| {
            let area = frame.area();
            let content_rows = if self.contract_lines.is_some() || self.tasks_lines.is_some() {
                area.height * 2 / 5
            } else {
                0
            };
            let panes = split_app_layout(area, content_rows);

            render_status_line(frame, panes.status, &status);
            render_notice_line(frame, panes.notice, self.error.as_deref(), self.is_busy());
            render_transcript(
                frame,
                panes.transcript,
                self.session.transcript().lines(),
                self.transcript_scroll,
            );
            render_content_pane(
                frame,
                panes.contract,
                "DOCX File Content",
                self.contract_lines.as_deref(),
            );
            render_content_pane(
                frame,
                panes.tasks,
                "XLSX File Content",
                self.tasks_lines.as_deref(),
            );
            render_input(frame, panes.input, &self.input, self.cursor);
        })?;
        Ok(())
    }

    fn poll_input(&mut self) -> Result<()> {
        if !event::poll(INPUT_POLL_INTERVAL)? {
            return Ok(());
        }

        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Release {
                    self.handle_key(key);
                }
            }
            Event::Paste(text) => self.insert_str(&text),
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit = true;
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.input.is_empty() {
                    self.quit = true;
                }
            }
            KeyCode::PageUp => {
                self.transcript_scroll = self.transcript_scroll.saturating_sub(PAGE_SCROLL_LINES);
            }
            KeyCode::PageDown => {
                self.transcript_scroll = self.transcript_scroll.saturating_add(PAGE_SCROLL_LINES);
            }
            KeyCode::Up => {
                self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
            }
            KeyCode::Down => {
                self.transcript_scroll = self.transcript_scroll.saturating_add(1);
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.len(),
            KeyCode::Left => self.cursor = self.prev_char_boundary(self.cursor),
            KeyCode::Right => self.cursor = self.next_char_boundary(self.cursor),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Enter => {
                if let Some(line) = self.submit_input() {
                    self.handle_command(&line);
                }
            }
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.insert_str(&ch.to_string());
            }
            _ => {}
        }
    }

    fn submit_input(&mut self) -> Option<String> {
        let value = self.input.trim().to_string();
        self.input.clear();
        self.cursor = 0;
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn clamp_cursor(&self, idx: usize) -> usize {
        let idx = idx.min(self.input.len());
        (0..=idx)
            .rev()
            .find(|&i| self.input.is_char_boundary(i))
            .unwrap_or(0)
    }

    fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor(idx);
        (0..i)
            .rev()
            .find(|&j| self.input.is_char_boundary(j))
            .unwrap_or(0)
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor(idx);
        (i + 1..=self.input.len())
            .find(|&j| self.input.is_char_boundary(j))
            .unwrap_or(self.input.len())
    }

    fn insert_str(&mut self, value: &str) {
        // Commands are single-line; pasted newlines become spaces.
        let value = value.replace(['\r', '\n'], " ");
        let cursor = self.clamp_cursor(self.cursor);
        self.input.insert_str(cursor, &value);
        self.cursor = cursor + value.len();
    }

    fn backspace(&mut self) {
        let end = self.clamp_cursor(self.cursor);
        if end == 0 {
            return;
        }
        let start = self.prev_char_boundary(end);
        self.input.replace_range(start..end, "");
        self.cursor = start;
    }

    fn delete(&mut self) {
        let start = self.clamp_cursor(self.cursor);
        if start >= self.input.len() {
            return;
        }
        let end = self.next_char_boundary(start);
        self.input.replace_range(start..end, "");
        self.cursor = start;
    }
}

fn status_word(status: UploadStatus) -> &'static str {
    match status {
        UploadStatus::NotUploaded => "none",
        UploadStatus::Uploading => "uploading",
        UploadStatus::Uploaded => "uploaded",
    }
}

fn state_word(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "idle",
        SessionState::Streaming => "streaming",
        SessionState::Completed => "completed",
        SessionState::Failed => "failed",
    }
}
