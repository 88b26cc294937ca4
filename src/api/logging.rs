use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_LOG_PATH: &str = "/tmp/pact-stream.log";
const DEBUG_STREAM_ENV: &str = "PACT_DEBUG_STREAM";
const LOG_PATH_ENV: &str = "PACT_LOG_PATH";

pub fn stream_debug_enabled() -> bool {
    std::env::var(DEBUG_STREAM_ENV)
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn emit_stream_frame(frame: &str) {
    let message = format!("PACT_STREAM frame:\n{frame}\n");
    emit_log_message(&message);
}

pub fn emit_transfer_failure(context: &str, detail: &str) {
    let message = format!("PACT_API ERROR {context}: {detail}\n");
    emit_log_message(&message);
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprintln!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
