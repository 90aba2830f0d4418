//! Console Logger
//!
//! `log` backend for the browser: every record goes to the devtools console
//! at the matching level, and the last N formatted lines are kept in memory
//! so they can be dumped when something goes wrong.

use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use wasm_bindgen::JsValue;

static LOGGER: OnceLock<ConsoleLogger> = OnceLock::new();

/// Fixed-size buffer that drops the oldest line when full
#[derive(Debug, Clone)]
pub struct RingBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub struct ConsoleLogger {
    level: LevelFilter,
    buffer: Mutex<RingBuffer>,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter, capacity: usize) -> Self {
        Self {
            level,
            buffer: Mutex::new(RingBuffer::new(capacity)),
        }
    }

    pub fn recent_lines(&self) -> Vec<String> {
        match self.buffer.lock() {
            Ok(buffer) => buffer.lines(),
            Err(poisoned) => poisoned.into_inner().lines(),
        }
    }

    /// Recent lines as one newline-separated block
    pub fn dump(&self) -> String {
        self.recent_lines().join("\n")
    }

    fn remember(&self, line: String) {
        match self.buffer.lock() {
            Ok(mut buffer) => buffer.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

/// `[HH:MM:SS.mmm LEVEL target] message`
pub fn format_line(timestamp: &str, level: Level, target: &str, message: &str) -> String {
    format!("[{} {:<5} {}] {}", timestamp, level, target, message)
}

fn write_console(level: Level, line: &str) {
    let value = JsValue::from_str(line);
    match level {
        Level::Error => web_sys::console::error_1(&value),
        Level::Warn => web_sys::console::warn_1(&value),
        Level::Info => web_sys::console::info_1(&value),
        Level::Debug => web_sys::console::log_1(&value),
        Level::Trace => web_sys::console::debug_1(&value),
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        let line = format_line(
            &timestamp,
            record.level(),
            record.target(),
            &record.args().to_string(),
        );
        write_console(record.level(), &line);
        self.remember(line);
    }

    fn flush(&self) {}
}

/// Install the logger. Only the first call takes effect.
pub fn init_logger(level: LevelFilter, capacity: usize) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| ConsoleLogger::new(level, capacity));
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Lines captured since start-up, oldest first, newline-separated.
/// Empty until [`init_logger`] has run.
pub fn dump_recent() -> String {
    LOGGER.get().map(ConsoleLogger::dump).unwrap_or_default()
}
