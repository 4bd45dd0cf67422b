//! Console
//!
//! Bounded message log shared between the tracing layer and the panel.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Console log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Self::Trace,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::ERROR => Self::Error,
        }
    }
}

/// Console message
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    /// Monotonic position in the console, survives eviction
    pub sequence: u64,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
    pub timestamp: u64,
}

impl fmt::Display for ConsoleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level.as_str(), self.target, self.message)
    }
}

/// Console
#[derive(Debug)]
pub struct Console {
    messages: VecDeque<ConsoleMessage>,
    max_messages: usize,
    next_sequence: u64,
    dropped: u64,
}

impl Console {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages: max_messages.max(1),
            next_sequence: 0,
            dropped: 0,
        }
    }

    /// Append a message, evicting the oldest past the cap
    pub fn push(&mut self, level: LogLevel, target: &str, message: String) {
        let msg = ConsoleMessage {
            sequence: self.next_sequence,
            level,
            target: target.to_string(),
            message,
            timestamp: current_time_ms(),
        };
        self.next_sequence += 1;

        self.messages.push_back(msg);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
            self.dropped += 1;
        }
    }

    pub fn info(&mut self, target: &str, message: &str) {
        self.push(LogLevel::Info, target, message.to_string());
    }

    pub fn warn(&mut self, target: &str, message: &str) {
        self.push(LogLevel::Warn, target, message.to_string());
    }

    pub fn error(&mut self, target: &str, message: &str) {
        self.push(LogLevel::Error, target, message.to_string());
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Get all retained messages
    pub fn messages(&self) -> &VecDeque<ConsoleMessage> {
        &self.messages
    }

    /// Retained messages with `sequence >= from`
    pub fn since(&self, from: u64) -> impl Iterator<Item = &ConsoleMessage> {
        self.messages.iter().filter(move |m| m.sequence >= from)
    }

    /// Get messages by level
    pub fn get_by_level(&self, level: LogLevel) -> Vec<&ConsoleMessage> {
        self.messages.iter().filter(|m| m.level == level).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most messages retained at once
    pub fn capacity(&self) -> usize {
        self.max_messages
    }

    /// Messages evicted by the cap so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a console
#[derive(Debug, Clone, Default)]
pub struct ConsoleHandle {
    inner: Arc<Mutex<Console>>,
}

impl ConsoleHandle {
    pub fn new(console: Console) -> Self {
        Self {
            inner: Arc::new(Mutex::new(console)),
        }
    }

    /// Lock the console. A poisoned lock still yields the log.
    pub fn lock(&self) -> MutexGuard<'_, Console> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, level: LogLevel, target: &str, message: String) {
        self.lock().push(level, target, message);
    }
}

fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
