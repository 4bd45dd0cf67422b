//! Debug Panel
//!
//! Toggleable log view over a [`ConsoleHandle`]. New console lines reach
//! the view at most once per flush interval and the view keeps a bounded
//! number of lines.

use std::collections::VecDeque;

use crate::console::ConsoleHandle;

/// Debug panel view state
#[derive(Debug)]
pub struct DebugPanel {
    console: ConsoleHandle,
    visible: bool,
    lines: VecDeque<String>,
    max_lines: usize,
    flush_interval_ms: u64,
    last_flush_ms: Option<u64>,
    next_sequence: u64,
}

impl DebugPanel {
    pub fn new(console: ConsoleHandle, max_lines: usize, flush_interval_ms: u64) -> Self {
        Self {
            console,
            visible: false,
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
            flush_interval_ms,
            last_flush_ms: None,
            next_sequence: 0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show or hide the panel; returns the new visibility
    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// Pull new console lines into the view, throttled.
    /// Returns true if the view changed.
    pub fn flush(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_flush_ms {
            if now_ms < last + self.flush_interval_ms {
                return false;
            }
        }
        self.last_flush_ms = Some(now_ms);

        let console = self.console.lock();
        let before = self.next_sequence;
        for message in console.since(self.next_sequence) {
            self.lines.push_back(message.to_string());
            self.next_sequence = message.sequence + 1;
        }
        // Lines evicted from the console before we saw them are skipped.
        self.next_sequence = self.next_sequence.max(console.next_sequence());
        drop(console);

        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
        self.next_sequence != before
    }

    pub fn lines(&self) -> &VecDeque<String> {
        &self.lines
    }

    /// Text shown in the panel body
    pub fn render(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
