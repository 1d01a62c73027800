use std::collections::VecDeque;
use std::sync::Mutex;

/// Ring buffer holding the most recent stderr lines of a child process.
#[derive(Debug)]
pub struct StderrBuffer {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl StderrBuffer {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lines: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn snapshot(&self) -> String {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }

    /// Tail of the snapshot, at most `max_chars` characters.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let snapshot = self.snapshot();
        let total = snapshot.chars().count();
        if total <= max_chars {
            return snapshot;
        }
        snapshot.chars().skip(total - max_chars).collect()
    }
}

impl Default for StderrBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
