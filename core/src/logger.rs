// Global boot log for Morpheus
//
// Fixed-capacity ring of static messages. Works before any console or
// allocator is available; the boot UI drains it when it wants to.

use alloc::vec::Vec;
use spin::Mutex;

const MAX_LOG_ENTRIES: usize = 64;

/// Log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Expected, uninteresting events (skipped devices)
    Trace,
    /// Normal progress
    Info,
    /// Something failed but the boot continues
    Warn,
}

/// One log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity
    pub level: Level,
    /// Message text
    pub message: &'static str,
}

struct LogBuffer {
    entries: [Option<LogRecord>; MAX_LOG_ENTRIES],
    next: usize,
    total: usize,
}

static LOG: Mutex<LogBuffer> = Mutex::new(LogBuffer {
    entries: [None; MAX_LOG_ENTRIES],
    next: 0,
    total: 0,
});

/// Append a message, overwriting the oldest once the ring is full.
pub fn log(level: Level, message: &'static str) {
    let mut log = LOG.lock();
    let idx = log.next;
    log.entries[idx] = Some(LogRecord { level, message });
    log.next = (idx + 1) % MAX_LOG_ENTRIES;
    log.total = log.total.saturating_add(1);
}

/// Number of retained entries
pub fn log_count() -> usize {
    LOG.lock().total.min(MAX_LOG_ENTRIES)
}

/// Retained entries, oldest first
pub fn records() -> Vec<LogRecord> {
    let log = LOG.lock();
    let count = log.total.min(MAX_LOG_ENTRIES);
    let start = if log.total > MAX_LOG_ENTRIES { log.next } else { 0 };

    (0..count)
        .filter_map(|i| log.entries[(start + i) % MAX_LOG_ENTRIES])
        .collect()
}

/// Drop all entries
pub fn clear() {
    let mut log = LOG.lock();
    log.entries = [None; MAX_LOG_ENTRIES];
    log.next = 0;
    log.total = 0;
}

/// Log a static message at trace level
#[macro_export]
macro_rules! log_trace {
    ($msg:expr) => {
        $crate::logger::log($crate::logger::Level::Trace, $msg)
    };
}

/// Log a static message at info level
#[macro_export]
macro_rules! log_info {
    ($msg:expr) => {
        $crate::logger::log($crate::logger::Level::Info, $msg)
    };
}

/// Log a static message at warn level
#[macro_export]
macro_rules! log_warn {
    ($msg:expr) => {
        $crate::logger::log($crate::logger::Level::Warn, $msg)
    };
}
