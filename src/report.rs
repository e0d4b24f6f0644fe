//! Operator-facing reporting seams.
//!
//! The watch lifecycle talks to three narrow traits instead of a terminal:
//! notifications for things the operator must see, an append-only log for
//! details, and a status indicator summarizing how many watches are active.
//! Tests swap in recording fakes; the console implementations below are the
//! production wiring.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{debug_event, log_event};

/// User-visible notifications, in increasing severity.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Append-only detail log.
pub trait LogSink: Send + Sync {
    fn append_line(&self, line: &str);
}

/// Watch-count indicator. Refreshed after every lifecycle mutation.
pub trait StatusReporter: Send + Sync {
    fn refresh(&self, watcher_count: usize);
}

/// Prints notifications to the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("Warning: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("Error: {message}");
    }
}

/// Routes detail lines into the tracing log.
pub struct ConsoleLog;

impl LogSink for ConsoleLog {
    fn append_line(&self, line: &str) {
        log_event!("watch", line);
    }
}

/// Prints the watcher count when it changes, staying quiet at zero.
#[derive(Default)]
pub struct ConsoleStatus {
    last: AtomicUsize,
}

impl StatusReporter for ConsoleStatus {
    fn refresh(&self, watcher_count: usize) {
        let previous = self.last.swap(watcher_count, Ordering::Relaxed);
        if previous == watcher_count {
            return;
        }
        if watcher_count > 0 {
            println!("Sass Watchers: {watcher_count}");
        } else {
            debug_event!("status", "indicator hidden");
        }
    }
}
