//! Buffers Rust log lines so the host app can drain and show them, and forwards each kept
//! line to the `log` facade.

use once_cell::sync::Lazy;
use std::sync::Mutex;

static RUST_LOG_BUFFER: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));

const MAX_BUFFER_LEN: usize = 500;

fn is_problem(lower: &str) -> bool {
    lower.contains("error") || lower.contains("warn") || lower.contains("failed")
}

fn should_log(s: &str) -> bool {
    let lower = s.to_lowercase();
    if is_problem(&lower) {
        return true;
    }
    // History derivation and lookup fallbacks; storage chatter is dropped.
    lower.contains("history") || lower.contains("lookup") || lower.contains("storage::init")
}

/// Push a log line. Called by the rust_log! macro.
pub fn push(s: String) {
    if !should_log(&s) {
        return;
    }
    if is_problem(&s.to_lowercase()) {
        log::warn!("{}", s);
    } else {
        log::debug!("{}", s);
    }
    if let Ok(mut v) = RUST_LOG_BUFFER.lock() {
        v.push(s);
        let n = v.len();
        if n > MAX_BUFFER_LEN {
            v.drain(0..n - MAX_BUFFER_LEN);
        }
    }
}

/// Drain and clear buffered log lines.
pub fn drain_rust_logs() -> Vec<String> {
    RUST_LOG_BUFFER
        .lock()
        .map(|mut v| std::mem::take(&mut *v))
        .unwrap_or_default()
}

#[macro_export]
macro_rules! rust_log {
    ($($t:tt)*) => {
        $crate::log_bridge::push(format!($($t)*))
    };
}
