// src/display.rs
use std::io::{self, Write};

use crate::scanner::core::Snapshot;

/// Text shown for a snapshot, the console version of the on-screen overlay.
pub fn render_text(snapshot: &Snapshot) -> String {
    let mut lines = Vec::new();
    if snapshot.scanning {
        lines.push("Scanning...".to_string());
    }
    if let Some(completed) = &snapshot.last_result {
        if !completed.result.label.is_empty() {
            lines.push(format!(
                "[{}] {}",
                completed.received_at.format("%H:%M:%S"),
                completed.result
            ));
        }
    }
    lines.join("\n")
}

/// Render callback for the scanner that prints to stdout.
pub fn print_snapshot(snapshot: &Snapshot) {
    let text = render_text(snapshot);
    if text.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "\n{}", text);
    let _ = stdout.flush();
}
