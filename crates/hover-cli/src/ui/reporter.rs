//! Terminal implementation of the core `Reporter`.
//!
//! Download progress redraws a single line on stderr. The final report for a
//! download replaces that line and ends it, so later output starts clean.

use std::io::{Write, stderr};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use hover_core::Reporter;

/// Reporter drawing on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalReporter;

impl TerminalReporter {
    pub fn new() -> Self {
        Self
    }

    fn redraw(line: &str, finish: bool) {
        let mut err = stderr().lock();
        // Progress is cosmetic; a broken terminal must not fail the build.
        let _ = err.queue(MoveToColumn(0));
        let _ = err.queue(Clear(ClearType::CurrentLine));
        let _ = write!(err, "{line}");
        if finish {
            let _ = writeln!(err);
        }
        let _ = err.flush();
    }
}

impl Reporter for TerminalReporter {
    fn section(&self, title: &str) {
        eprintln!("{}", title.bold());
    }

    fn downloading(&self, label: &str, current: u64, total: Option<u64>) {
        Self::redraw(&format_progress(label, current, total), false);
    }

    fn download_finished(&self, label: &str, bytes: u64, elapsed_secs: f64) {
        let line = format!(
            "  {label:<28} {} {}",
            format_size(bytes),
            format!("({elapsed_secs:.1}s)").dark_grey()
        );
        Self::redraw(&line, true);
    }

    fn download_failed(&self, label: &str, reason: &str) {
        let line = format!("  {label:<28} {}", format!("failed: {reason}").red());
        Self::redraw(&line, true);
    }

    fn info(&self, msg: &str) {
        eprintln!("{msg}");
    }

    fn warning(&self, msg: &str) {
        eprintln!("{} {msg}", "warning:".yellow().bold());
    }
}

/// One progress line: label, percentage and transferred size.
pub fn format_progress(label: &str, current: u64, total: Option<u64>) -> String {
    match total.filter(|&t| t > 0) {
        Some(total) => {
            let percent = (current as f64 / total as f64 * 100.0).min(100.0);
            format!(
                "  {label:<28} {percent:>5.1}% ({} / {})",
                format_size(current),
                format_size(total)
            )
        }
        None => format!("  {label:<28} {}", format_size(current)),
    }
}

/// Format bytes for human-readable display
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}
