//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation.

/// Observer for user-facing progress.
///
/// Downloads call [`downloading`](Reporter::downloading) at a bounded rate
/// and always end with exactly one of
/// [`download_finished`](Reporter::download_finished) or
/// [`download_failed`](Reporter::download_failed) before the download call
/// returns. Implementations may rely on no further progress for that label
/// arriving afterwards.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Downloading engine").
    fn section(&self, title: &str);

    /// Updates the progress of a download.
    fn downloading(&self, label: &str, current: u64, total: Option<u64>);

    /// Final report for a download that completed.
    fn download_finished(&self, label: &str, bytes: u64, elapsed_secs: f64);

    /// Final report for a download that failed.
    fn download_failed(&self, label: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, label: &str, current: u64, total: Option<u64>) {
        (**self).downloading(label, current, total);
    }
    fn download_finished(&self, label: &str, bytes: u64, elapsed_secs: f64) {
        (**self).download_finished(label, bytes, elapsed_secs);
    }
    fn download_failed(&self, label: &str, reason: &str) {
        (**self).download_failed(label, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., scripting, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn download_finished(&self, _: &str, _: u64, _: f64) {}
    fn download_failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
