//! Streaming artifact download with bounded-rate progress reporting.
//!
//! The response body is written straight to disk. Progress goes to a
//! [`Reporter`] at most [`REPORT_INTERVAL`] apart, and every fetch ends with
//! one synchronous final report before it returns, so no progress output can
//! trail behind the caller.

use std::path::Path;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

/// Minimum spacing between two progress reports (roughly 60 per second).
pub const REPORT_INTERVAL: Duration = Duration::from_micros(16_667);

/// Errors raised while downloading an artifact.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Connection failure or non-2xx status.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Destination file could not be created or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The server did not declare a body size.
    #[error("failed to get Content-Length header for {url}")]
    MissingContentLength {
        /// Requested URL
        url: String,
    },

    /// The body ended before the declared size was reached.
    #[error("download truncated: expected {expected} bytes, got {actual}")]
    Incomplete {
        /// Declared size
        expected: u64,
        /// Bytes received
        actual: u64,
    },
}

/// One in-flight transfer.
#[derive(Debug, Clone)]
pub struct DownloadTask<'a> {
    /// Source URL
    pub url: &'a str,
    /// Destination file, truncated on open
    pub dest: &'a Path,
    /// Size declared by the server
    pub expected_size: u64,
}

/// Rate limiter for progress reports.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    /// Create a throttle letting one report through per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns true (and arms the timer) if a report may be emitted now.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Download `url` to `dest`, overwriting it. Returns the number of bytes written.
///
/// `label` names the artifact in progress reports.
///
/// # Errors
///
/// Fails on connection errors, non-2xx statuses, a missing
/// `Content-Length`, a short body, or any local I/O error. There is no retry
/// and no resume; a partial `dest` may remain on disk.
pub async fn fetch(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &dyn Reporter,
) -> Result<u64, DownloadError> {
    let started = Instant::now();
    match stream_to_file(client, url, dest, label, reporter).await {
        Ok(bytes) => {
            reporter.download_finished(label, bytes, started.elapsed().as_secs_f64());
            Ok(bytes)
        }
        Err(e) => {
            reporter.download_failed(label, &e.to_string());
            Err(e)
        }
    }
}

async fn stream_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &dyn Reporter,
) -> Result<u64, DownloadError> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let task = DownloadTask {
        url,
        dest,
        expected_size: response
            .content_length()
            .ok_or_else(|| DownloadError::MissingContentLength {
                url: url.to_string(),
            })?,
    };
    tracing::debug!(
        url = task.url,
        dest = %task.dest.display(),
        size = task.expected_size,
        "downloading"
    );

    let mut file = File::create(task.dest).await?;
    let mut stream = response.bytes_stream();
    let mut throttle = ProgressThrottle::new(REPORT_INTERVAL);
    let mut downloaded: u64 = 0;
    let mut reported: u64 = 0;

    reporter.downloading(label, 0, Some(task.expected_size));

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        if throttle.ready() {
            reporter.downloading(label, downloaded, Some(task.expected_size));
            reported = downloaded;
        }
    }
    file.flush().await?;

    if downloaded != task.expected_size {
        return Err(DownloadError::Incomplete {
            expected: task.expected_size,
            actual: downloaded,
        });
    }

    // The throttle may have swallowed the last chunk.
    if reported != downloaded {
        reporter.downloading(label, downloaded, Some(task.expected_size));
    }
    Ok(downloaded)
}
