// src/progress.rs

//! Download progress reporting
//!
//! Wraps an indicatif bar that tracks bytes received against the declared
//! content length. When the server does not declare one, a fixed estimate
//! stands in so the bar still moves; it has no effect on the download.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Size assumed for an artifact whose response has no content length
pub const UNKNOWN_LENGTH_ESTIMATE: u64 = 17_320_068;

/// Progress of a single artifact download
pub struct DownloadProgress {
    bar: ProgressBar,
    estimated: bool,
}

impl DownloadProgress {
    /// Create a tracker for a download of `content_length` bytes
    ///
    /// `visible` controls whether anything is drawn to stderr.
    pub fn new(label: &str, content_length: Option<u64>, visible: bool) -> Self {
        let (length, estimated) = match content_length {
            Some(len) if len > 0 => (len, false),
            _ => (UNKNOWN_LENGTH_ESTIMATE, true),
        };

        let bar = if visible {
            ProgressBar::with_draw_target(Some(length), ProgressDrawTarget::stderr())
        } else {
            ProgressBar::hidden()
        };
        bar.set_length(length);

        if let Ok(style) = ProgressStyle::with_template(
            "-> Downloading {msg} [{bar:40}] {percent}% {bytes}/{total_bytes} {eta}",
        ) {
            bar.set_style(style.progress_chars("= "));
        }
        bar.set_message(label.to_string());

        Self { bar, estimated }
    }

    /// Record `bytes` more bytes received
    pub fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
        if self.estimated && self.bar.position() > self.length() {
            self.bar.set_length(self.bar.position());
        }
    }

    /// Whether the length is an estimate rather than the declared size
    pub fn is_estimated(&self) -> bool {
        self.estimated
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> u64 {
        self.bar.length().unwrap_or(UNKNOWN_LENGTH_ESTIMATE)
    }

    /// Fraction of the (possibly estimated) total received so far
    pub fn fraction(&self) -> f64 {
        let length = self.length().max(1);
        (self.position().min(length) as f64) / (length as f64)
    }

    pub fn finish(&self) {
        if self.estimated {
            self.bar.set_length(self.bar.position());
        }
        self.bar.finish();
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
