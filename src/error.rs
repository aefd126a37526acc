//! Error types for block-audio.
//!
//! One taxonomy covers both stream kinds. End-of-stream is *not* an error:
//! sources signal it with a zero-length read. Failures inside the real-time
//! device callback never unwind across the driver boundary; they force a
//! stop and are surfaced through the event callback instead (see
//! [`StreamEvent`](crate::StreamEvent)).

use std::path::PathBuf;

use crate::format::SampleFormat;

/// Errors produced by streams, adapters, and devices.
#[derive(Debug, thiserror::Error)]
pub enum BlockAudioError {
    /// A source or sink could not be opened (bad path, or the codec rejected
    /// the file).
    #[error("failed to open {}: {reason}", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// What the codec or filesystem reported.
        reason: String,
    },

    /// A seek landed outside the source's total frame count.
    #[error("seek to frame {frame} out of range (total {total})")]
    Seek {
        /// The requested frame index.
        frame: u64,
        /// Total frames in the source.
        total: u64,
    },

    /// An I/O failure while reading mid-stream (distinct from end-of-stream,
    /// which is a zero-length read).
    #[error("read failed: {reason}")]
    Read {
        /// What went wrong.
        reason: String,
    },

    /// An I/O failure while writing to a sink.
    #[error("write failed for {}: {reason}", path.display())]
    Write {
        /// Path of the sink that failed.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A hardware activation or deactivation failure, wrapping the driver's
    /// error text.
    #[error("device error: {reason}")]
    Device {
        /// What the driver or backend reported.
        reason: String,
    },

    /// The caller requested a sample format the active codec or device path
    /// cannot produce.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The rejected format.
        format: SampleFormat,
    },

    /// Invalid construction parameters (zero channels, missing file paths in
    /// offline mode, and so on).
    #[error("invalid stream configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },
}

impl BlockAudioError {
    /// Creates a `Device` error from any displayable driver error.
    pub(crate) fn device(err: impl std::fmt::Display) -> Self {
        Self::Device {
            reason: err.to_string(),
        }
    }

    /// Creates an `Open` error for the given path.
    pub(crate) fn open(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Open {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Creates a `Write` error for the given path.
    pub(crate) fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Creates an `InvalidConfig` error.
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
