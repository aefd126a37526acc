//! Stream configuration.

use crate::error::BlockAudioError;
use crate::format::SampleFormat;

/// The fixed format of a stream: sample format, channel layout, rate, and
/// block size.
///
/// A `StreamSpec` is chosen at construction and never changes for the
/// lifetime of a stream; every getter on a stream echoes these values back.
///
/// # Example
///
/// ```
/// use block_audio::{SampleFormat, StreamSpec};
///
/// let spec = StreamSpec {
///     format: SampleFormat::S16,
///     channels: 1,
///     sample_rate: 44_100,
///     frame_count: 128,
/// };
/// assert_eq!(spec.bytes_per_block(), 2 * 128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    /// PCM sample format of every block.
    pub format: SampleFormat,
    /// Number of interleaved channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of frames exchanged per block.
    pub frame_count: usize,
}

impl Default for StreamSpec {
    fn default() -> Self {
        Self {
            format: SampleFormat::F32,
            channels: 2,
            sample_rate: 44_100,
            frame_count: 512,
        }
    }
}

impl StreamSpec {
    /// Returns the size of one frame in bytes.
    #[must_use]
    pub fn bytes_per_frame(&self) -> usize {
        self.format.bytes_per_frame(self.channels)
    }

    /// Returns the size of one full block in bytes.
    #[must_use]
    pub fn bytes_per_block(&self) -> usize {
        self.bytes_per_frame() * self.frame_count
    }

    /// Checks the spec for values no stream can work with.
    pub fn validate(&self) -> Result<(), BlockAudioError> {
        if self.format == SampleFormat::Unknown {
            return Err(BlockAudioError::UnsupportedFormat {
                format: self.format,
            });
        }
        if self.channels == 0 {
            return Err(BlockAudioError::invalid("channel count must be non-zero"));
        }
        if self.sample_rate == 0 {
            return Err(BlockAudioError::invalid("sample rate must be non-zero"));
        }
        if self.frame_count == 0 {
            return Err(BlockAudioError::invalid("frame count must be non-zero"));
        }
        Ok(())
    }
}
