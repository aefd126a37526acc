//! Sample formats and audio format conversion utilities.
//!
//! This module provides:
//! - The [`SampleFormat`] enumeration shared by every stream and adapter
//! - Sample format conversion (every format ↔ f32)
//! - Channel remapping (mono ↔ stereo and beyond)
//! - Sample rate conversion (resampling)

mod convert;
mod resample;

pub use convert::{
    decode_to_f32, encode_from_f32, f32_to_i16, f32_to_i24, f32_to_i32, f32_to_u8, i16_to_f32,
    i24_to_f32, i32_to_f32, remap_channels, u8_to_f32,
};
pub use resample::{resample, resample_interleaved};

use std::fmt;

/// PCM sample formats supported by all stream kinds.
///
/// The set is fixed; it determines the number of bytes per sample and the
/// in-memory encoding of frame blocks. `S24` is packed 3-byte little-endian
/// signed; everything else is the obvious native-endian machine type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// Format is not known (placeholder; never valid for a stream).
    #[default]
    Unknown,
    /// Unsigned 8-bit, biased around 128.
    U8,
    /// Signed 16-bit.
    S16,
    /// Signed 24-bit, packed into 3 bytes.
    S24,
    /// Signed 32-bit.
    S32,
    /// 32-bit float in [-1.0, 1.0].
    F32,
}

impl SampleFormat {
    /// Returns the size of one sample in bytes (0 for `Unknown`).
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::S32 => 4,
            Self::F32 => 4,
        }
    }

    /// Returns the size of one frame (one sample per channel) in bytes.
    #[must_use]
    pub fn bytes_per_frame(self, channels: u16) -> usize {
        self.bytes_per_sample() * channels as usize
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S24 => "s24",
            Self::S32 => "s32",
            Self::F32 => "f32",
        };
        f.write_str(name)
    }
}
