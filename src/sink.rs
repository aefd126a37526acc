//! File-backed frame sink (encoder adapter).
//!
//! [`FrameSink`] is the push side of the pipeline: it accepts interleaved
//! frame blocks in this crate's in-memory layout and hands them to the WAV
//! encoder. Closing flushes and finalizes the container header.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::BlockAudioError;
use crate::format::SampleFormat;

/// Container format a [`FrameSink`] encodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingFormat {
    /// RIFF WAVE container.
    #[default]
    Wav,
}

impl std::fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wav => write!(f, "wav"),
        }
    }
}

/// A push-based encoder adapter over an audio file.
///
/// Samples are expected interleaved, in native byte order, in the layout
/// [`SampleFormat`] describes (3 bytes per sample for `S24`). Frames are
/// encoded as they arrive; [`FrameSink::close`] finalizes the file.
pub struct FrameSink {
    path: PathBuf,
    encoding: EncodingFormat,
    format: SampleFormat,
    channels: u16,
    sample_rate: u32,
    /// `None` once closed.
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    frames_written: u64,
}

impl FrameSink {
    /// Opens an output file for writing.
    ///
    /// Fails with `UnsupportedFormat` for [`SampleFormat::Unknown`] and
    /// `Write` if the file cannot be created.
    pub fn open(
        path: impl AsRef<Path>,
        encoding: EncodingFormat,
        format: SampleFormat,
        channels: u16,
        sample_rate: u32,
    ) -> Result<Self, BlockAudioError> {
        let path = path.as_ref();
        let EncodingFormat::Wav = encoding;

        if format == SampleFormat::Unknown {
            return Err(BlockAudioError::UnsupportedFormat { format });
        }
        if channels == 0 || sample_rate == 0 {
            return Err(BlockAudioError::invalid(
                "sink channel count and sample rate must be non-zero",
            ));
        }

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: (format.bytes_per_sample() * 8) as u16,
            sample_format: match format {
                SampleFormat::F32 => hound::SampleFormat::Float,
                _ => hound::SampleFormat::Int,
            },
        };
        let writer =
            hound::WavWriter::create(path, spec).map_err(|e| BlockAudioError::write(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            encoding,
            format,
            channels,
            sample_rate,
            writer: Some(writer),
            frames_written: 0,
        })
    }

    /// Returns the container format this sink encodes into.
    #[must_use]
    pub fn encoding_format(&self) -> EncodingFormat {
        self.encoding
    }

    /// Returns the sample format frames must arrive in.
    #[must_use]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Returns the channel count.
    #[must_use]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the path this sink writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the total number of frames written so far.
    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Encodes `frame_count` frames from `buf`.
    ///
    /// Returns the number of frames written, which is `frame_count` unless
    /// the encoder fails. Writing to a closed sink is a `Write` error.
    pub fn write(&mut self, buf: &[u8], frame_count: usize) -> Result<usize, BlockAudioError> {
        let bpf = self.format.bytes_per_frame(self.channels);
        let needed = bpf * frame_count;
        if buf.len() < needed {
            return Err(BlockAudioError::Write {
                path: self.path.clone(),
                reason: format!(
                    "block holds {} bytes but {frame_count} frames need {needed}",
                    buf.len()
                ),
            });
        }

        let Some(writer) = &mut self.writer else {
            return Err(BlockAudioError::Write {
                path: self.path.clone(),
                reason: "sink is closed".into(),
            });
        };

        let format = self.format;
        let bps = format.bytes_per_sample();
        let result: Result<(), hound::Error> = buf[..needed].chunks_exact(bps).try_for_each(
            |sample| match format {
                SampleFormat::U8 => writer.write_sample((i16::from(sample[0]) - 128) as i8),
                SampleFormat::S16 => {
                    writer.write_sample(i16::from_ne_bytes([sample[0], sample[1]]))
                }
                SampleFormat::S24 => {
                    // Sign-extend the 3-byte little-endian sample
                    let v = i32::from_le_bytes([0, sample[0], sample[1], sample[2]]) >> 8;
                    writer.write_sample(v)
                }
                SampleFormat::S32 => writer.write_sample(i32::from_ne_bytes([
                    sample[0], sample[1], sample[2], sample[3],
                ])),
                SampleFormat::F32 => writer.write_sample(f32::from_ne_bytes([
                    sample[0], sample[1], sample[2], sample[3],
                ])),
                SampleFormat::Unknown => unreachable!("rejected at open"),
            },
        );
        result.map_err(|e| BlockAudioError::write(&self.path, e))?;

        self.frames_written += frame_count as u64;
        Ok(frame_count)
    }

    /// Finalizes the container and releases the file. Idempotent.
    pub fn close(&mut self) -> Result<(), BlockAudioError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(|e| BlockAudioError::write(&self.path, e))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("frames_written", &self.frames_written)
            .field("closed", &self.writer.is_none())
            .finish()
    }
}
