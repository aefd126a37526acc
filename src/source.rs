//! File-backed frame source (decoder adapter).
//!
//! [`FrameSource`] wraps the WAV codec and this crate's conversion helpers
//! behind the pull-based contract the streams consume: fixed-size block
//! reads, seeking, looping, and zero-padded short reads. The decode and any
//! format/channel/rate conversion happen eagerly at open time, so `read` is
//! a plain copy and is safe to call from a real-time callback.

use std::path::{Path, PathBuf};

use crate::error::BlockAudioError;
use crate::format::{self, SampleFormat};

/// Metadata of an audio file, independent of any stream instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFileInfo {
    /// Native sample format of the file.
    pub format: SampleFormat,
    /// Native channel count.
    pub channels: u16,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
    /// Total number of frames in the file.
    pub total_frame_count: u64,
}

/// Queries the metadata of an audio file without opening a stream.
///
/// # Example
///
/// ```no_run
/// let info = block_audio::audio_file_info("music.wav")?;
/// println!("{} Hz, {} channels", info.sample_rate, info.channels);
/// # Ok::<(), block_audio::BlockAudioError>(())
/// ```
pub fn audio_file_info(path: impl AsRef<Path>) -> Result<AudioFileInfo, BlockAudioError> {
    let path = path.as_ref();
    let reader = hound::WavReader::open(path).map_err(|e| BlockAudioError::open(path, e))?;
    let spec = reader.spec();

    Ok(AudioFileInfo {
        format: native_format(path, &spec)?,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        total_frame_count: u64::from(reader.duration()),
    })
}

/// Output conversion requested when opening a [`FrameSource`].
///
/// `None` fields keep the file's native value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceConfig {
    /// Target sample format.
    pub format: Option<SampleFormat>,
    /// Target channel count.
    pub channels: Option<u16>,
    /// Target sample rate in Hz.
    pub sample_rate: Option<u32>,
}

/// A pull-based decoder adapter over an audio file.
///
/// Reads deliver interleaved frames in the source's *output* format (the
/// requested conversion target, or the file's native format). Short reads at
/// end-of-stream leave the unread tail of the destination zero-filled, so
/// callers may always treat the full block as meaningful (silence-padded).
///
/// # Example
///
/// ```no_run
/// use block_audio::FrameSource;
///
/// let mut source = FrameSource::open("music.wav")?;
/// let mut block = vec![0u8; source.format().bytes_per_frame(source.channels()) * 128];
/// while source.read(&mut block, 128)? > 0 {
///     // process the block
/// }
/// # Ok::<(), block_audio::BlockAudioError>(())
/// ```
pub struct FrameSource {
    path: PathBuf,
    format: SampleFormat,
    channels: u16,
    sample_rate: u32,
    total_frames: u64,
    /// Interleaved sample bytes in the output format; `None` once closed.
    data: Option<Vec<u8>>,
    cursor: u64,
    looping: bool,
}

impl FrameSource {
    /// Opens a file in its native format.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BlockAudioError> {
        Self::open_with(path, &SourceConfig::default())
    }

    /// Opens a file, converting to the requested format/channels/rate.
    ///
    /// Fails with an `Open` error if the path is invalid or the codec
    /// rejects the file, and with `UnsupportedFormat` if the target format
    /// is `Unknown`.
    pub fn open_with(
        path: impl AsRef<Path>,
        config: &SourceConfig,
    ) -> Result<Self, BlockAudioError> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path).map_err(|e| BlockAudioError::open(path, e))?;
        let wav_spec = reader.spec();

        let native = native_format(path, &wav_spec)?;
        let format = config.format.unwrap_or(native);
        let channels = config.channels.unwrap_or(wav_spec.channels);
        let sample_rate = config.sample_rate.unwrap_or(wav_spec.sample_rate);

        if format == SampleFormat::Unknown {
            return Err(BlockAudioError::UnsupportedFormat { format });
        }
        if channels == 0 || sample_rate == 0 {
            return Err(BlockAudioError::invalid(
                "source channel count and sample rate must be non-zero",
            ));
        }

        // Conversion goes through f32 and rounds; when the caller wants the
        // file as-is, decode straight to native bytes so samples survive
        // bit-exactly.
        let data = if format == native
            && channels == wav_spec.channels
            && sample_rate == wav_spec.sample_rate
        {
            decode_native(path, &mut reader, &wav_spec)?
        } else {
            let decoded = decode_all(path, &mut reader, &wav_spec)?;
            let remapped = format::remap_channels(&decoded, wav_spec.channels, channels);
            let resampled = format::resample_interleaved(
                &remapped,
                channels,
                wav_spec.sample_rate,
                sample_rate,
            );
            format::encode_from_f32(&resampled, format)
        };

        let total_frames = (data.len() / format.bytes_per_frame(channels)) as u64;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            channels,
            sample_rate,
            total_frames,
            data: Some(data),
            cursor: 0,
            looping: false,
        })
    }

    /// Returns the output sample format.
    #[must_use]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Returns the output channel count.
    #[must_use]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the output sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the total number of frames, after conversion.
    ///
    /// Fixed for the lifetime of the source; looping does not change it, so
    /// a consumer that needs "loop boundary crossed" must track it with
    /// frame arithmetic.
    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Returns the number of frames between the read position and the end.
    #[must_use]
    pub fn available_frames(&self) -> u64 {
        self.total_frames - self.cursor
    }

    /// Returns the current read position in frames.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Returns the path this source was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether end-of-stream wraps back to frame 0.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Enables or disables looping.
    ///
    /// While enabled, a read that hits end-of-stream transparently wraps to
    /// frame 0 and keeps delivering frames. Disabling mid-stream makes the
    /// next end-of-stream final: reads stop at the natural end, never
    /// mid-block.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Reads up to `frame_count` frames into `buf`.
    ///
    /// The first `frame_count` frames' worth of `buf` is zero-filled before
    /// copying, so the tail past the returned count is always silence.
    /// Returns fewer frames than requested only at end-of-stream, and `0`
    /// once exhausted (or closed) and not looping.
    pub fn read(&mut self, buf: &mut [u8], frame_count: usize) -> Result<usize, BlockAudioError> {
        let bpf = self.format.bytes_per_frame(self.channels);
        let needed = bpf * frame_count;
        if buf.len() < needed {
            return Err(BlockAudioError::Read {
                reason: format!(
                    "destination holds {} bytes but {frame_count} frames need {needed}",
                    buf.len()
                ),
            });
        }

        buf[..needed].fill(0);

        let Some(data) = &self.data else {
            return Ok(0);
        };

        let mut filled = 0usize;
        while filled < frame_count {
            let remaining = (self.total_frames - self.cursor) as usize;
            if remaining == 0 {
                if self.looping && self.total_frames > 0 {
                    self.cursor = 0;
                    continue;
                }
                break;
            }

            let n = remaining.min(frame_count - filled);
            let src = self.cursor as usize * bpf;
            let dst = filled * bpf;
            buf[dst..dst + n * bpf].copy_from_slice(&data[src..src + n * bpf]);
            self.cursor += n as u64;
            filled += n;
        }

        Ok(filled)
    }

    /// Repositions the read cursor to `frame_index`.
    ///
    /// Seeking to `total_frames()` is valid and leaves nothing available;
    /// anything beyond fails with a `Seek` error.
    pub fn seek(&mut self, frame_index: u64) -> Result<(), BlockAudioError> {
        if frame_index > self.total_frames {
            return Err(BlockAudioError::Seek {
                frame: frame_index,
                total: self.total_frames,
            });
        }
        self.cursor = frame_index;
        Ok(())
    }

    /// Releases the decoded data. Idempotent; subsequent reads return 0.
    pub fn close(&mut self) {
        self.data = None;
    }
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("total_frames", &self.total_frames)
            .field("position", &self.cursor)
            .field("looping", &self.looping)
            .field("closed", &self.data.is_none())
            .finish()
    }
}

/// Maps a WAV spec onto the crate's sample formats.
fn native_format(path: &Path, spec: &hound::WavSpec) -> Result<SampleFormat, BlockAudioError> {
    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 8) => Ok(SampleFormat::U8),
        (hound::SampleFormat::Int, 16) => Ok(SampleFormat::S16),
        (hound::SampleFormat::Int, 24) => Ok(SampleFormat::S24),
        (hound::SampleFormat::Int, 32) => Ok(SampleFormat::S32),
        (hound::SampleFormat::Float, 32) => Ok(SampleFormat::F32),
        (fmt, bits) => Err(BlockAudioError::open(
            path,
            format!("unsupported WAV sample layout: {bits}-bit {fmt:?}"),
        )),
    }
}

/// Decodes the file straight to this crate's in-memory byte layout for its
/// native format, without an f32 intermediate.
fn decode_native(
    path: &Path,
    reader: &mut hound::WavReader<std::io::BufReader<std::fs::File>>,
    spec: &hound::WavSpec,
) -> Result<Vec<u8>, BlockAudioError> {
    let map_err = |e: hound::Error| BlockAudioError::open(path, e);
    let mut out = Vec::new();

    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 8) => {
            for s in reader.samples::<i8>() {
                out.push((i16::from(s.map_err(map_err)?) + 128) as u8);
            }
        }
        (hound::SampleFormat::Int, 16) => {
            for s in reader.samples::<i16>() {
                out.extend_from_slice(&s.map_err(map_err)?.to_ne_bytes());
            }
        }
        (hound::SampleFormat::Int, 24) => {
            for s in reader.samples::<i32>() {
                out.extend_from_slice(&s.map_err(map_err)?.to_le_bytes()[..3]);
            }
        }
        (hound::SampleFormat::Int, 32) => {
            for s in reader.samples::<i32>() {
                out.extend_from_slice(&s.map_err(map_err)?.to_ne_bytes());
            }
        }
        (hound::SampleFormat::Float, 32) => {
            for s in reader.samples::<f32>() {
                out.extend_from_slice(&s.map_err(map_err)?.to_ne_bytes());
            }
        }
        (fmt, bits) => {
            return Err(BlockAudioError::open(
                path,
                format!("unsupported WAV sample layout: {bits}-bit {fmt:?}"),
            ));
        }
    }

    Ok(out)
}

/// Decodes every sample in the file to interleaved f32.
fn decode_all(
    path: &Path,
    reader: &mut hound::WavReader<std::io::BufReader<std::fs::File>>,
    spec: &hound::WavSpec,
) -> Result<Vec<f32>, BlockAudioError> {
    let map_err = |e: hound::Error| BlockAudioError::open(path, e);

    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => {
            reader.samples::<f32>().map(|s| s.map_err(map_err)).collect()
        }
        (hound::SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map_err(map_err).map(|v| f32::from(v) / 128.0))
            .collect(),
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map_err(map_err).map(format::i16_to_f32))
            .collect(),
        (hound::SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map_err(map_err).map(|v| (f64::from(v) / 8_388_608.0) as f32))
            .collect(),
        (hound::SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map_err(map_err).map(format::i32_to_f32))
            .collect(),
        (fmt, bits) => Err(BlockAudioError::open(
            path,
            format!("unsupported WAV sample layout: {bits}-bit {fmt:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const FRAME_COUNT: usize = 128;

    /// Writes a mono 16-bit ramp of `frames` frames and returns its path.
    fn write_ramp_wav(dir: &Path, frames: usize) -> PathBuf {
        let path = dir.join("ramp.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample((i % 1000) as i16 + 1).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn zero_padded(buf: &[u8], non_zero_bytes: usize) -> bool {
        buf[non_zero_bytes..].iter().all(|&b| b == 0)
    }

    #[test]
    fn test_native_metadata() {
        let dir = tempdir().unwrap();
        let path = write_ramp_wav(dir.path(), 1000);

        let source = FrameSource::open(&path).unwrap();
        assert_eq!(source.format(), SampleFormat::S16);
        assert_eq!(source.channels(), 1);
        assert_eq!(source.sample_rate(), 44_100);
        assert_eq!(source.total_frames(), 1000);
        assert_eq!(source.available_frames(), 1000);
        assert!(!source.is_looping());
    }

    #[test]
    fn test_converted_metadata() {
        let dir = tempdir().unwrap();
        let path = write_ramp_wav(dir.path(), 1000);

        let source = FrameSource::open_with(
            &path,
            &SourceConfig {
                format: Some(SampleFormat::F32),
                channels: Some(2),
                sample_rate: None,
            },
        )
        .unwrap();
        assert_eq!(source.format(), SampleFormat::F32);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 44_100);
        assert_eq!(source.total_frames(), 1000);
    }

    #[test]
    fn test_open_missing_file() {
        let err = FrameSource::open("/nonexistent/missing.wav").unwrap_err();
        assert!(matches!(err, BlockAudioError::Open { .. }));
    }

    #[test]
    fn test_read_totals_and_zero_padding() {
        let dir = tempdir().unwrap();
        // Not a multiple of the block size, so the last read is short
        let path = write_ramp_wav(dir.path(), 1000);
        let mut source = FrameSource::open(&path).unwrap();

        let bpf = source.format().bytes_per_frame(source.channels());
        let mut buf = vec![0u8; bpf * FRAME_COUNT];
        let mut total = 0u64;

        loop {
            let read = source.read(&mut buf, FRAME_COUNT).unwrap();
            assert!(zero_padded(&buf, bpf * read));
            total += read as u64;
            if read == 0 {
                break;
            }
        }

        assert_eq!(total, source.total_frames());
    }

    #[test]
    fn test_looping_wraps_and_disables_cleanly() {
        let dir = tempdir().unwrap();
        let path = write_ramp_wav(dir.path(), 1000);
        let mut source = FrameSource::open(&path).unwrap();

        source.set_looping(true);
        assert!(source.is_looping());

        let bpf = source.format().bytes_per_frame(source.channels());
        let mut buf = vec![0u8; bpf * FRAME_COUNT];
        let mut total = 0u64;

        loop {
            let read = source.read(&mut buf, FRAME_COUNT).unwrap();
            total += read as u64;
            if read == 0 {
                break;
            }
            if total > source.total_frames() {
                // Past the first wrap: let the second pass run out naturally
                source.set_looping(false);
            }
        }

        assert_eq!(total, 2 * source.total_frames());
    }

    #[test]
    fn test_looping_read_crosses_boundary_without_silence() {
        let dir = tempdir().unwrap();
        let path = write_ramp_wav(dir.path(), 100);
        let mut source = FrameSource::open(&path).unwrap();
        source.set_looping(true);

        // The ramp starts at sample value 1, so a silent gap would show up
        // as zero samples inside the block.
        let bpf = source.format().bytes_per_frame(source.channels());
        let mut buf = vec![0u8; bpf * 64];
        source.seek(90).unwrap();
        let read = source.read(&mut buf, 64).unwrap();
        assert_eq!(read, 64);
        let samples: Vec<i16> = buf
            .chunks_exact(2)
            .map(|b| i16::from_ne_bytes([b[0], b[1]]))
            .collect();
        assert!(samples.iter().all(|&s| s != 0));
        assert_eq!(source.position(), 54);
    }

    #[test]
    fn test_seek() {
        let dir = tempdir().unwrap();
        let path = write_ramp_wav(dir.path(), 1000);
        let mut source = FrameSource::open(&path).unwrap();

        source.seek(source.total_frames()).unwrap();
        assert_eq!(source.available_frames(), 0);

        source.seek(500).unwrap();
        assert_eq!(source.available_frames(), 500);

        source.seek(0).unwrap();
        assert_eq!(source.available_frames(), 1000);

        let err = source.seek(1001).unwrap_err();
        assert!(matches!(err, BlockAudioError::Seek { frame: 1001, total: 1000 }));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = write_ramp_wav(dir.path(), 100);
        let mut source = FrameSource::open(&path).unwrap();

        source.close();
        source.close();

        let bpf = source.format().bytes_per_frame(source.channels());
        let mut buf = vec![0u8; bpf * FRAME_COUNT];
        assert_eq!(source.read(&mut buf, FRAME_COUNT).unwrap(), 0);
    }

    #[test]
    fn test_read_into_undersized_buffer() {
        let dir = tempdir().unwrap();
        let path = write_ramp_wav(dir.path(), 100);
        let mut source = FrameSource::open(&path).unwrap();

        let mut buf = vec![0u8; 10];
        let err = source.read(&mut buf, FRAME_COUNT).unwrap_err();
        assert!(matches!(err, BlockAudioError::Read { .. }));
    }

    #[test]
    fn test_audio_file_info() {
        let dir = tempdir().unwrap();
        let path = write_ramp_wav(dir.path(), 1000);

        let info = audio_file_info(&path).unwrap();
        assert_eq!(info.format, SampleFormat::S16);
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.total_frame_count, 1000);
    }

    #[test]
    fn test_resampled_source_total() {
        let dir = tempdir().unwrap();
        let path = write_ramp_wav(dir.path(), 441);
        let source = FrameSource::open_with(
            &path,
            &SourceConfig {
                format: None,
                channels: None,
                sample_rate: Some(22_050),
            },
        )
        .unwrap();

        // 441 frames at 44.1kHz ≈ 221 frames at 22.05kHz (ceil of 220.5)
        assert_eq!(source.sample_rate(), 22_050);
        assert_eq!(source.total_frames(), 221);
    }
}
