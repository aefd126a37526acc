//! Borrowed views over one fixed-size block of PCM frames.
//!
//! A frame block is a contiguous run of `frame_count × channels` samples in
//! a single [`SampleFormat`]. Blocks are ephemeral: offline streams own them
//! for one loop iteration, online streams borrow them from the driver for
//! the duration of one callback. Neither view may be retained beyond the
//! call it was handed to.

use crate::format::SampleFormat;

/// A typed PCM sample that can back a frame-block view.
///
/// Implemented for the machine types that map 1:1 onto a [`SampleFormat`].
/// `S24` is packed and has no typed view; use byte access for it.
pub trait Sample: bytemuck::Pod {
    /// The sample format this type represents.
    const FORMAT: SampleFormat;
}

impl Sample for u8 {
    const FORMAT: SampleFormat = SampleFormat::U8;
}

impl Sample for i16 {
    const FORMAT: SampleFormat = SampleFormat::S16;
}

impl Sample for i32 {
    const FORMAT: SampleFormat = SampleFormat::S32;
}

impl Sample for f32 {
    const FORMAT: SampleFormat = SampleFormat::F32;
}

/// An immutable view over one block of interleaved PCM frames.
#[derive(Debug)]
pub struct Frames<'a> {
    bytes: &'a [u8],
    format: SampleFormat,
    channels: u16,
}

impl<'a> Frames<'a> {
    /// Wraps raw interleaved sample bytes in a frame view.
    ///
    /// The byte length must be a multiple of the frame size. For typed
    /// access via [`samples`](Self::samples) the buffer must also be aligned
    /// for the sample type; buffers allocated by this crate always are.
    #[must_use]
    pub fn wrap(bytes: &'a [u8], format: SampleFormat, channels: u16) -> Self {
        Self {
            bytes,
            format,
            channels,
        }
    }

    /// Returns the sample format of this block.
    #[must_use]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Returns the channel count of this block.
    #[must_use]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the number of frames in this block.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        let bpf = self.format.bytes_per_frame(self.channels);
        if bpf == 0 {
            return 0;
        }
        self.bytes.len() / bpf
    }

    /// Returns the raw interleaved sample bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }

    /// Returns the block as a typed sample slice.
    ///
    /// # Panics
    ///
    /// Panics if `T` does not match the block's format, or if the underlying
    /// buffer is not aligned for `T` (never the case for buffers allocated
    /// by this crate).
    #[must_use]
    pub fn samples<T: Sample>(&self) -> &[T] {
        assert_eq!(
            T::FORMAT,
            self.format,
            "typed view {} requested for a {} block",
            T::FORMAT,
            self.format
        );
        match bytemuck::try_cast_slice(self.bytes) {
            Ok(slice) => slice,
            Err(err) => panic!("frame block not viewable as {}: {err}", T::FORMAT),
        }
    }
}

/// A mutable view over one block of interleaved PCM frames.
#[derive(Debug)]
pub struct FramesMut<'a> {
    bytes: &'a mut [u8],
    format: SampleFormat,
    channels: u16,
}

impl<'a> FramesMut<'a> {
    /// Wraps raw interleaved sample bytes in a mutable frame view.
    ///
    /// See [`Frames::wrap`] for the length and alignment expectations.
    #[must_use]
    pub fn wrap(bytes: &'a mut [u8], format: SampleFormat, channels: u16) -> Self {
        Self {
            bytes,
            format,
            channels,
        }
    }

    /// Returns the sample format of this block.
    #[must_use]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Returns the channel count of this block.
    #[must_use]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the number of frames in this block.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        let bpf = self.format.bytes_per_frame(self.channels);
        if bpf == 0 {
            return 0;
        }
        self.bytes.len() / bpf
    }

    /// Returns the raw interleaved sample bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }

    /// Returns the raw interleaved sample bytes, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.bytes
    }

    /// Fills the block with silence (zero bytes; for `U8` this is a DC
    /// offset below the bias point, matching the zero-fill convention used
    /// by the source adapter).
    pub fn silence(&mut self) {
        self.bytes.fill(0);
    }

    /// Returns the block as a typed sample slice.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Frames::samples`].
    #[must_use]
    pub fn samples<T: Sample>(&self) -> &[T] {
        assert_eq!(
            T::FORMAT,
            self.format,
            "typed view {} requested for a {} block",
            T::FORMAT,
            self.format
        );
        match bytemuck::try_cast_slice(self.bytes) {
            Ok(slice) => slice,
            Err(err) => panic!("frame block not viewable as {}: {err}", T::FORMAT),
        }
    }

    /// Returns the block as a mutable typed sample slice.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Frames::samples`].
    pub fn samples_mut<T: Sample>(&mut self) -> &mut [T] {
        assert_eq!(
            T::FORMAT,
            self.format,
            "typed view {} requested for a {} block",
            T::FORMAT,
            self.format
        );
        match bytemuck::try_cast_slice_mut(self.bytes) {
            Ok(slice) => slice,
            Err(err) => panic!("frame block not viewable as {}: {err}", T::FORMAT),
        }
    }
}

/// An owned, 8-byte-aligned byte buffer for one frame block.
///
/// `Vec<u8>` gives no alignment guarantee, which would make the typed views
/// above fall over for `i16`/`i32`/`f32` blocks. Backing the buffer with
/// `u64` words keeps every supported sample type aligned.
#[derive(Debug, Clone)]
pub(crate) struct BlockBuf {
    words: Vec<u64>,
    len: usize,
}

impl BlockBuf {
    /// Allocates a zeroed block of `len` bytes.
    pub(crate) fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(8)],
            len,
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        let mut buf = BlockBuf::zeroed(4 * 2 * 128);
        let frames = Frames::wrap(buf.as_bytes(), SampleFormat::F32, 2);
        assert_eq!(frames.frame_count(), 128);

        let frames_mut = FramesMut::wrap(buf.as_bytes_mut(), SampleFormat::F32, 2);
        assert_eq!(frames_mut.frame_count(), 128);
    }

    #[test]
    fn test_typed_view_roundtrip() {
        let mut buf = BlockBuf::zeroed(2 * 4);
        let mut frames = FramesMut::wrap(buf.as_bytes_mut(), SampleFormat::S16, 1);

        frames.samples_mut::<i16>().copy_from_slice(&[1, -2, 3, -4]);
        assert_eq!(frames.samples::<i16>(), &[1, -2, 3, -4]);

        let read_only = Frames::wrap(buf.as_bytes(), SampleFormat::S16, 1);
        assert_eq!(read_only.samples::<i16>(), &[1, -2, 3, -4]);
    }

    #[test]
    #[should_panic(expected = "typed view")]
    fn test_typed_view_format_mismatch_panics() {
        let buf = BlockBuf::zeroed(8);
        let frames = Frames::wrap(buf.as_bytes(), SampleFormat::F32, 1);
        let _ = frames.samples::<i16>();
    }

    #[test]
    fn test_silence() {
        let mut buf = BlockBuf::zeroed(8);
        buf.as_bytes_mut().fill(0xFF);
        let mut frames = FramesMut::wrap(buf.as_bytes_mut(), SampleFormat::S16, 1);
        frames.silence();
        assert!(frames.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_s24_byte_access() {
        let mut buf = BlockBuf::zeroed(6);
        let frames = FramesMut::wrap(buf.as_bytes_mut(), SampleFormat::S24, 1);
        assert_eq!(frames.frame_count(), 2);
        assert_eq!(frames.as_bytes().len(), 6);
    }

    #[test]
    fn test_block_buf_odd_length() {
        let buf = BlockBuf::zeroed(7);
        assert_eq!(buf.as_bytes().len(), 7);
    }
}
