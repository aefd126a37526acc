//! The two stream variants behind the facade.
//!
//! [`CodecStream`] (offline, file to file) and [`DeviceStream`] (online,
//! live device) share one contract: a fixed configuration, a per-block
//! transform, a `start`/`stop` pair, and an optional stop callback that
//! fires once the stream has fully halted. [`Stream`] is the tagged union
//! the facade dispatches over.

mod codec;
mod device;

pub use codec::CodecStream;
pub use device::DeviceStream;

use crate::block::{Frames, FramesMut};
use crate::config::StreamSpec;
use crate::device::StopHandle;
use crate::error::BlockAudioError;
use crate::event::StopCallback;
use crate::format::SampleFormat;

/// Per-block transform supplied by the caller.
///
/// `input` is `None` for a stream with no input side, `output` is `None`
/// for a stream with no output side; both buffers hold exactly the
/// configured block and must not be retained past the call. The transform
/// may stop its own stream through a [`StopHandle`].
pub type TransformCallback =
    Box<dyn FnMut(Option<Frames<'_>>, Option<FramesMut<'_>>, usize) + Send + 'static>;

/// Either stream variant.
///
/// Offline streams block in [`Stream::start`] until the input is exhausted
/// or stopped; online streams return immediately and run on the driver's
/// thread.
#[derive(Debug)]
pub enum Stream {
    /// Offline file-to-file streaming.
    Codec(CodecStream),
    /// Online streaming against a live device.
    Device(DeviceStream),
}

impl Stream {
    /// Returns the stream configuration.
    #[must_use]
    pub fn spec(&self) -> &StreamSpec {
        match self {
            Self::Codec(s) => s.spec(),
            Self::Device(s) => s.spec(),
        }
    }

    /// Returns the sample format.
    #[must_use]
    pub fn format(&self) -> SampleFormat {
        self.spec().format
    }

    /// Returns the channel count.
    #[must_use]
    pub fn channels(&self) -> u16 {
        self.spec().channels
    }

    /// Returns the sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.spec().sample_rate
    }

    /// Returns the block size in frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.spec().frame_count
    }

    /// Returns whether the stream is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        match self {
            Self::Codec(s) => s.is_started(),
            Self::Device(s) => s.is_started(),
        }
    }

    /// Returns a handle for stopping the stream from any thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        match self {
            Self::Codec(s) => s.stop_handle(),
            Self::Device(s) => s.stop_handle(),
        }
    }

    /// Starts the stream. Blocking for [`Stream::Codec`], immediate for
    /// [`Stream::Device`].
    pub fn start(
        &mut self,
        transform: TransformCallback,
        stop_callback: Option<StopCallback>,
    ) -> Result<(), BlockAudioError> {
        match self {
            Self::Codec(s) => s.start(transform, stop_callback),
            Self::Device(s) => s.start(transform, stop_callback),
        }
    }

    /// Stops the stream. No-op when not running.
    pub fn stop(&mut self) -> Result<(), BlockAudioError> {
        match self {
            Self::Codec(s) => {
                s.stop();
                Ok(())
            }
            Self::Device(s) => s.stop(),
        }
    }
}
