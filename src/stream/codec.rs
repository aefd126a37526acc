//! Offline file-to-file streaming.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::block::{BlockBuf, Frames, FramesMut};
use crate::config::StreamSpec;
use crate::device::StopHandle;
use crate::error::BlockAudioError;
use crate::event::StopCallback;
use crate::sink::{EncodingFormat, FrameSink};
use crate::source::{FrameSource, SourceConfig};

use super::TransformCallback;

/// Offline stream: decode, transform, encode, as fast as the CPU allows.
///
/// [`CodecStream::start`] runs a synchronous loop on the caller's thread and
/// returns once the source is exhausted or the stream is stopped. Every
/// iteration reads one block (zero-padded at the tail), runs the transform
/// over the full block, and writes only the frames the source actually
/// delivered, so the output never grows a padded tail the input did not
/// have.
#[derive(Debug)]
pub struct CodecStream {
    spec: StreamSpec,
    source: FrameSource,
    sink: FrameSink,
    started: Arc<AtomicBool>,
}

impl CodecStream {
    /// Opens `input_path` and `output_path` in the configured format.
    ///
    /// The source is converted to the stream's format/channels/rate at open,
    /// so both sides of the loop speak the same block layout.
    pub fn new(
        spec: StreamSpec,
        input_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<Self, BlockAudioError> {
        spec.validate()?;

        let source = FrameSource::open_with(
            input_path,
            &SourceConfig {
                format: Some(spec.format),
                channels: Some(spec.channels),
                sample_rate: Some(spec.sample_rate),
            },
        )?;
        let sink = FrameSink::open(
            output_path,
            EncodingFormat::Wav,
            spec.format,
            spec.channels,
            spec.sample_rate,
        )?;

        Ok(Self {
            spec,
            source,
            sink,
            started: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns the stream configuration.
    #[must_use]
    pub fn spec(&self) -> &StreamSpec {
        &self.spec
    }

    /// Returns whether the loop is currently running.
    ///
    /// Observable as `true` only from inside the transform, since
    /// [`CodecStream::start`] blocks the caller for the whole run.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Returns a handle the transform can use to stop the loop early.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::for_flag(Arc::clone(&self.started))
    }

    /// Runs the streaming loop to completion.
    ///
    /// Blocks until the source runs out of frames or the transform stops the
    /// stream through a [`StopHandle`]. The stop callback fires after the
    /// final block has been written and the sink has been finalized.
    pub fn start(
        &mut self,
        mut transform: TransformCallback,
        stop_callback: Option<StopCallback>,
    ) -> Result<(), BlockAudioError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(BlockAudioError::invalid("stream is already started"));
        }

        // Clears the flag however the loop exits, a transform panic included
        struct ClearOnDrop(Arc<AtomicBool>);
        impl Drop for ClearOnDrop {
            fn drop(&mut self) {
                self.0.store(false, Ordering::Release);
            }
        }
        let result = {
            let _running = ClearOnDrop(Arc::clone(&self.started));
            self.run(&mut transform)
        };

        if result.is_ok() {
            self.sink.close()?;
        }
        if let Some(callback) = stop_callback {
            callback();
        }
        result
    }

    fn run(&mut self, transform: &mut TransformCallback) -> Result<(), BlockAudioError> {
        let frame_count = self.spec.frame_count;
        let mut input = BlockBuf::zeroed(self.spec.bytes_per_block());
        let mut output = BlockBuf::zeroed(self.spec.bytes_per_block());
        let mut total = 0u64;

        while self.started.load(Ordering::Acquire) {
            let frames_read = self.source.read(input.as_bytes_mut(), frame_count)?;
            if frames_read == 0 {
                break;
            }

            // Transform sees the full zero-padded block either way
            output.as_bytes_mut().fill(0);
            transform(
                Some(Frames::wrap(
                    input.as_bytes(),
                    self.spec.format,
                    self.spec.channels,
                )),
                Some(FramesMut::wrap(
                    output.as_bytes_mut(),
                    self.spec.format,
                    self.spec.channels,
                )),
                frame_count,
            );

            self.sink.write(output.as_bytes(), frames_read)?;
            total += frames_read as u64;
        }

        debug!(total_frames = total, "offline stream finished");
        Ok(())
    }

    /// Flags the loop to exit after the current block.
    ///
    /// Meaningful only from inside the transform (via a thread that somehow
    /// shares the stream, which single ownership rules out otherwise); after
    /// [`CodecStream::start`] has returned this is a no-op.
    pub fn stop(&mut self) {
        self.started.store(false, Ordering::Release);
    }
}
