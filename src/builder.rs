//! The [`BlockAudio`] facade and its builder.

use std::path::PathBuf;

use tracing::debug;

use crate::backend::{Backend, CpalBackend};
use crate::block::{Frames, FramesMut};
use crate::config::StreamSpec;
use crate::device::StopHandle;
use crate::error::BlockAudioError;
use crate::event::{EventCallback, StopCallback};
use crate::format::SampleFormat;
use crate::stream::{CodecStream, DeviceStream, Stream};

/// Configures and builds a [`BlockAudio`] stream.
///
/// Created with [`BlockAudio::builder`]. The `offline` flag selects the
/// variant: offline streams require both file paths, online streams treat
/// both as optional.
pub struct BlockAudioBuilder {
    offline: bool,
    spec: StreamSpec,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    looping_input_file: bool,
    backend: Option<Box<dyn Backend>>,
    event_callback: Option<EventCallback>,
}

impl BlockAudioBuilder {
    fn new() -> Self {
        Self {
            offline: false,
            spec: StreamSpec::default(),
            input_file: None,
            output_file: None,
            looping_input_file: false,
            backend: None,
            event_callback: None,
        }
    }

    /// Selects offline (file to file) or online (live device) mode.
    #[must_use]
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Sets the sample format. Defaults to [`SampleFormat::F32`].
    #[must_use]
    pub fn format(mut self, format: SampleFormat) -> Self {
        self.spec.format = format;
        self
    }

    /// Sets the channel count. Defaults to 2.
    #[must_use]
    pub fn channels(mut self, channels: u16) -> Self {
        self.spec.channels = channels;
        self
    }

    /// Sets the sample rate in Hz. Defaults to 44100.
    #[must_use]
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.spec.sample_rate = sample_rate;
        self
    }

    /// Sets the block size in frames. Defaults to 512.
    #[must_use]
    pub fn frame_count(mut self, frame_count: usize) -> Self {
        self.spec.frame_count = frame_count;
        self
    }

    /// Sets the input file. Required offline; online it switches the device
    /// from duplex to file-fed playback.
    #[must_use]
    pub fn input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_file = Some(path.into());
        self
    }

    /// Sets the output file. Required offline; online it attaches a
    /// recording of the transform's output.
    #[must_use]
    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Makes an online input file wrap at end-of-stream instead of stopping
    /// the stream. Ignored offline and without an input file.
    #[must_use]
    pub fn looping_input_file(mut self, looping: bool) -> Self {
        self.looping_input_file = looping;
        self
    }

    /// Overrides the audio backend for online streams. Defaults to the
    /// platform backend; tests substitute [`MockBackend`].
    ///
    /// [`MockBackend`]: crate::backend::MockBackend
    #[must_use]
    pub fn backend(mut self, backend: Box<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Installs a callback for runtime stream events. Online only; offline
    /// streams report failures as return values instead.
    #[must_use]
    pub fn event_callback(mut self, callback: EventCallback) -> Self {
        self.event_callback = Some(callback);
        self
    }

    /// Opens the files and/or device and builds the stream.
    pub fn build(self) -> Result<BlockAudio, BlockAudioError> {
        let stream = if self.offline {
            let input = self.input_file.ok_or_else(|| {
                BlockAudioError::invalid("offline streams require an input file")
            })?;
            let output = self.output_file.ok_or_else(|| {
                BlockAudioError::invalid("offline streams require an output file")
            })?;
            debug!(?input, ?output, spec = ?self.spec, "building offline stream");
            Stream::Codec(CodecStream::new(self.spec, input, output)?)
        } else {
            let backend = self
                .backend
                .unwrap_or_else(|| Box::new(CpalBackend::new()));
            debug!(
                input = ?self.input_file,
                output = ?self.output_file,
                spec = ?self.spec,
                "building online stream"
            );
            let mut stream = DeviceStream::new(
                backend,
                self.spec,
                self.input_file.as_deref(),
                self.output_file.as_deref(),
                self.looping_input_file,
            )?;
            if let Some(callback) = self.event_callback {
                stream.set_event_callback(callback);
            }
            Stream::Device(stream)
        };

        Ok(BlockAudio { stream })
    }
}

/// One uniform interface over both stream variants.
///
/// See the [crate docs](crate) for an overview and examples.
#[derive(Debug)]
pub struct BlockAudio {
    stream: Stream,
}

impl BlockAudio {
    /// Starts configuring a stream.
    #[must_use]
    pub fn builder() -> BlockAudioBuilder {
        BlockAudioBuilder::new()
    }

    /// Returns whether this is an offline (file to file) stream.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        matches!(self.stream, Stream::Codec(_))
    }

    /// Returns the underlying stream variant.
    #[must_use]
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Returns the stream configuration.
    #[must_use]
    pub fn spec(&self) -> &StreamSpec {
        self.stream.spec()
    }

    /// Returns the sample format.
    #[must_use]
    pub fn format(&self) -> SampleFormat {
        self.stream.format()
    }

    /// Returns the channel count.
    #[must_use]
    pub fn channels(&self) -> u16 {
        self.stream.channels()
    }

    /// Returns the sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.stream.sample_rate()
    }

    /// Returns the block size in frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.stream.frame_count()
    }

    /// Returns whether the stream is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.stream.is_started()
    }

    /// Returns a handle for stopping the stream from any thread, including
    /// from inside the transform.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stream.stop_handle()
    }

    /// Returns whether an online input file wraps at end-of-stream. `false`
    /// whenever no input file is attached.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        match &self.stream {
            Stream::Codec(_) => false,
            Stream::Device(s) => s.is_looping(),
        }
    }

    /// Enables or disables input file looping. No-op offline or without an
    /// input file.
    pub fn set_looping(&mut self, looping: bool) {
        if let Stream::Device(s) = &mut self.stream {
            s.set_looping(looping);
        }
    }

    /// Starts the stream.
    ///
    /// Offline, this blocks until the input is exhausted or the transform
    /// stops the stream. Online, it returns once the device is live and the
    /// transform runs on the driver's thread until stopped.
    pub fn start<F>(&mut self, transform: F) -> Result<(), BlockAudioError>
    where
        F: FnMut(Option<Frames<'_>>, Option<FramesMut<'_>>, usize) + Send + 'static,
    {
        self.stream.start(Box::new(transform), None)
    }

    /// Like [`BlockAudio::start`], with a callback that fires once the
    /// stream has fully halted.
    pub fn start_with_stop_callback<F>(
        &mut self,
        transform: F,
        stop_callback: StopCallback,
    ) -> Result<(), BlockAudioError>
    where
        F: FnMut(Option<Frames<'_>>, Option<FramesMut<'_>>, usize) + Send + 'static,
    {
        self.stream.start(Box::new(transform), Some(stop_callback))
    }

    /// Stops the stream. Safe from any thread; no-op when not running.
    pub fn stop(&mut self) -> Result<(), BlockAudioError> {
        self.stream.stop()
    }
}
