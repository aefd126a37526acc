//! Online streaming against a live device.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::backend::{Backend, DataCallback};
use crate::block::{BlockBuf, Frames, FramesMut};
use crate::config::StreamSpec;
use crate::device::{Device, DeviceType, StopHandle};
use crate::error::BlockAudioError;
use crate::event::{EventCallback, StopCallback, StreamEvent};
use crate::sink::{EncodingFormat, FrameSink};
use crate::source::{FrameSource, SourceConfig};

use super::TransformCallback;

/// Online stream: device callback, optional file input, optional file
/// recording.
///
/// With an input file the device runs playback and the file feeds the
/// transform's input; without one the device runs duplex and the live
/// capture feeds it. Either way the transform's output goes to the device,
/// and to the output file when one was given. All data motion happens on
/// the driver's thread; [`DeviceStream::start`] returns immediately.
///
/// A non-looping input file that runs out forces a self-stop from the
/// callback: the block that observed exhaustion still flows through the
/// transform (zero-padded) and the recording, then the watcher halts the
/// device and fires the stop callback.
pub struct DeviceStream {
    device: Device,
    source: Option<Arc<Mutex<FrameSource>>>,
    sink: Option<Arc<Mutex<FrameSink>>>,
    event_callback: Option<EventCallback>,
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream")
            .field("device", &self.device)
            .field("source", &self.source)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

impl DeviceStream {
    /// Opens the device and any file endpoints.
    ///
    /// `input_file` selects playback mode (file-fed); without it the device
    /// runs duplex so live input reaches the transform. `output_file`
    /// attaches a recording sink. Files are converted/encoded in the
    /// stream's configured format.
    pub fn new(
        backend: Box<dyn Backend>,
        spec: StreamSpec,
        input_file: Option<&Path>,
        output_file: Option<&Path>,
        looping: bool,
    ) -> Result<Self, BlockAudioError> {
        spec.validate()?;

        let device_type = if input_file.is_some() {
            DeviceType::Playback
        } else {
            DeviceType::Duplex
        };

        let source = input_file
            .map(|path| {
                let mut source = FrameSource::open_with(
                    path,
                    &SourceConfig {
                        format: Some(spec.format),
                        channels: Some(spec.channels),
                        sample_rate: Some(spec.sample_rate),
                    },
                )?;
                source.set_looping(looping);
                Ok::<_, BlockAudioError>(Arc::new(Mutex::new(source)))
            })
            .transpose()?;

        let sink = output_file
            .map(|path| {
                let sink = FrameSink::open(
                    path,
                    EncodingFormat::Wav,
                    spec.format,
                    spec.channels,
                    spec.sample_rate,
                )?;
                Ok::<_, BlockAudioError>(Arc::new(Mutex::new(sink)))
            })
            .transpose()?;

        let device = Device::new(backend, device_type, spec)?;

        Ok(Self {
            device,
            source,
            sink,
            event_callback: None,
        })
    }

    /// Installs a callback for runtime conditions the driver thread cannot
    /// surface as return values (source exhaustion, recording failures,
    /// transform panics). Replaces any previous callback.
    pub fn set_event_callback(&mut self, callback: EventCallback) {
        self.event_callback = Some(callback);
    }

    /// Returns the stream configuration.
    #[must_use]
    pub fn spec(&self) -> &StreamSpec {
        self.device.spec()
    }

    /// Returns whether the device is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.device.is_started()
    }

    /// Returns a handle for stopping the stream from any thread, including
    /// from inside the transform.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.device.stop_handle()
    }

    /// Returns whether the input file wraps at end-of-stream. `false` when
    /// there is no input file.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.lock().unwrap().is_looping())
    }

    /// Enables or disables input file looping. No-op without an input file.
    pub fn set_looping(&mut self, looping: bool) {
        if let Some(source) = &self.source {
            source.lock().unwrap().set_looping(looping);
        }
    }

    /// Starts the device and returns once the callback is live.
    ///
    /// The transform runs on the driver thread from here on. The stop
    /// callback fires once the device has fully halted, whichever thread
    /// requested the stop.
    pub fn start(
        &mut self,
        transform: TransformCallback,
        stop_callback: Option<StopCallback>,
    ) -> Result<(), BlockAudioError> {
        let spec = *self.device.spec();
        let stop_handle = self.device.stop_handle();
        let source = self.source.clone();
        let sink = self.sink.clone();
        let events = self.event_callback.clone();

        let mut transform = transform;
        // Scratch blocks for the file-fed input and for a device without an
        // output side, reused across invocations
        let mut file_block = BlockBuf::zeroed(spec.bytes_per_block());
        let mut sink_scratch = BlockBuf::zeroed(spec.bytes_per_block());
        // Once the transform has panicked it is not invoked again
        let mut poisoned = false;
        let mut exhausted = false;

        // The event callback is user code running on the driver thread, so
        // it gets the same unwind boundary as the transform
        let emit = move |event: StreamEvent| {
            if let Some(callback) = &events {
                if panic::catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                    warn!("event callback panicked");
                }
            }
        };

        let data_callback: DataCallback = Box::new(move |device_input, device_output, frame_count| {
            // Input side: file if present, else live capture
            let input_bytes: Option<&[u8]> = if let Some(source) = &source {
                let mut guard = source.lock().unwrap();
                match guard.read(file_block.as_bytes_mut(), frame_count) {
                    Ok(0) => {
                        // Exhausted: schedule the halt first, then let this
                        // final silent block flow through transform and
                        // recording
                        drop(guard);
                        stop_handle.stop();
                        if !exhausted {
                            exhausted = true;
                            emit(StreamEvent::SourceExhausted);
                        }
                    }
                    Ok(_) => drop(guard),
                    Err(e) => {
                        drop(guard);
                        warn!(error = %e, "source read failed");
                        stop_handle.stop();
                        if !exhausted {
                            exhausted = true;
                            emit(StreamEvent::SourceError {
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                Some(file_block.as_bytes())
            } else {
                device_input
            };

            let output_bytes: &mut [u8] = match device_output {
                Some(out) => out,
                None => {
                    sink_scratch.as_bytes_mut().fill(0);
                    sink_scratch.as_bytes_mut()
                }
            };

            if !poisoned {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    transform(
                        input_bytes.map(|bytes| Frames::wrap(bytes, spec.format, spec.channels)),
                        Some(FramesMut::wrap(
                            &mut *output_bytes,
                            spec.format,
                            spec.channels,
                        )),
                        frame_count,
                    );
                }));
                if let Err(payload) = result {
                    poisoned = true;
                    let reason = panic_reason(payload.as_ref());
                    warn!(reason, "transform panicked, stopping stream");
                    stop_handle.stop();
                    emit(StreamEvent::TransformPanicked {
                        reason: reason.to_owned(),
                    });
                }
            }

            if let Some(sink) = &sink {
                let mut guard = sink.lock().unwrap();
                if let Err(e) = guard.write(output_bytes, frame_count) {
                    drop(guard);
                    warn!(error = %e, "recording write failed, stopping stream");
                    stop_handle.stop();
                    emit(StreamEvent::SinkError {
                        reason: e.to_string(),
                    });
                }
            }
        });

        self.device.start(data_callback, stop_callback)
    }

    /// Stops the device.
    ///
    /// Blocking when called off the driver thread, immediate (halt deferred
    /// to the watcher) when called from inside the transform. No-op when not
    /// running.
    pub fn stop(&mut self) -> Result<(), BlockAudioError> {
        self.device.stop()
    }
}

impl Drop for DeviceStream {
    fn drop(&mut self) {
        // Halt the callback before finalizing the recording
        if let Err(e) = self.device.stop() {
            warn!(error = %e, "device stop on drop failed");
        }
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.lock().unwrap().close() {
                warn!(error = %e, "recording finalize failed");
            }
        }
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}
