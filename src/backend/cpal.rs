//! Platform audio via `cpal`.
//!
//! `cpal::Stream` is `!Send`, so the backend keeps every stream on a
//! dedicated owner thread: `activate` spawns it, waits for a ready/failed
//! acknowledgment, and `deactivate` signals it to drop the streams and
//! joins. The data callback itself runs on cpal's driver thread, not the
//! owner thread.
//!
//! Platform periods rarely match the configured block size even when a fixed
//! buffer size is requested, so the callback adapters re-block: playback
//! carries produced-but-unconsumed bytes across invocations, capture
//! accumulates until a whole block is available, and duplex bridges the
//! capture stream to the playback stream through a lock-free ring buffer.

use std::sync::mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use tracing::{debug, warn};

use crate::block::BlockBuf;
use crate::config::StreamSpec;
use crate::device::DeviceType;
use crate::error::BlockAudioError;
use crate::format::SampleFormat;

use super::{Backend, DataCallback};

/// How many blocks the duplex capture-to-playback bridge can buffer.
const DUPLEX_RING_BLOCKS: usize = 8;

/// The default [`Backend`], backed by the platform audio stack.
///
/// `S24` is not a cpal sample format and [`DeviceType::Loopback`] is not a
/// cpal capability; activating either fails with the corresponding error.
#[derive(Debug, Default)]
pub struct CpalBackend {
    worker: Option<(mpsc::Sender<()>, thread::JoinHandle<()>)>,
}

impl CpalBackend {
    /// Creates an inactive backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for CpalBackend {
    fn activate(
        &mut self,
        device_type: DeviceType,
        spec: &StreamSpec,
        callback: DataCallback,
    ) -> Result<(), BlockAudioError> {
        if self.worker.is_some() {
            return Err(BlockAudioError::device("backend is already active"));
        }
        if device_type == DeviceType::Loopback {
            return Err(BlockAudioError::device(
                "loopback capture is not supported by the platform audio layer",
            ));
        }

        let spec = *spec;
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("cpal-backend".into())
            .spawn(move || {
                // Streams are !Send; they must be built and dropped here.
                let streams = match build_streams(device_type, &spec, callback) {
                    Ok(streams) => {
                        let _ = ready_tx.send(Ok(()));
                        streams
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                debug!(?device_type, "cpal streams running");
                let _ = shutdown_rx.recv();
                drop(streams);
                debug!("cpal streams dropped");
            })
            .map_err(BlockAudioError::device)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some((shutdown_tx, handle));
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(BlockAudioError::device(
                    "backend thread exited before signaling readiness",
                ))
            }
        }
    }

    fn deactivate(&mut self) -> Result<(), BlockAudioError> {
        if let Some((shutdown_tx, handle)) = self.worker.take() {
            let _ = shutdown_tx.send(());
            handle
                .join()
                .map_err(|_| BlockAudioError::device("backend thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        let _ = self.deactivate();
    }
}

fn build_streams(
    device_type: DeviceType,
    spec: &StreamSpec,
    callback: DataCallback,
) -> Result<Vec<cpal::Stream>, BlockAudioError> {
    match spec.format {
        SampleFormat::U8 => build_typed::<u8>(device_type, spec, callback),
        SampleFormat::S16 => build_typed::<i16>(device_type, spec, callback),
        SampleFormat::S32 => build_typed::<i32>(device_type, spec, callback),
        SampleFormat::F32 => build_typed::<f32>(device_type, spec, callback),
        SampleFormat::S24 | SampleFormat::Unknown => {
            Err(BlockAudioError::UnsupportedFormat { format: spec.format })
        }
    }
}

fn build_typed<T>(
    device_type: DeviceType,
    spec: &StreamSpec,
    mut callback: DataCallback,
) -> Result<Vec<cpal::Stream>, BlockAudioError>
where
    T: cpal::SizedSample + bytemuck::Pod + Send + 'static,
{
    let host = cpal::default_host();
    let config = cpal::StreamConfig {
        channels: spec.channels,
        sample_rate: cpal::SampleRate(spec.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(spec.frame_count as u32),
    };
    let frame_count = spec.frame_count;
    let block_bytes = spec.bytes_per_block();

    let err_fn = |err: cpal::StreamError| warn!(%err, "audio stream error");

    let mut streams = Vec::new();

    match device_type {
        DeviceType::Playback => {
            let device = host
                .default_output_device()
                .ok_or_else(|| BlockAudioError::device("no default output device"))?;

            // Bytes produced by the callback but not yet consumed by the
            // driver, carried across invocations.
            let mut pending: Vec<u8> = Vec::new();
            let mut block = BlockBuf::zeroed(block_bytes);

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [T], _| {
                        let bytes: &mut [u8] = bytemuck::cast_slice_mut(data);
                        let mut off = 0;
                        while off < bytes.len() {
                            if pending.is_empty() {
                                block.as_bytes_mut().fill(0);
                                callback(None, Some(block.as_bytes_mut()), frame_count);
                                pending.extend_from_slice(block.as_bytes());
                            }
                            let n = pending.len().min(bytes.len() - off);
                            bytes[off..off + n].copy_from_slice(&pending[..n]);
                            pending.drain(..n);
                            off += n;
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(BlockAudioError::device)?;
            stream.play().map_err(BlockAudioError::device)?;
            streams.push(stream);
        }

        DeviceType::Capture | DeviceType::Loopback => {
            let device = host
                .default_input_device()
                .ok_or_else(|| BlockAudioError::device("no default input device"))?;

            let mut buffered: Vec<u8> = Vec::new();
            let mut block = BlockBuf::zeroed(block_bytes);

            let stream = device
                .build_input_stream(
                    &config,
                    move |data: &[T], _| {
                        buffered.extend_from_slice(bytemuck::cast_slice(data));
                        while buffered.len() >= block_bytes {
                            block.as_bytes_mut().copy_from_slice(&buffered[..block_bytes]);
                            callback(Some(block.as_bytes()), None, frame_count);
                            buffered.drain(..block_bytes);
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(BlockAudioError::device)?;
            stream.play().map_err(BlockAudioError::device)?;
            streams.push(stream);
        }

        DeviceType::Duplex => {
            let input_device = host
                .default_input_device()
                .ok_or_else(|| BlockAudioError::device("no default input device"))?;
            let output_device = host
                .default_output_device()
                .ok_or_else(|| BlockAudioError::device("no default output device"))?;

            let ring = HeapRb::<u8>::new(block_bytes * DUPLEX_RING_BLOCKS);
            let (mut producer, mut consumer) = ring.split();

            let input_stream = input_device
                .build_input_stream(
                    &config,
                    move |data: &[T], _| {
                        let bytes: &[u8] = bytemuck::cast_slice(data);
                        let pushed = producer.push_slice(bytes);
                        if pushed < bytes.len() {
                            debug!(dropped = bytes.len() - pushed, "duplex ring overrun");
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(BlockAudioError::device)?;

            let mut in_block = BlockBuf::zeroed(block_bytes);
            let mut out_block = BlockBuf::zeroed(block_bytes);
            let mut pending: Vec<u8> = Vec::new();

            let output_stream = output_device
                .build_output_stream(
                    &config,
                    move |data: &mut [T], _| {
                        let bytes: &mut [u8] = bytemuck::cast_slice_mut(data);
                        let mut off = 0;
                        while off < bytes.len() {
                            if pending.is_empty() {
                                // Underruns pad with silence rather than stall
                                let got = consumer.pop_slice(in_block.as_bytes_mut());
                                in_block.as_bytes_mut()[got..].fill(0);
                                out_block.as_bytes_mut().fill(0);
                                callback(
                                    Some(in_block.as_bytes()),
                                    Some(out_block.as_bytes_mut()),
                                    frame_count,
                                );
                                pending.extend_from_slice(out_block.as_bytes());
                            }
                            let n = pending.len().min(bytes.len() - off);
                            bytes[off..off + n].copy_from_slice(&pending[..n]);
                            pending.drain(..n);
                            off += n;
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(BlockAudioError::device)?;

            input_stream.play().map_err(BlockAudioError::device)?;
            output_stream.play().map_err(BlockAudioError::device)?;
            streams.push(input_stream);
            streams.push(output_stream);
        }
    }

    Ok(streams)
}
