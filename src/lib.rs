//! # block-audio
//!
//! Fixed-size PCM block streaming with a per-block transform, in two modes:
//!
//! - **Offline**: read a file, transform every block, write a file, as fast
//!   as the CPU allows ([`CodecStream`]).
//! - **Online**: run a live hardware device, optionally fed from a file
//!   and/or recorded to a file, driven by the driver's real-time callback
//!   thread ([`DeviceStream`]).
//!
//! Both modes sit behind one facade, [`BlockAudio`], selected with a single
//! `offline` flag.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use block_audio::{BlockAudio, SampleFormat};
//!
//! // Offline: copy input.wav to output.wav block by block.
//! let mut stream = BlockAudio::builder()
//!     .offline(true)
//!     .format(SampleFormat::F32)
//!     .channels(1)
//!     .sample_rate(44_100)
//!     .frame_count(128)
//!     .input_file("input.wav")
//!     .output_file("output.wav")
//!     .build()?;
//!
//! stream.start(|input, output, _frame_count| {
//!     let input = input.expect("offline streams always have input");
//!     let mut output = output.expect("offline streams always have output");
//!     output.as_bytes_mut().copy_from_slice(input.as_bytes());
//! })?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary in online mode:
//!
//! - **Driver thread**: the hardware layer invokes the data callback once
//!   per audio period; one invocation in flight per device, never concurrent
//!   with itself.
//! - **Watcher thread**: spawned by [`Device::start()`], parked on a condvar;
//!   performs the blocking device halt on behalf of `stop()`.
//! - **Caller thread**: calls `start()`/`stop()`; `stop()` is safe from any
//!   thread, *including from inside the data callback itself* (a transform
//!   that decides "no more data" may stop its own stream).
//!
//! Offline mode is purely single-threaded and synchronous.

// Audio code requires intentional numeric casts between sample formats
#![warn(missing_docs)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

pub mod backend;
mod block;
mod builder;
mod config;
mod device;
mod error;
mod event;
pub mod format;
mod sink;
mod source;
mod stream;

pub use block::{Frames, FramesMut, Sample};
pub use builder::{BlockAudio, BlockAudioBuilder};
pub use config::StreamSpec;
pub use device::{Device, DeviceState, DeviceType, StopHandle};
pub use error::BlockAudioError;
pub use event::{event_callback, EventCallback, StopCallback, StreamEvent};
pub use format::SampleFormat;
pub use sink::{EncodingFormat, FrameSink};
pub use source::{audio_file_info, AudioFileInfo, FrameSource, SourceConfig};
pub use stream::{CodecStream, DeviceStream, Stream, TransformCallback};
