//! Runtime events for monitoring online streams.
//!
//! Failures inside the real-time device callback must not unwind across the
//! driver boundary, so they cannot be returned from `start()`. They force a
//! stop of the device and are reported here instead. The event callback runs
//! on the driver's thread; keep it cheap.

use std::sync::Arc;

/// Events emitted from inside the real-time callback of a device stream.
///
/// Each of these also initiates a stop of the owning device; observe the
/// stop callback to learn when the device has fully halted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The attached file source returned no more frames; the stream is
    /// stopping itself.
    SourceExhausted,

    /// The attached file source failed mid-stream, distinct from a clean
    /// end-of-stream.
    SourceError {
        /// Description of the read failure.
        reason: String,
    },

    /// The attached file sink failed to write a block.
    SinkError {
        /// Description of the write failure.
        reason: String,
    },

    /// The user transform panicked inside the real-time callback. The panic
    /// was caught at the driver boundary.
    TransformPanicked {
        /// The panic payload, if it was a string.
        reason: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register via [`BlockAudioBuilder::event_callback()`](crate::BlockAudioBuilder::event_callback).
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Callback invoked once per start/stop cycle, after the device has fully
/// halted.
///
/// This is the "truly stopped" signal: distinct from the return of `stop()`,
/// which in the reentrant self-stop case only guarantees that the halt was
/// *initiated*.
pub type StopCallback = Arc<dyn Fn() + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use block_audio::{event_callback, StreamEvent};
///
/// let callback = event_callback(|event| {
///     eprintln!("stream event: {event:?}");
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
