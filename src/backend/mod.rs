//! Hardware abstraction boundary.
//!
//! [`Device`](crate::Device) drives audio through a [`Backend`], which owns
//! the platform endpoint and the thread the data callback runs on. Two
//! implementations ship with the crate:
//!
//! - [`CpalBackend`] talks to the platform audio stack through `cpal` and is
//!   the default.
//! - [`MockBackend`] paces a plain thread against the wall clock and needs no
//!   audio hardware, which makes device-path tests runnable in CI.
//!
//! A backend delivers exactly `frame_count` frames per callback invocation,
//! re-blocking the platform's native period size if necessary, and never
//! invokes the callback concurrently with itself.

mod cpal;
mod mock;

pub use self::cpal::CpalBackend;
pub use self::mock::MockBackend;

use crate::config::StreamSpec;
use crate::device::DeviceType;
use crate::error::BlockAudioError;

/// Raw data callback a backend invokes from its driver thread.
///
/// `input` is present for capture/duplex/loopback devices, `output` for
/// playback/duplex devices. Both buffers hold exactly the configured block
/// worth of interleaved sample bytes; the borrow ends when the call returns.
pub type DataCallback = Box<dyn FnMut(Option<&[u8]>, Option<&mut [u8]>, usize) + Send + 'static>;

/// A platform audio driver.
///
/// `activate` must not return until the endpoint is running and the callback
/// is eligible to fire; `deactivate` must not return until the callback can
/// no longer fire. Neither is called reentrantly from the callback itself,
/// which is what makes the blocking contract implementable.
pub trait Backend: Send {
    /// Opens the endpoint and starts invoking `callback` on the driver
    /// thread.
    fn activate(
        &mut self,
        device_type: DeviceType,
        spec: &StreamSpec,
        callback: DataCallback,
    ) -> Result<(), BlockAudioError>;

    /// Halts the endpoint and joins the driver thread.
    fn deactivate(&mut self) -> Result<(), BlockAudioError>;
}
