//! Live audio device lifecycle.
//!
//! [`Device`] owns one hardware endpoint through a [`Backend`] and exposes a
//! start/stop pair that is safe from any thread, including from inside the
//! data callback itself. Three threads cooperate:
//!
//! - The **caller thread** runs `start()` and `stop()`.
//! - The **driver thread** runs the data callback; the backend owns it.
//! - The **watcher thread** is spawned by `start()` and parks on a condvar.
//!   Every stop request is routed through it, because halting the endpoint
//!   joins the driver thread and therefore must never run *on* the driver
//!   thread.
//!
//! `stop()` records which thread last ran the data callback. When `stop()`
//! is invoked from that same thread (a transform stopping its own stream),
//! it only wakes the watcher and returns; waiting for the halt there would
//! deadlock. The stop callback, fired by the watcher after the endpoint has
//! fully halted, is the "truly stopped" signal for that case.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, warn};

use crate::backend::{Backend, DataCallback};
use crate::config::StreamSpec;
use crate::error::BlockAudioError;
use crate::event::StopCallback;

/// Lifecycle state of a [`Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    /// No endpoint is bound yet.
    #[default]
    Uninitialized,
    /// Endpoint bound, not running.
    Stopped,
    /// `start()` is activating the endpoint.
    Starting,
    /// Running; the data callback is eligible to fire.
    Started,
    /// The watcher is halting the endpoint.
    Stopping,
}

/// Which direction(s) a [`Device`] moves audio in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// Output only; the data callback fills the output block.
    Playback,
    /// Input only; the data callback receives the input block.
    Capture,
    /// Input and output simultaneously.
    Duplex,
    /// Captures what the system is playing back, where the platform
    /// supports it.
    Loopback,
}

struct Control {
    state: DeviceState,
    stop_requested: bool,
}

struct Shared {
    control: Mutex<Control>,
    stop_signal: Condvar,
    /// Thread the data callback last ran on; refreshed every invocation.
    callback_thread: Mutex<Option<ThreadId>>,
}

impl Shared {
    /// Flags a stop and wakes the watcher. Returns whether the device was
    /// running so that duplicate requests stay silent no-ops.
    fn request_stop(&self) -> bool {
        let mut control = self.control.lock().unwrap();
        if !matches!(control.state, DeviceState::Starting | DeviceState::Started) {
            return false;
        }
        control.stop_requested = true;
        drop(control);
        self.stop_signal.notify_all();
        true
    }

    /// True only in `Started`: a caller racing `start()` must not observe
    /// a running device before activation has succeeded.
    fn is_started(&self) -> bool {
        matches!(self.control.lock().unwrap().state, DeviceState::Started)
    }

    fn on_callback_thread(&self) -> bool {
        *self.callback_thread.lock().unwrap() == Some(thread::current().id())
    }
}

/// A cloneable handle for stopping a stream without owning it.
///
/// This is how a transform stops its own stream: the handle only flags the
/// request (and, for a live device, wakes the watcher), never waits for the
/// halt, so it is safe on any thread including the driver's. Completion is
/// observable through the stop callback or [`StopHandle::is_started`].
#[derive(Clone)]
pub struct StopHandle {
    inner: HandleInner,
}

#[derive(Clone)]
enum HandleInner {
    /// Live device; routes through the watcher protocol.
    Device(Arc<Shared>),
    /// Offline loop guard; `false` means stopped.
    Flag(Arc<std::sync::atomic::AtomicBool>),
}

impl StopHandle {
    pub(crate) fn for_flag(flag: Arc<std::sync::atomic::AtomicBool>) -> Self {
        Self {
            inner: HandleInner::Flag(flag),
        }
    }

    /// Requests a stop. No-op if the stream is not running.
    pub fn stop(&self) {
        match &self.inner {
            HandleInner::Device(shared) => {
                shared.request_stop();
            }
            HandleInner::Flag(flag) => {
                flag.store(false, std::sync::atomic::Ordering::Release);
            }
        }
    }

    /// Returns whether the stream is currently running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        match &self.inner {
            HandleInner::Device(shared) => shared.is_started(),
            HandleInner::Flag(flag) => flag.load(std::sync::atomic::Ordering::Acquire),
        }
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("started", &self.is_started())
            .finish()
    }
}

/// One live hardware endpoint.
///
/// Exactly one `Device` exists per endpoint handle; dropping it stops the
/// endpoint first if still running.
pub struct Device {
    backend: Arc<Mutex<Box<dyn Backend>>>,
    device_type: DeviceType,
    spec: StreamSpec,
    shared: Arc<Shared>,
    watcher: Option<JoinHandle<()>>,
}

impl Device {
    /// Binds a device around `backend`.
    ///
    /// Fails with `InvalidConfig` if the spec is malformed. The endpoint
    /// itself is not opened until [`Device::start`].
    pub fn new(
        backend: Box<dyn Backend>,
        device_type: DeviceType,
        spec: StreamSpec,
    ) -> Result<Self, BlockAudioError> {
        spec.validate()?;
        Ok(Self {
            backend: Arc::new(Mutex::new(backend)),
            device_type,
            spec,
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: DeviceState::Stopped,
                    stop_requested: false,
                }),
                stop_signal: Condvar::new(),
                callback_thread: Mutex::new(None),
            }),
            watcher: None,
        })
    }

    /// Returns the device direction.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Returns the stream configuration.
    #[must_use]
    pub fn spec(&self) -> &StreamSpec {
        &self.spec
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.shared.control.lock().unwrap().state
    }

    /// Returns whether the device is between a successful [`Device::start`]
    /// and a completed stop.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.shared.is_started()
    }

    /// Returns a handle that can request a stop from any thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            inner: HandleInner::Device(Arc::clone(&self.shared)),
        }
    }

    /// Activates the endpoint and spawns the watcher.
    ///
    /// `data_callback` runs on the driver thread, once per block. The
    /// optional `stop_callback` fires exactly once per started cycle, after
    /// the endpoint has fully halted, regardless of which thread requested
    /// the stop. Starting an already started device is a `Device` error.
    pub fn start(
        &mut self,
        data_callback: DataCallback,
        stop_callback: Option<StopCallback>,
    ) -> Result<(), BlockAudioError> {
        {
            let mut control = self.shared.control.lock().unwrap();
            if matches!(control.state, DeviceState::Starting | DeviceState::Started) {
                return Err(BlockAudioError::device("device is already started"));
            }
            control.state = DeviceState::Starting;
            control.stop_requested = false;
        }
        // Reap the watcher from a cycle that ended in a self-stop
        if let Some(stale) = self.watcher.take() {
            let _ = stale.join();
        }
        *self.shared.callback_thread.lock().unwrap() = None;

        // Record the driver thread on every invocation; the driver may
        // migrate the callback between threads across periods.
        let shared = Arc::clone(&self.shared);
        let mut inner = data_callback;
        let wrapped: DataCallback = Box::new(move |input, output, frame_count| {
            *shared.callback_thread.lock().unwrap() = Some(thread::current().id());
            inner(input, output, frame_count);
        });

        let activated = self
            .backend
            .lock()
            .unwrap()
            .activate(self.device_type, &self.spec, wrapped);
        if let Err(e) = activated {
            self.shared.control.lock().unwrap().state = DeviceState::Stopped;
            return Err(e);
        }
        self.shared.control.lock().unwrap().state = DeviceState::Started;
        debug!(device_type = ?self.device_type, "device started");

        let shared = Arc::clone(&self.shared);
        let backend = Arc::clone(&self.backend);
        let spawned = thread::Builder::new()
            .name("device-watcher".into())
            .spawn(move || {
                let mut control = shared.control.lock().unwrap();
                while !control.stop_requested {
                    control = shared.stop_signal.wait(control).unwrap();
                }
                control.state = DeviceState::Stopping;
                drop(control);

                // Joins the driver thread; this is why the halt lives here
                // and never on the caller or driver thread directly.
                if let Err(e) = backend.lock().unwrap().deactivate() {
                    warn!(error = %e, "device halt reported an error");
                }

                shared.control.lock().unwrap().state = DeviceState::Stopped;
                debug!("device stopped");
                if let Some(callback) = stop_callback {
                    callback();
                }
            });
        match spawned {
            Ok(watcher) => {
                self.watcher = Some(watcher);
                Ok(())
            }
            Err(e) => {
                // No watcher means nothing can ever halt the endpoint, so
                // undo the activation here
                let _ = self.backend.lock().unwrap().deactivate();
                self.shared.control.lock().unwrap().state = DeviceState::Stopped;
                Err(BlockAudioError::device(e))
            }
        }
    }

    /// Stops the endpoint.
    ///
    /// From any thread but the driver's, blocks until the endpoint has fully
    /// halted and the stop callback has run. From inside the data callback
    /// it only schedules the halt and returns immediately; the stop callback
    /// signals completion. Stopping a device that is not running is a no-op.
    pub fn stop(&mut self) -> Result<(), BlockAudioError> {
        self.shared.request_stop();

        if self.shared.on_callback_thread() {
            debug!("stop requested from the data callback, halt deferred to watcher");
            return Ok(());
        }

        if let Some(watcher) = self.watcher.take() {
            watcher
                .join()
                .map_err(|_| BlockAudioError::device("watcher thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "device stop on drop failed");
        }
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("device_type", &self.device_type)
            .field("spec", &self.spec)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
