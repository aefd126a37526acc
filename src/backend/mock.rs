//! A wall-clock-paced backend for tests and hardwareless environments.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::block::BlockBuf;
use crate::config::StreamSpec;
use crate::device::DeviceType;
use crate::error::BlockAudioError;

use super::{Backend, DataCallback};

/// A [`Backend`] that synthesizes the driver thread.
///
/// Instead of opening an audio endpoint, `activate` spawns a thread that
/// invokes the data callback once per block period, sleeping the block's
/// wall-clock duration in between. Capture input is silence. Playback output
/// is discarded. The timing is approximate but the threading contract is the
/// real one, which is what device-path tests care about.
#[derive(Debug, Default)]
pub struct MockBackend {
    running: Option<(Arc<AtomicBool>, thread::JoinHandle<()>)>,
}

impl MockBackend {
    /// Creates an inactive mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MockBackend {
    fn activate(
        &mut self,
        device_type: DeviceType,
        spec: &StreamSpec,
        mut callback: DataCallback,
    ) -> Result<(), BlockAudioError> {
        if self.running.is_some() {
            return Err(BlockAudioError::device("backend is already active"));
        }

        let has_input = matches!(
            device_type,
            DeviceType::Capture | DeviceType::Duplex | DeviceType::Loopback
        );
        let has_output = matches!(device_type, DeviceType::Playback | DeviceType::Duplex);

        let frame_count = spec.frame_count;
        let block_bytes = spec.bytes_per_block();
        let period = Duration::from_secs_f64(frame_count as f64 / f64::from(spec.sample_rate));

        let alive = Arc::new(AtomicBool::new(true));
        let thread_alive = Arc::clone(&alive);

        let handle = thread::Builder::new()
            .name("mock-audio-driver".into())
            .spawn(move || {
                debug!(?device_type, frame_count, "mock driver thread running");
                // BlockBuf keeps the blocks aligned for typed sample views
                let input = BlockBuf::zeroed(block_bytes);
                let mut output = BlockBuf::zeroed(block_bytes);

                while thread_alive.load(Ordering::Acquire) {
                    output.as_bytes_mut().fill(0);
                    callback(
                        has_input.then_some(input.as_bytes()),
                        has_output.then_some(output.as_bytes_mut()),
                        frame_count,
                    );
                    thread::sleep(period);
                }
                debug!("mock driver thread exiting");
            })
            .map_err(BlockAudioError::device)?;

        self.running = Some((alive, handle));
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), BlockAudioError> {
        if let Some((alive, handle)) = self.running.take() {
            alive.store(false, Ordering::Release);
            handle
                .join()
                .map_err(|_| BlockAudioError::device("mock driver thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        let _ = self.deactivate();
    }
}
