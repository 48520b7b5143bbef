//! Host/device handoff for mirrored buffers.
//!
//! The host may read or mutate solver buffers only while it holds a
//! mapping; the device may run a pass only while the host is unmapped.
//! Each side blocks until the other lets go. Unmapping is the upload
//! point and advances the fence epoch.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

#[derive(Debug, Default)]
struct FenceState {
    host_mapped: bool,
    device_passes: u32,
    epoch: u64,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<FenceState>,
    changed: Condvar,
}

/// Shared fence between the host mapping and device passes.
///
/// Cloning is cheap; every clone observes the same state. Hand one clone
/// to the device-side worker and keep the original in
/// [`SolverBuffers`](crate::SolverBuffers).
#[derive(Clone, Debug, Default)]
pub struct DeviceFence {
    shared: Arc<Shared>,
}

impl DeviceFence {
    /// Create an unmapped fence at epoch 0.
    pub fn new() -> Self {
        Self::default()
    }

    // FenceState holds plain counters that no panic can leave half-written.
    fn lock(&self) -> MutexGuard<'_, FenceState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a device pass, blocking while the host holds a mapping.
    pub fn begin_device_pass(&self) -> DevicePass {
        let guard = self.lock();
        if guard.host_mapped {
            trace!("device pass waiting for host unmap");
        }
        let mut state = self
            .shared
            .changed
            .wait_while(guard, |s| s.host_mapped)
            .unwrap_or_else(PoisonError::into_inner);
        state.device_passes += 1;
        DevicePass {
            fence: self.clone(),
            epoch: state.epoch,
        }
    }

    /// Start a device pass if the host is not mapped.
    pub fn try_begin_device_pass(&self) -> Option<DevicePass> {
        let mut state = self.lock();
        if state.host_mapped {
            return None;
        }
        state.device_passes += 1;
        Some(DevicePass {
            fence: self.clone(),
            epoch: state.epoch,
        })
    }

    /// Whether the host currently holds a mapping.
    pub fn is_mapped(&self) -> bool {
        self.lock().host_mapped
    }

    /// Number of device passes in flight.
    pub fn active_device_passes(&self) -> u32 {
        self.lock().device_passes
    }

    /// Number of completed host mappings. Each unmap is one upload.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    pub(crate) fn map_host(&self) -> HostMapping {
        let guard = self.lock();
        if guard.device_passes > 0 {
            trace!(passes = guard.device_passes, "host map waiting for device");
        }
        let mut state = self
            .shared
            .changed
            .wait_while(guard, |s| s.host_mapped || s.device_passes > 0)
            .unwrap_or_else(PoisonError::into_inner);
        state.host_mapped = true;
        trace!(epoch = state.epoch, "host mapped");
        HostMapping {
            fence: Some(self.clone()),
        }
    }

    pub(crate) fn try_map_host(&self) -> Option<HostMapping> {
        let mut state = self.lock();
        if state.host_mapped || state.device_passes > 0 {
            return None;
        }
        state.host_mapped = true;
        Some(HostMapping {
            fence: Some(self.clone()),
        })
    }
}

/// Guard for one device pass. Dropping it ends the pass.
#[derive(Debug)]
#[must_use = "the device pass ends when this guard is dropped"]
pub struct DevicePass {
    fence: DeviceFence,
    epoch: u64,
}

impl DevicePass {
    /// Epoch of the upload this pass is reading.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for DevicePass {
    fn drop(&mut self) {
        let mut state = self.fence.lock();
        state.device_passes -= 1;
        drop(state);
        self.fence.shared.changed.notify_all();
    }
}

/// Host-side mapping. Dropping it unmaps and publishes a new epoch.
#[derive(Debug)]
pub(crate) struct HostMapping {
    fence: Option<DeviceFence>,
}

impl HostMapping {
    /// Unmap now and return the epoch this unmap published.
    pub(crate) fn unmap(mut self) -> u64 {
        self.release()
    }

    fn release(&mut self) -> u64 {
        let Some(fence) = self.fence.take() else {
            return 0;
        };
        let mut state = fence.lock();
        state.host_mapped = false;
        state.epoch += 1;
        let epoch = state.epoch;
        debug!(epoch, "host unmapped, buffers uploaded");
        drop(state);
        fence.shared.changed.notify_all();
        epoch
    }
}

impl Drop for HostMapping {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn new_fence_is_idle() {
        let f = DeviceFence::new();
        assert!(!f.is_mapped());
        assert_eq!(f.active_device_passes(), 0);
        assert_eq!(f.epoch(), 0);
    }

    #[test]
    fn unmap_advances_epoch() {
        let f = DeviceFence::new();
        let m = f.map_host();
        assert!(f.is_mapped());
        assert_eq!(f.epoch(), 0);
        drop(m);
        assert!(!f.is_mapped());
        assert_eq!(f.epoch(), 1);
    }

    #[test]
    fn explicit_unmap_publishes_once() {
        let f = DeviceFence::new();
        drop(f.map_host());
        let m = f.map_host();
        assert_eq!(m.unmap(), 2);
        assert!(!f.is_mapped());
        assert_eq!(f.epoch(), 2);
    }

    #[test]
    fn unmap_reports_its_own_epoch_when_host_remaps() {
        let f = DeviceFence::new();
        let first = f.map_host();
        let (tx, rx) = mpsc::channel();

        let host = f.clone();
        let worker = thread::spawn(move || {
            // Blocks until `first` is released, then publishes epoch 2.
            let second = host.map_host();
            tx.send(()).unwrap();
            second.unmap()
        });

        assert_eq!(first.unmap(), 1);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(worker.join().unwrap(), 2);
        assert_eq!(f.epoch(), 2);
    }

    #[test]
    fn try_pass_refused_while_mapped() {
        let f = DeviceFence::new();
        let m = f.map_host();
        assert!(f.try_begin_device_pass().is_none());
        drop(m);
        let pass = f.try_begin_device_pass().unwrap();
        assert_eq!(pass.epoch(), 1);
        assert_eq!(f.active_device_passes(), 1);
        drop(pass);
        assert_eq!(f.active_device_passes(), 0);
    }

    #[test]
    fn try_map_refused_during_pass() {
        let f = DeviceFence::new();
        let a = f.begin_device_pass();
        let b = f.begin_device_pass();
        assert_eq!(f.active_device_passes(), 2);
        assert!(f.try_map_host().is_none());
        drop(a);
        assert!(f.try_map_host().is_none());
        drop(b);
        assert!(f.try_map_host().is_some());
    }

    #[test]
    fn device_pass_blocks_until_unmap() {
        let f = DeviceFence::new();
        let mapping = f.map_host();
        let (tx, rx) = mpsc::channel();

        let device = f.clone();
        let worker = thread::spawn(move || {
            let pass = device.begin_device_pass();
            tx.send(pass.epoch()).unwrap();
        });

        // The worker cannot start while the host is mapped.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(mapping);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        worker.join().unwrap();
        assert_eq!(f.active_device_passes(), 0);
    }

    #[test]
    fn host_map_blocks_until_pass_ends() {
        let f = DeviceFence::new();
        let pass = f.begin_device_pass();
        let (tx, rx) = mpsc::channel();

        let host = f.clone();
        let worker = thread::spawn(move || {
            let mapping = host.map_host();
            tx.send(()).unwrap();
            drop(mapping);
        });

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(pass);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        worker.join().unwrap();
        assert_eq!(f.epoch(), 1);
    }
}
