//! Timed mutual exclusion around device open and close.

use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::models::error::CameraError;

/// Serializes open and close of the physical device handle.
///
/// Acquisition is scoped: the returned token releases the lock when
/// dropped, so release happens on every exit path including errors, and a
/// double release is unrepresentable.
pub struct DeviceLock {
    inner: Mutex<()>,
}

/// Exclusive access token. Dropping it releases the lock.
pub struct DeviceLockGuard<'a> {
    _inner: MutexGuard<'a, ()>,
}

impl DeviceLock {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// Waits up to `timeout` for exclusive access.
    pub fn acquire(&self, timeout: Duration) -> Result<DeviceLockGuard<'_>, CameraError> {
        self.inner
            .try_lock_for(timeout)
            .map(|guard| DeviceLockGuard { _inner: guard })
            .ok_or(CameraError::DeviceLockTimeout)
    }
}

impl Default for DeviceLock {
    fn default() -> Self {
        Self::new()
    }
}
