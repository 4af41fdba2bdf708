//! # Device Handles
//!
//! A [`DeviceHandle`] names one connected peripheral and the characteristic
//! print data is written to. A handle can be cloned and passed around freely,
//! but only one [`DeviceLease`] exists for it at a time: the lease is the right
//! to transmit, and it is what a print job holds while it runs.
//!
//! ```text
//! handle.acquire() ──► Ok(lease)      (device idle)
//! handle.acquire() ──► Err(DeviceBusy) (lease still alive)
//! drop(lease)      ──► device idle again
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{PrintyError, TransportError};

/// The BLE primitive the pipeline writes through.
///
/// Implementations perform a single "write with response" and return once the
/// peripheral's link layer has acknowledged it. Timeouts and retries are
/// handled by the caller.
#[async_trait]
pub trait GattWriter: Send + Sync {
    async fn write_with_response(
        &self,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
    ) -> Result<(), TransportError>;
}

struct DeviceInner {
    id: String,
    service: Uuid,
    characteristic: Uuid,
    writer: Arc<dyn GattWriter>,
    busy: AtomicBool,
}

/// A connected peripheral plus its write characteristic.
#[derive(Clone)]
pub struct DeviceHandle {
    inner: Arc<DeviceInner>,
}

impl DeviceHandle {
    pub fn new(
        id: impl Into<String>,
        writer: Arc<dyn GattWriter>,
        service: Uuid,
        characteristic: Uuid,
    ) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                id: id.into(),
                service,
                characteristic,
                writer,
                busy: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn service(&self) -> Uuid {
        self.inner.service
    }

    pub fn characteristic(&self) -> Uuid {
        self.inner.characteristic
    }

    /// Whether a lease is currently held.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Take exclusive use of the device.
    ///
    /// Fails immediately with `DeviceBusy` if another lease is alive; there
    /// is no waiting or queuing.
    pub fn acquire(&self) -> Result<DeviceLease, PrintyError> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PrintyError::DeviceBusy)?;
        Ok(DeviceLease {
            device: self.clone(),
        })
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.inner.id)
            .field("service", &self.inner.service)
            .field("characteristic", &self.inner.characteristic)
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Exclusive use of a [`DeviceHandle`]; released on drop.
#[derive(Debug)]
pub struct DeviceLease {
    device: DeviceHandle,
}

impl DeviceLease {
    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    /// One write-with-response to the device's print characteristic.
    pub(crate) async fn write(&self, payload: &[u8]) -> Result<(), TransportError> {
        let inner = &self.device.inner;
        inner
            .writer
            .write_with_response(inner.service, inner.characteristic, payload)
            .await
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.device.inner.busy.store(false, Ordering::Release);
    }
}

// ============================================================================
// TESTS
// ============================================================================
