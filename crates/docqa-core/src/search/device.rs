//! Compute device placement for vector indices
//!
//! An index is materialized on a device only for the duration of a build or a
//! search. Memory is reserved through a [`DeviceLease`], which gives the
//! reservation back when dropped, on every exit path.

use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{DocQaError, DocQaResult};

/// A device able to hold index memory for the duration of one operation
pub trait ComputeDevice: Send + Sync {
    /// Short device name for logs
    fn name(&self) -> &str;

    /// Reserve `bytes` of device memory
    fn acquire(&self, bytes: usize) -> DocQaResult<DeviceLease>;
}

/// Scoped device memory reservation
#[must_use = "device memory is released as soon as the lease is dropped"]
pub struct DeviceLease {
    bytes: usize,
    pool: Option<Arc<Mutex<usize>>>,
}

impl DeviceLease {
    /// Lease on host memory; nothing to give back
    fn host(bytes: usize) -> Self {
        Self { bytes, pool: None }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            let mut in_use = pool.lock();
            *in_use = in_use.saturating_sub(self.bytes);
            log::debug!("Released {} bytes of device memory", self.bytes);
        }
    }
}

/// Plain host memory; never refuses a reservation
#[derive(Debug, Default, Clone, Copy)]
pub struct HostDevice;

impl ComputeDevice for HostDevice {
    fn name(&self) -> &str {
        "host"
    }

    fn acquire(&self, bytes: usize) -> DocQaResult<DeviceLease> {
        Ok(DeviceLease::host(bytes))
    }
}

/// Device with a fixed memory capacity.
/// No queueing: a reservation that does not fit fails immediately.
#[derive(Debug, Clone)]
pub struct MemoryBudgetDevice {
    name: String,
    capacity: usize,
    in_use: Arc<Mutex<usize>>,
}

impl MemoryBudgetDevice {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            in_use: Arc::new(Mutex::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently reserved by live leases
    pub fn in_use(&self) -> usize {
        *self.in_use.lock()
    }
}

impl ComputeDevice for MemoryBudgetDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn acquire(&self, bytes: usize) -> DocQaResult<DeviceLease> {
        let mut in_use = self.in_use.lock();
        let available = self.capacity.saturating_sub(*in_use);
        if bytes > available {
            log::warn!(
                "Device {} cannot reserve {} bytes ({} of {} in use)",
                self.name,
                bytes,
                *in_use,
                self.capacity
            );
            return Err(DocQaError::ResourceExhausted(format!(
                "device {} has {} bytes free, {} requested",
                self.name, available, bytes
            )));
        }

        *in_use += bytes;
        Ok(DeviceLease {
            bytes,
            pool: Some(self.in_use.clone()),
        })
    }
}

/// Pick the device described by configuration
pub fn device_from_limit(memory_limit_bytes: Option<u64>) -> Arc<dyn ComputeDevice> {
    match memory_limit_bytes {
        Some(limit) => {
            let device = MemoryBudgetDevice::new(
                "accelerator:0",
                usize::try_from(limit).unwrap_or(usize::MAX),
            );
            log::info!(
                "Using device {} with a {} byte budget",
                device.name(),
                device.capacity()
            );
            Arc::new(device)
        }
        None => Arc::new(HostDevice),
    }
}
