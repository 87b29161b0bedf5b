//! Delivery settings shared by all requests

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default read buffer size: 32 KiB
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Largest accepted read buffer size: 16 MiB
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Settings read by every concurrent delivery
///
/// Lock-free: readers load the buffer size once at the start of a
/// delivery and keep that value for its whole duration.
#[derive(Debug)]
pub struct DeliverySettings {
    buffer_size: AtomicUsize,
}

impl DeliverySettings {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: AtomicUsize::new(clamp_buffer_size(buffer_size)),
        }
    }

    /// Maximum bytes read from disk per chunk
    pub fn buffer_size(&self) -> usize {
        self.buffer_size.load(Ordering::Relaxed)
    }

    /// Change the buffer size for deliveries started from now on
    ///
    /// Values are clamped to `1..=MAX_BUFFER_SIZE`.
    pub fn set_buffer_size(&self, size: usize) {
        self.buffer_size
            .store(clamp_buffer_size(size), Ordering::Relaxed);
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

fn clamp_buffer_size(size: usize) -> usize {
    size.clamp(1, MAX_BUFFER_SIZE)
}
