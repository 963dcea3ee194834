//! Sample Tap Helpers
//!
//! A lossy side channel carrying the most recent rendered frame to a
//! visualizer. The producer never blocks on it: when the consumer holds the
//! lock, the frame is simply skipped. Dropped frames are invisible to a
//! 50 Hz oscilloscope view; stalled audio is not.

use parking_lot::Mutex;
use std::sync::Arc;

/// Shared, lossy single-frame sample buffer
#[derive(Clone)]
pub struct SampleTap {
    inner: Arc<Mutex<Vec<i16>>>,
    capacity: usize,
}

impl SampleTap {
    /// Create a tap holding at most `capacity` samples per frame
    pub fn new(capacity: usize) -> Self {
        SampleTap {
            inner: Arc::new(Mutex::new(Vec::new())),
            capacity,
        }
    }

    /// Publish a frame without blocking. Returns false when the consumer
    /// held the lock and the frame was dropped.
    pub fn offer(&self, samples: &[i16]) -> bool {
        match self.inner.try_lock() {
            Some(mut slot) => {
                slot.clear();
                slot.extend_from_slice(&samples[..samples.len().min(self.capacity)]);
                true
            }
            None => false,
        }
    }

    /// Copy out the most recently published frame
    pub fn latest(&self) -> Vec<i16> {
        self.inner.lock().clone()
    }

    /// Peak absolute sample of the latest frame, normalized to 0.0..=1.0
    pub fn peak_level(&self) -> f32 {
        let slot = self.inner.lock();
        let peak = slot.iter().map(|s| (*s as i32).abs()).max().unwrap_or(0);
        peak as f32 / i16::MAX as f32
    }
}
