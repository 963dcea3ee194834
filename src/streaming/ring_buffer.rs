//! Ring buffer for concurrent sample generation and playback
//!
//! One producer thread renders frames into the buffer while one consumer
//! thread (the audio device callback) drains it. Memory stays fixed at the
//! buffer capacity regardless of playback length. Mutex-protected storage
//! with atomic position tracking for cross-thread visibility.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Result, SidError};

/// Cap on buffer allocations: 64 MiB worth of i16 samples
const MAX_CAPACITY: usize = 64 * 1024 * 1024 / std::mem::size_of::<i16>();

/// Single-producer single-consumer sample ring buffer
#[derive(Debug)]
pub struct RingBuffer {
    /// Shared storage, locked only for the copy itself
    buffer: Mutex<Vec<i16>>,
    /// Monotonic write position (producer)
    write_pos: AtomicUsize,
    /// Monotonic read position (consumer)
    read_pos: AtomicUsize,
    /// Power-of-two capacity
    capacity: usize,
    /// `pos & mask == pos % capacity`
    mask: usize,
}

impl RingBuffer {
    /// Create a ring buffer; the capacity is rounded up to a power of two
    pub fn new(requested_capacity: usize) -> Result<Self> {
        if requested_capacity == 0 {
            return Err(SidError::ConfigError(
                "ring buffer capacity must be greater than 0".into(),
            ));
        }
        let capacity = requested_capacity.next_power_of_two();
        if capacity > MAX_CAPACITY {
            return Err(SidError::ConfigError(format!(
                "ring buffer capacity {capacity} exceeds maximum {MAX_CAPACITY}"
            )));
        }

        Ok(RingBuffer {
            buffer: Mutex::new(vec![0; capacity]),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            mask: capacity - 1,
            capacity,
        })
    }

    /// Allocated capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples ready to be read
    pub fn available_read(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write - read
    }

    /// Samples that can be written without overwriting unread data
    pub fn available_write(&self) -> usize {
        self.capacity - self.available_read() - 1
    }

    /// Fill level, 0.0 to 1.0
    pub fn fill_percentage(&self) -> f32 {
        self.available_read() as f32 / self.capacity as f32
    }

    /// Drop all unread samples
    pub fn flush(&self) {
        let write = self.write_pos.load(Ordering::Acquire);
        self.read_pos.store(write, Ordering::Release);
    }

    /// Write as many of `samples` as fit; returns the number written.
    /// Returns 0 when full (the producer backs off and retries).
    pub fn write(&self, samples: &[i16]) -> usize {
        let mut buf = self.buffer.lock();

        // Space is computed under the lock so a concurrent read cannot race
        // the copy
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let available = self.capacity - (write_pos - read_pos) - 1;

        let to_write = samples.len().min(available);
        if to_write == 0 {
            return 0;
        }

        let write_idx = write_pos & self.mask;
        if write_idx + to_write <= self.capacity {
            buf[write_idx..write_idx + to_write].copy_from_slice(&samples[..to_write]);
        } else {
            let first = self.capacity - write_idx;
            buf[write_idx..].copy_from_slice(&samples[..first]);
            buf[..to_write - first].copy_from_slice(&samples[first..to_write]);
        }
        drop(buf);

        self.write_pos.store(write_pos + to_write, Ordering::Release);
        to_write
    }

    /// Read up to `dest.len()` samples; returns the number read
    pub fn read(&self, dest: &mut [i16]) -> usize {
        let buf = self.buffer.lock();

        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let available = write_pos - read_pos;

        let to_read = dest.len().min(available);
        if to_read == 0 {
            return 0;
        }

        let read_idx = read_pos & self.mask;
        if read_idx + to_read <= self.capacity {
            dest[..to_read].copy_from_slice(&buf[read_idx..read_idx + to_read]);
        } else {
            let first = self.capacity - read_idx;
            dest[..first].copy_from_slice(&buf[read_idx..]);
            dest[first..to_read].copy_from_slice(&buf[..to_read - first]);
        }
        drop(buf);

        self.read_pos.store(read_pos + to_read, Ordering::Release);
        to_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let rb = RingBuffer::new(1_000).unwrap();
        assert_eq!(rb.capacity(), 1_024);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            RingBuffer::new(0),
            Err(SidError::ConfigError(_))
        ));
    }

    #[test]
    fn test_write_then_read() {
        let rb = RingBuffer::new(16).unwrap();
        let samples = [100i16, -200, 300, -400];
        assert_eq!(rb.write(&samples), 4);
        assert_eq!(rb.available_read(), 4);

        let mut dest = [0i16; 4];
        assert_eq!(rb.read(&mut dest), 4);
        assert_eq!(dest, samples);
        assert_eq!(rb.available_read(), 0);
    }

    #[test]
    fn test_full_buffer_rejects_writes() {
        let rb = RingBuffer::new(8).unwrap();
        assert_eq!(rb.write(&[1i16; 16]), 7); // one-slot gap invariant
        assert_eq!(rb.write(&[2i16; 4]), 0);
    }

    #[test]
    fn test_wraparound() {
        let rb = RingBuffer::new(8).unwrap();
        rb.write(&[1i16; 6]);
        let mut dest = [0i16; 6];
        rb.read(&mut dest);

        // Next write crosses the physical end of the buffer
        let samples = [7i16, 8, 9, 10, 11];
        assert_eq!(rb.write(&samples), 5);
        let mut dest = [0i16; 5];
        assert_eq!(rb.read(&mut dest), 5);
        assert_eq!(dest, samples);
    }

    #[test]
    fn test_flush_empties() {
        let rb = RingBuffer::new(16).unwrap();
        rb.write(&[1i16; 8]);
        rb.flush();
        assert_eq!(rb.available_read(), 0);
        assert_eq!(rb.available_write(), 15);
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        use std::sync::Arc;
        let rb = Arc::new(RingBuffer::new(256).unwrap());
        let producer_rb = Arc::clone(&rb);

        let producer = std::thread::spawn(move || {
            let mut written = 0usize;
            let chunk: Vec<i16> = (0..32).collect();
            while written < 10_000 {
                let n = producer_rb.write(&chunk[..(10_000 - written).min(32)]);
                written += n;
                if n == 0 {
                    std::thread::yield_now();
                }
            }
        });

        let mut total = 0usize;
        let mut dest = [0i16; 32];
        while total < 10_000 {
            let n = rb.read(&mut dest);
            total += n;
            if n == 0 {
                std::thread::yield_now();
            }
        }
        producer.join().unwrap();
        assert_eq!(total, 10_000);
    }
}
