//! Audio Output & Streaming
//!
//! Real-time playback plumbing: a fixed-size sample ring buffer, a producer
//! thread that renders frames into it with backpressure, and (behind the
//! `streaming` feature) a rodio-backed output device that drains it.

pub mod engine;
pub mod ring_buffer;

#[cfg(feature = "streaming")]
pub mod audio_device;

#[cfg(feature = "streaming")]
pub use audio_device::AudioDevice;
pub use engine::PlaybackEngine;
pub use ring_buffer::RingBuffer;

/// Default sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Producer backoff when the ring buffer is full, in microseconds
pub const BUFFER_BACKOFF_MICROS: u64 = 100;

/// Configuration for streaming playback
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Ring buffer size in samples. Larger buffers ride out scheduling
    /// hiccups at the cost of latency.
    pub ring_buffer_size: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels (the renderer is mono)
    pub channels: u16,
}

impl StreamConfig {
    /// Two playback frames in flight: the frame being drained and the one
    /// being rendered. About 46 ms at 44.1 kHz PAL pacing.
    pub fn low_latency(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 2_048,
            sample_rate,
            channels: 1,
        }
    }

    /// A deep buffer for hosts with coarse scheduling (~372 ms at 44.1 kHz)
    pub fn stable(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 16_384,
            sample_rate,
            channels: 1,
        }
    }

    /// Buffer latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        self.ring_buffer_size as f32 / self.sample_rate as f32 * 1000.0
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::low_latency(DEFAULT_SAMPLE_RATE)
    }
}
