//! Audio device integration using rodio
//!
//! Drains the shared ring buffer into the system's default output device.
//! Underruns play silence rather than ending the stream, so a stalled
//! producer (host hiccup, song switch) is audible as a gap, not a stop.

use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::RingBuffer;
use crate::{Result, SidError};

/// Batch size for ring buffer reads, keeps lock traffic low
const READ_CHUNK: usize = 1_024;

/// Audio source that reads from the ring buffer
struct RingBufferSource {
    ring_buffer: Arc<RingBuffer>,
    sample_rate: u32,
    finished: Arc<AtomicBool>,
    buffer: Vec<i16>,
    buffer_pos: usize,
}

impl RingBufferSource {
    fn new(ring_buffer: Arc<RingBuffer>, sample_rate: u32, finished: Arc<AtomicBool>) -> Self {
        RingBufferSource {
            ring_buffer,
            sample_rate,
            finished,
            buffer: vec![0; READ_CHUNK],
            buffer_pos: READ_CHUNK, // force a refill on first pull
        }
    }
}

impl Source for RingBufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        match self.ring_buffer.available_read() {
            0 => Some(READ_CHUNK),
            n => Some(n),
        }
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for RingBufferSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }

        if self.buffer_pos >= self.buffer.len() {
            let read = self.ring_buffer.read(&mut self.buffer);
            if read == 0 {
                // Underrun: keep the stream alive with silence
                self.buffer.fill(0);
            }
            self.buffer_pos = 0;
        }

        let sample = self.buffer[self.buffer_pos];
        self.buffer_pos += 1;
        Some(sample)
    }
}

/// Playback device pulling mixed samples from the ring buffer
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output device and start draining `ring_buffer`
    pub fn new(sample_rate: u32, ring_buffer: Arc<RingBuffer>) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SidError::AudioDeviceError(format!("failed to open stream: {e}")))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| SidError::AudioDeviceError(format!("failed to create sink: {e}")))?;

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingBufferSource::new(
            ring_buffer,
            sample_rate,
            Arc::clone(&finished),
        ));

        Ok(AudioDevice {
            _stream: stream,
            sink,
            finished,
        })
    }

    /// Pause output
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume output
    pub fn play(&self) {
        self.sink.play();
    }

    /// Signal that no more samples will be produced, letting the stream end
    /// instead of playing silence forever
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    /// Block until the stream has drained (call [`finish`](Self::finish)
    /// first)
    pub fn wait_for_finish(&self) {
        self.sink.sleep_until_end();
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.sink.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn try_device(sample_rate: u32) -> Option<(AudioDevice, Arc<RingBuffer>)> {
        let ring = Arc::new(RingBuffer::new(4_096).unwrap());
        match AudioDevice::new(sample_rate, Arc::clone(&ring)) {
            Ok(device) => Some((device, ring)),
            Err(err) => {
                eprintln!("skipping audio device test (no backend): {err}");
                None
            }
        }
    }

    #[test]
    fn test_device_creation_and_finish() {
        let Some((device, _ring)) = try_device(44_100) else {
            return;
        };
        device.finish();
        device.wait_for_finish();
    }

    #[test]
    fn test_source_reports_format() {
        let ring = Arc::new(RingBuffer::new(1_024).unwrap());
        let source = RingBufferSource::new(ring, 48_000, Arc::new(AtomicBool::new(false)));
        assert_eq!(source.sample_rate(), 48_000);
        assert_eq!(source.channels(), 1);
    }

    #[test]
    fn test_source_silence_on_underrun() {
        let ring = Arc::new(RingBuffer::new(1_024).unwrap());
        let mut source = RingBufferSource::new(ring, 44_100, Arc::new(AtomicBool::new(false)));
        assert_eq!(source.next(), Some(0));
    }

    #[test]
    fn test_source_ends_on_finished_signal() {
        let ring = Arc::new(RingBuffer::new(1_024).unwrap());
        let finished = Arc::new(AtomicBool::new(false));
        let mut source = RingBufferSource::new(ring, 44_100, Arc::clone(&finished));
        assert!(source.next().is_some());
        finished.store(true, Ordering::Relaxed);
        assert_eq!(source.next(), None);
    }

    #[test]
    fn test_source_passes_samples_through() {
        let ring = Arc::new(RingBuffer::new(1_024).unwrap());
        ring.write(&[11i16, -22, 33]);
        let mut source =
            RingBufferSource::new(Arc::clone(&ring), 44_100, Arc::new(AtomicBool::new(false)));
        assert_eq!(source.next(), Some(11));
        assert_eq!(source.next(), Some(-22));
        assert_eq!(source.next(), Some(33));
    }
}
