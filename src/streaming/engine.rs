//! Playback Producer Thread
//!
//! [`PlaybackEngine`] moves a [`SidPlayer`] onto its own thread and keeps the
//! ring buffer topped up one frame at a time. The buffer provides the
//! backpressure: when it is full the producer backs off, so emulation never
//! runs ahead of real time by more than the buffer depth.
//!
//! Control flows through atomics sampled between frames, never mid-frame:
//! song switch requests and the stop flag take effect at the next frame
//! boundary.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::{RingBuffer, StreamConfig, BUFFER_BACKOFF_MICROS};
use crate::replayer::{PlaybackState, SidPlayer};
use crate::Result;

/// Idle poll interval while no song is playing
const IDLE_POLL_MILLIS: u64 = 5;

/// Handle to a renderer running on its own thread
pub struct PlaybackEngine {
    buffer: Arc<RingBuffer>,
    stop: Arc<AtomicBool>,
    /// Pending song switch, 0 when none
    song_request: Arc<AtomicU16>,
    handle: Option<JoinHandle<SidPlayer>>,
}

impl PlaybackEngine {
    /// Move `player` onto a producer thread. The player should already have
    /// a tune loaded; whatever song is playing continues.
    pub fn spawn(player: SidPlayer, config: StreamConfig) -> Result<Self> {
        let buffer = Arc::new(RingBuffer::new(config.ring_buffer_size)?);
        let stop = Arc::new(AtomicBool::new(false));
        let song_request = Arc::new(AtomicU16::new(0));

        let thread_buffer = Arc::clone(&buffer);
        let thread_stop = Arc::clone(&stop);
        let thread_request = Arc::clone(&song_request);
        let handle = std::thread::spawn(move || {
            produce(player, thread_buffer, thread_stop, thread_request)
        });

        Ok(PlaybackEngine {
            buffer,
            stop,
            song_request,
            handle: Some(handle),
        })
    }

    /// Ring buffer the audio device should drain
    pub fn buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Ask the producer to switch to `song` (1-based) at the next frame
    /// boundary. A second request before the switch replaces the first.
    pub fn request_song(&self, song: u16) {
        self.song_request.store(song.max(1), Ordering::Release);
    }

    /// Signal the producer to finish after the current frame
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Stop the producer and get the player back
    pub fn join(mut self) -> SidPlayer {
        self.stop();
        self.handle
            .take()
            .expect("join called twice")
            .join()
            .expect("producer thread panicked")
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Producer loop: render one frame, push it with backpressure, repeat
fn produce(
    mut player: SidPlayer,
    buffer: Arc<RingBuffer>,
    stop: Arc<AtomicBool>,
    song_request: Arc<AtomicU16>,
) -> SidPlayer {
    let mut frame = vec![0i16; player.samples_per_frame()];

    while !stop.load(Ordering::Acquire) {
        let requested = song_request.swap(0, Ordering::AcqRel);
        if requested != 0 {
            buffer.flush();
            match player.play_song(requested) {
                Ok(()) => frame.resize(player.samples_per_frame(), 0),
                Err(err) => log::error!("song {requested} failed to start: {err}"),
            }
        }

        if player.state() != PlaybackState::Playing {
            std::thread::sleep(Duration::from_millis(IDLE_POLL_MILLIS));
            continue;
        }

        match player.render_frame(&mut frame) {
            Ok(_) => {
                let mut remaining: &[i16] = &frame;
                while !remaining.is_empty() && !stop.load(Ordering::Acquire) {
                    let written = buffer.write(remaining);
                    if written == 0 {
                        // Buffer full, back off and retry
                        std::thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
                    } else {
                        remaining = &remaining[written..];
                    }
                }
            }
            Err(err) => {
                // Watchdog or state failure: stop rather than re-trip the
                // same frame, idle until a new song is requested
                log::error!("playback halted: {err}");
                player.stop();
            }
        }
    }
    player
}
