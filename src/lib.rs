//! SID Emulator and PSID/RSID Tune Player
//!
//! An emulator of the MOS 6581/8580 SID sound chip together with just enough
//! of a C64 (64 KiB of RAM and a 6502 interpreter) to run the player code
//! embedded in PSID/RSID tune files and synthesize the resulting audio.
//!
//! # Features
//! - Integer-arithmetic SID synthesis: 3 voices per chip, ADSR envelopes,
//!   hard sync, ring modulation, noise LFSR and the shared multi-mode
//!   resonant filter
//! - Up to three SID chips per tune (PSID v3/v4 second/third chip addresses)
//! - 6502 interpreter with a step-count watchdog so malformed or hostile
//!   player code can never hang the audio path
//! - PSID/RSID format parser covering versions 1-4 with the historical
//!   quirks (embedded load address, speed tables, relocation validation)
//! - Digi-sample side channel for tunes that stream 4-bit PCM through
//!   undocumented register writes
//! - Frame-exact render scheduler with CIA Timer A or VBI pacing
//! - Optional real-time streaming playback and a lossy visualization tap
//!
//! # Crate feature flags
//! - `streaming` (opt-in): Real-time audio output (enables optional `rodio` dep)
//!
//! # Quick start
//! ## Render a tune to samples
//! ```no_run
//! use sid6581::SidPlayer;
//! let data = std::fs::read("tune.sid").unwrap();
//! let mut player = SidPlayer::new(44_100);
//! player.load_tune(&data).unwrap();
//! player.play_song(player.start_song()).unwrap();
//! let mut frame = vec![0i16; player.samples_per_frame()];
//! player.render_frame(&mut frame).unwrap();
//! ```
//!
//! ## Real-time streaming
//! ```no_run
//! # #[cfg(feature = "streaming")]
//! # {
//! use sid6581::streaming::{AudioDevice, PlaybackEngine, StreamConfig};
//! use sid6581::SidPlayer;
//! let data = std::fs::read("tune.sid").unwrap();
//! let mut player = SidPlayer::new(44_100);
//! player.load_tune(&data).unwrap();
//! player.play_song(player.start_song()).unwrap();
//! let engine = PlaybackEngine::spawn(player, StreamConfig::default()).unwrap();
//! let _dev = AudioDevice::new(44_100, engine.buffer()).unwrap();
//! # }
//! ```

#![warn(missing_docs)]

pub mod c64; // C64 Emulation Session (CPU + memory + chips)
pub mod cpu; // 6502 Interpreter
pub mod memory; // Memory Image & Chip Windows
pub mod replayer; // Playback Engine
pub mod sid; // SID Chip Emulation (core)
pub mod streaming; // Audio Output & Streaming
pub mod tune; // PSID/RSID Format Parsing
pub mod visualization; // Sample Tap Helpers

/// Which guarded CPU call tripped the watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedPhase {
    /// The tune's init routine (song setup)
    Init,
    /// The tune's play routine (one frame tick)
    Play,
}

impl std::fmt::Display for GuardedPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardedPhase::Init => write!(f, "init"),
            GuardedPhase::Play => write!(f, "play"),
        }
    }
}

/// Error types for SID emulator operations
#[derive(thiserror::Error, Debug)]
pub enum SidError {
    /// Tune file header is too short or carries an unknown magic tag
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// A guarded CPU call exceeded the instruction watchdog ceiling
    #[error("Watchdog exceeded during {phase} call after {steps} instructions")]
    WatchdogExceeded {
        /// Call boundary that was aborted
        phase: GuardedPhase,
        /// Instructions executed before the abort
        steps: u32,
    },

    /// No tune is loaded or no song is playing
    #[error("Playback state error: {0}")]
    PlaybackState(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for SidError {
    /// Converts a String into `SidError::Other`.
    ///
    /// Convenience conversion for generic string errors. Prefer the specific
    /// variant constructors when the failure class is known:
    /// - `SidError::MalformedHeader(msg)` for tune parsing failures
    /// - `SidError::ConfigError(msg)` for invalid configuration
    /// - `SidError::AudioDeviceError(msg)` for device initialization
    fn from(msg: String) -> Self {
        SidError::Other(msg)
    }
}

impl From<&str> for SidError {
    /// Converts a string slice into `SidError::Other`.
    fn from(msg: &str) -> Self {
        SidError::Other(msg.to_string())
    }
}

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, SidError>;

// Public API exports
pub use c64::C64;
pub use cpu::Cpu;
pub use memory::MemoryImage;
pub use replayer::{FrameInfo, PlaybackState, SidPlayer};
pub use sid::Sid;
pub use tune::{ChipModel, Clock, Compatibility, SongTiming, TuneInfo};
pub use visualization::SampleTap;
