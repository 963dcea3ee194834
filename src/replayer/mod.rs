//! Playback Engine
//!
//! [`SidPlayer`] drives a [`C64`] session frame by frame: one guarded call
//! into the tune's play routine, then exactly one frame's worth of rendered
//! samples. Frame length follows the tune's declared pacing, either the CIA
//! Timer A reload the init routine programmed or the video refresh rate.
//!
//! A watchdog abort inside the play routine fails the whole frame and stops
//! playback; the caller decides whether to move on to another song.

use serde::Serialize;

use crate::c64::C64;
use crate::sid::{VoiceSnapshot, CLOCK_NTSC, CLOCK_PAL};
use crate::tune::{Clock, SongTiming, Tune, TuneInfo};
use crate::visualization::SampleTap;
use crate::{GuardedPhase, Result, SidError};

/// Number of host volume steps above mute
pub const VOLUME_STEPS: u8 = 20;

/// Volume preset matching a typical line-out level
pub const LINE_LEVEL_VOLUME: u8 = 10;

/// Frame length in microseconds when the CIA reload is unprogrammed
const DEFAULT_FRAME_MICROS: u64 = 20_000;

/// CIA reload value corresponding to one 20 ms frame
const CIA_FRAME_RELOAD: u64 = 0x4c00;

/// PAL vertical refresh in Hz
const PAL_REFRESH: u32 = 50;
/// NTSC vertical refresh in Hz
const NTSC_REFRESH: u32 = 60;

/// Current playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    /// No song selected or playback stopped
    Stopped,
    /// A song is initialized and frames can be rendered
    Playing,
}

/// Summary of one rendered frame
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FrameInfo {
    /// Zero-based frame index since [`SidPlayer::play_song`]
    pub index: u64,
    /// Song being played, 1-based
    pub song: u16,
    /// Samples rendered into the caller's buffer
    pub samples: usize,
    /// Instructions the play routine executed this frame
    pub cpu_steps: u32,
}

/// Frame-paced tune player
pub struct SidPlayer {
    sample_rate: u32,
    c64: C64,
    tune: Option<Tune>,
    state: PlaybackState,
    current_song: u16,
    play_addr: u16,
    timing: SongTiming,
    samples_per_frame: usize,
    volume: u8,
    frames_rendered: u64,
    tap: Option<SampleTap>,
}

impl SidPlayer {
    /// Create a player rendering at `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        SidPlayer {
            sample_rate,
            c64: C64::new(sample_rate),
            tune: None,
            state: PlaybackState::Stopped,
            current_song: 0,
            play_addr: 0,
            timing: SongTiming::VerticalBlank,
            samples_per_frame: (sample_rate / PAL_REFRESH) as usize,
            volume: VOLUME_STEPS,
            frames_rendered: 0,
            tap: None,
        }
    }

    /// Parse a tune file and make it current. Playback stops; call
    /// [`play_song`](Self::play_song) to start.
    pub fn load_tune(&mut self, data: &[u8]) -> Result<&TuneInfo> {
        let tune = Tune::parse(data)?;
        log::info!(
            "loaded \"{}\" by {} ({} song{})",
            tune.info.name,
            tune.info.author,
            tune.info.songs,
            if tune.info.songs == 1 { "" } else { "s" }
        );
        self.state = PlaybackState::Stopped;
        self.current_song = 0;
        Ok(&self.tune.insert(tune).info)
    }

    /// Metadata of the current tune
    pub fn info(&self) -> Option<&TuneInfo> {
        self.tune.as_ref().map(|t| &t.info)
    }

    /// The tune's default song, or 1 when nothing is loaded
    pub fn start_song(&self) -> u16 {
        self.info().map_or(1, |i| i.start_song)
    }

    /// Install and initialize `song` (1-based, clamped to the tune's range).
    ///
    /// Reloads the machine image, runs the guarded init call and derives the
    /// frame length. A watchdog abort in init leaves the player stopped.
    pub fn play_song(&mut self, song: u16) -> Result<()> {
        let tune = self
            .tune
            .take()
            .ok_or_else(|| SidError::PlaybackState("no tune loaded".into()))?;
        let result = self.start_song_inner(&tune, song);
        self.tune = Some(tune);
        result
    }

    fn start_song_inner(&mut self, tune: &Tune, song: u16) -> Result<()> {
        self.state = PlaybackState::Stopped;
        let song = song.clamp(1, tune.info.songs);

        self.c64.install_tune(tune);
        self.c64.set_clock_rate(match tune.info.clock {
            Clock::Ntsc => CLOCK_NTSC,
            _ => CLOCK_PAL,
        });

        let steps = self
            .c64
            .guarded_call(tune.info.init_addr, (song - 1) as u8, GuardedPhase::Init)?;
        log::debug!("song {song} init finished in {steps} instructions");

        // A zero play address means the init routine installed an interrupt
        // handler; fetch it from the vector
        self.play_addr = if tune.info.play_addr == 0 {
            self.c64.read_mem_word(0xfffe)
        } else {
            tune.info.play_addr
        };

        self.timing = tune.info.song_timing(song);
        self.samples_per_frame = self.frame_length(tune.info.clock);
        self.current_song = song;
        self.frames_rendered = 0;
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Derive the frame length in samples from the pacing source
    fn frame_length(&self, clock: Clock) -> usize {
        let samples = match self.timing {
            SongTiming::CiaTimerA => {
                let reload = self.c64.read_mem(0xdc04) as u64
                    | ((self.c64.read_mem(0xdc05) as u64) << 8);
                let micros = if reload > 0 {
                    DEFAULT_FRAME_MICROS * reload / CIA_FRAME_RELOAD
                } else {
                    DEFAULT_FRAME_MICROS
                };
                (self.sample_rate as u64 * micros / 1_000_000) as usize
            }
            SongTiming::VerticalBlank => {
                let refresh = match clock {
                    Clock::Ntsc => NTSC_REFRESH,
                    _ => PAL_REFRESH,
                };
                (self.sample_rate / refresh) as usize
            }
        };
        samples.max(1)
    }

    /// Number of samples one frame produces for the current song
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /// Run one play-routine tick and render one frame into `out`.
    ///
    /// `out` may be any length; [`samples_per_frame`](Self::samples_per_frame)
    /// keeps the frame cadence exact. A watchdog abort fails the frame whole:
    /// nothing is rendered, but the session stays playing so the caller can
    /// skip the frame, switch songs or [`stop`](Self::stop).
    pub fn render_frame(&mut self, out: &mut [i16]) -> Result<FrameInfo> {
        if self.state != PlaybackState::Playing {
            return Err(SidError::PlaybackState("no song is playing".into()));
        }

        let cpu_steps = if self.play_addr > 1 {
            self.c64
                .guarded_call(self.play_addr, 0, GuardedPhase::Play)?
        } else {
            0
        };

        self.c64.render(out);
        if self.volume < VOLUME_STEPS {
            for sample in out.iter_mut() {
                *sample = (*sample as i32 * self.volume as i32 / VOLUME_STEPS as i32) as i16;
            }
        }

        if let Some(tap) = &self.tap {
            tap.offer(out);
        }

        let info = FrameInfo {
            index: self.frames_rendered,
            song: self.current_song,
            samples: out.len(),
            cpu_steps,
        };
        self.frames_rendered += 1;
        Ok(info)
    }

    /// Stop playback; the loaded tune stays current
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Song currently playing (1-based), 0 when stopped since load
    pub fn current_song(&self) -> u16 {
        self.current_song
    }

    /// Pacing source of the current song
    pub fn timing(&self) -> SongTiming {
        self.timing
    }

    /// Frames rendered since the last [`play_song`](Self::play_song)
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Playback position as wall-clock time
    pub fn elapsed(&self) -> std::time::Duration {
        let samples = self.frames_rendered * self.samples_per_frame as u64;
        std::time::Duration::from_micros(samples * 1_000_000 / self.sample_rate as u64)
    }

    /// Output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Host volume, 0..=[`VOLUME_STEPS`]
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Set the host volume (clamped to [`VOLUME_STEPS`])
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(VOLUME_STEPS);
    }

    /// Apply the line-out volume preset
    pub fn line_level(&mut self) {
        self.volume = LINE_LEVEL_VOLUME;
    }

    /// Number of chips the current tune maps
    pub fn chip_count(&self) -> usize {
        self.c64.chip_count()
    }

    /// Mute or unmute one voice of one chip
    pub fn set_voice_muted(&mut self, chip: usize, voice: usize, muted: bool) {
        if let Some(sid) = self.c64.sid_mut(chip) {
            sid.set_voice_muted(voice, muted);
        }
    }

    /// Snapshot one voice for visualization
    pub fn voice_snapshot(&self, chip: usize, voice: usize) -> Option<VoiceSnapshot> {
        self.c64.voice_snapshot(chip, voice)
    }

    /// Attach a lossy sample tap fed after each rendered frame
    pub fn attach_tap(&mut self, tap: SampleTap) {
        self.tap = Some(tap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Header builder shared by the playback tests
    fn file_with(init_play: &[u8], play_offset: u16, speed: u32) -> Vec<u8> {
        let mut data = vec![0u8; 0x7c];
        data[0..4].copy_from_slice(b"PSID");
        data[5] = 2;
        data[7] = 0x7c;
        data[8..10].copy_from_slice(&[0x10, 0x00]); // load 0x1000
        data[10..12].copy_from_slice(&[0x10, 0x00]); // init 0x1000
        let play = 0x1000 + play_offset;
        data[12] = (play >> 8) as u8;
        data[13] = (play & 0xff) as u8;
        data[15] = 1;
        data[17] = 1;
        data[18..22].copy_from_slice(&speed.to_be_bytes());
        data.extend_from_slice(init_play);
        data
    }

    /// Init that voices a gated pulse on voice 1, play that returns
    fn pulse_tune() -> Vec<u8> {
        #[rustfmt::skip]
        let program: &[u8] = &[
            0xa9, 0x0f, 0x8d, 0x18, 0xd4, // volume
            0xa9, 0x00, 0x8d, 0x00, 0xd4, // freq lo
            0xa9, 0x20, 0x8d, 0x01, 0xd4, // freq hi
            0xa9, 0x08, 0x8d, 0x03, 0xd4, // pulse hi (50%)
            0xa9, 0x00, 0x8d, 0x05, 0xd4, // fast attack/decay
            0xa9, 0xf0, 0x8d, 0x06, 0xd4, // full sustain
            0xa9, 0x41, 0x8d, 0x04, 0xd4, // pulse + gate
            0x60,
            0x60, // play: RTS
        ];
        file_with(program, 36, 0)
    }

    fn playing_player() -> SidPlayer {
        let mut player = SidPlayer::new(44_100);
        player.load_tune(&pulse_tune()).unwrap();
        player.play_song(1).unwrap();
        player
    }

    #[test]
    fn test_render_without_tune_errors() {
        let mut player = SidPlayer::new(44_100);
        assert!(matches!(
            player.play_song(1),
            Err(SidError::PlaybackState(_))
        ));
        let mut out = [0i16; 64];
        assert!(matches!(
            player.render_frame(&mut out),
            Err(SidError::PlaybackState(_))
        ));
    }

    #[test]
    fn test_pal_vbi_frame_length() {
        let player = playing_player();
        assert_eq!(player.timing(), SongTiming::VerticalBlank);
        assert_eq!(player.samples_per_frame(), 882);
    }

    #[test]
    fn test_frames_produce_audio() {
        let mut player = playing_player();
        let mut frame = vec![0i16; player.samples_per_frame()];
        let mut peak = 0i16;
        for i in 0..5 {
            let info = player.render_frame(&mut frame).unwrap();
            assert_eq!(info.index, i);
            assert_eq!(info.song, 1);
            assert_eq!(info.samples, frame.len());
            peak = peak.max(frame.iter().map(|s| s.abs()).max().unwrap());
        }
        assert!(peak > 0, "initialized tune rendered silence");
        assert_eq!(player.frames_rendered(), 5);
    }

    #[test]
    fn test_volume_scales_output() {
        let mut player = playing_player();
        let mut frame = vec![0i16; player.samples_per_frame()];
        player.render_frame(&mut frame).unwrap();
        let full = frame.iter().map(|s| s.abs()).max().unwrap();

        player.set_volume(VOLUME_STEPS / 2);
        player.render_frame(&mut frame).unwrap();
        let half = frame.iter().map(|s| s.abs()).max().unwrap();
        assert!(half < full);
        assert!(half >= full / 2 - 1);

        player.set_volume(0);
        player.render_frame(&mut frame).unwrap();
        assert!(frame.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_volume_clamps_to_steps() {
        let mut player = SidPlayer::new(44_100);
        player.set_volume(200);
        assert_eq!(player.volume(), VOLUME_STEPS);
        player.line_level();
        assert_eq!(player.volume(), LINE_LEVEL_VOLUME);
    }

    #[test]
    fn test_init_watchdog_keeps_player_stopped() {
        // Init that never returns: JMP $1000
        let data = file_with(&[0x4c, 0x00, 0x10], 3, 0);
        let mut player = SidPlayer::new(44_100);
        player.load_tune(&data).unwrap();
        assert!(matches!(
            player.play_song(1),
            Err(SidError::WatchdogExceeded {
                phase: GuardedPhase::Init,
                ..
            })
        ));
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_play_watchdog_fails_frame_but_session_survives() {
        // Init returns, play routine spins
        let data = file_with(&[0x60, 0x4c, 0x01, 0x10], 1, 0);
        let mut player = SidPlayer::new(44_100);
        player.load_tune(&data).unwrap();
        player.play_song(1).unwrap();
        let mut frame = vec![0i16; player.samples_per_frame()];
        assert!(matches!(
            player.render_frame(&mut frame),
            Err(SidError::WatchdogExceeded {
                phase: GuardedPhase::Play,
                ..
            })
        ));
        // The frame failed whole, but the session is still the caller's to
        // continue or abandon
        assert_eq!(player.state(), PlaybackState::Playing);
        assert_eq!(player.frames_rendered(), 0);
        assert!(matches!(
            player.render_frame(&mut frame),
            Err(SidError::WatchdogExceeded { .. })
        ));

        player.stop();
        assert!(matches!(
            player.render_frame(&mut frame),
            Err(SidError::PlaybackState(_))
        ));
    }

    #[test]
    fn test_cia_timing_follows_programmed_reload() {
        // Init programs half the default reload, speed bit selects CIA pacing
        #[rustfmt::skip]
        let program: &[u8] = &[
            0xa9, 0x00, 0x8d, 0x04, 0xdc, // timer lo
            0xa9, 0x26, 0x8d, 0x05, 0xdc, // timer hi (0x2600 = 0x4C00 / 2)
            0x60,
            0x60,
        ];
        let data = file_with(program, 11, 1);
        let mut player = SidPlayer::new(44_100);
        player.load_tune(&data).unwrap();
        player.play_song(1).unwrap();
        assert_eq!(player.timing(), SongTiming::CiaTimerA);
        // Half a 20 ms frame: 10 ms of samples
        assert_eq!(player.samples_per_frame(), 441);
    }

    #[test]
    fn test_cia_timing_defaults_without_reload() {
        let data = file_with(&[0x60, 0x60], 1, 1);
        let mut player = SidPlayer::new(44_100);
        player.load_tune(&data).unwrap();
        player.play_song(1).unwrap();
        // Unprogrammed timer falls back to a 20 ms frame
        assert_eq!(player.samples_per_frame(), 882);
    }

    #[test]
    fn test_song_number_clamps() {
        let mut player = playing_player();
        player.play_song(99).unwrap();
        assert_eq!(player.current_song(), 1);
        player.play_song(0).unwrap();
        assert_eq!(player.current_song(), 1);
    }

    #[test]
    fn test_song_restart_resets_position() {
        let mut player = playing_player();
        let mut frame = vec![0i16; player.samples_per_frame()];
        for _ in 0..3 {
            player.render_frame(&mut frame).unwrap();
        }
        assert!(player.elapsed().as_millis() >= 59);
        player.play_song(1).unwrap();
        assert_eq!(player.frames_rendered(), 0);
        assert_eq!(player.elapsed().as_millis(), 0);
    }

    #[test]
    fn test_voice_mute_silences_playback() {
        let mut player = playing_player();
        player.set_voice_muted(0, 0, true);
        let mut frame = vec![0i16; player.samples_per_frame()];
        player.render_frame(&mut frame).unwrap();
        assert!(frame.iter().all(|&s| s == 0));
        assert!(player.voice_snapshot(0, 0).unwrap().muted);
    }

    #[test]
    fn test_tap_receives_frames() {
        let mut player = playing_player();
        let tap = SampleTap::new(2_048);
        player.attach_tap(tap.clone());
        let mut frame = vec![0i16; player.samples_per_frame()];
        player.render_frame(&mut frame).unwrap();
        assert_eq!(tap.latest().len(), frame.len());
    }
}
