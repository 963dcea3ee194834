//! End-to-end playback tests: a synthetic tune file is parsed, installed,
//! initialized through the 6502 and rendered to samples, exercising the
//! whole pipeline the way the CLI does.

use approx::assert_relative_eq;
use sid6581::replayer::PlaybackState;
use sid6581::{SidError, SidPlayer, SongTiming};

const SAMPLE_RATE: u32 = 44_100;

/// Build a v2 file whose init voices a gated 50% pulse on voice 1 and whose
/// play routine returns immediately.
///
/// The frequency register value selects roughly 483 Hz at the emulation's
/// phase scaling, which the frequency estimate below checks against.
fn pulse_tune(songs: u8) -> Vec<u8> {
    let mut data = vec![0u8; 0x7c];
    data[0..4].copy_from_slice(b"PSID");
    data[5] = 2;
    data[7] = 0x7c;
    data[8..10].copy_from_slice(&[0x10, 0x00]); // load
    data[10..12].copy_from_slice(&[0x10, 0x00]); // init
    data[12..14].copy_from_slice(&[0x10, 0x24]); // play (init + 36)
    data[15] = songs;
    data[17] = 1;
    data[22..32].copy_from_slice(b"Pulse Test");
    #[rustfmt::skip]
    data.extend_from_slice(&[
        0xa9, 0x0f, 0x8d, 0x18, 0xd4, // volume 15
        0xa9, 0x00, 0x8d, 0x00, 0xd4, // freq lo
        0xa9, 0x20, 0x8d, 0x01, 0xd4, // freq hi 0x20
        0xa9, 0x08, 0x8d, 0x03, 0xd4, // pulse width 50%
        0xa9, 0x00, 0x8d, 0x05, 0xd4, // fastest attack/decay
        0xa9, 0xf0, 0x8d, 0x06, 0xd4, // full sustain
        0xa9, 0x41, 0x8d, 0x04, 0xd4, // pulse waveform, gate on
        0x60,                         // init: RTS
        0x60,                         // play: RTS
    ]);
    data
}

fn render_seconds(player: &mut SidPlayer, seconds: f64) -> Vec<i16> {
    let total = (player.sample_rate() as f64 * seconds) as usize;
    let mut out = Vec::with_capacity(total);
    let mut frame = vec![0i16; player.samples_per_frame()];
    while out.len() < total {
        player.render_frame(&mut frame).expect("frame failed");
        out.extend_from_slice(&frame);
    }
    out.truncate(total);
    out
}

/// Rising zero crossings per second of rendered audio
fn estimate_frequency(samples: &[i16], sample_rate: u32) -> f64 {
    let crossings = samples
        .windows(2)
        .filter(|pair| pair[0] <= 0 && pair[1] > 0)
        .count();
    crossings as f64 * sample_rate as f64 / samples.len() as f64
}

#[test]
fn test_full_pipeline_produces_pitched_audio() {
    let mut player = SidPlayer::new(SAMPLE_RATE);
    let info = player.load_tune(&pulse_tune(1)).unwrap();
    assert_eq!(info.name, "Pulse Test");
    assert_eq!(info.songs, 1);

    player.play_song(player.start_song()).unwrap();
    assert_eq!(player.state(), PlaybackState::Playing);
    assert_eq!(player.timing(), SongTiming::VerticalBlank);
    assert_eq!(player.samples_per_frame(), 882); // PAL 50 Hz at 44.1 kHz

    // Skip the attack transient, then measure a full second
    let samples = render_seconds(&mut player, 1.2);
    let steady = &samples[SAMPLE_RATE as usize / 5..];

    let peak = steady.iter().map(|s| s.abs()).max().unwrap();
    assert!(peak > 1_000, "peak {peak} too quiet for a full-volume voice");

    let freq = estimate_frequency(steady, SAMPLE_RATE);
    assert_relative_eq!(freq, 483.0, max_relative = 0.05);
}

#[test]
fn test_gate_clear_decays_to_near_silence() {
    // Same init, but the play routine counts frames and drops the gate on
    // its tenth call
    let mut data = pulse_tune(1);
    data.truncate(0x7c + 36);
    #[rustfmt::skip]
    data.extend_from_slice(&[
        0xe6, 0x02,       // INC $02
        0xa5, 0x02,       // LDA $02
        0xc9, 0x0a,       // CMP #10
        0xd0, 0x05,       // BNE past the gate clear
        0xa9, 0x40,       // pulse waveform, gate off
        0x8d, 0x04, 0xd4,
        0x60,
    ]);

    let mut player = SidPlayer::new(SAMPLE_RATE);
    player.load_tune(&data).unwrap();
    player.play_song(1).unwrap();

    // Ten frames of gated audio, the last one already releasing
    let sounding = render_seconds(&mut player, 0.2);
    let sounding_peak = sounding.iter().map(|s| s.abs()).max().unwrap();
    assert!(sounding_peak > 3_000, "gated peak {sounding_peak} too quiet");

    let faded = render_seconds(&mut player, 0.5);
    let tail = &faded[faded.len() - player.samples_per_frame()..];
    let tail_peak = tail.iter().map(|s| s.abs()).max().unwrap();
    assert!(
        tail_peak < sounding_peak / 10,
        "output did not decay after gate clear: tail {tail_peak} vs gated {sounding_peak}"
    );
}

#[test]
fn test_watchdog_tune_is_unplayable_end_to_end() {
    // Same header, but init spins forever
    let mut data = pulse_tune(1);
    data.truncate(0x7c);
    data.extend_from_slice(&[0x4c, 0x00, 0x10]); // JMP $1000

    let mut player = SidPlayer::new(SAMPLE_RATE);
    player.load_tune(&data).unwrap();
    match player.play_song(1) {
        Err(SidError::WatchdogExceeded { steps, .. }) => assert_eq!(steps, 0xffff),
        other => panic!("expected watchdog abort, got {other:?}"),
    }
    assert_eq!(player.state(), PlaybackState::Stopped);
}

#[test]
fn test_song_switch_reinitializes_machine() {
    let mut player = SidPlayer::new(SAMPLE_RATE);
    player.load_tune(&pulse_tune(3)).unwrap();

    player.play_song(1).unwrap();
    let first = render_seconds(&mut player, 0.3);

    player.play_song(2).unwrap();
    assert_eq!(player.current_song(), 2);
    assert_eq!(player.frames_rendered(), 0);
    let second = render_seconds(&mut player, 0.3);

    // Same init routine, so a fresh machine must reproduce the same audio
    assert_eq!(first, second);
}

#[test]
fn test_malformed_file_is_rejected_up_front() {
    let mut player = SidPlayer::new(SAMPLE_RATE);
    assert!(matches!(
        player.load_tune(b"not a sid file"),
        Err(SidError::MalformedHeader(_))
    ));
    assert!(player.info().is_none());
}

#[test]
fn test_mute_and_volume_compose() {
    let mut player = SidPlayer::new(SAMPLE_RATE);
    player.load_tune(&pulse_tune(1)).unwrap();
    player.play_song(1).unwrap();

    player.line_level();
    let line = render_seconds(&mut player, 0.2);
    let line_peak = line.iter().map(|s| s.abs()).max().unwrap();

    player.play_song(1).unwrap();
    player.set_volume(sid6581::replayer::VOLUME_STEPS);
    let full = render_seconds(&mut player, 0.2);
    let full_peak = full.iter().map(|s| s.abs()).max().unwrap();
    assert!(line_peak < full_peak);

    player.set_voice_muted(0, 0, true);
    let muted = render_seconds(&mut player, 0.2);
    assert!(muted.iter().all(|&s| s == 0));
}
