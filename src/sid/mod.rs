//! SID Chip Emulation
//!
//! Integer-arithmetic emulation of one MOS 6581/8580: three tone oscillators
//! with ADSR envelopes, the shared resonant multi-mode filter and the two
//! readable registers (oscillator 3 and envelope 3). Rendering is
//! sample-synchronous: the register file is poked between frames by the
//! player code and [`Sid::clock`] produces one output sample per call.
//!
//! Multi-chip tunes instantiate one [`Sid`] per mapped register window; the
//! emulation session sums the chips' outputs before saturation.

mod digi;
mod envelope;
mod filter;
mod voice;

pub use digi::DigiDetector;
pub use envelope::{EnvPhase, Envelope, EnvelopeRates};
pub use filter::Filter;
pub use voice::Voice;
pub use voice::{
    CTRL_GATE, CTRL_NOISE, CTRL_PULSE, CTRL_RING, CTRL_SAW, CTRL_SYNC, CTRL_TEST, CTRL_TRIANGLE,
};

/// PAL C64 CPU clock in Hz
pub const CLOCK_PAL: u32 = 985_249;
/// NTSC C64 CPU clock in Hz
pub const CLOCK_NTSC: u32 = 1_022_727;

/// Scale numerator mapping register frequency units to 28-bit phase
/// increments; divided by the sample rate at construction
const FREQ_SCALE: u32 = 15_872_000;

/// Point-in-time view of one voice, for visualizers and diagnostics
#[derive(Debug, Clone, Copy)]
pub struct VoiceSnapshot {
    /// 16-bit frequency register value
    pub freq: u16,
    /// 12-bit pulse width register value
    pub pulse: u16,
    /// Control register (gate and waveform bits)
    pub wave: u8,
    /// Envelope level scaled to 0..=255
    pub env_level: u8,
    /// Gate bit state
    pub gate: bool,
    /// Host-side mute state
    pub muted: bool,
}

/// One emulated SID chip
pub struct Sid {
    voices: [Voice; 3],
    filter: Filter,
    rates: EnvelopeRates,
    freqmul: u32,
    /// Low nibble of the routing/resonance register: per-voice filter routing
    routing: u8,
    /// Master volume nibble
    volume: i32,
    /// Bit 7 of the mode/volume register silences voice 3
    voice3_off: bool,
}

impl Sid {
    /// Create a silent chip for the given output sample rate
    pub fn new(sample_rate: u32) -> Self {
        let mut voices: [Voice; 3] = Default::default();
        for voice in &mut voices {
            voice.reset();
        }
        Sid {
            voices,
            filter: Filter::new(sample_rate),
            rates: EnvelopeRates::new(sample_rate),
            freqmul: FREQ_SCALE / sample_rate,
            routing: 0,
            volume: 0,
            voice3_off: false,
        }
    }

    /// Reset all voices, envelopes and filter state. Rate tables survive.
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
        self.filter.reset();
        self.routing = 0;
        self.volume = 0;
        self.voice3_off = false;
    }

    /// Apply a write to register `reg` (0..=24); higher offsets in the
    /// 32-byte window are ignored
    pub fn write_register(&mut self, reg: u8, value: u8) {
        match reg {
            0..=20 => {
                let voice = &mut self.voices[(reg / 7) as usize];
                match reg % 7 {
                    0 => voice.freq = (voice.freq & 0xff00) | value as u16,
                    1 => voice.freq = (voice.freq & 0x00ff) | ((value as u16) << 8),
                    2 => voice.pulse = (voice.pulse & 0x0f00) | value as u16,
                    3 => voice.pulse = (voice.pulse & 0x00ff) | (((value & 0x0f) as u16) << 8),
                    4 => {
                        voice.wave = value;
                        voice.env.gate(value & CTRL_GATE != 0);
                    }
                    5 => voice.env.set_attack_decay(value, &self.rates),
                    _ => voice.env.set_sustain_release(value, &self.rates),
                }
            }
            21 => self.filter.set_freq_lo(value),
            22 => self.filter.set_freq_hi(value),
            23 => {
                self.routing = value & 0x0f;
                self.filter.set_resonance(value >> 4);
            }
            24 => {
                self.volume = (value & 0x0f) as i32;
                self.voice3_off = value & 0x80 != 0;
                self.filter.set_modes(value);
            }
            _ => {}
        }
    }

    /// Read one of the two readable registers: 0x1B mirrors oscillator 3's
    /// phase, 0x1C mirrors envelope 3's level. Other offsets read as zero.
    pub fn read_register(&self, reg: u8) -> u8 {
        match reg {
            0x1b => (self.voices[2].counter() >> 20) as u8,
            0x1c => (self.voices[2].env.value() >> 16) as u8,
            _ => 0,
        }
    }

    /// Mute or unmute one voice. A muted voice keeps running (so oscillator
    /// and envelope readback stay live) but is dropped from the mix.
    pub fn set_voice_muted(&mut self, voice: usize, muted: bool) {
        if voice < 3 {
            self.voices[voice].muted = muted;
        }
    }

    /// Current mute state of a voice
    pub fn voice_muted(&self, voice: usize) -> bool {
        voice < 3 && self.voices[voice].muted
    }

    /// Snapshot one voice's register and envelope state
    pub fn voice_snapshot(&self, voice: usize) -> VoiceSnapshot {
        let v = &self.voices[voice];
        VoiceSnapshot {
            freq: v.freq,
            pulse: v.pulse,
            wave: v.wave,
            env_level: (v.env.value() >> 16) as u8,
            gate: v.wave & CTRL_GATE != 0,
            muted: v.muted,
        }
    }

    /// Produce one output sample. `ext_in` is mixed onto the unfiltered bus
    /// (digi samples). The return value is pre-saturation; the caller sums
    /// chips and clamps.
    pub fn clock(&mut self, ext_in: i32) -> i32 {
        let mut out_filtered = 0i32;
        let mut out_direct = ext_in;

        for v in 0..3 {
            let refv = if v == 0 { 2 } else { v - 1 };
            let ref_counter = self.voices[refv].counter();
            let ref_freq = self.voices[refv].freq;

            let voice = &mut self.voices[v];
            voice.advance(self.freqmul, ref_counter, ref_freq);
            let wave_out = voice.output(ref_counter);
            voice.env.tick();

            if voice.muted || (v == 2 && self.voice3_off) {
                continue;
            }
            let level = ((wave_out as i32 - 0x80) * voice.env.value() as i32) >> 22;
            if self.routing & (1 << v) != 0 {
                out_filtered += level;
            } else {
                out_direct += level;
            }
        }

        self.volume * (out_direct + self.filter.clock(out_filtered))
    }
}
