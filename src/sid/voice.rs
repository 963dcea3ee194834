//! Tone Oscillator
//!
//! One of the three oscillators of a SID chip: a 28-bit phase accumulator
//! feeding four waveform shapers (triangle, sawtooth, pulse, noise). Selected
//! waveforms are ANDed together the way the real chip's output bus combines
//! them. Hard sync and ring modulation read the neighbouring oscillator's
//! state, which the chip passes in per sample.

use super::envelope::Envelope;

/// Phase accumulator width mask (28 bits)
const PHASE_MASK: u32 = 0x0fff_ffff;

/// Gate bit of the control register
pub const CTRL_GATE: u8 = 0x01;
/// Hard sync bit
pub const CTRL_SYNC: u8 = 0x02;
/// Ring modulation bit
pub const CTRL_RING: u8 = 0x04;
/// Test bit: holds the oscillator reset
pub const CTRL_TEST: u8 = 0x08;
/// Triangle waveform select
pub const CTRL_TRIANGLE: u8 = 0x10;
/// Sawtooth waveform select
pub const CTRL_SAW: u8 = 0x20;
/// Pulse waveform select
pub const CTRL_PULSE: u8 = 0x40;
/// Noise waveform select
pub const CTRL_NOISE: u8 = 0x80;

/// Oscillator and envelope state for one voice
#[derive(Debug, Clone, Default)]
pub struct Voice {
    /// 16-bit frequency register
    pub freq: u16,
    /// 12-bit pulse width register
    pub pulse: u16,
    /// Control register (gate, sync, ring, test, waveform selects)
    pub wave: u8,
    /// ADSR state
    pub env: Envelope,
    /// Host-side mute: the voice keeps running but is dropped from the mix
    pub muted: bool,
    counter: u32,
    noisepos: u32,
    noiseval: u32,
    noiseout: u8,
}

impl Voice {
    /// Current 28-bit phase accumulator value
    #[inline]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Clear all oscillator and envelope state
    pub fn reset(&mut self) {
        self.freq = 0;
        self.pulse = 0;
        self.wave = 0;
        self.counter = 0;
        self.noisepos = 0;
        self.noiseval = 0x7f_fff8;
        self.noiseout = 0;
        self.muted = false;
        self.env.reset();
    }

    /// Advance the phase accumulator one sample. `freqmul` scales register
    /// frequency units to phase increments; the reference oscillator drives
    /// hard sync.
    pub fn advance(&mut self, freqmul: u32, ref_counter: u32, ref_freq: u16) {
        self.counter = (self.counter + self.freq as u32 * freqmul) & PHASE_MASK;

        if self.wave & CTRL_TEST != 0 {
            self.counter = 0;
            self.noisepos = 0;
            self.noiseval = 0xff_ffff;
        }

        // Hard sync: when the reference oscillator has just wrapped, realign
        // this phase proportionally
        if self.wave & CTRL_SYNC != 0 && ref_counter < ref_freq as u32 {
            self.counter = ref_counter * self.freq as u32 / ref_freq as u32;
        }
    }

    /// Compute the 8-bit combined waveform output for the current phase
    pub fn output(&mut self, ref_counter: u32) -> u8 {
        let mut triangle = ((self.counter >> 19) & 0xff) as u8;
        if self.counter & 0x0800_0000 != 0 {
            triangle ^= 0xff;
        }
        // Ring modulation replaces the triangle MSB source with the
        // reference oscillator's
        if self.wave & CTRL_RING != 0 && ref_counter < 0x0800_0000 {
            triangle ^= 0xff;
        }

        let saw = ((self.counter >> 20) & 0xff) as u8;

        let pulse = if self.counter > (self.pulse as u32) << 16 {
            0x00
        } else {
            0xff
        };

        if self.noisepos != self.counter >> 23 {
            self.noisepos = self.counter >> 23;
            let feedback = ((self.noiseval >> 22) ^ (self.noiseval >> 17)) & 1;
            self.noiseval = ((self.noiseval << 1) | feedback) & 0x7f_ffff;
            self.noiseout = (((self.noiseval >> 22) & 1) << 7
                | ((self.noiseval >> 20) & 1) << 6
                | ((self.noiseval >> 16) & 1) << 5
                | ((self.noiseval >> 13) & 1) << 4
                | ((self.noiseval >> 11) & 1) << 3
                | ((self.noiseval >> 7) & 1) << 2
                | ((self.noiseval >> 4) & 1) << 1
                | ((self.noiseval >> 2) & 1)) as u8;
        }

        let mut out = 0xff;
        if self.wave & CTRL_TRIANGLE != 0 {
            out &= triangle;
        }
        if self.wave & CTRL_SAW != 0 {
            out &= saw;
        }
        if self.wave & CTRL_PULSE != 0 {
            out &= pulse;
        }
        if self.wave & CTRL_NOISE != 0 {
            out &= self.noiseout;
        }
        out
    }
}
