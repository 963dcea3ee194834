//! ADSR Envelope Generator
//!
//! One envelope per voice, running in 24-bit fixed point (full scale is
//! 0xFFFFFF). Rate values are precomputed per sample rate from the chip's
//! nominal attack and decay/release timing tables, so the per-sample tick is
//! a single add or subtract plus a phase comparison.

/// Nominal attack times in seconds, indexed by the attack nibble
const ATTACK_TIMES: [f32; 16] = [
    0.0022528606,
    0.0080099577,
    0.0157696042,
    0.0237795619,
    0.0372963655,
    0.0550684591,
    0.0668330845,
    0.0783473987,
    0.0981219818,
    0.244554021,
    0.489108042,
    0.782472742,
    0.977715461,
    2.93364701,
    4.88907793,
    7.82272493,
];

/// Nominal decay/release times in seconds, indexed by the decay or release
/// nibble
const DECAY_RELEASE_TIMES: [f32; 16] = [
    0.00891777693,
    0.024594051,
    0.0484185907,
    0.0730116639,
    0.114512475,
    0.169078356,
    0.205199432,
    0.240551975,
    0.301266125,
    0.750858245,
    1.50171551,
    2.40243682,
    3.00189298,
    9.00721405,
    15.010998,
    24.0182111,
];

/// Full-scale envelope value (24-bit)
pub const ENV_MAX: u32 = 0xff_ffff;

/// Residual floor the release phase decays towards instead of true zero
const RELEASE_FLOOR: u32 = 0x4_0000;

/// Per-sample envelope rate deltas for one output sample rate.
///
/// Shared by all voices of a chip; built once at construction.
#[derive(Debug, Clone)]
pub struct EnvelopeRates {
    attack: [u32; 16],
    release: [u32; 16],
}

impl EnvelopeRates {
    /// Precompute per-sample deltas for `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        let mut attack = [0u32; 16];
        let mut release = [0u32; 16];
        for i in 0..16 {
            attack[i] = (0x100_0000 as f32 / (ATTACK_TIMES[i] * sample_rate as f32)) as u32;
            release[i] =
                (0x100_0000 as f32 / (DECAY_RELEASE_TIMES[i] * sample_rate as f32)) as u32;
        }
        EnvelopeRates { attack, release }
    }
}

/// Envelope phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvPhase {
    /// Rising towards full scale
    Attack,
    /// Falling towards the sustain level
    Decay,
    /// Holding the sustain level
    Sustain,
    /// Falling towards the residual floor
    #[default]
    Release,
}

/// One voice's ADSR state
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    phase: EnvPhase,
    value: u32,
    attack_add: u32,
    decay_sub: u32,
    release_sub: u32,
    sustain_level: u32,
}

impl Envelope {
    /// Current 24-bit envelope value
    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Current phase
    #[inline]
    pub fn phase(&self) -> EnvPhase {
        self.phase
    }

    /// Apply an attack/decay register write
    pub fn set_attack_decay(&mut self, ad: u8, rates: &EnvelopeRates) {
        self.attack_add = rates.attack[(ad >> 4) as usize];
        self.decay_sub = rates.release[(ad & 0x0f) as usize];
    }

    /// Apply a sustain/release register write. The sustain nibble maps to the
    /// top 4 bits of the 24-bit scale.
    pub fn set_sustain_release(&mut self, sr: u8, rates: &EnvelopeRates) {
        self.sustain_level = ((sr & 0xf0) as u32) << 16;
        self.release_sub = rates.release[(sr & 0x0f) as usize];
    }

    /// Gate handling for a waveform register write: raising the gate out of
    /// release restarts the attack, dropping it forces release.
    pub fn gate(&mut self, on: bool) {
        if on {
            if self.phase == EnvPhase::Release {
                self.phase = EnvPhase::Attack;
            }
        } else {
            self.phase = EnvPhase::Release;
        }
    }

    /// Reset to silence
    pub fn reset(&mut self) {
        self.phase = EnvPhase::Release;
        self.value = 0;
    }

    /// Advance one output sample
    pub fn tick(&mut self) {
        match self.phase {
            EnvPhase::Attack => {
                self.value += self.attack_add;
                if self.value >= ENV_MAX {
                    self.value = ENV_MAX;
                    self.phase = EnvPhase::Decay;
                }
            }
            EnvPhase::Decay => {
                self.value = self.value.saturating_sub(self.decay_sub);
                if self.value <= self.sustain_level {
                    self.value = self.sustain_level;
                    self.phase = EnvPhase::Sustain;
                }
            }
            EnvPhase::Sustain => {
                // Any sustain-level rewrite re-enters decay; its snap to the
                // target handles both directions
                if self.value != self.sustain_level {
                    self.phase = EnvPhase::Decay;
                }
            }
            EnvPhase::Release => {
                self.value = self.value.saturating_sub(self.release_sub);
                if self.value < RELEASE_FLOOR {
                    self.value = RELEASE_FLOOR;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> (Envelope, EnvelopeRates) {
        let rates = EnvelopeRates::new(44_100);
        let mut env = Envelope::default();
        env.set_attack_decay(0x00, &rates); // fastest attack and decay
        env.set_sustain_release(0xf0, &rates); // full sustain
        (env, rates)
    }

    #[test]
    fn test_attack_reaches_full_scale() {
        let (mut env, _) = envelope();
        env.gate(true);
        assert_eq!(env.phase(), EnvPhase::Attack);
        for _ in 0..200 {
            env.tick();
        }
        assert_eq!(env.value(), ENV_MAX);
        assert_ne!(env.phase(), EnvPhase::Attack);
    }

    #[test]
    fn test_decay_settles_on_sustain() {
        let rates = EnvelopeRates::new(44_100);
        let mut env = Envelope::default();
        env.set_attack_decay(0x00, &rates);
        env.set_sustain_release(0x80, &rates); // sustain at half scale
        env.gate(true);
        for _ in 0..2_000 {
            env.tick();
        }
        assert_eq!(env.phase(), EnvPhase::Sustain);
        assert_eq!(env.value(), 0x80_0000);
    }

    #[test]
    fn test_sustain_raise_reenters_decay() {
        let rates = EnvelopeRates::new(44_100);
        let mut env = Envelope::default();
        env.set_attack_decay(0x00, &rates);
        env.set_sustain_release(0x80, &rates);
        env.gate(true);
        for _ in 0..2_000 {
            env.tick();
        }
        assert_eq!(env.phase(), EnvPhase::Sustain);
        assert_eq!(env.value(), 0x80_0000);

        env.set_sustain_release(0xf0, &rates);
        env.tick();
        assert_eq!(env.phase(), EnvPhase::Decay);
        env.tick();
        assert_eq!(env.value(), 0xf0_0000);
        assert_eq!(env.phase(), EnvPhase::Sustain);
    }

    #[test]
    fn test_gate_off_releases() {
        let (mut env, _) = envelope();
        env.gate(true);
        for _ in 0..500 {
            env.tick();
        }
        let held = env.value();
        env.gate(false);
        env.tick();
        assert_eq!(env.phase(), EnvPhase::Release);
        assert!(env.value() < held);
    }

    #[test]
    fn test_gate_on_mid_decay_does_not_retrigger() {
        let rates = EnvelopeRates::new(44_100);
        let mut env = Envelope::default();
        env.set_attack_decay(0x0f, &rates); // slow decay
        env.set_sustain_release(0x00, &rates);
        env.gate(true);
        for _ in 0..500 {
            env.tick();
        }
        assert_eq!(env.phase(), EnvPhase::Decay);
        env.gate(true);
        assert_eq!(env.phase(), EnvPhase::Decay);
    }

    #[test]
    fn test_release_floors_above_zero() {
        let (mut env, _) = envelope();
        env.gate(true);
        for _ in 0..500 {
            env.tick();
        }
        env.gate(false);
        for _ in 0..200_000 {
            env.tick();
        }
        assert_eq!(env.value(), RELEASE_FLOOR);
    }
}
