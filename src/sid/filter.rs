//! Resonant Multi-Mode Filter
//!
//! State-variable filter shared by the three voices of a chip, computed in
//! 16.16 fixed point. Low-pass, band-pass and high-pass taps can be enabled
//! in any combination; resonance comes from the register's top nibble.

/// 16.16 fixed-point one
const FIX_ONE: i32 = 0x1_0000;

#[inline]
fn fix16(value: f32) -> i32 {
    (value * FIX_ONE as f32) as i32
}

/// Shared filter state for one chip
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Cutoff coefficient (16.16)
    freq: i32,
    /// Resonance coefficient (8.8 after the write-time shift)
    rez: i32,
    low: i32,
    band: i32,
    high: i32,
    low_enable: bool,
    band_enable: bool,
    high_enable: bool,
    /// Cutoff scale per register unit for the current sample rate
    filtmul: i32,
    freq_lo: u8,
    freq_hi: u8,
}

impl Filter {
    /// Create a filter for the given output sample rate
    pub fn new(sample_rate: u32) -> Self {
        Filter {
            filtmul: fix16(21.5332031) / sample_rate as i32,
            rez: fix16(1.2) >> 8,
            ..Default::default()
        }
    }

    /// Clear the integrator state; coefficients survive
    pub fn reset(&mut self) {
        self.low = 0;
        self.band = 0;
        self.high = 0;
    }

    /// Low byte of the cutoff register (only the low 3 bits count)
    pub fn set_freq_lo(&mut self, value: u8) {
        self.freq_lo = value;
        self.update_cutoff();
    }

    /// High byte of the cutoff register
    pub fn set_freq_hi(&mut self, value: u8) {
        self.freq_hi = value;
        self.update_cutoff();
    }

    /// Resonance nibble from the routing/resonance register
    pub fn set_resonance(&mut self, res_nibble: u8) {
        self.rez = (fix16(1.2) - fix16(0.04) * res_nibble as i32) >> 8;
    }

    /// Mode bits from the mode/volume register (bit 4 low, bit 5 band,
    /// bit 6 high)
    pub fn set_modes(&mut self, ftp_vol: u8) {
        self.low_enable = ftp_vol & 0x10 != 0;
        self.band_enable = ftp_vol & 0x20 != 0;
        self.high_enable = ftp_vol & 0x40 != 0;
    }

    fn update_cutoff(&mut self) {
        let units = 16 * self.freq_hi as i32 + (self.freq_lo & 7) as i32;
        self.freq = (units * self.filtmul).min(FIX_ONE);
    }

    /// Run one sample of the routed voice sum through the filter and return
    /// the sum of the enabled taps
    pub fn clock(&mut self, input: i32) -> i32 {
        self.high = (input << 16) - (self.band >> 8) * self.rez - self.low;
        self.band += (self.freq >> 8) * (self.high >> 8);
        self.low += (self.freq >> 8) * (self.band >> 8);

        let mut out = 0;
        if self.low_enable {
            out += self.low >> 16;
        }
        if self.band_enable {
            out += self.band >> 16;
        }
        if self.high_enable {
            out += self.high >> 16;
        }
        out
    }
}
