//! Digi Sample Detector
//!
//! Some tunes stream 4-bit PCM by writing a small parameter block to
//! otherwise-unmapped addresses in the chip's page (the Galway/Sinsch sample
//! driver convention). The detector watches those writes, latches the
//! parameter block when a start command arrives, and then replays nibbles
//! straight out of emulated memory alongside the synthesized voices.

use crate::memory::MemoryImage;

/// Sample nibble ordering: low nibble first (0) or high nibble first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NibbleOrder {
    LowFirst,
    HighFirst,
}

/// State machine that recognizes and replays streamed 4-bit samples
#[derive(Debug, Clone)]
pub struct DigiDetector {
    sample_rate: u32,
    /// Emulated CPU clock in Hz, used to convert the driver's period values
    clock_rate: u32,

    // Parameter block as the driver writes it
    internal_start: u16,
    internal_end: u16,
    internal_repeat_start: u16,
    internal_repeat_times: u8,
    internal_period: u16,
    internal_order: u8,

    // Latched copy once playback starts
    active: bool,
    position: u16,
    start: u16,
    end: u16,
    repeat_start: u16,
    repeats: u8,
    period: u16,
    order: NibbleOrder,
    high_nibble: bool,

    frac_pos: u32,
    sample: i32,
}

impl DigiDetector {
    /// Create an idle detector
    pub fn new(sample_rate: u32, clock_rate: u32) -> Self {
        DigiDetector {
            sample_rate,
            clock_rate,
            internal_start: 0,
            internal_end: 0,
            internal_repeat_start: 0,
            internal_repeat_times: 0,
            internal_period: 0,
            internal_order: 0,
            active: false,
            position: 0,
            start: 0,
            end: 0,
            repeat_start: 0,
            repeats: 0,
            period: 0,
            order: NibbleOrder::LowFirst,
            high_nibble: false,
            frac_pos: 0,
            sample: 0,
        }
    }

    /// Whether a sample stream is currently playing
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Update the CPU clock used for period conversion
    pub fn set_clock_rate(&mut self, clock_rate: u32) {
        self.clock_rate = clock_rate;
    }

    /// Drop any running stream and clear the parameter block
    pub fn reset(&mut self) {
        let (sample_rate, clock_rate) = (self.sample_rate, self.clock_rate);
        *self = DigiDetector::new(sample_rate, clock_rate);
    }

    /// Observe a write into the chip page. Addresses that belong to the
    /// sample driver convention update the parameter block; everything else
    /// is ignored.
    pub fn offer(&mut self, addr: u16, value: u8) {
        // The driver's addresses sit in the chip's base page; mirrors fold
        // down to it
        match 0xd400 | (addr & 0xff) {
            0xd41e => self.internal_start = (self.internal_start & 0xff00) | value as u16,
            0xd41f => {
                self.internal_start = (self.internal_start & 0x00ff) | ((value as u16) << 8)
            }
            0xd47e => {
                self.internal_repeat_start =
                    (self.internal_repeat_start & 0xff00) | value as u16
            }
            0xd47f => {
                self.internal_repeat_start =
                    (self.internal_repeat_start & 0x00ff) | ((value as u16) << 8)
            }
            0xd43e => self.internal_end = (self.internal_end & 0xff00) | value as u16,
            0xd43f => self.internal_end = (self.internal_end & 0x00ff) | ((value as u16) << 8),
            0xd43d => self.internal_repeat_times = value,
            0xd45e => self.internal_period = (self.internal_period & 0xff00) | value as u16,
            0xd45f => {
                self.internal_period = (self.internal_period & 0x00ff) | ((value as u16) << 8)
            }
            0xd47d => self.internal_order = value,
            0xd41d => self.command(value),
            _ => {}
        }
    }

    /// Start/stop command. Only 0xFD (stop) and 0xFE/0xFF (start) are
    /// meaningful; any other value leaves the detector alone.
    fn command(&mut self, value: u8) {
        match value {
            0xfd => self.active = false,
            0xfe | 0xff => {
                self.repeats = self.internal_repeat_times;
                self.position = self.internal_start;
                self.start = self.internal_start;
                self.end = self.internal_end;
                self.repeat_start = self.internal_repeat_start;
                self.period = self.internal_period;
                self.order = if self.internal_order == 0 {
                    NibbleOrder::LowFirst
                } else {
                    NibbleOrder::HighFirst
                };
                self.high_nibble = self.order == NibbleOrder::HighFirst;
                self.frac_pos = 0;
                self.active = true;
                log::debug!(
                    "digi stream started: {:#06x}..{:#06x} period {}",
                    self.start,
                    self.end,
                    self.period
                );
            }
            _ => {}
        }
    }

    /// Produce one output sample's worth of PCM contribution
    pub fn tick(&mut self, mem: &MemoryImage) -> i32 {
        if !self.active || self.period == 0 {
            return 0;
        }
        if self.position >= self.end || self.position < self.start {
            return self.sample;
        }

        self.frac_pos += self.clock_rate / self.period as u32;
        if self.frac_pos > self.sample_rate {
            self.frac_pos %= self.sample_rate;

            // Advance one nibble
            match self.order {
                NibbleOrder::LowFirst => {
                    if self.high_nibble {
                        self.high_nibble = false;
                        self.position = self.position.wrapping_add(1);
                    } else {
                        self.high_nibble = true;
                    }
                }
                NibbleOrder::HighFirst => {
                    if self.high_nibble {
                        self.high_nibble = false;
                    } else {
                        self.high_nibble = true;
                        self.position = self.position.wrapping_add(1);
                    }
                }
            }

            if self.position >= self.end {
                if self.repeats > 0 {
                    self.repeats -= 1;
                    self.position = self.repeat_start;
                } else {
                    self.active = false;
                    return self.sample;
                }
            }

            let byte = mem.read(self.position);
            let nibble = if self.high_nibble {
                (byte & 0xf0) >> 4
            } else {
                byte & 0x0f
            };
            self.sample = ((nibble as i32) - 7) << 10;
        }
        self.sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_stream(digi: &mut DigiDetector, start: u16, end: u16, period: u16) {
        digi.offer(0xd41e, (start & 0xff) as u8);
        digi.offer(0xd41f, (start >> 8) as u8);
        digi.offer(0xd43e, (end & 0xff) as u8);
        digi.offer(0xd43f, (end >> 8) as u8);
        digi.offer(0xd45e, (period & 0xff) as u8);
        digi.offer(0xd45f, (period >> 8) as u8);
        digi.offer(0xd43d, 0); // no repeats
        digi.offer(0xd47d, 0); // low nibble first
        digi.offer(0xd41d, 0xff);
    }

    #[test]
    fn test_inactive_without_start_command() {
        let mem = MemoryImage::new();
        let mut digi = DigiDetector::new(44_100, 985_249);
        digi.offer(0xd41e, 0x00);
        digi.offer(0xd41f, 0x20);
        assert!(!digi.is_active());
        assert_eq!(digi.tick(&mem), 0);
    }

    #[test]
    fn test_start_latches_parameters() {
        let mut digi = DigiDetector::new(44_100, 985_249);
        start_stream(&mut digi, 0x2000, 0x2010, 0x0100);
        assert!(digi.is_active());
        // Rewriting the block after start must not affect the running stream
        digi.offer(0xd41e, 0x00);
        digi.offer(0xd41f, 0x40);
        assert_eq!(digi.start, 0x2000);
    }

    #[test]
    fn test_stop_command() {
        let mut digi = DigiDetector::new(44_100, 985_249);
        start_stream(&mut digi, 0x2000, 0x2010, 0x0100);
        digi.offer(0xd41d, 0xfd);
        assert!(!digi.is_active());
    }

    #[test]
    fn test_unknown_command_ignored() {
        let mut digi = DigiDetector::new(44_100, 985_249);
        start_stream(&mut digi, 0x2000, 0x2010, 0x0100);
        digi.offer(0xd41d, 0x42);
        assert!(digi.is_active());
    }

    #[test]
    fn test_nibbles_reach_output() {
        let mut mem = MemoryImage::new();
        // 0xF0: low nibble 0 (-7<<10), high nibble 0xF (+8<<10)
        for addr in 0x2000..0x2010 {
            mem.write(addr, 0xf0);
        }
        let mut digi = DigiDetector::new(44_100, 985_249);
        // Fast period so every tick advances a nibble
        start_stream(&mut digi, 0x2000, 0x2010, 0x0010);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            seen.insert(digi.tick(&mem));
        }
        assert!(seen.contains(&((0 - 7) << 10)));
        assert!(seen.contains(&((15 - 7) << 10)));
    }

    #[test]
    fn test_stream_ends_at_end_address() {
        let mem = MemoryImage::new();
        let mut digi = DigiDetector::new(44_100, 985_249);
        start_stream(&mut digi, 0x2000, 0x2004, 0x0010);
        for _ in 0..1_000 {
            digi.tick(&mem);
        }
        assert!(!digi.is_active());
    }

    #[test]
    fn test_zero_period_is_silent() {
        let mem = MemoryImage::new();
        let mut digi = DigiDetector::new(44_100, 985_249);
        start_stream(&mut digi, 0x2000, 0x2010, 0x0000);
        assert_eq!(digi.tick(&mem), 0);
    }
}
