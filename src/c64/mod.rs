//! C64 Emulation Session
//!
//! Just enough machine to run a tune's player code: 64 KiB of RAM, the 6502
//! interpreter and one to three SID chips mapped into their register windows.
//! The session owns all of it; there is no global state, so independent
//! sessions can render different tunes side by side.

use crate::cpu::{Bus, Cpu};
use crate::memory::MemoryImage;
use crate::sid::{DigiDetector, Sid, VoiceSnapshot, CLOCK_PAL};
use crate::tune::Tune;
use crate::{GuardedPhase, Result};

/// Register base of the first (always present) chip
pub const CHIP1_BASE: u16 = 0xd400;

/// Memory, chips and the digi detector behind one [`Bus`] implementation.
///
/// Split out of [`C64`] so the CPU can borrow it mutably while the session
/// still owns the CPU itself.
pub struct SystemBus {
    mem: MemoryImage,
    sids: Vec<Sid>,
    digi: DigiDetector,
}

impl Bus for SystemBus {
    fn read(&mut self, addr: u16) -> u8 {
        // Only the first chip exposes the oscillator/envelope readback
        if let Some((0, reg @ (0x1b | 0x1c))) = self.mem.window_at(addr) {
            return self.sids[0].read_register(reg);
        }
        self.mem.read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.mem.write(addr, value);
        if let Some((chip, reg)) = self.mem.window_at(addr) {
            self.sids[chip].write_register(reg, value);
        }
        // The digi driver convention lives in the base chip's page,
        // including addresses outside any register window
        if addr & 0xfc00 == 0xd400 {
            self.digi.offer(addr, value);
        }
    }
}

impl SystemBus {
    /// Mix one output sample across all chips and the digi channel,
    /// saturating to 16 bits
    fn mix_sample(&mut self) -> i16 {
        let digi = self.digi.tick(&self.mem);
        let mut acc = 0i32;
        for (index, sid) in self.sids.iter_mut().enumerate() {
            acc += sid.clock(if index == 0 { digi } else { 0 });
        }
        acc.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}

/// One self-contained playback machine
pub struct C64 {
    cpu: Cpu,
    bus: SystemBus,
    sample_rate: u32,
    clock_rate: u32,
}

impl C64 {
    /// Create a session with a single chip at the standard base address
    pub fn new(sample_rate: u32) -> Self {
        let mut mem = MemoryImage::new();
        mem.register_window(0, CHIP1_BASE);
        C64 {
            cpu: Cpu::new(),
            bus: SystemBus {
                mem,
                sids: vec![Sid::new(sample_rate)],
                digi: DigiDetector::new(sample_rate, CLOCK_PAL),
            },
            sample_rate,
            clock_rate: CLOCK_PAL,
        }
    }

    /// Set the emulated CPU clock (PAL or NTSC rate)
    pub fn set_clock_rate(&mut self, clock_rate: u32) {
        self.clock_rate = clock_rate;
        self.bus.digi.set_clock_rate(clock_rate);
    }

    /// Current emulated CPU clock in Hz
    pub fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    /// Wipe memory, rebuild the chip set for `tune` and copy its payload in.
    /// Chips and the digi detector start from reset.
    pub fn install_tune(&mut self, tune: &Tune) {
        self.bus.mem.clear();
        self.bus.mem.clear_windows();
        self.bus.mem.register_window(0, CHIP1_BASE);

        self.bus.sids.clear();
        self.bus.sids.push(Sid::new(self.sample_rate));
        for (index, base) in [tune.info.chip2_addr, tune.info.chip3_addr]
            .into_iter()
            .flatten()
            .enumerate()
        {
            self.bus.mem.register_window(index + 1, base);
            self.bus.sids.push(Sid::new(self.sample_rate));
        }

        self.bus.digi.reset();
        self.cpu = Cpu::new();
        self.bus.mem.load_payload(tune.info.load_addr, &tune.payload);
    }

    /// Number of chips the installed tune maps
    pub fn chip_count(&self) -> usize {
        self.bus.sids.len()
    }

    /// Borrow a chip for inspection
    pub fn sid(&self, index: usize) -> Option<&Sid> {
        self.bus.sids.get(index)
    }

    /// Borrow a chip mutably (mute control)
    pub fn sid_mut(&mut self, index: usize) -> Option<&mut Sid> {
        self.bus.sids.get_mut(index)
    }

    /// Snapshot one voice of one chip
    pub fn voice_snapshot(&self, chip: usize, voice: usize) -> Option<VoiceSnapshot> {
        self.bus.sids.get(chip).map(|sid| sid.voice_snapshot(voice))
    }

    /// Plain memory read (CIA timer registers, vectors)
    pub fn read_mem(&self, addr: u16) -> u8 {
        self.bus.mem.read(addr)
    }

    /// Little-endian vector read
    pub fn read_mem_word(&self, addr: u16) -> u16 {
        self.bus.mem.read_word(addr)
    }

    /// Direct memory write, bypassing chip routing
    pub fn write_mem(&mut self, addr: u16, value: u8) {
        self.bus.mem.write(addr, value);
    }

    /// Cold-reset the CPU through the 0xFFFC vector
    pub fn cold_reset(&mut self) {
        self.cpu.reset(&mut self.bus);
    }

    /// Run a guarded call into the tune's init or play routine
    pub fn guarded_call(&mut self, target: u16, arg: u8, phase: GuardedPhase) -> Result<u32> {
        self.cpu.guarded_call(&mut self.bus, target, arg, phase)
    }

    /// Render `out.len()` mixed samples from the current chip state
    pub fn render(&mut self, out: &mut [i16]) {
        for sample in out.iter_mut() {
            *sample = self.bus.mix_sample();
        }
    }

    /// Whether a digi stream is currently playing
    pub fn digi_active(&self) -> bool {
        self.bus.digi.is_active()
    }
}
