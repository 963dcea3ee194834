//! 6502 Interpreter
//!
//! A fetch-decode-execute interpreter for the MOS 6502 as SID tunes use it:
//! no cycle counting, no interrupts, decimal mode latched but not applied.
//! Dispatch goes through a typed 256-entry `(Op, Mode)` table; undefined
//! opcodes are no-ops and BRK forces the program counter to zero, which the
//! guarded-call loop treats as a halt.
//!
//! Tune player code is untrusted input. Every init/play invocation therefore
//! runs as a *guarded call*: the call frame is synthesized so that a final RTS
//! lands on address 1, and an instruction-count watchdog aborts runaway code
//! before it can stall the audio path.

use crate::{GuardedPhase, Result, SidError};

/// Abstract byte bus the interpreter executes against.
///
/// The emulation session implements this to divert SID window writes to the
/// chip register logic; plain arrays implement it in tests.
pub trait Bus {
    /// Read one byte
    fn read(&mut self, addr: u16) -> u8;
    /// Write one byte
    fn write(&mut self, addr: u16, value: u8);
}

/// Instruction ceiling for one guarded call. A play routine is expected to
/// finish in a few thousand instructions; anything past this is looping.
pub const WATCHDOG_STEP_LIMIT: u32 = 0xffff;

/// Negative flag
pub const FLAG_N: u8 = 0x80;
/// Overflow flag
pub const FLAG_V: u8 = 0x40;
/// Decimal mode flag (latched, arithmetic stays binary)
pub const FLAG_D: u8 = 0x08;
/// Interrupt disable flag
pub const FLAG_I: u8 = 0x04;
/// Zero flag
pub const FLAG_Z: u8 = 0x02;
/// Carry flag
pub const FLAG_C: u8 = 0x01;

/// Addressing modes of the 6502
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No operand
    Imp,
    /// Immediate operand byte
    Imm,
    /// Absolute 16-bit address
    Abs,
    /// Absolute indexed by X
    AbsX,
    /// Absolute indexed by Y
    AbsY,
    /// Zero page
    Zp,
    /// Zero page indexed by X
    ZpX,
    /// Zero page indexed by Y
    ZpY,
    /// Indirect (JMP only)
    Ind,
    /// Indexed indirect: (zp,X)
    IndX,
    /// Indirect indexed: (zp),Y
    IndY,
    /// Accumulator
    Acc,
    /// Relative branch offset
    Rel,
}

/// Operations of the 6502 instruction set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    /// Undefined opcode, executed as a no-op
    Xxx,
}

use Mode::*;
use Op::*;

/// Opcode dispatch table: opcode byte -> (operation, addressing mode).
/// Undefined opcodes carry `(Xxx, Imp)` and consume only the opcode byte.
#[rustfmt::skip]
pub const DISPATCH: [(Op, Mode); 256] = [
    // 0x00
    (Brk,Imp),(Ora,IndX),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Ora,Zp),(Asl,Zp),(Xxx,Imp),
    (Php,Imp),(Ora,Imm),(Asl,Acc),(Xxx,Imp),(Xxx,Imp),(Ora,Abs),(Asl,Abs),(Xxx,Imp),
    // 0x10
    (Bpl,Rel),(Ora,IndY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Ora,ZpX),(Asl,ZpX),(Xxx,Imp),
    (Clc,Imp),(Ora,AbsY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Ora,AbsX),(Asl,AbsX),(Xxx,Imp),
    // 0x20
    (Jsr,Abs),(And,IndX),(Xxx,Imp),(Xxx,Imp),(Bit,Zp),(And,Zp),(Rol,Zp),(Xxx,Imp),
    (Plp,Imp),(And,Imm),(Rol,Acc),(Xxx,Imp),(Bit,Abs),(And,Abs),(Rol,Abs),(Xxx,Imp),
    // 0x30
    (Bmi,Rel),(And,IndY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(And,ZpX),(Rol,ZpX),(Xxx,Imp),
    (Sec,Imp),(And,AbsY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(And,AbsX),(Rol,AbsX),(Xxx,Imp),
    // 0x40
    (Rti,Imp),(Eor,IndX),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Eor,Zp),(Lsr,Zp),(Xxx,Imp),
    (Pha,Imp),(Eor,Imm),(Lsr,Acc),(Xxx,Imp),(Jmp,Abs),(Eor,Abs),(Lsr,Abs),(Xxx,Imp),
    // 0x50
    (Bvc,Rel),(Eor,IndY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Eor,ZpX),(Lsr,ZpX),(Xxx,Imp),
    (Cli,Imp),(Eor,AbsY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Eor,AbsX),(Lsr,AbsX),(Xxx,Imp),
    // 0x60
    (Rts,Imp),(Adc,IndX),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Adc,Zp),(Ror,Zp),(Xxx,Imp),
    (Pla,Imp),(Adc,Imm),(Ror,Acc),(Xxx,Imp),(Jmp,Ind),(Adc,Abs),(Ror,Abs),(Xxx,Imp),
    // 0x70
    (Bvs,Rel),(Adc,IndY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Adc,ZpX),(Ror,ZpX),(Xxx,Imp),
    (Sei,Imp),(Adc,AbsY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Adc,AbsX),(Ror,AbsX),(Xxx,Imp),
    // 0x80
    (Xxx,Imp),(Sta,IndX),(Xxx,Imp),(Xxx,Imp),(Sty,Zp),(Sta,Zp),(Stx,Zp),(Xxx,Imp),
    (Dey,Imp),(Xxx,Imp),(Txa,Imp),(Xxx,Imp),(Sty,Abs),(Sta,Abs),(Stx,Abs),(Xxx,Imp),
    // 0x90
    (Bcc,Rel),(Sta,IndY),(Xxx,Imp),(Xxx,Imp),(Sty,ZpX),(Sta,ZpX),(Stx,ZpY),(Xxx,Imp),
    (Tya,Imp),(Sta,AbsY),(Txs,Imp),(Xxx,Imp),(Xxx,Imp),(Sta,AbsX),(Xxx,Imp),(Xxx,Imp),
    // 0xA0
    (Ldy,Imm),(Lda,IndX),(Ldx,Imm),(Xxx,Imp),(Ldy,Zp),(Lda,Zp),(Ldx,Zp),(Xxx,Imp),
    (Tay,Imp),(Lda,Imm),(Tax,Imp),(Xxx,Imp),(Ldy,Abs),(Lda,Abs),(Ldx,Abs),(Xxx,Imp),
    // 0xB0
    (Bcs,Rel),(Lda,IndY),(Xxx,Imp),(Xxx,Imp),(Ldy,ZpX),(Lda,ZpX),(Ldx,ZpY),(Xxx,Imp),
    (Clv,Imp),(Lda,AbsY),(Tsx,Imp),(Xxx,Imp),(Ldy,AbsX),(Lda,AbsX),(Ldx,AbsY),(Xxx,Imp),
    // 0xC0
    (Cpy,Imm),(Cmp,IndX),(Xxx,Imp),(Xxx,Imp),(Cpy,Zp),(Cmp,Zp),(Dec,Zp),(Xxx,Imp),
    (Iny,Imp),(Cmp,Imm),(Dex,Imp),(Xxx,Imp),(Cpy,Abs),(Cmp,Abs),(Dec,Abs),(Xxx,Imp),
    // 0xD0
    (Bne,Rel),(Cmp,IndY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Cmp,ZpX),(Dec,ZpX),(Xxx,Imp),
    (Cld,Imp),(Cmp,AbsY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Cmp,AbsX),(Dec,AbsX),(Xxx,Imp),
    // 0xE0
    (Cpx,Imm),(Sbc,IndX),(Xxx,Imp),(Xxx,Imp),(Cpx,Zp),(Sbc,Zp),(Inc,Zp),(Xxx,Imp),
    (Inx,Imp),(Sbc,Imm),(Nop,Imp),(Xxx,Imp),(Cpx,Abs),(Sbc,Abs),(Inc,Abs),(Xxx,Imp),
    // 0xF0
    (Beq,Rel),(Sbc,IndY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Sbc,ZpX),(Inc,ZpX),(Xxx,Imp),
    (Sed,Imp),(Sbc,AbsY),(Xxx,Imp),(Xxx,Imp),(Xxx,Imp),(Sbc,AbsX),(Inc,AbsX),(Xxx,Imp),
];

/// 6502 processor state.
///
/// Ephemeral by design: every reset/init/play boundary rebuilds it from
/// scratch, so nothing here survives a failed call.
#[derive(Debug, Clone, Default)]
pub struct Cpu {
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer (page 1 offset)
    pub sp: u8,
    /// Status flags
    pub status: u8,
    /// Program counter
    pub pc: u16,
}

impl Cpu {
    /// Create a cleared CPU
    pub fn new() -> Self {
        Cpu::default()
    }

    /// Cold reset: clear registers and load the program counter from the
    /// little-endian reset vector at 0xFFFC. The only unguarded entry point.
    pub fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.status = 0;
        self.sp = 0xff;
        let lo = bus.read(0xfffc) as u16;
        let hi = bus.read(0xfffd) as u16;
        self.pc = lo | (hi << 8);
    }

    /// Guarded call: run the routine at `target` with `arg` in the
    /// accumulator until it returns through the synthetic zero frame or the
    /// watchdog trips.
    ///
    /// Returns the number of instructions executed, or
    /// [`SidError::WatchdogExceeded`] when the ceiling is hit. The CPU state
    /// is rebuilt on entry, so a tripped call leaves nothing to clean up.
    pub fn guarded_call<B: Bus>(
        &mut self,
        bus: &mut B,
        target: u16,
        arg: u8,
        phase: GuardedPhase,
    ) -> Result<u32> {
        self.a = arg;
        self.x = 0;
        self.y = 0;
        self.status = 0;
        self.sp = 0xff;
        self.pc = target;
        // Synthetic return frame: RTS pops 0x0000 and continues at 1,
        // which the loop below treats as "routine finished".
        self.push(bus, 0);
        self.push(bus, 0);

        let mut steps: u32 = 0;
        while self.pc > 1 {
            if steps >= WATCHDOG_STEP_LIMIT {
                log::warn!(
                    "watchdog tripped in {} call at pc={:#06x} after {} steps",
                    phase,
                    self.pc,
                    steps
                );
                return Err(SidError::WatchdogExceeded { phase, steps });
            }
            self.step(bus);
            steps += 1;
        }
        Ok(steps)
    }

    /// Execute one instruction
    pub fn step<B: Bus>(&mut self, bus: &mut B) {
        let opcode = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        let (op, mode) = DISPATCH[opcode as usize];
        self.execute(bus, op, mode);
    }

    fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let byte = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus) as u16;
        let hi = self.fetch(bus) as u16;
        lo | (hi << 8)
    }

    /// Read the operand for `mode`, advancing the program counter past the
    /// operand bytes
    fn operand<B: Bus>(&mut self, bus: &mut B, mode: Mode) -> u8 {
        match mode {
            Imp => 0,
            Imm | Rel => self.fetch(bus),
            Abs => {
                let ad = self.fetch_word(bus);
                bus.read(ad)
            }
            AbsX => {
                let ad = self.fetch_word(bus).wrapping_add(self.x as u16);
                bus.read(ad)
            }
            AbsY => {
                let ad = self.fetch_word(bus).wrapping_add(self.y as u16);
                bus.read(ad)
            }
            Zp => {
                let ad = self.fetch(bus) as u16;
                bus.read(ad)
            }
            ZpX => {
                let ad = self.fetch(bus).wrapping_add(self.x) as u16;
                bus.read(ad)
            }
            ZpY => {
                let ad = self.fetch(bus).wrapping_add(self.y) as u16;
                bus.read(ad)
            }
            IndX => {
                let zp = self.fetch(bus).wrapping_add(self.x);
                let lo = bus.read(zp as u16) as u16;
                let hi = bus.read(zp.wrapping_add(1) as u16) as u16;
                bus.read(lo | (hi << 8))
            }
            IndY => {
                let zp = self.fetch(bus);
                let lo = bus.read(zp as u16) as u16;
                let hi = bus.read(zp.wrapping_add(1) as u16) as u16;
                bus.read((lo | (hi << 8)).wrapping_add(self.y as u16))
            }
            Acc => self.a,
            // JMP decodes its own operand
            Ind => 0,
        }
    }

    /// Write a read-modify-write result back to the operand location.
    /// Re-derives the address from the already-consumed operand bytes.
    fn write_back<B: Bus>(&mut self, bus: &mut B, mode: Mode, value: u8) {
        match mode {
            Abs => {
                let lo = bus.read(self.pc.wrapping_sub(2)) as u16;
                let hi = bus.read(self.pc.wrapping_sub(1)) as u16;
                bus.write(lo | (hi << 8), value);
            }
            AbsX => {
                let lo = bus.read(self.pc.wrapping_sub(2)) as u16;
                let hi = bus.read(self.pc.wrapping_sub(1)) as u16;
                bus.write((lo | (hi << 8)).wrapping_add(self.x as u16), value);
            }
            Zp => {
                let ad = bus.read(self.pc.wrapping_sub(1)) as u16;
                bus.write(ad, value);
            }
            ZpX => {
                let ad = bus.read(self.pc.wrapping_sub(1)).wrapping_add(self.x) as u16;
                bus.write(ad, value);
            }
            Acc => self.a = value,
            _ => {}
        }
    }

    /// Resolve a store target for `mode` (advancing the program counter) and
    /// write `value` there
    fn store<B: Bus>(&mut self, bus: &mut B, mode: Mode, value: u8) {
        match mode {
            Abs => {
                let ad = self.fetch_word(bus);
                bus.write(ad, value);
            }
            AbsX => {
                let ad = self.fetch_word(bus).wrapping_add(self.x as u16);
                bus.write(ad, value);
            }
            AbsY => {
                let ad = self.fetch_word(bus).wrapping_add(self.y as u16);
                bus.write(ad, value);
            }
            Zp => {
                let ad = self.fetch(bus) as u16;
                bus.write(ad, value);
            }
            ZpX => {
                let ad = self.fetch(bus).wrapping_add(self.x) as u16;
                bus.write(ad, value);
            }
            ZpY => {
                let ad = self.fetch(bus).wrapping_add(self.y) as u16;
                bus.write(ad, value);
            }
            IndX => {
                let zp = self.fetch(bus).wrapping_add(self.x);
                let lo = bus.read(zp as u16) as u16;
                let hi = bus.read(zp.wrapping_add(1) as u16) as u16;
                bus.write(lo | (hi << 8), value);
            }
            IndY => {
                let zp = self.fetch(bus);
                let lo = bus.read(zp as u16) as u16;
                let hi = bus.read(zp.wrapping_add(1) as u16) as u16;
                bus.write((lo | (hi << 8)).wrapping_add(self.y as u16), value);
            }
            Acc => self.a = value,
            _ => {}
        }
    }

    #[inline]
    fn set_flag(&mut self, flag: u8, cond: bool) {
        if cond {
            self.status |= flag;
        } else {
            self.status &= !flag;
        }
    }

    #[inline]
    fn set_zn(&mut self, value: u8) {
        self.set_flag(FLAG_Z, value == 0);
        self.set_flag(FLAG_N, value & 0x80 != 0);
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        bus.write(0x100 + self.sp as u16, value);
        if self.sp > 0 {
            self.sp -= 1;
        }
    }

    fn pop<B: Bus>(&mut self, bus: &mut B) -> u8 {
        if self.sp < 0xff {
            self.sp += 1;
        }
        bus.read(0x100 + self.sp as u16)
    }

    fn branch<B: Bus>(&mut self, bus: &mut B, cond: bool) {
        let dist = self.fetch(bus) as i8;
        let dest = self.pc.wrapping_add(dist as u16);
        if cond {
            self.pc = dest;
        }
    }

    fn execute<B: Bus>(&mut self, bus: &mut B, op: Op, mode: Mode) {
        match op {
            Adc => {
                let carry = (self.status & FLAG_C != 0) as u16;
                let sum = self.a as u16 + self.operand(bus, mode) as u16 + carry;
                self.set_flag(FLAG_C, sum & 0x100 != 0);
                self.a = sum as u8;
                self.set_zn(self.a);
                // Engine quirk kept from the original: V derived from C and N
                let v = (self.status & FLAG_C != 0) ^ (self.status & FLAG_N != 0);
                self.set_flag(FLAG_V, v);
            }
            Sbc => {
                let carry = (self.status & FLAG_C != 0) as u16;
                let inverted = (self.operand(bus, mode) ^ 0xff) as u16;
                let sum = self.a as u16 + inverted + carry;
                self.set_flag(FLAG_C, sum & 0x100 != 0);
                self.a = sum as u8;
                self.set_zn(self.a);
                let v = (self.status & FLAG_C != 0) ^ (self.status & FLAG_N != 0);
                self.set_flag(FLAG_V, v);
            }
            And => {
                self.a &= self.operand(bus, mode);
                self.set_zn(self.a);
            }
            Ora => {
                self.a |= self.operand(bus, mode);
                self.set_zn(self.a);
            }
            Eor => {
                self.a ^= self.operand(bus, mode);
                self.set_zn(self.a);
            }
            Asl => {
                let wide = (self.operand(bus, mode) as u16) << 1;
                self.write_back(bus, mode, wide as u8);
                self.set_flag(FLAG_Z, wide & 0xff == 0);
                self.set_flag(FLAG_N, wide & 0x80 != 0);
                self.set_flag(FLAG_C, wide & 0x100 != 0);
            }
            Lsr => {
                let before = self.operand(bus, mode);
                let after = before >> 1;
                self.write_back(bus, mode, after);
                self.set_zn(after);
                self.set_flag(FLAG_C, before & 1 != 0);
            }
            Rol => {
                let before = self.operand(bus, mode);
                let carry_in = (self.status & FLAG_C != 0) as u8;
                self.set_flag(FLAG_C, before & 0x80 != 0);
                let after = (before << 1) | carry_in;
                self.write_back(bus, mode, after);
                self.set_zn(after);
            }
            Ror => {
                let before = self.operand(bus, mode);
                let carry_in = (self.status & FLAG_C != 0) as u8;
                self.set_flag(FLAG_C, before & 1 != 0);
                let after = (before >> 1) | (carry_in << 7);
                self.write_back(bus, mode, after);
                self.set_zn(after);
            }
            Bcc => self.branch(bus, self.status & FLAG_C == 0),
            Bcs => self.branch(bus, self.status & FLAG_C != 0),
            Bne => self.branch(bus, self.status & FLAG_Z == 0),
            Beq => self.branch(bus, self.status & FLAG_Z != 0),
            Bpl => self.branch(bus, self.status & FLAG_N == 0),
            Bmi => self.branch(bus, self.status & FLAG_N != 0),
            Bvc => self.branch(bus, self.status & FLAG_V == 0),
            Bvs => self.branch(bus, self.status & FLAG_V != 0),
            Bit => {
                let value = self.operand(bus, mode);
                self.set_flag(FLAG_Z, self.a & value == 0);
                self.set_flag(FLAG_N, value & 0x80 != 0);
                self.set_flag(FLAG_V, value & 0x40 != 0);
            }
            // Informal halt: the guarded-call loop exits on pc <= 1
            Brk => self.pc = 0,
            Clc => self.set_flag(FLAG_C, false),
            Cld => self.set_flag(FLAG_D, false),
            Cli => self.set_flag(FLAG_I, false),
            Clv => self.set_flag(FLAG_V, false),
            Sec => self.set_flag(FLAG_C, true),
            Sed => self.set_flag(FLAG_D, true),
            Sei => self.set_flag(FLAG_I, true),
            Cmp => {
                let value = self.operand(bus, mode);
                let diff = (self.a as u16).wrapping_sub(value as u16);
                self.set_flag(FLAG_Z, diff & 0xffff == 0);
                self.set_flag(FLAG_N, diff & 0x80 != 0);
                self.set_flag(FLAG_C, self.a >= value);
            }
            Cpx => {
                let value = self.operand(bus, mode);
                let diff = (self.x as u16).wrapping_sub(value as u16);
                self.set_flag(FLAG_Z, diff & 0xffff == 0);
                self.set_flag(FLAG_N, diff & 0x80 != 0);
                self.set_flag(FLAG_C, self.x >= value);
            }
            Cpy => {
                let value = self.operand(bus, mode);
                let diff = (self.y as u16).wrapping_sub(value as u16);
                self.set_flag(FLAG_Z, diff & 0xffff == 0);
                self.set_flag(FLAG_N, diff & 0x80 != 0);
                self.set_flag(FLAG_C, self.y >= value);
            }
            Dec => {
                let value = self.operand(bus, mode).wrapping_sub(1);
                self.write_back(bus, mode, value);
                self.set_zn(value);
            }
            Inc => {
                let value = self.operand(bus, mode).wrapping_add(1);
                self.write_back(bus, mode, value);
                self.set_zn(value);
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.set_zn(self.x);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.set_zn(self.y);
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.set_zn(self.x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.set_zn(self.y);
            }
            Jmp => {
                let target = self.fetch_word(bus);
                match mode {
                    Abs => self.pc = target,
                    Ind => {
                        let lo = bus.read(target) as u16;
                        let hi = bus.read(target.wrapping_add(1)) as u16;
                        self.pc = lo | (hi << 8);
                    }
                    _ => {}
                }
            }
            Jsr => {
                let ret = self.pc.wrapping_add(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                self.pc = self.fetch_word(bus);
            }
            Lda => {
                self.a = self.operand(bus, mode);
                self.set_zn(self.a);
            }
            Ldx => {
                self.x = self.operand(bus, mode);
                self.set_zn(self.x);
            }
            Ldy => {
                self.y = self.operand(bus, mode);
                self.set_zn(self.y);
            }
            Nop | Xxx => {}
            Pha => self.push(bus, self.a),
            Php => self.push(bus, self.status),
            Pla => {
                self.a = self.pop(bus);
                self.set_zn(self.a);
            }
            Plp => self.status = self.pop(bus),
            // RTI has no interrupt frame to unwind here; treat it as RTS
            Rti | Rts => {
                let lo = self.pop(bus) as u16;
                let hi = self.pop(bus) as u16;
                self.pc = (lo | (hi << 8)).wrapping_add(1);
            }
            Sta => self.store(bus, mode, self.a),
            Stx => self.store(bus, mode, self.x),
            Sty => self.store(bus, mode, self.y),
            Tax => {
                self.x = self.a;
                self.set_zn(self.x);
            }
            Tay => {
                self.y = self.a;
                self.set_zn(self.y);
            }
            Tsx => {
                self.x = self.sp;
                self.set_zn(self.x);
            }
            Txa => {
                self.a = self.x;
                self.set_zn(self.a);
            }
            Txs => self.sp = self.x,
            Tya => {
                self.a = self.y;
                self.set_zn(self.a);
            }
        }
    }
}
