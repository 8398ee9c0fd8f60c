mod opcodes;

use core::ops::Deref;

use crate::bus::Bus;
use opcodes::{Cond, Instruction, Mnemonic, Mode, OPCODES, Reg};

bitflags::bitflags! {
    /// F register. The low nibble always reads 0.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u8 {
        const Z = 1 << 7;
        const N = 1 << 6;
        const H = 1 << 5;
        const C = 1 << 4;
    }
}

fn half_carry_add(a: u8, b: u8) -> bool {
    (a & 0x0f) + (b & 0x0f) > 0x0f
}

fn half_carry_sub(a: u8, b: u8) -> bool {
    (a & 0x0f) < (b & 0x0f)
}

/// SM83 core. Every bus access costs one machine cycle; the execute stage
/// adds the documented internal-delay cycles on top, so instruction timing
/// falls out of the access pattern rather than a cycle table.
#[derive(Clone, Default)]
pub struct Cpu {
    pub a: u8,
    pub f: Flags,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
    halted: bool,
    exited_halt: bool,

    // execute-stage latches
    opcode: u8,
    fetched: u16,
    dst_is_mem: bool,
    mem_dest: u16,
}

impl Cpu {
    /// Runs one instruction (or one halted cycle), then services interrupts.
    pub fn step<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>) {
        if !self.halted {
            self.opcode = bus.cpu_read(self.pc);
            self.pc = self.pc.wrapping_add(1);
            self.execute(bus);
        } else {
            bus.internal_cycle();
            if bus.interrupts.pending() {
                self.halted = false;
                self.exited_halt = true;
            }
        }

        if bus.interrupts.ime {
            self.handle_interrupts(bus);
            bus.interrupts.scheduled_ime = false;
        }
        // EI takes effect after the instruction that follows it
        if bus.interrupts.scheduled_ime {
            bus.interrupts.ime = true;
            bus.interrupts.scheduled_ime = false;
        }
        self.exited_halt = false;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Post-boot register state, for hosts skipping the boot ROM.
    pub fn init(&mut self) {
        self.a = 0x01;
        self.f = Flags::from_bits_truncate(0xb0);
        self.b = 0x00;
        self.c = 0x13;
        self.d = 0x00;
        self.e = 0xd8;
        self.h = 0x01;
        self.l = 0x4d;
        self.pc = 0x0100;
        self.sp = 0xfffe;
    }

    fn execute<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>) {
        let instruction = &OPCODES[usize::from(self.opcode)];
        self.dst_is_mem = false;
        self.fetch_operand(bus, instruction);
        self.operate(bus, instruction);
    }

    /// Dispatch sequence: two wait cycles, push PC high, re-sample IE (the
    /// push may have rewritten it and cancelled the dispatch), push PC low,
    /// jump to the vector.
    fn handle_interrupts<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>) {
        if !bus.interrupts.pending() {
            return;
        }
        bus.internal_cycle();
        bus.internal_cycle();
        self.sp = self.sp.wrapping_sub(1);
        bus.cpu_write(self.sp, (self.pc >> 8) as u8);
        let vector = bus.interrupts.service();
        self.sp = self.sp.wrapping_sub(1);
        bus.cpu_write(self.sp, self.pc as u8);
        bus.interrupts.ime = false;
        self.pc = vector;
        bus.internal_cycle();
        if self.exited_halt {
            bus.internal_cycle();
        }
    }

    // Registers ------------------------------------------------------------

    fn read_reg(&self, reg: Reg) -> u16 {
        match reg {
            Reg::A => self.a.into(),
            Reg::B => self.b.into(),
            Reg::C => self.c.into(),
            Reg::D => self.d.into(),
            Reg::E => self.e.into(),
            Reg::H => self.h.into(),
            Reg::L => self.l.into(),
            Reg::Af => u16::from_be_bytes([self.a, self.f.bits()]),
            Reg::Bc => u16::from_be_bytes([self.b, self.c]),
            Reg::De => u16::from_be_bytes([self.d, self.e]),
            Reg::Hl => u16::from_be_bytes([self.h, self.l]),
            Reg::Sp => self.sp,
            Reg::None => 0,
        }
    }

    fn write_reg(&mut self, reg: Reg, value: u16) {
        match reg {
            Reg::A => self.a = value as u8,
            Reg::B => self.b = value as u8,
            Reg::C => self.c = value as u8,
            Reg::D => self.d = value as u8,
            Reg::E => self.e = value as u8,
            Reg::H => self.h = value as u8,
            Reg::L => self.l = value as u8,
            Reg::Af => {
                self.a = (value >> 8) as u8;
                self.f = Flags::from_bits_truncate(value as u8);
            }
            Reg::Bc => [self.b, self.c] = value.to_be_bytes(),
            Reg::De => [self.d, self.e] = value.to_be_bytes(),
            Reg::Hl => [self.h, self.l] = value.to_be_bytes(),
            Reg::Sp => self.sp = value,
            Reg::None => {}
        }
    }

    fn test_cond(&self, cond: Cond) -> bool {
        match cond {
            Cond::Always => true,
            Cond::Nz => !self.f.contains(Flags::Z),
            Cond::Z => self.f.contains(Flags::Z),
            Cond::Nc => !self.f.contains(Flags::C),
            Cond::C => self.f.contains(Flags::C),
        }
    }

    // Addressing -----------------------------------------------------------

    fn imm8<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>) -> u8 {
        let value = bus.cpu_read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    fn imm16<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>) -> u16 {
        let low = self.imm8(bus);
        let high = self.imm8(bus);
        u16::from_be_bytes([high, low])
    }

    fn fetch_operand<R: Deref<Target = [u8]>>(
        &mut self,
        bus: &mut Bus<R>,
        instruction: &Instruction,
    ) {
        match instruction.mode {
            Mode::Imp => {}
            Mode::R => self.fetched = self.read_reg(instruction.dst),
            Mode::RR => self.fetched = self.read_reg(instruction.src),
            Mode::D8 | Mode::RD8 | Mode::HlSpE => self.fetched = self.imm8(bus).into(),
            Mode::MrD8 => {
                self.mem_dest = self.read_reg(instruction.dst);
                self.dst_is_mem = true;
                self.fetched = self.imm8(bus).into();
            }
            Mode::D16 | Mode::RD16 => self.fetched = self.imm16(bus),
            Mode::Mr => {
                self.mem_dest = self.read_reg(instruction.dst);
                self.dst_is_mem = true;
                self.fetched = bus.cpu_read(self.mem_dest).into();
            }
            Mode::MrR => {
                self.fetched = self.read_reg(instruction.src);
                self.mem_dest = self.read_reg(instruction.dst);
                if instruction.dst == Reg::C {
                    // LD (C),A lives in the 0xff00 page
                    self.mem_dest |= 0xff00;
                }
                self.dst_is_mem = true;
            }
            Mode::RMr => {
                let mut address = self.read_reg(instruction.src);
                if instruction.src == Reg::C {
                    address |= 0xff00;
                }
                self.fetched = bus.cpu_read(address).into();
            }
            Mode::RHlInc => {
                let hl = self.read_reg(Reg::Hl);
                self.fetched = bus.cpu_read(hl).into();
                self.write_reg(Reg::Hl, hl.wrapping_add(1));
            }
            Mode::HlIncR => {
                self.fetched = self.read_reg(instruction.src);
                self.mem_dest = self.read_reg(Reg::Hl);
                self.dst_is_mem = true;
                self.write_reg(Reg::Hl, self.mem_dest.wrapping_add(1));
            }
            Mode::RHlDec => {
                let hl = self.read_reg(Reg::Hl);
                self.fetched = bus.cpu_read(hl).into();
                self.write_reg(Reg::Hl, hl.wrapping_sub(1));
            }
            Mode::HlDecR => {
                self.fetched = self.read_reg(instruction.src);
                self.mem_dest = self.read_reg(Reg::Hl);
                self.dst_is_mem = true;
                self.write_reg(Reg::Hl, self.mem_dest.wrapping_sub(1));
            }
            Mode::RA8 => {
                let address = 0xff00 | u16::from(self.imm8(bus));
                self.fetched = bus.cpu_read(address).into();
            }
            Mode::A8R => {
                self.mem_dest = 0xff00 | u16::from(self.imm8(bus));
                self.dst_is_mem = true;
                self.fetched = self.read_reg(instruction.src);
            }
            Mode::RA16 => {
                let address = self.imm16(bus);
                self.fetched = bus.cpu_read(address).into();
            }
            Mode::A16R => {
                self.mem_dest = self.imm16(bus);
                self.dst_is_mem = true;
                self.fetched = self.read_reg(instruction.src);
            }
        }
    }

    // Execute --------------------------------------------------------------

    fn operate<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>, instruction: &Instruction) {
        match instruction.mnemonic {
            Mnemonic::Nop => {}
            Mnemonic::Invalid => {
                log::debug!(
                    "undefined opcode 0x{:02x} at 0x{:04x}",
                    self.opcode,
                    self.pc.wrapping_sub(1)
                );
            }
            Mnemonic::Ld => self.op_ld(bus, instruction),
            Mnemonic::Ldh => {
                if self.dst_is_mem {
                    bus.cpu_write(self.mem_dest, self.fetched as u8);
                } else {
                    self.a = self.fetched as u8;
                }
            }
            Mnemonic::Inc => self.op_inc(bus, instruction),
            Mnemonic::Dec => self.op_dec(bus, instruction),
            Mnemonic::Add => self.op_add(bus, instruction),
            Mnemonic::Adc => self.op_adc(),
            Mnemonic::Sub => self.op_sub(),
            Mnemonic::Sbc => self.op_sbc(),
            Mnemonic::And => {
                self.a &= self.fetched as u8;
                self.f = Flags::H;
                self.f.set(Flags::Z, self.a == 0);
            }
            Mnemonic::Xor => {
                self.a ^= self.fetched as u8;
                self.f = Flags::empty();
                self.f.set(Flags::Z, self.a == 0);
            }
            Mnemonic::Or => {
                self.a |= self.fetched as u8;
                self.f = Flags::empty();
                self.f.set(Flags::Z, self.a == 0);
            }
            Mnemonic::Cp => {
                let value = self.fetched as u8;
                let (result, carry) = self.a.overflowing_sub(value);
                self.f = Flags::N;
                self.f.set(Flags::Z, result == 0);
                self.f.set(Flags::H, half_carry_sub(self.a, value));
                self.f.set(Flags::C, carry);
            }
            Mnemonic::Jp => {
                if instruction.mode == Mode::R {
                    // JP HL jumps without a delay cycle
                    self.pc = self.fetched;
                } else if self.test_cond(instruction.cond) {
                    bus.internal_cycle();
                    self.pc = self.fetched;
                }
            }
            Mnemonic::Jr => {
                if self.test_cond(instruction.cond) {
                    bus.internal_cycle();
                    self.pc = self.pc.wrapping_add_signed((self.fetched as u8).cast_signed().into());
                }
            }
            Mnemonic::Call => {
                if self.test_cond(instruction.cond) {
                    bus.internal_cycle();
                    self.push_word(bus, self.pc);
                    self.pc = self.fetched;
                }
            }
            Mnemonic::Ret => {
                if instruction.cond != Cond::Always {
                    bus.internal_cycle();
                }
                if self.test_cond(instruction.cond) {
                    let pc = self.pop_word(bus);
                    bus.internal_cycle();
                    self.pc = pc;
                }
            }
            Mnemonic::Reti => {
                let pc = self.pop_word(bus);
                bus.internal_cycle();
                self.pc = pc;
                bus.interrupts.ime = true;
            }
            Mnemonic::Rst => {
                bus.internal_cycle();
                self.push_word(bus, self.pc);
                self.pc = instruction.param.into();
            }
            Mnemonic::Push => {
                bus.internal_cycle();
                self.push_word(bus, self.fetched);
            }
            Mnemonic::Pop => {
                let value = self.pop_word(bus);
                self.write_reg(instruction.dst, value);
            }
            Mnemonic::Halt => {
                // no halt with a pending (even masked) interrupt
                self.halted = !bus.interrupts.pending();
            }
            Mnemonic::Stop => {
                // minimal fidelity: reset the DIV counter and wait like HALT
                bus.timer.set_system_counter(0);
                self.halted = !bus.interrupts.pending();
            }
            Mnemonic::Di => {
                bus.interrupts.ime = false;
                bus.interrupts.scheduled_ime = false;
            }
            Mnemonic::Ei => bus.interrupts.scheduled_ime = true,
            Mnemonic::Daa => self.op_daa(),
            Mnemonic::Cpl => {
                self.a = !self.a;
                self.f.insert(Flags::N | Flags::H);
            }
            Mnemonic::Scf => {
                self.f.remove(Flags::N | Flags::H);
                self.f.insert(Flags::C);
            }
            Mnemonic::Ccf => {
                self.f.remove(Flags::N | Flags::H);
                self.f.toggle(Flags::C);
            }
            Mnemonic::Rlca => {
                let carry = self.a >> 7;
                self.a = self.a.rotate_left(1);
                self.f = Flags::empty();
                self.f.set(Flags::C, carry == 1);
            }
            Mnemonic::Rla => {
                let carry = self.a & 0x80 != 0;
                self.a = (self.a << 1) | u8::from(self.f.contains(Flags::C));
                self.f = Flags::empty();
                self.f.set(Flags::C, carry);
            }
            Mnemonic::Rrca => {
                let carry = self.a & 1;
                self.a = self.a.rotate_right(1);
                self.f = Flags::empty();
                self.f.set(Flags::C, carry == 1);
            }
            Mnemonic::Rra => {
                let carry = self.a & 1 != 0;
                self.a = (self.a >> 1) | (u8::from(self.f.contains(Flags::C)) << 7);
                self.f = Flags::empty();
                self.f.set(Flags::C, carry);
            }
            Mnemonic::CbPrefix => self.execute_cb(bus),
        }
    }

    fn op_ld<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>, instruction: &Instruction) {
        if self.dst_is_mem {
            if instruction.src == Reg::Sp {
                // LD (u16),SP stores both bytes
                bus.cpu_write(self.mem_dest, self.sp as u8);
                bus.cpu_write(self.mem_dest.wrapping_add(1), (self.sp >> 8) as u8);
            } else {
                bus.cpu_write(self.mem_dest, self.fetched as u8);
            }
            return;
        }
        if instruction.mode == Mode::HlSpE {
            // LD HL,SP+s8: flags come from the low-byte addition
            bus.internal_cycle();
            let offset = self.fetched as u8;
            self.f = Flags::empty();
            self.f.set(Flags::H, half_carry_add(self.sp as u8, offset));
            self.f
                .set(Flags::C, (self.sp as u8).checked_add(offset).is_none());
            self.write_reg(
                Reg::Hl,
                self.sp.wrapping_add_signed(offset.cast_signed().into()),
            );
            return;
        }
        if instruction.dst == Reg::Sp && instruction.src == Reg::Hl {
            bus.internal_cycle();
        }
        self.write_reg(instruction.dst, self.fetched);
    }

    fn op_inc<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>, instruction: &Instruction) {
        if self.dst_is_mem {
            let value = self.fetched as u8;
            let result = value.wrapping_add(1);
            bus.cpu_write(self.mem_dest, result);
            self.f.remove(Flags::N);
            self.f.set(Flags::Z, result == 0);
            self.f.set(Flags::H, half_carry_add(value, 1));
        } else if instruction.dst.is_16bit() {
            bus.internal_cycle();
            self.write_reg(instruction.dst, self.fetched.wrapping_add(1));
        } else {
            let value = self.fetched as u8;
            let result = value.wrapping_add(1);
            self.write_reg(instruction.dst, result.into());
            self.f.remove(Flags::N);
            self.f.set(Flags::Z, result == 0);
            self.f.set(Flags::H, half_carry_add(value, 1));
        }
    }

    fn op_dec<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>, instruction: &Instruction) {
        if self.dst_is_mem {
            let value = self.fetched as u8;
            let result = value.wrapping_sub(1);
            bus.cpu_write(self.mem_dest, result);
            self.f.insert(Flags::N);
            self.f.set(Flags::Z, result == 0);
            self.f.set(Flags::H, half_carry_sub(value, 1));
        } else if instruction.dst.is_16bit() {
            bus.internal_cycle();
            self.write_reg(instruction.dst, self.fetched.wrapping_sub(1));
        } else {
            let value = self.fetched as u8;
            let result = value.wrapping_sub(1);
            self.write_reg(instruction.dst, result.into());
            self.f.insert(Flags::N);
            self.f.set(Flags::Z, result == 0);
            self.f.set(Flags::H, half_carry_sub(value, 1));
        }
    }

    fn op_add<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>, instruction: &Instruction) {
        if instruction.dst == Reg::Hl && instruction.mode == Mode::RR {
            // ADD HL,rr: Z untouched, carries from bits 11 and 15
            bus.internal_cycle();
            let hl = self.read_reg(Reg::Hl);
            let (result, carry) = hl.overflowing_add(self.fetched);
            self.f.remove(Flags::N);
            self.f
                .set(Flags::H, (hl & 0x0fff) + (self.fetched & 0x0fff) > 0x0fff);
            self.f.set(Flags::C, carry);
            self.write_reg(Reg::Hl, result);
            return;
        }
        if instruction.dst == Reg::Sp {
            // ADD SP,s8: flags from the low byte, two delay cycles
            bus.internal_cycle();
            bus.internal_cycle();
            let offset = self.fetched as u8;
            self.f = Flags::empty();
            self.f.set(Flags::H, half_carry_add(self.sp as u8, offset));
            self.f
                .set(Flags::C, (self.sp as u8).checked_add(offset).is_none());
            self.sp = self.sp.wrapping_add_signed(offset.cast_signed().into());
            return;
        }
        let value = self.fetched as u8;
        let (result, carry) = self.a.overflowing_add(value);
        self.f = Flags::empty();
        self.f.set(Flags::Z, result == 0);
        self.f.set(Flags::H, half_carry_add(self.a, value));
        self.f.set(Flags::C, carry);
        self.a = result;
    }

    fn op_adc(&mut self) {
        let a = u32::from(self.a);
        let value = u32::from(self.fetched as u8);
        let carry = u32::from(self.f.contains(Flags::C));
        let result = a + value + carry;
        self.f = Flags::empty();
        self.f.set(Flags::Z, result as u8 == 0);
        self.f.set(Flags::H, (a ^ value ^ result) & 0x10 != 0);
        self.f.set(Flags::C, result & 0x100 != 0);
        self.a = result as u8;
    }

    fn op_sub(&mut self) {
        let value = self.fetched as u8;
        let (result, carry) = self.a.overflowing_sub(value);
        self.f = Flags::N;
        self.f.set(Flags::Z, result == 0);
        self.f.set(Flags::H, half_carry_sub(self.a, value));
        self.f.set(Flags::C, carry);
        self.a = result;
    }

    fn op_sbc(&mut self) {
        let a = u32::from(self.a);
        let value = u32::from(self.fetched as u8);
        let carry = u32::from(self.f.contains(Flags::C));
        let result = a.wrapping_sub(value).wrapping_sub(carry);
        self.f = Flags::N;
        self.f.set(Flags::Z, result as u8 == 0);
        self.f.set(Flags::H, (a ^ value ^ result) & 0x10 != 0);
        self.f.set(Flags::C, result & 0x100 != 0);
        self.a = result as u8;
    }

    // https://rgbds.gbdev.io/docs/gbz80.7#DAA
    fn op_daa(&mut self) {
        let mut adjust = 0u8;
        let result = if self.f.contains(Flags::N) {
            if self.f.contains(Flags::H) {
                adjust += 0x06;
            }
            if self.f.contains(Flags::C) {
                adjust += 0x60;
            }
            self.a.wrapping_sub(adjust)
        } else {
            if self.f.contains(Flags::H) || self.a & 0x0f > 0x09 {
                adjust += 0x06;
            }
            if self.f.contains(Flags::C) || self.a > 0x99 {
                adjust += 0x60;
                self.f.insert(Flags::C);
            }
            self.a.wrapping_add(adjust)
        };
        self.a = result;
        self.f.set(Flags::Z, result == 0);
        self.f.remove(Flags::H);
    }

    fn push_word<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>, value: u16) {
        self.sp = self.sp.wrapping_sub(1);
        bus.cpu_write(self.sp, (value >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        bus.cpu_write(self.sp, value as u8);
    }

    fn pop_word<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>) -> u16 {
        let low = bus.cpu_read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        let high = bus.cpu_read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        u16::from_be_bytes([high, low])
    }

    // CB prefix ------------------------------------------------------------

    /// The fetched byte decomposes into xx (operation class), yyy
    /// (rotate/shift selector or bit number) and zzz (operand register,
    /// with 6 meaning (HL)).
    fn execute_cb<R: Deref<Target = [u8]>>(&mut self, bus: &mut Bus<R>) {
        let opcode = self.fetched as u8;
        let xx = opcode >> 6;
        let yyy = (opcode >> 3) & 0x07;
        let zzz = opcode & 0x07;

        let value = if zzz == 6 {
            bus.cpu_read(self.read_reg(Reg::Hl))
        } else {
            self.read_cb_reg(zzz)
        };

        let result = match xx {
            0b00 => Some(match yyy {
                0 => self.rlc(value),
                1 => self.rrc(value),
                2 => self.rl(value),
                3 => self.rr(value),
                4 => self.sla(value),
                5 => self.sra(value),
                6 => self.swap(value),
                _ => self.srl(value),
            }),
            0b01 => {
                // BIT
                self.f.set(Flags::Z, value & (1 << yyy) == 0);
                self.f.remove(Flags::N);
                self.f.insert(Flags::H);
                None
            }
            0b10 => Some(value & !(1 << yyy)), // RES
            _ => Some(value | (1 << yyy)),     // SET
        };

        if let Some(result) = result {
            if zzz == 6 {
                bus.cpu_write(self.read_reg(Reg::Hl), result);
            } else {
                self.write_cb_reg(zzz, result);
            }
        }
    }

    fn read_cb_reg(&self, zzz: u8) -> u8 {
        match zzz {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            _ => self.a,
        }
    }

    fn write_cb_reg(&mut self, zzz: u8, value: u8) {
        match zzz {
            0 => self.b = value,
            1 => self.c = value,
            2 => self.d = value,
            3 => self.e = value,
            4 => self.h = value,
            5 => self.l = value,
            _ => self.a = value,
        }
    }

    fn rlc(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(1);
        self.f = Flags::empty();
        self.f.set(Flags::Z, result == 0);
        self.f.set(Flags::C, value & 0x80 != 0);
        result
    }

    fn rrc(&mut self, value: u8) -> u8 {
        let result = value.rotate_right(1);
        self.f = Flags::empty();
        self.f.set(Flags::Z, result == 0);
        self.f.set(Flags::C, value & 1 != 0);
        result
    }

    fn rl(&mut self, value: u8) -> u8 {
        let result = (value << 1) | u8::from(self.f.contains(Flags::C));
        self.f = Flags::empty();
        self.f.set(Flags::Z, result == 0);
        self.f.set(Flags::C, value & 0x80 != 0);
        result
    }

    fn rr(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | (u8::from(self.f.contains(Flags::C)) << 7);
        self.f = Flags::empty();
        self.f.set(Flags::Z, result == 0);
        self.f.set(Flags::C, value & 1 != 0);
        result
    }

    fn sla(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.f = Flags::empty();
        self.f.set(Flags::Z, result == 0);
        self.f.set(Flags::C, value & 0x80 != 0);
        result
    }

    fn sra(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | (value & 0x80);
        self.f = Flags::empty();
        self.f.set(Flags::Z, result == 0);
        self.f.set(Flags::C, value & 1 != 0);
        result
    }

    fn swap(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(4);
        self.f = Flags::empty();
        self.f.set(Flags::Z, result == 0);
        result
    }

    fn srl(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.f = Flags::empty();
        self.f.set(Flags::Z, result == 0);
        self.f.set(Flags::C, value & 1 != 0);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cartridge::Cartridge, interrupts::Interrupt, testutil::rom_with_code};
    use std::vec::Vec;

    fn machine(code: &[u8]) -> (Cpu, Bus<Vec<u8>>) {
        let mut bus = Bus::new(Cartridge::new(rom_with_code(code)).unwrap());
        bus.cartridge.disable_boot_rom();
        let mut cpu = Cpu::default();
        cpu.pc = 0x150;
        cpu.sp = 0xfffe;
        (cpu, bus)
    }

    fn mcycles(bus: &Bus<Vec<u8>>) -> u16 {
        bus.timer.system_counter() / 4
    }

    #[test]
    fn nop_takes_one_machine_cycle() {
        let (mut cpu, mut bus) = machine(&[0x00]);
        cpu.step(&mut bus);
        assert_eq!(1, mcycles(&bus));
        assert_eq!(0x151, cpu.pc);
    }

    #[test]
    fn add_sets_zero_half_and_carry() {
        let (mut cpu, mut bus) = machine(&[0x80]); // ADD A,B
        cpu.a = 0x3a;
        cpu.b = 0xc6;
        cpu.step(&mut bus);
        assert_eq!(0x00, cpu.a);
        assert_eq!(Flags::Z | Flags::H | Flags::C, cpu.f);
        assert_eq!(1, mcycles(&bus));
    }

    #[test]
    fn adc_includes_the_carry() {
        let (mut cpu, mut bus) = machine(&[0xce, 0x00]); // ADC A,0x00
        cpu.a = 0xff;
        cpu.f = Flags::C;
        cpu.step(&mut bus);
        assert_eq!(0x00, cpu.a);
        assert_eq!(Flags::Z | Flags::H | Flags::C, cpu.f);
        assert_eq!(2, mcycles(&bus));
    }

    #[test]
    fn sbc_borrows_through_the_carry() {
        let (mut cpu, mut bus) = machine(&[0xde, 0x01]); // SBC A,0x01
        cpu.a = 0x00;
        cpu.f = Flags::C;
        cpu.step(&mut bus);
        assert_eq!(0xfe, cpu.a);
        assert!(cpu.f.contains(Flags::N | Flags::H | Flags::C));
    }

    #[test]
    fn cp_leaves_a_untouched() {
        let (mut cpu, mut bus) = machine(&[0xfe, 0x90]); // CP 0x90
        cpu.a = 0x90;
        cpu.step(&mut bus);
        assert_eq!(0x90, cpu.a);
        assert!(cpu.f.contains(Flags::Z | Flags::N));
    }

    #[test]
    fn daa_adjusts_bcd_addition() {
        let (mut cpu, mut bus) = machine(&[0x80, 0x27]); // ADD A,B; DAA
        cpu.a = 0x45;
        cpu.b = 0x38;
        cpu.step(&mut bus);
        assert_eq!(0x7d, cpu.a);
        cpu.step(&mut bus);
        assert_eq!(0x83, cpu.a);
        assert!(!cpu.f.contains(Flags::C));
    }

    #[test]
    fn inc_hl_memory_takes_three_cycles() {
        let (mut cpu, mut bus) = machine(&[0x34]); // INC (HL)
        cpu.write_reg(Reg::Hl, 0xc000);
        bus.write(0xc000, 0xff);
        cpu.step(&mut bus);
        assert_eq!(0x00, bus.read(0xc000));
        assert!(cpu.f.contains(Flags::Z | Flags::H));
        assert!(!cpu.f.contains(Flags::N));
        assert_eq!(3, mcycles(&bus));
    }

    #[test]
    fn sixteen_bit_inc_has_an_internal_delay() {
        let (mut cpu, mut bus) = machine(&[0x03]); // INC BC
        cpu.write_reg(Reg::Bc, 0x12ff);
        cpu.step(&mut bus);
        assert_eq!(0x1300, cpu.read_reg(Reg::Bc));
        assert_eq!(2, mcycles(&bus));
    }

    #[test]
    fn add_hl_rr_keeps_zero_flag() {
        let (mut cpu, mut bus) = machine(&[0x09]); // ADD HL,BC
        cpu.write_reg(Reg::Hl, 0x8a23);
        cpu.write_reg(Reg::Bc, 0x0605);
        cpu.f = Flags::Z;
        cpu.step(&mut bus);
        assert_eq!(0x9028, cpu.read_reg(Reg::Hl));
        assert_eq!(Flags::Z | Flags::H, cpu.f);
        assert_eq!(2, mcycles(&bus));
    }

    #[test]
    fn jr_timing_depends_on_the_branch() {
        let (mut cpu, mut bus) = machine(&[0x18, 0x05]); // JR +5
        cpu.step(&mut bus);
        assert_eq!(0x157, cpu.pc);
        assert_eq!(3, mcycles(&bus));

        let (mut cpu, mut bus) = machine(&[0x20, 0x05]); // JR NZ,+5
        cpu.f = Flags::Z;
        cpu.step(&mut bus);
        assert_eq!(0x152, cpu.pc);
        assert_eq!(2, mcycles(&bus));
    }

    #[test]
    fn call_and_ret_round_trip() {
        let mut code = [0u8; 0x20];
        code[0] = 0xcd; // CALL 0x0160
        code[1] = 0x60;
        code[2] = 0x01;
        code[0x10] = 0xc9; // 0x160: RET
        let (mut cpu, mut bus) = machine(&code);

        cpu.step(&mut bus);
        assert_eq!(0x160, cpu.pc);
        assert_eq!(0xfffc, cpu.sp);
        assert_eq!(6, mcycles(&bus));
        // return address on the stack, high byte first
        assert_eq!(0x01, bus.read(0xfffd));
        assert_eq!(0x53, bus.read(0xfffc));

        cpu.step(&mut bus);
        assert_eq!(0x153, cpu.pc);
        assert_eq!(0xfffe, cpu.sp);
        assert_eq!(6 + 4, mcycles(&bus));
    }

    #[test]
    fn conditional_ret_taken_is_five_cycles() {
        let (mut cpu, mut bus) = machine(&[0xc0]); // RET NZ
        cpu.sp = 0xfffc;
        bus.write(0xfffc, 0x00);
        bus.write(0xfffd, 0x02);
        cpu.step(&mut bus);
        assert_eq!(0x0200, cpu.pc);
        assert_eq!(5, mcycles(&bus));

        let (mut cpu, mut bus) = machine(&[0xc0]);
        cpu.f = Flags::Z;
        cpu.step(&mut bus);
        assert_eq!(0x151, cpu.pc);
        assert_eq!(2, mcycles(&bus));
    }

    #[test]
    fn rst_pushes_and_jumps_to_the_vector() {
        let (mut cpu, mut bus) = machine(&[0xef]); // RST 0x28
        cpu.step(&mut bus);
        assert_eq!(0x28, cpu.pc);
        assert_eq!(4, mcycles(&bus));
        assert_eq!(0x51, bus.read(0xfffc));
    }

    #[test]
    fn pop_af_masks_the_low_flag_nibble() {
        let (mut cpu, mut bus) = machine(&[0xf1]); // POP AF
        cpu.sp = 0xfffc;
        bus.write(0xfffc, 0xff);
        bus.write(0xfffd, 0x12);
        cpu.step(&mut bus);
        assert_eq!(0x12, cpu.a);
        assert_eq!(0xf0, cpu.f.bits());
        assert_eq!(3, mcycles(&bus));
    }

    #[test]
    fn push_takes_four_cycles() {
        let (mut cpu, mut bus) = machine(&[0xc5]); // PUSH BC
        cpu.write_reg(Reg::Bc, 0xbeef);
        cpu.step(&mut bus);
        assert_eq!(4, mcycles(&bus));
        assert_eq!(0xbe, bus.read(0xfffd));
        assert_eq!(0xef, bus.read(0xfffc));
    }

    #[test]
    fn ld_hl_sp_e_computes_flags_from_the_low_byte() {
        let (mut cpu, mut bus) = machine(&[0xf8, 0x01]); // LD HL,SP+1
        cpu.sp = 0x00ff;
        cpu.step(&mut bus);
        assert_eq!(0x0100, cpu.read_reg(Reg::Hl));
        assert_eq!(Flags::H | Flags::C, cpu.f);
        assert_eq!(3, mcycles(&bus));
    }

    #[test]
    fn add_sp_e_takes_four_cycles() {
        let (mut cpu, mut bus) = machine(&[0xe8, 0xfe]); // ADD SP,-2
        cpu.sp = 0xd000;
        cpu.step(&mut bus);
        assert_eq!(0xcffe, cpu.sp);
        assert_eq!(Flags::empty(), cpu.f);
        assert_eq!(4, mcycles(&bus));
    }

    #[test]
    fn ld_a16_sp_stores_both_bytes() {
        let (mut cpu, mut bus) = machine(&[0x08, 0x00, 0xc0]); // LD (0xc000),SP
        cpu.sp = 0xbeef;
        cpu.step(&mut bus);
        assert_eq!(0xef, bus.read(0xc000));
        assert_eq!(0xbe, bus.read(0xc001));
        assert_eq!(5, mcycles(&bus));
    }

    #[test]
    fn cb_rotates_and_bit_ops() {
        let (mut cpu, mut bus) = machine(&[0xcb, 0x11]); // RL C
        cpu.c = 0x80;
        cpu.step(&mut bus);
        assert_eq!(0x00, cpu.c);
        assert_eq!(Flags::Z | Flags::C, cpu.f);
        assert_eq!(2, mcycles(&bus));

        let (mut cpu, mut bus) = machine(&[0xcb, 0x7e]); // BIT 7,(HL)
        cpu.write_reg(Reg::Hl, 0xc000);
        bus.write(0xc000, 0x7f);
        cpu.step(&mut bus);
        assert!(cpu.f.contains(Flags::Z | Flags::H));
        assert_eq!(3, mcycles(&bus));

        let (mut cpu, mut bus) = machine(&[0xcb, 0xfe]); // SET 7,(HL)
        cpu.write_reg(Reg::Hl, 0xc000);
        bus.write(0xc000, 0x00);
        cpu.step(&mut bus);
        assert_eq!(0x80, bus.read(0xc000));
        assert_eq!(4, mcycles(&bus));
    }

    #[test]
    fn interrupt_dispatch_takes_five_cycles_and_clears_if() {
        let (mut cpu, mut bus) = machine(&[0x00]);
        bus.interrupts.enable = 0x04;
        bus.interrupts.flags = Interrupt::TIMER;
        bus.interrupts.ime = true;
        cpu.step(&mut bus);
        assert_eq!(0x0050, cpu.pc);
        assert_eq!(1 + 5, mcycles(&bus));
        assert!(!bus.interrupts.ime);
        assert!(!bus.interrupts.flags.contains(Interrupt::TIMER));
        assert_eq!(0x01, bus.read(0xfffd));
        assert_eq!(0x51, bus.read(0xfffc));
    }

    #[test]
    fn dispatch_cancelled_when_the_push_rewrites_ie() {
        let (mut cpu, mut bus) = machine(&[0x00]);
        cpu.sp = 0x0000; // PC-high push lands on IE
        bus.interrupts.enable = 0x04;
        bus.interrupts.flags = Interrupt::TIMER;
        bus.interrupts.ime = true;
        cpu.step(&mut bus);
        // pushed 0x01 disabled the timer interrupt: fall through to 0x0000
        assert_eq!(0x0000, cpu.pc);
        assert!(bus.interrupts.flags.contains(Interrupt::TIMER));
        assert!(!bus.interrupts.ime);
    }

    #[test]
    fn ei_enables_after_the_next_instruction() {
        let (mut cpu, mut bus) = machine(&[0xfb, 0x00]); // EI; NOP
        bus.interrupts.enable = 0x04;
        bus.interrupts.flags = Interrupt::TIMER;
        cpu.step(&mut bus);
        assert!(bus.interrupts.ime);
        assert_eq!(0x151, cpu.pc);
        cpu.step(&mut bus);
        assert_eq!(0x0050, cpu.pc);
    }

    #[test]
    fn di_cancels_a_scheduled_enable() {
        let (mut cpu, mut bus) = machine(&[0xfb, 0xf3, 0x00]); // EI; DI; NOP
        bus.interrupts.enable = 0x04;
        bus.interrupts.flags = Interrupt::TIMER;
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(0x153, cpu.pc);
        assert!(!bus.interrupts.ime);
    }

    #[test]
    fn halt_wakes_on_masked_interrupt_without_dispatch() {
        let (mut cpu, mut bus) = machine(&[0x76, 0x00]); // HALT; NOP
        bus.interrupts.enable = 0x04;
        cpu.step(&mut bus);
        assert!(cpu.is_halted());
        cpu.step(&mut bus);
        assert!(cpu.is_halted());

        bus.interrupts.flags = Interrupt::TIMER;
        cpu.step(&mut bus); // wakes, IME off: no dispatch
        assert!(!cpu.is_halted());
        cpu.step(&mut bus); // the NOP after HALT
        assert_eq!(0x152, cpu.pc);
        assert!(bus.interrupts.flags.contains(Interrupt::TIMER));
    }

    #[test]
    fn halt_with_pending_interrupt_does_not_halt() {
        let (mut cpu, mut bus) = machine(&[0x76, 0x00]);
        bus.interrupts.enable = 0x04;
        bus.interrupts.flags = Interrupt::TIMER;
        cpu.step(&mut bus);
        assert!(!cpu.is_halted());
    }

    #[test]
    fn stop_resets_the_system_counter() {
        let (mut cpu, mut bus) = machine(&[0x00, 0x10]);
        cpu.step(&mut bus);
        assert_ne!(0, bus.timer.system_counter());
        cpu.step(&mut bus);
        assert_eq!(0, bus.timer.system_counter());
        assert!(cpu.is_halted());
    }

    #[test]
    fn undefined_opcodes_are_no_ops() {
        let (mut cpu, mut bus) = machine(&[0xd3, 0x00]);
        cpu.step(&mut bus);
        assert_eq!(0x151, cpu.pc);
        assert_eq!(1, mcycles(&bus));
    }

    #[test]
    fn ldh_reads_and_writes_the_high_page() {
        let (mut cpu, mut bus) = machine(&[0xe0, 0x80, 0xf0, 0x80]); // LDH (0x80),A; LDH A,(0x80)
        cpu.a = 0x5a;
        cpu.step(&mut bus);
        assert_eq!(0x5a, bus.read(0xff80));
        assert_eq!(3, mcycles(&bus));
        cpu.a = 0x00;
        cpu.step(&mut bus);
        assert_eq!(0x5a, cpu.a);
        assert_eq!(6, mcycles(&bus));
    }

    #[test]
    fn hl_postincrement_loads() {
        let (mut cpu, mut bus) = machine(&[0x2a, 0x32]); // LD A,(HL+); LD (HL-),A
        bus.write(0xc000, 0x77);
        cpu.write_reg(Reg::Hl, 0xc000);
        cpu.step(&mut bus);
        assert_eq!(0x77, cpu.a);
        assert_eq!(0xc001, cpu.read_reg(Reg::Hl));
        cpu.step(&mut bus);
        assert_eq!(0x77, bus.read(0xc001));
        assert_eq!(0xc000, cpu.read_reg(Reg::Hl));
    }
}

