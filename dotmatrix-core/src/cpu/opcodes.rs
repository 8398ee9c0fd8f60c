//! The 256-entry primary opcode table. Decoding the SM83 opcode grid by
//! hand is painful, so every opcode carries its mnemonic, addressing mode,
//! operand registers, branch condition and (for RST) target vector, and the
//! execute stage dispatches on those. CB-prefixed opcodes are instead
//! decomposed into bit fields (see `Cpu::execute_cb`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mnemonic {
    Nop,
    Stop,
    Halt,
    Di,
    Ei,
    Ld,
    Ldh,
    Inc,
    Dec,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Jp,
    Jr,
    Call,
    Ret,
    Reti,
    Rst,
    Push,
    Pop,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Rlca,
    Rla,
    Rrca,
    Rra,
    CbPrefix,
    Invalid,
}

/// Addressing modes. `Mr` is "memory referenced by register", `A8`/`A16`
/// immediate addresses (the former offset into the 0xff00 page), `D8`/`D16`
/// immediate data, `HlSpE` the SP+s8 load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Imp,
    R,
    RR,
    D8,
    RD8,
    MrD8,
    D16,
    RD16,
    Mr,
    MrR,
    RMr,
    RHlInc,
    HlIncR,
    RHlDec,
    HlDecR,
    RA8,
    A8R,
    RA16,
    A16R,
    HlSpE,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reg {
    None,
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    Af,
    Bc,
    De,
    Hl,
    Sp,
}

impl Reg {
    pub(crate) fn is_16bit(self) -> bool {
        matches!(self, Reg::Af | Reg::Bc | Reg::De | Reg::Hl | Reg::Sp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cond {
    Always,
    Nz,
    Z,
    Nc,
    C,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: Mode,
    pub dst: Reg,
    pub src: Reg,
    pub cond: Cond,
    pub param: u8,
}

const fn op(mnemonic: Mnemonic) -> Instruction {
    Instruction {
        mnemonic,
        mode: Mode::Imp,
        dst: Reg::None,
        src: Reg::None,
        cond: Cond::Always,
        param: 0,
    }
}

const fn un(mnemonic: Mnemonic, mode: Mode, dst: Reg) -> Instruction {
    Instruction {
        mnemonic,
        mode,
        dst,
        src: Reg::None,
        cond: Cond::Always,
        param: 0,
    }
}

const fn bi(mnemonic: Mnemonic, mode: Mode, dst: Reg, src: Reg) -> Instruction {
    Instruction {
        mnemonic,
        mode,
        dst,
        src,
        cond: Cond::Always,
        param: 0,
    }
}

const fn br(mnemonic: Mnemonic, mode: Mode, cond: Cond) -> Instruction {
    Instruction {
        mnemonic,
        mode,
        dst: Reg::None,
        src: Reg::None,
        cond,
        param: 0,
    }
}

const fn rst(param: u8) -> Instruction {
    Instruction {
        mnemonic: Mnemonic::Rst,
        mode: Mode::Imp,
        dst: Reg::None,
        src: Reg::None,
        cond: Cond::Always,
        param,
    }
}

use {Mnemonic::*, Mode::*, Reg::*};

#[rustfmt::skip]
pub(crate) static OPCODES: [Instruction; 256] = [
    // 0x00
    op(Nop),
    un(Ld, RD16, Bc),
    bi(Ld, MrR, Bc, A),
    un(Inc, R, Bc),
    un(Inc, R, B),
    un(Dec, R, B),
    un(Ld, RD8, B),
    op(Rlca),
    bi(Ld, A16R, None, Sp),
    bi(Add, RR, Hl, Bc),
    bi(Ld, RMr, A, Bc),
    un(Dec, R, Bc),
    un(Inc, R, C),
    un(Dec, R, C),
    un(Ld, RD8, C),
    op(Rrca),
    // 0x10
    op(Stop),
    un(Ld, RD16, De),
    bi(Ld, MrR, De, A),
    un(Inc, R, De),
    un(Inc, R, D),
    un(Dec, R, D),
    un(Ld, RD8, D),
    op(Rla),
    br(Jr, D8, Cond::Always),
    bi(Add, RR, Hl, De),
    bi(Ld, RMr, A, De),
    un(Dec, R, De),
    un(Inc, R, E),
    un(Dec, R, E),
    un(Ld, RD8, E),
    op(Rra),
    // 0x20
    br(Jr, D8, Cond::Nz),
    un(Ld, RD16, Hl),
    bi(Ld, HlIncR, Hl, A),
    un(Inc, R, Hl),
    un(Inc, R, H),
    un(Dec, R, H),
    un(Ld, RD8, H),
    op(Daa),
    br(Jr, D8, Cond::Z),
    bi(Add, RR, Hl, Hl),
    bi(Ld, RHlInc, A, Hl),
    un(Dec, R, Hl),
    un(Inc, R, L),
    un(Dec, R, L),
    un(Ld, RD8, L),
    op(Cpl),
    // 0x30
    br(Jr, D8, Cond::Nc),
    un(Ld, RD16, Sp),
    bi(Ld, HlDecR, Hl, A),
    un(Inc, R, Sp),
    un(Inc, Mr, Hl),
    un(Dec, Mr, Hl),
    un(Ld, MrD8, Hl),
    op(Scf),
    br(Jr, D8, Cond::C),
    bi(Add, RR, Hl, Sp),
    bi(Ld, RHlDec, A, Hl),
    un(Dec, R, Sp),
    un(Inc, R, A),
    un(Dec, R, A),
    un(Ld, RD8, A),
    op(Ccf),
    // 0x40
    bi(Ld, RR, B, B),
    bi(Ld, RR, B, C),
    bi(Ld, RR, B, D),
    bi(Ld, RR, B, E),
    bi(Ld, RR, B, H),
    bi(Ld, RR, B, L),
    bi(Ld, RMr, B, Hl),
    bi(Ld, RR, B, A),
    bi(Ld, RR, C, B),
    bi(Ld, RR, C, C),
    bi(Ld, RR, C, D),
    bi(Ld, RR, C, E),
    bi(Ld, RR, C, H),
    bi(Ld, RR, C, L),
    bi(Ld, RMr, C, Hl),
    bi(Ld, RR, C, A),
    // 0x50
    bi(Ld, RR, D, B),
    bi(Ld, RR, D, C),
    bi(Ld, RR, D, D),
    bi(Ld, RR, D, E),
    bi(Ld, RR, D, H),
    bi(Ld, RR, D, L),
    bi(Ld, RMr, D, Hl),
    bi(Ld, RR, D, A),
    bi(Ld, RR, E, B),
    bi(Ld, RR, E, C),
    bi(Ld, RR, E, D),
    bi(Ld, RR, E, E),
    bi(Ld, RR, E, H),
    bi(Ld, RR, E, L),
    bi(Ld, RMr, E, Hl),
    bi(Ld, RR, E, A),
    // 0x60
    bi(Ld, RR, H, B),
    bi(Ld, RR, H, C),
    bi(Ld, RR, H, D),
    bi(Ld, RR, H, E),
    bi(Ld, RR, H, H),
    bi(Ld, RR, H, L),
    bi(Ld, RMr, H, Hl),
    bi(Ld, RR, H, A),
    bi(Ld, RR, L, B),
    bi(Ld, RR, L, C),
    bi(Ld, RR, L, D),
    bi(Ld, RR, L, E),
    bi(Ld, RR, L, H),
    bi(Ld, RR, L, L),
    bi(Ld, RMr, L, Hl),
    bi(Ld, RR, L, A),
    // 0x70
    bi(Ld, MrR, Hl, B),
    bi(Ld, MrR, Hl, C),
    bi(Ld, MrR, Hl, D),
    bi(Ld, MrR, Hl, E),
    bi(Ld, MrR, Hl, H),
    bi(Ld, MrR, Hl, L),
    op(Halt),
    bi(Ld, MrR, Hl, A),
    bi(Ld, RR, A, B),
    bi(Ld, RR, A, C),
    bi(Ld, RR, A, D),
    bi(Ld, RR, A, E),
    bi(Ld, RR, A, H),
    bi(Ld, RR, A, L),
    bi(Ld, RMr, A, Hl),
    bi(Ld, RR, A, A),
    // 0x80
    bi(Add, RR, A, B),
    bi(Add, RR, A, C),
    bi(Add, RR, A, D),
    bi(Add, RR, A, E),
    bi(Add, RR, A, H),
    bi(Add, RR, A, L),
    bi(Add, RMr, A, Hl),
    bi(Add, RR, A, A),
    bi(Adc, RR, A, B),
    bi(Adc, RR, A, C),
    bi(Adc, RR, A, D),
    bi(Adc, RR, A, E),
    bi(Adc, RR, A, H),
    bi(Adc, RR, A, L),
    bi(Adc, RMr, A, Hl),
    bi(Adc, RR, A, A),
    // 0x90
    bi(Sub, RR, A, B),
    bi(Sub, RR, A, C),
    bi(Sub, RR, A, D),
    bi(Sub, RR, A, E),
    bi(Sub, RR, A, H),
    bi(Sub, RR, A, L),
    bi(Sub, RMr, A, Hl),
    bi(Sub, RR, A, A),
    bi(Sbc, RR, A, B),
    bi(Sbc, RR, A, C),
    bi(Sbc, RR, A, D),
    bi(Sbc, RR, A, E),
    bi(Sbc, RR, A, H),
    bi(Sbc, RR, A, L),
    bi(Sbc, RMr, A, Hl),
    bi(Sbc, RR, A, A),
    // 0xa0
    bi(And, RR, A, B),
    bi(And, RR, A, C),
    bi(And, RR, A, D),
    bi(And, RR, A, E),
    bi(And, RR, A, H),
    bi(And, RR, A, L),
    bi(And, RMr, A, Hl),
    bi(And, RR, A, A),
    bi(Xor, RR, A, B),
    bi(Xor, RR, A, C),
    bi(Xor, RR, A, D),
    bi(Xor, RR, A, E),
    bi(Xor, RR, A, H),
    bi(Xor, RR, A, L),
    bi(Xor, RMr, A, Hl),
    bi(Xor, RR, A, A),
    // 0xb0
    bi(Or, RR, A, B),
    bi(Or, RR, A, C),
    bi(Or, RR, A, D),
    bi(Or, RR, A, E),
    bi(Or, RR, A, H),
    bi(Or, RR, A, L),
    bi(Or, RMr, A, Hl),
    bi(Or, RR, A, A),
    bi(Cp, RR, A, B),
    bi(Cp, RR, A, C),
    bi(Cp, RR, A, D),
    bi(Cp, RR, A, E),
    bi(Cp, RR, A, H),
    bi(Cp, RR, A, L),
    bi(Cp, RMr, A, Hl),
    bi(Cp, RR, A, A),
    // 0xc0
    br(Ret, Imp, Cond::Nz),
    un(Pop, R, Bc),
    br(Jp, D16, Cond::Nz),
    br(Jp, D16, Cond::Always),
    br(Call, D16, Cond::Nz),
    un(Push, R, Bc),
    un(Add, RD8, A),
    rst(0x00),
    br(Ret, Imp, Cond::Z),
    op(Ret),
    br(Jp, D16, Cond::Z),
    un(CbPrefix, D8, None),
    br(Call, D16, Cond::Z),
    br(Call, D16, Cond::Always),
    un(Adc, RD8, A),
    rst(0x08),
    // 0xd0
    br(Ret, Imp, Cond::Nc),
    un(Pop, R, De),
    br(Jp, D16, Cond::Nc),
    op(Invalid),
    br(Call, D16, Cond::Nc),
    un(Push, R, De),
    un(Sub, RD8, A),
    rst(0x10),
    br(Ret, Imp, Cond::C),
    op(Reti),
    br(Jp, D16, Cond::C),
    op(Invalid),
    br(Call, D16, Cond::C),
    op(Invalid),
    un(Sbc, RD8, A),
    rst(0x18),
    // 0xe0
    bi(Ldh, A8R, None, A),
    un(Pop, R, Hl),
    bi(Ld, MrR, C, A),
    op(Invalid),
    op(Invalid),
    un(Push, R, Hl),
    un(And, RD8, A),
    rst(0x20),
    un(Add, RD8, Sp),
    un(Jp, R, Hl),
    bi(Ld, A16R, None, A),
    op(Invalid),
    op(Invalid),
    op(Invalid),
    un(Xor, RD8, A),
    rst(0x28),
    // 0xf0
    un(Ldh, RA8, A),
    un(Pop, R, Af),
    bi(Ld, RMr, A, C),
    op(Di),
    op(Invalid),
    un(Push, R, Af),
    un(Or, RD8, A),
    rst(0x30),
    bi(Ld, HlSpE, Hl, Sp),
    bi(Ld, RR, Sp, Hl),
    un(Ld, RA16, A),
    op(Ei),
    op(Invalid),
    op(Invalid),
    un(Cp, RD8, A),
    rst(0x38),
];
