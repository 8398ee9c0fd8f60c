//! End-to-end OAM DMA: a program fills work RAM with a pattern, triggers a
//! transfer from 0xc000 and spins. OAM must read 0xff from the CPU side
//! while the engine runs and hold the pattern within 160 machine cycles.

mod common;

use common::{boot, rom_with_program};

#[rustfmt::skip]
const PROGRAM: &[u8] = &[
    0x21, 0x00, 0xc0,       // LD HL,0xc000
    0x06, 0xa0,             // LD B,0xa0
    0x7d,                   // loop: LD A,L
    0x22,                   // LD (HL+),A
    0x05,                   // DEC B
    0x20, 0xfb,             // JR NZ,loop
    0x3e, 0xc0,             // LD A,0xc0
    0xe0, 0x46,             // LDH (0x46),A
    0x18, 0xfe,             // spin: JR spin
];

#[test]
fn dma_copies_160_bytes_while_locking_oam() {
    let mut emulator = boot(rom_with_program(PROGRAM));

    while !emulator.bus().dma.is_active() {
        emulator.step();
    }
    let started_at = emulator.bus().timer.system_counter();

    // CPU-visible OAM is locked for the duration
    assert_eq!(0xff, emulator.bus_mut().read(0xfe00));
    assert_eq!(0xff, emulator.bus_mut().read(0xfe9f));

    while emulator.bus().dma.is_active() {
        emulator.step();
    }
    let elapsed = emulator
        .bus()
        .timer
        .system_counter()
        .wrapping_sub(started_at)
        / 4;
    // 160 transfer cycles, give or take instruction granularity
    assert!(elapsed <= 164, "transfer took {elapsed} machine cycles");

    for offset in 0..0xa0u16 {
        assert_eq!(offset as u8, emulator.ppu().read_oam(offset));
        assert_eq!(offset as u8, emulator.bus_mut().read(0xfe00 + offset));
    }
}
