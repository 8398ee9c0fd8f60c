//! V-Blank interrupt end to end: enable IE, EI, HALT; the handler at 0x40
//! leaves a marker in work RAM.

mod common;

use common::{boot, rom_with_sections};
use dotmatrix_core::interrupts::Interrupt;

#[rustfmt::skip]
const PROGRAM: &[u8] = &[
    0x3e, 0x01,             // LD A,0x01
    0xea, 0xff, 0xff,       // LD (IE),A
    0xaf,                   // XOR A
    0xe0, 0x0f,             // LDH (IF),A (drop the boot-time V-Blank flag)
    0xfb,                   // EI
    0x76,                   // HALT
    0x00,                   // NOP
    0x18, 0xfe,             // spin: JR spin
];

#[rustfmt::skip]
const HANDLER: &[u8] = &[
    0x3e, 0xa5,             // LD A,0xa5
    0xea, 0x00, 0xc0,       // LD (0xc000),A
    0x18, 0xfe,             // spin: JR spin
];

#[test]
fn vblank_wakes_halt_and_runs_the_handler() {
    let mut emulator = boot(rom_with_sections(PROGRAM, &[(0x40, HANDLER)]));

    // one frame is 70224 T-cycles; a halted CPU burns one machine cycle per
    // step
    for _ in 0..30_000 {
        emulator.step();
        if emulator.bus_mut().read(0xc000) == 0xa5 {
            break;
        }
    }

    assert_eq!(0xa5, emulator.bus_mut().read(0xc000));
    assert_eq!(1, emulator.frames_rendered());
    // the dispatch acknowledged the request
    assert!(
        !emulator
            .bus()
            .interrupts
            .flags
            .contains(Interrupt::VBLANK)
    );
    assert!(!emulator.bus().interrupts.ime);
}
