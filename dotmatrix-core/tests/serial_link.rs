//! Internally clocked serial transfer with no peer: after eight shifts the
//! data register holds all ones, the enable bit drops and the serial
//! interrupt is requested.

mod common;

use common::{boot, rom_with_program};
use dotmatrix_core::interrupts::Interrupt;

#[rustfmt::skip]
const PROGRAM: &[u8] = &[
    0x3e, 0x42,             // LD A,0x42
    0xe0, 0x01,             // LDH (SB),A
    0x3e, 0x81,             // LD A,0x81
    0xe0, 0x02,             // LDH (SC),A
    0x18, 0xfe,             // spin: JR spin
];

#[test]
fn transfer_without_peer_shifts_in_ones() {
    let mut emulator = boot(rom_with_program(PROGRAM));

    // 8 bits at 8192 Hz is 4096 T-cycles; leave generous slack for the
    // clock-bit alignment
    for _ in 0..8192 {
        emulator.step();
        if emulator.bus_mut().read(0xff02) & 0x80 == 0
            && emulator.cpu().pc >= 0x158
        {
            break;
        }
    }

    assert_eq!(0x00, emulator.bus_mut().read(0xff02) & 0x80);
    assert_eq!(0xff, emulator.bus_mut().read(0xff01));
    assert!(
        emulator
            .bus()
            .interrupts
            .flags
            .contains(Interrupt::SERIAL)
    );
}
