use crate::interrupts::{Interrupt, InterruptController};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SerialControl: u8 {
        const TRANSFER_ENABLE = 1 << 7;
        const CLOCK_SELECT = 1;
    }
}

/// Serial link shift register. Only the internal 8192 Hz clock is modeled;
/// with no peer on the other end every shifted-in bit is a 1.
#[derive(Clone, Default)]
pub struct Serial {
    sb: u8,
    sc: SerialControl,
    prev_bit: bool,
    shift_count: u8,
}

impl Serial {
    /// Advances the shifter by one T-cycle. The shift clock is bit 8 of the
    /// timer's system counter (4194304 / 2^9 = 8192 Hz), gated by SC bit 7
    /// (transfer enable) and SC bit 0 (internal clock).
    pub fn tick(&mut self, system_counter: u16, interrupts: &mut InterruptController) {
        let curr_bit = system_counter & (1 << 8) != 0
            && self
                .sc
                .contains(SerialControl::TRANSFER_ENABLE | SerialControl::CLOCK_SELECT);

        if self.prev_bit && !curr_bit {
            self.sb = (self.sb << 1) | 1;
            self.shift_count += 1;
            if self.shift_count == 8 {
                self.shift_count = 0;
                self.sc.remove(SerialControl::TRANSFER_ENABLE);
                interrupts.request(Interrupt::SERIAL);
            }
        }
        self.prev_bit = curr_bit;
    }

    pub fn read(&self, address: u16) -> u8 {
        match address {
            0xff01 => self.sb,
            // bit 1 is the CGB clock-speed select, unused here
            0xff02 => self.sc.bits() | 0b0111_1110,
            _ => 0xff,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0xff01 => self.sb = value,
            0xff02 => self.sc = SerialControl::from_bits_truncate(value),
            _ => {}
        }
    }

    pub fn init(&mut self) {
        self.sb = 0x00;
        self.sc = SerialControl::from_bits_truncate(0x7e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_shifts_in_ones_and_raises_interrupt() {
        let mut serial = Serial::default();
        let mut ints = InterruptController::default();
        serial.write(0xff01, 0x00);
        serial.write(0xff02, 0x81);

        let mut counter = 0u16;
        while serial.read(0xff02) & 0x80 != 0 {
            counter = counter.wrapping_add(1);
            serial.tick(counter, &mut ints);
        }

        assert_eq!(0xff, serial.read(0xff01));
        assert!(ints.flags.contains(Interrupt::SERIAL));
        // 8 bits at 8192 Hz is 8 * 512 T-cycles
        assert!(counter >= 8 * 512);
    }

    #[test]
    fn no_shift_with_external_clock_selected() {
        let mut serial = Serial::default();
        let mut ints = InterruptController::default();
        serial.write(0xff01, 0x55);
        serial.write(0xff02, 0x80); // enabled, external clock

        for counter in 0..0x4000u16 {
            serial.tick(counter, &mut ints);
        }

        assert_eq!(0x55, serial.read(0xff01));
        assert!(!ints.flags.contains(Interrupt::SERIAL));
    }

    #[test]
    fn unused_control_bits_read_high() {
        let serial = Serial::default();
        assert_eq!(0b0111_1110, serial.read(0xff02));
    }
}
