bitflags::bitflags! {
    /// Interrupt sources, in priority order (iteration order of `bitflags`
    /// yields the lowest bit first, which is also the highest priority).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Interrupt: u8 {
        const VBLANK = 1;
        const LCD_STAT = 1 << 1;
        const TIMER = 1 << 2;
        const SERIAL = 1 << 3;
        const JOYPAD = 1 << 4;
    }
}

impl Interrupt {
    pub fn vector(self) -> u16 {
        match self.bits() {
            0x01 => 0x0040, // V-Blank
            0x02 => 0x0048, // LCD STAT
            0x04 => 0x0050, // timer
            0x08 => 0x0058, // serial
            0x10 => 0x0060, // joypad
            _ => 0x0000,
        }
    }
}

/// IF, IE and the master enable. Shared by every device through the bus.
#[derive(Clone, Default)]
pub struct InterruptController {
    pub flags: Interrupt,
    pub enable: u8,
    pub ime: bool,
    // EI takes effect after the instruction following it
    pub scheduled_ime: bool,
}

impl InterruptController {
    pub fn request(&mut self, interrupt: Interrupt) {
        self.flags.insert(interrupt);
    }

    /// IF & IE & 0x1f != 0, regardless of IME. This is also the HALT wake
    /// condition.
    pub fn pending(&self) -> bool {
        self.flags.bits() & self.enable & 0x1f != 0
    }

    /// Picks the highest-priority pending interrupt, clears its IF bit and
    /// returns the service vector. IE is re-sampled here: if the PC-high push
    /// of the dispatch sequence overwrote IE so that nothing is pending any
    /// more, the dispatch falls through to 0x0000 and IF is left untouched.
    pub fn service(&mut self) -> u16 {
        let pending = Interrupt::from_bits_truncate(self.flags.bits() & self.enable);
        let Some(interrupt) = pending.iter().next() else {
            return 0x0000;
        };
        self.flags.remove(interrupt);
        interrupt.vector()
    }

    pub fn read_flags(&self) -> u8 {
        // bits 5-7 are unused and always read 1
        self.flags.bits() | 0b1110_0000
    }

    pub fn write_flags(&mut self, value: u8) {
        self.flags = Interrupt::from_bits_truncate(value);
    }
}

#[cfg(test)]
mod tests {
    use super::{Interrupt, InterruptController};

    #[test]
    fn priority_order() {
        let mut ints = Interrupt::all().iter();
        assert_eq!(Some(Interrupt::VBLANK), ints.next());
        assert_eq!(Some(Interrupt::LCD_STAT), ints.next());
        assert_eq!(Some(Interrupt::TIMER), ints.next());
        assert_eq!(Some(Interrupt::SERIAL), ints.next());
        assert_eq!(Some(Interrupt::JOYPAD), ints.next());
        assert_eq!(None, ints.next());
    }

    #[test]
    fn unused_flag_bits_read_high() {
        let mut ic = InterruptController::default();
        assert_eq!(0xe0, ic.read_flags());
        ic.write_flags(0xff);
        assert_eq!(0xff, ic.read_flags());
    }

    #[test]
    fn service_takes_highest_priority_and_clears_it() {
        let mut ic = InterruptController::default();
        ic.enable = 0x1f;
        ic.request(Interrupt::TIMER);
        ic.request(Interrupt::VBLANK);
        assert_eq!(0x0040, ic.service());
        assert!(!ic.flags.contains(Interrupt::VBLANK));
        assert!(ic.flags.contains(Interrupt::TIMER));
        assert_eq!(0x0050, ic.service());
    }

    #[test]
    fn service_cancelled_by_cleared_enable() {
        let mut ic = InterruptController::default();
        ic.request(Interrupt::SERIAL);
        ic.enable = 0x00;
        assert_eq!(0x0000, ic.service());
        // IF is untouched by a cancelled dispatch
        assert!(ic.flags.contains(Interrupt::SERIAL));
    }
}
