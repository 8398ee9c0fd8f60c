use crate::interrupts::{Interrupt, InterruptController};

bitflags::bitflags! {
    /// 0xff00 as the program sees it: everything active-low.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct JoypadLines: u8 {
        const NOT_BUTTONS = 1 << 5;
        const NOT_DPAD = 1 << 4;
        const NOT_START_DOWN = 1 << 3;
        const NOT_SELECT_UP = 1 << 2;
        const NOT_B_LEFT = 1 << 1;
        const NOT_A_RIGHT = 1;
    }
}

/// Host-facing button state. Written by the input thread, read by the
/// emulation core; individual bool writes are atomic enough for the games'
/// purposes (see the concurrency notes in the front-end).
#[derive(Clone, Copy, Default)]
pub struct Buttons {
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
    pub right: bool,
    pub left: bool,
    pub up: bool,
    pub down: bool,
}

/// The joypad register. Bits 4/5 select the D-pad/button groups (0 =
/// selected), the low nibble is the shared key lines, bits 6-7 read 1.
#[derive(Clone)]
pub struct Joypad {
    pub buttons: Buttons,
    select_dpad: bool,
    select_buttons: bool,
    prev_lines: u8,
}

impl Default for Joypad {
    fn default() -> Self {
        Self {
            buttons: Buttons::default(),
            select_dpad: false,
            select_buttons: false,
            prev_lines: 0x0f,
        }
    }
}

impl Joypad {
    pub fn read(&mut self, interrupts: &mut InterruptController) -> u8 {
        let mut value = self.lines(interrupts);
        value.set(JoypadLines::NOT_DPAD, !self.select_dpad);
        value.set(JoypadLines::NOT_BUTTONS, !self.select_buttons);
        value.bits() | 0b1100_0000
    }

    pub fn write(&mut self, value: u8, interrupts: &mut InterruptController) {
        let value = JoypadLines::from_bits_retain(value);
        self.select_dpad = !value.contains(JoypadLines::NOT_DPAD);
        self.select_buttons = !value.contains(JoypadLines::NOT_BUTTONS);
        // a newly selected held key can fire the interrupt right away
        self.lines(interrupts);
    }

    /// Computes the key lines and raises the joypad interrupt on any 1 -> 0
    /// transition of a selected line.
    fn lines(&mut self, interrupts: &mut InterruptController) -> JoypadLines {
        let mut lines = JoypadLines::NOT_START_DOWN
            | JoypadLines::NOT_SELECT_UP
            | JoypadLines::NOT_B_LEFT
            | JoypadLines::NOT_A_RIGHT;
        let held = &self.buttons;
        if self.select_dpad {
            lines.set(JoypadLines::NOT_START_DOWN, !held.down);
            lines.set(JoypadLines::NOT_SELECT_UP, !held.up);
            lines.set(JoypadLines::NOT_B_LEFT, !held.left);
            lines.set(JoypadLines::NOT_A_RIGHT, !held.right);
        }
        if self.select_buttons {
            if held.start {
                lines.remove(JoypadLines::NOT_START_DOWN);
            }
            if held.select {
                lines.remove(JoypadLines::NOT_SELECT_UP);
            }
            if held.b {
                lines.remove(JoypadLines::NOT_B_LEFT);
            }
            if held.a {
                lines.remove(JoypadLines::NOT_A_RIGHT);
            }
        }

        if self.prev_lines & !lines.bits() & 0x0f != 0 {
            interrupts.request(Interrupt::JOYPAD);
        }
        self.prev_lines = lines.bits() & 0x0f;
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_selected_reads_all_released() {
        let mut joypad = Joypad::default();
        let mut ints = InterruptController::default();
        joypad.buttons.a = true;
        joypad.buttons.down = true;
        assert_eq!(0xff, joypad.read(&mut ints));
        assert!(!ints.flags.contains(Interrupt::JOYPAD));
    }

    #[test]
    fn dpad_and_button_groups_share_lines() {
        let mut joypad = Joypad::default();
        let mut ints = InterruptController::default();
        joypad.buttons.start = true;
        joypad.write(0xdf, &mut ints); // select buttons
        assert_eq!(0b1101_0111, joypad.read(&mut ints));
        joypad.write(0xef, &mut ints); // select dpad
        joypad.buttons.start = false;
        joypad.buttons.left = true;
        assert_eq!(0b1110_1101, joypad.read(&mut ints));
    }

    #[test]
    fn selected_press_raises_interrupt() {
        let mut joypad = Joypad::default();
        let mut ints = InterruptController::default();
        joypad.write(0xdf, &mut ints);
        joypad.read(&mut ints);
        assert!(!ints.flags.contains(Interrupt::JOYPAD));
        joypad.buttons.a = true;
        joypad.read(&mut ints);
        assert!(ints.flags.contains(Interrupt::JOYPAD));
    }

    #[test]
    fn selecting_a_held_key_raises_interrupt() {
        let mut joypad = Joypad::default();
        let mut ints = InterruptController::default();
        joypad.buttons.b = true;
        joypad.read(&mut ints);
        assert!(!ints.flags.contains(Interrupt::JOYPAD));
        joypad.write(0xdf, &mut ints);
        assert!(ints.flags.contains(Interrupt::JOYPAD));
    }

    #[test]
    fn both_groups_selected_merge_their_lines() {
        let mut joypad = Joypad::default();
        let mut ints = InterruptController::default();
        joypad.buttons.down = true;
        joypad.buttons.start = true;
        joypad.write(0xcf, &mut ints); // both groups
        assert_eq!(0b1100_0111, joypad.read(&mut ints));
    }
}
