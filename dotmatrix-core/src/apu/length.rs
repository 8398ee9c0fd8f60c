/// Length counter, ticked at 256 Hz by the frame sequencer. `MAX` is 64 for
/// the pulse/noise channels and 256 for the wave channel.
#[derive(Clone, Default)]
pub struct LengthCounter<const MAX: u16> {
    counter: u16,
    load: u8,
    pub enabled: bool,
}

impl<const MAX: u16> LengthCounter<MAX> {
    /// NRx1 write: the timer restarts at MAX - load.
    pub fn set_load(&mut self, value: u8) {
        self.load = value & ((MAX - 1) as u8);
        self.counter = MAX - u16::from(self.load);
    }

    pub fn trigger(&mut self) {
        if self.counter == 0 {
            self.counter = MAX - u16::from(self.load);
        }
    }

    /// Returns true when the counter just expired (channel must be disabled).
    #[must_use]
    pub fn tick(&mut self) -> bool {
        if !self.enabled || self.counter == 0 {
            return false;
        }
        self.counter -= 1;
        self.counter == 0
    }

    pub fn is_expired(&self) -> bool {
        self.counter == 0
    }
}

#[cfg(test)]
mod tests {
    use super::LengthCounter;

    #[test]
    fn counts_down_from_max_minus_load() {
        let mut length = LengthCounter::<64>::default();
        length.set_load(62);
        length.enabled = true;
        assert!(!length.tick());
        assert!(length.tick());
        assert!(length.is_expired());
        // expired counters stay expired until retriggered
        assert!(!length.tick());
    }

    #[test]
    fn trigger_only_reloads_an_expired_counter() {
        let mut length = LengthCounter::<64>::default();
        length.set_load(0x3f);
        length.enabled = true;
        assert!(length.tick());
        length.trigger();
        assert!(!length.is_expired());

        length.set_load(0x30);
        length.trigger();
        // counter was non-zero, trigger does not reload
        for _ in 0..15 {
            assert!(!length.tick());
        }
        assert!(length.tick());
    }
}
