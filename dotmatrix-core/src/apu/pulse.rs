use crate::apu::{envelope::Envelope, length::LengthCounter, sweep::SweepUnit};

// https://gbdev.io/pandocs/Audio_Registers.html#ff11--nr11-channel-1-length-timer--duty-cycle
//                                   Duty   Ratio
const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1], //     0      12.5%
    [1, 0, 0, 0, 0, 0, 0, 1], //     1      25%
    [1, 0, 0, 0, 0, 1, 1, 1], //     2      50%
    [0, 1, 1, 1, 1, 1, 1, 0], //     3      75%
];

/// Square-wave channel. `S` is the sweep unit: `Sweep` on channel 1, `()` on
/// channel 2.
#[derive(Clone, Default)]
pub struct PulseChannel<S> {
    enabled: bool,
    nrx1: u8,
    envelope: Envelope,
    frequency: u16, // 11 bits from NRx3/NRx4
    length: LengthCounter<64>,
    frequency_timer: u16,
    duty_position: u8,
    pub sweep: S,
}

impl<S: SweepUnit> PulseChannel<S> {
    /// One T-cycle: the frequency timer steps the duty position on expiry.
    pub fn tick(&mut self) {
        if self.frequency_timer > 0 {
            self.frequency_timer -= 1;
        }
        if self.frequency_timer == 0 {
            self.frequency_timer = (2048 - self.frequency) * 4;
            self.duty_position = (self.duty_position + 1) & 7;
        }
    }

    pub fn tick_length(&mut self) {
        if self.length.tick() {
            self.enabled = false;
        }
    }

    pub fn tick_envelope(&mut self) {
        if self.enabled {
            self.envelope.tick();
        }
    }

    pub fn tick_sweep(&mut self) {
        if !self.enabled {
            return;
        }
        let (alive, frequency) = self.sweep.tick();
        if let Some(frequency) = frequency {
            self.frequency = frequency;
        }
        self.enabled &= alive;
    }

    pub fn is_on(&self) -> bool {
        self.enabled
    }

    /// Channel output in [0, 1]; a silenced channel contributes 0.
    pub fn output(&self) -> f32 {
        if !self.enabled || !self.envelope.dac_enabled() {
            return 0.0;
        }
        let bit = DUTY_TABLE[usize::from(self.nrx1 >> 6)][usize::from(self.duty_position)];
        f32::from(bit * self.envelope.volume()) / 15.0
    }

    pub fn read_nrx1(&self) -> u8 {
        self.nrx1 | 0x3f
    }

    pub fn write_nrx1(&mut self, value: u8) {
        self.nrx1 = value;
        self.length.set_load(value);
    }

    pub fn read_nrx2(&self) -> u8 {
        self.envelope.read()
    }

    pub fn write_nrx2(&mut self, value: u8) {
        self.envelope.write(value);
        // killing the DAC kills the channel immediately
        if !self.envelope.dac_enabled() {
            self.enabled = false;
        }
    }

    pub fn write_nrx3(&mut self, value: u8) {
        self.frequency = (self.frequency & 0x700) | u16::from(value);
    }

    pub fn read_nrx4(&self) -> u8 {
        (u8::from(self.length.enabled) << 6) | 0b1011_1111
    }

    pub fn write_nrx4(&mut self, value: u8) {
        self.length.enabled = value & 0x40 != 0;
        self.frequency = (u16::from(value & 0x07) << 8) | (self.frequency & 0xff);
        if value & 0x80 != 0 {
            self.trigger();
        }
    }

    fn trigger(&mut self) {
        // length is reloaded even with the DAC off
        self.length.trigger();
        self.frequency_timer = (2048 - self.frequency) * 4;
        if !self.envelope.dac_enabled() {
            return;
        }
        self.envelope.trigger();
        self.enabled = self.sweep.trigger(self.frequency);
    }
}

impl PulseChannel<crate::apu::sweep::Sweep> {
    pub fn read_nr10(&self) -> u8 {
        self.sweep.read()
    }

    pub fn write_nr10(&mut self, value: u8) {
        if !self.sweep.write(value) {
            self.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PulseChannel;

    #[test]
    fn trigger_requires_a_live_dac() {
        let mut channel = PulseChannel::<()>::default();
        channel.write_nrx4(0x80);
        assert!(!channel.is_on());
        channel.write_nrx2(0xf0);
        channel.write_nrx4(0x80);
        assert!(channel.is_on());
    }

    #[test]
    fn length_expiry_disables_the_channel() {
        let mut channel = PulseChannel::<()>::default();
        channel.write_nrx2(0xf0);
        channel.write_nrx1(0x3e); // length 2
        channel.write_nrx4(0xc0); // length enabled, trigger
        channel.tick_length();
        assert!(channel.is_on());
        channel.tick_length();
        assert!(!channel.is_on());
    }

    #[test]
    fn clearing_the_dac_disables_immediately() {
        let mut channel = PulseChannel::<()>::default();
        channel.write_nrx2(0xf0);
        channel.write_nrx4(0x80);
        assert!(channel.is_on());
        channel.write_nrx2(0x07);
        assert!(!channel.is_on());
    }

    #[test]
    fn duty_position_advances_at_the_programmed_rate() {
        let mut channel = PulseChannel::<()>::default();
        channel.write_nrx2(0xf0);
        channel.write_nrx3(0x00);
        channel.write_nrx4(0x87); // frequency 0x700: timer (2048-1792)*4
        let period = (2048 - 0x700) * 4;
        let before = channel.duty_position;
        for _ in 0..period {
            channel.tick();
        }
        assert_eq!((before + 1) & 7, channel.duty_position);
    }

    #[test]
    fn register_read_back_is_masked() {
        let mut channel = PulseChannel::<()>::default();
        channel.write_nrx1(0x81);
        channel.write_nrx2(0x42);
        channel.write_nrx3(0x12);
        channel.write_nrx4(0x45);
        assert_eq!(0x81 | 0x3f, channel.read_nrx1());
        assert_eq!(0x42, channel.read_nrx2());
        assert_eq!(0x45 | 0xbf, channel.read_nrx4());
    }
}
