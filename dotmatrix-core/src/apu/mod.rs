mod envelope;
mod length;
mod noise;
mod pulse;
mod sweep;
mod wave;

use arrayvec::ArrayVec;

pub use noise::NoiseChannel;
pub use pulse::PulseChannel;
pub use sweep::Sweep;
pub use wave::WaveChannel;

use crate::SYSTEM_CLOCK_FREQUENCY;

/// Host audio sample rate. A fractional accumulator spreads the 4194304 Hz
/// T-cycle stream over exactly this rate (one stereo pair every ~95.1
/// T-cycles) instead of the hardware-ish fixed decimation.
pub const SAMPLE_RATE: u32 = 44_100;

/// Interleaved stereo f32 samples the host has not drained yet. 2048 pairs
/// is about 46 ms of audio.
pub const AUDIO_BUFFER_LEN: usize = 4096;

bitflags::bitflags! {
    /// NR51 sound panning.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Panning: u8 {
        const CH4_LEFT = 1 << 7;
        const CH3_LEFT = 1 << 6;
        const CH2_LEFT = 1 << 5;
        const CH1_LEFT = 1 << 4;
        const CH4_RIGHT = 1 << 3;
        const CH3_RIGHT = 1 << 2;
        const CH2_RIGHT = 1 << 1;
        const CH1_RIGHT = 1;
    }
}

/// Four channels, the 512 Hz frame sequencer, the stereo mixer and the
/// downsampler.
#[derive(Clone, Default)]
pub struct Apu {
    pub ch1: PulseChannel<Sweep>,
    pub ch2: PulseChannel<()>,
    pub ch3: WaveChannel,
    pub ch4: NoiseChannel,
    nr50: u8,
    nr51: Panning,
    power: bool,
    frame_step: u8,
    sequencer_ticks: u16,
    sample_accumulator: u32,
    samples: ArrayVec<f32, AUDIO_BUFFER_LEN>,
}

impl Apu {
    /// Advances the APU by one T-cycle.
    pub fn tick(&mut self) {
        if self.power {
            self.sequencer_ticks += 1;
            if self.sequencer_ticks == 8192 {
                self.sequencer_ticks = 0;
                self.frame_sequencer_tick();
            }
            self.ch1.tick();
            self.ch2.tick();
            self.ch3.tick();
            self.ch4.tick();
        }
        self.downsample();
    }

    /// 512 Hz modulation clocks:
    /// step    0    1    2    3    4    5    6    7
    /// length  x         x         x         x
    /// sweep             x                   x
    /// env                                        x
    fn frame_sequencer_tick(&mut self) {
        if self.frame_step & 1 == 0 {
            self.ch1.tick_length();
            self.ch2.tick_length();
            self.ch3.tick_length();
            self.ch4.tick_length();
        }
        if self.frame_step == 2 || self.frame_step == 6 {
            self.ch1.tick_sweep();
        }
        if self.frame_step == 7 {
            self.ch1.tick_envelope();
            self.ch2.tick_envelope();
            self.ch4.tick_envelope();
        }
        self.frame_step = (self.frame_step + 1) & 7;
    }

    fn downsample(&mut self) {
        self.sample_accumulator += SAMPLE_RATE;
        if self.sample_accumulator < SYSTEM_CLOCK_FREQUENCY {
            return;
        }
        self.sample_accumulator -= SYSTEM_CLOCK_FREQUENCY;

        let (mut left, mut right) = (0.0, 0.0);
        if self.power {
            let outputs = [
                (self.ch1.output(), Panning::CH1_LEFT, Panning::CH1_RIGHT),
                (self.ch2.output(), Panning::CH2_LEFT, Panning::CH2_RIGHT),
                (self.ch3.output(), Panning::CH3_LEFT, Panning::CH3_RIGHT),
                (self.ch4.output(), Panning::CH4_LEFT, Panning::CH4_RIGHT),
            ];
            for (sample, left_enable, right_enable) in outputs {
                if self.nr51.contains(left_enable) {
                    left += sample;
                }
                if self.nr51.contains(right_enable) {
                    right += sample;
                }
            }
        }
        left = left / 4.0 * f32::from((self.nr50 >> 4) & 0x07) / 15.0;
        right = right / 4.0 * f32::from(self.nr50 & 0x07) / 15.0;

        // the host drains every instruction; losing samples beyond that is
        // preferable to unbounded buffering
        if self.samples.remaining_capacity() >= 2 {
            self.samples.push(left);
            self.samples.push(right);
        }
    }

    /// Hands the accumulated stereo pairs to the host audio sink.
    pub fn drain_samples(&mut self) -> impl Iterator<Item = f32> + '_ {
        self.samples.drain(..)
    }

    pub fn pending_samples(&self) -> usize {
        self.samples.len()
    }

    /// Register read-back ORs the stored value with the per-address
    /// unused-bit mask:
    ///       NRx0 NRx1 NRx2 NRx3 NRx4
    /// NR1x  $80  $3F  $00  $FF  $BF
    /// NR2x  $FF  $3F  $00  $FF  $BF
    /// NR3x  $7F  $FF  $9F  $FF  $BF
    /// NR4x  $FF  $FF  $00  $00  $BF
    /// NR5x  $00  $00  $70
    /// 0xff27-0xff2f always read 0xff.
    pub fn read(&self, address: u16) -> u8 {
        match address {
            0xff10 => self.ch1.read_nr10(),
            0xff11 => self.ch1.read_nrx1(),
            0xff12 => self.ch1.read_nrx2(),
            0xff13 => 0xff,
            0xff14 => self.ch1.read_nrx4(),
            0xff16 => self.ch2.read_nrx1(),
            0xff17 => self.ch2.read_nrx2(),
            0xff18 => 0xff,
            0xff19 => self.ch2.read_nrx4(),
            0xff1a => self.ch3.read_nr30(),
            0xff1b => 0xff,
            0xff1c => self.ch3.read_nr32(),
            0xff1d => 0xff,
            0xff1e => self.ch3.read_nr34(),
            0xff20 => 0xff,
            0xff21 => self.ch4.read_nr42(),
            0xff22 => self.ch4.read_nr43(),
            0xff23 => self.ch4.read_nr44(),
            0xff24 => self.nr50,
            0xff25 => self.nr51.bits(),
            0xff26 => self.read_nr52(),
            0xff30..0xff40 => self.ch3.read_ram((address & 0x0f) as u8),
            _ => 0xff,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        // while powered off only NR41, NR52 and wave RAM accept writes
        if !self.power && address < 0xff26 && address != 0xff20 {
            return;
        }
        match address {
            0xff10 => self.ch1.write_nr10(value),
            0xff11 => self.ch1.write_nrx1(value),
            0xff12 => self.ch1.write_nrx2(value),
            0xff13 => self.ch1.write_nrx3(value),
            0xff14 => self.ch1.write_nrx4(value),
            0xff16 => self.ch2.write_nrx1(value),
            0xff17 => self.ch2.write_nrx2(value),
            0xff18 => self.ch2.write_nrx3(value),
            0xff19 => self.ch2.write_nrx4(value),
            0xff1a => self.ch3.write_nr30(value),
            0xff1b => self.ch3.write_nr31(value),
            0xff1c => self.ch3.write_nr32(value),
            0xff1d => self.ch3.write_nr33(value),
            0xff1e => self.ch3.write_nr34(value),
            0xff20 => self.ch4.write_nr41(value),
            0xff21 => self.ch4.write_nr42(value),
            0xff22 => self.ch4.write_nr43(value),
            0xff23 => self.ch4.write_nr44(value),
            0xff24 => self.nr50 = value,
            0xff25 => self.nr51 = Panning::from_bits_retain(value),
            0xff26 => self.write_nr52(value),
            0xff30..0xff40 => self.ch3.write_ram((address & 0x0f) as u8, value),
            _ => {}
        }
    }

    fn read_nr52(&self) -> u8 {
        (u8::from(self.power) << 7)
            | 0x70
            | (u8::from(self.ch4.is_on()) << 3)
            | (u8::from(self.ch3.is_on()) << 2)
            | (u8::from(self.ch2.is_on()) << 1)
            | u8::from(self.ch1.is_on())
    }

    fn write_nr52(&mut self, value: u8) {
        let power = value & 0x80 != 0;
        if self.power == power {
            return;
        }
        self.power = power;
        if power {
            self.frame_step = 0;
            self.sequencer_ticks = 0;
        } else {
            self.clear_registers();
        }
    }

    /// Power-down wipes every register except NR41 and wave RAM.
    fn clear_registers(&mut self) {
        let ram = self.ch3.ram;
        let ch4 = NoiseChannel::preserve_length(&self.ch4);
        self.ch4 = ch4;

        self.ch1 = PulseChannel::default();
        self.ch2 = PulseChannel::default();
        self.ch3 = WaveChannel::default();
        self.ch3.ram = ram;
        self.nr50 = 0;
        self.nr51 = Panning::empty();
    }

    /// Post-boot register state, for hosts skipping the boot ROM.
    pub fn init(&mut self) {
        for (address, value) in [
            (0xff26, 0xf1),
            (0xff10, 0x80),
            (0xff11, 0xbf),
            (0xff12, 0xf3),
            (0xff13, 0xff),
            (0xff14, 0xbf),
            (0xff16, 0x3f),
            (0xff17, 0x00),
            (0xff18, 0xff),
            (0xff19, 0xbf),
            (0xff1a, 0x7f),
            (0xff1b, 0xff),
            (0xff1c, 0x9f),
            (0xff1d, 0xff),
            (0xff1e, 0xbf),
            (0xff20, 0xff),
            (0xff21, 0x00),
            (0xff22, 0x00),
            (0xff23, 0xbf),
            (0xff24, 0x77),
            (0xff25, 0xf3),
        ] {
            self.write(address, value);
        }
    }
}
