//! Cycle-accurate DMG emulation core.
//!
//! Everything here is synchronous and deterministic: the host calls
//! [`Emulator::step`] to run one CPU instruction, and every memory access
//! inside that instruction advances the timer, PPU, APU and serial port by
//! four T-cycles and the OAM DMA engine by one machine cycle. The host
//! drains outputs (frame buffer, audio samples, save RAM) between steps;
//! pacing against a real clock is entirely the host's business.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod dma;
pub mod interrupts;
pub mod joypad;
pub mod mbc;
pub mod ppu;
pub mod serial;
pub mod timer;

use core::ops::Deref;

use bus::Bus;
use cartridge::Cartridge;
use cpu::Cpu;
use interrupts::Interrupt;
use joypad::Buttons;
use ppu::Ppu;

pub const WIDTH: usize = 160;
pub const HEIGHT: usize = 144;
/// The master clock; one tick is a T-cycle, four are a machine cycle.
pub const SYSTEM_CLOCK_FREQUENCY: u32 = 4_194_304;

/// The whole console: SM83 core plus the bus that owns every other device.
pub struct Emulator<R> {
    cpu: Cpu,
    bus: Bus<R>,
}

impl<R: Deref<Target = [u8]>> Emulator<R> {
    /// Starts at the boot ROM. Call [`Self::skip_boot_rom`] for the
    /// post-boot state instead.
    pub fn new(cartridge: Cartridge<R>) -> Self {
        Self {
            cpu: Cpu::default(),
            bus: Bus::new(cartridge),
        }
    }

    /// Puts CPU and devices into the documented state right after the boot
    /// ROM has run, with the boot ROM unmapped.
    pub fn skip_boot_rom(&mut self) {
        self.cpu.init();
        self.bus.ppu.init();
        self.bus.apu.init();
        self.bus.serial.init();
        self.bus.timer.set_system_counter(0xabcc);
        self.bus.interrupts.enable = 0x00;
        self.bus.interrupts.flags = Interrupt::from_bits_truncate(0xe1);
        self.bus.interrupts.ime = false;
        self.bus.interrupts.scheduled_ime = false;
        self.bus.cartridge.disable_boot_rom();
    }

    /// Runs one CPU instruction (or one halted machine cycle), advancing
    /// every device in lock-step.
    pub fn step(&mut self) {
        self.cpu.step(&mut self.bus);
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn bus(&self) -> &Bus<R> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus<R> {
        &mut self.bus
    }

    pub fn ppu(&self) -> &Ppu {
        &self.bus.ppu
    }

    pub fn buttons_mut(&mut self) -> &mut Buttons {
        &mut self.bus.joypad.buttons
    }

    pub fn frames_rendered(&self) -> u64 {
        self.bus.ppu.frames_rendered()
    }

    pub fn frame(&self) -> &[u32; WIDTH * HEIGHT] {
        self.bus.ppu.frame()
    }

    /// Interleaved stereo samples accumulated since the last drain.
    pub fn drain_samples(&mut self) -> impl Iterator<Item = f32> + '_ {
        self.bus.apu.drain_samples()
    }

    pub fn cartridge(&self) -> &Cartridge<R> {
        &self.bus.cartridge
    }

    pub fn cartridge_mut(&mut self) -> &mut Cartridge<R> {
        &mut self.bus.cartridge
    }
}
