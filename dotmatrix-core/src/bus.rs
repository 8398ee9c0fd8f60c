use core::ops::Deref;

use crate::{
    apu::Apu,
    cartridge::Cartridge,
    dma::Dma,
    interrupts::InterruptController,
    joypad::Joypad,
    ppu::Ppu,
    serial::Serial,
    timer::Timer,
};

/// Address decoder and owner of every device. The CPU advances emulated
/// time exclusively through `cpu_read`/`cpu_write`/`internal_cycle`; plain
/// `read`/`write` decode without ticking (the DMA engine and tests use
/// those).
pub struct Bus<R> {
    pub cartridge: Cartridge<R>,
    wram: [u8; 0x2000],
    hram: [u8; 0x7f],
    pub ppu: Ppu,
    pub apu: Apu,
    pub timer: Timer,
    pub serial: Serial,
    pub dma: Dma,
    pub joypad: Joypad,
    pub interrupts: InterruptController,
}

impl<R: Deref<Target = [u8]>> Bus<R> {
    pub fn new(cartridge: Cartridge<R>) -> Self {
        Self {
            cartridge,
            wram: [0; 0x2000],
            hram: [0; 0x7f],
            ppu: Ppu::default(),
            apu: Apu::default(),
            timer: Timer::default(),
            serial: Serial::default(),
            dma: Dma::default(),
            joypad: Joypad::default(),
            interrupts: InterruptController::default(),
        }
    }

    /// One machine cycle: (timer, PPU, APU, serial) x 4 T-cycles, then one
    /// DMA transfer slot. Runs before every CPU access completes.
    pub fn tick_machine_cycle(&mut self) {
        for _ in 0..4 {
            self.timer.tick(&mut self.interrupts);
            self.ppu.tick(&mut self.interrupts);
            self.apu.tick();
            self.serial
                .tick(self.timer.system_counter(), &mut self.interrupts);
        }
        self.dma_tick();
    }

    pub fn cpu_read(&mut self, address: u16) -> u8 {
        self.tick_machine_cycle();
        self.read(address)
    }

    pub fn cpu_write(&mut self, address: u16, value: u8) {
        self.tick_machine_cycle();
        self.write(address, value);
    }

    /// An internal CPU delay cycle with no bus traffic.
    pub fn internal_cycle(&mut self) {
        self.tick_machine_cycle();
    }

    fn dma_tick(&mut self) {
        if let Some((source, offset)) = self.dma.advance() {
            let value = self.dma_read(source);
            self.ppu.write_oam(u16::from(offset), value);
        }
    }

    /// The DMA engine's view of memory: no OAM lockout, and everything from
    /// 0xe000 up mirrors work RAM.
    fn dma_read(&self, address: u16) -> u8 {
        match address {
            0x0000..0x8000 | 0xa000..0xc000 => self.cartridge.read(address),
            0x8000..0xa000 => self.ppu.read_vram(address),
            0xc000.. => self.wram[usize::from(address & 0x1fff)],
        }
    }

    pub fn read(&mut self, address: u16) -> u8 {
        match address {
            0x0000..0x8000 | 0xa000..0xc000 => self.cartridge.read(address),
            0x8000..0xa000 => self.ppu.read_vram(address),
            0xc000..0xe000 => self.wram[usize::from(address - 0xc000)],
            // echo RAM mirrors work RAM
            0xe000..0xfe00 => self.wram[usize::from(address - 0xe000)],
            0xfe00..0xfea0 => {
                if self.dma.is_active() {
                    0xff
                } else {
                    self.ppu.read_oam(address)
                }
            }
            0xfea0..0xff00 => 0,
            0xff00 => self.joypad.read(&mut self.interrupts),
            0xff01..=0xff02 => self.serial.read(address),
            0xff04..=0xff07 => self.timer.read(address),
            0xff0f => self.interrupts.read_flags(),
            0xff10..0xff40 => self.apu.read(address),
            0xff46 => self.dma.register(),
            0xff40..0xff4c => self.ppu.read_register(address),
            0xff80..0xffff => self.hram[usize::from(address - 0xff80)],
            0xffff => self.interrupts.enable,
            _ => 0xff,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..0x8000 | 0xa000..0xc000 => self.cartridge.write(address, value),
            0x8000..0xa000 => self.ppu.write_vram(address, value),
            0xc000..0xe000 => self.wram[usize::from(address - 0xc000)] = value,
            0xe000..0xfe00 => self.wram[usize::from(address - 0xe000)] = value,
            0xfe00..0xfea0 => {
                // the DMA engine owns OAM while it runs
                if !self.dma.is_active() {
                    self.ppu.write_oam(address, value);
                }
            }
            0xfea0..0xff00 => {}
            0xff00 => self.joypad.write(value, &mut self.interrupts),
            0xff01..=0xff02 => self.serial.write(address, value),
            0xff04..=0xff07 => self.timer.write(address, value),
            0xff0f => self.interrupts.write_flags(value),
            0xff10..0xff40 => self.apu.write(address, value),
            0xff46 => self.dma.start(value),
            0xff40..0xff4c => self.ppu.write_register(address, value),
            0xff50 => {
                if value & 1 != 0 {
                    self.cartridge.disable_boot_rom();
                }
            }
            0xff80..0xffff => self.hram[usize::from(address - 0xff80)] = value,
            0xffff => self.interrupts.enable = value,
            _ => {}
        }
    }
}
