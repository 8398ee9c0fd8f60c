pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;
pub const MAX_RAM_BANKS: usize = 16;
/// MBC2 has 512 half-bytes of internal RAM instead of external banks.
pub const MBC2_RAM_SIZE: usize = 512;

/// Cartridge type byte at 0x147.
/// https://gbdev.io/pandocs/The_Cartridge_Header.html#0147--cartridge-type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartridgeType {
    RomOnly,
    Mbc1,
    Mbc1Ram,
    Mbc1RamBattery,
    Mbc2,
    Mbc2Battery,
    Mbc3TimerBattery,
    Mbc3TimerRamBattery,
    Mbc3,
    Mbc3Ram,
    Mbc3RamBattery,
    Mbc5,
    Mbc5Ram,
    Mbc5RamBattery,
}

impl CartridgeType {
    pub fn has_battery(self) -> bool {
        use CartridgeType::*;
        matches!(
            self,
            Mbc1RamBattery
                | Mbc2Battery
                | Mbc3TimerBattery
                | Mbc3TimerRamBattery
                | Mbc3RamBattery
                | Mbc5RamBattery
        )
    }
}

impl TryFrom<u8> for CartridgeType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::RomOnly),
            0x01 => Ok(Self::Mbc1),
            0x02 => Ok(Self::Mbc1Ram),
            0x03 => Ok(Self::Mbc1RamBattery),
            0x05 => Ok(Self::Mbc2),
            0x06 => Ok(Self::Mbc2Battery),
            0x0f => Ok(Self::Mbc3TimerBattery),
            0x10 => Ok(Self::Mbc3TimerRamBattery),
            0x11 => Ok(Self::Mbc3),
            0x12 => Ok(Self::Mbc3Ram),
            0x13 => Ok(Self::Mbc3RamBattery),
            0x19 => Ok(Self::Mbc5),
            0x1a => Ok(Self::Mbc5Ram),
            0x1b => Ok(Self::Mbc5RamBattery),
            value => Err(value),
        }
    }
}

/// Mapper register file. The variant set is small and closed, so a sum type
/// with offset accessors replaces a trait-object hierarchy.
#[derive(Clone, Debug)]
pub enum Mapper {
    None,
    Mbc1 {
        ram_enabled: bool,
        rom_bank: u8,
        // 2-bit register: upper ROM bank bits or the RAM bank, depending on
        // the banking mode
        upper_bank: u8,
        advanced: bool,
    },
    Mbc2 {
        ram_enabled: bool,
        rom_bank: u8,
    },
    Mbc3 {
        ram_enabled: bool,
        rom_bank: u8,
        // 0-3 selects a RAM bank, 0x08-0x0c selects an (unmodeled) RTC
        // register
        ram_bank: u8,
    },
    Mbc5 {
        ram_enabled: bool,
        rom_bank: u16,
        ram_bank: u8,
    },
}

impl Mapper {
    pub fn for_type(cartridge_type: CartridgeType) -> Self {
        use CartridgeType::*;
        match cartridge_type {
            RomOnly => Mapper::None,
            Mbc1 | Mbc1Ram | Mbc1RamBattery => Mapper::Mbc1 {
                ram_enabled: false,
                rom_bank: 0,
                upper_bank: 0,
                advanced: false,
            },
            Mbc2 | Mbc2Battery => Mapper::Mbc2 {
                ram_enabled: false,
                rom_bank: 1,
            },
            Mbc3TimerBattery | Mbc3TimerRamBattery | Mbc3 | Mbc3Ram | Mbc3RamBattery => {
                Mapper::Mbc3 {
                    ram_enabled: false,
                    rom_bank: 1,
                    ram_bank: 0,
                }
            }
            Mbc5 | Mbc5Ram | Mbc5RamBattery => Mapper::Mbc5 {
                ram_enabled: false,
                rom_bank: 1,
                ram_bank: 0,
            },
        }
    }

    pub fn has_internal_ram(&self) -> bool {
        matches!(self, Mapper::Mbc2 { .. })
    }

    pub fn ram_enabled(&self) -> bool {
        match *self {
            Mapper::None => false,
            Mapper::Mbc1 { ram_enabled, .. }
            | Mapper::Mbc2 { ram_enabled, .. }
            | Mapper::Mbc3 { ram_enabled, .. }
            | Mapper::Mbc5 { ram_enabled, .. } => ram_enabled,
        }
    }

    /// Writes to 0x0000-0x7fff are mapper register writes.
    pub fn write_register(&mut self, address: u16, value: u8) {
        match self {
            Mapper::None => {}
            Mapper::Mbc1 {
                ram_enabled,
                rom_bank,
                upper_bank,
                advanced,
            } => match address {
                0x0000..0x2000 => *ram_enabled = value & 0x0f == 0x0a,
                0x2000..0x4000 => *rom_bank = value & 0x1f,
                0x4000..0x6000 => *upper_bank = value & 0x03,
                _ => *advanced = value & 1 != 0,
            },
            Mapper::Mbc2 {
                ram_enabled,
                rom_bank,
            } => {
                // one register region; address bit 8 picks the function
                if address < 0x4000 {
                    if address & 0x100 == 0 {
                        *ram_enabled = value & 0x0f == 0x0a;
                    } else {
                        *rom_bank = (value & 0x0f).max(1);
                    }
                }
            }
            Mapper::Mbc3 {
                ram_enabled,
                rom_bank,
                ram_bank,
            } => match address {
                0x0000..0x2000 => *ram_enabled = value & 0x0f == 0x0a,
                0x2000..0x4000 => *rom_bank = (value & 0x7f).max(1),
                0x4000..0x6000 => *ram_bank = value & 0x0f,
                // 0x6000-0x7fff is the RTC latch; there is no clock to latch
                _ => {}
            },
            Mapper::Mbc5 {
                ram_enabled,
                rom_bank,
                ram_bank,
            } => match address {
                0x0000..0x2000 => *ram_enabled = value & 0x0f == 0x0a,
                0x2000..0x3000 => *rom_bank = (*rom_bank & 0x100) | u16::from(value),
                // bank 0 is selectable on MBC5, no promotion to 1
                0x3000..0x4000 => *rom_bank = (u16::from(value & 1) << 8) | (*rom_bank & 0xff),
                0x4000..0x6000 => *ram_bank = value & 0x0f,
                _ => {}
            },
        }
    }

    /// ROM offset of the 0x0000-0x3fff window. Always bank 0 except in MBC1
    /// advanced banking mode, where the 2-bit register supplies bits 5-6.
    pub fn rom_low_offset(&self, rom_bank_count: u16) -> usize {
        match *self {
            Mapper::Mbc1 {
                upper_bank,
                advanced: true,
                ..
            } => usize::from((u16::from(upper_bank) << 5) % rom_bank_count) * ROM_BANK_SIZE,
            _ => 0,
        }
    }

    /// ROM offset of the switchable 0x4000-0x7fff window, modulo the bank
    /// count of the actual ROM.
    pub fn rom_high_offset(&self, rom_bank_count: u16) -> usize {
        let bank = match *self {
            Mapper::None => 1,
            Mapper::Mbc1 {
                rom_bank,
                upper_bank,
                ..
            } => (u16::from(upper_bank) << 5) | u16::from(rom_bank.max(1)),
            Mapper::Mbc2 { rom_bank, .. } => u16::from(rom_bank),
            Mapper::Mbc3 { rom_bank, .. } => u16::from(rom_bank),
            Mapper::Mbc5 { rom_bank, .. } => rom_bank,
        };
        usize::from(bank % rom_bank_count) * ROM_BANK_SIZE
    }

    /// Offset into external RAM of the 0xa000-0xbfff window, or `None` when
    /// nothing is mapped there (RTC selected, no RAM).
    pub fn ram_offset(&self, ram_bank_count: u8) -> Option<usize> {
        if ram_bank_count == 0 && !self.has_internal_ram() {
            return None;
        }
        let bank = match *self {
            Mapper::None => return None,
            Mapper::Mbc1 {
                upper_bank,
                advanced,
                ..
            } => {
                if advanced {
                    upper_bank % ram_bank_count.max(1)
                } else {
                    0
                }
            }
            Mapper::Mbc2 { .. } => 0,
            Mapper::Mbc3 { ram_bank, .. } => {
                if ram_bank >= 4 {
                    return None; // RTC register select
                }
                ram_bank % ram_bank_count.max(1)
            }
            Mapper::Mbc5 { ram_bank, .. } => ram_bank % ram_bank_count.max(1),
        };
        Some(usize::from(bank) * RAM_BANK_SIZE)
    }
}
