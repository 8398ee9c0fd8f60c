use core::{fmt, ops::Deref};

use crate::mbc::{CartridgeType, MAX_RAM_BANKS, MBC2_RAM_SIZE, Mapper, RAM_BANK_SIZE};

pub const BOOT_ROM_SIZE: usize = 0x100;

// Open-source DMG boot ROM, from https://github.com/Ashiepaws/Bootix
pub const BOOT_ROM: [u8; BOOT_ROM_SIZE] = [
    49, 254, 255, 33, 255, 159, 175, 50, 203, 124, 32, 250, 14, 17, 33, 38, 255, 62, 128, 50, 226,
    12, 62, 243, 50, 226, 12, 62, 119, 50, 226, 17, 4, 1, 33, 16, 128, 26, 205, 184, 0, 26, 203,
    55, 205, 184, 0, 19, 123, 254, 52, 32, 240, 17, 204, 0, 6, 8, 26, 19, 34, 35, 5, 32, 249, 33,
    4, 153, 1, 12, 1, 205, 177, 0, 62, 25, 119, 33, 36, 153, 14, 12, 205, 177, 0, 62, 145, 224, 64,
    6, 16, 17, 212, 0, 120, 224, 67, 5, 123, 254, 216, 40, 4, 26, 224, 71, 19, 14, 28, 205, 167, 0,
    175, 144, 224, 67, 5, 14, 28, 205, 167, 0, 175, 176, 32, 224, 224, 67, 62, 131, 205, 159, 0,
    14, 39, 205, 167, 0, 62, 193, 205, 159, 0, 17, 138, 1, 240, 68, 254, 144, 32, 250, 27, 122,
    179, 32, 245, 24, 73, 14, 19, 226, 12, 62, 135, 226, 201, 240, 68, 254, 144, 32, 250, 13, 32,
    247, 201, 120, 34, 4, 13, 32, 250, 201, 71, 14, 4, 175, 197, 203, 16, 23, 193, 203, 16, 23, 13,
    32, 245, 34, 35, 34, 35, 201, 60, 66, 185, 165, 185, 165, 66, 60, 0, 84, 168, 252, 66, 79, 79,
    84, 73, 88, 46, 68, 77, 71, 32, 118, 49, 46, 50, 0, 62, 255, 198, 1, 11, 30, 216, 33, 77, 1, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 62, 1, 224, 80,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    /// Shorter than the two mandatory 16 KiB banks.
    TooShort(usize),
    /// Not a multiple of the 16 KiB bank size.
    SizeNotBankMultiple(usize),
    /// Cartridge type byte names a mapper this emulator does not implement.
    UnsupportedMapper(u8),
    BadRamSizeCode(u8),
    /// A substituted boot ROM image must be exactly 256 bytes.
    BadBootRomSize(usize),
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort(len) => write!(f, "ROM is {len} bytes, smaller than two banks"),
            Self::SizeNotBankMultiple(len) => {
                write!(f, "ROM size {len} is not a multiple of 16 KiB")
            }
            Self::UnsupportedMapper(value) => write!(f, "unsupported cartridge type 0x{value:02x}"),
            Self::BadRamSizeCode(value) => write!(f, "invalid RAM size code 0x{value:02x}"),
            Self::BadBootRomSize(len) => write!(f, "boot ROM is {len} bytes, expected 256"),
        }
    }
}

impl core::error::Error for CartridgeError {}

/// Parsed view of the header at 0x100.
/// https://gbdev.io/pandocs/The_Cartridge_Header.html
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub title: [u8; 15],
    pub cgb_flag: u8,
    pub new_licensee_code: [u8; 2],
    pub sgb_flag: u8,
    pub cartridge_type: u8,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub destination_code: u8,
    pub old_licensee_code: u8,
    pub version: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
}

impl Header {
    pub fn parse(rom: &[u8]) -> Option<Self> {
        if rom.len() < 0x150 {
            return None;
        }
        Some(Self {
            title: rom[0x134..0x143].try_into().unwrap(),
            cgb_flag: rom[0x143],
            new_licensee_code: [rom[0x144], rom[0x145]],
            sgb_flag: rom[0x146],
            cartridge_type: rom[0x147],
            rom_size_code: rom[0x148],
            ram_size_code: rom[0x149],
            destination_code: rom[0x14a],
            old_licensee_code: rom[0x14b],
            version: rom[0x14c],
            header_checksum: rom[0x14d],
            global_checksum: u16::from_be_bytes([rom[0x14e], rom[0x14f]]),
        })
    }

    pub fn title(&self) -> &str {
        let end = self.title.iter().position(|&b| b == 0).unwrap_or(15);
        core::str::from_utf8(&self.title[..end]).unwrap_or("")
    }

    /// `sum(-rom[a] - 1) for a in 0x134..=0x14c`, low byte.
    pub fn checksum_matches(rom: &[u8]) -> bool {
        let mut checksum = 0u8;
        for &byte in &rom[0x134..=0x14c] {
            checksum = checksum.wrapping_sub(byte).wrapping_sub(1);
        }
        checksum == rom[0x14d]
    }

    fn ram_bank_count(&self) -> Result<u8, CartridgeError> {
        match self.ram_size_code {
            0x00 | 0x01 => Ok(0),
            0x02 => Ok(1),
            0x03 => Ok(4),
            0x04 => Ok(16),
            0x05 => Ok(8),
            code => Err(CartridgeError::BadRamSizeCode(code)),
        }
    }
}

/// ROM image plus mapper state, external RAM and the boot ROM shadow.
#[derive(Clone)]
pub struct Cartridge<R> {
    rom: R,
    ram: [u8; MAX_RAM_BANKS * RAM_BANK_SIZE],
    mapper: Mapper,
    header: Header,
    cartridge_type: CartridgeType,
    rom_bank_count: u16,
    ram_bank_count: u8,
    dirty: bool,
    boot_rom: [u8; BOOT_ROM_SIZE],
    boot_rom_enabled: bool,
}

impl<R: Deref<Target = [u8]>> Cartridge<R> {
    pub fn new(rom: R) -> Result<Self, CartridgeError> {
        if rom.len() < 0x8000 {
            return Err(CartridgeError::TooShort(rom.len()));
        }
        if !rom.len().is_multiple_of(0x4000) {
            return Err(CartridgeError::SizeNotBankMultiple(rom.len()));
        }
        let header = Header::parse(&rom).ok_or(CartridgeError::TooShort(rom.len()))?;
        let cartridge_type = CartridgeType::try_from(header.cartridge_type)
            .map_err(CartridgeError::UnsupportedMapper)?;
        let ram_bank_count = header.ram_bank_count()?;
        let rom_bank_count = u16::try_from(rom.len() / 0x4000).unwrap_or(u16::MAX);

        log::info!(
            "loaded \"{}\" ({cartridge_type:?}, {rom_bank_count} ROM banks, {ram_bank_count} RAM banks, v{}, checksum {})",
            header.title(),
            header.version,
            if Header::checksum_matches(&rom) {
                "ok"
            } else {
                "BAD"
            },
        );

        Ok(Self {
            mapper: Mapper::for_type(cartridge_type),
            rom,
            ram: [0; MAX_RAM_BANKS * RAM_BANK_SIZE],
            header,
            cartridge_type,
            rom_bank_count,
            ram_bank_count,
            dirty: false,
            boot_rom: BOOT_ROM,
            boot_rom_enabled: true,
        })
    }

    /// Substitutes another 256-byte boot ROM image for the built-in one.
    pub fn with_boot_rom(mut self, image: &[u8]) -> Result<Self, CartridgeError> {
        self.boot_rom = image
            .try_into()
            .map_err(|_| CartridgeError::BadBootRomSize(image.len()))?;
        Ok(self)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn cartridge_type(&self) -> CartridgeType {
        self.cartridge_type
    }

    pub fn battery_backed(&self) -> bool {
        self.cartridge_type.has_battery()
    }

    pub fn boot_rom_enabled(&self) -> bool {
        self.boot_rom_enabled
    }

    /// One-way: once unmapped the boot ROM never comes back.
    pub fn disable_boot_rom(&mut self) {
        self.boot_rom_enabled = false;
    }

    pub fn read(&self, address: u16) -> u8 {
        match address {
            0x0000..0x0100 if self.boot_rom_enabled => self.boot_rom[usize::from(address)],
            0x0000..0x4000 => {
                let offset = self.mapper.rom_low_offset(self.rom_bank_count);
                self.rom
                    .get(offset + usize::from(address))
                    .copied()
                    .unwrap_or(0xff)
            }
            0x4000..0x8000 => {
                let offset = self.mapper.rom_high_offset(self.rom_bank_count);
                self.rom
                    .get(offset + usize::from(address - 0x4000))
                    .copied()
                    .unwrap_or(0xff)
            }
            0xa000..0xc000 => {
                if !self.mapper.ram_enabled() {
                    return 0xff;
                }
                if self.mapper.has_internal_ram() {
                    // 512 half-bytes, echoed through the whole window
                    return self.ram[usize::from(address) & 0x1ff] | 0xf0;
                }
                match self.mapper.ram_offset(self.ram_bank_count) {
                    Some(offset) => self.ram[offset + usize::from(address - 0xa000)],
                    None => 0xff,
                }
            }
            _ => 0xff,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..0x0100 if self.boot_rom_enabled => {}
            0x0000..0x8000 => self.mapper.write_register(address, value),
            0xa000..0xc000 => {
                if !self.mapper.ram_enabled() {
                    return;
                }
                if self.mapper.has_internal_ram() {
                    self.ram[usize::from(address) & 0x1ff] = value & 0x0f;
                } else {
                    match self.mapper.ram_offset(self.ram_bank_count) {
                        Some(offset) => self.ram[offset + usize::from(address - 0xa000)] = value,
                        None => return,
                    }
                }
                if self.battery_backed() {
                    self.dirty = true;
                }
            }
            _ => {}
        }
    }

    /// The battery-backed portion of RAM in save-file layout: the 512
    /// internal bytes for MBC2, otherwise all external banks back to back.
    pub fn save_ram(&self) -> &[u8] {
        if self.mapper.has_internal_ram() {
            &self.ram[..MBC2_RAM_SIZE]
        } else {
            &self.ram[..usize::from(self.ram_bank_count) * RAM_BANK_SIZE]
        }
    }

    pub fn load_save_ram(&mut self, data: &[u8]) {
        let len = data.len().min(self.ram.len());
        self.ram[..len].copy_from_slice(&data[..len]);
        self.dirty = false;
    }

    /// True once since the last call if a battery-backed write happened.
    pub fn take_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.dirty, false)
    }
}
