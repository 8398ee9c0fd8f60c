use dotmatrix_core::{Emulator, cartridge::Cartridge};

/// Builds a 64 KiB MBC-less ROM image with a valid header, `JP 0x0150` at
/// the entry point and `program` at 0x150.
pub fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 4 * 0x4000];
    rom[0x100] = 0xc3; // JP 0x0150
    rom[0x101] = 0x50;
    rom[0x102] = 0x01;
    rom[0x134..0x13a].copy_from_slice(b"DOTMTX");
    rom[0x148] = 0x01;
    let mut checksum = 0u8;
    for &byte in &rom[0x134..=0x14c] {
        checksum = checksum.wrapping_sub(byte).wrapping_sub(1);
    }
    rom[0x14d] = checksum;
    rom[0x150..0x150 + program.len()].copy_from_slice(program);
    rom
}

/// A ROM with extra byte runs placed at fixed offsets (interrupt vectors
/// and the like). The header checksum is fixed up afterwards.
pub fn rom_with_sections(program: &[u8], sections: &[(usize, &[u8])]) -> Vec<u8> {
    let mut rom = rom_with_program(program);
    for (offset, bytes) in sections {
        rom[*offset..offset + bytes.len()].copy_from_slice(bytes);
    }
    rom
}

pub fn boot(rom: Vec<u8>) -> Emulator<Vec<u8>> {
    let mut emulator = Emulator::new(Cartridge::new(rom).unwrap());
    emulator.skip_boot_rom();
    emulator
}
