//! Header configuration: PRG/CHR bank counts, mapper, mirroring, and the
//! entry-point label name. Mutated both by CLI flags and by
//! preprocessor directives; whichever runs last wins, matching the
//! original's global-variable precedence.

#[derive(Debug, Clone)]
pub struct HeaderConfig {
    pub prg_rom_size: u8,
    pub chr_rom_size: u8,
    pub mapper: u16,
    pub mirroring: bool,
    pub battery_backed: bool,
    pub trainer: bool,
    pub entry_point: String,
    pub text_pc: u16,
    pub data_pc: u16,
    pub chr_bin_taken: bool,
}

impl Default for HeaderConfig {
    fn default() -> HeaderConfig {
        HeaderConfig {
            prg_rom_size: 1,
            chr_rom_size: 1,
            mapper: 0,
            mirroring: false,
            battery_backed: false,
            trainer: false,
            entry_point: "_main".to_string(),
            text_pc: 0xC000,
            data_pc: 0,
            chr_bin_taken: false,
        }
    }
}

impl HeaderConfig {
    pub fn prg_capacity(&self) -> usize {
        0x4000 * self.prg_rom_size as usize
    }

    pub fn chr_capacity(&self) -> usize {
        0x2000 * self.chr_rom_size as usize
    }
}
