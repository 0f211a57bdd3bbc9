//! iNES container writer: a 16-byte header followed by the
//! PRG and CHR banks. PRG holds the TEXT section only, addressed from
//! `header.text_pc`. CHR holds the DATA/RODATA buffer — `.data`/`.rodata`
//! bytes followed by (or interleaved with, in source order) any
//! `.chrbin`/`.incbin` content appended into the same buffer — zero-padded
//! to `0x2000 * chr_rom_size`.

use super::Assembler;

const MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];

pub fn write(asm: &Assembler) -> Vec<u8> {
    let mut rom = Vec::with_capacity(16 + asm.header.prg_capacity() + asm.header.chr_capacity());

    rom.extend_from_slice(&MAGIC);
    rom.push(asm.header.prg_rom_size);
    rom.push(asm.header.chr_rom_size);

    let mut flags6 = 0u8;
    if asm.header.mirroring {
        flags6 |= 0x01;
    }
    if asm.header.battery_backed {
        flags6 |= 0x02;
    }
    if asm.header.trainer {
        flags6 |= 0x04;
    }
    flags6 |= ((asm.header.mapper & 0x0F) as u8) << 4;
    rom.push(flags6);

    let flags7 = (((asm.header.mapper >> 4) & 0x0F) as u8) << 4;
    rom.push(flags7);

    rom.extend_from_slice(&[0u8; 8]);

    rom.extend_from_slice(&build_prg(asm));
    rom.extend_from_slice(&build_chr(asm));

    rom
}

fn build_prg(asm: &Assembler) -> Vec<u8> {
    let capacity = asm.header.prg_capacity();
    let mut prg = vec![0u8; capacity];

    let text = &asm.sections.text.bytes;
    let text_len = text.len().min(capacity);
    prg[..text_len].copy_from_slice(&text[..text_len]);

    prg
}

fn build_chr(asm: &Assembler) -> Vec<u8> {
    let capacity = asm.header.chr_capacity();
    let mut chr = asm.sections.data.bytes.clone();
    chr.resize(capacity, 0);
    chr
}
