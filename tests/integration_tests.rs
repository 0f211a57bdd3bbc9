use nesasm::assembler::{self, Assembly};

/// Run the full pipeline, asserting no errors were reported.
fn assemble_ok(source: &str) -> Vec<u8> {
    let Assembly { rom, diagnostics } = assembler::assemble("test.s", source.as_bytes().to_vec());
    assert_eq!(diagnostics.error_count(), 0, "unexpected assembly errors");
    rom.expect("assembly reported success but produced no ROM")
}

#[test]
fn minimal_rom() {
    let rom = assemble_ok(".nrom16\n.text\n_main:\n  rts\n");
    assert_eq!(
        &rom[0..16],
        &[0x4E, 0x45, 0x53, 0x1A, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(rom[16], 0x60);
    assert!(rom[17..16 + 0x4000].iter().all(|&b| b == 0));
    // Default chr_rom_size is 1 (spec.md §3 initial state), so a zeroed
    // CHR bank is still present in the output per the length formula.
    assert_eq!(rom.len(), 16 + 0x4000 + 0x2000);
}

#[test]
fn lda_immediate() {
    let rom = assemble_ok(".nrom16\n.text\n_main:\n  lda #$42\n  rts\n");
    assert_eq!(&rom[16..19], &[0xA9, 0x42, 0x60]);
}

#[test]
fn forward_jump_backpatches_little_endian() {
    let rom = assemble_ok(".nrom16\n.text\n_main:\n  jmp foo\n  nop\n foo:\n  rts\n");
    assert_eq!(&rom[16..21], &[0x4C, 0x04, 0xC0, 0xEA, 0x60]);
}

#[test]
fn zero_page_vs_absolute_distinction() {
    let rom = assemble_ok(".nrom16\n.text\n_main:\n  lda $05\n  rts\n");
    assert_eq!(&rom[16..18], &[0xA5, 0x05]);

    let rom = assemble_ok(".nrom16\n.text\n_main:\n  lda $0105\n  rts\n");
    assert_eq!(&rom[16..19], &[0xAD, 0x05, 0x01]);
}

#[test]
fn indirect_indexed_and_indexed_indirect() {
    let rom = assemble_ok(".nrom16\n.text\n_main:\n  lda ($20),Y\n  rts\n");
    assert_eq!(&rom[16..18], &[0xB1, 0x20]);

    let rom = assemble_ok(".nrom16\n.text\n_main:\n  lda ($20,X)\n  rts\n");
    assert_eq!(&rom[16..18], &[0xA1, 0x20]);
}

#[test]
fn data_section_appends_bytes_without_terminator() {
    let rom = assemble_ok(
        ".nrom16\n.text\n_main:\n  rts\n.data\n  byte \"AB\", $01\n",
    );
    // DATA/RODATA bytes land in the CHR bank, right after the full PRG image.
    let chr_base = 16 + 0x4000;
    assert_eq!(&rom[chr_base..chr_base + 3], &[0x41, 0x42, 0x01]);
}

#[test]
fn rodata_section_appends_terminating_nul() {
    let rom = assemble_ok(
        ".nrom16\n.text\n_main:\n  rts\n.rodata\n  byte \"AB\", $01\n",
    );
    let chr_base = 16 + 0x4000;
    assert_eq!(&rom[chr_base..chr_base + 4], &[0x41, 0x42, 0x01, 0x00]);
}

#[test]
fn branch_within_range_resolves_to_signed_offset() {
    let rom = assemble_ok(".nrom16\n.text\n_main:\n  bne skip\n  nop\n skip:\n  rts\n");
    assert_eq!(rom[16], 0xD0);
    assert_eq!(rom[17] as i8, 1);
}

#[test]
fn duplicate_label_is_reported() {
    let Assembly { diagnostics, .. } = assembler::assemble(
        "test.s",
        ".nrom16\n.text\n_main:\n  rts\nfoo:\n  nop\nfoo:\n  nop\n".as_bytes().to_vec(),
    );
    assert!(diagnostics.error_count() > 0);
}

#[test]
fn undefined_reference_is_reported() {
    let Assembly { diagnostics, rom } = assembler::assemble(
        "test.s",
        ".nrom16\n.text\n_main:\n  jmp nowhere\n".as_bytes().to_vec(),
    );
    assert!(diagnostics.error_count() > 0);
    assert!(rom.is_none());
}

#[test]
fn missing_entry_point_is_reported() {
    let Assembly { diagnostics, rom } = assembler::assemble(
        "test.s",
        ".nrom16\n.text\nfoo:\n  rts\n".as_bytes().to_vec(),
    );
    assert!(diagnostics.error_count() > 0);
    assert!(rom.is_none());
}

#[test]
fn chrsize_controls_chr_bank_output() {
    let rom = assemble_ok(".nrom16\n.chrsize $01\n.text\n_main:\n  rts\n");
    assert_eq!(rom.len(), 16 + 0x4000 + 0x2000);
    assert_eq!(rom[5], 1);
}

#[test]
fn zero_chrsize_produces_no_chr_bank() {
    let rom = assemble_ok(".nrom16\n.chrsize $00\n.text\n_main:\n  rts\n");
    assert_eq!(rom.len(), 16 + 0x4000);
    assert_eq!(rom[5], 0);
}

#[test]
fn mirroring_and_battery_and_trainer_flags() {
    let rom = assemble_ok(".nrom16\n.vertical\n.battery\n.trainer\n.text\n_main:\n  rts\n");
    assert_eq!(rom[6], 0b0000_0111);
}

#[test]
fn include_directive_pulls_in_another_source() {
    let Assembly { rom, diagnostics } = assembler::Assembler::with_loader(
        "main.s",
        b".nrom16\n.text\n.include \"inc.s\"\n".to_vec(),
        |path: &str| {
            assert_eq!(path, "inc.s");
            Ok(b"_main:\n  rts\n".to_vec())
        },
    )
    .finish();
    assert_eq!(diagnostics.error_count(), 0);
    let rom = rom.expect("assembly should succeed");
    assert_eq!(rom[16], 0x60);
}

#[test]
fn data_label_address_is_the_data_section_pc() {
    // A label defined in .data must get the DATA section's own PC, not
    // text_pc + DATA PC — verified indirectly by assembling two bytes
    // before the label and confirming the build succeeds with no
    // duplicate-label or addressing errors; the address itself is an
    // internal detail, so this is exercised through the preprocessor
    // unit test instead. Here we check PRG stays code-only: .data bytes
    // must never leak into the PRG image, even at the default DATA_PC (0).
    let rom = assemble_ok(".text\n_main:\n  rts\n.data\n  byte $AA, $BB\n");
    assert_eq!(rom[16], 0x60, "DATA bytes must not overwrite the first PRG byte");
    assert_eq!(rom[17], 0x00);
}

#[test]
fn chrbin_composes_with_data_bytes_in_chr_image() {
    let Assembly { rom, diagnostics } = assembler::Assembler::with_loader(
        "main.s",
        b".nrom16\n.chrsize $01\n.text\n_main:\n  rts\n.data\n  byte $01, $02\n.chrbin \"tiles.chr\"\n"
            .to_vec(),
        |path: &str| {
            assert_eq!(path, "tiles.chr");
            Ok(vec![0xAB; 0x2000 - 2])
        },
    )
    .finish();
    assert_eq!(diagnostics.error_count(), 0);
    let rom = rom.expect("assembly should succeed");
    let chr_base = 16 + 0x4000;
    assert_eq!(&rom[chr_base..chr_base + 2], &[0x01, 0x02]);
    assert_eq!(rom[chr_base + 2], 0xAB);
    assert_eq!(rom.len(), 16 + 0x4000 + 0x2000);
}
