//! Preprocessor: handles the closed set of directives —
//! section switches, include, header configuration, and origin control.

use super::include::SourceBuffer;
use super::scanner::{self, LineEvent};
use super::section::Section;
use super::symbol::{Symbol, SymbolKind};
use super::Assembler;
use crate::error::Error;
use crate::logging;

/// True once the directive name itself has been scanned — mirrors the
/// scanner's `fast_skip` gate, since a directive's arguments
/// only become legal to scan after its name token.
fn next_arg(asm: &mut Assembler, fast_skip: bool) -> Option<Symbol> {
    loop {
        match scanner::next_event(asm.include_stack.current(), fast_skip, &mut asm.diagnostics) {
            LineEvent::Symbol(sym) if sym.kind != SymbolKind::None => return Some(sym),
            LineEvent::Symbol(_) => continue,
            LineEvent::EndOfLine | LineEvent::EndOfFile => return None,
        }
    }
}

fn numeric_arg(sym: &Symbol) -> Option<u32> {
    match sym.kind {
        SymbolKind::ZeroPage | SymbolKind::Absolute => sym.number(),
        SymbolKind::Digit => sym.number(),
        _ => None,
    }
}

/// Try to dispatch the current line as a directive. Returns `true` if the
/// line started with `.` (whether or not the directive itself was valid).
pub fn try_process(asm: &mut Assembler) -> bool {
    let buf = asm.include_stack.current();
    if buf.peek() != b'.' {
        return false;
    }
    buf.advance();

    let (file, line) = asm.include_stack.current_location();
    let (file, line) = (file.to_string(), line);

    let name = match next_arg(asm, false) {
        Some(sym) if sym.kind == SymbolKind::Token => sym.text,
        _ => {
            asm.diagnostics.report(Error::UnknownDirective { file, line, name: String::new() });
            discard_line(asm);
            return true;
        }
    };

    match name.as_str() {
        "include" | "import" | "inc" => directive_include(asm, &file, line),
        "prgsize" => directive_prgsize(asm, &file, line),
        "chrsize" => directive_chrsize(asm, &file, line),
        "chrbin" | "incbin" => directive_chrbin(asm, &file, line),
        "horizontal" => asm.header.mirroring = false,
        "vertical" => asm.header.mirroring = true,
        "battery" => asm.header.battery_backed = true,
        "trainer" => asm.header.trainer = true,
        "reloc" => directive_reloc(asm, &file, line),
        "nrom16" => {
            asm.header.mapper = 0;
            asm.header.text_pc = 0xC000;
            asm.header.data_pc = 0x2000;
            asm.sections.text.pc = 0xC000;
            asm.sections.data.pc = 0x2000;
        }
        "nrom32" => {
            asm.header.mapper = 0;
            asm.header.text_pc = 0x8000;
            asm.header.data_pc = 0x2000;
            asm.sections.text.pc = 0x8000;
            asm.sections.data.pc = 0x2000;
        }
        "org" => directive_org(asm, &file, line),
        "mapper" => directive_mapper(asm, &file, line),
        "nes" => logging::warn_note(&file, line, "processor selection acknowledged"),
        "text" => asm.sections.active = Section::Text,
        "data" => asm.sections.active = Section::Data,
        "rodata" => asm.sections.active = Section::RoData,
        other => {
            asm.diagnostics.report(Error::UnknownDirective { file: file.clone(), line, name: other.to_string() });
            discard_line(asm);
        }
    }

    true
}

fn discard_line(asm: &mut Assembler) {
    loop {
        match scanner::next_event(asm.include_stack.current(), true, &mut asm.diagnostics) {
            LineEvent::EndOfLine | LineEvent::EndOfFile => break,
            LineEvent::Symbol(_) => continue,
        }
    }
}

fn directive_include(asm: &mut Assembler, file: &str, line: u32) {
    let path = match next_arg(asm, true) {
        Some(sym) if sym.kind == SymbolKind::String => sym.text,
        _ => {
            asm.diagnostics.report(Error::BadDirectiveArgument {
                file: file.to_string(),
                line,
                directive: "include".to_string(),
                reason: "expected a string".to_string(),
            });
            return;
        }
    };

    match asm.load_include(&path) {
        Ok(bytes) => {
            let buf = SourceBuffer::new(path, bytes);
            asm.include_stack.push(buf, &mut asm.diagnostics);
        }
        Err(_) => asm.diagnostics.report(Error::FileNotFound { path }),
    }
}

fn directive_prgsize(asm: &mut Assembler, file: &str, line: u32) {
    let value = match next_arg(asm, true).as_ref().and_then(numeric_arg) {
        Some(v) => v,
        None => {
            asm.diagnostics.report(Error::BadDirectiveArgument {
                file: file.to_string(),
                line,
                directive: "prgsize".to_string(),
                reason: "expected $oooo format or digit".to_string(),
            });
            return;
        }
    };
    asm.header.prg_rom_size = value as u8;
    if asm.header.prg_rom_size == 0 {
        logging::warn_note(file, line, "prg size set to defaults to 1");
        asm.header.prg_rom_size = 1;
    }
}

fn directive_chrsize(asm: &mut Assembler, file: &str, line: u32) {
    let value = match next_arg(asm, true).as_ref().and_then(numeric_arg) {
        Some(v) => v,
        None => {
            asm.diagnostics.report(Error::BadDirectiveArgument {
                file: file.to_string(),
                line,
                directive: "chrsize".to_string(),
                reason: "expected $oooo format or digit".to_string(),
            });
            return;
        }
    };
    asm.header.chr_rom_size = value as u8;
    if asm.header.chr_rom_size == 0 {
        logging::warn_note(file, line, "using CHR-RAM");
    }
}

fn directive_chrbin(asm: &mut Assembler, file: &str, line: u32) {
    if asm.header.chr_rom_size == 0 {
        logging::warn_note(file, line, "couldn't include binary file since CHR-ROM size is 0");
        discard_line(asm);
        return;
    }

    let path = match next_arg(asm, true) {
        Some(sym) if sym.kind == SymbolKind::String => sym.text,
        _ => {
            asm.diagnostics.report(Error::BadDirectiveArgument {
                file: file.to_string(),
                line,
                directive: "chrbin".to_string(),
                reason: "expected a string".to_string(),
            });
            return;
        }
    };

    if asm.header.chr_bin_taken {
        logging::warn_note(file, line, "already taken binary data");
        return;
    }

    let bytes = match asm.load_include(&path) {
        Ok(bytes) => bytes,
        Err(_) => {
            asm.diagnostics.report(Error::FileNotFound { path });
            return;
        }
    };

    let expected = asm.header.chr_capacity();
    if bytes.len() != expected {
        asm.diagnostics.report(Error::ChrSizeMismatch { expected, actual: bytes.len() });
    }
    asm.sections.data.extend(&bytes);
    asm.header.chr_bin_taken = true;
}

fn directive_reloc(asm: &mut Assembler, file: &str, line: u32) {
    match next_arg(asm, true) {
        Some(sym) if sym.kind == SymbolKind::String => asm.header.entry_point = sym.text,
        _ => {
            asm.diagnostics.report(Error::BadDirectiveArgument {
                file: file.to_string(),
                line,
                directive: "reloc".to_string(),
                reason: "expected a string".to_string(),
            });
        }
    }
}

fn directive_org(asm: &mut Assembler, file: &str, line: u32) {
    match next_arg(asm, true) {
        Some(sym) if sym.kind == SymbolKind::Token && sym.text == "old" => {
            asm.sections.text.pc = asm.oldpc;
        }
        Some(sym) if numeric_arg(&sym).is_some() => {
            asm.oldpc = asm.sections.text.pc;
            asm.sections.text.pc = numeric_arg(&sym).unwrap() as u16;
        }
        _ => {
            asm.diagnostics.report(Error::BadDirectiveArgument {
                file: file.to_string(),
                line,
                directive: "org".to_string(),
                reason: "expected $oooo format".to_string(),
            });
        }
    }
}

fn directive_mapper(asm: &mut Assembler, file: &str, line: u32) {
    let value = match next_arg(asm, true).as_ref().and_then(numeric_arg) {
        Some(v) => v,
        None => {
            asm.diagnostics.report(Error::BadDirectiveArgument {
                file: file.to_string(),
                line,
                directive: "mapper".to_string(),
                reason: "expected $oo format".to_string(),
            });
            return;
        }
    };
    asm.header.mapper = value as u16;
    if asm.header.mapper != 0 {
        asm.diagnostics.report(Error::UnsupportedMapper { mapper: asm.header.mapper });
    }
}

#[cfg(test)]
mod tests {
    use super::super::Assembler;

    fn run(src: &str) -> Assembler {
        let mut asm = Assembler::new("test.s", src.as_bytes().to_vec());
        loop {
            super::super::line::assemble_line(&mut asm);
            if asm.include_stack.current_ref().at_end() {
                break;
            }
        }
        asm
    }

    #[test]
    fn nrom16_sets_mapper_and_pcs() {
        let asm = run(".nrom16\n");
        assert_eq!(asm.header.mapper, 0);
        assert_eq!(asm.header.text_pc, 0xC000);
        assert_eq!(asm.sections.text.pc, 0xC000);
        assert_eq!(asm.sections.data.pc, 0x2000);
    }

    #[test]
    fn nrom32_sets_mapper_and_pcs() {
        let asm = run(".nrom32\n");
        assert_eq!(asm.header.text_pc, 0x8000);
        assert_eq!(asm.sections.text.pc, 0x8000);
    }

    #[test]
    fn prgsize_zero_resets_to_one_with_warning() {
        let asm = run(".prgsize $00\n");
        assert_eq!(asm.header.prg_rom_size, 1);
        assert_eq!(asm.diagnostics.error_count(), 0);
    }

    #[test]
    fn chrsize_zero_is_chr_ram_warning_only() {
        let asm = run(".chrsize $00\n");
        assert_eq!(asm.header.chr_rom_size, 0);
        assert_eq!(asm.diagnostics.error_count(), 0);
    }

    #[test]
    fn mapper_nonzero_warns_unsupported() {
        let asm = run(".mapper $01\n");
        assert_eq!(asm.header.mapper, 1);
        assert_eq!(asm.diagnostics.error_count(), 0);
        assert_eq!(asm.diagnostics.warning_count(), 1);
    }

    #[test]
    fn org_save_and_restore() {
        let asm = run(".org $8000\n.org old\n");
        assert_eq!(asm.sections.text.pc, 0xC000);
    }

    #[test]
    fn unknown_directive_is_an_error() {
        let asm = run(".bogus\n");
        assert_eq!(asm.diagnostics.error_count(), 1);
    }

    #[test]
    fn section_switches() {
        let asm = run(".data\n");
        assert_eq!(asm.sections.active, super::super::section::Section::Data);
        let asm = run(".rodata\n");
        assert_eq!(asm.sections.active, super::super::section::Section::RoData);
        let asm = run(".text\n");
        assert_eq!(asm.sections.active, super::super::section::Section::Text);
    }

    #[test]
    fn battery_and_trainer_flags() {
        let asm = run(".battery\n.trainer\n");
        assert!(asm.header.battery_backed);
        assert!(asm.header.trainer);
    }
}
