//! Opcode resolver: for each mnemonic, matches the tail symbols against
//! the permitted addressing-mode forms to choose the opcode byte and
//! operand width. Each mnemonic maps to a table of permitted
//! `(mode, opcode, length)` triples, matched against the tail symbol
//! stream, rather than a per-mnemonic conditional ladder.

use super::labels::SymbolTable;
use super::symbol::{Symbol, SymbolKind};
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndirectX,
    IndirectY,
    IndirectAbsolute,
}

/// How an instruction's operand should be resolved after the first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    /// jmp/jsr: substitute the label's address directly, little-endian.
    Absolute,
    /// branch: substitute `addr - (instruction_pc + 2)` as a signed byte.
    Relative,
}

#[derive(Debug, Clone)]
pub struct PendingRef {
    pub label: String,
    pub kind: PendingKind,
    pub file: String,
    pub line: u32,
}

/// An assembled instruction. `operand` is host-order; little-endian
/// conversion happens once, at iNES-write time.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: u8,
    pub len: u8,
    pub operand: u16,
    pub pc: u16,
    pub pending: Option<PendingRef>,
}

enum ParsedOperand {
    Immediate(u16),
    ZeroPage(u8),
    ZeroPageIndexed(u8, char),
    Absolute(u16),
    AbsoluteIndexed(u16, char),
    IndirectX(u8),
    IndirectY(u8),
    IndirectAbsolute(u16),
    Label(String),
}

fn reg_token(sym: &Symbol) -> Option<char> {
    if sym.kind == SymbolKind::Token && (sym.text == "X" || sym.text == "Y") {
        sym.text.chars().next()
    } else {
        None
    }
}

fn is_comma(sym: &Symbol) -> bool {
    sym.kind == SymbolKind::ExtraOperand && sym.text == ","
}

fn bad_form(file: &str, line: u32, mnemonic: &str, reason: impl Into<String>) -> Error {
    Error::BadAddressingForm {
        file: file.to_string(),
        line,
        mnemonic: mnemonic.to_string(),
        reason: reason.into(),
    }
}

fn parse_operand(
    file: &str,
    line: u32,
    mnemonic: &str,
    tail: &[Symbol],
) -> Result<ParsedOperand, Error> {
    if tail.is_empty() {
        return Err(bad_form(file, line, mnemonic, "expected an operand"));
    }

    match tail[0].kind {
        SymbolKind::Immediate => {
            if tail.len() != 1 {
                return Err(bad_form(file, line, mnemonic, "unexpected tokens after immediate operand"));
            }
            let value = tail[0].number().unwrap_or(0) as u16;
            Ok(ParsedOperand::Immediate(value))
        }
        SymbolKind::ZeroPage | SymbolKind::Absolute => {
            let is_zp = tail[0].kind == SymbolKind::ZeroPage;
            let value = tail[0].number().unwrap_or(0) as u16;
            match tail.len() {
                1 => {
                    if is_zp {
                        Ok(ParsedOperand::ZeroPage(value as u8))
                    } else {
                        Ok(ParsedOperand::Absolute(value))
                    }
                }
                3 if is_comma(&tail[1]) => {
                    let reg = reg_token(&tail[2])
                        .ok_or_else(|| Error::ExpectedRegister { file: file.to_string(), line })?;
                    if is_zp {
                        if reg == 'Y' && mnemonic != "ldx" && mnemonic != "stx" {
                            return Err(Error::ExpectedRegister { file: file.to_string(), line });
                        }
                        Ok(ParsedOperand::ZeroPageIndexed(value as u8, reg))
                    } else {
                        Ok(ParsedOperand::AbsoluteIndexed(value, reg))
                    }
                }
                2 => Err(Error::ExpectedComma { file: file.to_string(), line }),
                _ => Err(bad_form(file, line, mnemonic, "unexpected tokens after operand")),
            }
        }
        SymbolKind::IndirectOpen => parse_indirect(file, line, mnemonic, &tail[1..]),
        SymbolKind::Token => {
            if tail.len() != 1 {
                return Err(bad_form(file, line, mnemonic, "unexpected tokens after label operand"));
            }
            Ok(ParsedOperand::Label(tail[0].text.clone()))
        }
        _ => Err(bad_form(file, line, mnemonic, "expected a value, label, or indirect operand")),
    }
}

fn parse_indirect(file: &str, line: u32, mnemonic: &str, rest: &[Symbol]) -> Result<ParsedOperand, Error> {
    if rest.is_empty() || !matches!(rest[0].kind, SymbolKind::ZeroPage | SymbolKind::Absolute) {
        return Err(bad_form(file, line, mnemonic, "expected a value inside parentheses"));
    }
    let value = rest[0].number().unwrap_or(0) as u16;

    if rest.len() >= 2 && rest[1].kind == SymbolKind::IndirectClose {
        // (zp) or (abs) — either indirect-indexed ",Y" or, for jmp, indirect-absolute.
        let after = &rest[2..];
        if after.is_empty() {
            if mnemonic == "jmp" {
                return Ok(ParsedOperand::IndirectAbsolute(value));
            }
            return Err(Error::ExpectedComma { file: file.to_string(), line });
        }
        if after.len() == 2 && is_comma(&after[0]) && after[1].kind == SymbolKind::Token && after[1].text == "Y" {
            return Ok(ParsedOperand::IndirectY(value as u8));
        }
        return Err(bad_form(file, line, mnemonic, "expected ',Y' after '(zp)'"));
    }

    if rest.len() >= 4 && is_comma(&rest[1]) {
        let reg = reg_token(&rest[2]).ok_or_else(|| Error::ExpectedRegister { file: file.to_string(), line })?;
        if reg != 'X' {
            return Err(bad_form(file, line, mnemonic, "expected 'X' register inside indexed-indirect"));
        }
        if rest[3].kind != SymbolKind::IndirectClose {
            return Err(Error::ExpectedCloseParen { file: file.to_string(), line });
        }
        return Ok(ParsedOperand::IndirectX(value as u8));
    }

    Err(Error::ExpectedCloseParen { file: file.to_string(), line })
}

macro_rules! modes {
    ($($mode:ident => $opcode:literal, $len:literal);* $(;)?) => {
        &[$((Mode::$mode, $opcode, $len)),*]
    };
}

/// Mnemonic -> permitted (mode, opcode, length) table for the two-operand
/// instruction families.
fn two_operand_table(mnemonic: &str) -> Option<&'static [(Mode, u8, u8)]> {
    Some(match mnemonic {
        "lda" => modes!(Immediate => 0xA9, 2; ZeroPage => 0xA5, 2; ZeroPageX => 0xB5, 2;
                         Absolute => 0xAD, 3; AbsoluteX => 0xBD, 3; AbsoluteY => 0xB9, 3;
                         IndirectX => 0xA1, 2; IndirectY => 0xB1, 2),
        "sta" => modes!(ZeroPage => 0x85, 2; ZeroPageX => 0x95, 2; Absolute => 0x8D, 3;
                         AbsoluteX => 0x9D, 3; AbsoluteY => 0x99, 3; IndirectX => 0x81, 2;
                         IndirectY => 0x91, 2),
        "ldx" => modes!(Immediate => 0xA2, 2; ZeroPage => 0xA6, 2; ZeroPageY => 0xB6, 2;
                         Absolute => 0xAE, 3; AbsoluteY => 0xBE, 3),
        "ldy" => modes!(Immediate => 0xA0, 2; ZeroPage => 0xA4, 2; ZeroPageX => 0xB4, 2;
                         Absolute => 0xAC, 3; AbsoluteX => 0xBC, 3),
        "stx" => modes!(ZeroPage => 0x86, 2; ZeroPageY => 0x96, 2; Absolute => 0x8E, 3),
        "sty" => modes!(ZeroPage => 0x84, 2; ZeroPageX => 0x94, 2; Absolute => 0x8C, 3),
        "and" => modes!(Immediate => 0x29, 2; ZeroPage => 0x25, 2; ZeroPageX => 0x35, 2;
                         Absolute => 0x2D, 3; AbsoluteX => 0x3D, 3; AbsoluteY => 0x39, 3;
                         IndirectX => 0x21, 2; IndirectY => 0x31, 2),
        "eor" => modes!(Immediate => 0x49, 2; ZeroPage => 0x45, 2; ZeroPageX => 0x55, 2;
                         Absolute => 0x4D, 3; AbsoluteX => 0x5D, 3; AbsoluteY => 0x59, 3;
                         IndirectX => 0x41, 2; IndirectY => 0x51, 2),
        "ora" => modes!(Immediate => 0x09, 2; ZeroPage => 0x05, 2; ZeroPageX => 0x15, 2;
                         Absolute => 0x0D, 3; AbsoluteX => 0x1D, 3; AbsoluteY => 0x19, 3;
                         IndirectX => 0x01, 2; IndirectY => 0x11, 2),
        "adc" => modes!(Immediate => 0x69, 2; ZeroPage => 0x65, 2; ZeroPageX => 0x75, 2;
                         Absolute => 0x6D, 3; AbsoluteX => 0x7D, 3; AbsoluteY => 0x79, 3;
                         IndirectX => 0x61, 2; IndirectY => 0x71, 2),
        "sbc" => modes!(Immediate => 0xE9, 2; ZeroPage => 0xE5, 2; ZeroPageX => 0xF5, 2;
                         Absolute => 0xED, 3; AbsoluteX => 0xFD, 3; AbsoluteY => 0xF9, 3;
                         IndirectX => 0xE1, 2; IndirectY => 0xF1, 2),
        "cmp" => modes!(Immediate => 0xC9, 2; ZeroPage => 0xC5, 2; ZeroPageX => 0xD5, 2;
                         Absolute => 0xCD, 3; AbsoluteX => 0xDD, 3; AbsoluteY => 0xD9, 3;
                         IndirectX => 0xC1, 2; IndirectY => 0xD1, 2),
        "cpx" => modes!(Immediate => 0xE0, 2; ZeroPage => 0xE4, 2; Absolute => 0xEC, 3),
        "cpy" => modes!(Immediate => 0xC0, 2; ZeroPage => 0xC4, 2; Absolute => 0xCC, 3),
        "bit" => modes!(ZeroPage => 0x24, 2; Absolute => 0x2C, 3),
        "inc" => modes!(ZeroPage => 0xE6, 2; ZeroPageX => 0xF6, 2; Absolute => 0xEE, 3; AbsoluteX => 0xFE, 3),
        "dec" => modes!(ZeroPage => 0xC6, 2; ZeroPageX => 0xD6, 2; Absolute => 0xCE, 3; AbsoluteX => 0xDE, 3),
        _ => return None,
    })
}

const IMPLIED_TABLE: &[(&str, u8)] = &[
    ("inx", 0xE8), ("iny", 0xC8), ("dex", 0xCA), ("dey", 0x88),
    ("tax", 0xAA), ("txa", 0x8A), ("tay", 0xA8), ("tya", 0x98),
    ("tsx", 0xBA), ("txs", 0x9A), ("pha", 0x48), ("php", 0x08),
    ("pla", 0x68), ("plp", 0x28), ("clc", 0x18), ("cld", 0xD8),
    ("cli", 0x58), ("clv", 0xB8), ("sec", 0x38), ("sed", 0xF8),
    ("sei", 0x78), ("rti", 0x40), ("rts", 0x60), ("nop", 0xEA),
    ("brk", 0x00), ("syscall", 0x00), ("break", 0x00),
];

const BRANCH_TABLE: &[(&str, u8)] = &[
    ("bcc", 0x90), ("bcs", 0xB0), ("beq", 0xF0), ("bmi", 0x30),
    ("bne", 0xD0), ("bpl", 0x10), ("bvc", 0x50), ("bvs", 0x70),
];

fn mode_of(op: &ParsedOperand) -> Option<Mode> {
    Some(match op {
        ParsedOperand::Immediate(_) => Mode::Immediate,
        ParsedOperand::ZeroPage(_) => Mode::ZeroPage,
        ParsedOperand::ZeroPageIndexed(_, 'X') => Mode::ZeroPageX,
        ParsedOperand::ZeroPageIndexed(_, 'Y') => Mode::ZeroPageY,
        ParsedOperand::ZeroPageIndexed(_, _) => return None,
        ParsedOperand::Absolute(_) => Mode::Absolute,
        ParsedOperand::AbsoluteIndexed(_, 'X') => Mode::AbsoluteX,
        ParsedOperand::AbsoluteIndexed(_, 'Y') => Mode::AbsoluteY,
        ParsedOperand::AbsoluteIndexed(_, _) => return None,
        ParsedOperand::IndirectX(_) => Mode::IndirectX,
        ParsedOperand::IndirectY(_) => Mode::IndirectY,
        ParsedOperand::IndirectAbsolute(_) => Mode::IndirectAbsolute,
        ParsedOperand::Label(_) => return None,
    })
}

fn operand_value(op: &ParsedOperand) -> u16 {
    match *op {
        ParsedOperand::Immediate(v) => v,
        ParsedOperand::ZeroPage(v) => v as u16,
        ParsedOperand::ZeroPageIndexed(v, _) => v as u16,
        ParsedOperand::Absolute(v) => v,
        ParsedOperand::AbsoluteIndexed(v, _) => v,
        ParsedOperand::IndirectX(v) => v as u16,
        ParsedOperand::IndirectY(v) => v as u16,
        ParsedOperand::IndirectAbsolute(v) => v,
        ParsedOperand::Label(_) => 0,
    }
}

/// Resolve one of the two-operand mnemonics (not `jmp`/`jsr`, which have
/// their own absolute-or-label handling, and not branches, which are
/// relative).
pub fn resolve_two_operand(
    file: &str,
    line: u32,
    pc: u16,
    mnemonic: &str,
    tail: &[Symbol],
) -> Result<Instruction, Error> {
    let table = two_operand_table(mnemonic).ok_or_else(|| Error::UnknownMnemonic {
        file: file.to_string(),
        line,
        mnemonic: mnemonic.to_string(),
    })?;
    let parsed = parse_operand(file, line, mnemonic, tail)?;
    if matches!(parsed, ParsedOperand::Label(_)) {
        return Err(bad_form(file, line, mnemonic, "a bare label is only valid for jmp/jsr/branches"));
    }
    let mode = mode_of(&parsed).ok_or_else(|| bad_form(file, line, mnemonic, "register mismatch for this addressing form"))?;
    let (opcode, len) = table
        .iter()
        .find(|(m, _, _)| *m == mode)
        .map(|(_, op, len)| (*op, *len))
        .ok_or_else(|| bad_form(file, line, mnemonic, "addressing mode not supported by this instruction"))?;
    Ok(Instruction { opcode, len, operand: operand_value(&parsed), pc, pending: None })
}

/// Resolve `jmp`/`jsr`: absolute, indirect-absolute (`jmp` only), or a
/// (possibly forward) label reference.
pub fn resolve_jump(
    file: &str,
    line: u32,
    pc: u16,
    mnemonic: &str,
    tail: &[Symbol],
    symbols: &SymbolTable,
) -> Result<Instruction, Error> {
    let parsed = parse_operand(file, line, mnemonic, tail)?;
    let (abs_opcode, ind_opcode) = match mnemonic {
        "jmp" => (0x4C, Some(0x6C)),
        "jsr" => (0x20, None),
        _ => {
            return Err(Error::UnknownMnemonic { file: file.to_string(), line, mnemonic: mnemonic.to_string() })
        }
    };

    match parsed {
        ParsedOperand::Label(name) => {
            if let Some(label) = symbols.lookup(&name) {
                Ok(Instruction { opcode: abs_opcode, len: 3, operand: label.addr, pc, pending: None })
            } else {
                Ok(Instruction {
                    opcode: abs_opcode,
                    len: 3,
                    operand: 0,
                    pc,
                    pending: Some(PendingRef {
                        label: name,
                        kind: PendingKind::Absolute,
                        file: file.to_string(),
                        line,
                    }),
                })
            }
        }
        ParsedOperand::Absolute(value) => {
            Ok(Instruction { opcode: abs_opcode, len: 3, operand: value, pc, pending: None })
        }
        ParsedOperand::ZeroPage(value) => {
            Ok(Instruction { opcode: abs_opcode, len: 3, operand: value as u16, pc, pending: None })
        }
        ParsedOperand::IndirectAbsolute(value) => {
            let opcode = ind_opcode.ok_or_else(|| bad_form(file, line, mnemonic, "indirect addressing is only valid for jmp"))?;
            Ok(Instruction { opcode, len: 3, operand: value, pc, pending: None })
        }
        _ => Err(bad_form(file, line, mnemonic, "expected an address or label")),
    }
}

/// Resolve an implied single-byte instruction.
pub fn resolve_implied(file: &str, line: u32, pc: u16, mnemonic: &str, tail: &[Symbol]) -> Result<Instruction, Error> {
    if !tail.is_empty() {
        return Err(bad_form(file, line, mnemonic, "this instruction takes no operand"));
    }
    let opcode = IMPLIED_TABLE
        .iter()
        .find(|(name, _)| *name == mnemonic)
        .map(|(_, op)| *op)
        .ok_or_else(|| Error::UnknownMnemonic { file: file.to_string(), line, mnemonic: mnemonic.to_string() })?;
    Ok(Instruction { opcode, len: 1, operand: 0, pc, pending: None })
}

/// Resolve a branch instruction: 2 bytes, signed displacement
/// `target - (pc_after_branch)`.
pub fn resolve_branch(
    file: &str,
    line: u32,
    pc: u16,
    mnemonic: &str,
    tail: &[Symbol],
    symbols: &SymbolTable,
) -> Result<Instruction, Error> {
    let opcode = BRANCH_TABLE
        .iter()
        .find(|(name, _)| *name == mnemonic)
        .map(|(_, op)| *op)
        .ok_or_else(|| Error::UnknownMnemonic { file: file.to_string(), line, mnemonic: mnemonic.to_string() })?;

    let parsed = parse_operand(file, line, mnemonic, tail)?;
    let target = match parsed {
        ParsedOperand::Label(name) => {
            match symbols.lookup(&name) {
                Some(label) => label.addr,
                None => {
                    return Ok(Instruction {
                        opcode,
                        len: 2,
                        operand: 0,
                        pc,
                        pending: Some(PendingRef {
                            label: name,
                            kind: PendingKind::Relative,
                            file: file.to_string(),
                            line,
                        }),
                    });
                }
            }
        }
        ParsedOperand::Absolute(v) => v,
        ParsedOperand::ZeroPage(v) => v as u16,
        _ => return Err(bad_form(file, line, mnemonic, "expected an address or label")),
    };

    let offset = branch_offset(file, line, mnemonic, pc, target)?;
    Ok(Instruction { opcode, len: 2, operand: offset as u8 as u16, pc, pending: None })
}

/// Compute and range-check a branch displacement.
pub fn branch_offset(file: &str, line: u32, mnemonic: &str, instr_pc: u16, target: u16) -> Result<i8, Error> {
    let delta = target as i32 - (instr_pc as i32 + 2);
    if !(-128..=127).contains(&delta) {
        return Err(bad_form(file, line, mnemonic, "branch target out of range (not within -128..127 bytes)"));
    }
    Ok(delta as i8)
}

pub fn is_two_operand_mnemonic(mnemonic: &str) -> bool {
    two_operand_table(mnemonic).is_some()
}

pub fn is_jump_mnemonic(mnemonic: &str) -> bool {
    mnemonic == "jmp" || mnemonic == "jsr"
}

pub fn is_branch_mnemonic(mnemonic: &str) -> bool {
    BRANCH_TABLE.iter().any(|(name, _)| *name == mnemonic)
}

pub fn is_implied_mnemonic(mnemonic: &str) -> bool {
    IMPLIED_TABLE.iter().any(|(name, _)| *name == mnemonic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::scanner::{self, LineEvent};
    use super::super::include::SourceBuffer;
    use crate::error::Diagnostics;

    fn tail_symbols(src: &str) -> Vec<Symbol> {
        let mut buf = SourceBuffer::new("test.s", src.as_bytes().to_vec());
        let mut diagnostics = Diagnostics::new();
        let mut fast_skip = true;
        let mut out = Vec::new();
        loop {
            match scanner::next_event(&mut buf, fast_skip, &mut diagnostics) {
                LineEvent::Symbol(sym) => {
                    if sym.kind == SymbolKind::Token {
                        fast_skip = true;
                    }
                    if sym.kind != SymbolKind::None {
                        out.push(sym);
                    }
                }
                LineEvent::EndOfLine | LineEvent::EndOfFile => break,
            }
        }
        out
    }

    #[test]
    fn lda_immediate() {
        let tail = tail_symbols("#$42");
        let instr = resolve_two_operand("t", 1, 0xC000, "lda", &tail).unwrap();
        assert_eq!(instr.opcode, 0xA9);
        assert_eq!(instr.len, 2);
        assert_eq!(instr.operand, 0x42);
    }

    #[test]
    fn lda_zero_page_vs_absolute() {
        let zp = tail_symbols("$05");
        let instr = resolve_two_operand("t", 1, 0xC000, "lda", &zp).unwrap();
        assert_eq!((instr.opcode, instr.len), (0xA5, 2));

        let abs = tail_symbols("$0105");
        let instr = resolve_two_operand("t", 1, 0xC000, "lda", &abs).unwrap();
        assert_eq!((instr.opcode, instr.len), (0xAD, 3));
    }

    #[test]
    fn indexed_indirect_and_indirect_indexed() {
        let tail = tail_symbols("($20,X)");
        let instr = resolve_two_operand("t", 1, 0xC000, "lda", &tail).unwrap();
        assert_eq!((instr.opcode, instr.len, instr.operand), (0xA1, 2, 0x20));

        let tail = tail_symbols("($20),Y");
        let instr = resolve_two_operand("t", 1, 0xC000, "lda", &tail).unwrap();
        assert_eq!((instr.opcode, instr.len, instr.operand), (0xB1, 2, 0x20));
    }

    #[test]
    fn zero_page_indexed() {
        let tail = tail_symbols("$10,X");
        let instr = resolve_two_operand("t", 1, 0xC000, "lda", &tail).unwrap();
        assert_eq!((instr.opcode, instr.len, instr.operand), (0xB5, 2, 0x10));
    }

    #[test]
    fn implied_instruction_rejects_operands() {
        let symbols = SymbolTable::new();
        let tail = tail_symbols("$05");
        assert!(resolve_implied("t", 1, 0xC000, "rts", &tail).is_err());
        let _ = symbols;
    }

    #[test]
    fn jump_to_forward_label_is_pending() {
        let symbols = SymbolTable::new();
        let tail = tail_symbols("foo");
        let instr = resolve_jump("t", 1, 0xC000, "jmp", &tail, &symbols).unwrap();
        assert_eq!(instr.opcode, 0x4C);
        assert!(matches!(instr.pending, Some(PendingRef { kind: PendingKind::Absolute, .. })));
    }

    #[test]
    fn jump_to_known_label_resolves_immediately() {
        let mut symbols = SymbolTable::new();
        symbols.define("foo", 0xC004, super::super::section::Section::Text);
        let tail = tail_symbols("foo");
        let instr = resolve_jump("t", 1, 0xC000, "jmp", &tail, &symbols).unwrap();
        assert_eq!(instr.operand, 0xC004);
        assert!(instr.pending.is_none());
    }

    #[test]
    fn branch_offset_range_check() {
        assert!(branch_offset("t", 1, "bne", 0xC000, 0xC07F).is_ok());
        assert!(branch_offset("t", 1, "bne", 0xC000, 0xC200).is_err());
    }
}
