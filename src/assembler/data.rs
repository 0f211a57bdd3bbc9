//! Data emitters for the `DATA`/`RODATA` sections.
//!
//! A data line begins with the token `byte` or `db`; the remainder is a
//! comma-separated list of numeric literals (low 8 bits only) or string
//! literals (emitted verbatim). RODATA appends a terminating NUL after
//! the last element; DATA does not.

use super::section::SectionBuffer;
use super::symbol::{Symbol, SymbolKind};
use crate::error::Error;

fn is_comma(sym: &Symbol) -> bool {
    sym.kind == SymbolKind::ExtraOperand && sym.text == ","
}

/// Emit one `.byte`/`.db` line's elements into `section`, appending a
/// terminating NUL when `terminate` is set (RODATA only).
pub fn emit_data_line(
    file: &str,
    line: u32,
    section_name: &str,
    symbols: &[Symbol],
    section: &mut SectionBuffer,
    terminate: bool,
) -> Result<(), Error> {
    if symbols.is_empty() || symbols[0].kind != SymbolKind::Token || !(symbols[0].text == "byte" || symbols[0].text == "db") {
        return Err(Error::BadSection { file: file.to_string(), line });
    }

    let elements = &symbols[1..];
    if elements.is_empty() {
        return Err(bad_expression(file, line, section_name));
    }

    let mut expect_element = true;
    for sym in elements {
        if is_comma(sym) {
            if expect_element {
                return Err(bad_expression(file, line, section_name));
            }
            expect_element = true;
            continue;
        }

        if !expect_element {
            return Err(Error::ExpectedComma { file: file.to_string(), line });
        }

        match sym.kind {
            SymbolKind::Digit | SymbolKind::ZeroPage | SymbolKind::Absolute => {
                let value = sym.number().unwrap_or(0) as u8;
                section.push(value);
            }
            SymbolKind::String => {
                for byte in sym.text.bytes() {
                    section.push(byte);
                }
            }
            _ => return Err(bad_expression(file, line, section_name)),
        }
        expect_element = false;
    }

    if expect_element {
        return Err(bad_expression(file, line, section_name));
    }

    if terminate {
        section.push(0);
    }
    Ok(())
}

fn bad_expression(file: &str, line: u32, section_name: &str) -> Error {
    Error::BadDirectiveArgument {
        file: file.to_string(),
        line,
        directive: section_name.to_string(),
        reason: "expected a value or string expression".to_string(),
    }
}
