//! Lexical symbols produced by the scanner.
//!
//! A [`Symbol`] pairs a [`SymbolKind`] with its source text and position.
//! Numeric symbols keep their textual representation and are reparsed on
//! demand (`Symbol::number`) rather than eagerly converted to an integer.

use crate::error::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    None,
    Token,
    Digit,
    String,
    Immediate,
    ZeroPage,
    Absolute,
    Label,
    Assignment,
    IndirectOpen,
    IndirectClose,
    ExtraOperand,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub text: String,
    pub span: Span,
    pub line: u32,
}

impl Symbol {
    pub fn new(kind: SymbolKind, text: impl Into<String>, span: Span, line: u32) -> Symbol {
        Symbol { kind, text: text.into(), span, line }
    }

    /// Reparse this symbol's textual form into a numeric value. Valid for
    /// `Digit`, `ZeroPage`, `Absolute` and `Immediate` kinds; the latter
    /// three store their text as `$<hex>` (optionally prefixed with `#`).
    pub fn number(&self) -> Option<u32> {
        match self.kind {
            SymbolKind::Digit => self.text.parse::<u32>().ok(),
            SymbolKind::ZeroPage | SymbolKind::Absolute => {
                u32::from_str_radix(self.text.trim_start_matches('$'), 16).ok()
            }
            SymbolKind::Immediate => {
                u32::from_str_radix(self.text.trim_start_matches("#$"), 16).ok()
            }
            _ => None,
        }
    }
}
