//! Lexical scanner: turns the currently-active [`SourceBuffer`] into a
//! stream of [`Symbol`]s, one call at a time.
//!
//! `fast_skip` — "a token has been seen on this line" — is passed in by
//! the caller rather than kept as scanner-global state; it belongs to the
//! line assembler, not the lexer.

use crate::error::{Diagnostics, Error, Span};

use super::include::SourceBuffer;
use super::symbol::{Symbol, SymbolKind};

/// What happened on the most recent scan step.
pub enum LineEvent {
    Symbol(Symbol),
    EndOfLine,
    EndOfFile,
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'@'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'@'
}

/// Skip runs of horizontal whitespace and `;` line comments, stopping at
/// a newline or the first non-trivial character.
fn skip_trivia(buf: &mut SourceBuffer) {
    loop {
        match buf.peek() {
            b' ' | b'\t' | b'\r' => buf.advance(),
            b';' => {
                while !buf.at_end() && buf.peek() != b'\n' {
                    buf.advance();
                }
            }
            _ => break,
        }
    }
}

/// Discard the rest of the current line; used to recover from a lexical
/// error so scanning can resume on the next line.
fn discard_to_eol(buf: &mut SourceBuffer) {
    while !buf.at_end() && buf.peek() != b'\n' {
        buf.advance();
    }
}

fn read_hex_digits(buf: &mut SourceBuffer) -> String {
    let mut s = String::new();
    while (buf.peek() as char).is_ascii_hexdigit() {
        s.push(buf.peek() as char);
        buf.advance();
    }
    s
}

fn read_binary_digits(buf: &mut SourceBuffer) -> String {
    let mut s = String::new();
    while matches!(buf.peek(), b'0' | b'1') {
        s.push(buf.peek() as char);
        buf.advance();
    }
    s
}

/// Number of significant hex nibbles after stripping leading zeros (at
/// least one nibble).
fn significant_nibbles(digits: &str) -> usize {
    let trimmed = digits.trim_start_matches('0');
    trimmed.len().max(1)
}

enum NumericWidth {
    ZeroPage,
    Absolute,
}

fn classify_hex(file: &str, line: u32, digits: &str, diagnostics: &mut Diagnostics) -> (NumericWidth, String) {
    let sig = significant_nibbles(digits);
    if sig <= 2 {
        (NumericWidth::ZeroPage, digits.to_string())
    } else if sig <= 4 {
        (NumericWidth::Absolute, digits.to_string())
    } else {
        let value = u32::from_str_radix(digits, 16).unwrap_or(0);
        diagnostics.report(Error::OverflowAbsolute { file: file.to_string(), line, value });
        (NumericWidth::Absolute, format!("{:04X}", value & 0xFFFF))
    }
}

fn classify_binary(file: &str, line: u32, digits: &str, diagnostics: &mut Diagnostics) -> (NumericWidth, String) {
    let bits = digits.len();
    let value = u32::from_str_radix(digits, 2).unwrap_or(0);
    if bits <= 8 {
        (NumericWidth::ZeroPage, format!("{:X}", value))
    } else if bits <= 16 {
        (NumericWidth::Absolute, format!("{:X}", value))
    } else {
        diagnostics.report(Error::OverflowAbsolute { file: file.to_string(), line, value });
        (NumericWidth::Absolute, format!("{:04X}", value & 0xFFFF))
    }
}

/// Scan the next symbol out of `buf`. `fast_skip` gates the legality of
/// punctuation and numeric literals: they're only valid once a `TOKEN` has
/// been seen on the current line.
pub fn next_event(buf: &mut SourceBuffer, fast_skip: bool, diagnostics: &mut Diagnostics) -> LineEvent {
    skip_trivia(buf);

    if buf.at_end() {
        return LineEvent::EndOfFile;
    }
    if buf.peek() == b'\n' {
        buf.advance();
        buf.line += 1;
        return LineEvent::EndOfLine;
    }

    let file = buf.name.clone();
    let line = buf.line;
    let start = buf.cursor();
    let c = buf.peek();

    if is_ident_start(c) {
        let mut text = String::new();
        while is_ident_continue(buf.peek()) {
            text.push(buf.peek() as char);
            buf.advance();
        }
        let span = Span::new(start, buf.cursor());
        return LineEvent::Symbol(Symbol::new(SymbolKind::Token, text, span, line));
    }

    if !fast_skip {
        buf.advance();
        diagnostics.report(Error::LexicalJunk { file, line, ch: c as char });
        discard_to_eol(buf);
        return LineEvent::Symbol(Symbol::new(SymbolKind::None, "", Span::new(start, buf.cursor()), line));
    }

    match c {
        b'$' => {
            buf.advance();
            if !(buf.peek() as char).is_ascii_hexdigit() {
                diagnostics.report(Error::ExpectedHex { file, line });
                discard_to_eol(buf);
                return LineEvent::Symbol(Symbol::new(SymbolKind::None, "", Span::new(start, buf.cursor()), line));
            }
            let digits = read_hex_digits(buf);
            let (width, digits) = classify_hex(&file, line, &digits, diagnostics);
            let kind = match width {
                NumericWidth::ZeroPage => SymbolKind::ZeroPage,
                NumericWidth::Absolute => SymbolKind::Absolute,
            };
            let span = Span::new(start, buf.cursor());
            LineEvent::Symbol(Symbol::new(kind, format!("${}", digits), span, line))
        }
        b'%' => {
            buf.advance();
            if !matches!(buf.peek(), b'0' | b'1') {
                diagnostics.report(Error::ExpectedBinary { file, line });
                discard_to_eol(buf);
                return LineEvent::Symbol(Symbol::new(SymbolKind::None, "", Span::new(start, buf.cursor()), line));
            }
            let digits = read_binary_digits(buf);
            let (width, hex) = classify_binary(&file, line, &digits, diagnostics);
            let kind = match width {
                NumericWidth::ZeroPage => SymbolKind::ZeroPage,
                NumericWidth::Absolute => SymbolKind::Absolute,
            };
            let span = Span::new(start, buf.cursor());
            LineEvent::Symbol(Symbol::new(kind, format!("${}", hex), span, line))
        }
        b'0'..=b'9' => {
            let mut text = String::new();
            while buf.peek().is_ascii_digit() {
                text.push(buf.peek() as char);
                buf.advance();
            }
            let span = Span::new(start, buf.cursor());
            LineEvent::Symbol(Symbol::new(SymbolKind::Digit, text, span, line))
        }
        b'#' => {
            buf.advance();
            match buf.peek() {
                b'$' => {
                    buf.advance();
                    if !(buf.peek() as char).is_ascii_hexdigit() {
                        diagnostics.report(Error::ExpectedHex { file, line });
                        discard_to_eol(buf);
                        return LineEvent::Symbol(Symbol::new(SymbolKind::None, "", Span::new(start, buf.cursor()), line));
                    }
                    let digits = read_hex_digits(buf);
                    let sig = significant_nibbles(&digits);
                    let digits = if sig > 2 {
                        let value = u32::from_str_radix(&digits, 16).unwrap_or(0);
                        diagnostics.report(Error::OverflowImmediate { file: file.clone(), line, value });
                        format!("{:02X}", value & 0xFF)
                    } else {
                        digits
                    };
                    let span = Span::new(start, buf.cursor());
                    LineEvent::Symbol(Symbol::new(SymbolKind::Immediate, format!("#${}", digits), span, line))
                }
                b'%' => {
                    buf.advance();
                    if !matches!(buf.peek(), b'0' | b'1') {
                        diagnostics.report(Error::ExpectedBinary { file, line });
                        discard_to_eol(buf);
                        return LineEvent::Symbol(Symbol::new(SymbolKind::None, "", Span::new(start, buf.cursor()), line));
                    }
                    let digits = read_binary_digits(buf);
                    let bits = digits.len();
                    let value = u32::from_str_radix(&digits, 2).unwrap_or(0);
                    let value = if bits > 8 {
                        diagnostics.report(Error::OverflowImmediate { file: file.clone(), line, value });
                        value & 0xFF
                    } else {
                        value
                    };
                    let span = Span::new(start, buf.cursor());
                    LineEvent::Symbol(Symbol::new(
                        SymbolKind::Immediate,
                        format!("#${:X}", value),
                        span,
                        line,
                    ))
                }
                other => {
                    diagnostics.report(Error::BadDirectiveArgument {
                        file,
                        line,
                        directive: "#".to_string(),
                        reason: format!("expected '$' or '%' after '#', got '{}'", other as char),
                    });
                    discard_to_eol(buf);
                    LineEvent::Symbol(Symbol::new(SymbolKind::None, "", Span::new(start, buf.cursor()), line))
                }
            }
        }
        b'(' => {
            buf.advance();
            LineEvent::Symbol(Symbol::new(SymbolKind::IndirectOpen, "(", Span::new(start, buf.cursor()), line))
        }
        b')' => {
            buf.advance();
            LineEvent::Symbol(Symbol::new(SymbolKind::IndirectClose, ")", Span::new(start, buf.cursor()), line))
        }
        b',' | b'+' => {
            let ch = buf.peek() as char;
            buf.advance();
            LineEvent::Symbol(Symbol::new(SymbolKind::ExtraOperand, ch.to_string(), Span::new(start, buf.cursor()), line))
        }
        b':' => {
            buf.advance();
            LineEvent::Symbol(Symbol::new(SymbolKind::Label, ":", Span::new(start, buf.cursor()), line))
        }
        b'=' => {
            buf.advance();
            LineEvent::Symbol(Symbol::new(SymbolKind::Assignment, "=", Span::new(start, buf.cursor()), line))
        }
        b'<' | b'\'' | b'"' => {
            let quote = c;
            buf.advance();
            let mut text = String::new();
            loop {
                let ch = buf.peek();
                if ch == 0 || ch == b'\n' {
                    diagnostics.report(Error::UnterminatedString { file, line, quote: closing(quote) as char });
                    discard_to_eol(buf);
                    return LineEvent::Symbol(Symbol::new(SymbolKind::None, "", Span::new(start, buf.cursor()), line));
                }
                if ch == b'\\' {
                    buf.advance();
                    let escaped = buf.peek();
                    if escaped == 0 || escaped == b'\n' {
                        diagnostics.report(Error::UnterminatedString { file, line, quote: closing(quote) as char });
                        discard_to_eol(buf);
                        return LineEvent::Symbol(Symbol::new(SymbolKind::None, "", Span::new(start, buf.cursor()), line));
                    }
                    text.push(escaped as char);
                    buf.advance();
                    continue;
                }
                if ch == closing(quote) {
                    buf.advance();
                    break;
                }
                text.push(ch as char);
                buf.advance();
            }
            let span = Span::new(start, buf.cursor());
            LineEvent::Symbol(Symbol::new(SymbolKind::String, text, span, line))
        }
        other => {
            buf.advance();
            diagnostics.report(Error::LexicalJunk { file, line, ch: other as char });
            discard_to_eol(buf);
            LineEvent::Symbol(Symbol::new(SymbolKind::None, "", Span::new(start, buf.cursor()), line))
        }
    }
}

fn closing(open: u8) -> u8 {
    match open {
        b'<' => b'>',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;

    fn scan_all(src: &str) -> Vec<Symbol> {
        let mut buf = SourceBuffer::new("test.s", src.as_bytes().to_vec());
        let mut diagnostics = Diagnostics::new();
        let mut fast_skip = false;
        let mut out = Vec::new();
        loop {
            match next_event(&mut buf, fast_skip, &mut diagnostics) {
                LineEvent::Symbol(sym) => {
                    if sym.kind == SymbolKind::Token {
                        fast_skip = true;
                    }
                    if sym.kind != SymbolKind::None {
                        out.push(sym);
                    }
                }
                LineEvent::EndOfLine => fast_skip = false,
                LineEvent::EndOfFile => break,
            }
        }
        out
    }

    #[test]
    fn mnemonic_and_zero_page_literal() {
        let syms = scan_all("lda $05");
        assert_eq!(syms.len(), 2);
        assert_eq!(syms[0].kind, SymbolKind::Token);
        assert_eq!(syms[0].text, "lda");
        assert_eq!(syms[1].kind, SymbolKind::ZeroPage);
        assert_eq!(syms[1].number(), Some(0x05));
    }

    #[test]
    fn hex_width_classification() {
        let syms = scan_all("lda $0105");
        assert_eq!(syms[1].kind, SymbolKind::Absolute);
        assert_eq!(syms[1].number(), Some(0x0105));
    }

    #[test]
    fn binary_literal_classifies_by_bit_count() {
        let syms = scan_all("lda %00000101");
        assert_eq!(syms[1].kind, SymbolKind::ZeroPage);
        assert_eq!(syms[1].number(), Some(0x05));

        let syms = scan_all("lda %000000010000000");
        assert_eq!(syms[1].kind, SymbolKind::Absolute);
    }

    #[test]
    fn immediate_form() {
        let syms = scan_all("lda #$42");
        assert_eq!(syms[1].kind, SymbolKind::Immediate);
        assert_eq!(syms[1].number(), Some(0x42));
    }

    #[test]
    fn comment_to_end_of_line_is_skipped() {
        let syms = scan_all("lda $05 ; comment\nrts");
        assert_eq!(syms.len(), 3);
        assert_eq!(syms[2].text, "rts");
    }

    #[test]
    fn string_literal_with_escape() {
        let syms = scan_all("byte \"A\\\"B\"");
        assert_eq!(syms[1].kind, SymbolKind::String);
        assert_eq!(syms[1].text, "A\"B");
    }

    #[test]
    fn punctuation_before_any_token_is_junk() {
        let mut buf = SourceBuffer::new("test.s", b"$05".to_vec());
        let mut diagnostics = Diagnostics::new();
        next_event(&mut buf, false, &mut diagnostics);
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn label_colon_is_distinct_from_assignment() {
        let syms = scan_all("foo: = ");
        assert_eq!(syms[1].kind, SymbolKind::Label);
        assert_eq!(syms[2].kind, SymbolKind::Assignment);
    }
}
