//! Assembler error and warning kinds, and the diagnostic counters used to
//! decide whether a build succeeded.

use std::fmt;

/// A single-line span of source text, used to underline the offending
/// token in a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }
}

/// Everything that can go wrong while assembling a source file.
///
/// Kinds marked `(warning)` in spec do not increment the error counter;
/// see [`Error::is_warning`].
#[derive(Debug, Clone)]
pub enum Error {
    LexicalJunk { file: String, line: u32, ch: char },
    UnterminatedString { file: String, line: u32, quote: char },
    ExpectedHex { file: String, line: u32 },
    ExpectedBinary { file: String, line: u32 },
    OverflowImmediate { file: String, line: u32, value: u32 },
    OverflowAbsolute { file: String, line: u32, value: u32 },
    UnknownDirective { file: String, line: u32, name: String },
    BadDirectiveArgument { file: String, line: u32, directive: String, reason: String },
    FileNotFound { path: String },
    IncludeDepthExceeded { file: String, line: u32, path: String },
    UnknownMnemonic { file: String, line: u32, mnemonic: String },
    BadAddressingForm { file: String, line: u32, mnemonic: String, reason: String },
    ExpectedRegister { file: String, line: u32 },
    ExpectedComma { file: String, line: u32 },
    ExpectedCloseParen { file: String, line: u32 },
    DuplicateLabel { file: String, line: u32, name: String },
    UndefinedReference { name: String },
    BadSection { file: String, line: u32 },
    ChrSizeMismatch { expected: usize, actual: usize },
    UnsupportedMapper { mapper: u16 },
}

impl Error {
    /// Warnings do not increment the error counter.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Error::OverflowImmediate { .. }
                | Error::OverflowAbsolute { .. }
                | Error::ChrSizeMismatch { .. }
                | Error::UnsupportedMapper { .. }
        )
    }

    fn location(&self) -> Option<(&str, u32)> {
        match self {
            Error::LexicalJunk { file, line, .. }
            | Error::UnterminatedString { file, line, .. }
            | Error::ExpectedHex { file, line }
            | Error::ExpectedBinary { file, line }
            | Error::OverflowImmediate { file, line, .. }
            | Error::OverflowAbsolute { file, line, .. }
            | Error::UnknownDirective { file, line, .. }
            | Error::BadDirectiveArgument { file, line, .. }
            | Error::IncludeDepthExceeded { file, line, .. }
            | Error::UnknownMnemonic { file, line, .. }
            | Error::BadAddressingForm { file, line, .. }
            | Error::ExpectedRegister { file, line }
            | Error::ExpectedComma { file, line }
            | Error::ExpectedCloseParen { file, line }
            | Error::DuplicateLabel { file, line, .. }
            | Error::BadSection { file, line } => Some((file.as_str(), *line)),
            _ => None,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_warning() { "warning" } else { "error" };
        if let Some((file, line)) = self.location() {
            write!(f, "{}:{}: {}: ", file, line, kind)?;
        } else {
            write!(f, "{}: ", kind)?;
        }
        match self {
            Error::LexicalJunk { ch, .. } => write!(f, "junk '{}'", ch),
            Error::UnterminatedString { quote, .. } => write!(f, "expected {}", quote),
            Error::ExpectedHex { .. } => write!(f, "expected hexadecimal value"),
            Error::ExpectedBinary { .. } => write!(f, "expected binary value"),
            Error::OverflowImmediate { value, .. } => {
                write!(f, "immediate value overflow (${:X} truncated to 8 bits)", value)
            }
            Error::OverflowAbsolute { value, .. } => {
                write!(f, "absolute value overflow (${:X} truncated to 16 bits)", value)
            }
            Error::UnknownDirective { name, .. } => write!(f, "invalid preprocessor directive {}", name),
            Error::BadDirectiveArgument { directive, reason, .. } => {
                write!(f, "bad argument to .{}: {}", directive, reason)
            }
            Error::FileNotFound { path } => write!(f, "no such file or directory: {}", path),
            Error::IncludeDepthExceeded { path, .. } => {
                write!(f, "include depth exceeded while opening {}", path)
            }
            Error::UnknownMnemonic { mnemonic, .. } => write!(f, "unknown instruction \"{}\"", mnemonic),
            Error::BadAddressingForm { mnemonic, reason, .. } => {
                write!(f, "bad addressing form for \"{}\": {}", mnemonic, reason)
            }
            Error::ExpectedRegister { .. } => write!(f, "expected register"),
            Error::ExpectedComma { .. } => write!(f, "expected ','"),
            Error::ExpectedCloseParen { .. } => write!(f, "expected ')'"),
            Error::DuplicateLabel { name, .. } => write!(f, "conflicting types for {}", name),
            Error::UndefinedReference { name } => write!(f, "undefined reference to '{}'", name),
            Error::BadSection { .. } => write!(f, "bad section"),
            Error::ChrSizeMismatch { expected, actual } => write!(
                f,
                "expected exact CHR-ROM size of ${:04X}, got ${:04X}; padding with zeroes",
                expected, actual
            ),
            Error::UnsupportedMapper { mapper } => write!(f, "unsupported mapper {:03}", mapper),
        }
    }
}

/// Counts errors and warnings as they're reported, independent of where
/// they're printed. Warnings never increment the error counter, and the
/// `MAX_ERRORS` early-abort threshold is opt-in (disabled by default).
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Error>,
    warnings: Vec<Error>,
    max_errors: Option<usize>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    /// Enable the early-abort threshold (disabled by default).
    pub fn with_max_errors(mut self, max: usize) -> Diagnostics {
        self.max_errors = Some(max);
        self
    }

    pub fn report(&mut self, err: Error) {
        crate::logging::diagnostic(&err);
        if err.is_warning() {
            self.warnings.push(err);
        } else {
            self.errors.push(err);
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether the `MAX_ERRORS` early-abort threshold, if enabled, has
    /// been reached.
    pub fn should_abort(&self) -> bool {
        matches!(self.max_errors, Some(max) if self.errors.len() > max)
    }
}
