//! Translates NES-targeted 6502 assembly source into an iNES ROM image.
//!
//! Assembly runs in two passes over a single read of the source: the
//! [`line`] module drives the [`scanner`] line by line, defining labels
//! and resolving instructions as it goes; forward references to labels
//! not yet defined are recorded as [`opcodes::PendingRef`]s and resolved
//! by the [`linker`] once the whole file (and any `.include`d files) has
//! been read. The [`ines`] module then writes the final header and PRG/CHR
//! banks.
//!
//! Comments start with `;` and run to the end of the line. Labels are
//! defined with a trailing colon; directives are introduced with a
//! leading `.`. See the per-module docs for the exact grammar each piece
//! accepts.

pub mod data;
pub mod header;
pub mod include;
pub mod ines;
pub mod labels;
pub mod line;
pub mod linker;
pub mod opcodes;
pub mod preprocessor;
pub mod scanner;
pub mod section;
pub mod symbol;

use std::fs;
use std::io;

use header::HeaderConfig;
use include::{IncludeStack, SourceBuffer};
use labels::SymbolTable;
use opcodes::Instruction;
use section::Sections;

use crate::error::{Diagnostics, Error};

/// State threaded through the whole assembly pipeline: section buffers and
/// program counters, the label table, header configuration, the include
/// stack, and the diagnostics sink. Reading a file for `.include`/`.chrbin`
/// goes through `loader` rather than a hardcoded `fs::read`, so the core
/// pipeline stays testable against in-memory sources.
pub struct Assembler {
    pub header: HeaderConfig,
    pub sections: Sections,
    pub symbols: SymbolTable,
    pub instructions: Vec<Instruction>,
    pub diagnostics: Diagnostics,
    pub include_stack: IncludeStack,
    pub oldpc: u16,
    loader: Box<dyn FnMut(&str) -> io::Result<Vec<u8>>>,
}

impl Assembler {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Assembler {
        Assembler::with_loader(name, bytes, |path: &str| fs::read(path))
    }

    pub fn with_loader(
        name: impl Into<String>,
        bytes: Vec<u8>,
        loader: impl FnMut(&str) -> io::Result<Vec<u8>> + 'static,
    ) -> Assembler {
        let header = HeaderConfig::default();
        let sections = Sections::new(header.text_pc, header.data_pc);
        Assembler {
            oldpc: header.text_pc,
            header,
            sections,
            symbols: SymbolTable::new(),
            instructions: Vec::new(),
            diagnostics: Diagnostics::new(),
            include_stack: IncludeStack::new(SourceBuffer::new(name, bytes)),
            loader: Box::new(loader),
        }
    }

    pub fn load_include(&mut self, path: &str) -> Result<Vec<u8>, Error> {
        (self.loader)(path).map_err(|_| Error::FileNotFound { path: path.to_string() })
    }

    /// Drive the line assembler across the active buffer and every
    /// `.include`d one, popping back to the caller as each finishes.
    fn run(&mut self) {
        loop {
            line::assemble_line(self);
            if self.diagnostics.should_abort() {
                break;
            }
            if self.include_stack.current_ref().at_end() {
                if self.include_stack.depth() > 1 {
                    self.include_stack.pop();
                } else {
                    break;
                }
            }
        }
    }

    /// Run the full pipeline — line assembly, linking, and iNES writing —
    /// consuming this `Assembler`. Exposed (rather than folded entirely
    /// into the free functions below) so callers that need to override
    /// header configuration from outside the source file, such as a CLI's
    /// `-prom`/`-crom` flags, can do so between construction and this call.
    pub fn finish(mut self) -> Assembly {
        self.run();
        if !self.diagnostics.should_abort() {
            linker::link(&mut self);
        }
        let rom = if self.diagnostics.has_errors() { None } else { Some(ines::write(&self)) };
        Assembly { rom, diagnostics: self.diagnostics }
    }
}

/// The result of an assembly run: the finished ROM bytes, if the build had
/// no errors, plus every diagnostic collected along the way.
pub struct Assembly {
    pub rom: Option<Vec<u8>>,
    pub diagnostics: Diagnostics,
}

/// Assemble a named in-memory source buffer.
pub fn assemble(name: impl Into<String>, source: Vec<u8>) -> Assembly {
    Assembler::new(name, source).finish()
}

/// Read `path` from disk and assemble it.
pub fn assemble_from_file(path: &str) -> Assembly {
    let source = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.report(Error::FileNotFound { path: path.to_string() });
            return Assembly { rom: None, diagnostics };
        }
    };
    assemble(path, source)
}
