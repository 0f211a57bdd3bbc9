//! Linker / backpatcher: resolves every [`PendingRef`] left by
//! the opcode resolver, writes the final instruction bytes into the TEXT
//! buffer, and checks that the entry point exists. All undefined
//! references are collected before the build is declared a failure,
//! rather than stopping at the first one.

use super::opcodes::{Instruction, PendingKind};
use super::Assembler;
use crate::error::Error;

pub fn link(asm: &mut Assembler) {
    let base = asm.header.text_pc;

    let mut instructions = std::mem::take(&mut asm.instructions);
    for instr in &mut instructions {
        if let Some(pending) = instr.pending.take() {
            let label = asm.symbols.lookup(&pending.label);
            match label {
                Some(label) => match pending.kind {
                    PendingKind::Absolute => instr.operand = label.addr,
                    PendingKind::Relative => {
                        match super::opcodes::branch_offset(&pending.file, pending.line, "branch", instr.pc, label.addr) {
                            Ok(offset) => instr.operand = offset as u8 as u16,
                            Err(err) => asm.diagnostics.report(err),
                        }
                    }
                },
                None => asm.diagnostics.report(Error::UndefinedReference { name: pending.label }),
            }
        }
        write_instruction(&mut asm.sections.text.bytes, base, instr);
    }
    asm.instructions = instructions;

    if asm.symbols.lookup(&asm.header.entry_point).is_none() {
        asm.diagnostics.report(Error::UndefinedReference { name: asm.header.entry_point.clone() });
    }
}

fn write_instruction(bytes: &mut Vec<u8>, base: u16, instr: &Instruction) {
    let offset = instr.pc.wrapping_sub(base) as usize;
    let end = offset + instr.len as usize;
    if bytes.len() < end {
        bytes.resize(end, 0);
    }
    bytes[offset] = instr.opcode;
    if instr.len >= 2 {
        bytes[offset + 1] = (instr.operand & 0xFF) as u8;
    }
    if instr.len >= 3 {
        bytes[offset + 2] = ((instr.operand >> 8) & 0xFF) as u8;
    }
}
