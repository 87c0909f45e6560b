//! The two-pass driver: pass 1 walks every statement to size the text and
//! data segments (pseudoinstructions already expanded, so sizes are
//! final) and records every label's offset; pass 2 re-walks the same
//! statements to emit bytes, patching branch/jump targets that resolve to
//! a label defined in this same unit and leaving a [`Relocation`] for
//! everything else (absolute `la`/`call` references, and any branch/jump
//! to a label this unit never defines).

use std::collections::{HashMap, HashSet};

use rv32i_isa::{descriptor_for, encode_b, encode_i, encode_i_shift, encode_j,
    encode_r, encode_s, encode_u, Mnemonic, Reg};
use rv32i_image::{PatchKind, Program, Relocation, Symbol, SymbolSegment, SourceMapItem};

use crate::directive;
use crate::error::AssembleError;
use crate::line::{parse_line, StatementKind};
use crate::operand::Operand;
use crate::pseudo;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Segment {
    Text,
    Data,
}

struct PreparedInstruction {
    offset: u32,
    line: u32,
    mnemonic: &'static str,
    args: Vec<Operand>,
}

struct PreparedData {
    offset: u32,
    line: u32,
    name: String,
    args: Vec<Operand>,
}

/// Assembles one translation unit. Never fails outright: every error
/// encountered is accumulated and returned alongside whatever could still
/// be built, so a caller can report everything wrong with a file at once.
pub fn assemble(source: &str) -> (Program, Vec<AssembleError>) {
    let mut errors = Vec::new();
    let mut symbols: HashMap<String, Symbol> = HashMap::new();
    let mut requested_globals: HashSet<String> = HashSet::new();
    let mut instructions: Vec<PreparedInstruction> = Vec::new();
    let mut data_items: Vec<PreparedData> = Vec::new();
    let mut source_map = Vec::new();

    let mut segment = Segment::Text;
    let mut text_offset = 0u32;
    let mut data_offset = 0u32;

    for (idx, text) in source.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let statement = match parse_line(line_no, text) {
            Ok(s) => s,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        if let Some(label) = statement.label {
            let (seg, offset) = match segment {
                Segment::Text => (SymbolSegment::Text, text_offset),
                Segment::Data => (SymbolSegment::Data, data_offset),
            };
            if symbols.contains_key(&label) {
                errors.push(AssembleError::DuplicateLabel(label));
            } else {
                symbols.insert(label, Symbol { segment: seg, offset });
            }
        }

        match statement.kind {
            StatementKind::Empty => {}

            StatementKind::Directive { name, args } => match name.as_str() {
                ".text" => segment = Segment::Text,
                ".data" => segment = Segment::Data,
                ".globl" | ".global" => {
                    for arg in &args {
                        match arg.as_label(line_no) {
                            Ok(label) => {
                                requested_globals.insert(label.to_owned());
                            }
                            Err(e) => errors.push(e),
                        }
                    }
                }
                _ => {
                    if segment != Segment::Data {
                        errors.push(AssembleError::WrongSegment {
                            line: line_no,
                            directive: "data directive",
                            expected: ".data",
                        });
                        continue;
                    }
                    match directive::sized(&name, &args, line_no, data_offset) {
                        Ok(size) => {
                            data_items.push(PreparedData {
                                offset: data_offset,
                                line: line_no,
                                name,
                                args,
                            });
                            data_offset += size;
                        }
                        Err(e) => errors.push(e),
                    }
                }
            },

            StatementKind::Instruction { mnemonic, args } => {
                if segment != Segment::Text {
                    errors.push(AssembleError::WrongSegment {
                        line: line_no,
                        directive: "instruction",
                        expected: ".text",
                    });
                    continue;
                }

                let real_ops = match pseudo::expand(&mnemonic, &args, line_no) {
                    Ok(Some(expanded)) => expanded
                        .into_iter()
                        .map(|r| (r.mnemonic, r.args))
                        .collect::<Vec<_>>(),
                    Ok(None) => {
                        if Mnemonic::from_name(&mnemonic).is_some() {
                            vec![(leak_mnemonic(&mnemonic), args)]
                        } else {
                            errors.push(AssembleError::UnknownMnemonic { line: line_no, mnemonic });
                            continue;
                        }
                    }
                    Err(e) => {
                        errors.push(e);
                        continue;
                    }
                };

                source_map.push(SourceMapItem { text_offset, line: line_no });
                for (real_mnemonic, real_args) in real_ops {
                    instructions.push(PreparedInstruction {
                        offset: text_offset,
                        line: line_no,
                        mnemonic: real_mnemonic,
                        args: real_args,
                    });
                    text_offset += 4;
                }
            }
        }
    }

    let mut text = vec![0u8; text_offset as usize];
    let mut data = vec![0u8; data_offset as usize];
    let mut relocations = Vec::new();

    for item in &data_items {
        match directive::emit(&item.name, &item.args, item.line, item.offset) {
            Ok(bytes) => {
                let start = item.offset as usize;
                data[start..start + bytes.len()].copy_from_slice(&bytes);
            }
            Err(e) => errors.push(e),
        }
    }

    for instr in &instructions {
        match encode_instruction(instr, &symbols, &mut relocations) {
            Ok(word) => text[instr.offset as usize..instr.offset as usize + 4]
                .copy_from_slice(&word.to_le_bytes()),
            Err(e) => errors.push(e),
        }
    }

    let globals = requested_globals
        .into_iter()
        .filter(|name| symbols.contains_key(name))
        .collect();

    let program = Program {
        text,
        data,
        symbols,
        globals,
        relocations,
        source_map,
    };

    log::debug!(
        "assembled {} bytes of text, {} bytes of data, {} relocation(s), {} error(s)",
        program.text.len(),
        program.data.len(),
        program.relocations.len(),
        errors.len(),
    );

    (program, errors)
}

// `rv32i_isa::Mnemonic::from_name` only knows the real ISA, never the
// internal `__la_*` markers pseudo-expansion produces for itself.
fn leak_mnemonic(name: &str) -> &'static str {
    Mnemonic::from_name(name).map(Mnemonic::name).unwrap_or("")
}

fn encode_instruction(
    instr: &PreparedInstruction,
    symbols: &HashMap<String, Symbol>,
    relocations: &mut Vec<Relocation>,
) -> Result<u32, AssembleError> {
    let line = instr.line;
    let args = &instr.args;

    match instr.mnemonic {
        "__la_hi" => {
            let rd = args[0].as_register(line)?;
            let label = args[1].as_label(line)?;
            relocations.push(Relocation {
                text_offset: instr.offset,
                kind: PatchKind::AbsHi20,
                symbol: label.to_owned(),
            });
            Ok(encode_u(descriptor_for(Mnemonic::Lui), rd, 0)
                .map_err(|source| AssembleError::Encode { line, source })?
                .raw())
        }
        "__la_lo" => {
            let rd = args[0].as_register(line)?;
            let rs1 = args[1].as_register(line)?;
            let label = args[2].as_label(line)?;
            relocations.push(Relocation {
                text_offset: instr.offset,
                kind: PatchKind::AbsLo12,
                symbol: label.to_owned(),
            });
            Ok(encode_i(descriptor_for(Mnemonic::Addi), rd, rs1, 0)
                .map_err(|source| AssembleError::Encode { line, source })?
                .raw())
        }
        "__la_lo_jalr" => {
            let rd = args[0].as_register(line)?;
            let rs1 = args[1].as_register(line)?;
            let label = args[2].as_label(line)?;
            relocations.push(Relocation {
                text_offset: instr.offset,
                kind: PatchKind::AbsLo12,
                symbol: label.to_owned(),
            });
            Ok(encode_i(descriptor_for(Mnemonic::Jalr), rd, rs1, 0)
                .map_err(|source| AssembleError::Encode { line, source })?
                .raw())
        }
        name => {
            let mnemonic = Mnemonic::from_name(name).expect("real mnemonic");
            let descriptor = descriptor_for(mnemonic);
            use rv32i_isa::Format;
            let expected = match descriptor.format {
                Format::R | Format::IShift | Format::B => 3,
                Format::I if matches!(mnemonic, Mnemonic::Fence | Mnemonic::FenceI | Mnemonic::Ecall) => 0,
                Format::I | Format::S | Format::U | Format::J => 2,
            };
            if args.len() != expected {
                return Err(AssembleError::WrongOperandCount {
                    line,
                    mnemonic: name.to_owned(),
                    expected,
                    found: args.len(),
                });
            }
            match descriptor.format {
                Format::R => {
                    let rd = args[0].as_register(line)?;
                    let rs1 = args[1].as_register(line)?;
                    let rs2 = args[2].as_register(line)?;
                    Ok(encode_r(descriptor, rd, rs1, rs2).raw())
                }
                Format::I => match mnemonic {
                    Mnemonic::Lb | Mnemonic::Lh | Mnemonic::Lw | Mnemonic::Lbu | Mnemonic::Lhu
                    | Mnemonic::Jalr => {
                        let rd = args[0].as_register(line)?;
                        let (offset, rs1) = args[1].as_memory(line)?;
                        Ok(encode_i(descriptor, rd, rs1, offset as i32)
                            .map_err(|source| AssembleError::Encode { line, source })?
                            .raw())
                    }
                    Mnemonic::Fence | Mnemonic::FenceI | Mnemonic::Ecall => {
                        Ok(encode_i(descriptor, Reg::ZERO, Reg::ZERO, 0)
                            .map_err(|source| AssembleError::Encode { line, source })?
                            .raw())
                    }
                    _ => {
                        let rd = args[0].as_register(line)?;
                        let rs1 = args[1].as_register(line)?;
                        let imm = args[2].as_immediate(line)?;
                        Ok(encode_i(descriptor, rd, rs1, imm as i32)
                            .map_err(|source| AssembleError::Encode { line, source })?
                            .raw())
                    }
                },
                Format::IShift => {
                    let rd = args[0].as_register(line)?;
                    let rs1 = args[1].as_register(line)?;
                    let shamt = args[2].as_immediate(line)?;
                    Ok(encode_i_shift(descriptor, rd, rs1, shamt as u32)
                        .map_err(|source| AssembleError::Encode { line, source })?
                        .raw())
                }
                Format::S => {
                    let rs2 = args[0].as_register(line)?;
                    let (offset, rs1) = args[1].as_memory(line)?;
                    Ok(encode_s(descriptor, rs1, rs2, offset as i32)
                        .map_err(|source| AssembleError::Encode { line, source })?
                        .raw())
                }
                Format::B => {
                    let rs1 = args[0].as_register(line)?;
                    let rs2 = args[1].as_register(line)?;
                    let imm = pc_relative_target(
                        &args[2],
                        line,
                        instr.offset,
                        symbols,
                        relocations,
                        PatchKind::BranchPc12,
                    )?;
                    Ok(encode_b(descriptor, rs1, rs2, imm)
                        .map_err(|source| AssembleError::Encode { line, source })?
                        .raw())
                }
                Format::U => {
                    let rd = args[0].as_register(line)?;
                    let imm = args[1].as_immediate(line)?;
                    Ok(encode_u(descriptor, rd, imm as i32)
                        .map_err(|source| AssembleError::Encode { line, source })?
                        .raw())
                }
                Format::J => {
                    let rd = args[0].as_register(line)?;
                    let imm = pc_relative_target(
                        &args[1],
                        line,
                        instr.offset,
                        symbols,
                        relocations,
                        PatchKind::JumpPc20,
                    )?;
                    Ok(encode_j(descriptor, rd, imm)
                        .map_err(|source| AssembleError::Encode { line, source })?
                        .raw())
                }
            }
        }
    }
}

/// Resolves a branch/jump's target operand to a pc-relative immediate.
///
/// Accepts either a label (the ordinary spelling) or a bare immediate — a
/// direct pc-relative offset, same as real RISC-V assemblers accept and
/// exactly what `rv32i_isa::disassemble` emits for a branch/jump it can't
/// attach a symbolic name to, so disassembling and reassembling a word
/// round-trips without needing to invent a label (spec.md §8 property 4).
fn pc_relative_target(
    operand: &Operand,
    line: u32,
    from_offset: u32,
    symbols: &HashMap<String, Symbol>,
    relocations: &mut Vec<Relocation>,
    kind: PatchKind,
) -> Result<i32, AssembleError> {
    if let Operand::Immediate(value) = operand {
        return Ok(*value as i32);
    }
    let label = operand.as_label(line)?;
    Ok(resolve_pc_relative(label, from_offset, symbols, relocations, kind))
}

/// A branch/jump to a label this same unit defines is patched immediately:
/// the distance between two text offsets in the same unit survives the
/// linker adding a uniform base address to both. A label this unit
/// doesn't define is left as a relocation for the linker to resolve once
/// every unit has a final address.
fn resolve_pc_relative(
    label: &str,
    from_offset: u32,
    symbols: &HashMap<String, Symbol>,
    relocations: &mut Vec<Relocation>,
    kind: PatchKind,
) -> i32 {
    match symbols.get(label) {
        Some(sym) if sym.segment == SymbolSegment::Text => {
            sym.offset as i32 - from_offset as i32
        }
        _ => {
            relocations.push(Relocation {
                text_offset: from_offset,
                kind,
                symbol: label.to_owned(),
            });
            0
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn local_forward_branch_is_patched_without_relocation() {
        let source = "beqz a0, done\naddi a0, a0, 1\ndone:\nnop\n";
        let (program, errors) = assemble(source);
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(program.relocations.is_empty());
        assert_eq!(program.text.len(), 12);
    }

    #[test]
    fn undefined_label_leaves_a_relocation() {
        let source = "j somewhere_else\n";
        let (program, errors) = assemble(source);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(program.relocations.len(), 1);
        assert_eq!(program.relocations[0].symbol, "somewhere_else");
    }

    #[test]
    fn la_always_leaves_two_relocations() {
        let source = "la a0, msg\n.data\nmsg:\n.asciiz \"hi\"\n";
        let (program, errors) = assemble(source);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(program.relocations.len(), 2);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let source = "a:\nnop\na:\nnop\n";
        let (_program, errors) = assemble(source);
        assert!(errors.iter().any(|e| matches!(e, AssembleError::DuplicateLabel(_))));
    }

    #[test]
    fn globl_exports_only_defined_symbols() {
        let source = ".globl main, ghost\nmain:\nnop\n";
        let (program, _errors) = assemble(source);
        assert!(program.globals.contains("main"));
        assert!(!program.globals.contains("ghost"));
    }

    #[test]
    fn unknown_mnemonic_is_reported() {
        let source = "frobnicate a0, a1\n";
        let (_program, errors) = assemble(source);
        assert!(errors.iter().any(|e| matches!(e, AssembleError::UnknownMnemonic { .. })));
    }

    #[test]
    fn branches_and_jumps_accept_a_bare_immediate_target() {
        // The form `rv32i_isa::disassemble` emits for a branch/jump it has
        // no label for — must reassemble without error (spec.md §8 property 4).
        let source = "beq a0, a1, -4\nj 8\n";
        let (program, errors) = assemble(source);
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(program.relocations.is_empty());
    }
}
