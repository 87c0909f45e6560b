//! The linker (C5): concatenates one or more `Program`s emitted by
//! `rv32i-asm`, assigns each a final text/data base address, resolves
//! every outstanding relocation against the union of local and global
//! symbols, and patches the resolved target into its instruction word.
//!
//! Generalizes the teacher's single-unit `vasm`, which never modeled more
//! than one translation unit and so never needed a link step at all —
//! grounded directly in spec.md §4.4 rather than in any one teacher file.

mod error;

use std::collections::HashMap;

use rv32i_image::constants::{STATIC_BEGIN, TEXT_BEGIN};
use rv32i_image::{LinkedProgram, PatchKind, Program, SourceMapItem, Symbol, SymbolSegment};
use rv32i_isa::Word;

pub use error::LinkError;

/// Default entry symbol when a linked program does not name one explicitly.
const DEFAULT_ENTRY: &str = "main";

struct Unit {
    program: Program,
    text_base: u32,
    data_base: u32,
}

/// Links `programs` into a single [`LinkedProgram`]. Fatal on the first
/// unresolved symbol, duplicate global, or relocation that overflows its
/// field — unlike the assembler, there is no useful partial result to hand
/// back once address assignment can't complete.
pub fn link(programs: Vec<Program>) -> Result<LinkedProgram, LinkError> {
    let units = assign_addresses(programs);

    let globals = build_global_table(&units)?;

    let mut text = Vec::new();
    let mut data = Vec::new();
    let mut source_map = Vec::new();
    for unit in &units {
        let text_off = text.len() as u32;
        text.extend_from_slice(&unit.program.text);
        data.extend_from_slice(&unit.program.data);
        for item in &unit.program.source_map {
            source_map.push(SourceMapItem {
                text_offset: text_off + item.text_offset,
                line: item.line,
            });
        }
    }

    for unit in &units {
        for reloc in &unit.program.relocations {
            let target = resolve(&reloc.symbol, unit, &globals)?;
            patch(&mut text, unit.text_base, reloc.text_offset, reloc.kind, target, &reloc.symbol)?;
        }
    }

    let entry_offset = globals
        .get(DEFAULT_ENTRY)
        .map(|addr| addr - TEXT_BEGIN)
        .unwrap_or(0);

    let symbols = globals
        .iter()
        .map(|(name, addr)| {
            let offset = if *addr >= STATIC_BEGIN {
                addr - STATIC_BEGIN
            } else {
                addr - TEXT_BEGIN
            };
            (name.clone(), offset)
        })
        .collect();

    Ok(LinkedProgram {
        text,
        data,
        entry_offset,
        source_map,
        symbols,
    })
}

/// Assigns each unit's text/data a base address by simple concatenation,
/// in program order, the way spec.md §4.4 describes: unit *i*'s text
/// begins after the sum of every prior unit's text size, and likewise
/// for data.
fn assign_addresses(programs: Vec<Program>) -> Vec<Unit> {
    let mut text_base = TEXT_BEGIN;
    let mut data_base = STATIC_BEGIN;
    programs
        .into_iter()
        .map(|program| {
            let unit = Unit {
                text_base,
                data_base,
                program,
            };
            log::debug!(
                "unit: text_base=0x{:08x} ({} bytes), data_base=0x{:08x} ({} bytes)",
                unit.text_base,
                unit.program.text.len(),
                unit.data_base,
                unit.program.data.len(),
            );
            text_base += unit.program.text.len() as u32;
            data_base += unit.program.data.len() as u32;
            unit
        })
        .collect()
}

/// Unions every unit's `.globl`-declared symbols into one table keyed by
/// final absolute address, rejecting a name declared global in more than
/// one unit.
fn build_global_table(units: &[Unit]) -> Result<HashMap<String, u32>, LinkError> {
    let mut globals = HashMap::new();
    for unit in units {
        for name in &unit.program.globals {
            let symbol = &unit.program.symbols[name];
            let addr = absolute(unit, symbol);
            if globals.insert(name.clone(), addr).is_some() {
                return Err(LinkError::DuplicateGlobal(name.clone()));
            }
        }
    }
    Ok(globals)
}

fn absolute(unit: &Unit, symbol: &Symbol) -> u32 {
    match symbol.segment {
        SymbolSegment::Text => unit.text_base + symbol.offset,
        SymbolSegment::Data => unit.data_base + symbol.offset,
    }
}

/// Resolves a relocation's label against (a) the originating unit's own
/// symbol table, then (b) the global table, per spec.md §4.4.
fn resolve(label: &str, unit: &Unit, globals: &HashMap<String, u32>) -> Result<u32, LinkError> {
    if let Some(symbol) = unit.program.symbols.get(label) {
        return Ok(absolute(unit, symbol));
    }
    globals
        .get(label)
        .copied()
        .ok_or_else(|| LinkError::UnresolvedSymbol(label.to_owned()))
}

fn read_word(text: &[u8], offset: u32) -> u32 {
    let o = offset as usize;
    u32::from_le_bytes([text[o], text[o + 1], text[o + 2], text[o + 3]])
}

fn write_word(text: &mut [u8], offset: u32, word: Word) {
    let o = offset as usize;
    text[o..o + 4].copy_from_slice(&word.raw().to_le_bytes());
}

fn fits_signed(value: i64, width: u32) -> bool {
    let min = -(1i64 << (width - 1));
    let max = (1i64 << (width - 1)) - 1;
    (min..=max).contains(&value)
}

/// Patches one relocation into `text`, dispatching on its [`PatchKind`].
/// `AbsHi20`/`AbsLo12` split the absolute target with the standard
/// RISC-V rounding: the low half is sign-extended, so the high half adds
/// half a page first to compensate when that sign-extension would
/// otherwise borrow from it.
fn patch(
    text: &mut [u8],
    text_base: u32,
    text_offset: u32,
    kind: PatchKind,
    target: u32,
    symbol: &str,
) -> Result<(), LinkError> {
    let word = Word::new(read_word(text, text_offset));
    let overflow = |target: u32| LinkError::RelocationOverflow {
        symbol: symbol.to_owned(),
        text_offset,
        target,
    };

    match kind {
        PatchKind::BranchPc12 => {
            let instr_addr = text_base + text_offset;
            let imm = target as i64 - instr_addr as i64;
            if !fits_signed(imm, 13) || imm % 2 != 0 {
                return Err(overflow(target));
            }
            write_word(text, text_offset, word.with_imm_b(imm as i32));
        }
        PatchKind::JumpPc20 => {
            let instr_addr = text_base + text_offset;
            let imm = target as i64 - instr_addr as i64;
            if !fits_signed(imm, 21) || imm % 2 != 0 {
                return Err(overflow(target));
            }
            write_word(text, text_offset, word.with_imm_j(imm as i32));
        }
        PatchKind::AbsHi20 => {
            let hi20 = (((target as i64) + 0x800) >> 12) & 0xF_FFFF;
            write_word(text, text_offset, word.with_imm_u((hi20 as i32) << 12));
        }
        PatchKind::AbsLo12 => {
            let hi20 = (((target as i64) + 0x800) >> 12) & 0xF_FFFF;
            let lo12 = target as i64 - (hi20 << 12);
            write_word(text, text_offset, word.with_imm_i(lo12 as i32));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use rv32i_image::Relocation;

    fn addi_zero(imm: i32) -> u32 {
        rv32i_isa::encode_i(
            rv32i_isa::descriptor_for(rv32i_isa::Mnemonic::Addi),
            rv32i_isa::Reg(1),
            rv32i_isa::Reg::ZERO,
            imm,
        )
        .unwrap()
        .raw()
    }

    #[test]
    fn two_units_concatenate_text_and_data() {
        let mut a = Program::new();
        a.text = addi_zero(0).to_le_bytes().to_vec();
        a.data = vec![1];
        let mut b = Program::new();
        b.text = addi_zero(0).to_le_bytes().to_vec();
        b.data = vec![2];

        let linked = link(vec![a, b]).unwrap();
        assert_eq!(linked.text.len(), 8);
        assert_eq!(linked.data, vec![1, 2]);
    }

    #[test]
    fn duplicate_global_is_a_link_error() {
        let mut a = Program::new();
        a.symbols.insert("main".into(), Symbol { segment: SymbolSegment::Text, offset: 0 });
        a.globals.insert("main".into());
        a.text = vec![0; 4];
        let mut b = Program::new();
        b.symbols.insert("main".into(), Symbol { segment: SymbolSegment::Text, offset: 0 });
        b.globals.insert("main".into());
        b.text = vec![0; 4];

        assert_eq!(
            link(vec![a, b]).unwrap_err(),
            LinkError::DuplicateGlobal("main".into())
        );
    }

    #[test]
    fn unresolved_symbol_is_a_link_error() {
        let mut a = Program::new();
        a.text = vec![0; 4];
        a.relocations.push(Relocation {
            text_offset: 0,
            kind: PatchKind::JumpPc20,
            symbol: "nowhere".into(),
        });
        assert_eq!(
            link(vec![a]).unwrap_err(),
            LinkError::UnresolvedSymbol("nowhere".into())
        );
    }

    #[test]
    fn cross_unit_branch_resolves_against_global_table() {
        // Unit A jumps to "target", defined and exported by unit B.
        let mut a = Program::new();
        a.text = addi_zero(0).to_le_bytes().to_vec();
        a.relocations.push(Relocation {
            text_offset: 0,
            kind: PatchKind::JumpPc20,
            symbol: "target".into(),
        });

        let mut b = Program::new();
        b.text = addi_zero(0).to_le_bytes().to_vec();
        b.symbols.insert("target".into(), Symbol { segment: SymbolSegment::Text, offset: 0 });
        b.globals.insert("target".into());

        let linked = link(vec![a, b]).unwrap();
        let word = Word::new(u32::from_le_bytes(linked.text[0..4].try_into().unwrap()));
        // unit B's text starts right after unit A's (4 bytes in).
        assert_eq!(word.imm_j(), 4);
    }

    #[test]
    fn entry_defaults_to_main_when_declared() {
        let mut a = Program::new();
        a.text = vec![0; 8];
        a.symbols.insert("main".into(), Symbol { segment: SymbolSegment::Text, offset: 4 });
        a.globals.insert("main".into());
        let linked = link(vec![a]).unwrap();
        assert_eq!(linked.entry_offset, 4);
    }

    #[test]
    fn entry_defaults_to_zero_without_main() {
        let mut a = Program::new();
        a.text = vec![0; 4];
        let linked = link(vec![a]).unwrap();
        assert_eq!(linked.entry_offset, 0);
    }
}
