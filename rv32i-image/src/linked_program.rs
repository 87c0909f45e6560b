//! The output of `rv32i-link`: every unit's text and data concatenated at
//! fixed base addresses, all relocations patched, ready to load into
//! `rv32i-vm::Simulator`.

use std::collections::HashMap;

use crate::source_map::SourceMap;

#[derive(Clone, Debug, Default)]
pub struct LinkedProgram {
    pub text: Vec<u8>,
    pub data: Vec<u8>,
    /// Byte offset into `text` of the first instruction to execute.
    pub entry_offset: u32,
    pub source_map: SourceMap,
    /// Every global symbol's final offset into `text` or `data`, kept for
    /// the debugger (`break main`, symbol-aware disassembly).
    pub symbols: HashMap<String, u32>,
}
