//! Per-unit symbol table: labels defined in `.text`/`.data`, and labels a
//! unit references but does not define (resolved later by `rv32i-link`, or
//! left for `.globl` visibility).

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolSegment {
    Text,
    Data,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub segment: SymbolSegment,
    /// Offset from the start of `segment` within the defining unit.
    pub offset: u32,
}

pub type SymbolTable = HashMap<String, Symbol>;
