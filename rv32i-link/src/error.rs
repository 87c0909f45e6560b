//! Link errors (spec.md §7): fatal, unlike the assembler's accumulated
//! errors — the first one found aborts `link`, since there is no useful
//! partial `LinkedProgram` to return once an address can't be assigned.

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("symbol \"{0}\" is not defined in any linked unit")]
    UnresolvedSymbol(String),

    #[error("symbol \"{0}\" is declared .globl in more than one unit")]
    DuplicateGlobal(String),

    #[error("relocation for \"{symbol}\" at text offset {text_offset} does not fit its field: target is 0x{target:08x}")]
    RelocationOverflow {
        symbol: String,
        text_offset: u32,
        target: u32,
    },
}
