//! Containers shared between the assembler, the linker and the
//! simulator: a single unit's [`Program`], the [`Relocation`]s it leaves
//! outstanding, and the linker's final [`LinkedProgram`].
//!
//! Generalizes the teacher's `vexfile` crate (which only serialized a
//! finished data+instructions pair) to also carry the symbol table and
//! relocation list a multi-unit linker needs.

pub mod constants;
mod linked_program;
mod program;
mod relocation;
mod source_map;
mod symbol;

pub use linked_program::LinkedProgram;
pub use program::Program;
pub use relocation::{PatchKind, Relocation};
pub use source_map::{SourceMap, SourceMapItem};
pub use symbol::{Symbol, SymbolSegment, SymbolTable};
