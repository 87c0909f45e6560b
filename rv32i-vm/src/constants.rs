//! Memory segment layout (spec.md §6). Re-exported from `rv32i-image`,
//! which the linker also needs for address assignment, so both crates
//! agree on one set of constants.

pub use rv32i_image::constants::{
    HEAP_BEGIN, HEAP_CEILING, STACK_BEGIN, STACK_SIZE, STATIC_BEGIN, STATIC_LIMIT, TEXT_BEGIN,
};
