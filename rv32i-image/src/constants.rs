//! Memory segment layout (spec.md §6), shared by the linker (address
//! assignment) and the simulator (segment bounds). Adjustable at build
//! time by editing these constants; nothing elsewhere hardcodes an address.

pub const TEXT_BEGIN: u32 = 0x0000_0000;
pub const STATIC_BEGIN: u32 = 0x1000_0000;
pub const HEAP_BEGIN: u32 = 0x1004_0000;
pub const STACK_BEGIN: u32 = 0x7FFF_FFF0;

/// Size of the reserved stack region, `[STACK_BEGIN - STACK_SIZE, STACK_BEGIN)`.
pub const STACK_SIZE: u32 = 0x0001_0000;

/// `sbrk` refuses to grow the heap past this address, leaving headroom
/// below the stack region (spec.md §4.1's "safe ceiling").
pub const HEAP_CEILING: u32 = STACK_BEGIN - STACK_SIZE - 0x0001_0000;

/// Maximum size of the `.data` segment a single linked program may declare
/// before it would collide with the heap.
pub const STATIC_LIMIT: u32 = HEAP_BEGIN - STATIC_BEGIN;
