//! Runtime errors (spec.md §7): fatal per-step, surfaced to the host, and
//! leaving processor state at the faulting pc so `undo` remains consistent.

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("fetch at pc 0x{0:08x} is outside the text segment")]
    FetchOutsideText(u32),

    #[error("no instruction decodes from word 0x{0:08x}")]
    DecodeFailure(u32),

    #[error("environment call code {0} is not recognized")]
    UnknownEnvironmentCall(u32),

    #[error("access to address 0x{addr:08x} ({size} bytes) requires {align}-byte alignment")]
    UnalignedAccess { addr: u32, size: u32, align: u32 },

    #[error("address 0x{addr:08x} ({size} bytes) is outside any defined memory segment")]
    OutOfSegment { addr: u32, size: u32 },

    #[error("sbrk would grow the heap past its safe ceiling")]
    HeapOverflow,
}
