//! A reversible, single-step RV32I interpreter (C3/C6): processor state,
//! segmented memory, the `ecall` surface, and the breakpoint/undo-aware
//! [`Simulator`] the debugger drives.

pub mod constants;
mod diff;
mod error;
mod exec;
mod memory;
mod sink;
mod simulator;
mod state;

pub use diff::Diff;
pub use error::RuntimeError;
pub use memory::Memory;
pub use sink::{BufferSink, NullSink, OutputSink};
pub use simulator::{RunState, Simulator};
pub use state::ProcessorState;
