//! Every mutation a single `step` makes is recorded as a [`Diff`] before it
//! is applied, so `Simulator::undo` can play the list back in reverse.
//! Mirrors the teacher's approach of returning a `TickResult` out of the
//! interpreter, except here the state-machine outcome and the undo log are
//! orthogonal: a step can both advance the pc and be undoable.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diff {
    /// `register` is never 0: writes to `x0` are never recorded, matching
    /// the teacher's `write_i`/`write_u` no-op-on-register-zero behavior.
    RegisterWrite { register: u8, old_value: u32 },
    PcWrite { old_pc: u32 },
    MemoryWrite { addr: u32, old_byte: u8 },
    HeapPointerWrite { old_len: u32 },
}

/// All diffs produced by one `step()`, applied to undo it in one call.
pub type StepDiff = Vec<Diff>;
