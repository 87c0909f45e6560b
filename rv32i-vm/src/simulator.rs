//! The debugger-facing facade: single-step execution, reversible undo,
//! breakpoints, and the run state machine of spec.md §4.5.

use std::collections::HashSet;

use rv32i_image::LinkedProgram;
use rv32i_isa::Word;

use crate::constants::{STACK_BEGIN, TEXT_BEGIN};
use crate::diff::{Diff, StepDiff};
use crate::error::RuntimeError;
use crate::exec::{execute, StepOutcome};
use crate::memory::Memory;
use crate::sink::OutputSink;
use crate::state::ProcessorState;

/// `sp` (`x2`).
const REG_SP: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Ready,
    RunningBatch,
    HaltedDone,
    HaltedAtBreakpoint,
    Errored,
}

pub struct Simulator {
    state: ProcessorState,
    sink: Box<dyn OutputSink>,
    undo_log: Vec<StepDiff>,
    breakpoints: HashSet<u32>,
    run_state: RunState,
    exit_code: Option<i32>,
    last_error: Option<RuntimeError>,
}

impl Simulator {
    /// Loads `linked` into a fresh processor state (spec.md §4.5): text and
    /// data are copied into their segments, `sp` starts at the top of the
    /// stack, `gp` is left at zero (no `.option norelax`-style global
    /// pointer relaxation is modeled, see SPEC_FULL.md §9), and `pc` starts
    /// at the linker-resolved entry instruction.
    pub fn new(linked: LinkedProgram, sink: Box<dyn OutputSink>) -> Simulator {
        let memory = Memory::new(linked.text, linked.data);
        let mut state = ProcessorState::new(memory, TEXT_BEGIN + linked.entry_offset);
        state.set_reg(REG_SP, STACK_BEGIN);
        Simulator::from_state(state, sink)
    }

    /// Builds a simulator directly from a [`ProcessorState`], bypassing the
    /// `sp`/`pc` seeding `Simulator::new` does for a freshly linked program.
    /// Used by tests that construct small hand-written memories.
    pub fn from_state(state: ProcessorState, sink: Box<dyn OutputSink>) -> Simulator {
        Simulator {
            state,
            sink,
            undo_log: Vec::new(),
            breakpoints: HashSet::new(),
            run_state: RunState::Ready,
            exit_code: None,
            last_error: None,
        }
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_done(&self) -> bool {
        matches!(
            self.run_state,
            RunState::HaltedDone | RunState::HaltedAtBreakpoint | RunState::Errored
        )
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn last_error(&self) -> Option<RuntimeError> {
        self.last_error
    }

    pub fn get_pc(&self) -> u32 {
        self.state.pc()
    }

    pub fn get_reg(&self, index: u8) -> u32 {
        self.state.reg(index)
    }

    /// Sets a register and records it on the undo log, as if an
    /// instruction had written it.
    pub fn set_reg(&mut self, index: u8, value: u32) {
        let old = self.state.set_reg(index, value);
        if index != 0 {
            self.undo_log.push(vec![Diff::RegisterWrite {
                register: index,
                old_value: old,
            }]);
        }
    }

    /// Sets a register outside the undo log, for seeding initial state
    /// (argv, stack pointer) before execution begins.
    pub fn set_reg_no_undo(&mut self, index: u8, value: u32) {
        self.state.set_reg(index, value);
    }

    pub fn load_byte(&self, addr: u32) -> u8 {
        self.state.memory.peek_byte(addr)
    }

    pub fn load_word(&self, addr: u32) -> u32 {
        self.state.memory.peek_word(addr)
    }

    pub fn toggle_breakpoint_at(&mut self, addr: u32) {
        if !self.breakpoints.remove(&addr) {
            self.breakpoints.insert(addr);
        }
    }

    pub fn at_breakpoint(&self) -> bool {
        self.breakpoints.contains(&self.state.pc())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_log.is_empty()
    }

    /// Executes exactly one instruction. No-op once the simulator has
    /// halted or errored — callers should check [`Simulator::is_done`]
    /// first if they need to distinguish "didn't run" from "ran".
    pub fn step(&mut self) {
        if self.is_done() {
            return;
        }

        let pc = self.state.pc();
        let fetch = self.state.memory.fetch_instruction(pc);
        let word = match fetch {
            Ok(raw) => Word::new(raw),
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        match execute(&mut self.state, self.sink.as_mut(), pc, word) {
            Ok((diffs, StepOutcome::Continue)) => {
                self.undo_log.push(diffs);
                if self.at_breakpoint() {
                    self.run_state = RunState::HaltedAtBreakpoint;
                } else if self.run_state == RunState::Ready {
                    self.run_state = RunState::Ready;
                }
            }
            Ok((diffs, StepOutcome::Exited(code))) => {
                self.undo_log.push(diffs);
                self.exit_code = Some(code);
                self.run_state = RunState::HaltedDone;
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: RuntimeError) {
        log::debug!("step failed at pc 0x{:08x}: {error}", self.state.pc());
        self.last_error = Some(error);
        self.run_state = RunState::Errored;
    }

    /// Runs until halt, error, or a breakpoint is reached. If already
    /// stopped at a breakpoint, takes one step first so `run` after hitting
    /// a breakpoint makes forward progress instead of re-triggering it
    /// immediately (spec.md §4.5).
    pub fn run(&mut self) {
        if self.run_state == RunState::HaltedAtBreakpoint {
            self.step();
        }
        self.run_state = RunState::RunningBatch;
        while !self.is_done() {
            self.step();
        }
    }

    /// Reverses the most recent `step`, restoring every diff it recorded.
    /// No-op if there is nothing to undo.
    pub fn undo(&mut self) {
        let Some(diffs) = self.undo_log.pop() else {
            return;
        };
        for diff in diffs.into_iter().rev() {
            match diff {
                Diff::RegisterWrite { register, old_value } => {
                    self.state.set_reg(register, old_value);
                }
                Diff::PcWrite { old_pc } => {
                    self.state.set_pc(old_pc);
                }
                Diff::MemoryWrite { addr, old_byte } => {
                    let _ = self.state.memory.write_byte_raw(addr, old_byte);
                }
                Diff::HeapPointerWrite { old_len } => {
                    self.state.memory.shrink_heap(old_len);
                }
            }
        }
        if self.run_state != RunState::Ready {
            self.run_state = RunState::Ready;
            self.exit_code = None;
            self.last_error = None;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;
    use rv32i_isa::{descriptor_for, encode_i, Mnemonic, Reg};

    fn addi(rd: u8, rs1: u8, imm: i32) -> u32 {
        encode_i(descriptor_for(Mnemonic::Addi), Reg(rd), Reg(rs1), imm)
            .unwrap()
            .raw()
    }

    fn little_endian_words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn step_then_undo_restores_register_and_pc() {
        let text = little_endian_words(&[addi(1, 0, 5)]);
        let state = ProcessorState::new(Memory::new(text, Vec::new()), 0);
        let mut sim = Simulator::from_state(state, Box::new(crate::sink::NullSink));

        sim.step();
        assert_eq!(sim.get_reg(1), 5);
        assert_eq!(sim.get_pc(), 4);

        sim.undo();
        assert_eq!(sim.get_reg(1), 0);
        assert_eq!(sim.get_pc(), 0);
        assert!(!sim.can_undo());
    }

    #[test]
    fn breakpoint_halts_run_and_next_run_continues() {
        let text = little_endian_words(&[addi(1, 0, 1), addi(1, 1, 1), addi(1, 1, 1)]);
        let state = ProcessorState::new(Memory::new(text, Vec::new()), 0);
        let mut sim = Simulator::from_state(state, Box::new(crate::sink::NullSink));
        sim.toggle_breakpoint_at(4);

        sim.run();
        assert_eq!(sim.run_state(), RunState::HaltedAtBreakpoint);
        assert_eq!(sim.get_reg(1), 1);

        sim.run();
        assert_eq!(sim.get_reg(1), 3);
    }

    #[test]
    fn undoing_sbrk_restores_the_heap_pointer_for_the_next_sbrk() {
        use crate::constants::HEAP_BEGIN;

        let ecall = encode_i(descriptor_for(Mnemonic::Ecall), Reg(0), Reg(0), 0)
            .unwrap()
            .raw();
        let text = little_endian_words(&[ecall, ecall]);
        let state = ProcessorState::new(Memory::new(text, Vec::new()), 0);
        let mut sim = Simulator::from_state(state, Box::new(crate::sink::NullSink));
        sim.set_reg(17, 9);
        sim.set_reg(10, 16);

        sim.step();
        assert_eq!(sim.get_reg(10), HEAP_BEGIN);

        sim.undo();
        sim.set_reg(17, 9);
        sim.set_reg(10, 16);
        sim.step();
        assert_eq!(sim.get_reg(10), HEAP_BEGIN);
    }

    #[test]
    fn decode_failure_errors_without_advancing() {
        let state = ProcessorState::new(Memory::new(vec![0xFF, 0xFF, 0xFF, 0xFF], Vec::new()), 0);
        let mut sim = Simulator::from_state(state, Box::new(crate::sink::NullSink));
        sim.step();
        assert_eq!(sim.run_state(), RunState::Errored);
        assert!(matches!(sim.last_error(), Some(RuntimeError::DecodeFailure(_))));
    }
}
