//! The semantic action of every RV32I instruction. Mirrors the shape of
//! the teacher's `tick()` (`processor/logic.rs`): dispatch on the decoded
//! word, compute with `Wrapping` arithmetic so overflow wraps instead of
//! panicking, and report what happened instead of mutating blindly so the
//! caller can both apply the effect and log an undo [`Diff`].

use std::num::Wrapping;

use rv32i_isa::{dispatch, Format, Mnemonic, Word};

use crate::diff::{Diff, StepDiff};
use crate::error::RuntimeError;
use crate::sink::OutputSink;
use crate::state::ProcessorState;

/// What the instruction just executed asks the run loop to do next.
pub enum StepOutcome {
    Continue,
    Exited(i32),
}

fn write_reg(state: &mut ProcessorState, diffs: &mut StepDiff, index: u8, value: u32) {
    let old = state.set_reg(index, value);
    if index != 0 {
        diffs.push(Diff::RegisterWrite {
            register: index,
            old_value: old,
        });
    }
}

fn set_pc(state: &mut ProcessorState, diffs: &mut StepDiff, new_pc: u32) {
    let old_pc = state.set_pc(new_pc);
    diffs.push(Diff::PcWrite { old_pc });
}

fn store(
    state: &mut ProcessorState,
    diffs: &mut StepDiff,
    addr: u32,
    size: u32,
    value: u32,
) -> Result<(), RuntimeError> {
    // Validate bounds and alignment before mutating anything, so a rejected
    // store never leaves a torn write behind.
    state.memory.read(addr, size)?;
    for i in 0..size {
        let byte_addr = addr + i;
        let byte = ((value >> (8 * i)) & 0xFF) as u8;
        let old = state.memory.write_byte_raw(byte_addr, byte)?;
        diffs.push(Diff::MemoryWrite {
            addr: byte_addr,
            old_byte: old,
        });
    }
    Ok(())
}

fn sign_extend_byte(v: u8) -> i32 {
    v as i8 as i32
}

fn sign_extend_half(v: u16) -> i32 {
    v as i16 as i32
}

/// Executes one decoded instruction, returning the diffs it made and
/// whether the run loop should keep going.
pub fn execute(
    state: &mut ProcessorState,
    sink: &mut dyn OutputSink,
    pc: u32,
    word: Word,
) -> Result<(StepDiff, StepOutcome), RuntimeError> {
    let descriptor = dispatch(word).ok_or(RuntimeError::DecodeFailure(word.raw()))?;
    let mut diffs = StepDiff::new();
    let next_pc = pc.wrapping_add(4);
    let mut outcome = StepOutcome::Continue;

    let rd = word.rd() as u8;
    let rs1 = word.rs1() as u8;
    let rs2 = word.rs2() as u8;

    let rs1v = Wrapping(state.reg(rs1) as i32);
    let rs2v = Wrapping(state.reg(rs2) as i32);
    let rs1u = Wrapping(state.reg(rs1));
    let rs2u = Wrapping(state.reg(rs2));

    // Default: fall through to the next instruction. Branch/jump cases
    // below set a different target before returning.
    let mut pc_set = false;

    match descriptor.format {
        Format::R => match descriptor.mnemonic {
            Mnemonic::Add => write_reg(state, &mut diffs, rd, (rs1v + rs2v).0 as u32),
            Mnemonic::Sub => write_reg(state, &mut diffs, rd, (rs1v - rs2v).0 as u32),
            Mnemonic::Sll => write_reg(state, &mut diffs, rd, (rs1u.0 << (rs2u.0 & 0x1F)) as u32),
            Mnemonic::Slt => write_reg(state, &mut diffs, rd, (rs1v.0 < rs2v.0) as u32),
            Mnemonic::Sltu => write_reg(state, &mut diffs, rd, (rs1u.0 < rs2u.0) as u32),
            Mnemonic::Xor => write_reg(state, &mut diffs, rd, (rs1u.0 ^ rs2u.0) as u32),
            Mnemonic::Srl => write_reg(state, &mut diffs, rd, rs1u.0 >> (rs2u.0 & 0x1F)),
            Mnemonic::Sra => write_reg(state, &mut diffs, rd, (rs1v.0 >> (rs2u.0 & 0x1F)) as u32),
            Mnemonic::Or => write_reg(state, &mut diffs, rd, (rs1u.0 | rs2u.0) as u32),
            Mnemonic::And => write_reg(state, &mut diffs, rd, (rs1u.0 & rs2u.0) as u32),
            _ => unreachable!("descriptor table assigns R-format only to R mnemonics"),
        },

        Format::I => {
            let imm = Wrapping(word.imm_i());
            match descriptor.mnemonic {
                Mnemonic::Addi => write_reg(state, &mut diffs, rd, (rs1v + imm).0 as u32),
                Mnemonic::Slti => write_reg(state, &mut diffs, rd, (rs1v.0 < imm.0) as u32),
                Mnemonic::Sltiu => {
                    write_reg(state, &mut diffs, rd, (rs1u.0 < imm.0 as u32) as u32)
                }
                Mnemonic::Xori => write_reg(state, &mut diffs, rd, (rs1u.0 ^ imm.0 as u32) as u32),
                Mnemonic::Ori => write_reg(state, &mut diffs, rd, (rs1u.0 | imm.0 as u32) as u32),
                Mnemonic::Andi => write_reg(state, &mut diffs, rd, (rs1u.0 & imm.0 as u32) as u32),
                Mnemonic::Jalr => {
                    let target = ((rs1u.0 as i32).wrapping_add(imm.0) as u32) & !1u32;
                    write_reg(state, &mut diffs, rd, next_pc);
                    set_pc(state, &mut diffs, target);
                    pc_set = true;
                }
                Mnemonic::Lb | Mnemonic::Lh | Mnemonic::Lw | Mnemonic::Lbu | Mnemonic::Lhu => {
                    let addr = (rs1u.0 as i32).wrapping_add(imm.0) as u32;
                    let value = match descriptor.mnemonic {
                        Mnemonic::Lb => sign_extend_byte(state.memory.read(addr, 1)? as u8) as u32,
                        Mnemonic::Lbu => state.memory.read(addr, 1)?,
                        Mnemonic::Lh => {
                            sign_extend_half(state.memory.read(addr, 2)? as u16) as u32
                        }
                        Mnemonic::Lhu => state.memory.read(addr, 2)?,
                        Mnemonic::Lw => state.memory.read(addr, 4)?,
                        _ => unreachable!(),
                    };
                    write_reg(state, &mut diffs, rd, value);
                }
                Mnemonic::FenceI | Mnemonic::Fence => {}
                Mnemonic::Ecall => {
                    outcome = exec_ecall(state, sink, &mut diffs)?;
                }
                _ => unreachable!("descriptor table assigns I-format only to I mnemonics"),
            }
        }

        Format::IShift => {
            let shamt = word.shamt();
            match descriptor.mnemonic {
                Mnemonic::Slli => write_reg(state, &mut diffs, rd, rs1u.0 << shamt),
                Mnemonic::Srli => write_reg(state, &mut diffs, rd, rs1u.0 >> shamt),
                Mnemonic::Srai => write_reg(state, &mut diffs, rd, (rs1v.0 >> shamt) as u32),
                _ => unreachable!("descriptor table assigns IShift-format only to shift mnemonics"),
            }
        }

        Format::S => {
            let imm = word.imm_s();
            let addr = (rs1u.0 as i32).wrapping_add(imm) as u32;
            let value = rs2u.0;
            match descriptor.mnemonic {
                Mnemonic::Sb => store(state, &mut diffs, addr, 1, value)?,
                Mnemonic::Sh => store(state, &mut diffs, addr, 2, value)?,
                Mnemonic::Sw => store(state, &mut diffs, addr, 4, value)?,
                _ => unreachable!("descriptor table assigns S-format only to store mnemonics"),
            }
        }

        Format::B => {
            let taken = match descriptor.mnemonic {
                Mnemonic::Beq => rs1v.0 == rs2v.0,
                Mnemonic::Bne => rs1v.0 != rs2v.0,
                Mnemonic::Blt => rs1v.0 < rs2v.0,
                Mnemonic::Bge => rs1v.0 >= rs2v.0,
                Mnemonic::Bltu => rs1u.0 < rs2u.0,
                Mnemonic::Bgeu => rs1u.0 >= rs2u.0,
                _ => unreachable!("descriptor table assigns B-format only to branch mnemonics"),
            };
            if taken {
                let target = (pc as i32).wrapping_add(word.imm_b()) as u32;
                set_pc(state, &mut diffs, target);
                pc_set = true;
            }
        }

        Format::U => {
            let imm = word.imm_u();
            match descriptor.mnemonic {
                Mnemonic::Lui => write_reg(state, &mut diffs, rd, imm as u32),
                Mnemonic::Auipc => {
                    write_reg(state, &mut diffs, rd, (pc as i32).wrapping_add(imm) as u32)
                }
                _ => unreachable!("descriptor table assigns U-format only to U mnemonics"),
            }
        }

        Format::J => {
            let target = (pc as i32).wrapping_add(word.imm_j()) as u32;
            write_reg(state, &mut diffs, rd, next_pc);
            set_pc(state, &mut diffs, target);
            pc_set = true;
        }
    }

    if !pc_set {
        set_pc(state, &mut diffs, next_pc);
    }

    Ok((diffs, outcome))
}

// Venus-style ecall dispatch on a7/x17 (spec.md §4.1): print_int(1),
// print_string(4), sbrk(9), exit(10), print_char(11), exit2(17).
fn exec_ecall(
    state: &mut ProcessorState,
    sink: &mut dyn OutputSink,
    diffs: &mut StepDiff,
) -> Result<StepOutcome, RuntimeError> {
    let code = state.reg(17);
    log::debug!("ecall a7={code} a0=0x{:08x}", state.reg(10));
    match code {
        1 => {
            sink.print_int(state.reg(10) as i32);
            Ok(StepOutcome::Continue)
        }
        4 => {
            let mut addr = state.reg(10);
            let mut bytes = Vec::new();
            loop {
                let byte = state.memory.read(addr, 1)? as u8;
                if byte == 0 {
                    break;
                }
                bytes.push(byte);
                addr = addr.wrapping_add(1);
            }
            sink.print_string(&String::from_utf8_lossy(&bytes));
            Ok(StepOutcome::Continue)
        }
        9 => {
            let requested = state.reg(10);
            let old_len = state.memory.heap_len();
            state.memory.grow_heap(requested)?;
            diffs.push(Diff::HeapPointerWrite { old_len });
            write_reg(
                state,
                diffs,
                10,
                crate::constants::HEAP_BEGIN.wrapping_add(old_len),
            );
            Ok(StepOutcome::Continue)
        }
        10 => Ok(StepOutcome::Exited(0)),
        11 => {
            let ch = char::from_u32(state.reg(10)).unwrap_or('\u{FFFD}');
            sink.print_char(ch);
            Ok(StepOutcome::Continue)
        }
        17 => Ok(StepOutcome::Exited(state.reg(10) as i32)),
        other => Err(RuntimeError::UnknownEnvironmentCall(other)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;
    use crate::sink::BufferSink;
    use rv32i_isa::{descriptor_for, encode_i, encode_r, Mnemonic, Reg};

    fn fresh_state() -> ProcessorState {
        ProcessorState::new(Memory::new(vec![0; 16], Vec::new()), 0)
    }

    #[test]
    fn add_writes_sum_and_advances_pc() {
        let mut state = fresh_state();
        state.set_reg(1, 3);
        state.set_reg(2, 4);
        let word = encode_r(descriptor_for(Mnemonic::Add), Reg(3), Reg(1), Reg(2));
        let mut sink = BufferSink::new();
        let (_diffs, outcome) = execute(&mut state, &mut sink, 0, word).unwrap();
        assert_eq!(state.reg(3), 7);
        assert_eq!(state.pc(), 4);
        assert!(matches!(outcome, StepOutcome::Continue));
    }

    #[test]
    fn addi_to_x0_is_a_nop() {
        let mut state = fresh_state();
        let word = encode_i(descriptor_for(Mnemonic::Addi), Reg(0), Reg(0), 5).unwrap();
        let mut sink = BufferSink::new();
        let (diffs, _) = execute(&mut state, &mut sink, 0, word).unwrap();
        assert_eq!(state.reg(0), 0);
        assert!(diffs.iter().all(|d| !matches!(d, Diff::RegisterWrite { register: 0, .. })));
    }

    #[test]
    fn ecall_print_int_reaches_sink() {
        let mut state = fresh_state();
        state.set_reg(17, 1);
        state.set_reg(10, 42);
        let word = encode_i(descriptor_for(Mnemonic::Ecall), Reg(0), Reg(0), 0).unwrap();
        let mut sink = BufferSink::new();
        execute(&mut state, &mut sink, 0, word).unwrap();
        assert_eq!(sink.contents(), "42");
    }

    #[test]
    fn unknown_ecall_is_rejected() {
        let mut state = fresh_state();
        state.set_reg(17, 999);
        let word = encode_i(descriptor_for(Mnemonic::Ecall), Reg(0), Reg(0), 0).unwrap();
        let mut sink = BufferSink::new();
        assert!(matches!(
            execute(&mut state, &mut sink, 0, word),
            Err(RuntimeError::UnknownEnvironmentCall(999))
        ));
    }
}
