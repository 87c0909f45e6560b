//! Pseudoinstruction expansion: a convenience mnemonic maps onto one or
//! more real RV32I mnemonics (spec.md's ASM module). Each pseudo always
//! expands to a fixed instruction count for a given line so the first
//! assembler pass can size the text segment without yet knowing any
//! label's address — the one exception, `li`, is fixed too, because its
//! size depends only on its own immediate operand (known immediately),
//! never on a label.

use rv32i_isa::Reg;

use crate::error::AssembleError;
use crate::operand::Operand;

/// One real instruction produced by expanding a pseudoinstruction.
/// `__la_hi`/`__la_lo`/`__la_lo_jalr` are assembler-internal mnemonics
/// consumed only by the two-pass driver (`assembler.rs`): they carry a
/// label operand through to relocation emission for the `la`/`call`
/// absolute-address idiom, and never reach `rv32i_isa::dispatch`.
pub struct RealInstruction {
    pub mnemonic: &'static str,
    pub args: Vec<Operand>,
}

fn real(mnemonic: &'static str, args: Vec<Operand>) -> RealInstruction {
    RealInstruction { mnemonic, args }
}

fn fits_i12(value: i64) -> bool {
    (-2048..2048).contains(&value)
}

/// Expands a pseudoinstruction mnemonic into one or more real ones.
/// Returns `Ok(None)` when `mnemonic` isn't a pseudo at all, so the
/// caller falls through to the ordinary ISA descriptor lookup.
pub fn expand(
    mnemonic: &str,
    args: &[Operand],
    line: u32,
) -> Result<Option<Vec<RealInstruction>>, AssembleError> {
    let zero = Operand::Register(Reg::ZERO);
    let ra = Operand::Register(Reg(1));

    let expansion = match mnemonic {
        "nop" => vec![real("addi", vec![zero.clone(), zero.clone(), Operand::Immediate(0)])],

        "mv" => {
            let [rd, rs] = two(args, line)?;
            vec![real("addi", vec![rd, rs, Operand::Immediate(0)])]
        }

        "not" => {
            let [rd, rs] = two(args, line)?;
            vec![real("xori", vec![rd, rs, Operand::Immediate(-1)])]
        }

        "neg" => {
            let [rd, rs] = two(args, line)?;
            vec![real("sub", vec![rd, zero.clone(), rs])]
        }

        "seqz" => {
            let [rd, rs] = two(args, line)?;
            vec![real("sltiu", vec![rd, rs, Operand::Immediate(1)])]
        }

        "snez" => {
            let [rd, rs] = two(args, line)?;
            vec![real("sltu", vec![rd, zero.clone(), rs])]
        }

        "sltz" => {
            let [rd, rs] = two(args, line)?;
            vec![real("slt", vec![rd, rs, zero.clone()])]
        }

        "sgtz" => {
            let [rd, rs] = two(args, line)?;
            vec![real("slt", vec![rd, zero.clone(), rs])]
        }

        "sgt" => {
            let [rd, rs1, rs2] = three(args, line)?;
            vec![real("slt", vec![rd, rs2, rs1])]
        }

        "sge" => {
            let [rd, rs1, rs2] = three(args, line)?;
            vec![
                real("slt", vec![rd.clone(), rs1, rs2]),
                real("xori", vec![rd.clone(), rd, Operand::Immediate(1)]),
            ]
        }

        "li" => {
            let [rd, imm] = two(args, line)?;
            let value = imm.as_immediate(line)?;
            if fits_i12(value) {
                vec![real("addi", vec![rd, zero.clone(), Operand::Immediate(value)])]
            } else {
                let hi20 = ((value + 0x800) >> 12) & 0xF_FFFF;
                let lo12 = value - (hi20 << 12);
                vec![
                    real("lui", vec![rd.clone(), Operand::Immediate(hi20)]),
                    real("addi", vec![rd.clone(), rd, Operand::Immediate(lo12)]),
                ]
            }
        }

        "la" => {
            let [rd, label] = two(args, line)?;
            vec![
                real("__la_hi", vec![rd.clone(), label.clone()]),
                real("__la_lo", vec![rd.clone(), rd, label]),
            ]
        }

        "call" => {
            let [label] = one(args, line)?;
            vec![
                real("__la_hi", vec![ra.clone(), label.clone()]),
                real("__la_lo_jalr", vec![ra.clone(), ra, label]),
            ]
        }

        "j" => {
            let [label] = one(args, line)?;
            vec![real("jal", vec![zero.clone(), label])]
        }

        "jal" if args.len() == 1 => {
            let [label] = one(args, line)?;
            vec![real("jal", vec![ra, label])]
        }

        "jr" => {
            let [rs] = one(args, line)?;
            let base = rs.as_register(line)?;
            vec![real("jalr", vec![zero.clone(), Operand::Memory { offset: 0, base }])]
        }

        "jalr" if args.len() == 1 => {
            let [rs] = one(args, line)?;
            let base = rs.as_register(line)?;
            vec![real("jalr", vec![ra, Operand::Memory { offset: 0, base }])]
        }

        "ret" => vec![real(
            "jalr",
            vec![zero.clone(), Operand::Memory { offset: 0, base: Reg(1) }],
        )],

        "beqz" => {
            let [rs, label] = two(args, line)?;
            vec![real("beq", vec![rs, zero.clone(), label])]
        }
        "bnez" => {
            let [rs, label] = two(args, line)?;
            vec![real("bne", vec![rs, zero.clone(), label])]
        }
        "blez" => {
            let [rs, label] = two(args, line)?;
            vec![real("bge", vec![zero.clone(), rs, label])]
        }
        "bgez" => {
            let [rs, label] = two(args, line)?;
            vec![real("bge", vec![rs, zero.clone(), label])]
        }
        "bltz" => {
            let [rs, label] = two(args, line)?;
            vec![real("blt", vec![rs, zero.clone(), label])]
        }
        "bgtz" => {
            let [rs, label] = two(args, line)?;
            vec![real("blt", vec![zero.clone(), rs, label])]
        }
        "ble" => {
            let [rs1, rs2, label] = three(args, line)?;
            vec![real("bge", vec![rs2, rs1, label])]
        }
        "bgt" => {
            let [rs1, rs2, label] = three(args, line)?;
            vec![real("blt", vec![rs2, rs1, label])]
        }
        "bleu" => {
            let [rs1, rs2, label] = three(args, line)?;
            vec![real("bgeu", vec![rs2, rs1, label])]
        }
        "bgtu" => {
            let [rs1, rs2, label] = three(args, line)?;
            vec![real("bltu", vec![rs2, rs1, label])]
        }

        _ => return Ok(None),
    };

    Ok(Some(expansion))
}

fn one(args: &[Operand], line: u32) -> Result<[Operand; 1], AssembleError> {
    arity(args, line, 1)?;
    Ok([args[0].clone()])
}

fn two(args: &[Operand], line: u32) -> Result<[Operand; 2], AssembleError> {
    arity(args, line, 2)?;
    Ok([args[0].clone(), args[1].clone()])
}

fn three(args: &[Operand], line: u32) -> Result<[Operand; 3], AssembleError> {
    arity(args, line, 3)?;
    Ok([args[0].clone(), args[1].clone(), args[2].clone()])
}

fn arity(args: &[Operand], line: u32, expected: usize) -> Result<(), AssembleError> {
    if args.len() != expected {
        Err(AssembleError::WrongOperandCount {
            line,
            mnemonic: "pseudoinstruction".to_owned(),
            expected,
            found: args.len(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nop_expands_to_addi_zero_zero_zero() {
        let expansion = expand("nop", &[], 1).unwrap().unwrap();
        assert_eq!(expansion.len(), 1);
        assert_eq!(expansion[0].mnemonic, "addi");
    }

    #[test]
    fn li_small_immediate_is_one_instruction() {
        let args = [Operand::Register(Reg(5)), Operand::Immediate(100)];
        let expansion = expand("li", &args, 1).unwrap().unwrap();
        assert_eq!(expansion.len(), 1);
    }

    #[test]
    fn li_large_immediate_is_two_instructions() {
        let args = [Operand::Register(Reg(5)), Operand::Immediate(0x1234_5678)];
        let expansion = expand("li", &args, 1).unwrap().unwrap();
        assert_eq!(expansion.len(), 2);
    }

    #[test]
    fn unknown_mnemonic_is_not_a_pseudo() {
        assert!(expand("add", &[], 1).unwrap().is_none());
    }
}
