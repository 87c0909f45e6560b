//! The ISA descriptor table (C1): the process-wide, immutable table of
//! every RV32I instruction's encoding, together with `dispatch` (decode)
//! and the numeric `encode_*`/`disassemble` helpers built on it.

use once_cell::sync::Lazy;

use crate::mnemonic::{Format, Mnemonic};
use crate::registers::Reg;
use crate::word::Word;

/// One entry of the ISA table: the bit pattern that identifies a mnemonic.
///
/// `funct3`/`funct7` are `None` when the format doesn't use that field to
/// discriminate (e.g. `jal`, `lui` need only the opcode).
#[derive(Clone, Copy, Debug)]
pub struct Descriptor {
    pub mnemonic: Mnemonic,
    pub format: Format,
    pub opcode: u32,
    pub funct3: Option<u32>,
    pub funct7: Option<u32>,
}

macro_rules! table {
    ($(($m:ident, $fmt:ident, $opcode:expr, $funct3:expr, $funct7:expr)),+ $(,)?) => {
        vec![$(Descriptor {
            mnemonic: Mnemonic::$m,
            format: Format::$fmt,
            opcode: $opcode,
            funct3: $funct3,
            funct7: $funct7,
        }),+]
    };
}

static TABLE: Lazy<Vec<Descriptor>> = Lazy::new(|| {
    table![
        // R-type: opcode 0110011, funct3/funct7 pick the operation.
        (Add,  R, 0b011_0011, Some(0b000), Some(0b000_0000)),
        (Sub,  R, 0b011_0011, Some(0b000), Some(0b010_0000)),
        (Sll,  R, 0b011_0011, Some(0b001), Some(0b000_0000)),
        (Slt,  R, 0b011_0011, Some(0b010), Some(0b000_0000)),
        (Sltu, R, 0b011_0011, Some(0b011), Some(0b000_0000)),
        (Xor,  R, 0b011_0011, Some(0b100), Some(0b000_0000)),
        (Srl,  R, 0b011_0011, Some(0b101), Some(0b000_0000)),
        (Sra,  R, 0b011_0011, Some(0b101), Some(0b010_0000)),
        (Or,   R, 0b011_0011, Some(0b110), Some(0b000_0000)),
        (And,  R, 0b011_0011, Some(0b111), Some(0b000_0000)),

        // I-type arithmetic/logic: opcode 0010011.
        (Addi,  I, 0b001_0011, Some(0b000), None),
        (Slti,  I, 0b001_0011, Some(0b010), None),
        (Sltiu, I, 0b001_0011, Some(0b011), None),
        (Xori,  I, 0b001_0011, Some(0b100), None),
        (Ori,   I, 0b001_0011, Some(0b110), None),
        (Andi,  I, 0b001_0011, Some(0b111), None),

        // I-type immediate shifts: same opcode, funct7 picks logical vs. arithmetic.
        (Slli, IShift, 0b001_0011, Some(0b001), Some(0b000_0000)),
        (Srli, IShift, 0b001_0011, Some(0b101), Some(0b000_0000)),
        (Srai, IShift, 0b001_0011, Some(0b101), Some(0b010_0000)),

        // Loads: opcode 0000011.
        (Lb,  I, 0b000_0011, Some(0b000), None),
        (Lh,  I, 0b000_0011, Some(0b001), None),
        (Lw,  I, 0b000_0011, Some(0b010), None),
        (Lbu, I, 0b000_0011, Some(0b100), None),
        (Lhu, I, 0b000_0011, Some(0b101), None),

        // Stores: opcode 0100011.
        (Sb, S, 0b010_0011, Some(0b000), None),
        (Sh, S, 0b010_0011, Some(0b001), None),
        (Sw, S, 0b010_0011, Some(0b010), None),

        // Branches: opcode 1100011.
        (Beq,  B, 0b110_0011, Some(0b000), None),
        (Bne,  B, 0b110_0011, Some(0b001), None),
        (Blt,  B, 0b110_0011, Some(0b100), None),
        (Bge,  B, 0b110_0011, Some(0b101), None),
        (Bltu, B, 0b110_0011, Some(0b110), None),
        (Bgeu, B, 0b110_0011, Some(0b111), None),

        // Jumps.
        (Jal,  J, 0b110_1111, None, None),
        (Jalr, I, 0b110_0111, Some(0b000), None),

        // Upper-immediate.
        (Lui,   U, 0b011_0111, None, None),
        (Auipc, U, 0b001_0111, None, None),

        // Misc: no architectural state effect beyond the environment call.
        (Fence,  I, 0b000_1111, Some(0b000), None),
        (FenceI, I, 0b000_1111, Some(0b001), None),
        (Ecall,  I, 0b111_0011, Some(0b000), None),
    ]
});

/// Finds the unique descriptor whose required fields match every bit of
/// `word`. Checked in order of specificity: opcode, then funct3, then
/// funct7. Returns `None` on decode failure (spec.md §7's `DecodeFailure`).
pub fn dispatch(word: Word) -> Option<&'static Descriptor> {
    TABLE.iter().find(|d| {
        d.opcode == word.opcode()
            && d.funct3.map_or(true, |f| f == word.funct3())
            && d.funct7.map_or(true, |f| f == word.funct7())
    })
}

/// Looks up the descriptor for a mnemonic (used by the assembler to encode).
pub fn descriptor_for(mnemonic: Mnemonic) -> &'static Descriptor {
    TABLE
        .iter()
        .find(|d| d.mnemonic == mnemonic)
        .expect("every Mnemonic has exactly one table entry")
}

#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("immediate {value} out of range for a {width}-bit field ({min}..={max})")]
    ImmediateOutOfRange {
        value: i64,
        width: u32,
        min: i64,
        max: i64,
    },
    #[error("branch/jump target offset {0} is not 2-byte aligned")]
    Misaligned(i32),
}

fn check_signed(value: i32, width: u32) -> Result<(), EncodeError> {
    let min = -(1i64 << (width - 1));
    let max = (1i64 << (width - 1)) - 1;
    let value64 = value as i64;
    if value64 < min || value64 > max {
        Err(EncodeError::ImmediateOutOfRange {
            value: value64,
            width,
            min,
            max,
        })
    } else {
        Ok(())
    }
}

pub fn encode_r(d: &Descriptor, rd: Reg, rs1: Reg, rs2: Reg) -> Word {
    Word::new(0)
        .with_opcode(d.opcode)
        .with_funct3(d.funct3.unwrap_or(0))
        .with_funct7(d.funct7.unwrap_or(0))
        .with_rd(rd.index() as u32)
        .with_rs1(rs1.index() as u32)
        .with_rs2(rs2.index() as u32)
}

pub fn encode_i(d: &Descriptor, rd: Reg, rs1: Reg, imm: i32) -> Result<Word, EncodeError> {
    check_signed(imm, 12)?;
    Ok(Word::new(0)
        .with_opcode(d.opcode)
        .with_funct3(d.funct3.unwrap_or(0))
        .with_rd(rd.index() as u32)
        .with_rs1(rs1.index() as u32)
        .with_imm_i(imm))
}

pub fn encode_i_shift(d: &Descriptor, rd: Reg, rs1: Reg, shamt: u32) -> Result<Word, EncodeError> {
    if shamt > 31 {
        return Err(EncodeError::ImmediateOutOfRange {
            value: shamt as i64,
            width: 5,
            min: 0,
            max: 31,
        });
    }
    let word = Word::new(0)
        .with_opcode(d.opcode)
        .with_funct3(d.funct3.unwrap_or(0))
        .with_funct7(d.funct7.unwrap_or(0))
        .with_rd(rd.index() as u32)
        .with_rs1(rs1.index() as u32);
    Ok(Word::new(word.raw() | (shamt << 20)))
}

pub fn encode_s(d: &Descriptor, rs1: Reg, rs2: Reg, imm: i32) -> Result<Word, EncodeError> {
    check_signed(imm, 12)?;
    Ok(Word::new(0)
        .with_opcode(d.opcode)
        .with_funct3(d.funct3.unwrap_or(0))
        .with_rs1(rs1.index() as u32)
        .with_rs2(rs2.index() as u32)
        .with_imm_s(imm))
}

pub fn encode_b(d: &Descriptor, rs1: Reg, rs2: Reg, imm: i32) -> Result<Word, EncodeError> {
    if imm % 2 != 0 {
        return Err(EncodeError::Misaligned(imm));
    }
    check_signed(imm, 13)?;
    Ok(Word::new(0)
        .with_opcode(d.opcode)
        .with_funct3(d.funct3.unwrap_or(0))
        .with_rs1(rs1.index() as u32)
        .with_rs2(rs2.index() as u32)
        .with_imm_b(imm))
}

/// `imm20` is the raw 20-bit field value (not pre-shifted). U-format takes
/// an unsigned 20-bit value, but also accepts a negative one reinterpreted
/// as the two's-complement 20-bit pattern, per spec.md §4.1 — so the valid
/// range spans both the signed and unsigned readings rather than just one.
pub fn encode_u(d: &Descriptor, rd: Reg, imm20: i32) -> Result<Word, EncodeError> {
    let min = -(1i64 << 19);
    let max = (1i64 << 20) - 1;
    let value64 = imm20 as i64;
    if value64 < min || value64 > max {
        return Err(EncodeError::ImmediateOutOfRange {
            value: value64,
            width: 20,
            min,
            max,
        });
    }
    let shifted = (imm20 as u32) << 12;
    Ok(Word::new(0)
        .with_opcode(d.opcode)
        .with_rd(rd.index() as u32)
        .with_imm_u(shifted as i32))
}

pub fn encode_j(d: &Descriptor, rd: Reg, imm: i32) -> Result<Word, EncodeError> {
    if imm % 2 != 0 {
        return Err(EncodeError::Misaligned(imm));
    }
    check_signed(imm, 21)?;
    Ok(Word::new(0)
        .with_opcode(d.opcode)
        .with_rd(rd.index() as u32)
        .with_imm_j(imm))
}

/// Renders `word` as canonical assembly text. Used for disassembly listings
/// and by the round-trip property in spec.md §8.
pub fn disassemble(word: Word) -> String {
    let Some(d) = dispatch(word) else {
        return format!(".word 0x{:08x}", word.raw());
    };

    let m = d.mnemonic.name();
    let rd = word.rd();
    let rs1 = word.rs1();
    let rs2 = word.rs2();

    match d.format {
        Format::R => format!("{} x{}, x{}, x{}", m, rd, rs1, rs2),
        Format::I => match d.mnemonic {
            // Loads and jalr take a memory operand, not a bare immediate.
            Mnemonic::Lb | Mnemonic::Lh | Mnemonic::Lw | Mnemonic::Lbu | Mnemonic::Lhu
            | Mnemonic::Jalr => format!("{} x{}, {}(x{})", m, rd, word.imm_i(), rs1),
            // No operands at all, matching the assembler's zero-arity forms.
            Mnemonic::Fence | Mnemonic::FenceI | Mnemonic::Ecall => m.to_owned(),
            _ => format!("{} x{}, x{}, {}", m, rd, rs1, word.imm_i()),
        },
        Format::IShift => format!("{} x{}, x{}, {}", m, rd, rs1, word.shamt()),
        Format::S => format!("{} x{}, {}(x{})", m, rs2, word.imm_s(), rs1),
        Format::B => format!("{} x{}, x{}, {}", m, rs1, rs2, word.imm_b()),
        Format::U => format!("{} x{}, 0x{:x}", m, rd, (word.imm_u() as u32) >> 12),
        Format::J => format!("{} x{}, {}", m, rd, word.imm_j()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mnemonic::Mnemonic;
    use crate::registers::Reg;

    #[test]
    fn dispatches_add() {
        // add x3, x1, x2 per spec.md's concrete scenario 1 and 6.
        let word = Word::new(0b0000000_00010_00001_000_00011_0110011);
        let d = dispatch(word).unwrap();
        assert_eq!(d.mnemonic, Mnemonic::Add);
    }

    #[test]
    fn add_sub_are_distinguished_by_funct7() {
        let add = encode_r(descriptor_for(Mnemonic::Add), Reg(3), Reg(1), Reg(2));
        let sub = encode_r(descriptor_for(Mnemonic::Sub), Reg(3), Reg(1), Reg(2));
        assert_eq!(dispatch(add).unwrap().mnemonic, Mnemonic::Add);
        assert_eq!(dispatch(sub).unwrap().mnemonic, Mnemonic::Sub);
    }

    #[test]
    fn i_immediate_round_trips_negative() {
        let word = encode_i(descriptor_for(Mnemonic::Addi), Reg(5), Reg(0), -1).unwrap();
        assert_eq!(word.imm_i(), -1);
    }

    #[test]
    fn branch_immediate_round_trips() {
        let word = encode_b(descriptor_for(Mnemonic::Beq), Reg(1), Reg(2), -16).unwrap();
        assert_eq!(word.imm_b(), -16);
    }

    #[test]
    fn jump_immediate_round_trips() {
        let word = encode_j(descriptor_for(Mnemonic::Jal), Reg(1), 1048574).unwrap();
        assert_eq!(word.imm_j(), 1048574);
    }

    #[test]
    fn upper_immediate_round_trips() {
        let word = encode_u(descriptor_for(Mnemonic::Lui), Reg(1), -1).unwrap();
        assert_eq!(word.imm_u(), -4096); // 0xFFFFF << 12 as i32
    }

    #[test]
    fn upper_immediate_accepts_the_full_unsigned_20_bit_range() {
        let word = encode_u(descriptor_for(Mnemonic::Lui), Reg(1), 0xFFFFF).unwrap();
        assert_eq!(word.imm_u(), -4096); // 0xFFFFF << 12 as i32, same bit pattern as -1
        assert!(encode_u(descriptor_for(Mnemonic::Lui), Reg(1), 0x80000).is_ok());
        assert!(encode_u(descriptor_for(Mnemonic::Lui), Reg(1), 0x100000).is_err());
    }

    #[test]
    fn out_of_range_immediate_is_rejected() {
        assert!(encode_i(descriptor_for(Mnemonic::Addi), Reg(1), Reg(0), 4096).is_err());
    }

    #[test]
    fn misaligned_branch_target_is_rejected() {
        assert!(encode_b(descriptor_for(Mnemonic::Beq), Reg(1), Reg(2), 3).is_err());
    }

    #[test]
    fn disassemble_matches_canonical_form() {
        let word = encode_r(descriptor_for(Mnemonic::Add), Reg(3), Reg(1), Reg(2));
        assert_eq!(disassemble(word), "add x3, x1, x2");
    }

    #[test]
    fn disassemble_renders_loads_and_jalr_as_memory_operands() {
        let lw = encode_i(descriptor_for(Mnemonic::Lw), Reg(5), Reg(2), 8).unwrap();
        assert_eq!(disassemble(lw), "lw x5, 8(x2)");
        let jalr = encode_i(descriptor_for(Mnemonic::Jalr), Reg(1), Reg(1), 0).unwrap();
        assert_eq!(disassemble(jalr), "jalr x1, 0(x1)");
    }

    #[test]
    fn disassemble_renders_zero_arity_forms_without_operands() {
        let ecall = encode_i(descriptor_for(Mnemonic::Ecall), Reg(0), Reg(0), 0).unwrap();
        assert_eq!(disassemble(ecall), "ecall");
        let fence = encode_i(descriptor_for(Mnemonic::Fence), Reg(0), Reg(0), 0).unwrap();
        assert_eq!(disassemble(fence), "fence");
    }
}
