//! `.data`/`.text` assembler directives: sizing (pass 1) and byte
//! emission (pass 2) for the literal-data directives, plus the handful of
//! directives that only affect assembler bookkeeping (`.globl`).

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::AssembleError;
use crate::operand::Operand;

fn align_up(offset: u32, align: u32) -> u32 {
    if align == 0 {
        offset
    } else {
        (offset + align - 1) / align * align
    }
}

/// Bytes a directive will occupy once emitted, needed by pass 1 before any
/// label address is known.
pub fn sized(name: &str, args: &[Operand], line: u32, current_offset: u32) -> Result<u32, AssembleError> {
    match name {
        ".byte" => Ok(args.len() as u32),
        ".half" => Ok(args.len() as u32 * 2),
        ".word" => Ok(args.len() as u32 * 4),
        ".ascii" => Ok(string_arg(args, line)?.len() as u32),
        ".asciiz" | ".string" => Ok(string_arg(args, line)?.len() as u32 + 1),
        ".space" => Ok(args
            .first()
            .ok_or(AssembleError::WrongOperandCount { line, mnemonic: name.to_owned(), expected: 1, found: 0 })?
            .as_immediate(line)? as u32),
        ".align" => {
            let align = 1u32 << args.first().map(|a| a.as_immediate(line)).transpose()?.unwrap_or(0);
            Ok(align_up(current_offset, align) - current_offset)
        }
        ".text" | ".data" | ".globl" | ".global" => Ok(0),
        other => Err(AssembleError::UnknownDirective { line, directive: other.to_owned() }),
    }
}

fn string_arg(args: &[Operand], line: u32) -> Result<String, AssembleError> {
    match args.first() {
        Some(Operand::Str(s)) => Ok(s.clone()),
        Some(other) => Err(AssembleError::UnexpectedOperand {
            line,
            expected: "string literal",
            found: format!("{:?}", other),
        }),
        None => Err(AssembleError::WrongOperandCount { line, mnemonic: "directive".to_owned(), expected: 1, found: 0 }),
    }
}

/// Emits the literal bytes a directive produces, once all sizes from
/// pass 1 are known (`.align`/`.space` need `current_offset` again to
/// reproduce the same padding length).
pub fn emit(name: &str, args: &[Operand], line: u32, current_offset: u32) -> Result<Vec<u8>, AssembleError> {
    match name {
        ".byte" => args
            .iter()
            .map(|a| {
                let v = a.as_immediate(line)?;
                if !(-128..=255).contains(&v) {
                    return Err(AssembleError::InvalidInteger { line, text: v.to_string() });
                }
                Ok(v as u8)
            })
            .collect(),
        ".half" => {
            let mut bytes = Vec::with_capacity(args.len() * 2);
            for a in args {
                bytes.write_u16::<LittleEndian>(a.as_immediate(line)? as u16).unwrap();
            }
            Ok(bytes)
        }
        ".word" => {
            let mut bytes = Vec::with_capacity(args.len() * 4);
            for a in args {
                bytes.write_u32::<LittleEndian>(a.as_immediate(line)? as u32).unwrap();
            }
            Ok(bytes)
        }
        ".ascii" => Ok(string_arg(args, line)?.into_bytes()),
        ".asciiz" | ".string" => {
            let mut bytes = string_arg(args, line)?.into_bytes();
            bytes.push(0);
            Ok(bytes)
        }
        ".space" => Ok(vec![0; sized(name, args, line, current_offset)? as usize]),
        ".align" => Ok(vec![0; sized(name, args, line, current_offset)? as usize]),
        ".text" | ".data" | ".globl" | ".global" => Ok(Vec::new()),
        other => Err(AssembleError::UnknownDirective { line, directive: other.to_owned() }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn word_list_emits_little_endian() {
        let args = [Operand::Immediate(0x0403_0201)];
        let bytes = emit(".word", &args, 1, 0).unwrap();
        assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn asciiz_appends_nul_terminator() {
        let args = [Operand::Str("hi".to_owned())];
        let bytes = emit(".asciiz", &args, 1, 0).unwrap();
        assert_eq!(bytes, vec![b'h', b'i', 0]);
    }

    #[test]
    fn align_pads_to_boundary() {
        assert_eq!(sized(".align", &[Operand::Immediate(2)], 1, 1).unwrap(), 3);
    }
}
