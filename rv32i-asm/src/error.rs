//! Errors the assembler accumulates rather than aborts on: every line is
//! parsed independently, so one bad line never hides errors on the rest
//! (spec.md's two-pass assembler is expected to report everything wrong
//! with a source file in one run, the way a real toolchain does).

use crate::parser::Rule;

#[derive(Clone, Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("line {line}: {source}")]
    Syntax {
        line: u32,
        #[source]
        source: Box<pest::error::Error<Rule>>,
    },

    #[error("line {line}: unknown mnemonic \"{mnemonic}\"")]
    UnknownMnemonic { line: u32, mnemonic: String },

    #[error("line {line}: unknown directive \"{directive}\"")]
    UnknownDirective { line: u32, directive: String },

    #[error("line {line}: {source}")]
    UnknownRegister {
        line: u32,
        #[source]
        source: rv32i_isa::UnknownRegister,
    },

    #[error("line {line}: expected {expected}, found \"{found}\"")]
    UnexpectedOperand {
        line: u32,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: wrong number of operands for \"{mnemonic}\": expected {expected}, found {found}")]
    WrongOperandCount {
        line: u32,
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid integer literal \"{text}\"")]
    InvalidInteger { line: u32, text: String },

    #[error("line {line}: {source}")]
    Encode {
        line: u32,
        #[source]
        source: rv32i_isa::EncodeError,
    },

    #[error("label \"{0}\" is defined more than once")]
    DuplicateLabel(String),

    #[error("line {line}: \"{directive}\" is only valid in the {expected} segment")]
    WrongSegment {
        line: u32,
        directive: &'static str,
        expected: &'static str,
    },
}
