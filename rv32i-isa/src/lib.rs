//! The RV32I instruction set: the 32-bit instruction word (C2) and the
//! process-wide, immutable ISA descriptor table (C1).
//!
//! This crate knows nothing about processor state or memory — it only
//! knows how bits are arranged and named. [`rv32i_vm`](../rv32i_vm/index.html)
//! builds the interpreter on top of it.

mod descriptor;
mod mnemonic;
mod registers;
mod word;

pub use descriptor::{
    descriptor_for, disassemble, dispatch, encode_b, encode_i, encode_i_shift, encode_j,
    encode_r, encode_s, encode_u, Descriptor, EncodeError,
};
pub use mnemonic::{Format, Mnemonic};
pub use registers::{abi_name, Reg, UnknownRegister, REGISTER_COUNT};
pub use word::Word;
