//! The closed set of real RV32I mnemonics (pseudoinstructions are an
//! assembler-level concept and are expanded before this table is consulted).

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Format {
    R,
    I,
    /// Immediate-shift variant of I (`slli`/`srli`/`srai`): funct7 selects
    /// logical vs. arithmetic, the immediate is a 5-bit shift amount.
    IShift,
    S,
    B,
    U,
    J,
}

macro_rules! mnemonics {
    ($($name:ident => $text:expr),+ $(,)?) => {
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        pub enum Mnemonic {
            $($name),+
        }

        impl Mnemonic {
            pub fn name(self) -> &'static str {
                match self {
                    $(Mnemonic::$name => $text),+
                }
            }

            pub fn from_name(s: &str) -> Option<Mnemonic> {
                match s {
                    $($text => Some(Mnemonic::$name)),+,
                    _ => None,
                }
            }
        }

        impl fmt::Display for Mnemonic {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

mnemonics! {
    Add => "add", Sub => "sub", Sll => "sll", Slt => "slt", Sltu => "sltu",
    Xor => "xor", Srl => "srl", Sra => "sra", Or => "or", And => "and",

    Addi => "addi", Slti => "slti", Sltiu => "sltiu", Xori => "xori",
    Ori => "ori", Andi => "andi",

    Slli => "slli", Srli => "srli", Srai => "srai",

    Lb => "lb", Lh => "lh", Lw => "lw", Lbu => "lbu", Lhu => "lhu",
    Sb => "sb", Sh => "sh", Sw => "sw",

    Beq => "beq", Bne => "bne", Blt => "blt", Bge => "bge",
    Bltu => "bltu", Bgeu => "bgeu",

    Jal => "jal", Jalr => "jalr",
    Lui => "lui", Auipc => "auipc",

    Fence => "fence", FenceI => "fence.i", Ecall => "ecall",
}

impl Mnemonic {
    pub fn format(self) -> Format {
        use Mnemonic::*;
        match self {
            Add | Sub | Sll | Slt | Sltu | Xor | Srl | Sra | Or | And => Format::R,
            Addi | Slti | Sltiu | Xori | Ori | Andi | Lb | Lh | Lw | Lbu | Lhu | Jalr | Fence
            | FenceI | Ecall => Format::I,
            Slli | Srli | Srai => Format::IShift,
            Sb | Sh | Sw => Format::S,
            Beq | Bne | Blt | Bge | Bltu | Bgeu => Format::B,
            Jal => Format::J,
            Lui | Auipc => Format::U,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_round_trips() {
        for m in [Mnemonic::Add, Mnemonic::Lw, Mnemonic::Beq, Mnemonic::FenceI, Mnemonic::Ecall] {
            assert_eq!(m, Mnemonic::from_name(m.name()).unwrap());
        }
    }

    #[test]
    fn unknown_name_rejected() {
        assert!(Mnemonic::from_name("bogus").is_none());
    }
}
