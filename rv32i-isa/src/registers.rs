//! Register identifiers and the name table used to parse operands.

use std::fmt;
use std::str::FromStr;

pub const REGISTER_COUNT: usize = 32;

/// Error returned when a register token does not name any of `x0..x31`
/// or one of their ABI aliases.
#[derive(Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[error("unknown register \"{0}\"")]
pub struct UnknownRegister(pub String);

/// A register id in `0..REGISTER_COUNT`. `Reg(0)` is `x0`, hardwired to zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct Reg(pub u8);

impl Reg {
    pub const ZERO: Reg = Reg(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

// ABI names in register order x0..x31, per the RISC-V calling convention.
const ABI_NAMES: [&str; REGISTER_COUNT] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

impl FromStr for Reg {
    type Err = UnknownRegister;

    fn from_str(s: &str) -> Result<Reg, UnknownRegister> {
        let lower = s.to_ascii_lowercase();

        if let Some(rest) = lower.strip_prefix('x') {
            if let Ok(n) = rest.parse::<u8>() {
                if (n as usize) < REGISTER_COUNT {
                    return Ok(Reg(n));
                }
            }
        }

        if lower == "fp" {
            return Ok(Reg(8)); // alias of s0
        }

        if let Some(index) = ABI_NAMES.iter().position(|&name| name == lower) {
            return Ok(Reg(index as u8));
        }

        Err(UnknownRegister(s.to_owned()))
    }
}

pub fn abi_name(reg: Reg) -> &'static str {
    ABI_NAMES[reg.index()]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numeric_names_round_trip() {
        for n in 0..REGISTER_COUNT as u8 {
            assert_eq!(Reg(n), format!("x{}", n).parse().unwrap());
        }
    }

    #[test]
    fn abi_names_resolve() {
        assert_eq!(Reg(0), "zero".parse().unwrap());
        assert_eq!(Reg(2), "sp".parse().unwrap());
        assert_eq!(Reg(8), "s0".parse().unwrap());
        assert_eq!(Reg(8), "fp".parse().unwrap());
        assert_eq!(Reg(10), "a0".parse().unwrap());
        assert_eq!(Reg(31), "t6".parse().unwrap());
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(Reg(10), "A0".parse().unwrap());
        assert_eq!(Reg(2), "SP".parse().unwrap());
    }

    #[test]
    fn unknown_register_is_rejected() {
        assert!("x32".parse::<Reg>().is_err());
        assert!("bogus".parse::<Reg>().is_err());
    }
}
