//! The parsed form of one comma-separated operand, shared by directives,
//! real instructions and pseudoinstructions alike.

use pest::iterators::Pair;
use rv32i_isa::Reg;

use crate::error::AssembleError;
use crate::parser::Rule;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Register(Reg),
    Immediate(i64),
    Label(String),
    /// `offset(reg)`, the addressing mode loads and stores use.
    Memory { offset: i64, base: Reg },
    Str(String),
}

fn parse_char_lit(text: &str) -> Option<i64> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let c = match chars.next()? {
        '\\' => match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\'' => '\'',
            '\\' => '\\',
            other => other,
        },
        c => c,
    };
    if chars.next().is_some() {
        return None;
    }
    Some(c as i64)
}

fn parse_int_lit(text: &str) -> Option<i64> {
    if text.starts_with('\'') {
        return parse_char_lit(text);
    }
    let (neg, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(rest) = text.strip_prefix("0x") {
        i64::from_str_radix(rest, 16).ok()?
    } else if let Some(rest) = text.strip_prefix("0o") {
        i64::from_str_radix(rest, 8).ok()?
    } else if let Some(rest) = text.strip_prefix("0b") {
        i64::from_str_radix(rest, 2).ok()?
    } else {
        text.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn parse_operand(pair: Pair<Rule>, line: u32) -> Result<Operand, AssembleError> {
    let inner = pair.into_inner().next().unwrap_or(pair);
    match inner.as_rule() {
        Rule::mem_operand => {
            let mut parts = inner.into_inner();
            let offset_pair = parts.next().unwrap();
            let base_pair = parts.next().unwrap();
            let offset = parse_int_lit(offset_pair.as_str()).ok_or_else(|| {
                AssembleError::InvalidInteger {
                    line,
                    text: offset_pair.as_str().to_owned(),
                }
            })?;
            let base = base_pair
                .as_str()
                .parse::<Reg>()
                .map_err(|source| AssembleError::UnknownRegister { line, source })?;
            Ok(Operand::Memory { offset, base })
        }
        Rule::string_lit => {
            let raw = inner.as_str();
            Ok(Operand::Str(unescape(&raw[1..raw.len() - 1])))
        }
        Rule::int_lit => parse_int_lit(inner.as_str())
            .map(Operand::Immediate)
            .ok_or_else(|| AssembleError::InvalidInteger {
                line,
                text: inner.as_str().to_owned(),
            }),
        Rule::register | Rule::ident => {
            let text = inner.as_str();
            if let Ok(reg) = text.parse::<Reg>() {
                Ok(Operand::Register(reg))
            } else {
                Ok(Operand::Label(text.to_owned()))
            }
        }
        other => unreachable!("operand rule {:?} has no direct token form", other),
    }
}

impl Operand {
    pub fn as_register(&self, line: u32) -> Result<Reg, AssembleError> {
        match self {
            Operand::Register(r) => Ok(*r),
            other => Err(AssembleError::UnexpectedOperand {
                line,
                expected: "register",
                found: format!("{:?}", other),
            }),
        }
    }

    pub fn as_immediate(&self, line: u32) -> Result<i64, AssembleError> {
        match self {
            Operand::Immediate(v) => Ok(*v),
            other => Err(AssembleError::UnexpectedOperand {
                line,
                expected: "immediate",
                found: format!("{:?}", other),
            }),
        }
    }

    pub fn as_label(&self, line: u32) -> Result<&str, AssembleError> {
        match self {
            Operand::Label(l) => Ok(l),
            other => Err(AssembleError::UnexpectedOperand {
                line,
                expected: "label",
                found: format!("{:?}", other),
            }),
        }
    }

    pub fn as_memory(&self, line: u32) -> Result<(i64, Reg), AssembleError> {
        match self {
            Operand::Memory { offset, base } => Ok((*offset, *base)),
            other => Err(AssembleError::UnexpectedOperand {
                line,
                expected: "offset(register)",
                found: format!("{:?}", other),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_and_negative_literals_parse() {
        assert_eq!(parse_int_lit("0xFF"), Some(255));
        assert_eq!(parse_int_lit("-12"), Some(-12));
        assert_eq!(parse_int_lit("0b101"), Some(5));
        assert_eq!(parse_int_lit("0o17"), Some(15));
    }

    #[test]
    fn char_literals_parse() {
        assert_eq!(parse_int_lit("'a'"), Some(97));
        assert_eq!(parse_int_lit("'\\n'"), Some(10));
        assert_eq!(parse_int_lit("'\\0'"), Some(0));
        assert_eq!(parse_int_lit("'\\r'"), Some(13));
    }

    #[test]
    fn string_escapes_honor_carriage_return() {
        assert_eq!(unescape("a\\rb"), "a\rb");
    }
}
