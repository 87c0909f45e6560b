//! Turns one source line into a [`Statement`]: an optional label
//! definition plus an optional directive or instruction. Parsing each
//! line independently is what lets the assembler accumulate errors
//! instead of stopping at the first one.

use pest::Parser;

use crate::error::AssembleError;
use crate::operand::{parse_operand, Operand};
use crate::parser::{LineParser, Rule};

#[derive(Clone, Debug)]
pub enum StatementKind {
    Directive { name: String, args: Vec<Operand> },
    Instruction { mnemonic: String, args: Vec<Operand> },
    Empty,
}

#[derive(Clone, Debug)]
pub struct Statement {
    pub label: Option<String>,
    pub kind: StatementKind,
}

pub fn parse_line(line: u32, text: &str) -> Result<Statement, AssembleError> {
    let mut pairs = LineParser::parse(Rule::line, text).map_err(|e| AssembleError::Syntax {
        line,
        source: Box::new(e),
    })?;
    let statement_pair = pairs.next().unwrap();
    let mut label = None;
    let mut kind = StatementKind::Empty;

    for part in statement_pair.into_inner() {
        match part.as_rule() {
            Rule::label_def => {
                let text = part.as_str();
                label = Some(text[..text.len() - 1].to_owned());
            }
            Rule::directive => {
                let mut inner = part.into_inner();
                let name = inner.next().unwrap().as_str().to_owned();
                let args = match inner.next() {
                    Some(list) => operand_list(list, line)?,
                    None => Vec::new(),
                };
                kind = StatementKind::Directive { name, args };
            }
            Rule::instruction => {
                let mut inner = part.into_inner();
                let mnemonic = inner.next().unwrap().as_str().to_owned();
                let args = match inner.next() {
                    Some(list) => operand_list(list, line)?,
                    None => Vec::new(),
                };
                kind = StatementKind::Instruction { mnemonic, args };
            }
            _ => {}
        }
    }

    Ok(Statement { label, kind })
}

fn operand_list(pair: pest::iterators::Pair<Rule>, line: u32) -> Result<Vec<Operand>, AssembleError> {
    pair.into_inner()
        .map(|p| parse_operand(p, line))
        .collect()
}
