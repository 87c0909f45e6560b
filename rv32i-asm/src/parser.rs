//! The pest-generated per-line parser (see `grammar.pest`).

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
pub struct LineParser;
