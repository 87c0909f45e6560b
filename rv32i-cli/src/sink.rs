//! The stdout-backed [`rv32i_vm::OutputSink`] a native host registers,
//! where a browser host would register one that appends to a DOM console.

use std::io::Write;

use rv32i_vm::OutputSink;

pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn print_int(&mut self, value: i32) {
        print!("{value}");
        let _ = std::io::stdout().flush();
    }

    fn print_string(&mut self, value: &str) {
        print!("{value}");
        let _ = std::io::stdout().flush();
    }

    fn print_char(&mut self, value: char) {
        print!("{value}");
        let _ = std::io::stdout().flush();
    }
}
