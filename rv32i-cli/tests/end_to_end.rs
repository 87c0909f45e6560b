//! The six concrete end-to-end scenarios spec.md's testable-properties
//! section names, driven through the same public API `rv32i-cli` uses:
//! assemble, link, load into a `Simulator`.

use rv32i_image::constants::STATIC_BEGIN;
use rv32i_isa::{descriptor_for, Mnemonic, Word};
use rv32i_vm::{NullSink, Simulator};

fn link_one(source: &str) -> rv32i_image::LinkedProgram {
    let (program, errors) = rv32i_asm::assemble(source);
    assert!(errors.is_empty(), "{:?}", errors);
    rv32i_link::link(vec![program]).unwrap()
}

#[test]
fn add_updates_destination_register_and_advances_pc() {
    let linked = link_one("add x3, x1, x2\n");
    let mut sim = Simulator::new(linked, Box::new(NullSink));
    sim.set_reg(1, 10);
    sim.set_reg(2, 20);
    sim.step();
    assert_eq!(sim.get_reg(3), 30);
    assert_eq!(sim.get_pc(), 4);
}

#[test]
fn byte_list_in_data_segment_lands_at_static_begin() {
    let source = ".data\n.byte 1, 2, 3, 4\n.text\nnop\n";
    let linked = link_one(source);
    let sim = Simulator::new(linked, Box::new(NullSink));
    assert_eq!(sim.load_byte(STATIC_BEGIN), 1);
    assert_eq!(sim.load_byte(STATIC_BEGIN + 1), 2);
    assert_eq!(sim.load_byte(STATIC_BEGIN + 2), 3);
    assert_eq!(sim.load_byte(STATIC_BEGIN + 3), 4);
}

#[test]
fn two_asciiz_strings_lay_out_back_to_back_with_nul_terminators() {
    let source = ".data\n.asciiz \"a\"\n.asciiz \"b\"\n.text\nnop\n";
    let linked = link_one(source);
    let sim = Simulator::new(linked, Box::new(NullSink));
    assert_eq!(sim.load_byte(STATIC_BEGIN), b'a');
    assert_eq!(sim.load_byte(STATIC_BEGIN + 1), 0);
    assert_eq!(sim.load_byte(STATIC_BEGIN + 2), b'b');
    assert_eq!(sim.load_byte(STATIC_BEGIN + 3), 0);
}

#[test]
fn linking_two_units_concatenates_their_data_segments() {
    let (program_a, errors_a) = rv32i_asm::assemble(".data\n.byte 11\n.text\nnop\n");
    assert!(errors_a.is_empty(), "{:?}", errors_a);
    let (program_b, errors_b) = rv32i_asm::assemble(".data\n.byte 22\n.text\nnop\n");
    assert!(errors_b.is_empty(), "{:?}", errors_b);

    let linked = rv32i_link::link(vec![program_a, program_b]).unwrap();
    let sim = Simulator::new(linked, Box::new(NullSink));
    assert_eq!(sim.load_byte(STATIC_BEGIN), 11);
    assert_eq!(sim.load_byte(STATIC_BEGIN + 1), 22);
}

#[test]
fn negative_word_directive_round_trips_through_load_word() {
    let source = ".data\n.word -21231234\n.text\nnop\n";
    let linked = link_one(source);
    let sim = Simulator::new(linked, Box::new(NullSink));
    assert_eq!(sim.load_word(STATIC_BEGIN) as i32, -21231234);
}

#[test]
fn raw_instruction_word_dispatches_to_add() {
    let word = Word::new(0b00000000000100010000000110110011);
    let descriptor = rv32i_isa::dispatch(word).expect("add should decode");
    assert_eq!(descriptor.mnemonic, Mnemonic::Add);
    assert_eq!(descriptor_for(Mnemonic::Add).opcode, descriptor.opcode);
}

#[test]
fn disassembling_every_text_word_and_reassembling_reproduces_identical_bytes() {
    // spec.md §8 property 4: one instruction of every encoding format,
    // including the memory-operand and zero-operand forms the descriptor
    // table's generic I-format rendering used to get wrong.
    let source = "\
add x3, x1, x2
addi x5, x1, -7
lw x5, 8(x2)
sw x5, 8(x2)
beq x1, x2, -4
jal x1, 8
lui x1, 0x10
jalr x1, 0(x1)
ecall
fence
";
    let linked = link_one(source);

    let disassembled: Vec<String> = linked
        .text
        .chunks_exact(4)
        .map(|bytes| {
            let raw = u32::from_le_bytes(bytes.try_into().unwrap());
            rv32i_isa::disassemble(Word::new(raw))
        })
        .collect();

    let reassembled_source = disassembled.join("\n");
    let (reassembled, errors) = rv32i_asm::assemble(&reassembled_source);
    assert!(errors.is_empty(), "{:?}\n---\n{}", errors, reassembled_source);

    let relinked = rv32i_link::link(vec![reassembled]).unwrap();
    assert_eq!(relinked.text, linked.text);
}
