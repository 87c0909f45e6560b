//! Byte-addressable memory, partitioned into the fixed segments of
//! spec.md §3/§6. Each segment is its own growable buffer rather than one
//! flat `2^32`-byte array, since only TEXT_BEGIN/STATIC_BEGIN/HEAP_BEGIN
//! and a fixed-size stack window actually see traffic in an educational
//! program; the addresses themselves stay exactly where the spec puts them.

use byteorder::{ByteOrder, LittleEndian};

use crate::constants::{HEAP_BEGIN, HEAP_CEILING, STACK_BEGIN, STACK_SIZE, STATIC_BEGIN, TEXT_BEGIN};
use crate::error::RuntimeError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Segment {
    Text,
    Static,
    Heap,
    Stack,
}

pub struct Memory {
    text: Vec<u8>,
    static_data: Vec<u8>,
    heap: Vec<u8>,
    stack: Vec<u8>,
}

impl Memory {
    pub fn new(text: Vec<u8>, static_data: Vec<u8>) -> Memory {
        Memory {
            text,
            static_data,
            heap: Vec::new(),
            stack: vec![0; STACK_SIZE as usize],
        }
    }

    pub fn heap_len(&self) -> u32 {
        self.heap.len() as u32
    }

    /// Grows the heap by `bytes`, zero-filling the new region. Fails if the
    /// new break would cross [`HEAP_CEILING`].
    pub fn grow_heap(&mut self, bytes: u32) -> Result<(), RuntimeError> {
        let new_break = HEAP_BEGIN
            .checked_add(self.heap.len() as u32)
            .and_then(|b| b.checked_add(bytes))
            .ok_or(RuntimeError::HeapOverflow)?;
        if new_break > HEAP_CEILING {
            return Err(RuntimeError::HeapOverflow);
        }
        self.heap.resize(self.heap.len() + bytes as usize, 0);
        Ok(())
    }

    /// Truncates the heap back to `len` bytes, reversing a prior
    /// [`Memory::grow_heap`] for `Simulator::undo`.
    pub fn shrink_heap(&mut self, len: u32) {
        self.heap.truncate(len as usize);
    }

    fn locate(&self, addr: u32, size: u32) -> Option<(Segment, usize)> {
        let end = addr.checked_add(size)?;

        if addr >= TEXT_BEGIN && end <= TEXT_BEGIN + self.text.len() as u32 {
            return Some((Segment::Text, (addr - TEXT_BEGIN) as usize));
        }
        if addr >= STATIC_BEGIN && end <= STATIC_BEGIN + self.static_data.len() as u32 {
            return Some((Segment::Static, (addr - STATIC_BEGIN) as usize));
        }
        if addr >= HEAP_BEGIN && end <= HEAP_BEGIN + self.heap.len() as u32 {
            return Some((Segment::Heap, (addr - HEAP_BEGIN) as usize));
        }
        if addr >= STACK_BEGIN - STACK_SIZE && end <= STACK_BEGIN {
            return Some((Segment::Stack, (addr - (STACK_BEGIN - STACK_SIZE)) as usize));
        }
        None
    }

    fn slice(&self, addr: u32, size: u32) -> Result<&[u8], RuntimeError> {
        match self.locate(addr, size) {
            Some((Segment::Text, off)) => Ok(&self.text[off..off + size as usize]),
            Some((Segment::Static, off)) => Ok(&self.static_data[off..off + size as usize]),
            Some((Segment::Heap, off)) => Ok(&self.heap[off..off + size as usize]),
            Some((Segment::Stack, off)) => Ok(&self.stack[off..off + size as usize]),
            None => Err(RuntimeError::OutOfSegment { addr, size }),
        }
    }

    fn slice_mut(&mut self, addr: u32, size: u32) -> Result<&mut [u8], RuntimeError> {
        match self.locate(addr, size) {
            Some((Segment::Text, off)) => Ok(&mut self.text[off..off + size as usize]),
            Some((Segment::Static, off)) => Ok(&mut self.static_data[off..off + size as usize]),
            Some((Segment::Heap, off)) => Ok(&mut self.heap[off..off + size as usize]),
            Some((Segment::Stack, off)) => Ok(&mut self.stack[off..off + size as usize]),
            None => Err(RuntimeError::OutOfSegment { addr, size }),
        }
    }

    fn check_alignment(addr: u32, size: u32) -> Result<(), RuntimeError> {
        let align = size;
        if align > 1 && addr % align != 0 {
            Err(RuntimeError::UnalignedAccess { addr, size, align })
        } else {
            Ok(())
        }
    }

    /// Reads `size` (1/2/4) little-endian bytes as an unsigned value,
    /// requiring alignment to `size` for halves and words (spec.md §7's
    /// documented choice: unaligned word/half accesses are rejected).
    pub fn read(&self, addr: u32, size: u32) -> Result<u32, RuntimeError> {
        Self::check_alignment(addr, size)?;
        let bytes = self.slice(addr, size)?;
        Ok(LittleEndian::read_uint(bytes, size as usize) as u32)
    }

    pub fn write(&mut self, addr: u32, size: u32, value: u32) -> Result<(), RuntimeError> {
        Self::check_alignment(addr, size)?;
        let bytes = self.slice_mut(addr, size)?;
        LittleEndian::write_uint(bytes, value as u64, size as usize);
        Ok(())
    }

    /// Fetches a 4-byte instruction word at `pc`. Unlike [`Memory::read`],
    /// this only ever looks in the text segment: a jump that lands in data
    /// or the heap is a fetch failure, not a generic segment miss.
    pub fn fetch_instruction(&self, pc: u32) -> Result<u32, RuntimeError> {
        if pc % 4 != 0 {
            return Err(RuntimeError::FetchOutsideText(pc));
        }
        match self.locate(pc, 4) {
            Some((Segment::Text, off)) => Ok(LittleEndian::read_u32(&self.text[off..off + 4])),
            _ => Err(RuntimeError::FetchOutsideText(pc)),
        }
    }

    /// Reads a single byte without alignment or segment-boundary failure
    /// (other than a plain "not present"), for host inspection (spec.md
    /// §4.5's `load_byte`/`load_word`) rather than instruction execution.
    pub fn peek_byte(&self, addr: u32) -> u8 {
        self.slice(addr, 1).map(|s| s[0]).unwrap_or(0)
    }

    pub fn peek_word(&self, addr: u32) -> u32 {
        let bytes: [u8; 4] = std::array::from_fn(|i| self.peek_byte(addr + i as u32));
        LittleEndian::read_u32(&bytes)
    }

    /// Writes a single byte and returns the previous value, for undoable
    /// stores. Bypasses the alignment check: callers already validated it
    /// (or, for `set_reg`-style debugger pokes, alignment doesn't apply).
    pub fn write_byte_raw(&mut self, addr: u32, value: u8) -> Result<u8, RuntimeError> {
        let old = self.peek_byte(addr);
        let byte = self
            .slice_mut(addr, 1)
            .map_err(|_| RuntimeError::OutOfSegment { addr, size: 1 })?;
        byte[0] = value;
        Ok(old)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn byte_order_is_little_endian() {
        let mem = Memory::new(Vec::new(), vec![0x01, 0x02, 0x03, 0x04]);
        let word = mem.read(STATIC_BEGIN, 4).unwrap();
        let from_bytes = mem.peek_byte(STATIC_BEGIN) as u32
            | (mem.peek_byte(STATIC_BEGIN + 1) as u32) << 8
            | (mem.peek_byte(STATIC_BEGIN + 2) as u32) << 16
            | (mem.peek_byte(STATIC_BEGIN + 3) as u32) << 24;
        assert_eq!(word, from_bytes);
        assert_eq!(word, 0x0403_0201);
    }

    #[test]
    fn unaligned_word_access_is_rejected() {
        let mem = Memory::new(Vec::new(), vec![0; 8]);
        assert!(matches!(
            mem.read(STATIC_BEGIN + 1, 4),
            Err(RuntimeError::UnalignedAccess { .. })
        ));
    }

    #[test]
    fn out_of_segment_access_is_rejected() {
        let mem = Memory::new(Vec::new(), vec![0; 4]);
        assert!(matches!(
            mem.read(STATIC_BEGIN + 100, 4),
            Err(RuntimeError::OutOfSegment { .. })
        ));
    }

    #[test]
    fn heap_grows_and_is_addressable() {
        let mut mem = Memory::new(Vec::new(), Vec::new());
        mem.grow_heap(16).unwrap();
        mem.write(HEAP_BEGIN, 4, 0xDEAD_BEEF).unwrap();
        assert_eq!(mem.read(HEAP_BEGIN, 4).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn shrink_heap_reverses_a_prior_grow() {
        let mut mem = Memory::new(Vec::new(), Vec::new());
        mem.grow_heap(16).unwrap();
        mem.shrink_heap(0);
        assert_eq!(mem.heap_len(), 0);
        mem.grow_heap(16).unwrap();
        assert_eq!(mem.heap_len(), 16);
    }

    #[test]
    fn fetch_outside_text_is_rejected() {
        let mem = Memory::new(vec![0; 4], Vec::new());
        assert!(matches!(
            mem.fetch_instruction(TEXT_BEGIN + 4),
            Err(RuntimeError::FetchOutsideText(_))
        ));
        assert!(mem.fetch_instruction(TEXT_BEGIN).is_ok());
    }

    #[test]
    fn heap_overflow_past_ceiling_is_rejected() {
        let mut mem = Memory::new(Vec::new(), Vec::new());
        assert!(mem.grow_heap(u32::MAX).is_err());
    }
}
