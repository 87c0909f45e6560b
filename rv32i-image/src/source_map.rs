//! Maps emitted bytes back to the assembly source line(s) that produced
//! them, so the simulator's debugger can show source instead of hex.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceMapItem {
    /// Offset into the text segment of the instruction this item describes.
    pub text_offset: u32,
    pub line: u32,
}

pub type SourceMap = Vec<SourceMapItem>;
