//! Section buffers: TEXT holds executable code at its own CPU-addressed
//! program counter, written into the PRG image. DATA and RODATA share a
//! second buffer and counter for non-executable bytes, written into the
//! CHR image (alongside any `.chrbin`/`.incbin` content appended into the
//! same buffer).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Text,
    Data,
    RoData,
}

#[derive(Debug, Default)]
pub struct SectionBuffer {
    pub bytes: Vec<u8>,
    pub pc: u16,
}

impl SectionBuffer {
    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
        self.pc = self.pc.wrapping_add(1);
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }
}

/// The section buffers, plus the active-section selector.
///
/// `DATA` and `RODATA` share one physical buffer and one running program
/// counter: both are non-executable regions appended to the CHR image in
/// source emission order, so giving them independent counters would make
/// label addresses depend on an interleaving order that isn't known until
/// the whole file has been read. `Section::RoData` survives purely to tag
/// which directive introduced a label and to tell the data emitter
/// whether to NUL-terminate.
#[derive(Debug)]
pub struct Sections {
    pub text: SectionBuffer,
    pub data: SectionBuffer,
    pub active: Section,
}

impl Sections {
    pub fn new(text_pc: u16, data_pc: u16) -> Sections {
        Sections {
            text: SectionBuffer { bytes: Vec::new(), pc: text_pc },
            data: SectionBuffer { bytes: Vec::new(), pc: data_pc },
            active: Section::Text,
        }
    }

    pub fn pc(&self, section: Section) -> u16 {
        match section {
            Section::Text => self.text.pc,
            Section::Data | Section::RoData => self.data.pc,
        }
    }

    pub fn buffer_mut(&mut self, section: Section) -> &mut SectionBuffer {
        match section {
            Section::Text => &mut self.text,
            Section::Data | Section::RoData => &mut self.data,
        }
    }
}
