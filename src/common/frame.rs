// src/common/frame.rs

/// Data bits carried by one frame.
pub const DATA_BITS: u8 = 8;
/// Cells on the wire per frame: start + 8 data + stop (8N1).
pub const FRAME_BITS: u8 = 10;

const STOP_CELL: u16 = 1 << (FRAME_BITS - 1);
const FRAME_MASK: u16 = (1 << FRAME_BITS) - 1;

/// Line state of a single bit cell.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Active low, logic 0. Start bit level.
    Space,
    /// Idle high, logic 1. Stop bit level.
    Mark,
}

impl Level {
    #[inline]
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Level::Mark
        } else {
            Level::Space
        }
    }

    #[inline]
    pub const fn is_mark(self) -> bool {
        matches!(self, Level::Mark)
    }
}

/// One 8N1 frame as a shift pattern.
///
/// Bit 0 is the start cell, bits 1..=8 carry the data LSB first and bit 9 is
/// the stop cell, so shifting right by one per bit period emits the cells in
/// wire order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame(u16);

impl Frame {
    /// Frames `byte` with a space start cell and a mark stop cell.
    #[inline]
    pub const fn new(byte: u8) -> Self {
        Frame(((byte as u16) << 1) | STOP_CELL)
    }

    /// Wraps ten sampled cells, first arrival in bit 0.
    ///
    /// Nothing is checked: a bad start or stop cell still yields a frame.
    #[inline]
    pub const fn from_cells(cells: u16) -> Self {
        Frame(cells & FRAME_MASK)
    }

    #[inline]
    pub const fn cells(self) -> u16 {
        self.0
    }

    /// Level of cell `index` (0 = start, 9 = stop).
    #[inline]
    pub const fn cell(self, index: u8) -> Level {
        Level::from_bit((self.0 >> index) & 1 == 1)
    }

    /// The eight data cells, start and stop discarded.
    #[inline]
    pub const fn data(self) -> u8 {
        (self.0 >> 1) as u8
    }

    #[inline]
    pub const fn start(self) -> Level {
        self.cell(0)
    }

    #[inline]
    pub const fn stop(self) -> Level {
        self.cell(FRAME_BITS - 1)
    }
}

impl From<u8> for Frame {
    fn from(byte: u8) -> Self {
        Frame::new(byte)
    }
}
