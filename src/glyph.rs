//! User-defined glyphs: the logical 5x8 pixel pattern, the two byte layouts controllers expect it
//! in, and the mapping from a glyph slot to the byte that displays it.

use heapless::Vec;
use itertools::iproduct;

use crate::error::Error;

/// Eight pixel rows, top to bottom. Bits 0..4 of each row are the five columns; higher bits are
/// ignored.
pub type GlyphPattern = [u8; 8];

/// Width of a glyph cell in pixels.
pub const GLYPH_COLUMNS: usize = 5;

const ROW_MASK: u8 = 0x1F;

/// A glyph in the controller's native layout, at most eight bytes.
pub type PackedGlyph = Vec<u8, 8>;

/// Byte layout a controller stores glyph bitmaps in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GlyphPacking {
    /// One byte per pixel row, low five bits used, as in HD44780 CGRAM. Always eight bytes so
    /// slots stay aligned; rows past the character height are sent as zero.
    RowMajor,
    /// One byte per pixel column, bit `r` set when row `r` is lit. Always five bytes.
    ColumnMajor,
}

impl GlyphPacking {
    /// Pack `pattern` for a device whose characters are `char_height` pixels tall. Rows at or past
    /// `char_height` are dropped, so row 7 never reaches a 5x7 device.
    pub fn pack(self, pattern: &GlyphPattern, char_height: u8) -> PackedGlyph {
        let rows = match char_height {
            0 => pattern.len(),
            h => usize::min(h as usize, pattern.len()),
        };
        let mut packed = PackedGlyph::new();
        match self {
            GlyphPacking::RowMajor => {
                for (r, row) in pattern.iter().enumerate() {
                    let byte = if r < rows { row & ROW_MASK } else { 0 };
                    // Capacity is the pattern length, this cannot overflow.
                    let _ = packed.push(byte);
                }
            }
            GlyphPacking::ColumnMajor => {
                let mut columns = [0u8; GLYPH_COLUMNS];
                for (r, c) in iproduct!(0..rows, 0..GLYPH_COLUMNS) {
                    if pattern[r] & (1 << c) != 0 {
                        columns[c] |= 1 << r;
                    }
                }
                let _ = packed.extend_from_slice(&columns);
            }
        }
        packed
    }
}

/// How a glyph slot index becomes the character code that displays it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlyphCodeMap {
    /// Slot `i` is shown by code `base + i`.
    Offset(u8),
    /// Slot `i` is shown by `table[i]`.
    Table(&'static [u8]),
}

impl GlyphCodeMap {
    fn lookup(&self, index: u8) -> Option<u8> {
        match *self {
            GlyphCodeMap::Offset(base) => base.checked_add(index),
            GlyphCodeMap::Table(table) => table.get(index as usize).copied(),
        }
    }
}

/// Everything a controller needs to say about its glyph storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphEncoding {
    pub packing: GlyphPacking,
    pub codes: GlyphCodeMap,
    /// Single-byte commands a glyph code must never equal.
    pub reserved: &'static [u8],
    /// First byte of a range the controller reads as commands, through 0xFF.
    pub commands_from: Option<u8>,
}

impl GlyphEncoding {
    /// Map slot `index` to its character code. Fails with `InvalidArgs` if the map has no entry
    /// for it or if the code would be read by the controller as a control byte.
    pub fn code(&self, index: u8) -> Result<u8, Error> {
        let code = self.codes.lookup(index).ok_or(Error::InvalidArgs)?;
        let in_command_range = self.commands_from.map_or(false, |floor| code >= floor);
        if self.reserved.contains(&code) || in_command_range {
            warn!("glyph slot {} maps onto reserved code {}", index, code);
            return Err(Error::InvalidArgs);
        }
        Ok(code)
    }

    pub fn pack(&self, pattern: &GlyphPattern, char_height: u8) -> PackedGlyph {
        self.packing.pack(pattern, char_height)
    }
}
