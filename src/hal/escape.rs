//! Escape-prefixed VFD controllers (Futaba 20S401 and 20T202, Noritake CU40026 and similar).
//!
//! Printable bytes go straight to the display. Single control bytes clear, home and move the
//! cursor, and everything else is `ESC` (0x1B) followed by a command letter and its arguments.

use crate::error::Error;
use crate::glyph::{GlyphCodeMap, GlyphEncoding, GlyphPacking};
use crate::interface::Transport;

use super::{Controller, CursorControl, Position, RowBases, MAX_ESCAPE_PAYLOAD};

pub const ESC: u8 = 0x1B;

const CMD_RESET: u8 = 0x49;
const CMD_POSITION: u8 = 0x48;
const CMD_DIMMING: u8 = 0x4C;
const CMD_GLYPH: u8 = 0x43;
const CMD_BLINK: u8 = 0x42;

const CHAR_SET_0: u8 = 0x18;
const CHAR_SET_1: u8 = 0x19;
const DISPLAY_MODES: core::ops::RangeInclusive<u8> = 0x11..=0x17;

/// Bytes the controller always reads as commands, whatever the module's clear and home codes.
#[cfg_attr(rustfmt, rustfmt_skip)]
pub const RESERVED: &[u8] = &[
    0x08, 0x09, 0x0A, 0x0C, 0x0D, 0x0E,
    0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17,
    CHAR_SET_0, CHAR_SET_1, ESC,
];

/// Glyph codes that steer clear of [`RESERVED`], for modules with 16 glyph slots.
#[cfg_attr(rustfmt, rustfmt_skip)]
pub const GLYPH_CODES_16: &[u8] = &[
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
    0x10, 0x1A, 0x1C, 0x1D, 0x1E, 0x1F, 0x80, 0x81,
];

/// Like [`GLYPH_CODES_16`] but entirely below 0x80, for modules that position the cursor with
/// `0x80 | addr`.
#[cfg_attr(rustfmt, rustfmt_skip)]
pub const GLYPH_CODES_16_LOW: &[u8] = &[
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
    0x10, 0x1A, 0x1C, 0x1D, 0x1E, 0x1F, 0x0B, 0x0F,
];

/// How the cursor is addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Positioning {
    /// `ESC 0x48 addr`.
    Escape,
    /// Single byte `0x80 | addr`, addresses up to 0x7F.
    Ddram,
}

/// How a dimming level becomes the `ESC 0x4C` argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DimmingCodes {
    /// The level itself.
    Direct,
    /// Four bands in the top two bits: 0x00, 0x40, 0x80, 0xC0.
    Bands,
}

/// Per-module settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscapeConfig {
    pub clear: u8,
    pub home: u8,
    pub row_bases: RowBases,
    pub positioning: Positioning,
    pub dimming: DimmingCodes,
    /// Command letter for the cursor blink rate.
    pub blink_command: u8,
    pub glyph_codes: GlyphCodeMap,
}

impl EscapeConfig {
    pub fn vfd20s401() -> Self {
        EscapeConfig {
            clear: 0x09,
            home: 0x0C,
            row_bases: RowBases::Table(&[0x00, 0x20, 0x40, 0x60]),
            positioning: Positioning::Ddram,
            dimming: DimmingCodes::Direct,
            blink_command: CMD_BLINK,
            glyph_codes: GlyphCodeMap::Table(GLYPH_CODES_16_LOW),
        }
    }

    pub fn vfd20t202() -> Self {
        EscapeConfig {
            clear: 0x09,
            home: 0x0C,
            row_bases: RowBases::Linear,
            positioning: Positioning::Escape,
            dimming: DimmingCodes::Direct,
            blink_command: CMD_BLINK,
            glyph_codes: GlyphCodeMap::Offset(0x00),
        }
    }

    pub fn cu40026() -> Self {
        EscapeConfig {
            clear: 0x0E,
            blink_command: b'T',
            dimming: DimmingCodes::Bands,
            glyph_codes: GlyphCodeMap::Table(GLYPH_CODES_16),
            ..Self::vfd20t202()
        }
    }
}

pub struct Escape {
    config: EscapeConfig,
}

impl Escape {
    pub fn new(config: EscapeConfig) -> Self {
        Escape { config }
    }

    pub fn config(&self) -> &EscapeConfig {
        &self.config
    }
}

fn send<T: Transport>(iface: &mut T, bytes: &[u8]) -> Result<(), Error> {
    iface.write(bytes).map_err(|_| Error::TransportFail)
}

impl Controller for Escape {
    fn name(&self) -> &'static str {
        "ESC/VFD"
    }

    fn row_bases(&self) -> RowBases {
        self.config.row_bases
    }

    fn init<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        send(iface, &[ESC, CMD_RESET])
    }

    fn clear<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        send(iface, &[self.config.clear])
    }

    fn home<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        send(iface, &[self.config.home])
    }

    fn move_cursor<T: Transport>(&mut self, iface: &mut T, pos: Position) -> Result<(), Error> {
        match self.config.positioning {
            Positioning::Escape => send(iface, &[ESC, CMD_POSITION, pos.address]),
            Positioning::Ddram => match pos.address {
                0..=0x7F => send(iface, &[0x80 | pos.address]),
                _ => Err(Error::InvalidArgs),
            },
        }
    }

    fn write_data<T: Transport>(&mut self, iface: &mut T, data: &[u8]) -> Result<(), Error> {
        send(iface, data)
    }

    fn cursor_control(&self, motion: CursorControl) -> Option<u8> {
        Some(match motion {
            CursorControl::BackSpace => 0x08,
            CursorControl::HorizontalTab => 0x09,
            CursorControl::LineFeed => 0x0A,
            CursorControl::CarriageReturn => 0x0D,
        })
    }

    fn glyph_encoding(&self) -> Option<GlyphEncoding> {
        Some(GlyphEncoding {
            packing: GlyphPacking::ColumnMajor,
            codes: self.config.glyph_codes,
            reserved: RESERVED,
            commands_from: match self.config.positioning {
                Positioning::Ddram => Some(0x80),
                Positioning::Escape => None,
            },
        })
    }

    fn store_glyph<T: Transport>(
        &mut self,
        iface: &mut T,
        _index: u8,
        code: u8,
        packed: &[u8],
    ) -> Result<(), Error> {
        let mut buf = [0u8; 8];
        buf[..3].copy_from_slice(&[ESC, CMD_GLYPH, code]);
        let end = 3 + packed.len();
        buf.get_mut(3..end)
            .ok_or(Error::InvalidArgs)?
            .copy_from_slice(packed);
        send(iface, &buf[..end])
    }

    fn set_dimming<T: Transport>(&mut self, iface: &mut T, level: u8) -> Result<(), Error> {
        let code = match self.config.dimming {
            DimmingCodes::Direct => level,
            DimmingCodes::Bands => (level & 0x03) << 6,
        };
        send(iface, &[ESC, CMD_DIMMING, code])
    }

    fn set_cursor_blink_rate<T: Transport>(&mut self, iface: &mut T, rate: u8) -> Result<(), Error> {
        send(iface, &[ESC, self.config.blink_command, rate])
    }

    fn set_display_mode<T: Transport>(&mut self, iface: &mut T, mode: u8) -> Result<(), Error> {
        if !DISPLAY_MODES.contains(&mode) {
            return Err(Error::InvalidArgs);
        }
        send(iface, &[ESC, mode])
    }

    fn change_char_set<T: Transport>(&mut self, iface: &mut T, set: u8) -> Result<(), Error> {
        match set {
            0 => send(iface, &[CHAR_SET_0]),
            1 => send(iface, &[CHAR_SET_1]),
            _ => Err(Error::InvalidArgs),
        }
    }

    fn send_escape<T: Transport>(&mut self, iface: &mut T, payload: &[u8]) -> Result<(), Error> {
        let mut buf = [0u8; MAX_ESCAPE_PAYLOAD + 1];
        buf[0] = ESC;
        let end = 1 + payload.len();
        buf.get_mut(1..end)
            .ok_or(Error::InvalidArgs)?
            .copy_from_slice(payload);
        send(iface, &buf[..end])
    }
}
