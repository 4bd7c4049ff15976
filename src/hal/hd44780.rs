//! HD44780-compatible VFD controllers (CU20025, HT16514, PT6314, M202MD15 and similar).
//!
//! Commands and data share one byte stream and are told apart by register select. On a bus with
//! control lines RS is driven directly. Otherwise every transfer starts with a start byte that
//! carries the RS and R/W bits, which is how these modules speak over synchronous serial.

use crate::error::Error;
use crate::glyph::{GlyphCodeMap, GlyphEncoding, GlyphPacking};
use crate::interface::{ControlLine, Transport};

use super::{Controller, Position, RowBases};

/// Largest payload sent after one start byte.
const FRAME: usize = 32;
const DDRAM_ADDR_MAX: u8 = 0x7F;
const CGRAM_ADDR_MAX: u8 = 0x3F;
const GLYPH_SLOTS: u8 = 8;

/// Layout of the serial start byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartByte {
    /// Fixed sync bits.
    pub base: u8,
    /// Set for data, clear for commands.
    pub register_select: u8,
    /// Set for reads.
    pub read_write: u8,
}

impl StartByte {
    /// RS in bit 6, R/W in bit 5.
    pub const STANDARD: StartByte = StartByte {
        base: 0x00,
        register_select: 0x40,
        read_write: 0x20,
    };

    /// Five sync bits, then R/W and RS: `0b11111_RW_RS_0`.
    pub const SYNC_PREFIXED: StartByte = StartByte {
        base: 0xF8,
        register_select: 0x02,
        read_write: 0x04,
    };

    pub fn encode(self, data: bool, read: bool) -> u8 {
        let mut b = self.base;
        if data {
            b |= self.register_select;
        }
        if read {
            b |= self.read_write;
        }
        b
    }
}

/// Per-module settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hd44780Config {
    /// Two-line (N=1) display in the function set.
    pub two_lines: bool,
    pub row_bases: &'static [u8],
    pub start_byte: StartByte,
}

impl Default for Hd44780Config {
    fn default() -> Self {
        Hd44780Config {
            two_lines: true,
            row_bases: &[0x00, 0x40],
            start_byte: StartByte::STANDARD,
        }
    }
}

impl Hd44780Config {
    /// 20x4 and 16x4 modules, whose rows 2 and 3 continue rows 0 and 1.
    pub fn four_line() -> Self {
        Hd44780Config {
            row_bases: &[0x00, 0x40, 0x14, 0x54],
            ..Self::default()
        }
    }

    pub fn start_byte(self, start_byte: StartByte) -> Self {
        Self { start_byte, ..self }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// 8-bit bus, line count, and brightness (0 brightest, 3 dimmest).
    FunctionSet { two_lines: bool, brightness: u8 },
    DisplayControl { display: bool, cursor: bool, blink: bool },
    Clear,
    Home,
    EntryMode { increment: bool, shift: bool },
    /// Range 0-0x7F.
    SetDdramAddress(u8),
    /// Range 0-0x3F.
    SetCgramAddress(u8),
}

impl Command {
    pub fn encode(self) -> Result<u8, Error> {
        let code = match self {
            Command::FunctionSet {
                two_lines,
                brightness,
            } => {
                let lines = if two_lines { 0x08 } else { 0x00 };
                0x30 | lines | (brightness & 0x03)
            }
            Command::DisplayControl {
                display,
                cursor,
                blink,
            } => 0x08 | (display as u8) << 2 | (cursor as u8) << 1 | blink as u8,
            Command::Clear => 0x01,
            Command::Home => 0x02,
            Command::EntryMode { increment, shift } => 0x04 | (increment as u8) << 1 | shift as u8,
            Command::SetDdramAddress(addr) => match addr {
                0..=DDRAM_ADDR_MAX => 0x80 | addr,
                _ => return Err(Error::InvalidArgs),
            },
            Command::SetCgramAddress(addr) => match addr {
                0..=CGRAM_ADDR_MAX => 0x40 | addr,
                _ => return Err(Error::InvalidArgs),
            },
        };
        Ok(code)
    }

    pub fn send<T>(self, iface: &mut T, start: StartByte) -> Result<(), Error>
    where
        T: Transport,
    {
        let code = self.encode()?;
        transfer(iface, start, false, &[code])
    }
}

/// Send `payload` as commands (`data == false`) or display data.
fn transfer<T>(iface: &mut T, start: StartByte, data: bool, payload: &[u8]) -> Result<(), Error>
where
    T: Transport,
{
    if iface.supports_control_lines() {
        iface
            .set_control_line(ControlLine::RegisterSelect, data)
            .map_err(|_| Error::TransportFail)?;
        return iface.write(payload).map_err(|_| Error::TransportFail);
    }
    let mut buf = [0u8; FRAME + 1];
    buf[0] = start.encode(data, false);
    for chunk in payload.chunks(FRAME) {
        buf[1..=chunk.len()].copy_from_slice(chunk);
        iface
            .write(&buf[..=chunk.len()])
            .map_err(|_| Error::TransportFail)?;
    }
    Ok(())
}

pub struct Hd44780 {
    config: Hd44780Config,
    brightness: u8,
    blink: bool,
}

impl Hd44780 {
    pub fn new(config: Hd44780Config) -> Self {
        Hd44780 {
            config,
            brightness: 0,
            blink: false,
        }
    }

    fn function_set<T: Transport>(&self, iface: &mut T) -> Result<(), Error> {
        Command::FunctionSet {
            two_lines: self.config.two_lines,
            brightness: self.brightness,
        }
        .send(iface, self.config.start_byte)
    }

    fn display_control<T: Transport>(&self, iface: &mut T) -> Result<(), Error> {
        Command::DisplayControl {
            display: true,
            cursor: false,
            blink: self.blink,
        }
        .send(iface, self.config.start_byte)
    }
}

impl Controller for Hd44780 {
    fn name(&self) -> &'static str {
        "HD44780"
    }

    fn row_bases(&self) -> RowBases {
        RowBases::Table(self.config.row_bases)
    }

    fn init<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        self.brightness = 0;
        self.blink = false;
        let start = self.config.start_byte;
        self.function_set(iface)?;
        self.display_control(iface)?;
        Command::Clear.send(iface, start)?;
        Command::EntryMode {
            increment: true,
            shift: false,
        }
        .send(iface, start)
    }

    fn clear<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        Command::Clear.send(iface, self.config.start_byte)
    }

    fn home<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        Command::Home.send(iface, self.config.start_byte)
    }

    fn move_cursor<T: Transport>(&mut self, iface: &mut T, pos: Position) -> Result<(), Error> {
        Command::SetDdramAddress(pos.address).send(iface, self.config.start_byte)
    }

    fn write_data<T: Transport>(&mut self, iface: &mut T, data: &[u8]) -> Result<(), Error> {
        transfer(iface, self.config.start_byte, true, data)
    }

    fn glyph_encoding(&self) -> Option<GlyphEncoding> {
        Some(GlyphEncoding {
            packing: GlyphPacking::RowMajor,
            codes: GlyphCodeMap::Offset(0),
            reserved: &[],
            commands_from: None,
        })
    }

    /// Leaves the address counter in CGRAM; the next write must be preceded by a cursor move.
    fn store_glyph<T: Transport>(
        &mut self,
        iface: &mut T,
        index: u8,
        _code: u8,
        packed: &[u8],
    ) -> Result<(), Error> {
        if index >= GLYPH_SLOTS {
            return Err(Error::InvalidArgs);
        }
        Command::SetCgramAddress(index * 8).send(iface, self.config.start_byte)?;
        transfer(iface, self.config.start_byte, true, packed)
    }

    fn set_dimming<T: Transport>(&mut self, iface: &mut T, level: u8) -> Result<(), Error> {
        self.brightness = level & 0x03;
        self.function_set(iface)
    }

    /// The function-set brightness bits count down: 0 is full brightness, 3 is 25%.
    fn set_brightness<T: Transport>(
        &mut self,
        iface: &mut T,
        lumens: u8,
        _dimming_levels: u8,
    ) -> Result<(), Error> {
        self.brightness = 3 - lumens / 64;
        self.function_set(iface)
    }

    fn set_cursor_blink_rate<T: Transport>(&mut self, iface: &mut T, rate: u8) -> Result<(), Error> {
        self.blink = rate != 0;
        self.display_control(iface)
    }
}
