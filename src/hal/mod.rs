//! The device HAL: one uniform command surface over every controller family.
//!
//! [`VfdHal`] is the object-safe contract renderers and applications program against. [`Driver`]
//! implements it once for any [`Controller`], which only has to know its own byte encodings. The
//! driver does everything the families share: lifecycle, argument validation against the
//! [`Capabilities`], row-base addressing, last-error bookkeeping, centering and software scroll.
//!
//! Every command checks, in order: a transport is bound (`TransportFail`), `init` has completed
//! (`Unknown`), the capability flag is present (`NotSupported`), arguments are in range
//! (`InvalidArgs`). Only then does any byte go out. A transport failure part way through a command
//! aborts the rest of it; bytes already sent are not undone.

pub mod escape;
pub mod hd44780;
pub mod prefix;

use core::iter;

use crate::capabilities::{Capabilities, CapabilityFlags};
use crate::config::Config;
use crate::error::{Error, ErrorCode};
use crate::glyph::{GlyphEncoding, GlyphPattern};
use crate::interface::Transport;
use crate::scroll::{
    self, HorizontalScroll, ScrollDirection, VerticalScroll, BLANK, H_SCROLL_CAPACITY,
    V_SCROLL_CAPACITY,
};

/// Longest payload `send_escape_sequence` forwards.
pub const MAX_ESCAPE_PAYLOAD: usize = 8;

const CHUNK: usize = 32;

/// Lifecycle of a HAL instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Uninitialized,
    Ready,
}

/// Single-byte cursor motions some controllers accept in the data stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorControl {
    BackSpace,
    HorizontalTab,
    LineFeed,
    CarriageReturn,
}

/// How a controller lays rows out in display memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowBases {
    /// Row `r` starts at `r * columns`.
    Linear,
    /// Row `r` starts at `table[r]`.
    Table(&'static [u8]),
}

impl RowBases {
    /// Linear display-memory address of `(row, col)`. `None` if the row has no base or the address
    /// does not fit a byte.
    pub fn address(self, row: u8, col: u8, columns: u8) -> Option<u8> {
        let base = match self {
            RowBases::Linear => u16::from(row) * u16::from(columns),
            RowBases::Table(table) => u16::from(*table.get(row as usize)?),
        };
        u8::try_from(base + u16::from(col)).ok()
    }
}

/// A validated cursor target, with the address already resolved through the row bases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub row: u8,
    pub col: u8,
    pub address: u8,
}

/// The byte encodings of one controller family. Methods that are not overridden report
/// `NotSupported`.
pub trait Controller {
    /// Fallback device name when the capabilities do not carry one.
    fn name(&self) -> &'static str;

    fn row_bases(&self) -> RowBases;

    /// Bring the device to a known state: display on, cleared, cursor home.
    fn init<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error>;

    fn reset<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        self.init(iface)
    }

    fn clear<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error>;

    fn home<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error>;

    fn move_cursor<T: Transport>(&mut self, iface: &mut T, pos: Position) -> Result<(), Error>;

    /// Send display characters. `data` is never empty.
    fn write_data<T: Transport>(&mut self, iface: &mut T, data: &[u8]) -> Result<(), Error>;

    fn cursor_control(&self, _motion: CursorControl) -> Option<u8> {
        None
    }

    fn glyph_encoding(&self) -> Option<GlyphEncoding> {
        None
    }

    /// Store an already packed glyph for slot `index`, shown by character `code`.
    fn store_glyph<T: Transport>(
        &mut self,
        _iface: &mut T,
        _index: u8,
        _code: u8,
        _packed: &[u8],
    ) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    /// `level` is already checked against the dimming level count.
    fn set_dimming<T: Transport>(&mut self, _iface: &mut T, _level: u8) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    /// Map 0..=255 lumens onto the device. Without a native brightness command this scales onto
    /// the `dimming_levels` available.
    fn set_brightness<T: Transport>(
        &mut self,
        iface: &mut T,
        lumens: u8,
        dimming_levels: u8,
    ) -> Result<(), Error> {
        if dimming_levels == 0 {
            return Err(Error::NotSupported);
        }
        let level = u16::from(lumens) * u16::from(dimming_levels) / 256;
        self.set_dimming(iface, level as u8)
    }

    fn set_cursor_blink_rate<T: Transport>(&mut self, _iface: &mut T, _rate: u8) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn set_display_mode<T: Transport>(&mut self, _iface: &mut T, _mode: u8) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn change_char_set<T: Transport>(&mut self, _iface: &mut T, _set: u8) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    /// Send an escape-framed command. `payload` holds 1..=8 bytes, none of them zero.
    fn send_escape<T: Transport>(&mut self, _iface: &mut T, _payload: &[u8]) -> Result<(), Error> {
        Err(Error::NotSupported)
    }
}

/// The uniform command surface of a text VFD. Every command returns its outcome and also leaves
/// it in the slot read by [`last_error`](VfdHal::last_error).
pub trait VfdHal {
    fn capabilities(&self) -> &Capabilities;

    fn capability_flags(&self) -> CapabilityFlags {
        self.capabilities().flags()
    }

    fn device_name(&self) -> &'static str;

    fn state(&self) -> State;

    fn last_error(&self) -> ErrorCode;

    fn clear_error(&mut self);

    fn init(&mut self) -> Result<(), Error>;

    fn reset(&mut self) -> Result<(), Error>;

    fn clear(&mut self) -> Result<(), Error>;

    fn cursor_home(&mut self) -> Result<(), Error>;

    fn set_cursor_pos(&mut self, row: u8, col: u8) -> Result<(), Error>;

    fn move_to(&mut self, row: u8, col: u8) -> Result<(), Error> {
        self.set_cursor_pos(row, col)
    }

    fn set_cursor_blink_rate(&mut self, rate: u8) -> Result<(), Error>;

    fn write_char(&mut self, c: u8) -> Result<(), Error>;

    fn write(&mut self, text: &[u8]) -> Result<(), Error>;

    fn write_at(&mut self, row: u8, col: u8, text: &[u8]) -> Result<(), Error> {
        self.move_to(row, col)?;
        self.write(text)
    }

    fn write_char_at(&mut self, row: u8, col: u8, c: u8) -> Result<(), Error> {
        self.move_to(row, col)?;
        self.write_char(c)
    }

    /// Write `text` centered on `row`, padding both sides with blanks to the full width. Text as
    /// wide as the row or wider is written flush left instead.
    fn center_text(&mut self, text: &[u8], row: u8) -> Result<(), Error>;

    fn set_brightness(&mut self, lumens: u8) -> Result<(), Error>;

    fn set_dimming(&mut self, level: u8) -> Result<(), Error>;

    /// Select a raw, device-specific display mode code.
    fn set_display_mode(&mut self, mode: u8) -> Result<(), Error>;

    fn change_char_set(&mut self, set: u8) -> Result<(), Error>;

    fn set_custom_char(&mut self, index: u8, pattern: &GlyphPattern) -> Result<(), Error>;

    fn write_custom_char(&mut self, index: u8) -> Result<(), Error>;

    /// The character code that shows glyph slot `index`, if the device has one for it.
    fn custom_char_code(&self, index: u8) -> Option<u8>;

    /// Send an escape-framed command. The payload ends at the first zero byte or after eight
    /// bytes, whichever comes first; the zero itself is not sent.
    fn send_escape_sequence(&mut self, payload: &[u8]) -> Result<(), Error>;

    /// Advance a horizontal ring-window scroll of `text` on `row` by one step. A new text or row
    /// starts over from the beginning.
    fn h_scroll(&mut self, text: &[u8], direction: ScrollDirection, row: u8) -> Result<(), Error>;

    /// Advance a vertical line-window scroll of `text` shown from `start_row` down by one step. A
    /// new text starts over from its first line.
    fn v_scroll_text(
        &mut self,
        text: &[u8],
        start_row: u8,
        direction: ScrollDirection,
    ) -> Result<(), Error>;

    /// Vertical scroll with every line centered.
    fn crawl_text(
        &mut self,
        text: &[u8],
        start_row: u8,
        direction: ScrollDirection,
    ) -> Result<(), Error>;

    fn back_space(&mut self) -> Result<(), Error>;

    fn h_tab(&mut self) -> Result<(), Error>;

    fn line_feed(&mut self) -> Result<(), Error>;

    fn carriage_return(&mut self) -> Result<(), Error>;

    fn delay_us(&mut self, us: u32);
}

/// The transport, if one is bound and the device is initialized.
fn bound<T>(transport: &mut Option<T>, state: State) -> Result<&mut T, Error> {
    let iface = transport.as_mut().ok_or(Error::TransportFail)?;
    match state {
        State::Ready => Ok(iface),
        State::Uninitialized => Err(Error::Unknown),
    }
}

fn require(caps: &Capabilities, flag: CapabilityFlags) -> Result<(), Error> {
    if caps.has_capability(flag) {
        Ok(())
    } else {
        Err(Error::NotSupported)
    }
}

fn locate(caps: &Capabilities, bases: RowBases, row: u8, col: u8) -> Result<Position, Error> {
    if row >= caps.text_rows() || col >= caps.text_columns() {
        return Err(Error::InvalidArgs);
    }
    let address = bases
        .address(row, col, caps.text_columns())
        .ok_or(Error::InvalidArgs)?;
    Ok(Position { row, col, address })
}

/// Feed `bytes` to the controller through a fixed chunk buffer.
fn write_iter<T, C, I>(ctl: &mut C, iface: &mut T, mut bytes: I) -> Result<(), Error>
where
    T: Transport,
    C: Controller,
    I: Iterator<Item = u8>,
{
    let mut buf = [0u8; CHUNK];
    loop {
        let mut len = 0;
        for (slot, b) in buf.iter_mut().zip(&mut bytes) {
            *slot = b;
            len += 1;
        }
        if len > 0 {
            ctl.write_data(iface, &buf[..len])?;
        }
        if len != buf.len() {
            return Ok(());
        }
    }
}

/// A [`VfdHal`] built from a transport, a controller family and a capability descriptor.
pub struct Driver<T, C> {
    transport: Option<T>,
    controller: C,
    caps: Capabilities,
    config: Config,
    state: State,
    last_error: ErrorCode,
    h_scroll: HorizontalScroll<H_SCROLL_CAPACITY>,
    v_scroll: VerticalScroll<V_SCROLL_CAPACITY>,
}

impl<T, C> Driver<T, C>
where
    T: Transport,
    C: Controller,
{
    pub fn new(transport: T, controller: C, caps: Capabilities) -> Self {
        Self {
            transport: Some(transport),
            ..Self::unbound(controller, caps)
        }
    }

    /// A driver with no transport yet. Every command fails with `TransportFail` until
    /// [`set_transport`](Driver::set_transport) is called.
    pub fn unbound(controller: C, caps: Capabilities) -> Self {
        Driver {
            transport: None,
            controller,
            caps,
            config: Config::new(),
            state: State::Uninitialized,
            last_error: ErrorCode::Ok,
            h_scroll: HorizontalScroll::new(),
            v_scroll: VerticalScroll::new(),
        }
    }

    /// Commands to apply after the controller handshake on every `init`.
    pub fn with_config(self, config: Config) -> Self {
        Self { config, ..self }
    }

    /// Bind a new transport, returning the previous one. The device must be initialized again.
    pub fn set_transport(&mut self, transport: T) -> Option<T> {
        self.state = State::Uninitialized;
        self.transport.replace(transport)
    }

    pub fn take_transport(&mut self) -> Option<T> {
        self.state = State::Uninitialized;
        self.transport.take()
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn release(self) -> (Option<T>, C) {
        (self.transport, self.controller)
    }

    /// Run one command and record its outcome.
    fn command<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R, Error>) -> Result<R, Error> {
        let result = f(self);
        self.last_error = ErrorCode::from(&result);
        if let Err(e) = result {
            debug!("{} command failed: {}", self.device_name(), e);
        }
        result
    }

    fn handshake(&mut self, reset: bool) -> Result<(), Error> {
        let iface = self.transport.as_mut().ok_or(Error::TransportFail)?;
        if self.caps.text_rows() == 0 || self.caps.text_columns() == 0 {
            warn!("refusing to init a device with no text geometry");
            return Err(Error::InvalidArgs);
        }
        self.state = State::Uninitialized;
        if reset {
            self.controller.reset(iface)?;
        } else {
            self.controller.init(iface)?;
        }
        // The configured settings go through the public commands, which need `Ready`.
        self.state = State::Ready;
        let config = self.config;
        if let Err(e) = config.apply(self) {
            self.state = State::Uninitialized;
            return Err(e);
        }
        trace!("{} ready", self.device_name());
        Ok(())
    }

    fn cursor_motion(&mut self, motion: CursorControl) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            let code = d.controller.cursor_control(motion).ok_or(Error::NotSupported)?;
            d.controller.write_data(iface, &[code])
        })
    }

    fn glyph_code(&self, index: u8) -> Result<(GlyphEncoding, u8), Error> {
        require(&self.caps, CapabilityFlags::USER_DEFINED_CHARS)?;
        let enc = self.controller.glyph_encoding().ok_or(Error::NotSupported)?;
        if index >= self.caps.max_user_defined_characters() {
            return Err(Error::InvalidArgs);
        }
        Ok((enc, enc.code(index)?))
    }

    fn render_v_scroll(&mut self) -> Result<(), Error> {
        let iface = bound(&mut self.transport, self.state)?;
        let cols = self.caps.text_columns();
        let start = self.v_scroll.start_row();
        for k in 0..(self.caps.text_rows() - start) {
            let pos = locate(&self.caps, self.controller.row_bases(), start + k, 0)?;
            self.controller.move_cursor(iface, pos)?;
            let line = self.v_scroll.visible_line(k as usize);
            write_iter(&mut self.controller, iface, scroll::padded(line, cols as usize))?;
        }
        Ok(())
    }

    fn v_scroll_step(
        &mut self,
        text: &[u8],
        start_row: u8,
        direction: ScrollDirection,
    ) -> Result<(), Error> {
        if !self.v_scroll.load(text, start_row) {
            self.v_scroll.step(direction);
        }
        self.render_v_scroll()
    }

    fn scroll_checks(&mut self, row: u8, flag: CapabilityFlags) -> Result<(), Error> {
        bound(&mut self.transport, self.state)?;
        require(&self.caps, flag)?;
        if row >= self.caps.text_rows() {
            return Err(Error::InvalidArgs);
        }
        Ok(())
    }
}

impl<T, C> VfdHal for Driver<T, C>
where
    T: Transport,
    C: Controller,
{
    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn device_name(&self) -> &'static str {
        match self.caps.device_name() {
            "" => self.controller.name(),
            name => name,
        }
    }

    fn state(&self) -> State {
        self.state
    }

    fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    fn clear_error(&mut self) {
        self.last_error = ErrorCode::Ok;
    }

    fn init(&mut self) -> Result<(), Error> {
        self.command(|d| d.handshake(false))
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.command(|d| d.handshake(true))
    }

    fn clear(&mut self) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            d.controller.clear(iface)
        })
    }

    fn cursor_home(&mut self) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            d.controller.home(iface)
        })
    }

    fn set_cursor_pos(&mut self, row: u8, col: u8) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            let pos = locate(&d.caps, d.controller.row_bases(), row, col)?;
            d.controller.move_cursor(iface, pos)
        })
    }

    fn set_cursor_blink_rate(&mut self, rate: u8) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            require(&d.caps, CapabilityFlags::CURSOR_BLINK)?;
            d.controller.set_cursor_blink_rate(iface, rate)
        })
    }

    fn write_char(&mut self, c: u8) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            d.controller.write_data(iface, &[c])
        })
    }

    fn write(&mut self, text: &[u8]) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            write_iter(&mut d.controller, iface, text.iter().copied())
        })
    }

    fn center_text(&mut self, text: &[u8], row: u8) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            let cols = d.caps.text_columns() as usize;
            let pos = locate(&d.caps, d.controller.row_bases(), row, 0)?;
            let (left, right) = scroll::center_padding(text.len(), cols).unwrap_or((0, 0));
            d.controller.move_cursor(iface, pos)?;
            let line = iter::repeat(BLANK)
                .take(left)
                .chain(text.iter().copied())
                .chain(iter::repeat(BLANK).take(right));
            write_iter(&mut d.controller, iface, line)
        })
    }

    fn set_brightness(&mut self, lumens: u8) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            let either = CapabilityFlags::BRIGHTNESS_CONTROL | CapabilityFlags::DIMMING;
            if !d.caps.flags().intersects(either) {
                return Err(Error::NotSupported);
            }
            d.controller.set_brightness(iface, lumens, d.caps.dimming_levels())
        })
    }

    fn set_dimming(&mut self, level: u8) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            require(&d.caps, CapabilityFlags::DIMMING)?;
            if level >= d.caps.dimming_levels() {
                return Err(Error::InvalidArgs);
            }
            d.controller.set_dimming(iface, level)
        })
    }

    fn set_display_mode(&mut self, mode: u8) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            d.controller.set_display_mode(iface, mode)
        })
    }

    fn change_char_set(&mut self, set: u8) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            d.controller.change_char_set(iface, set)
        })
    }

    fn set_custom_char(&mut self, index: u8, pattern: &GlyphPattern) -> Result<(), Error> {
        self.command(|d| {
            bound(&mut d.transport, d.state)?;
            let (enc, code) = d.glyph_code(index)?;
            let packed = enc.pack(pattern, d.caps.char_pixel_height());
            let iface = bound(&mut d.transport, d.state)?;
            d.controller.store_glyph(iface, index, code, &packed)
        })
    }

    fn write_custom_char(&mut self, index: u8) -> Result<(), Error> {
        self.command(|d| {
            bound(&mut d.transport, d.state)?;
            let (_, code) = d.glyph_code(index)?;
            let iface = bound(&mut d.transport, d.state)?;
            d.controller.write_data(iface, &[code])
        })
    }

    fn custom_char_code(&self, index: u8) -> Option<u8> {
        self.glyph_code(index).ok().map(|(_, code)| code)
    }

    fn send_escape_sequence(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.command(|d| {
            let iface = bound(&mut d.transport, d.state)?;
            let len = payload
                .iter()
                .take(MAX_ESCAPE_PAYLOAD)
                .take_while(|b| **b != 0)
                .count();
            if len == 0 {
                return Err(Error::InvalidArgs);
            }
            d.controller.send_escape(iface, &payload[..len])
        })
    }

    fn h_scroll(&mut self, text: &[u8], direction: ScrollDirection, row: u8) -> Result<(), Error> {
        self.command(|d| {
            d.scroll_checks(row, CapabilityFlags::HORIZONTAL_SCROLL)?;
            let cols = d.caps.text_columns() as usize;
            if !d.h_scroll.load(text, row) {
                d.h_scroll.step(direction, cols);
            }
            let iface = bound(&mut d.transport, d.state)?;
            let pos = locate(&d.caps, d.controller.row_bases(), row, 0)?;
            d.controller.move_cursor(iface, pos)?;
            write_iter(&mut d.controller, iface, d.h_scroll.window(cols))
        })
    }

    fn v_scroll_text(
        &mut self,
        text: &[u8],
        start_row: u8,
        direction: ScrollDirection,
    ) -> Result<(), Error> {
        self.command(|d| {
            d.scroll_checks(start_row, CapabilityFlags::VERTICAL_SCROLL)?;
            d.v_scroll_step(text, start_row, direction)
        })
    }

    fn crawl_text(
        &mut self,
        text: &[u8],
        start_row: u8,
        direction: ScrollDirection,
    ) -> Result<(), Error> {
        self.command(|d| {
            d.scroll_checks(start_row, CapabilityFlags::VERTICAL_SCROLL)?;
            let centered: heapless::Vec<u8, V_SCROLL_CAPACITY> =
                scroll::center_lines(text, d.caps.text_columns() as usize);
            d.v_scroll_step(&centered, start_row, direction)
        })
    }

    fn back_space(&mut self) -> Result<(), Error> {
        self.cursor_motion(CursorControl::BackSpace)
    }

    fn h_tab(&mut self) -> Result<(), Error> {
        self.cursor_motion(CursorControl::HorizontalTab)
    }

    fn line_feed(&mut self) -> Result<(), Error> {
        self.cursor_motion(CursorControl::LineFeed)
    }

    fn carriage_return(&mut self) -> Result<(), Error> {
        self.cursor_motion(CursorControl::CarriageReturn)
    }

    fn delay_us(&mut self, us: u32) {
        if let Some(iface) = self.transport.as_mut() {
            iface.delay_us(us);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::escape::{Escape, EscapeConfig};
    use super::hd44780::Hd44780;
    use super::*;
    use crate::capabilities::presets;
    use crate::interface::test_spy::{sends, SpyHandle, SpyTransport};
    use proptest::prelude::*;

    fn vfd20s401() -> (Driver<SpyTransport, Escape>, SpyHandle) {
        let (spy, handle) = SpyTransport::new().split();
        let mut hal = Driver::new(spy, Escape::new(EscapeConfig::vfd20s401()), presets::vfd20s401());
        hal.init().unwrap();
        handle.clear();
        (hal, handle)
    }

    fn generic(caps: Capabilities) -> (Driver<SpyTransport, Escape>, SpyHandle) {
        let (spy, handle) = SpyTransport::new().split();
        let mut hal = Driver::new(spy, Escape::new(EscapeConfig::vfd20t202()), caps);
        hal.init().unwrap();
        handle.clear();
        (hal, handle)
    }

    #[test]
    fn row_bases() {
        assert_eq!(RowBases::Linear.address(1, 3, 20), Some(23));
        assert_eq!(RowBases::Linear.address(13, 0, 20), None);
        let t = RowBases::Table(&[0x00, 0x40, 0x14, 0x54]);
        assert_eq!(t.address(2, 1, 20), Some(0x15));
        assert_eq!(t.address(4, 0, 20), None);
        assert_eq!(RowBases::Table(&[0xF0]).address(0, 0x20, 40), None);
    }

    #[test]
    fn lifecycle_errors() {
        let mut hal: Driver<SpyTransport, Escape> =
            Driver::unbound(Escape::new(EscapeConfig::vfd20s401()), presets::vfd20s401());
        assert_eq!(hal.init(), Err(Error::TransportFail));
        assert_eq!(hal.clear(), Err(Error::TransportFail));
        assert_eq!(hal.last_error(), ErrorCode::TransportFail);

        let (spy, handle) = SpyTransport::new().split();
        assert!(hal.set_transport(spy).is_none());
        assert_eq!(hal.state(), State::Uninitialized);
        assert_eq!(hal.write(b"A"), Err(Error::Unknown));
        assert!(handle.bytes().is_empty());

        hal.init().unwrap();
        assert_eq!(hal.state(), State::Ready);
        assert!(hal.last_error().is_ok());
        hal.clear_error();

        let (spy, _) = SpyTransport::new().split();
        assert!(hal.set_transport(spy).is_some());
        assert_eq!(hal.state(), State::Uninitialized);
    }

    #[test]
    fn zero_geometry_refuses_init() {
        let (spy, handle) = SpyTransport::new().split();
        let mut hal = Driver::new(spy, Escape::new(EscapeConfig::vfd20t202()), Capabilities::new());
        assert_eq!(hal.init(), Err(Error::InvalidArgs));
        assert_eq!(hal.state(), State::Uninitialized);
        assert!(handle.bytes().is_empty());
    }

    #[test]
    fn table_addressing() {
        let (mut hal, handle) = vfd20s401();
        hal.set_cursor_pos(2, 5).unwrap();
        handle.check(&[0x80 | 0x45]);
        handle.clear();
        assert_eq!(hal.set_cursor_pos(4, 0), Err(Error::InvalidArgs));
        assert_eq!(hal.set_cursor_pos(0, 20), Err(Error::InvalidArgs));
        assert_eq!(hal.last_error(), ErrorCode::InvalidArgs);
        assert!(handle.bytes().is_empty());
    }

    #[test]
    fn center_hello_on_4x20() {
        let (mut hal, handle) = generic(presets::generic_20x4());
        hal.center_text(b"HELLO", 0).unwrap();
        handle.check(&sends!([0x1B, 0x48, 0x00], *b"       HELLO        "));
    }

    #[test]
    fn center_falls_back_flush_left() {
        let (mut hal, handle) = generic(presets::generic_16x2());
        hal.center_text(b"ABCDEFGHIJKLMNOPQRS", 1).unwrap();
        handle.check(&sends!([0x1B, 0x48, 16], *b"ABCDEFGHIJKLMNOPQRS"));
    }

    #[test]
    fn long_writes_are_chunked() {
        let (mut hal, handle) = generic(presets::generic_20x2());
        let text = [b'x'; 40];
        hal.write(&text).unwrap();
        assert_eq!(handle.writes().len(), 2);
        assert_eq!(handle.bytes().len(), 40);
        handle.clear();
        hal.write(b"").unwrap();
        assert!(handle.writes().is_empty());
    }

    #[test]
    fn escape_sequence_framing() {
        let (mut hal, handle) = vfd20s401();
        hal.send_escape_sequence(&[0x41, 0x42, 0x00]).unwrap();
        handle.check(&[0x1B, 0x41, 0x42]);
        handle.clear();
        hal.send_escape_sequence(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
        handle.check(&[0x1B, 1, 2, 3, 4, 5, 6, 7, 8]);
        handle.clear();
        assert_eq!(hal.send_escape_sequence(&[0x00, 0x41]), Err(Error::InvalidArgs));
        assert!(handle.bytes().is_empty());
    }

    #[test]
    fn custom_glyph_checks() {
        let (mut hal, handle) = vfd20s401();
        hal.set_custom_char(0, &[0; 8]).unwrap();
        handle.check(&[0x1B, 0x43, 0x00, 0, 0, 0, 0, 0]);
        handle.clear();
        assert_eq!(hal.set_custom_char(16, &[0; 8]), Err(Error::InvalidArgs));
        assert!(handle.bytes().is_empty());
        assert_eq!(hal.custom_char_code(8), Some(0x10));
        hal.write_custom_char(8).unwrap();
        handle.check(&[0x10]);

        let (mut hal, handle) = generic(presets::vk202_25());
        assert_eq!(hal.set_custom_char(0, &[0; 8]), Err(Error::NotSupported));
        assert_eq!(hal.custom_char_code(0), None);
        assert!(handle.bytes().is_empty());
    }

    #[test]
    fn dimming_and_brightness() {
        let (mut hal, handle) = vfd20s401();
        hal.set_dimming(3).unwrap();
        handle.check(&[0x1B, 0x4C, 3]);
        handle.clear();
        assert_eq!(hal.set_dimming(8), Err(Error::InvalidArgs));
        hal.set_brightness(255).unwrap();
        handle.check(&[0x1B, 0x4C, 7]);
        handle.clear();
        hal.set_brightness(0).unwrap();
        handle.check(&[0x1B, 0x4C, 0]);
    }

    #[test]
    fn missing_flag_is_not_supported() {
        let caps = presets::generic_20x2().with_flag(CapabilityFlags::DIMMING, false);
        let (mut hal, handle) = generic(caps);
        assert_eq!(hal.set_dimming(0), Err(Error::NotSupported));
        assert_eq!(hal.last_error(), ErrorCode::NotSupported);
        assert!(handle.bytes().is_empty());
    }

    #[test]
    fn transport_failure_mid_command() {
        let (mut hal, handle) = generic(presets::generic_20x2());
        handle.fail_writes_after(1);
        assert_eq!(hal.write_at(0, 0, b"AB"), Err(Error::TransportFail));
        assert_eq!(hal.last_error(), ErrorCode::TransportFail);
        handle.check(&[0x1B, 0x48, 0x00]);
    }

    #[test]
    fn h_scroll_ring() {
        let caps = presets::generic_20x2().with_text_dimensions(2, 4);
        let (mut hal, handle) = generic(caps);
        hal.h_scroll(b"ABC", ScrollDirection::Forward, 1).unwrap();
        handle.check(&sends!([0x1B, 0x48, 4], *b"ABC "));
        handle.clear();
        hal.h_scroll(b"ABC", ScrollDirection::Forward, 1).unwrap();
        handle.check(&sends!([0x1B, 0x48, 4], *b"BC  "));
        handle.clear();
        hal.h_scroll(b"ABC", ScrollDirection::Backward, 1).unwrap();
        hal.h_scroll(b"ABC", ScrollDirection::Backward, 1).unwrap();
        handle.check(&sends!([0x1B, 0x48, 4], *b"ABC ", [0x1B, 0x48, 4], *b" ABC"));
        assert_eq!(
            hal.h_scroll(b"ABC", ScrollDirection::Forward, 2),
            Err(Error::InvalidArgs)
        );
    }

    #[test]
    fn v_scroll_and_crawl() {
        let caps = presets::generic_20x2().with_text_dimensions(2, 4);
        let (mut hal, handle) = generic(caps);
        hal.v_scroll_text(b"ab\ncd\nef", 0, ScrollDirection::Forward).unwrap();
        handle.check(&sends!([0x1B, 0x48, 0], *b"ab  ", [0x1B, 0x48, 4], *b"cd  "));
        handle.clear();
        hal.v_scroll_text(b"ab\ncd\nef", 0, ScrollDirection::Forward).unwrap();
        handle.clear();
        hal.v_scroll_text(b"ab\ncd\nef", 0, ScrollDirection::Forward).unwrap();
        handle.check(&sends!([0x1B, 0x48, 0], *b"ef  ", [0x1B, 0x48, 4], *b"ab  "));
        handle.clear();
        hal.v_scroll_text(b"ab\ncd\nef", 0, ScrollDirection::Backward).unwrap();
        handle.check(&sends!([0x1B, 0x48, 0], *b"cd  ", [0x1B, 0x48, 4], *b"ef  "));
        handle.clear();

        hal.crawl_text(b"ab\nc", 1, ScrollDirection::Forward).unwrap();
        handle.check(&sends!([0x1B, 0x48, 4], *b" ab "));
    }

    #[test]
    fn cursor_controls_and_char_sets() {
        let (mut hal, handle) = vfd20s401();
        hal.back_space().unwrap();
        hal.h_tab().unwrap();
        hal.line_feed().unwrap();
        hal.carriage_return().unwrap();
        hal.change_char_set(1).unwrap();
        handle.check(&[0x08, 0x09, 0x0A, 0x0D, 0x19]);
        assert_eq!(hal.change_char_set(2), Err(Error::InvalidArgs));
    }

    #[test]
    fn config_applied_after_init() {
        let (spy, handle) = SpyTransport::new().split();
        let cfg = Config::new().dimming(2).cursor_blink_rate(5).clear_screen(true);
        let mut hal = Driver::new(spy, Hd44780::new(Default::default()), presets::cu20025())
            .with_config(cfg);
        hal.init().unwrap();
        assert_eq!(hal.last_error(), ErrorCode::Ok);
        #[cfg_attr(rustfmt, rustfmt_skip)]
        handle.check(&[
            0x00, 0x38, 0x00, 0x0C, 0x00, 0x01, 0x00, 0x06,
            0x00, 0x3A,
            0x00, 0x0D,
            0x00, 0x01,
        ]);
    }

    proptest! {
        #[test]
        fn out_of_range_cursor_sends_nothing(
            rows in 1u8..=6,
            cols in 1u8..=40,
            row in 0u8..=255,
            col in 0u8..=255,
        ) {
            prop_assume!(row >= rows || col >= cols);
            let (mut hal, handle) = generic(presets::generic_20x2().with_text_dimensions(rows, cols));
            prop_assert_eq!(hal.set_cursor_pos(row, col), Err(Error::InvalidArgs));
            prop_assert_eq!(hal.last_error(), ErrorCode::InvalidArgs);
            prop_assert!(handle.bytes().is_empty());
        }

        #[test]
        fn in_range_cursor_addresses_linearly(
            rows in 1u8..=6,
            cols in 1u8..=40,
            row_seed in 0u8..=255,
            col_seed in 0u8..=255,
        ) {
            let (row, col) = (row_seed % rows, col_seed % cols);
            let (mut hal, handle) = generic(presets::generic_20x2().with_text_dimensions(rows, cols));
            prop_assert_eq!(hal.set_cursor_pos(row, col), Ok(()));
            handle.check(&[0x1B, 0x48, row * cols + col]);
        }

        #[test]
        fn cursor_then_write_matches_write_at(row in 0u8..4, col in 0u8..20) {
            let (mut a, ha) = vfd20s401();
            let (mut b, hb) = vfd20s401();
            a.set_cursor_pos(row, col).unwrap();
            a.write(b"X").unwrap();
            b.write_at(row, col, b"X").unwrap();
            prop_assert_eq!(ha.bytes(), hb.bytes());
        }

        #[test]
        fn repeated_init_stays_ready(n in 1usize..10) {
            let (spy, _) = SpyTransport::new().split();
            let mut hal = Driver::new(spy, Hd44780::new(Default::default()), presets::cu20025());
            for _ in 0..n {
                prop_assert_eq!(hal.init(), Ok(()));
                prop_assert_eq!(hal.state(), State::Ready);
            }
            prop_assert_eq!(hal.reset(), Ok(()));
            prop_assert_eq!(hal.state(), State::Ready);
        }
    }
}
