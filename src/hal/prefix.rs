//! Command-prefix controllers (Matrix Orbital VK202-25 and kin).
//!
//! Text bytes go out as they are. Every command is `0xFE`, a command code, then zero to two
//! parameters. Cursor positions are 1-based, column first.

use crate::error::Error;
use crate::interface::Transport;

use super::{Controller, CursorControl, Position, RowBases};

pub const PREFIX: u8 = 0xFE;

const CMD_CLEAR: u8 = 0x58;
const CMD_POSITION: u8 = 0x47;
const CMD_BRIGHTNESS: u8 = 0x59;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prefix;

impl Prefix {
    pub fn new() -> Self {
        Prefix
    }

    fn command<T: Transport>(iface: &mut T, code: u8, params: &[u8]) -> Result<(), Error> {
        let mut buf = [PREFIX, code, 0, 0];
        let end = 2 + params.len();
        buf.get_mut(2..end)
            .ok_or(Error::InvalidArgs)?
            .copy_from_slice(params);
        iface.write(&buf[..end]).map_err(|_| Error::TransportFail)
    }
}

impl Controller for Prefix {
    fn name(&self) -> &'static str {
        "VK202-25"
    }

    fn row_bases(&self) -> RowBases {
        RowBases::Linear
    }

    /// The module comes up usable; there is nothing to send.
    fn init<T: Transport>(&mut self, _iface: &mut T) -> Result<(), Error> {
        Ok(())
    }

    fn reset<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        self.clear(iface)
    }

    fn clear<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        Self::command(iface, CMD_CLEAR, &[])
    }

    fn home<T: Transport>(&mut self, iface: &mut T) -> Result<(), Error> {
        Self::command(iface, CMD_POSITION, &[1, 1])
    }

    fn move_cursor<T: Transport>(&mut self, iface: &mut T, pos: Position) -> Result<(), Error> {
        Self::command(iface, CMD_POSITION, &[pos.col + 1, pos.row + 1])
    }

    fn write_data<T: Transport>(&mut self, iface: &mut T, data: &[u8]) -> Result<(), Error> {
        iface.write(data).map_err(|_| Error::TransportFail)
    }

    fn cursor_control(&self, motion: CursorControl) -> Option<u8> {
        Some(match motion {
            CursorControl::BackSpace => 0x08,
            CursorControl::HorizontalTab => 0x09,
            CursorControl::LineFeed => 0x0A,
            CursorControl::CarriageReturn => 0x0D,
        })
    }

    /// Native 0..=255 brightness, no dimming levels involved.
    fn set_brightness<T: Transport>(
        &mut self,
        iface: &mut T,
        lumens: u8,
        _dimming_levels: u8,
    ) -> Result<(), Error> {
        Self::command(iface, CMD_BRIGHTNESS, &[lumens])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::presets;
    use crate::hal::{Driver, State, VfdHal};
    use crate::interface::test_spy::{sends, SpyHandle, SpyTransport};

    fn vk202() -> (Driver<SpyTransport, Prefix>, SpyHandle) {
        let (spy, handle) = SpyTransport::new().split();
        let mut hal = Driver::new(spy, Prefix::new(), presets::vk202_25());
        hal.init().unwrap();
        (hal, handle)
    }

    #[test]
    fn init_is_silent_reset_clears() {
        let (mut hal, handle) = vk202();
        assert_eq!(hal.state(), State::Ready);
        assert!(handle.bytes().is_empty());
        hal.reset().unwrap();
        handle.check(&[0xFE, 0x58]);
    }

    #[test]
    fn one_based_positions() {
        let (mut hal, handle) = vk202();
        hal.cursor_home().unwrap();
        hal.write_at(1, 19, b"!").unwrap();
        handle.check(&sends!([0xFE, 0x47, 1, 1], [0xFE, 0x47, 20, 2], *b"!"));
        handle.clear();
        assert_eq!(hal.set_cursor_pos(2, 0), Err(Error::InvalidArgs));
        assert!(handle.bytes().is_empty());
    }

    #[test]
    fn brightness_is_native() {
        let (mut hal, handle) = vk202();
        hal.set_brightness(200).unwrap();
        handle.check(&[0xFE, 0x59, 200]);
    }

    #[test]
    fn unsupported_commands_send_nothing() {
        let (mut hal, handle) = vk202();
        assert_eq!(hal.set_dimming(1), Err(Error::NotSupported));
        assert_eq!(hal.set_cursor_blink_rate(1), Err(Error::NotSupported));
        assert_eq!(hal.set_display_mode(0x11), Err(Error::NotSupported));
        assert_eq!(hal.change_char_set(0), Err(Error::NotSupported));
        assert_eq!(hal.send_escape_sequence(b"A"), Err(Error::NotSupported));
        assert_eq!(hal.write_custom_char(0), Err(Error::NotSupported));
        assert!(handle.bytes().is_empty());
    }
}
