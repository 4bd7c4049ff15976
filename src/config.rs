//! Declarative settings a driver applies right after the controller handshake.

use crate::error::Error;
use crate::hal::VfdHal;

/// A configuration for the display. Builder methods offer a declarative way to either send a
/// setting at init time, or to leave it at the module's power-on default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    dimming: Option<u8>,
    cursor_blink_rate: Option<u8>,
    display_mode: Option<u8>,
    clear_screen: bool,
}

impl Config {
    /// A configuration that changes nothing.
    pub const fn new() -> Self {
        Config {
            dimming: None,
            cursor_blink_rate: None,
            display_mode: None,
            clear_screen: false,
        }
    }

    /// Extend this `Config` to set a dimming level. See `VfdHal::set_dimming`.
    pub fn dimming(self, level: u8) -> Self {
        Self {
            dimming: Some(level),
            ..self
        }
    }

    /// Extend this `Config` to set the cursor blink rate. See `VfdHal::set_cursor_blink_rate`.
    pub fn cursor_blink_rate(self, rate: u8) -> Self {
        Self {
            cursor_blink_rate: Some(rate),
            ..self
        }
    }

    /// Extend this `Config` to select a raw display mode. See `VfdHal::set_display_mode`.
    pub fn display_mode(self, mode: u8) -> Self {
        Self {
            display_mode: Some(mode),
            ..self
        }
    }

    /// Clear the screen once everything else is applied.
    pub fn clear_screen(self, clear: bool) -> Self {
        Self {
            clear_screen: clear,
            ..self
        }
    }

    /// Issue the configured commands to `hal`, stopping at the first failure.
    pub(crate) fn apply<H>(&self, hal: &mut H) -> Result<(), Error>
    where
        H: VfdHal + ?Sized,
    {
        self.dimming.map_or(Ok(()), |l| hal.set_dimming(l))?;
        self.cursor_blink_rate
            .map_or(Ok(()), |r| hal.set_cursor_blink_rate(r))?;
        self.display_mode.map_or(Ok(()), |m| hal.set_display_mode(m))?;
        if self.clear_screen {
            hal.clear()?;
        }
        Ok(())
    }
}
