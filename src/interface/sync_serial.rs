//! The 3-wire synchronous serial interface (/STB, SCK, SIO) found on many VFD modules, bit-banged
//! over GPIO.
//!
//! Each `write` is one transfer: /STB is pulled low, every byte is shifted out MSB first with SIO
//! set up while SCK is low and sampled by the module on the falling edge, then /STB is released.
//! The register-select/read-write start byte is the HAL's business; to this interface it is just
//! the first byte of the transfer. The module gives no acknowledgement, so a write fails only if a
//! pin does.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::Transport;

/// Default SCK half-period in microseconds.
pub const DEFAULT_HALF_PERIOD_US: u32 = 2;

pub struct SyncSerial<STB, SCK, SIO, D> {
    /// Strobe, active low. Framing for one transfer.
    stb: STB,
    /// Shift clock, idles low.
    sck: SCK,
    /// Serial data out.
    sio: SIO,
    delay: D,
    half_period_us: u32,
}

impl<STB, SCK, SIO, D> SyncSerial<STB, SCK, SIO, D>
where
    STB: OutputPin,
    SCK: OutputPin,
    SIO: OutputPin,
    D: DelayNs,
{
    /// Take the three pins and a delay source, and park the bus in its idle state (/STB high, SCK
    /// and SIO low).
    pub fn new(mut stb: STB, mut sck: SCK, mut sio: SIO, delay: D) -> Result<Self, ()> {
        stb.set_high().map_err(|_| ())?;
        sck.set_low().map_err(|_| ())?;
        sio.set_low().map_err(|_| ())?;
        Ok(SyncSerial {
            stb,
            sck,
            sio,
            delay,
            half_period_us: DEFAULT_HALF_PERIOD_US,
        })
    }

    /// Use a different SCK half-period. Slow modules or long wires may need more than the
    /// default.
    pub fn with_half_period_us(self, us: u32) -> Self {
        Self {
            half_period_us: us,
            ..self
        }
    }

    /// Give back the pins and the delay source.
    pub fn release(self) -> (STB, SCK, SIO, D) {
        (self.stb, self.sck, self.sio, self.delay)
    }

    fn begin(&mut self) -> Result<(), ()> {
        self.stb.set_low().map_err(|_| ())?;
        self.delay.delay_us(self.half_period_us);
        Ok(())
    }

    fn end(&mut self) -> Result<(), ()> {
        self.delay.delay_us(self.half_period_us);
        self.stb.set_high().map_err(|_| ())?;
        self.delay.delay_us(self.half_period_us);
        Ok(())
    }

    fn shift_out(&mut self, byte: u8) -> Result<(), ()> {
        for bit in (0..8).rev() {
            if byte & (1 << bit) != 0 {
                self.sio.set_high().map_err(|_| ())?;
            } else {
                self.sio.set_low().map_err(|_| ())?;
            }
            self.delay.delay_us(self.half_period_us);
            self.sck.set_high().map_err(|_| ())?;
            self.delay.delay_us(self.half_period_us);
            self.sck.set_low().map_err(|_| ())?;
        }
        Ok(())
    }
}

impl<STB, SCK, SIO, D> Transport for SyncSerial<STB, SCK, SIO, D>
where
    STB: OutputPin,
    SCK: OutputPin,
    SIO: OutputPin,
    D: DelayNs,
{
    fn write(&mut self, data: &[u8]) -> Result<(), ()> {
        if data.is_empty() {
            return Ok(());
        }
        self.begin()?;
        let shifted = data.iter().try_for_each(|b| self.shift_out(*b));
        // Always release the strobe so the module resynchronizes on the next transfer.
        let ended = self.end();
        shifted.and(ended)
    }

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Err(())
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn name(&self) -> &'static str {
        "SyncSerial"
    }
}
