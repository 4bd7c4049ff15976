//! Observers of transport traffic. A logger sees every byte and control-line change that passes
//! through a [`Logged`] transport but can never alter it.

use super::{ControlLine, Transport};

pub trait TransportLogger {
    fn on_write(&mut self, data: &[u8]);
    fn on_read(&mut self, data: &[u8]);
    fn on_control_line_change(&mut self, line: ControlLine, high: bool);
}

/// A transport with a logger attached. Events are reported only for operations the inner
/// transport completed.
pub struct Logged<T, L> {
    inner: T,
    logger: L,
}

impl<T, L> Logged<T, L>
where
    T: Transport,
    L: TransportLogger,
{
    pub fn new(inner: T, logger: L) -> Self {
        Logged { inner, logger }
    }

    /// Detach the logger, giving back both halves.
    pub fn release(self) -> (T, L) {
        (self.inner, self.logger)
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }
}

impl<T, L> Transport for Logged<T, L>
where
    T: Transport,
    L: TransportLogger,
{
    fn write(&mut self, data: &[u8]) -> Result<(), ()> {
        self.inner.write(data)?;
        self.logger.on_write(data);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let n = self.inner.read(buf)?;
        self.logger.on_read(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), ()> {
        self.inner.flush()
    }

    fn supports_control_lines(&self) -> bool {
        self.inner.supports_control_lines()
    }

    fn set_control_line(&mut self, line: ControlLine, high: bool) -> Result<(), ()> {
        self.inner.set_control_line(line, high)?;
        self.logger.on_control_line_change(line, high);
        Ok(())
    }

    /// Logged as the rising edge followed by the falling edge.
    fn pulse_control_line(&mut self, line: ControlLine, duration_us: u32) -> Result<(), ()> {
        self.inner.pulse_control_line(line, duration_us)?;
        self.logger.on_control_line_change(line, true);
        self.logger.on_control_line_change(line, false);
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.inner.delay_us(us)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Prints all traffic at trace level.
#[cfg(feature = "defmt")]
pub struct DefmtLogger;

#[cfg(feature = "defmt")]
impl TransportLogger for DefmtLogger {
    fn on_write(&mut self, data: &[u8]) {
        defmt::trace!("[WRITE] {=[u8]:x}", data);
    }

    fn on_read(&mut self, data: &[u8]) {
        defmt::trace!("[READ] {=[u8]:x}", data);
    }

    fn on_control_line_change(&mut self, line: ControlLine, high: bool) {
        defmt::trace!("[LINE] {}={}", line.name(), if high { "HIGH" } else { "LOW" });
    }
}
