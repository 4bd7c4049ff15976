//! The byte-level boundary between a HAL and the wire.

pub mod logger;
pub mod sync_serial;

pub use self::logger::{Logged, TransportLogger};

/// Named out-of-band signals a parallel-style bus may expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlLine {
    /// Register select: low for commands, high for data.
    RegisterSelect,
    ReadWrite,
    Enable,
    Strobe,
    Reset,
}

impl ControlLine {
    pub fn name(self) -> &'static str {
        match self {
            ControlLine::RegisterSelect => "RS",
            ControlLine::ReadWrite => "RW",
            ControlLine::Enable => "E",
            ControlLine::Strobe => "STB",
            ControlLine::Reset => "RST",
        }
    }
}

/// A byte sink/source a HAL drives. Errors carry no detail; the HAL reports them as
/// `TransportFail`.
pub trait Transport {
    /// Send `data` as one transfer. Blocks until the bytes are on the wire.
    fn write(&mut self, data: &[u8]) -> Result<(), ()>;

    fn write_byte(&mut self, byte: u8) -> Result<(), ()> {
        self.write(&[byte])
    }

    /// Read up to `buf.len()` bytes, returning how many arrived.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()>;

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }

    /// Whether `set_control_line` drives real signals. When false, HALs fall back to in-band
    /// framing.
    fn supports_control_lines(&self) -> bool {
        false
    }

    fn set_control_line(&mut self, _line: ControlLine, _high: bool) -> Result<(), ()> {
        Err(())
    }

    fn pulse_control_line(&mut self, _line: ControlLine, _duration_us: u32) -> Result<(), ()> {
        Err(())
    }

    fn delay_us(&mut self, us: u32);

    fn name(&self) -> &'static str;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<(), ()> {
        (**self).write(data)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), ()> {
        (**self).write_byte(byte)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        (**self).read(buf)
    }

    fn flush(&mut self) -> Result<(), ()> {
        (**self).flush()
    }

    fn supports_control_lines(&self) -> bool {
        (**self).supports_control_lines()
    }

    fn set_control_line(&mut self, line: ControlLine, high: bool) -> Result<(), ()> {
        (**self).set_control_line(line, high)
    }

    fn pulse_control_line(&mut self, line: ControlLine, duration_us: u32) -> Result<(), ()> {
        (**self).pulse_control_line(line, duration_us)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[cfg(test)]
pub mod test_spy {
    //! A transport for use in unit tests to spy on whatever was sent to it.

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    use super::{ControlLine, Transport};

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Sent {
        Data(Vec<u8>),
        Line(ControlLine, bool),
        Pulse(ControlLine, u32),
        Delay(u32),
    }

    #[derive(Default)]
    struct Record {
        sent: Vec<Sent>,
        control_lines: bool,
        writes_left: Option<usize>,
    }

    /// Owned side, handed to the code under test.
    pub struct SpyTransport {
        record: Rc<RefCell<Record>>,
    }

    /// Shared side, kept by the test to inspect and steer the spy.
    #[derive(Clone)]
    pub struct SpyHandle {
        record: Rc<RefCell<Record>>,
    }

    impl SpyTransport {
        pub fn new() -> Self {
            SpyTransport {
                record: Rc::new(RefCell::new(Record::default())),
            }
        }

        /// A spy that claims to drive real control lines.
        pub fn with_control_lines() -> Self {
            let spy = Self::new();
            spy.record.borrow_mut().control_lines = true;
            spy
        }

        pub fn split(self) -> (Self, SpyHandle) {
            let handle = SpyHandle {
                record: self.record.clone(),
            };
            (self, handle)
        }
    }

    impl SpyHandle {
        /// Every data byte written so far, concatenated.
        pub fn bytes(&self) -> Vec<u8> {
            self.record
                .borrow()
                .sent
                .iter()
                .filter_map(|s| match s {
                    Sent::Data(d) => Some(d.clone()),
                    _ => None,
                })
                .flatten()
                .collect()
        }

        /// Each write call's payload, in order.
        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.record
                .borrow()
                .sent
                .iter()
                .filter_map(|s| match s {
                    Sent::Data(d) => Some(d.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Everything except delays.
        pub fn sent(&self) -> Vec<Sent> {
            self.record
                .borrow()
                .sent
                .iter()
                .filter(|s| !matches!(s, Sent::Delay(_)))
                .cloned()
                .collect()
        }

        pub fn check(&self, bytes: &[u8]) {
            assert_eq!(&self.bytes()[..], bytes);
        }

        pub fn clear(&self) {
            self.record.borrow_mut().sent.clear()
        }

        /// Let `n` more writes succeed, then fail every write after.
        pub fn fail_writes_after(&self, n: usize) {
            self.record.borrow_mut().writes_left = Some(n);
        }
    }

    impl Transport for SpyTransport {
        fn write(&mut self, data: &[u8]) -> Result<(), ()> {
            let mut record = self.record.borrow_mut();
            if let Some(n) = record.writes_left.as_mut() {
                if *n == 0 {
                    return Err(());
                }
                *n -= 1;
            }
            record.sent.push(Sent::Data(data.to_vec()));
            Ok(())
        }

        fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
            Ok(0)
        }

        fn supports_control_lines(&self) -> bool {
            self.record.borrow().control_lines
        }

        fn set_control_line(&mut self, line: ControlLine, high: bool) -> Result<(), ()> {
            let mut record = self.record.borrow_mut();
            if !record.control_lines {
                return Err(());
            }
            record.sent.push(Sent::Line(line, high));
            Ok(())
        }

        fn pulse_control_line(&mut self, line: ControlLine, duration_us: u32) -> Result<(), ()> {
            let mut record = self.record.borrow_mut();
            if !record.control_lines {
                return Err(());
            }
            record.sent.push(Sent::Pulse(line, duration_us));
            Ok(())
        }

        fn delay_us(&mut self, us: u32) {
            self.record.borrow_mut().sent.push(Sent::Delay(us));
        }

        fn name(&self) -> &'static str {
            "spy"
        }
    }

    /// Build the expected byte stream of several writes.
    macro_rules! sends {
        ($($chunk:expr),* $(,)?) => {{
            let mut v = ::std::vec::Vec::<u8>::new();
            $( v.extend_from_slice(&$chunk[..]); )*
            v
        }};
    }
    pub(crate) use sends;
}
