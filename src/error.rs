//! Error taxonomy shared by every HAL command.

/// Why a HAL command failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The capability is absent, or the controller family does not implement the feature.
    NotSupported,
    /// Row, column, index or payload out of range. Always raised before any byte is sent.
    InvalidArgs,
    /// The transport is missing or reported a failed write/read.
    TransportFail,
    /// Reserved. No encoder produces it yet.
    Timeout,
    /// Anything else, including commands issued before `init`.
    Unknown,
}

/// The last-error slot kept on every HAL instance. Unlike [`Error`] it has an `Ok` value, since
/// a successful command overwrites whatever failure was recorded before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    #[default]
    Ok,
    NotSupported,
    InvalidArgs,
    TransportFail,
    Timeout,
    Unknown,
}

impl ErrorCode {
    pub fn is_ok(self) -> bool {
        self == ErrorCode::Ok
    }
}

impl From<Error> for ErrorCode {
    fn from(err: Error) -> Self {
        match err {
            Error::NotSupported => ErrorCode::NotSupported,
            Error::InvalidArgs => ErrorCode::InvalidArgs,
            Error::TransportFail => ErrorCode::TransportFail,
            Error::Timeout => ErrorCode::Timeout,
            Error::Unknown => ErrorCode::Unknown,
        }
    }
}

impl<T> From<&Result<T, Error>> for ErrorCode {
    fn from(result: &Result<T, Error>) -> Self {
        match result {
            Ok(_) => ErrorCode::Ok,
            Err(e) => (*e).into(),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Error::NotSupported => "feature not supported by this device",
            Error::InvalidArgs => "argument out of range",
            Error::TransportFail => "transport write or read failed",
            Error::Timeout => "device timed out",
            Error::Unknown => "unknown error",
        };
        f.write_str(msg)
    }
}
