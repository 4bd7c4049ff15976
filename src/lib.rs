//! Driver library for alphanumeric vacuum fluorescent display (VFD) modules.
//!
//! A [`Capabilities`] descriptor says what a module can do, a [`hal::Driver`] pairs one
//! [`interface::Transport`] with one controller family's command encoder, and the
//! [`buffered::BufferedVfd`] renderer sits on top of any [`VfdHal`] to diff-flush a character
//! grid and run non-blocking animations.

#![cfg_attr(not(feature = "std"), no_std)]

// This has to come first so the logging macros are visible to every module below.
#[macro_use]
mod fmt;

pub mod buffered;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod glyph;
pub mod hal;
pub mod interface;
pub mod scroll;

// Re-exports for primary API.
pub use buffered::BufferedVfd;
pub use capabilities::{Capabilities, CapabilityFlags, DisplayMode};
pub use config::Config;
pub use error::{Error, ErrorCode};
pub use glyph::{GlyphPacking, GlyphPattern};
pub use hal::{Driver, State, VfdHal};
pub use interface::sync_serial::SyncSerial;
pub use interface::{ControlLine, Transport};
pub use scroll::ScrollDirection;
