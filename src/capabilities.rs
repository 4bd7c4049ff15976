//! Static description of what one display module can do: geometry, feature flags, timing and
//! power envelope. A descriptor is built once with the `with_*` builder methods and then only
//! read; a HAL takes it by value at construction.

use bitflags::bitflags;
use heapless::Vec;

/// Maximum number of interface names and display modes a descriptor can list.
pub const MAX_LISTED: usize = 8;

/// Capability schema version written by this crate.
pub const CAPABILITY_VERSION: u8 = 1;

bitflags! {
    /// Optional device behaviors, one bit each.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CapabilityFlags: u16 {
        const CURSOR = 1 << 0;
        const CURSOR_BLINK = 1 << 1;
        const DIMMING = 1 << 2;
        const SELF_TEST = 1 << 3;
        const USER_DEFINED_CHARS = 1 << 4;
        const DISPLAY_MODES = 1 << 5;
        const HORIZONTAL_SCROLL = 1 << 6;
        const VERTICAL_SCROLL = 1 << 7;
        const FLASH_TEXT = 1 << 8;
        const BRIGHTNESS_CONTROL = 1 << 9;
        const CUSTOM_COMMANDS = 1 << 10;
        const PARALLEL_INTERFACE = 1 << 11;
        const SERIAL_INTERFACE = 1 << 12;
        const SPI_INTERFACE = 1 << 13;
        const I2C_INTERFACE = 1 << 14;
    }
}

/// Display modes a module may advertise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    Normal,
    Inverse,
    Blink,
    Dimmed,
    Bright,
}

/// Capability descriptor for one module type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    device_name: &'static str,
    description: &'static str,
    manufacturer: &'static str,
    part_number: &'static str,

    text_rows: u8,
    text_columns: u8,
    char_pixel_width: u8,
    char_pixel_height: u8,
    width_mm: u16,
    height_mm: u16,

    flags: CapabilityFlags,

    max_blink_speeds: u8,
    max_user_chars: u8,
    dimming_levels: u8,
    brightness_levels: u8,

    min_command_delay_us: u16,
    max_command_delay_us: u16,
    reset_delay_ms: u16,

    typical_power_mw: u16,
    max_power_mw: u16,

    interfaces: Vec<&'static str, MAX_LISTED>,
    display_modes: Vec<DisplayMode, MAX_LISTED>,

    version: u8,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl Capabilities {
    /// An empty descriptor. Geometry is zero until `with_text_dimensions` is called, so a HAL
    /// built from it will refuse to `init`.
    pub const fn new() -> Self {
        Capabilities {
            device_name: "",
            description: "",
            manufacturer: "",
            part_number: "",
            text_rows: 0,
            text_columns: 0,
            char_pixel_width: 0,
            char_pixel_height: 0,
            width_mm: 0,
            height_mm: 0,
            flags: CapabilityFlags::empty(),
            max_blink_speeds: 0,
            max_user_chars: 0,
            dimming_levels: 0,
            brightness_levels: 0,
            min_command_delay_us: 0,
            max_command_delay_us: 0,
            reset_delay_ms: 0,
            typical_power_mw: 0,
            max_power_mw: 0,
            interfaces: Vec::new(),
            display_modes: Vec::new(),
            version: CAPABILITY_VERSION,
        }
    }

    pub fn with_device_info(
        self,
        name: &'static str,
        description: &'static str,
        manufacturer: &'static str,
        part_number: &'static str,
    ) -> Self {
        Self {
            device_name: name,
            description,
            manufacturer,
            part_number,
            ..self
        }
    }

    pub fn with_text_dimensions(self, rows: u8, columns: u8) -> Self {
        Self {
            text_rows: rows,
            text_columns: columns,
            ..self
        }
    }

    pub fn with_character_pixels(self, width: u8, height: u8) -> Self {
        Self {
            char_pixel_width: width,
            char_pixel_height: height,
            ..self
        }
    }

    pub fn with_physical_size(self, width_mm: u16, height_mm: u16) -> Self {
        Self {
            width_mm,
            height_mm,
            ..self
        }
    }

    pub fn with_flags(self, flags: CapabilityFlags) -> Self {
        Self { flags, ..self }
    }

    /// Set or clear a single flag, leaving the rest untouched.
    pub fn with_flag(mut self, flag: CapabilityFlags, enabled: bool) -> Self {
        self.flags.set(flag, enabled);
        self
    }

    /// Extend this descriptor with feature counts: cursor blink speeds, user-defined glyph
    /// slots, dimming levels and brightness levels.
    pub fn with_feature_counts(
        self,
        blink_speeds: u8,
        user_chars: u8,
        dimming_levels: u8,
        brightness_levels: u8,
    ) -> Self {
        Self {
            max_blink_speeds: blink_speeds,
            max_user_chars: user_chars,
            dimming_levels,
            brightness_levels,
            ..self
        }
    }

    pub fn with_timing(self, min_delay_us: u16, max_delay_us: u16, reset_delay_ms: u16) -> Self {
        Self {
            min_command_delay_us: min_delay_us,
            max_command_delay_us: max_delay_us,
            reset_delay_ms,
            ..self
        }
    }

    pub fn with_power(self, typical_mw: u16, max_mw: u16) -> Self {
        Self {
            typical_power_mw: typical_mw,
            max_power_mw: max_mw,
            ..self
        }
    }

    /// Add a supported interface name. Names past the eighth are dropped.
    pub fn with_interface(mut self, name: &'static str) -> Self {
        if self.interfaces.push(name).is_err() {
            warn!("interface list full, dropping entry");
        }
        self
    }

    /// Add a supported display mode. Modes past the eighth are dropped.
    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        if self.display_modes.push(mode).is_err() {
            warn!("display mode list full, dropping entry");
        }
        self
    }

    pub fn with_version(self, version: u8) -> Self {
        Self { version, ..self }
    }

    pub fn device_name(&self) -> &'static str {
        self.device_name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn manufacturer(&self) -> &'static str {
        self.manufacturer
    }

    pub fn part_number(&self) -> &'static str {
        self.part_number
    }

    pub fn text_rows(&self) -> u8 {
        self.text_rows
    }

    pub fn text_columns(&self) -> u8 {
        self.text_columns
    }

    pub fn char_pixel_width(&self) -> u8 {
        self.char_pixel_width
    }

    pub fn char_pixel_height(&self) -> u8 {
        self.char_pixel_height
    }

    pub fn width_mm(&self) -> u16 {
        self.width_mm
    }

    pub fn height_mm(&self) -> u16 {
        self.height_mm
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.flags
    }

    /// True when every bit of `flag` is set.
    pub fn has_capability(&self, flag: CapabilityFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn max_blink_speeds(&self) -> u8 {
        self.max_blink_speeds
    }

    pub fn max_user_defined_characters(&self) -> u8 {
        self.max_user_chars
    }

    pub fn dimming_levels(&self) -> u8 {
        self.dimming_levels
    }

    pub fn brightness_levels(&self) -> u8 {
        self.brightness_levels
    }

    pub fn min_command_delay_us(&self) -> u16 {
        self.min_command_delay_us
    }

    pub fn max_command_delay_us(&self) -> u16 {
        self.max_command_delay_us
    }

    pub fn reset_delay_ms(&self) -> u16 {
        self.reset_delay_ms
    }

    pub fn typical_power_mw(&self) -> u16 {
        self.typical_power_mw
    }

    pub fn max_power_mw(&self) -> u16 {
        self.max_power_mw
    }

    pub fn supports_display_mode(&self, mode: DisplayMode) -> bool {
        self.display_modes.iter().any(|m| *m == mode)
    }

    pub fn supported_display_modes_count(&self) -> u8 {
        self.display_modes.len() as u8
    }

    /// Case-sensitive match against the listed interface names.
    pub fn supports_interface(&self, name: &str) -> bool {
        self.interfaces.iter().any(|i| *i == name)
    }

    pub fn supported_interfaces_count(&self) -> u8 {
        self.interfaces.len() as u8
    }

    pub fn supported_interface(&self, index: u8) -> Option<&'static str> {
        self.interfaces.get(index as usize).copied()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn is_compatible_with(&self, required_version: u8) -> bool {
        self.version >= required_version
    }
}

/// Descriptors for modules this crate has been used with.
pub mod presets {
    use super::{Capabilities, CapabilityFlags as F, DisplayMode};

    pub fn vfd20s401() -> Capabilities {
        Capabilities::new()
            .with_device_info(
                "VFD20S401",
                "20x4 Vacuum Fluorescent Display with 5x8 dot matrix characters",
                "Futaba",
                "VFD20S401DA1",
            )
            .with_text_dimensions(4, 20)
            .with_character_pixels(5, 8)
            .with_physical_size(116, 32)
            .with_flags(
                F::CURSOR
                    | F::CURSOR_BLINK
                    | F::DIMMING
                    | F::USER_DEFINED_CHARS
                    | F::HORIZONTAL_SCROLL
                    | F::VERTICAL_SCROLL
                    | F::BRIGHTNESS_CONTROL
                    | F::SERIAL_INTERFACE,
            )
            .with_feature_counts(4, 16, 8, 16)
            .with_timing(10, 100, 100)
            .with_power(800, 1500)
            .with_interface("Serial")
            .with_display_mode(DisplayMode::Normal)
            .with_display_mode(DisplayMode::Dimmed)
            .with_display_mode(DisplayMode::Bright)
    }

    pub fn vfd20t202() -> Capabilities {
        Capabilities::new()
            .with_device_info("VFD20T202", "20x2 Vacuum Fluorescent Display module", "Futaba", "20T202")
            .with_text_dimensions(2, 20)
            .with_character_pixels(5, 8)
            .with_physical_size(116, 16)
            .with_flags(
                F::CURSOR
                    | F::CURSOR_BLINK
                    | F::HORIZONTAL_SCROLL
                    | F::SERIAL_INTERFACE
                    | F::PARALLEL_INTERFACE
                    | F::USER_DEFINED_CHARS
                    | F::DIMMING,
            )
            .with_feature_counts(1, 8, 4, 0)
            .with_timing(10, 100, 100)
            .with_power(400, 800)
            .with_interface("Serial")
            .with_interface("Parallel")
            .with_display_mode(DisplayMode::Normal)
    }

    pub fn cu20025() -> Capabilities {
        Capabilities::new()
            .with_device_info(
                "CU20025ECPB-W1J",
                "Noritake 20x2 VFD module (5x7 dots)",
                "Noritake Itron",
                "CU20025ECPB-W1J",
            )
            .with_text_dimensions(2, 20)
            .with_character_pixels(5, 7)
            .with_physical_size(116, 16)
            .with_flags(
                F::CURSOR
                    | F::CURSOR_BLINK
                    | F::PARALLEL_INTERFACE
                    | F::USER_DEFINED_CHARS
                    | F::DIMMING,
            )
            .with_feature_counts(1, 8, 4, 0)
            .with_timing(10, 100, 100)
            .with_power(400, 800)
            .with_interface("Parallel")
            .with_display_mode(DisplayMode::Normal)
    }

    pub fn cu40026() -> Capabilities {
        Capabilities::new()
            .with_device_info(
                "CU40026",
                "Noritake 40x2 VFD module (5x7 dots)",
                "Noritake Itron",
                "CU40026-TW200A",
            )
            .with_text_dimensions(2, 40)
            .with_character_pixels(5, 7)
            .with_physical_size(188, 16)
            .with_flags(
                F::CURSOR
                    | F::CURSOR_BLINK
                    | F::SERIAL_INTERFACE
                    | F::PARALLEL_INTERFACE
                    | F::USER_DEFINED_CHARS
                    | F::DIMMING
                    | F::HORIZONTAL_SCROLL
                    | F::VERTICAL_SCROLL,
            )
            .with_feature_counts(255, 16, 4, 0)
            .with_timing(10, 100, 100)
            .with_power(700, 1200)
            .with_interface("Serial")
            .with_interface("Parallel")
            .with_display_mode(DisplayMode::Normal)
    }

    pub fn ht16514() -> Capabilities {
        Capabilities::new()
            .with_device_info(
                "HT16514",
                "Holtek HT16514 VFD Controller/Driver (supports 16/20/24 x 2)",
                "Holtek",
                "HT16514",
            )
            .with_text_dimensions(2, 20)
            .with_character_pixels(5, 8)
            .with_physical_size(116, 16)
            .with_flags(
                F::CURSOR
                    | F::CURSOR_BLINK
                    | F::SERIAL_INTERFACE
                    | F::PARALLEL_INTERFACE
                    | F::USER_DEFINED_CHARS
                    | F::DIMMING,
            )
            .with_feature_counts(1, 8, 4, 0)
            .with_timing(10, 100, 100)
            .with_power(500, 800)
            .with_interface("Serial")
            .with_interface("Parallel")
            .with_display_mode(DisplayMode::Normal)
    }

    pub fn m202md15() -> Capabilities {
        Capabilities::new()
            .with_device_info("M202MD15", "Futaba M202MD15 20x2 VFD module", "Futaba", "M202MD15AJ")
            .with_text_dimensions(2, 20)
            .with_character_pixels(5, 8)
            .with_physical_size(116, 16)
            .with_flags(
                F::CURSOR
                    | F::CURSOR_BLINK
                    | F::SERIAL_INTERFACE
                    | F::PARALLEL_INTERFACE
                    | F::USER_DEFINED_CHARS
                    | F::DIMMING,
            )
            .with_feature_counts(1, 8, 4, 0)
            .with_timing(10, 100, 100)
            .with_power(500, 800)
            .with_interface("Serial")
            .with_interface("Parallel")
            .with_display_mode(DisplayMode::Normal)
    }

    pub fn vk202_25() -> Capabilities {
        Capabilities::new()
            .with_device_info(
                "VK202-25",
                "Matrix Orbital VK202-25 20x2 VFD with command-prefix protocol",
                "Matrix Orbital",
                "VK202-25",
            )
            .with_text_dimensions(2, 20)
            .with_character_pixels(5, 7)
            .with_physical_size(116, 37)
            .with_flags(
                F::CURSOR
                    | F::BRIGHTNESS_CONTROL
                    | F::CUSTOM_COMMANDS
                    | F::SERIAL_INTERFACE
                    | F::I2C_INTERFACE,
            )
            .with_feature_counts(0, 0, 0, 255)
            .with_timing(10, 1000, 100)
            .with_power(500, 900)
            .with_interface("Serial")
            .with_interface("I2C")
            .with_display_mode(DisplayMode::Normal)
    }

    pub fn generic_20x2() -> Capabilities {
        Capabilities::new()
            .with_device_info(
                "Generic 20x2 VFD",
                "Generic 20x2 Vacuum Fluorescent Display",
                "Generic",
                "VFD-20x2-GENERIC",
            )
            .with_text_dimensions(2, 20)
            .with_character_pixels(5, 8)
            .with_physical_size(116, 16)
            .with_flags(
                F::CURSOR
                    | F::CURSOR_BLINK
                    | F::DIMMING
                    | F::USER_DEFINED_CHARS
                    | F::HORIZONTAL_SCROLL
                    | F::VERTICAL_SCROLL
                    | F::BRIGHTNESS_CONTROL,
            )
            .with_feature_counts(3, 8, 8, 16)
            .with_timing(10, 100, 100)
            .with_power(400, 800)
            .with_interface("Serial")
            .with_interface("Parallel")
            .with_display_mode(DisplayMode::Normal)
    }

    pub fn generic_16x2() -> Capabilities {
        generic_20x2()
            .with_device_info(
                "Generic 16x2 VFD",
                "Generic 16x2 Vacuum Fluorescent Display",
                "Generic",
                "VFD-16x2-GENERIC",
            )
            .with_text_dimensions(2, 16)
            .with_physical_size(85, 16)
    }

    pub fn generic_20x4() -> Capabilities {
        generic_20x2()
            .with_device_info(
                "Generic 20x4 VFD",
                "Generic 20x4 Vacuum Fluorescent Display",
                "Generic",
                "VFD-20x4-GENERIC",
            )
            .with_text_dimensions(4, 20)
            .with_physical_size(116, 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_queries() {
        let caps = presets::vfd20s401();
        assert!(caps.has_capability(CapabilityFlags::DIMMING));
        assert!(caps.has_capability(CapabilityFlags::CURSOR | CapabilityFlags::CURSOR_BLINK));
        assert!(!caps.has_capability(CapabilityFlags::I2C_INTERFACE));
        assert!(!caps.has_capability(CapabilityFlags::DIMMING | CapabilityFlags::I2C_INTERFACE));
    }

    #[test]
    fn builder_sets_single_flag() {
        let caps = Capabilities::new()
            .with_flag(CapabilityFlags::FLASH_TEXT, true)
            .with_flag(CapabilityFlags::CURSOR, true)
            .with_flag(CapabilityFlags::CURSOR, false);
        assert_eq!(caps.flags(), CapabilityFlags::FLASH_TEXT);
    }

    #[test]
    fn bounded_lists() {
        let mut caps = Capabilities::new();
        for _ in 0..10 {
            caps = caps.with_interface("Serial").with_display_mode(DisplayMode::Blink);
        }
        assert_eq!(caps.supported_interfaces_count(), MAX_LISTED as u8);
        assert_eq!(caps.supported_display_modes_count(), MAX_LISTED as u8);
        assert_eq!(caps.supported_interface(7), Some("Serial"));
        assert_eq!(caps.supported_interface(8), None);
    }

    #[test]
    fn absent_entries_are_false() {
        let caps = presets::vfd20t202();
        assert!(caps.supports_interface("Parallel"));
        assert!(!caps.supports_interface("SPI"));
        assert!(!caps.supports_interface("serial"));
        assert!(caps.supports_display_mode(DisplayMode::Normal));
        assert!(!caps.supports_display_mode(DisplayMode::Inverse));
        assert_eq!(Capabilities::new().supported_interface(0), None);
    }

    #[test]
    fn version_compatibility() {
        let caps = Capabilities::new().with_version(3);
        assert!(caps.is_compatible_with(1));
        assert!(caps.is_compatible_with(3));
        assert!(!caps.is_compatible_with(4));
    }

    #[test]
    fn derived_presets_keep_flags() {
        let caps = presets::generic_20x4();
        assert_eq!(caps.text_rows(), 4);
        assert_eq!(caps.text_columns(), 20);
        assert_eq!(caps.flags(), presets::generic_20x2().flags());
        assert_eq!(caps.device_name(), "Generic 20x4 VFD");
    }
}
