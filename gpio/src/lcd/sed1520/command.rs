//! SED1520 command set and status flags.
//!
//! Commands with a parameter are built by OR-ing the parameter into the opcode, e.g.
//! `SET_PAGE_ADDRESS | page`. Parameters are not masked.

pub const DISPLAY_ON: u8 = 0xAF;
pub const DISPLAY_OFF: u8 = 0xAE;
pub const DISPLAY_START_LINE: u8 = 0xC0;
pub const SET_PAGE_ADDRESS: u8 = 0xB8;
pub const SET_COLUMN_ADDRESS: u8 = 0x00;
pub const ADC_FORWARD: u8 = 0xA0;
pub const ADC_REVERSE: u8 = 0xA1;
pub const STATIC_DRIVE_ON: u8 = 0xA5;
pub const STATIC_DRIVE_OFF: u8 = 0xA4;
pub const DUTY_RATIO_16: u8 = 0xA8;
pub const DUTY_RATIO_32: u8 = 0xA9;
pub const READ_MODIFY_WRITE: u8 = 0xE0;
pub const END_READ_MODIFY: u8 = 0xEE;
pub const RESET: u8 = 0xE2;

/// Set while the controller is processing the previous instruction.
pub const STATUS_BUSY: u8 = 0x80;
/// Set for forward (clockwise) segment output.
pub const STATUS_ADC: u8 = 0x40;
/// Set while the display is turned off.
pub const STATUS_OFF: u8 = 0x20;
/// Set while the controller is being reset.
pub const STATUS_RESET: u8 = 0x10;

/// Columns addressable on a single controller.
pub const COLUMNS_PER_CONTROLLER: u8 = 80;
/// Pages (8 pixel rows each) addressable on a single controller.
pub const PAGES_PER_CONTROLLER: u8 = 4;
