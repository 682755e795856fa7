//! SED1520 LCD driver module.
//!
//! See [SED1520Driver] trait for the transaction-level interface, and [GpioSED1520Driver] for the
//! implementation of the driver using GPIO pins.

mod gpio;

use crate::GpioResult;
use crate::lcd::sed1520::command::*;
use bitflags::bitflags;
use std::fmt::Debug;
pub use gpio::*;

/// One of the two controller chips of the panel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Controller {
    /// Drives the left half of the columns. Wired to CS1 or E1.
    Left,
    /// Drives the right half of the columns. Wired to CS2 or E2.
    Right,
}

bitflags! {
    /// A set of controllers addressed by a single transaction.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct ControllerSet: u8 {
        const LEFT = 0x01;
        const RIGHT = 0x02;
        /// Both controllers, for display-wide commands that must be mirrored on both chips.
        const ALL = Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

impl From<Controller> for ControllerSet {
    fn from(controller: Controller) -> Self {
        match controller {
            Controller::Left => ControllerSet::LEFT,
            Controller::Right => ControllerSet::RIGHT,
        }
    }
}

impl ControllerSet {
    /// Iterates over the controllers in the set, left first.
    pub fn controllers(self) -> impl Iterator<Item = Controller> {
        [Controller::Left, Controller::Right]
            .into_iter()
            .filter(move |&controller| self.contains(controller.into()))
    }
}

/// The two mutually exclusive ways the controllers can be wired to the bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SED1520Variant {
    /// Shared E line, controllers selected with CS1 and CS2.
    ChipSelect,
    /// One E line per controller, no chip-select.
    DualEnable,
}

/// Multiplex ratio of the common drivers.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DutyRatio {
    /// 1/16 duty, two pages.
    Sixteen,
    /// 1/32 duty, four pages.
    #[default] ThirtyTwo,
}

/// Decoded status byte of a single controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SED1520Status {
    pub busy: bool,
    pub adc_forward: bool,
    pub display_off: bool,
    pub resetting: bool,
}

impl From<u8> for SED1520Status {
    fn from(status: u8) -> Self {
        SED1520Status {
            busy: status & STATUS_BUSY != 0,
            adc_forward: status & STATUS_ADC != 0,
            display_off: status & STATUS_OFF != 0,
            resetting: status & STATUS_RESET != 0,
        }
    }
}

/// The `SED1520Driver` trait defines a low-level interface for a pair of SED1520 controllers
/// sharing one parallel bus.
///
/// Every command takes the set of controllers it is sent to. Display-wide settings (power, start
/// line, reset, ADC, duty) have to be sent to [ControllerSet::ALL] to keep both halves in sync;
/// addressing commands usually target a single controller.
///
/// # Busy check
///
/// The controllers report a busy flag in their status byte. When busy checking is enabled, every
/// transaction first polls the status of each controller it involves, one at a time, until the
/// flag clears. There is no timeout: a disconnected controller makes the driver spin forever.
/// Most panels work fine without it and updates are much faster, so it is off by default.
pub trait SED1520Driver: Debug {
    /// Pulses the hardware reset line and leaves it in 68-family MPU mode.
    ///
    /// Only the electrical reset. Use [SED1520Driver::reset] for the software reset command.
    fn hardware_reset(&mut self) -> GpioResult<()>;

    /// Whether [SED1520Driver::busy_wait] actually polls the controllers.
    fn is_busy_check_enabled(&self) -> bool;

    /// Software reset: start line 0, column 0, page 3. Leaves the display on/off state as is.
    ///
    /// Command: `11100010`.
    fn reset(&mut self, controllers: ControllerSet) -> GpioResult<()> {
        self.send_command(RESET, controllers)
    }

    /// Turns the display on or off. Display RAM is kept while the display is off.
    ///
    /// Command: `1010111D`.
    /// `D` is `1` for display on, `0` for display off.
    fn set_display_on(&mut self, on: bool, controllers: ControllerSet) -> GpioResult<()> {
        self.send_command(if on { DISPLAY_ON } else { DISPLAY_OFF }, controllers)
    }

    /// Sets the RAM line displayed at the top row, used for vertical scrolling.
    ///
    /// Command: `110LLLLL`, line `0..=31`.
    fn set_start_line(&mut self, line: u8, controllers: ControllerSet) -> GpioResult<()> {
        self.send_command(DISPLAY_START_LINE | line, controllers)
    }

    /// Sets the page address for subsequent data reads and writes.
    ///
    /// Command: `101110PP`, page `0..=3`.
    fn set_page_address(&mut self, page: u8, controllers: ControllerSet) -> GpioResult<()> {
        self.send_command(SET_PAGE_ADDRESS | page, controllers)
    }

    /// Sets the column address for subsequent data reads and writes.
    ///
    /// Command: `0CCCCCCC`, column `0..=79`. The column counter advances with every data access.
    fn set_column_address(&mut self, column: u8, controllers: ControllerSet) -> GpioResult<()> {
        self.send_command(SET_COLUMN_ADDRESS | column, controllers)
    }

    /// Selects the relation between RAM columns and segment outputs, flipping the display
    /// horizontally.
    ///
    /// Command: `1010000A`.
    /// `A` is `1` for reverse (counter-clockwise) output, `0` for forward output.
    fn set_adc(&mut self, reverse: bool, controllers: ControllerSet) -> GpioResult<()> {
        self.send_command(if reverse { ADC_REVERSE } else { ADC_FORWARD }, controllers)
    }

    /// Static drive lights every pixel regardless of RAM contents, in a power-saving mode.
    ///
    /// Command: `1010010S`.
    fn set_static_drive(&mut self, on: bool, controllers: ControllerSet) -> GpioResult<()> {
        self.send_command(if on { STATIC_DRIVE_ON } else { STATIC_DRIVE_OFF }, controllers)
    }

    /// Command: `1010100D`.
    /// `D` is `1` for 1/32 duty, `0` for 1/16 duty.
    fn set_duty_ratio(&mut self, duty: DutyRatio, controllers: ControllerSet) -> GpioResult<()> {
        let command = match duty {
            DutyRatio::Sixteen => DUTY_RATIO_16,
            DutyRatio::ThirtyTwo => DUTY_RATIO_32,
        };
        self.send_command(command, controllers)
    }

    /// Enters read-modify-write mode: the column counter advances on writes only, so a byte can
    /// be read and written back in place. [SED1520Driver::end_read_modify_write] restores the
    /// column address that was current when entering.
    ///
    /// Command: `11100000`.
    fn read_modify_write(&mut self, controllers: ControllerSet) -> GpioResult<()> {
        self.send_command(READ_MODIFY_WRITE, controllers)
    }

    /// Command: `11101110`.
    fn end_read_modify_write(&mut self, controllers: ControllerSet) -> GpioResult<()> {
        self.send_command(END_READ_MODIFY, controllers)
    }

    /// Reads and decodes the status of a single controller.
    fn status(&mut self, controller: Controller) -> GpioResult<SED1520Status> {
        Ok(self.read_status(controller.into())?.into())
    }

    // Low-level transactions
    // The commands above are built on these, which are implemented by the driver implementation.

    /// Writes a command byte (A0 low) to every controller in the set.
    fn send_command(&mut self, command: u8, controllers: ControllerSet) -> GpioResult<()>;

    /// Writes a display data byte (A0 high) to a single controller, at its current address.
    fn send_data(&mut self, data: u8, controller: Controller) -> GpioResult<()>;

    /// Reads the display data byte at the current address of a single controller.
    ///
    /// Always performs a dummy read first, since the controller outputs the previously latched
    /// byte on the first read after an address change or a write.
    fn read_data(&mut self, controller: Controller) -> GpioResult<u8>;

    /// Reads the raw status byte (A0 low, R/W read) once, without waiting.
    fn read_status(&mut self, controllers: ControllerSet) -> GpioResult<u8>;

    /// Polls the status until `status_bit` clears.
    ///
    /// Does nothing when busy checking is disabled or `controllers` is empty. Only a single
    /// controller should be polled at a time: with both selected on a chip-select panel, both
    /// chips drive the data bus during the same read.
    fn busy_wait(&mut self, status_bit: u8, controllers: ControllerSet) -> GpioResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_set_iterates_left_first() {
        let all: Vec<_> = ControllerSet::ALL.controllers().collect();
        assert_eq!(all, vec![Controller::Left, Controller::Right]);
        assert_eq!(ControllerSet::empty().controllers().count(), 0);
        assert_eq!(
            ControllerSet::from(Controller::Right).controllers().collect::<Vec<_>>(),
            vec![Controller::Right]
        );
    }

    #[test]
    fn controller_bits_match_ctrl_masks() {
        assert_eq!(ControllerSet::LEFT.bits(), 0x01);
        assert_eq!(ControllerSet::RIGHT.bits(), 0x02);
        assert_eq!(ControllerSet::ALL & ControllerSet::RIGHT, ControllerSet::RIGHT);
    }

    #[test]
    fn status_byte_decodes_flags() {
        let status = SED1520Status::from(STATUS_BUSY | STATUS_RESET);
        assert!(status.busy);
        assert!(status.resetting);
        assert!(!status.display_off);
        assert!(!status.adc_forward);
    }
}
