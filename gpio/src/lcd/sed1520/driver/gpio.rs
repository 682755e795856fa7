use crate::delay::{Delay, SpinDelay};
use crate::lcd::sed1520::command::STATUS_BUSY;
use crate::lcd::sed1520::driver::{Controller, ControllerSet, SED1520Driver, SED1520Variant};
use crate::{GpioBus, GpioBusInput, GpioError, GpioOutput, GpioResult};
use log::{debug, trace};
use std::time::Duration;

/// Bus timing of the driver.
///
/// The SED1520 needs an enable pulse of at least 80 ns. The pulse is held for two delay units,
/// and chip-selects are given one unit to settle before the enable rises.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SED1520Timing {
    /// One delay unit, in nanoseconds.
    pub unit_ns: u32,
    /// How long the reset line is held at each level of the reset pulse.
    pub reset_hold: Duration,
}

impl SED1520Timing {
    pub fn pulse_ns(&self) -> u32 {
        self.unit_ns.saturating_mul(2)
    }
}

impl Default for SED1520Timing {
    fn default() -> Self {
        SED1520Timing {
            unit_ns: 50,
            reset_hold: Duration::from_millis(2),
        }
    }
}

/// The lines used to strobe the controllers, which determine the panel [SED1520Variant].
#[derive(Debug)]
pub enum GpioSED1520Strobe<'a> {
    /// Shared enable, controllers picked by chip-select. The chip-select pins **must be set to
    /// active low**, so that writing `true` selects the controller.
    ChipSelect {
        pin_cs1: &'a dyn GpioOutput,
        pin_cs2: &'a dyn GpioOutput,
        pin_e: &'a dyn GpioOutput,
    },
    /// One enable per controller.
    DualEnable {
        pin_e1: &'a dyn GpioOutput,
        pin_e2: &'a dyn GpioOutput,
    },
}

impl<'a> GpioSED1520Strobe<'a> {
    pub fn variant(&self) -> SED1520Variant {
        match self {
            GpioSED1520Strobe::ChipSelect { .. } => SED1520Variant::ChipSelect,
            GpioSED1520Strobe::DualEnable { .. } => SED1520Variant::DualEnable,
        }
    }

    /// Drives every enable low and deselects both controllers.
    fn idle(&self) -> GpioResult<()> {
        match self {
            GpioSED1520Strobe::ChipSelect { pin_cs1, pin_cs2, pin_e } => {
                pin_e.write(false)?;
                pin_cs1.write(false)?;
                pin_cs2.write(false)?;
            }
            GpioSED1520Strobe::DualEnable { pin_e1, pin_e2 } => {
                pin_e1.write(false)?;
                pin_e2.write(false)?;
            }
        }
        Ok(())
    }

    /// Selects the controllers of the transaction. No-op without chip-select lines.
    fn select(&self, targets: ControllerSet, timing: &SED1520Timing, delay: &dyn Delay) -> GpioResult<()> {
        if let GpioSED1520Strobe::ChipSelect { pin_cs1, pin_cs2, .. } = self {
            if targets.contains(ControllerSet::LEFT) {
                pin_cs1.write(true)?;
            }
            if targets.contains(ControllerSet::RIGHT) {
                pin_cs2.write(true)?;
            }
            delay.delay_ns(timing.unit_ns);
        }
        Ok(())
    }

    fn deselect(&self) -> GpioResult<()> {
        if let GpioSED1520Strobe::ChipSelect { pin_cs1, pin_cs2, .. } = self {
            pin_cs1.write(false)?;
            pin_cs2.write(false)?;
        }
        Ok(())
    }

    /// Enables to pulse, in order, so that a write reaches every controller in `targets`.
    ///
    /// The shared enable is pulsed once for any selection; separate enables once per controller.
    fn write_enables(&self, targets: ControllerSet) -> [Option<&'a dyn GpioOutput>; 2] {
        match *self {
            GpioSED1520Strobe::ChipSelect { pin_e, .. } => {
                [(!targets.is_empty()).then_some(pin_e), None]
            }
            GpioSED1520Strobe::DualEnable { pin_e1, pin_e2 } => [
                targets.contains(ControllerSet::LEFT).then_some(pin_e1),
                targets.contains(ControllerSet::RIGHT).then_some(pin_e2),
            ],
        }
    }

    /// Enable to pulse for a read. With separate enables only one controller can be read, the
    /// left one taking precedence.
    fn read_enable(&self, targets: ControllerSet) -> Option<&'a dyn GpioOutput> {
        if targets.is_empty() {
            return None;
        }
        match *self {
            GpioSED1520Strobe::ChipSelect { pin_e, .. } => Some(pin_e),
            GpioSED1520Strobe::DualEnable { pin_e1, pin_e2 } => {
                if targets.contains(ControllerSet::LEFT) {
                    Some(pin_e1)
                } else {
                    Some(pin_e2)
                }
            }
        }
    }
}

/// GpioSED1520 driver for a pair of SED1520 controllers using GPIO pins.
///
/// Works with both panel wirings, see [GpioSED1520Strobe]. The data bus should have its pull-ups
/// enabled, as it is left undriven between read cycles.
#[derive(Debug)]
pub struct GpioSED1520Driver<'a> {
    pin_reset: Option<&'a dyn GpioOutput>,
    pin_a0: &'a dyn GpioOutput,
    pin_rw: &'a dyn GpioOutput,
    strobe: GpioSED1520Strobe<'a>,
    data_bus: &'a mut dyn GpioBus<8>,
    delay: &'a dyn Delay,
    timing: SED1520Timing,
    busy_check: bool,
}

impl<'a> GpioSED1520Driver<'a> {
    /// Creates a new GpioSED1520Driver instance.
    ///
    /// # Parameters
    ///
    /// - `pin_reset`: Optional reset pin (RES). If not provided, the RES pin of the display must be
    ///   tied high, selecting the 68-family MPU interface.
    /// - `pin_a0`: A0 output pin, selecting between commands (low) and display data (high).
    /// - `pin_rw`: Read/write output pin, high for reads.
    /// - `strobe`: The enable and chip-select lines, defining the panel variant.
    /// - `data_bus`: The 8-bit data bus, D0 first.
    ///
    /// Busy checking is disabled and [SpinDelay] is used until configured otherwise.
    pub fn new(
        pin_reset: Option<&'a dyn GpioOutput>,
        pin_a0: &'a dyn GpioOutput,
        pin_rw: &'a dyn GpioOutput,
        strobe: GpioSED1520Strobe<'a>,
        data_bus: &'a mut dyn GpioBus<8>,
    ) -> Self {
        GpioSED1520Driver {
            pin_reset,
            pin_a0,
            pin_rw,
            strobe,
            data_bus,
            delay: &SpinDelay,
            timing: SED1520Timing::default(),
            busy_check: false,
        }
    }

    /// Creates a driver for a panel with chip-select lines and a shared enable.
    pub fn new_chip_select(
        pin_reset: Option<&'a dyn GpioOutput>,
        pin_a0: &'a dyn GpioOutput,
        pin_rw: &'a dyn GpioOutput,
        pin_cs1: &'a dyn GpioOutput,
        pin_cs2: &'a dyn GpioOutput,
        pin_e: &'a dyn GpioOutput,
        data_bus: &'a mut dyn GpioBus<8>,
    ) -> Self {
        Self::new(
            pin_reset,
            pin_a0,
            pin_rw,
            GpioSED1520Strobe::ChipSelect { pin_cs1, pin_cs2, pin_e },
            data_bus,
        )
    }

    /// Creates a driver for a panel with one enable line per controller.
    pub fn new_dual_enable(
        pin_reset: Option<&'a dyn GpioOutput>,
        pin_a0: &'a dyn GpioOutput,
        pin_rw: &'a dyn GpioOutput,
        pin_e1: &'a dyn GpioOutput,
        pin_e2: &'a dyn GpioOutput,
        data_bus: &'a mut dyn GpioBus<8>,
    ) -> Self {
        Self::new(
            pin_reset,
            pin_a0,
            pin_rw,
            GpioSED1520Strobe::DualEnable { pin_e1, pin_e2 },
            data_bus,
        )
    }

    pub fn with_busy_check(mut self, enabled: bool) -> Self {
        self.busy_check = enabled;
        self
    }

    pub fn with_timing(mut self, timing: SED1520Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_delay(mut self, delay: &'a dyn Delay) -> Self {
        self.delay = delay;
        self
    }

    pub fn variant(&self) -> SED1520Variant {
        self.strobe.variant()
    }

    pub fn timing(&self) -> SED1520Timing {
        self.timing
    }

    fn pulse(pin: &dyn GpioOutput, timing: &SED1520Timing, delay: &dyn Delay) -> GpioResult<()> {
        pin.write(true)?;
        delay.delay_ns(timing.pulse_ns());
        pin.write(false)?;
        Ok(())
    }

    /// Pulses the enable and samples the data bus *during* the pulse.
    fn pulse_sample(
        pin: &dyn GpioOutput,
        input: &dyn GpioBusInput<8>,
        timing: &SED1520Timing,
        delay: &dyn Delay,
    ) -> GpioResult<u8> {
        pin.write(true)?;
        delay.delay_ns(timing.pulse_ns());
        let data = input.read_byte()?;
        pin.write(false)?;
        Ok(data)
    }

    fn write(&mut self, data: u8, a0: bool, targets: ControllerSet) -> GpioResult<()> {
        trace!("Writing: {:08b}, A0: {}, to: {:?}", data, a0, targets);

        self.pin_a0.write(a0)?;
        self.pin_rw.write(false)?;

        let bus = self.data_bus.as_output()?;
        bus.write_byte(data)?;

        self.strobe.select(targets, &self.timing, self.delay)?;
        for pin_e in self.strobe.write_enables(targets).into_iter().flatten() {
            Self::pulse(pin_e, &self.timing, self.delay)?;
        }
        self.strobe.deselect()?;

        Ok(())
    }

    /// Reads the status of `targets` until `until_clear` is cleared, or once if `None`.
    fn poll_status(&mut self, targets: ControllerSet, until_clear: Option<u8>) -> GpioResult<u8> {
        let pin_e = self.strobe.read_enable(targets).ok_or(GpioError::InvalidArgument)?;

        self.pin_a0.write(false)?;
        self.pin_rw.write(true)?;

        let mut polls = 0u32;
        let status = {
            let input = self.data_bus.as_input()?;
            loop {
                self.strobe.select(targets, &self.timing, self.delay)?;
                let status = Self::pulse_sample(pin_e, &*input, &self.timing, self.delay)?;
                self.strobe.deselect()?;
                polls = polls.wrapping_add(1);

                if until_clear.is_none_or(|bit| status & bit == 0) {
                    break status;
                }
            }
        };

        self.data_bus.as_output()?;
        self.pin_rw.write(false)?;

        trace!("Status of {:?}: {:08b} after {} poll(s)", targets, status, polls);

        Ok(status)
    }
}

impl SED1520Driver for GpioSED1520Driver<'_> {
    /// Puts the bus lines in their idle state, then pulses the reset line high, low and back high,
    /// holding each level for [SED1520Timing::reset_hold]. High selects the 68-family MPU
    /// interface the driver speaks.
    fn hardware_reset(&mut self) -> GpioResult<()> {
        debug!("Resetting SED1520 ({:?} wiring)", self.variant());

        self.strobe.idle()?;
        self.pin_a0.write(false)?;
        self.pin_rw.write(false)?;

        if let Some(pin_reset) = self.pin_reset {
            pin_reset.write(true)?;
            self.delay.delay(self.timing.reset_hold);
            pin_reset.write(false)?;
            self.delay.delay(self.timing.reset_hold);
            pin_reset.write(true)?;
        }

        Ok(())
    }

    fn is_busy_check_enabled(&self) -> bool {
        self.busy_check
    }

    /// Waits for each targeted controller separately, then writes the command with A0 low.
    fn send_command(&mut self, command: u8, controllers: ControllerSet) -> GpioResult<()> {
        self.busy_wait(STATUS_BUSY, controllers & ControllerSet::LEFT)?;
        self.busy_wait(STATUS_BUSY, controllers & ControllerSet::RIGHT)?;
        self.write(command, false, controllers)
    }

    fn send_data(&mut self, data: u8, controller: Controller) -> GpioResult<()> {
        self.busy_wait(STATUS_BUSY, ControllerSet::LEFT)?;
        self.busy_wait(STATUS_BUSY, ControllerSet::RIGHT)?;
        self.write(data, true, controller.into())
    }

    /// Sets A0 high and R/W to read, then pulses the enable twice: once for the dummy read, and
    /// once sampling the data bus during the pulse.
    fn read_data(&mut self, controller: Controller) -> GpioResult<u8> {
        self.busy_wait(STATUS_BUSY, ControllerSet::LEFT)?;
        self.busy_wait(STATUS_BUSY, ControllerSet::RIGHT)?;

        let targets = ControllerSet::from(controller);
        let pin_e = self.strobe.read_enable(targets).ok_or(GpioError::InvalidArgument)?;

        self.pin_a0.write(true)?;
        self.pin_rw.write(true)?;

        let data = {
            let input = self.data_bus.as_input()?;
            self.strobe.select(targets, &self.timing, self.delay)?;

            // Dummy read
            Self::pulse(pin_e, &self.timing, self.delay)?;
            self.delay.delay_ns(self.timing.pulse_ns());

            let data = Self::pulse_sample(pin_e, &*input, &self.timing, self.delay)?;
            self.strobe.deselect()?;
            data
        };

        self.data_bus.as_output()?;
        self.pin_rw.write(false)?;

        trace!("Read data: {:08b}, from: {:?}", data, controller);

        Ok(data)
    }

    /// # Errors
    /// - `GpioError::InvalidArgument` if `controllers` is empty.
    fn read_status(&mut self, controllers: ControllerSet) -> GpioResult<u8> {
        self.poll_status(controllers, None)
    }

    fn busy_wait(&mut self, status_bit: u8, controllers: ControllerSet) -> GpioResult<()> {
        if !self.busy_check || controllers.is_empty() {
            return Ok(());
        }
        self.poll_status(controllers, Some(status_bit))?;
        Ok(())
    }
}
