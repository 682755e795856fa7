//! Simulated SED1520 panel.
//!
//! [SimPanel] emulates the two controllers behind a set of fake GPIO lines. Every line write is
//! recorded, and enable edges are decoded into controller behavior: command execution, display
//! RAM writes, the read latch (which makes the first read after an address change return stale
//! data), the column counter and the status flags. It is meant for tests and for running the
//! driver without hardware attached.
//!
//! Line levels are logical: a chip-select line written `true` means the controller is selected,
//! as the driver sees it through an active-low configured pin.
use crate::delay::NoDelay;
use crate::lcd::sed1520::command::*;
use crate::lcd::sed1520::driver::{Controller, ControllerSet, DutyRatio, GpioSED1520Driver};
use crate::lcd::sed1520::geometry::DisplayGeometry;
use crate::{bits_to_byte, byte_to_bits, GpioBus, GpioBusInput, GpioBusOutput, GpioOutput, GpioResult};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Control lines of the simulated panel. A panel is wired either with `Cs1`, `Cs2` and `E`, or
/// with `E1` and `E2`; the simulation listens to both sets.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SimLine {
    A0 = 0,
    Rw = 1,
    Reset = 2,
    E = 3,
    Cs1 = 4,
    Cs2 = 5,
    E1 = 6,
    E2 = 7,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimDirection {
    Input,
    Output,
}

/// Everything observed on the simulated bus, in order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimEvent {
    /// A control line was written, whether or not its level changed.
    Line(SimLine, bool),
    /// The data bus was switched to the given direction.
    Direction(SimDirection),
    /// A byte was driven onto the data bus by the host.
    Data(u8),
    /// A controller latched a command byte.
    Command(Controller, u8),
    /// A controller stored a display data byte.
    DataWrite(Controller, u8),
    /// A controller drove a display data byte during a read cycle.
    DataRead(Controller, u8),
    /// A controller drove its status byte during a read cycle.
    StatusRead(Controller, u8),
}

const COLUMNS: usize = COLUMNS_PER_CONTROLLER as usize;
const PAGES: usize = PAGES_PER_CONTROLLER as usize;

#[derive(Clone, Debug)]
struct SimController {
    ram: [[u8; COLUMNS]; PAGES],
    column: u8,
    page: u8,
    start_line: u8,
    on: bool,
    adc_reverse: bool,
    static_drive: bool,
    duty: DutyRatio,
    rmw_column: Option<u8>,
    read_latch: u8,
    driving: Option<u8>,
    busy_left: u32,
    reset_left: u32,
}

impl SimController {
    fn new() -> Self {
        SimController {
            ram: [[0; COLUMNS]; PAGES],
            column: 0,
            page: 3,
            start_line: 0,
            on: false,
            adc_reverse: false,
            static_drive: false,
            duty: DutyRatio::ThirtyTwo,
            rmw_column: None,
            read_latch: 0,
            driving: None,
            busy_left: 0,
            reset_left: 0,
        }
    }

    fn status(&self) -> u8 {
        let mut status = 0;
        if self.busy_left > 0 {
            status |= STATUS_BUSY;
        }
        if !self.adc_reverse {
            status |= STATUS_ADC;
        }
        if !self.on {
            status |= STATUS_OFF;
        }
        if self.reset_left > 0 {
            status |= STATUS_RESET;
        }
        status
    }

    fn soft_reset(&mut self, busy_cycles: u32) {
        self.start_line = 0;
        self.column = 0;
        self.page = 3;
        self.rmw_column = None;
        self.reset_left = busy_cycles;
    }

    fn hardware_reset(&mut self) {
        // RAM survives, everything else goes back to power-on state
        let ram = self.ram;
        *self = SimController::new();
        self.ram = ram;
    }

    fn command(&mut self, command: u8, busy_cycles: u32) {
        match command {
            DISPLAY_ON => self.on = true,
            DISPLAY_OFF => self.on = false,
            ADC_FORWARD => self.adc_reverse = false,
            ADC_REVERSE => self.adc_reverse = true,
            STATIC_DRIVE_ON => self.static_drive = true,
            STATIC_DRIVE_OFF => self.static_drive = false,
            DUTY_RATIO_16 => self.duty = DutyRatio::Sixteen,
            DUTY_RATIO_32 => self.duty = DutyRatio::ThirtyTwo,
            READ_MODIFY_WRITE => self.rmw_column = Some(self.column),
            END_READ_MODIFY => {
                if let Some(column) = self.rmw_column.take() {
                    self.column = column;
                }
            }
            RESET => self.soft_reset(busy_cycles),
            c if c & 0xE0 == DISPLAY_START_LINE => self.start_line = c & 0x1F,
            c if c & 0xFC == SET_PAGE_ADDRESS => self.page = c & 0x03,
            c if c & 0x80 == SET_COLUMN_ADDRESS => self.column = c,
            _ => {}
        }
    }

    fn write(&mut self, data: u8) {
        if self.column < COLUMNS_PER_CONTROLLER {
            self.ram[self.page as usize][self.column as usize] = data;
            self.column += 1;
        }
    }

    /// Loads the read latch from the current address, as done at the end of every data read.
    fn advance_read(&mut self) {
        if self.column < COLUMNS_PER_CONTROLLER {
            self.read_latch = self.ram[self.page as usize][self.column as usize];
            if self.rmw_column.is_none() {
                self.column += 1;
            }
        } else {
            self.read_latch = 0;
        }
    }
}

#[derive(Debug)]
struct SimState {
    geometry: DisplayGeometry,
    controllers: [SimController; 2],
    lines: [bool; 8],
    bus_out: u8,
    direction: SimDirection,
    busy_cycles: u32,
    events: Vec<SimEvent>,
}

fn index(controller: Controller) -> usize {
    match controller {
        Controller::Left => 0,
        Controller::Right => 1,
    }
}

impl SimState {
    fn chip_selected(&self) -> ControllerSet {
        let mut selected = ControllerSet::empty();
        if self.lines[SimLine::Cs1 as usize] {
            selected |= ControllerSet::LEFT;
        }
        if self.lines[SimLine::Cs2 as usize] {
            selected |= ControllerSet::RIGHT;
        }
        selected
    }

    fn set_line(&mut self, line: SimLine, level: bool) {
        self.events.push(SimEvent::Line(line, level));
        let previous = std::mem::replace(&mut self.lines[line as usize], level);
        if previous == level {
            return;
        }

        match line {
            SimLine::E => {
                let selected = self.chip_selected();
                self.strobe(selected, level);
            }
            SimLine::E1 => self.strobe(ControllerSet::LEFT, level),
            SimLine::E2 => self.strobe(ControllerSet::RIGHT, level),
            SimLine::Reset if !level => {
                for chip in &mut self.controllers {
                    chip.hardware_reset();
                }
            }
            SimLine::Reset => {
                for chip in &mut self.controllers {
                    chip.reset_left = self.busy_cycles;
                }
            }
            _ => {}
        }
    }

    fn strobe(&mut self, targets: ControllerSet, rising: bool) {
        let a0 = self.lines[SimLine::A0 as usize];
        let read = self.lines[SimLine::Rw as usize];
        let bus_out = self.bus_out;
        let busy_cycles = self.busy_cycles;

        for controller in targets.controllers() {
            let chip = &mut self.controllers[index(controller)];

            if rising {
                if read {
                    chip.driving = Some(if a0 { chip.read_latch } else { chip.status() });
                }
                continue;
            }

            let driven = chip.driving.take();
            match (read, a0) {
                (false, false) => {
                    chip.command(bus_out, busy_cycles);
                    chip.busy_left = busy_cycles;
                    self.events.push(SimEvent::Command(controller, bus_out));
                }
                (false, true) => {
                    chip.write(bus_out);
                    chip.busy_left = busy_cycles;
                    self.events.push(SimEvent::DataWrite(controller, bus_out));
                }
                (true, true) => {
                    chip.advance_read();
                    self.events.push(SimEvent::DataRead(controller, driven.unwrap_or(0xFF)));
                }
                (true, false) => {
                    chip.busy_left = chip.busy_left.saturating_sub(1);
                    chip.reset_left = chip.reset_left.saturating_sub(1);
                    self.events.push(SimEvent::StatusRead(controller, driven.unwrap_or(0xFF)));
                }
            }
        }
    }

    /// Level seen on the data bus. Undriven lines float high through the pull-ups, and two
    /// controllers driving at once are combined as if open-collector.
    fn read_bus(&self) -> u8 {
        if self.direction == SimDirection::Output {
            return self.bus_out;
        }
        self.controllers
            .iter()
            .filter_map(|chip| chip.driving)
            .reduce(|a, b| a | b)
            .unwrap_or(0xFF)
    }
}

/// A simulated two-controller SED1520 panel.
#[derive(Clone)]
pub struct SimPanel {
    state: Rc<RefCell<SimState>>,
}

impl Debug for SimPanel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimPanel({:?})", self.state.borrow().geometry)
    }
}

impl SimPanel {
    pub fn new(geometry: DisplayGeometry) -> Self {
        SimPanel {
            state: Rc::new(RefCell::new(SimState {
                geometry,
                controllers: [SimController::new(), SimController::new()],
                lines: [false; 8],
                bus_out: 0,
                direction: SimDirection::Output,
                busy_cycles: 0,
                events: Vec::new(),
            })),
        }
    }

    /// Makes each controller report busy for `cycles` status reads after every write, and
    /// resetting for as many reads after a reset.
    pub fn with_busy_cycles(self, cycles: u32) -> Self {
        self.state.borrow_mut().busy_cycles = cycles;
        self
    }

    /// Creates the fake lines to hand to the driver.
    pub fn wiring(&self) -> SimWiring {
        let pin = |line| SimPin {
            line,
            state: Rc::clone(&self.state),
        };
        SimWiring {
            reset: pin(SimLine::Reset),
            a0: pin(SimLine::A0),
            rw: pin(SimLine::Rw),
            cs1: pin(SimLine::Cs1),
            cs2: pin(SimLine::Cs2),
            e: pin(SimLine::E),
            e1: pin(SimLine::E1),
            e2: pin(SimLine::E2),
            data: SimDataBus {
                state: Rc::clone(&self.state),
            },
        }
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.state.borrow().geometry
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Command bytes latched by the controllers, in order.
    pub fn commands(&self) -> Vec<(Controller, u8)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SimEvent::Command(controller, command) => Some((controller, command)),
                _ => None,
            })
            .collect()
    }

    /// Display data bytes stored by the controllers, in order.
    pub fn data_writes(&self) -> Vec<(Controller, u8)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SimEvent::DataWrite(controller, data) => Some((controller, data)),
                _ => None,
            })
            .collect()
    }

    /// Number of status reads answered by the given controller.
    pub fn status_reads(&self, controller: Controller) -> usize {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, SimEvent::StatusRead(c, _) if *c == controller))
            .count()
    }

    /// Number of low-to-high transitions of a line in the recorded events.
    pub fn rising_edges(&self, line: SimLine) -> usize {
        let state = self.state.borrow();
        let mut level = false;
        let mut edges = 0;
        for event in &state.events {
            if let SimEvent::Line(l, new_level) = *event {
                if l == line {
                    if new_level && !level {
                        edges += 1;
                    }
                    level = new_level;
                }
            }
        }
        edges
    }

    /// Rising edges across every enable line, whichever wiring is in use.
    pub fn strobes(&self) -> usize {
        [SimLine::E, SimLine::E1, SimLine::E2]
            .into_iter()
            .map(|line| self.rising_edges(line))
            .sum()
    }

    pub fn ram(&self, controller: Controller, page: u8, column: u8) -> u8 {
        self.state.borrow().controllers[index(controller)].ram[page as usize][column as usize]
    }

    /// Overwrites the display RAM of both controllers.
    pub fn fill(&self, value: u8) {
        for chip in &mut self.state.borrow_mut().controllers {
            chip.ram = [[value; COLUMNS]; PAGES];
        }
    }

    /// Current (column, page) address of a controller.
    pub fn address(&self, controller: Controller) -> (u8, u8) {
        let state = self.state.borrow();
        let chip = &state.controllers[index(controller)];
        (chip.column, chip.page)
    }

    pub fn is_display_on(&self, controller: Controller) -> bool {
        self.state.borrow().controllers[index(controller)].on
    }

    pub fn start_line(&self, controller: Controller) -> u8 {
        self.state.borrow().controllers[index(controller)].start_line
    }

    pub fn is_adc_reversed(&self, controller: Controller) -> bool {
        self.state.borrow().controllers[index(controller)].adc_reverse
    }

    pub fn is_static_drive(&self, controller: Controller) -> bool {
        self.state.borrow().controllers[index(controller)].static_drive
    }

    pub fn duty_ratio(&self, controller: Controller) -> DutyRatio {
        self.state.borrow().controllers[index(controller)].duty
    }

    /// Whether the pixel at logical coordinates is lit, ignoring the start line.
    pub fn pixel(&self, x: u8, y: u8) -> bool {
        let (controller, column) = self.geometry().route(x);
        self.ram(controller, y / 8, column) & (1 << (y % 8)) != 0
    }

    /// Renders the panel contents as text, `#` for lit pixels.
    pub fn render(&self) -> String {
        let geometry = self.geometry();
        let mut out = String::new();
        for y in 0..geometry.ypixels() {
            for x in 0..geometry.xpixels() {
                out.push(if self.pixel(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

/// The fake lines of a [SimPanel], ready to be borrowed by a driver.
#[derive(Debug)]
pub struct SimWiring {
    pub reset: SimPin,
    pub a0: SimPin,
    pub rw: SimPin,
    pub cs1: SimPin,
    pub cs2: SimPin,
    pub e: SimPin,
    pub e1: SimPin,
    pub e2: SimPin,
    pub data: SimDataBus,
}

impl SimWiring {
    /// Driver for a panel wired with CS1, CS2 and a shared E.
    pub fn chip_select_driver(&mut self) -> GpioSED1520Driver<'_> {
        GpioSED1520Driver::new_chip_select(
            Some(&self.reset),
            &self.a0,
            &self.rw,
            &self.cs1,
            &self.cs2,
            &self.e,
            &mut self.data,
        )
        .with_delay(&NoDelay)
    }

    /// Driver for a panel wired with E1 and E2.
    pub fn dual_enable_driver(&mut self) -> GpioSED1520Driver<'_> {
        GpioSED1520Driver::new_dual_enable(
            Some(&self.reset),
            &self.a0,
            &self.rw,
            &self.e1,
            &self.e2,
            &mut self.data,
        )
        .with_delay(&NoDelay)
    }
}

pub struct SimPin {
    line: SimLine,
    state: Rc<RefCell<SimState>>,
}

impl Debug for SimPin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimPin({:?})", self.line)
    }
}

impl GpioOutput for SimPin {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.state.borrow_mut().set_line(self.line, value);
        Ok(())
    }
}

pub struct SimDataBus {
    state: Rc<RefCell<SimState>>,
}

impl Debug for SimDataBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDataBus")
    }
}

impl SimDataBus {
    fn set_direction(&self, direction: SimDirection) {
        let mut state = self.state.borrow_mut();
        state.direction = direction;
        state.events.push(SimEvent::Direction(direction));
    }
}

impl GpioBus<8> for SimDataBus {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<8> + '_>> {
        self.set_direction(SimDirection::Input);
        Ok(Box::new(SimBusInput { bus: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<8> + '_>> {
        self.set_direction(SimDirection::Output);
        Ok(Box::new(SimBusOutput { bus: self }))
    }
}

#[derive(Debug)]
struct SimBusInput<'a> {
    bus: &'a SimDataBus,
}

impl GpioBusInput<8> for SimBusInput<'_> {
    fn read(&self) -> GpioResult<[bool; 8]> {
        Ok(byte_to_bits(self.bus.state.borrow().read_bus()))
    }
}

#[derive(Debug)]
struct SimBusOutput<'a> {
    bus: &'a SimDataBus,
}

impl GpioBusOutput<8> for SimBusOutput<'_> {
    fn write(&self, values: &[bool; 8]) -> GpioResult<()> {
        let byte = bits_to_byte(values);
        let mut state = self.bus.state.borrow_mut();
        state.bus_out = byte;
        state.events.push(SimEvent::Data(byte));
        Ok(())
    }
}
