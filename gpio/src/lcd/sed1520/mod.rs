//! SED1520 graphic LCD module.
//!
//! Panels built on the SED1520 (122x32 being the most common) use two controller chips, each
//! driving one half of the columns. The chips know nothing about each other, so the driver keeps a
//! single logical column space and routes every transaction to the chip owning the column.
//!
//! Two wirings exist in the wild:
//! - **Chip-select**: the controllers run on an external clock, share the A0, E and R/W lines, and
//!   are addressed with their active-low CS1 and CS2 lines.
//! - **Dual enable**: the controllers use their internal oscillators (look for the small `RF`
//!   resistor next to one of the chips). There is no CS line, so each chip has its own enable, E1
//!   and E2.
//!
//! See [driver::SED1520Driver] for the bus-level interface, [driver::GpioSED1520Driver] for the
//! GPIO implementation covering both wirings, and [display::SED1520Display] for the addressing
//! state used by graphics code.
//!
//! # Sources
//!
//! - Epson, “SED1520 Series Dot Matrix LCD Controller Driver,” technical manual.

pub mod command;
pub mod display;
pub mod driver;
pub mod geometry;
pub mod sim;
