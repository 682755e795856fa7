//! Addressing state and display session on top of a [SED1520Driver].
use crate::GpioResult;
use crate::lcd::sed1520::command::STATUS_RESET;
use crate::lcd::sed1520::driver::{Controller, ControllerSet, SED1520Driver};
use crate::lcd::sed1520::geometry::DisplayGeometry;
use log::{debug, trace};

/// Column and page the next sequential data access goes to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LogicalPosition {
    pub column: u8,
    pub page: u8,
}

/// A two-controller SED1520 panel seen as a single surface of byte columns.
///
/// Keeps the logical address of the next data access and translates it into the addressing
/// commands of each controller. Data is written and read one byte (a column of 8 vertical pixels
/// within a page) at a time, advancing to the right and wrapping to the start of the next page at
/// the right edge.
///
/// Columns and pages are not range-checked. Writing past the last page is left to the caller to
/// avoid, since the wrap after the last column of the last page addresses a page that does not
/// exist.
#[derive(Debug)]
pub struct SED1520Display<D: SED1520Driver> {
    driver: D,
    geometry: DisplayGeometry,
    position: LogicalPosition,
    /// Controller whose column counter ran ahead of the logical column after a read.
    stale_column: Option<Controller>,
}

impl<D: SED1520Driver> SED1520Display<D> {
    pub fn new(driver: D) -> Self {
        Self::with_geometry(driver, DisplayGeometry::DEFAULT)
    }

    pub fn with_geometry(driver: D, geometry: DisplayGeometry) -> Self {
        SED1520Display {
            driver,
            geometry,
            position: LogicalPosition::default(),
            stale_column: None,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    pub fn position(&self) -> LogicalPosition {
        self.position
    }

    /// Resets the controllers and turns the display on.
    ///
    /// Sequence: hardware reset pulse, software reset of both controllers, wait for the reset flag
    /// to clear (with busy checking only), display on, start line 0.
    ///
    /// The controllers come out of reset addressing page 3, so use [Self::clear_screen] or
    /// [Self::set_address] before writing.
    pub fn init(&mut self) -> GpioResult<()> {
        debug!(
            "Initializing {}x{} SED1520 display",
            self.geometry.xpixels(),
            self.geometry.ypixels()
        );

        self.driver.hardware_reset()?;
        self.driver.reset(ControllerSet::ALL)?;
        self.driver.busy_wait(STATUS_RESET, ControllerSet::ALL)?;
        self.driver.set_display_on(true, ControllerSet::ALL)?;
        self.driver.set_start_line(0, ControllerSet::ALL)?;

        self.position = LogicalPosition::default();
        self.stale_column = None;

        Ok(())
    }

    /// Sets the logical address and the addresses of the controllers.
    ///
    /// In the left half, the right controller is also moved to its column 0 on the same page, so
    /// a run of writes crossing the middle continues seamlessly. In the right half, only the right
    /// controller is touched: runs never cross back to the left, they wrap to the next page
    /// through this method again.
    pub fn set_address(&mut self, column: u8, page: u8) -> GpioResult<()> {
        trace!("Setting address: column {}, page {}", column, page);

        self.position = LogicalPosition { column, page };
        self.stale_column = None;

        match self.geometry.route(column) {
            (Controller::Left, column) => {
                self.driver.set_column_address(column, ControllerSet::LEFT)?;
                self.driver.set_column_address(0, ControllerSet::RIGHT)?;
                self.driver.set_page_address(page, ControllerSet::ALL)?;
            }
            (Controller::Right, column) => {
                self.driver.set_column_address(column, ControllerSet::RIGHT)?;
                self.driver.set_page_address(page, ControllerSet::RIGHT)?;
            }
        }

        Ok(())
    }

    /// Writes a byte at the current position and advances it.
    pub fn write_next(&mut self, data: u8) -> GpioResult<()> {
        let controller = self.sync_column()?;
        self.driver.send_data(data, controller)?;
        self.advance()
    }

    /// Reads the byte at the current position and advances it.
    pub fn read_next(&mut self) -> GpioResult<u8> {
        let controller = self.sync_column()?;
        let data = self.driver.read_data(controller)?;
        // The dummy read moved the controller's column counter one further than ours
        self.stale_column = Some(controller);
        self.advance()?;
        Ok(data)
    }

    /// Writes the bytes one after the other, as [Self::write_next] does.
    pub fn write_bytes(&mut self, data: &[u8]) -> GpioResult<()> {
        for &byte in data {
            self.write_next(byte)?;
        }
        Ok(())
    }

    /// Zeroes every page, then moves back to (0, 0).
    pub fn clear_screen(&mut self) -> GpioResult<()> {
        debug!("Clearing display");

        for page in 0..self.geometry.pages() {
            self.set_address(0, page)?;
            for _ in 0..self.geometry.xpixels() {
                self.write_next(0)?;
            }
        }

        self.set_address(0, 0)
    }

    /// Returns the controller owning the current column, re-sending its column address first if a
    /// previous read left its counter ahead.
    fn sync_column(&mut self) -> GpioResult<Controller> {
        let (controller, column) = self.geometry.route(self.position.column);
        if self.stale_column == Some(controller) {
            self.driver.set_column_address(column, controller.into())?;
            self.stale_column = None;
        }
        Ok(controller)
    }

    fn advance(&mut self) -> GpioResult<()> {
        self.position.column = self.position.column.wrapping_add(1);
        if self.position.column >= self.geometry.xpixels() {
            self.set_address(0, self.position.page.wrapping_add(1))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::sed1520::command::*;
    use crate::lcd::sed1520::driver::SED1520Driver;
    use crate::lcd::sed1520::sim::{SimLine, SimPanel, SimWiring};

    fn panel() -> SimPanel {
        SimPanel::new(DisplayGeometry::DEFAULT)
    }

    fn page_commands(panel: &SimPanel, controller: Controller) -> Vec<u8> {
        panel
            .commands()
            .into_iter()
            .filter(|&(c, command)| c == controller && command & 0xF8 == SET_PAGE_ADDRESS)
            .map(|(_, command)| command & 0x07)
            .collect()
    }

    fn drivers(wiring: &mut SimWiring, chip_select: bool) -> SED1520Display<impl SED1520Driver + '_> {
        let driver = if chip_select {
            wiring.chip_select_driver()
        } else {
            wiring.dual_enable_driver()
        };
        SED1520Display::new(driver)
    }

    #[test]
    fn set_address_in_left_half_presets_right_controller() {
        let panel = panel();
        let mut wiring = panel.wiring();
        let mut display = drivers(&mut wiring, false);

        display.set_address(60, 2).unwrap();

        assert_eq!(
            panel.commands(),
            vec![
                (Controller::Left, SET_COLUMN_ADDRESS | 60),
                (Controller::Right, SET_COLUMN_ADDRESS),
                (Controller::Left, SET_PAGE_ADDRESS | 2),
                (Controller::Right, SET_PAGE_ADDRESS | 2),
            ]
        );
        assert_eq!(display.position(), LogicalPosition { column: 60, page: 2 });
    }

    #[test]
    fn set_address_in_right_half_leaves_left_controller_alone() {
        let panel = panel();
        let mut wiring = panel.wiring();
        let mut display = drivers(&mut wiring, true);

        display.set_address(61, 2).unwrap();

        assert_eq!(
            panel.commands(),
            vec![
                (Controller::Right, SET_COLUMN_ADDRESS),
                (Controller::Right, SET_PAGE_ADDRESS | 2),
            ]
        );
        assert_eq!(display.position(), LogicalPosition { column: 61, page: 2 });
        assert_eq!(panel.rising_edges(SimLine::Cs1), 0);
    }

    #[test]
    fn set_address_is_reflected_in_position() {
        let panel = panel();
        let mut wiring = panel.wiring();
        let mut display = drivers(&mut wiring, false);

        for (column, page) in [(0, 0), (17, 3), (60, 1), (61, 0), (121, 3)] {
            display.set_address(column, page).unwrap();
            assert_eq!(display.position(), LogicalPosition { column, page });
        }
    }

    #[test]
    fn a_full_row_of_writes_wraps_once() {
        let panel = panel();
        let mut wiring = panel.wiring();
        let mut display = drivers(&mut wiring, false);

        display.set_address(0, 1).unwrap();
        for i in 0..121 {
            display.write_next(i).unwrap();
            assert_eq!(display.position().page, 1);
        }
        display.write_next(0xFF).unwrap();

        assert_eq!(display.position(), LogicalPosition { column: 0, page: 2 });
        assert_eq!(page_commands(&panel, Controller::Left), vec![1, 2]);
        assert_eq!(panel.ram(Controller::Left, 1, 60), 60);
        assert_eq!(panel.ram(Controller::Right, 1, 0), 61);
        assert_eq!(panel.ram(Controller::Right, 1, 60), 0xFF);
    }

    #[test]
    fn writes_crossing_the_middle_continue_on_the_right_controller() {
        let panel = panel();
        let mut wiring = panel.wiring();
        let mut display = drivers(&mut wiring, true);

        display.set_address(58, 1).unwrap();
        display.write_bytes(&[1, 2, 3, 4, 5, 6]).unwrap();

        assert_eq!(
            panel.data_writes(),
            vec![
                (Controller::Left, 1),
                (Controller::Left, 2),
                (Controller::Left, 3),
                (Controller::Right, 4),
                (Controller::Right, 5),
                (Controller::Right, 6),
            ]
        );
        assert_eq!(panel.ram(Controller::Left, 1, 60), 3);
        assert_eq!(panel.ram(Controller::Right, 1, 0), 4);
        assert_eq!(panel.ram(Controller::Right, 1, 2), 6);
        assert_eq!(display.position(), LogicalPosition { column: 64, page: 1 });
    }

    #[test]
    fn clear_screen_zeroes_every_byte() {
        for chip_select in [true, false] {
            let panel = panel();
            panel.fill(0xFF);
            let mut wiring = panel.wiring();
            let mut display = drivers(&mut wiring, chip_select);

            display.clear_screen().unwrap();

            let writes = panel.data_writes();
            assert_eq!(writes.len(), 4 * 122);
            assert!(writes.iter().all(|&(_, data)| data == 0));
            // One explicit address per page, the wrap after each page, and the final return home
            assert_eq!(page_commands(&panel, Controller::Left), vec![0, 1, 1, 2, 2, 3, 3, 4, 0]);
            assert_eq!(display.position(), LogicalPosition { column: 0, page: 0 });

            for page in 0..4 {
                for column in 0..61 {
                    assert_eq!(panel.ram(Controller::Left, page, column), 0);
                    assert_eq!(panel.ram(Controller::Right, page, column), 0);
                }
            }

            for _ in 0..4 * 122 {
                assert_eq!(display.read_next().unwrap(), 0);
            }
        }
    }

    #[test]
    fn sequential_reads_return_what_was_written() {
        for chip_select in [true, false] {
            let panel = panel();
            let mut wiring = panel.wiring();
            let mut display = drivers(&mut wiring, chip_select);

            let pattern: Vec<u8> = (0..130).map(|i| (i * 7) as u8).collect();
            display.set_address(55, 0).unwrap();
            display.write_bytes(&pattern).unwrap();

            display.set_address(55, 0).unwrap();
            let read: Vec<u8> = (0..130).map(|_| display.read_next().unwrap()).collect();

            assert_eq!(read, pattern);
            assert_eq!(display.position(), LogicalPosition { column: 63, page: 1 });
        }
    }

    #[test]
    fn write_after_read_lands_on_the_next_column() {
        let panel = panel();
        let mut wiring = panel.wiring();
        let mut display = drivers(&mut wiring, false);

        display.set_address(10, 0).unwrap();
        display.read_next().unwrap();
        display.write_next(0x42).unwrap();

        assert_eq!(panel.ram(Controller::Left, 0, 11), 0x42);
        assert_eq!(panel.ram(Controller::Left, 0, 12), 0);
    }

    #[test]
    fn consecutive_reads_re_send_only_the_column_of_the_read_controller() {
        let panel = panel();
        let mut wiring = panel.wiring();
        let mut display = drivers(&mut wiring, true);

        display.set_address(10, 0).unwrap();
        panel.clear_events();
        display.read_next().unwrap();
        display.read_next().unwrap();

        assert_eq!(panel.commands(), vec![(Controller::Left, SET_COLUMN_ADDRESS | 11)]);
        assert_eq!(panel.address(Controller::Left), (13, 0));
        assert_eq!(display.position(), LogicalPosition { column: 12, page: 0 });
    }

    #[test]
    fn driver_stays_usable_through_the_display() {
        let panel = panel();
        let mut wiring = panel.wiring();
        let mut display = drivers(&mut wiring, false);

        display.driver_mut().set_display_on(true, ControllerSet::RIGHT).unwrap();
        let mut driver = display.into_inner();

        assert!(!driver.status(Controller::Right).unwrap().display_off);
        assert!(driver.status(Controller::Left).unwrap().display_off);
    }

    #[test]
    fn init_resets_and_powers_on_both_controllers() {
        for chip_select in [true, false] {
            let panel = panel();
            let mut wiring = panel.wiring();
            let mut display = drivers(&mut wiring, chip_select);

            display.init().unwrap();

            assert_eq!(
                panel.commands(),
                vec![
                    (Controller::Left, RESET),
                    (Controller::Right, RESET),
                    (Controller::Left, DISPLAY_ON),
                    (Controller::Right, DISPLAY_ON),
                    (Controller::Left, DISPLAY_START_LINE),
                    (Controller::Right, DISPLAY_START_LINE),
                ]
            );
            assert_eq!(panel.rising_edges(SimLine::Reset), 2);
            assert!(panel.is_display_on(Controller::Left));
            assert!(panel.is_display_on(Controller::Right));
            assert_eq!(display.position(), LogicalPosition::default());
        }
    }

    #[test]
    fn init_with_busy_check_waits_for_reset_to_finish() {
        for chip_select in [true, false] {
            let panel = panel().with_busy_cycles(2);
            let mut wiring = panel.wiring();
            let driver = if chip_select {
                wiring.chip_select_driver()
            } else {
                wiring.dual_enable_driver()
            };
            let mut display = SED1520Display::new(driver.with_busy_check(true));

            display.init().unwrap();
            display.clear_screen().unwrap();

            assert!(display.driver().is_busy_check_enabled());
            assert!(panel.status_reads(Controller::Left) > 0);
            assert!(panel.status_reads(Controller::Right) > 0);
            assert!(panel.is_display_on(Controller::Right));
            assert_eq!(panel.data_writes().len(), 488);
        }
    }

    #[test]
    fn smaller_geometry_splits_at_its_own_half() {
        let panel = SimPanel::new(DisplayGeometry::new(20, 16).unwrap());
        let mut wiring = panel.wiring();
        let geometry = panel.geometry();
        let mut display = SED1520Display::with_geometry(wiring.dual_enable_driver(), geometry);

        display.clear_screen().unwrap();

        assert_eq!(panel.data_writes().len(), 40);
        display.set_address(10, 1).unwrap();
        display.write_next(0x0F).unwrap();
        assert_eq!(panel.ram(Controller::Right, 1, 0), 0x0F);
    }
}
