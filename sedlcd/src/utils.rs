use log::warn;
use sedlcd_gpio::GpioResult;
use sedlcd_gpio::lcd::sed1520::display::SED1520Display;
use sedlcd_gpio::lcd::sed1520::driver::SED1520Driver;
use crate::config::Pattern;

pub trait DisplayExt {
    /// Draws the pattern over the whole display, page by page.
    fn draw_pattern(&mut self, pattern: Pattern) -> GpioResult<()>;
    /// Reads the whole display back and returns the number of bytes not matching the pattern.
    fn verify_pattern(&mut self, pattern: Pattern) -> GpioResult<usize>;
}

impl <D: SED1520Driver> DisplayExt for SED1520Display<D> {
    fn draw_pattern(&mut self, pattern: Pattern) -> GpioResult<()> {
        let geometry = self.geometry();
        for page in 0..geometry.pages() {
            self.set_address(0, page)?;
            let row: Vec<u8> = (0..geometry.xpixels())
                .map(|column| pattern.byte_at(column, page))
                .collect();
            self.write_bytes(&row)?;
        }
        self.set_address(0, 0)
    }

    fn verify_pattern(&mut self, pattern: Pattern) -> GpioResult<usize> {
        let geometry = self.geometry();
        let mut mismatches = 0;
        for page in 0..geometry.pages() {
            self.set_address(0, page)?;
            for column in 0..geometry.xpixels() {
                let expected = pattern.byte_at(column, page);
                let actual = self.read_next()?;
                if actual != expected {
                    warn!("Mismatch at column {}, page {}: expected {:#04x}, read {:#04x}",
                        column, page, expected, actual);
                    mismatches += 1;
                }
            }
        }
        self.set_address(0, 0)?;
        Ok(mismatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sedlcd_gpio::lcd::sed1520::driver::Controller;
    use sedlcd_gpio::lcd::sed1520::geometry::DisplayGeometry;
    use sedlcd_gpio::lcd::sed1520::sim::SimPanel;

    #[test]
    fn drawn_pattern_verifies_clean() {
        let panel = SimPanel::new(DisplayGeometry::DEFAULT);
        let mut wiring = panel.wiring();
        let mut display = SED1520Display::new(wiring.chip_select_driver());

        display.init().unwrap();
        display.draw_pattern(Pattern::Stripes).unwrap();

        assert_eq!(display.verify_pattern(Pattern::Stripes).unwrap(), 0);
        assert!(panel.pixel(0, 0));
        assert!(panel.pixel(1, 31));
        assert!(!panel.pixel(2, 0));
        assert_eq!(panel.ram(Controller::Right, 3, 0), Pattern::Stripes.byte_at(61, 3));
    }

    #[test]
    fn verify_counts_damaged_bytes() {
        let panel = SimPanel::new(DisplayGeometry::DEFAULT);
        let mut wiring = panel.wiring();
        let mut display = SED1520Display::new(wiring.dual_enable_driver());

        display.draw_pattern(Pattern::Blank).unwrap();
        display.set_address(70, 2).unwrap();
        display.write_bytes(&[0x01, 0x02]).unwrap();

        assert_eq!(display.verify_pattern(Pattern::Blank).unwrap(), 2);
    }
}
