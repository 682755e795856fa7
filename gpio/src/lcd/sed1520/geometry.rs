use crate::lcd::sed1520::command::{COLUMNS_PER_CONTROLLER, PAGES_PER_CONTROLLER};
use crate::lcd::sed1520::driver::Controller;
use crate::{GpioError, GpioResult};

/// Pixel dimensions of a two-controller panel.
///
/// The columns are split in half: the left controller owns `[0, xpixels / 2)`, the right one owns
/// the rest, re-based to start at its own column 0.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DisplayGeometry {
    xpixels: u8,
    ypixels: u8,
}

impl DisplayGeometry {
    /// The common 122x32 panel, 61 columns per controller.
    pub const DEFAULT: DisplayGeometry = DisplayGeometry {
        xpixels: 122,
        ypixels: 32,
    };

    /// Creates a panel geometry.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if `ypixels` is not a whole number of pages, or either half
    ///   exceeds what a single controller can address.
    pub fn new(xpixels: u8, ypixels: u8) -> GpioResult<Self> {
        let right_half = xpixels - xpixels / 2;
        if xpixels < 2 || right_half > COLUMNS_PER_CONTROLLER {
            return Err(GpioError::InvalidArgument);
        }
        if ypixels == 0 || ypixels % 8 != 0 || ypixels / 8 > PAGES_PER_CONTROLLER {
            return Err(GpioError::InvalidArgument);
        }
        Ok(DisplayGeometry { xpixels, ypixels })
    }

    pub fn xpixels(&self) -> u8 {
        self.xpixels
    }

    pub fn ypixels(&self) -> u8 {
        self.ypixels
    }

    /// First column owned by the right controller.
    pub fn half(&self) -> u8 {
        self.xpixels / 2
    }

    /// Number of 8-row pages.
    pub fn pages(&self) -> u8 {
        self.ypixels / 8
    }

    /// Maps a logical column to the controller owning it and the column on that controller.
    ///
    /// Columns past the right edge are not rejected and land on the right controller.
    pub fn route(&self, column: u8) -> (Controller, u8) {
        let half = self.half();
        if column < half {
            (Controller::Left, column)
        } else {
            (Controller::Right, column - half)
        }
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_half_maps_to_left_controller_unchanged() {
        let geometry = DisplayGeometry::DEFAULT;
        for column in 0..61 {
            assert_eq!(geometry.route(column), (Controller::Left, column));
        }
    }

    #[test]
    fn right_half_is_rebased_to_zero() {
        let geometry = DisplayGeometry::DEFAULT;
        for column in 61..122 {
            assert_eq!(geometry.route(column), (Controller::Right, column - 61));
        }
        assert_eq!(geometry.route(61), (Controller::Right, 0));
        assert_eq!(geometry.route(121), (Controller::Right, 60));
    }

    #[test]
    fn default_panel_has_four_pages() {
        let geometry = DisplayGeometry::default();
        assert_eq!(geometry.half(), 61);
        assert_eq!(geometry.pages(), 4);
    }

    #[test]
    fn rejects_geometries_a_controller_cannot_address() {
        assert_eq!(DisplayGeometry::new(122, 30), Err(GpioError::InvalidArgument));
        assert_eq!(DisplayGeometry::new(122, 40), Err(GpioError::InvalidArgument));
        assert_eq!(DisplayGeometry::new(170, 32), Err(GpioError::InvalidArgument));
        assert!(DisplayGeometry::new(160, 16).is_ok());
    }
}
