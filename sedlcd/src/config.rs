use std::env::var_os;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use sedlcd_gpio::lcd::sed1520::driver::SED1520Timing;

/// Test image drawn after the display is cleared.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// 8x8 pixel squares.
    #[default] Checkerboard,
    /// Vertical stripes, 2 pixels wide.
    Stripes,
    /// Nothing, the display is left clear.
    Blank,
}

impl Pattern {
    /// Byte (8 vertical pixels) of the pattern at the given column and page.
    pub fn byte_at(&self, column: u8, page: u8) -> u8 {
        match self {
            Pattern::Checkerboard => if (column / 8 + page) % 2 == 0 { 0xFF } else { 0x00 },
            Pattern::Stripes => if column % 4 < 2 { 0xFF } else { 0x00 },
            Pattern::Blank => 0x00,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Poll the busy flag before every transaction.
    pub busy_check: bool,
    /// Bus delay unit in nanoseconds. The enable pulse lasts two units.
    pub unit_ns: u32,
    /// Duration of each level of the reset pulse, in milliseconds.
    pub reset_hold_ms: u64,
    pub pattern: Pattern,
    /// Read the pattern back after drawing it and report mismatches.
    pub verify: bool,
}

impl Config {
    /// Path of the config file, `CONFIG_FILE` or `sedlcd.json`.
    pub fn path() -> PathBuf {
        var_os("CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("sedlcd.json"))
    }

    pub fn try_load() -> Option<Self> {
        Self::try_load_from(&Self::path())
    }

    pub fn try_load_from(config_path: &Path) -> Option<Self> {
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, config_path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn timing(&self) -> SED1520Timing {
        SED1520Timing {
            unit_ns: self.unit_ns,
            reset_hold: Duration::from_millis(self.reset_hold_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let timing = SED1520Timing::default();
        Config {
            busy_check: false,
            unit_ns: timing.unit_ns,
            reset_hold_ms: timing.reset_hold.as_millis() as u64,
            pattern: Pattern::default(),
            verify: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{ "pattern": "stripes", "busy_check": true }"#).unwrap();
        assert_eq!(config.pattern, Pattern::Stripes);
        assert!(config.busy_check);
        assert_eq!(config.unit_ns, 50);
        assert_eq!(config.timing(), SED1520Timing::default());
    }

    #[test]
    fn unknown_pattern_is_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{ "pattern": "plaid" }"#).is_err());
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir().join(format!("sedlcd-config-{}.json", std::process::id()));
        let config = Config {
            unit_ns: 120,
            pattern: Pattern::Blank,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::try_load_from(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, Some(config));
        assert_eq!(Config::try_load_from(&path), None);
    }

    #[test]
    fn checkerboard_alternates_every_eight_columns_and_page() {
        let pattern = Pattern::Checkerboard;
        assert_eq!(pattern.byte_at(0, 0), 0xFF);
        assert_eq!(pattern.byte_at(7, 0), 0xFF);
        assert_eq!(pattern.byte_at(8, 0), 0x00);
        assert_eq!(pattern.byte_at(0, 1), 0x00);
        assert_eq!(pattern.byte_at(8, 1), 0xFF);
    }
}
