mod config;
mod utils;

use std::env::var;
use dotenv::dotenv;
use log::{debug, info, warn};
use sedlcd_gpio::{GpioDriver, GpioOutput};
use sedlcd_gpio::GpioActiveLevel::Low;
use sedlcd_gpio::GpioBias::PullUp;
use sedlcd_gpio::gpiod::GpiodDriver;
use sedlcd_gpio::lcd::sed1520::display::SED1520Display;
use sedlcd_gpio::lcd::sed1520::driver::{GpioSED1520Driver, SED1520Driver};
use sedlcd_gpio::lcd::sed1520::geometry::DisplayGeometry;
use sedlcd_gpio::lcd::sed1520::sim::SimPanel;
use crate::config::Config;
use crate::utils::DisplayExt;

fn parse_pin_bus(pin_str: &str) -> eyre::Result<[usize; 8]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("Invalid number of data pins"))
}

fn pin_var(name: &str) -> eyre::Result<usize> {
    let value = var(name).map_err(|_| eyre::eyre!("{} is not set", name))?;
    Ok(value.trim().parse()?)
}

/// Panels wired with chip-selects are recognized by `SEDLCD_PIN_CS1` being set.
fn uses_chip_select() -> bool {
    var("SEDLCD_PIN_CS1").is_ok()
}

fn load_config() -> eyre::Result<Config> {
    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };

    if config.unit_ns == 0 {
        warn!("unit_ns is 0, enable pulses will be as short as the GPIO backend allows");
    }
    if config.busy_check {
        warn!("Busy checking is enabled. A disconnected panel will hang the driver.");
    }

    Ok(config)
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("sedlcd starting...");

    let config = load_config()?;
    debug!("{:?}", config);

    match var("SEDLCD_BACKEND").as_deref().unwrap_or("gpiod") {
        "gpiod" => run_gpiod(&config),
        "sim" => run_sim(&config),
        backend => Err(eyre::eyre!("Unknown backend: {}", backend)),
    }
}

fn run_gpiod(config: &Config) -> eyre::Result<()> {
    let chip = var("SEDLCD_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());

    let a0_pin_no = pin_var("SEDLCD_PIN_A0")?;
    let rw_pin_no = pin_var("SEDLCD_PIN_RW")?;
    let res_pin_no = pin_var("SEDLCD_PIN_RES").ok();
    let data_pin_nos = parse_pin_bus(&var("SEDLCD_PINS_DATA")?)?;

    info!("LCD @ A0: {}, RW: {}, RES: {:?}, Data: {:?}",
        a0_pin_no, rw_pin_no, res_pin_no, data_pin_nos);

    debug!("Initializing GPIO driver...");
    let gpio = GpiodDriver::open(&chip)?;
    debug!("{:?} initialized.", gpio);

    let mut a0_pin = gpio.get_pin(a0_pin_no)?;
    let a0_out = a0_pin.as_output()?;
    let mut rw_pin = gpio.get_pin(rw_pin_no)?;
    let rw_out = rw_pin.as_output()?;
    let mut res_pin = res_pin_no.map(|no| gpio.get_pin(no)).transpose()?;
    let res_out = res_pin.as_mut().map(|pin| pin.as_output()).transpose()?;
    let res_out: Option<&dyn GpioOutput> = res_out.as_deref();

    let mut data_bus = gpio.get_pin_bus(data_pin_nos)?;
    // Nothing drives the bus during the first half of a read
    data_bus.set_bias(PullUp)?;

    if uses_chip_select() {
        let cs1_pin_no = pin_var("SEDLCD_PIN_CS1")?;
        let cs2_pin_no = pin_var("SEDLCD_PIN_CS2")?;
        let e_pin_no = pin_var("SEDLCD_PIN_E")?;
        info!("Chip-select wiring @ CS1: {}, CS2: {}, E: {}", cs1_pin_no, cs2_pin_no, e_pin_no);

        let mut cs1_pin = gpio.get_pin(cs1_pin_no)?;
        cs1_pin.set_active_level(Low)?;
        let cs1_out = cs1_pin.as_output()?;
        let mut cs2_pin = gpio.get_pin(cs2_pin_no)?;
        cs2_pin.set_active_level(Low)?;
        let cs2_out = cs2_pin.as_output()?;
        let mut e_pin = gpio.get_pin(e_pin_no)?;
        let e_out = e_pin.as_output()?;

        let lcd = GpioSED1520Driver::new_chip_select(
            res_out,
            &*a0_out,
            &*rw_out,
            &*cs1_out,
            &*cs2_out,
            &*e_out,
            &mut *data_bus,
        );
        run(configure(lcd, config), config)
    } else {
        let e1_pin_no = pin_var("SEDLCD_PIN_E1")?;
        let e2_pin_no = pin_var("SEDLCD_PIN_E2")?;
        info!("Dual enable wiring @ E1: {}, E2: {}", e1_pin_no, e2_pin_no);

        let mut e1_pin = gpio.get_pin(e1_pin_no)?;
        let e1_out = e1_pin.as_output()?;
        let mut e2_pin = gpio.get_pin(e2_pin_no)?;
        let e2_out = e2_pin.as_output()?;

        let lcd = GpioSED1520Driver::new_dual_enable(
            res_out,
            &*a0_out,
            &*rw_out,
            &*e1_out,
            &*e2_out,
            &mut *data_bus,
        );
        run(configure(lcd, config), config)
    }
}

fn run_sim(config: &Config) -> eyre::Result<()> {
    info!("Using simulated panel");
    let panel = SimPanel::new(DisplayGeometry::DEFAULT);
    let mut wiring = panel.wiring();

    let lcd = if uses_chip_select() {
        wiring.chip_select_driver()
    } else {
        wiring.dual_enable_driver()
    };
    run(configure(lcd, config), config)?;

    info!("Panel contents:\n{}", panel.render());
    Ok(())
}

fn configure<'a>(lcd: GpioSED1520Driver<'a>, config: &Config) -> GpioSED1520Driver<'a> {
    lcd.with_busy_check(config.busy_check)
        .with_timing(config.timing())
}

fn run<D: SED1520Driver>(lcd: D, config: &Config) -> eyre::Result<()> {
    let mut display = SED1520Display::new(lcd);

    debug!("Initializing LCD...");
    display.init()?;
    display.clear_screen()?;
    debug!("{:?} initialized.", display);

    info!("Drawing {:?} pattern", config.pattern);
    display.draw_pattern(config.pattern)?;

    if config.verify {
        match display.verify_pattern(config.pattern)? {
            0 => info!("Pattern verified."),
            mismatches => warn!("Pattern verification failed: {} bytes differ", mismatches),
        }
    }

    info!("Done.");
    Ok(())
}
