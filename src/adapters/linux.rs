//! Raspberry Pi peripherals through the Linux character-device APIs.
//!
//! The button and coin lines are requested as inputs on the gpio-cdev
//! chip; the code reader sits on an i2c-dev bus.  Line bias is not set
//! here: pull-ups come from the board overlay (`config.txt`), the coin
//! validator needs one to idle HIGH.

use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, I2cdev};
use log::info;

use crate::config::HardwareConfig;
use crate::drivers::code_reader::TinyCodeReader;
use crate::error::{Error, Result};

const CONSUMER: &str = "changeomatic";

pub struct LinuxHardware {
    pub button: CdevPin,
    pub coin: CdevPin,
    pub code_reader: TinyCodeReader<I2cdev>,
}

impl LinuxHardware {
    pub fn open(config: &HardwareConfig) -> Result<Self> {
        let mut chip = Chip::new(&config.gpio_chip).map_err(|e| device("GPIO chip", e))?;
        let button = input_line(&mut chip, config.button_pin, "button")?;
        let coin = input_line(&mut chip, config.coin_pin, "coin validator line")?;

        let bus = I2cdev::new(&config.i2c_bus).map_err(|e| device("I2C bus", e))?;
        info!(
            "Hardware ready: {} (button {}, coin {}), {} @ {:#04x}",
            config.gpio_chip.display(),
            config.button_pin,
            config.coin_pin,
            config.i2c_bus.display(),
            config.code_reader_address
        );

        Ok(Self {
            button,
            coin,
            code_reader: TinyCodeReader::new(bus, config.code_reader_address),
        })
    }
}

fn input_line(chip: &mut Chip, offset: u32, what: &'static str) -> Result<CdevPin> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(LineRequestFlags::INPUT, 0, CONSUMER))
        .map_err(|e| device(what, e))?;
    CdevPin::new(handle).map_err(|e| device(what, e))
}

fn device(what: &'static str, err: impl core::fmt::Display) -> Error {
    Error::Device {
        what,
        detail: err.to_string(),
    }
}
