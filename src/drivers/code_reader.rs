//! Useful Sensors Tiny Code Reader on I2C.
//!
//! The module keeps its latest decode in a register file that always
//! starts at offset 0 with a little-endian `u16` length, followed by the
//! payload.  Every read first resets the register pointer, so a caller can
//! read the 2-byte header alone and then re-read header + payload.

use embedded_hal::i2c::I2c;
use log::debug;

use crate::app::ports::CodeReader;
use crate::error::HardwareError;

pub struct TinyCodeReader<I> {
    bus: I,
    address: u8,
}

impl<I: I2c> TinyCodeReader<I> {
    pub fn new(bus: I, address: u8) -> Self {
        Self { bus, address }
    }
}

impl<I: I2c> CodeReader for TinyCodeReader<I> {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), HardwareError> {
        self.bus
            .write_read(self.address, &[0x00], buf)
            .map_err(|e| {
                debug!("I2C read from 0x{:02x}: {e:?}", self.address);
                HardwareError::BusRead
            })
    }
}
