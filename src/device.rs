//! SX1276 Register Bus Adapter
//!
//! This module provides the low-level interface to the SX1276 register file over
//! SPI. Every access is one `SpiDevice` transaction, so chip-select bracketing is
//! handled by the bus implementation:
//!
//! - Register read: address with bit 7 clear, then one byte clocked in
//! - Register write: address with bit 7 set, then one byte clocked out
//! - FIFO burst: the FIFO address once, then the whole payload
//!
//! Multi-register fields (frequency, preamble length, sync word) are written as a
//! sequence of independent single-register writes. There is no atomicity across
//! them, so the chip should be in sleep or standby while they change.
//!
//! # Example
//! ```no_run
//! # use embedded_hal::spi::SpiDevice;
//! use sx1276::{registers::Version, Device};
//!
//! # fn example<SPI: SpiDevice>(spi: SPI) -> Result<(), sx1276::SpiError<SPI::Error>> {
//! let mut device = Device::new(spi);
//!
//! let version: Version = device.read_register()?;
//! device.write_fifo(&[], &[0x01, 0x02, 0x03])?;
//! # Ok(())
//! # }
//! ```

use core::convert::Infallible;

use embedded_hal::spi::{Operation, SpiDevice};
use regiface::{ByteArray, ReadableRegister, WritableRegister};

use crate::error::SpiError;
use crate::registers::FIFO;

const WRITE: u8 = 0x80;

/// Register-level interface to the SX1276.
///
/// Wraps an SPI device and knows nothing about modes or modem families; that is
/// left to [`Sx1276`](crate::Sx1276).
pub struct Device<SPI> {
    spi: SPI,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device instance wrapping the provided SPI interface.
    ///
    /// The interface should run in SPI mode 0, MSB first, see [`SPI_MODE`](crate::SPI_MODE).
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Device<SPI>
where
    SPI: SpiDevice,
{
    /// Reads a typed register.
    ///
    /// # Errors
    /// * `SpiError::Read` - SPI communication failed
    pub fn read_register<R>(&mut self) -> Result<R, SpiError<SPI::Error>>
    where
        R: ReadableRegister<IdType = u8, Error = Infallible>,
    {
        let mut raw_value = R::Array::new();

        self.spi
            .transaction(&mut [
                Operation::Write(&[R::id() & !WRITE]),
                Operation::Read(raw_value.as_mut()),
            ])
            .map_err(SpiError::Read)?;

        match R::from_bytes(raw_value) {
            Ok(register) => Ok(register),
            Err(never) => match never {},
        }
    }

    /// Writes a typed register.
    ///
    /// # Errors
    /// * `SpiError::Write` - SPI communication failed
    pub fn write_register<R>(&mut self, register: R) -> Result<(), SpiError<SPI::Error>>
    where
        R: WritableRegister<IdType = u8, Error = Infallible>,
    {
        let raw_value = match register.to_bytes() {
            Ok(bytes) => bytes,
            Err(never) => match never {},
        };

        self.spi
            .transaction(&mut [
                Operation::Write(&[R::id() | WRITE]),
                Operation::Write(raw_value.as_ref()),
            ])
            .map_err(SpiError::Write)
    }

    /// Reads a typed register, applies `f` and writes the result back.
    ///
    /// Fields `f` leaves untouched keep the value read from the chip.
    pub fn modify_register<R, F>(&mut self, f: F) -> Result<(), SpiError<SPI::Error>>
    where
        R: ReadableRegister<IdType = u8, Error = Infallible>
            + WritableRegister<IdType = u8, Error = Infallible>,
        F: FnOnce(R) -> R,
    {
        let register = self.read_register::<R>()?;
        self.write_register(f(register))
    }

    /// Reads one register by raw address.
    pub fn read_raw(&mut self, address: u8) -> Result<u8, SpiError<SPI::Error>> {
        let mut value = [0u8];

        self.spi
            .transaction(&mut [
                Operation::Write(&[address & !WRITE]),
                Operation::Read(&mut value),
            ])
            .map_err(SpiError::Read)?;

        Ok(value[0])
    }

    /// Writes one register by raw address.
    pub fn write_raw(&mut self, address: u8, value: u8) -> Result<(), SpiError<SPI::Error>> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[address | WRITE]),
                Operation::Write(&[value]),
            ])
            .map_err(SpiError::Write)
    }

    /// Pushes `prefix` followed by `payload` into the FIFO in a single burst.
    ///
    /// The FIFO address is sent once; the chip does not advance the register
    /// address on FIFO bursts.
    pub fn write_fifo(&mut self, prefix: &[u8], payload: &[u8]) -> Result<(), SpiError<SPI::Error>> {
        let header = [FIFO | WRITE];

        let result = if prefix.is_empty() {
            self.spi.transaction(&mut [
                Operation::Write(&header),
                Operation::Write(payload),
            ])
        } else {
            self.spi.transaction(&mut [
                Operation::Write(&header),
                Operation::Write(prefix),
                Operation::Write(payload),
            ])
        };

        result.map_err(SpiError::Write)
    }

    /// Fills `bytes` from the FIFO in a single burst.
    pub fn read_fifo(&mut self, bytes: &mut [u8]) -> Result<(), SpiError<SPI::Error>> {
        self.spi
            .transaction(&mut [Operation::Write(&[FIFO]), Operation::Read(bytes)])
            .map_err(SpiError::Read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{lora, OpMode, Version};
    use crate::test::fixtures::Chip;

    #[test]
    fn register_read_clears_write_bit() {
        let chip = Chip::new();
        let mut device = Device::new(chip.spi());

        let version: Version = device.read_register().unwrap();
        assert_eq!(version.value, 0x12);
        assert_eq!(chip.borrow().transactions, vec![vec![0x42]]);
    }

    #[test]
    fn register_write_sets_write_bit() {
        let chip = Chip::new();
        let mut device = Device::new(chip.spi());

        device
            .write_register(lora::SyncWord { value: 0x34 })
            .unwrap();
        assert_eq!(chip.borrow().transactions, vec![vec![0xB9, 0x34]]);
        assert_eq!(chip.borrow().reg(0x39), 0x34);
    }

    #[test]
    fn modify_preserves_other_fields() {
        let chip = Chip::new();
        chip.borrow_mut().set_reg(0x01, 0x81);
        let mut device = Device::new(chip.spi());

        device
            .modify_register(|op: OpMode| OpMode {
                mode: crate::registers::Mode::Sleep,
                ..op
            })
            .unwrap();
        assert_eq!(chip.borrow().reg(0x01), 0x80);
    }

    #[test]
    fn fifo_burst_sends_address_once() {
        let chip = Chip::new();
        let mut device = Device::new(chip.spi());

        device.write_fifo(&[3], &[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(
            chip.borrow().transactions,
            vec![vec![0x80, 0x03, 0x01, 0x02, 0x03]]
        );
    }
}
