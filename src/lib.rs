#![cfg_attr(not(test), no_std)]
//! SX1276 Radio Driver
//!
//! This crate provides a type-safe interface for the Semtech SX1276/77/78/79 sub-GHz
//! radio transceivers. The SX1276 family pairs a LoRa spread-spectrum modem with a
//! classic FSK/OOK packet engine behind a single register file, selected by the
//! family bits of the operating mode register.
//!
//! # Features
//! - Frequency range: 137-1020 MHz
//! - Modulation support:
//!   - LoRa: SF6-12, BW 7.8-500kHz, CR 4/5-4/8
//!   - FSK: BR 1.2-300kbps, deviation 0.6-200kHz
//!   - OOK: BR 1.2-300kbps
//! - Output power: -4 to +15 dBm (RFO), +2 to +20 dBm (PA_BOOST)
//! - 256 byte FIFO, packets of up to 255 bytes
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`device`]: Register bus adapter
//!   - Single register reads and writes, FIFO bursts
//!   - One `SpiDevice` transaction per access
//!
//! - [`registers`]: Register definitions for direct hardware access
//!   - [`registers::common`]: Registers shared by both modem families
//!   - [`registers::lora`]: LoRa register bank
//!   - [`registers::fsk`]: FSK/OOK register bank
//!
//! - [`config`]: Radio configuration and parameter validation
//! - [`synth`]: Register value synthesis (frequency, bit rate, PA, RSSI)
//! - [`radio`]: The [`Sx1276`] driver: mode control, modem configuration,
//!   blocking transmit and receive
//!
//! # Usage
//! The driver uses the `regiface` crate for typed register access and
//! `embedded-hal` 1.0 traits for the bus, the reset and DIO0 lines and delays. The
//! host supplies a monotonic millisecond [`Clock`] for the TX/RX deadlines.
//!
//! 1. Describe the radio with a [`RadioConfig`]
//! 2. Create the driver with [`Sx1276::new`]
//! 3. Call [`Sx1276::begin`] to reset, identify and configure the chip
//! 4. Send and receive with [`Sx1276::transmit`] and [`Sx1276::receive`]
//!
//! # Important Notes
//! - The modem family can only change while the chip is asleep; use
//!   [`Sx1276::set_modulation`], which handles the sequence and re-applies every
//!   family-specific register
//! - Setters for the inactive family are stored and applied on the next switch
//! - Operations block the caller until completion or timeout
//!
//! # Example
//! ```no_run
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::digital::{InputPin, OutputPin};
//! use embedded_hal::spi::SpiDevice;
//! use sx1276::{Clock, Pins, RadioConfig, Sx1276};
//!
//! fn ping<SPI, RESET, DIO0, DELAY, CLOCK, PIN>(
//!     spi: SPI,
//!     pins: Pins<RESET, DIO0>,
//!     delay: DELAY,
//!     clock: CLOCK,
//! ) -> Result<(), sx1276::Error<SPI::Error, PIN>>
//! where
//!     SPI: SpiDevice,
//!     RESET: OutputPin<Error = PIN>,
//!     DIO0: InputPin<Error = PIN>,
//!     DELAY: DelayNs,
//!     CLOCK: Clock,
//! {
//!     let config = RadioConfig {
//!         frequency: 868_100_000,
//!         ..Default::default()
//!     };
//!     let mut radio = Sx1276::new(spi, pins, delay, clock, config);
//!     radio.begin()?;
//!
//!     radio.transmit(b"ping")?;
//!
//!     let mut buffer = [0u8; 64];
//!     let len = radio.receive(&mut buffer)?;
//!     let _pong = &buffer[..len];
//!
//!     radio.end()
//! }
//! ```

mod fmt;

pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod radio;
pub mod registers;
pub mod synth;

#[cfg(test)]
mod test;

pub use clock::Clock;
pub use config::*;
pub use device::Device;
pub use error::{ConfigError, Error, PinError, SpiError};
pub use radio::{Pins, Sx1276, MAX_PAYLOAD};
pub use registers::Mode;

/// SPI mode the chip expects: CPOL = 0, CPHA = 0, MSB first
pub const SPI_MODE: embedded_hal::spi::Mode = embedded_hal::spi::MODE_0;

/// Highest SCK frequency the chip accepts is 10 MHz; this is a conservative default.
pub const SPI_FREQUENCY_HZ: u32 = 2_000_000;
