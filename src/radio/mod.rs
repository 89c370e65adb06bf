//! SX1276 transceiver driver
//!
//! [`Sx1276`] owns the bus adapter, the reset and DIO0 lines, a delay and a
//! [`Clock`], plus the [`RadioConfig`] describing how the chip should be set up.
//! It is split by concern:
//!
//! - [`mode`]: operating mode state machine and modem family tracking
//! - [`rf`]: carrier frequency, power amplifier and over-current protection
//! - [`lora`]: LoRa modem parameters and packet telemetry
//! - [`fsk`]: FSK/OOK modem parameters
//! - [`transceiver`]: blocking transmit and receive
//!
//! # Usage
//! 1. Build a [`RadioConfig`] (or start from [`RadioConfig::default`])
//! 2. Create the driver with [`Sx1276::new`]; nothing touches the bus yet
//! 3. Call [`Sx1276::begin`] to reset the chip, check its identity and apply the
//!    configuration
//! 4. Call [`Sx1276::transmit`] / [`Sx1276::receive`] as often as needed; every
//!    call starts and ends in standby
//!
//! # Important Notes
//! - Every setter validates its argument before touching the chip
//! - Setters for the family that is not currently active only update the stored
//!   configuration; the values are applied on the next switch to that family
//! - The driver holds no lock; callers sharing it between tasks must serialize access

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::clock::Clock;
use crate::config::{Capabilities, Modulation, RadioConfig};
use crate::device::Device;
use crate::error::{Error, PinError};
use crate::registers::{Mode, Version, SILICON_VERSION};

mod fsk;
mod lora;
mod mode;
mod rf;
mod transceiver;

pub use transceiver::MAX_PAYLOAD;

type DriverError<SPI, PIN> = Error<<SPI as embedded_hal::spi::ErrorType>::Error, PIN>;

/// Control lines besides the SPI bus
///
/// Chip-select belongs to the [`SpiDevice`] implementation.
pub struct Pins<RESET, DIO0> {
    /// Active-low reset line (NRESET)
    pub reset: RESET,
    /// DIO0, mapped to TxDone/RxDone in LoRa mode
    pub dio0: DIO0,
}

/// SX1276 driver
pub struct Sx1276<SPI, RESET, DIO0, DELAY, CLOCK> {
    device: Device<SPI>,
    pins: Pins<RESET, DIO0>,
    delay: DELAY,
    clock: CLOCK,
    config: RadioConfig,
    /// Mode last written to the chip
    mode: Mode,
    /// Family bits last written to the chip, `None` until the first mode write
    family: Option<Modulation>,
    /// RSSI sampled during the last FSK/OOK reception
    fsk_rssi: i16,
}

impl<SPI, RESET, DIO0, DELAY, CLOCK> Sx1276<SPI, RESET, DIO0, DELAY, CLOCK> {
    /// Creates the driver without touching the bus.
    ///
    /// The configuration is validated and applied by [`begin`](Self::begin).
    pub fn new(
        spi: SPI,
        pins: Pins<RESET, DIO0>,
        delay: DELAY,
        clock: CLOCK,
        config: RadioConfig,
    ) -> Self {
        Self {
            device: Device::new(spi),
            pins,
            delay,
            clock,
            config,
            mode: Mode::Sleep,
            family: None,
            fsk_rssi: 0,
        }
    }

    /// Current configuration, including values stored for the inactive family
    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Operating mode last written to the chip
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Modem family last written to the chip, `None` before [`begin`](Self::begin)
    pub fn modulation(&self) -> Option<Modulation> {
        self.family
    }

    /// Gives back the bus and the peripherals.
    ///
    /// Call [`end`](Self::end) first to leave the chip asleep.
    pub fn release(self) -> (SPI, Pins<RESET, DIO0>, DELAY, CLOCK) {
        (self.device.release(), self.pins, self.delay, self.clock)
    }
}

impl<SPI, RESET, DIO0, DELAY, CLOCK, PIN> Sx1276<SPI, RESET, DIO0, DELAY, CLOCK>
where
    SPI: SpiDevice,
    RESET: OutputPin<Error = PIN>,
    DIO0: InputPin<Error = PIN>,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    /// Resets the chip, checks its identity and applies the configuration.
    ///
    /// # Errors
    /// * Any validation error of the configuration, before the bus is touched
    /// * `Error::ChipNotFound` - the version register does not read 0x12
    pub fn begin(&mut self) -> Result<(), DriverError<SPI, PIN>> {
        self.config.validate()?;

        self.reset()?;

        let version = self.device.read_register::<Version>()?.value;
        if version != SILICON_VERSION {
            warn!("unexpected version register {}", version);
            return Err(Error::ChipNotFound(version));
        }
        info!("SX1276 found, version {}", version);

        self.apply_modulation()
    }

    /// Pulses the reset line: 10 ms low, then 10 ms for the chip to come up.
    ///
    /// The chip comes back in its power-on state, so the tracked family is
    /// forgotten until the next mode write.
    pub fn reset(&mut self) -> Result<(), DriverError<SPI, PIN>> {
        self.pins.reset.set_low().map_err(PinError::Output)?;
        self.delay.delay_ms(10);
        self.pins.reset.set_high().map_err(PinError::Output)?;
        self.delay.delay_ms(10);

        self.mode = Mode::Standby;
        self.family = None;
        Ok(())
    }

    /// Replaces the whole configuration and re-applies it.
    ///
    /// Nothing is written if `config` fails validation.
    pub fn configure(&mut self, config: RadioConfig) -> Result<(), DriverError<SPI, PIN>> {
        config.validate()?;
        self.config = config;
        self.apply_modulation()
    }

    /// Switches the modem family and re-synthesizes every dependent register.
    ///
    /// # Errors
    /// * `Error::WrongModem` - the family is not in the enabled capabilities
    /// * `Error::InvalidFrequencyDeviation` - switching to FSK with the zero
    ///   deviation only OOK accepts
    pub fn set_modulation(&mut self, modulation: Modulation) -> Result<(), DriverError<SPI, PIN>> {
        RadioConfig {
            modulation,
            ..self.config
        }
        .validate()?;

        self.config.modulation = modulation;
        self.apply_modulation()
    }

    /// Sets the preamble length of the selected family: symbols in LoRa, bytes
    /// in FSK/OOK.
    pub fn set_preamble_length(&mut self, length: u16) -> Result<(), DriverError<SPI, PIN>> {
        if self.config.modulation.is_lora() {
            self.write_lora_preamble(length)
        } else {
            self.write_fsk_preamble(length)
        }
    }

    /// Enables or disables the payload CRC of the selected family.
    ///
    /// In FSK/OOK the packet length mode is kept.
    pub fn set_crc(&mut self, enabled: bool) -> Result<(), DriverError<SPI, PIN>> {
        if self.config.modulation.is_lora() {
            self.write_lora_crc(enabled)
        } else {
            self.set_packet_config(self.config.fsk.fixed_length, enabled)
        }
    }

    /// Puts the chip to sleep.
    pub fn end(&mut self) -> Result<(), DriverError<SPI, PIN>> {
        self.sleep()
    }

    /// Silicon revision from the version register
    pub fn version(&mut self) -> Result<u8, DriverError<SPI, PIN>> {
        Ok(self.device.read_register::<Version>()?.value)
    }

    /// Reads any register by address, for diagnostics.
    pub fn read_register(&mut self, address: u8) -> Result<u8, DriverError<SPI, PIN>> {
        Ok(self.device.read_raw(address)?)
    }

    /// Writes any register by address, for diagnostics.
    ///
    /// The driver does not track what is written here; writing the operating
    /// mode register desynchronizes the tracked family until
    /// [`verify_modulation`](Self::verify_modulation) or the next mode change.
    pub fn write_register(&mut self, address: u8, value: u8) -> Result<(), DriverError<SPI, PIN>> {
        Ok(self.device.write_raw(address, value)?)
    }

    fn apply_modulation(&mut self) -> Result<(), DriverError<SPI, PIN>> {
        match self.config.modulation {
            Modulation::LoRa => self.configure_lora(),
            Modulation::Fsk | Modulation::Ook => self.configure_fsk(),
        }
    }

    /// Family of the registers currently live on the chip, provided it is enabled
    fn active_modulation(&self) -> Result<Modulation, DriverError<SPI, PIN>> {
        match self.family {
            Some(family) if self.config.capabilities.supports(family) => Ok(family),
            _ => Err(Error::WrongModem),
        }
    }

    /// Checks that a family's capability is enabled and reports whether its
    /// register bank is the one currently selected on the chip.
    fn bank_selected(&self, capability: Capabilities) -> Result<bool, DriverError<SPI, PIN>> {
        if !self.config.capabilities.contains(capability) {
            return Err(Error::WrongModem);
        }

        Ok(self
            .family
            .map_or(false, |family| family.capability() == capability))
    }

    /// Sleeps in `modulation`'s family, waits for the family switch, then stands by.
    fn enter_family(&mut self, modulation: Modulation) -> Result<(), DriverError<SPI, PIN>> {
        // The family bits only latch while the chip is asleep.
        self.sleep()?;
        self.set_mode_with_modulation(Mode::Sleep, modulation)?;
        self.delay.delay_ms(10);
        self.standby()?;

        debug!("modem family switched to {}", modulation);
        Ok(())
    }
}
