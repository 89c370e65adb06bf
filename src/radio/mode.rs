//! Operating mode control
//!
//! The operating mode register carries both the transceiver mode and the modem
//! family bits. The driver keeps the family it last wrote and composes every mode
//! write from it, so an ordinary mode change can never flip the chip between
//! LoRa, FSK and OOK.
//!
//! Every mode write is followed by a fixed 2 ms settle delay instead of polling
//! the `ModeReady` flag.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use super::{DriverError, Sx1276};
use crate::clock::Clock;
use crate::config::Modulation;
use crate::registers::{Mode, OpMode};

const MODE_SETTLE_MS: u32 = 2;

impl<SPI, RESET, DIO0, DELAY, CLOCK, PIN> Sx1276<SPI, RESET, DIO0, DELAY, CLOCK>
where
    SPI: SpiDevice,
    RESET: OutputPin<Error = PIN>,
    DIO0: InputPin<Error = PIN>,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    /// Changes the operating mode, keeping the current modem family.
    ///
    /// Before the first family has been written (straight after power-up or
    /// [`reset`](Self::reset)) the family is recovered from the live register.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), DriverError<SPI, PIN>> {
        let family = match self.family {
            Some(family) => family,
            None => self.device.read_register::<OpMode>()?.modulation,
        };

        self.set_mode_with_modulation(mode, family)
    }

    /// Changes the operating mode and the modem family in one write.
    ///
    /// The chip only accepts a family change while asleep; use
    /// [`set_modulation`](Self::set_modulation) to switch family with the full
    /// reconfiguration that entails.
    pub fn set_mode_with_modulation(
        &mut self,
        mode: Mode,
        modulation: Modulation,
    ) -> Result<(), DriverError<SPI, PIN>> {
        self.device.write_register(OpMode {
            modulation,
            low_frequency_mode: false,
            mode,
        })?;

        self.mode = mode;
        self.family = Some(modulation);
        trace!("op mode {} ({})", mode as u8, modulation);

        self.delay.delay_ms(MODE_SETTLE_MS);
        Ok(())
    }

    /// Puts the chip in standby, keeping the current modem family.
    pub fn standby(&mut self) -> Result<(), DriverError<SPI, PIN>> {
        self.set_mode(Mode::Standby)
    }

    /// Puts the chip to sleep, re-asserting the modem family so the register bank
    /// selected afterwards is the expected one.
    pub fn sleep(&mut self) -> Result<(), DriverError<SPI, PIN>> {
        let family = self.family.unwrap_or(self.config.modulation);
        self.set_mode_with_modulation(Mode::Sleep, family)
    }

    /// Compares the family bits in the live operating mode register with the
    /// tracked family.
    ///
    /// A disagreement (usually caused by a raw write through
    /// [`write_register`](Self::write_register)) is logged and reported as
    /// `Ok(false)`; it is not treated as a failure and the tracked family is left
    /// as is. Returns `Ok(true)` when nothing has been tracked yet.
    pub fn verify_modulation(&mut self) -> Result<bool, DriverError<SPI, PIN>> {
        let live = self.device.read_register::<OpMode>()?;

        match self.family {
            Some(family) if family != live.modulation => {
                warn!(
                    "op mode register reports {}, driver expects {}",
                    live.modulation,
                    family
                );
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}
