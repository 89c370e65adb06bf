//! Carrier frequency and power amplifier

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use super::{DriverError, Sx1276};
use crate::clock::Clock;
use crate::config::check_frequency;
use crate::registers::{FrfLsb, FrfMid, FrfMsb, Ocp};
use crate::synth;

impl<SPI, RESET, DIO0, DELAY, CLOCK, PIN> Sx1276<SPI, RESET, DIO0, DELAY, CLOCK>
where
    SPI: SpiDevice,
    RESET: OutputPin<Error = PIN>,
    DIO0: InputPin<Error = PIN>,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    /// Sets the carrier frequency in Hz.
    ///
    /// The value is truncated to the synthesizer's 61 Hz step.
    ///
    /// # Errors
    /// * `Error::InvalidFrequency` - outside 137 MHz to 1020 MHz, nothing written
    pub fn set_frequency(&mut self, frequency: u32) -> Result<(), DriverError<SPI, PIN>> {
        check_frequency(frequency)?;

        let [_, msb, mid, lsb] = synth::frf_from_hz(frequency).to_be_bytes();
        self.device.write_register(FrfMsb { value: msb })?;
        self.device.write_register(FrfMid { value: mid })?;
        self.device.write_register(FrfLsb { value: lsb })?;

        self.config.frequency = frequency;
        Ok(())
    }

    /// Carrier frequency in Hz as programmed in the chip
    pub fn frequency(&mut self) -> Result<u32, DriverError<SPI, PIN>> {
        let msb = self.device.read_register::<FrfMsb>()?.value;
        let mid = self.device.read_register::<FrfMid>()?.value;
        let lsb = self.device.read_register::<FrfLsb>()?.value;

        Ok(synth::hz_from_frf(u32::from_be_bytes([0, msb, mid, lsb])))
    }

    /// Sets the output power in dBm on the PA_BOOST (`pa_boost`) or RFO pin.
    ///
    /// Power is clamped to 2..=20 dBm on PA_BOOST and -1..=14 dBm on RFO, never
    /// rejected. Above 17 dBm the high power DAC is switched on.
    pub fn set_power(&mut self, power: i8, pa_boost: bool) -> Result<(), DriverError<SPI, PIN>> {
        let (pa_config, pa_dac) = synth::pa_settings(power, pa_boost);

        self.device.write_register(pa_config)?;
        self.device.write_register(pa_dac)?;

        self.config.power = power;
        self.config.pa_boost = pa_boost;
        Ok(())
    }

    /// Sets the over-current protection limit in mA (45 to 240).
    pub fn set_ocp(&mut self, milliamps: u8) -> Result<(), DriverError<SPI, PIN>> {
        Ok(self.device.write_register(Ocp {
            enabled: true,
            trim: synth::ocp_trim(milliamps),
        })?)
    }
}
