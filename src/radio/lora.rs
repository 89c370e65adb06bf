//! LoRa modem configuration and packet telemetry

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use super::{DriverError, Sx1276};
use crate::clock::Clock;
use crate::config::{
    check_coding_rate, check_spreading_factor, Bandwidth, Capabilities, Modulation,
};
use crate::error::{ConfigError, Error};
use crate::registers::lora::{
    DetectionOptimize, DetectionThreshold, FifoRxBaseAddr, FifoTxBaseAddr, FreqErrorLsb,
    FreqErrorMid, FreqErrorMsb, ModemConfig1, ModemConfig2, ModemConfig3, PktRssiValue,
    PktSnrValue, PreambleLsb, PreambleMsb, SyncWord,
};
use crate::registers::{DioMapping1, Lna};
use crate::synth;

/// Over-current limit used while the LoRa modem is active
const LORA_OCP_MA: u8 = 240;

impl<SPI, RESET, DIO0, DELAY, CLOCK, PIN> Sx1276<SPI, RESET, DIO0, DELAY, CLOCK>
where
    SPI: SpiDevice,
    RESET: OutputPin<Error = PIN>,
    DIO0: InputPin<Error = PIN>,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    /// Full LoRa bring-up from the stored configuration.
    pub(super) fn configure_lora(&mut self) -> Result<(), DriverError<SPI, PIN>> {
        self.enter_family(Modulation::LoRa)?;

        self.set_frequency(self.config.frequency)?;

        // Whole 256 byte FIFO for each direction, one packet at a time.
        self.device.write_register(FifoTxBaseAddr { value: 0 })?;
        self.device.write_register(FifoRxBaseAddr { value: 0 })?;

        self.device
            .modify_register(|lna: Lna| Lna { boost_hf: 0b11, ..lna })?;
        self.device.write_register(ModemConfig3 {
            low_data_rate_optimize: false,
            agc_auto_on: true,
        })?;

        self.set_power(self.config.power, self.config.pa_boost)?;
        self.set_ocp(LORA_OCP_MA)?;

        let params = self.config.lora;
        self.set_bandwidth(params.bandwidth)?;
        self.set_spreading_factor(params.spreading_factor)?;
        self.set_coding_rate(params.coding_rate)?;
        self.write_lora_preamble(params.preamble_length)?;
        self.set_sync_word(params.sync_word)?;
        self.write_lora_crc(params.crc)?;

        self.device.write_register(DioMapping1::default())?;

        info!(
            "LoRa configured: {} Hz, SF{}, BW {} Hz",
            self.config.frequency,
            params.spreading_factor,
            params.bandwidth.hz()
        );
        Ok(())
    }

    /// Sets the LoRa signal bandwidth.
    pub fn set_bandwidth(&mut self, bandwidth: Bandwidth) -> Result<(), DriverError<SPI, PIN>> {
        if self.bank_selected(Capabilities::LORA)? {
            self.device.modify_register(|cfg: ModemConfig1| ModemConfig1 {
                bandwidth: bandwidth.bits(),
                ..cfg
            })?;
            self.update_low_data_rate_optimize(self.config.lora.spreading_factor, bandwidth)?;
        }

        self.config.lora.bandwidth = bandwidth;
        Ok(())
    }

    /// Sets the LoRa signal bandwidth from a value in Hz.
    ///
    /// # Errors
    /// * `Error::InvalidBandwidth` - not one of the ten bandwidths the modem supports
    pub fn set_bandwidth_hz(&mut self, bandwidth: u32) -> Result<(), DriverError<SPI, PIN>> {
        let bandwidth = Bandwidth::from_hz(bandwidth).ok_or(ConfigError::InvalidBandwidth)?;
        self.set_bandwidth(bandwidth)
    }

    /// Sets the spreading factor, 6 to 12.
    ///
    /// Also programs the detection optimize/threshold pair; SF6 needs its own
    /// demodulator profile. SF6 only works with implicit header mode.
    pub fn set_spreading_factor(&mut self, spreading_factor: u8) -> Result<(), DriverError<SPI, PIN>> {
        check_spreading_factor(spreading_factor)?;

        if self.bank_selected(Capabilities::LORA)? {
            self.device.modify_register(|cfg: ModemConfig2| ModemConfig2 {
                spreading_factor,
                ..cfg
            })?;

            let (optimize, threshold) = if spreading_factor == 6 {
                (0xC5, 0x0C)
            } else {
                (0xC3, 0x0A)
            };
            self.device
                .write_register(DetectionOptimize { value: optimize })?;
            self.device
                .write_register(DetectionThreshold { value: threshold })?;

            self.update_low_data_rate_optimize(spreading_factor, self.config.lora.bandwidth)?;
        }

        self.config.lora.spreading_factor = spreading_factor;
        Ok(())
    }

    /// Sets the coding rate as the denominator of 4/x, 5 to 8.
    pub fn set_coding_rate(&mut self, denominator: u8) -> Result<(), DriverError<SPI, PIN>> {
        check_coding_rate(denominator)?;

        if self.bank_selected(Capabilities::LORA)? {
            self.device.modify_register(|cfg: ModemConfig1| ModemConfig1 {
                coding_rate: denominator - 4,
                ..cfg
            })?;
        }

        self.config.lora.coding_rate = denominator;
        Ok(())
    }

    /// Sets the LoRa sync word. 0x34 is reserved for LoRaWAN.
    pub fn set_sync_word(&mut self, sync_word: u8) -> Result<(), DriverError<SPI, PIN>> {
        if self.bank_selected(Capabilities::LORA)? {
            self.device.write_register(SyncWord { value: sync_word })?;
        }

        self.config.lora.sync_word = sync_word;
        Ok(())
    }

    pub(super) fn write_lora_preamble(&mut self, symbols: u16) -> Result<(), DriverError<SPI, PIN>> {
        if self.bank_selected(Capabilities::LORA)? {
            let [msb, lsb] = symbols.to_be_bytes();
            self.device.write_register(PreambleMsb { value: msb })?;
            self.device.write_register(PreambleLsb { value: lsb })?;
        }

        self.config.lora.preamble_length = symbols;
        Ok(())
    }

    pub(super) fn write_lora_crc(&mut self, enabled: bool) -> Result<(), DriverError<SPI, PIN>> {
        if self.bank_selected(Capabilities::LORA)? {
            self.device.modify_register(|cfg: ModemConfig2| ModemConfig2 {
                crc_on: enabled,
                ..cfg
            })?;
        }

        self.config.lora.crc = enabled;
        Ok(())
    }

    fn update_low_data_rate_optimize(
        &mut self,
        spreading_factor: u8,
        bandwidth: Bandwidth,
    ) -> Result<(), DriverError<SPI, PIN>> {
        let enabled = synth::needs_low_data_rate_optimize(spreading_factor, bandwidth);

        Ok(self.device.modify_register(|cfg: ModemConfig3| ModemConfig3 {
            low_data_rate_optimize: enabled,
            ..cfg
        })?)
    }

    /// SNR of the last received packet in 0.25 dB steps
    ///
    /// # Errors
    /// * `Error::WrongModem` - LoRa is not the active family
    pub fn snr(&mut self) -> Result<i8, DriverError<SPI, PIN>> {
        self.require_lora()?;

        Ok(self.device.read_register::<PktSnrValue>()?.value as i8)
    }

    /// Carrier offset of the last received packet in Hz
    ///
    /// # Errors
    /// * `Error::WrongModem` - LoRa is not the active family
    pub fn frequency_error(&mut self) -> Result<i32, DriverError<SPI, PIN>> {
        self.require_lora()?;

        let msb = self.device.read_register::<FreqErrorMsb>()?.value;
        let mid = self.device.read_register::<FreqErrorMid>()?.value;
        let lsb = self.device.read_register::<FreqErrorLsb>()?.value;

        Ok(synth::frequency_error_hz(
            synth::freq_error_raw(msb, mid, lsb),
            self.config.lora.bandwidth,
        ))
    }

    /// RSSI of the last received packet in dBm.
    ///
    /// In LoRa this is read from the packet RSSI register; in FSK/OOK it is the
    /// value sampled while the last packet was still being received.
    pub fn rssi(&mut self) -> Result<i16, DriverError<SPI, PIN>> {
        if self.active_modulation()?.is_lora() {
            let raw = self.device.read_register::<PktRssiValue>()?.value;
            Ok(synth::lora_rssi_dbm(raw, self.config.frequency))
        } else {
            Ok(self.fsk_rssi)
        }
    }

    fn require_lora(&self) -> Result<(), DriverError<SPI, PIN>> {
        if self.active_modulation()?.is_lora() {
            Ok(())
        } else {
            Err(Error::WrongModem)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Bandwidth, Modulation, RadioConfig};
    use crate::error::Error;
    use crate::test::started;

    #[test]
    fn default_bring_up_registers() {
        let (_radio, chip) = started(RadioConfig::default());
        let chip = chip.borrow();

        assert_eq!(chip.reg(0x1D), 0x72);
        assert_eq!(chip.reg(0x1E) & 0xF4, 0x74);
        assert_eq!(chip.reg(0x26), 0x04);
        assert_eq!(chip.reg(0x20), 0x00);
        assert_eq!(chip.reg(0x21), 0x08);
        assert_eq!(chip.reg(0x39), 0x12);
        assert_eq!(chip.reg(0x0B), 0x3B);
        assert_eq!(chip.reg(0x0C) & 0x03, 0x03);
        assert_eq!(chip.reg(0x40), 0x00);
    }

    #[test]
    fn spreading_factor_6_uses_alternate_detection_pair() {
        let (mut radio, chip) = started(RadioConfig::default());

        radio.set_spreading_factor(6).unwrap();
        assert_eq!(chip.borrow().reg(0x31), 0xC5);
        assert_eq!(chip.borrow().reg(0x37), 0x0C);

        for sf in 7..=12 {
            radio.set_spreading_factor(sf).unwrap();
            assert_eq!(chip.borrow().reg(0x31), 0xC3);
            assert_eq!(chip.borrow().reg(0x37), 0x0A);
            assert_eq!(chip.borrow().reg(0x1E) >> 4, sf);
        }
    }

    #[test]
    fn spreading_factor_keeps_crc_and_timeout_bits() {
        let (mut radio, chip) = started(RadioConfig::default());
        chip.borrow_mut().set_reg(0x1E, 0x77);

        radio.set_spreading_factor(9).unwrap();
        assert_eq!(chip.borrow().reg(0x1E), 0x97);
    }

    #[test]
    fn invalid_lora_parameters_touch_nothing() {
        let (mut radio, chip) = started(RadioConfig::default());

        assert_eq!(radio.set_spreading_factor(5), Err(Error::InvalidSpreadingFactor));
        assert_eq!(radio.set_spreading_factor(13), Err(Error::InvalidSpreadingFactor));
        assert_eq!(radio.set_coding_rate(4), Err(Error::InvalidCodingRate));
        assert_eq!(radio.set_coding_rate(9), Err(Error::InvalidCodingRate));
        assert_eq!(radio.set_bandwidth_hz(100_000), Err(Error::InvalidBandwidth));
        assert!(chip.borrow().transactions.is_empty());
        assert_eq!(radio.config().lora.spreading_factor, 7);
    }

    #[test]
    fn bandwidth_and_coding_rate_share_a_register() {
        let (mut radio, chip) = started(RadioConfig::default());

        radio.set_coding_rate(8).unwrap();
        assert_eq!(chip.borrow().reg(0x1D), 0x78);
        radio.set_bandwidth_hz(500_000).unwrap();
        assert_eq!(chip.borrow().reg(0x1D), 0x98);
        radio.set_bandwidth(Bandwidth::Khz7_8).unwrap();
        assert_eq!(chip.borrow().reg(0x1D), 0x08);
    }

    #[test]
    fn slow_settings_enable_low_data_rate_optimize() {
        let (mut radio, chip) = started(RadioConfig::default());

        radio.set_spreading_factor(12).unwrap();
        assert_eq!(chip.borrow().reg(0x26), 0x0C);
        radio.set_bandwidth(Bandwidth::Khz500).unwrap();
        assert_eq!(chip.borrow().reg(0x26), 0x04);
    }

    #[test]
    fn crc_toggles_one_bit() {
        let (mut radio, chip) = started(RadioConfig::default());
        let before = chip.borrow().reg(0x1E);

        radio.set_crc(false).unwrap();
        assert_eq!(chip.borrow().reg(0x1E), before & !0x04);
        radio.set_crc(true).unwrap();
        assert_eq!(chip.borrow().reg(0x1E), before);
    }

    #[test]
    fn lora_setters_are_deferred_while_fsk_is_active() {
        let config = RadioConfig {
            modulation: Modulation::Fsk,
            ..Default::default()
        };
        let (mut radio, chip) = started(config);

        radio.set_spreading_factor(10).unwrap();
        radio.set_sync_word(0x34).unwrap();
        assert!(chip.borrow().transactions.is_empty());

        radio.set_modulation(Modulation::LoRa).unwrap();
        assert_eq!(chip.borrow().reg(0x1E) >> 4, 10);
        assert_eq!(chip.borrow().reg(0x39), 0x34);
    }

    #[test]
    fn packet_telemetry() {
        let (mut radio, chip) = started(RadioConfig::default());
        {
            let mut chip = chip.borrow_mut();
            chip.set_reg(0x1A, 100);
            chip.set_reg(0x19, 0xF6);
            chip.set_reg(0x28, 0x0F);
            chip.set_reg(0x29, 0xFC);
            chip.set_reg(0x2A, 0x18);
        }

        assert_eq!(radio.rssi(), Ok(-64));
        assert_eq!(radio.snr(), Ok(-10));
        assert_eq!(radio.frequency_error(), Ok(-131));

        radio.set_frequency(915_000_000).unwrap();
        assert_eq!(radio.rssi(), Ok(-57));
    }

    #[test]
    fn lora_only_telemetry_needs_lora() {
        let config = RadioConfig {
            modulation: Modulation::Fsk,
            ..Default::default()
        };
        let (mut radio, _chip) = started(config);

        assert_eq!(radio.snr(), Err(Error::WrongModem));
        assert_eq!(radio.frequency_error(), Err(Error::WrongModem));
        assert_eq!(radio.rssi(), Ok(0));
    }
}
