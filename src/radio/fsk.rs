//! FSK/OOK modem configuration

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use super::{DriverError, Sx1276};
use crate::clock::Clock;
use crate::config::{check_bitrate, check_frequency_deviation, Capabilities, Modulation, RxBandwidth, SyncWord};
use crate::error::ConfigError;
use crate::registers::fsk::{
    AfcBw, BitrateLsb, BitrateMsb, FdevLsb, FdevMsb, FifoThresh, FskIrq2, IrqFlags2,
    PacketConfig1, PacketConfig2, PayloadLength, PreambleDetect, PreambleLsb, PreambleMsb,
    RssiThresh, RxBw, RxConfig, RxTimeout1, RxTimeout2, RxTimeout3, SeqConfig1, SyncConfig,
    SYNC_VALUE_1,
};
use crate::registers::DioMapping1;
use crate::synth;

/// Over-current limit used while the FSK/OOK modem is active
const FSK_OCP_MA: u8 = 120;

/// Largest packet accepted in variable length mode
const MAX_VARIABLE_LENGTH: u8 = 255;

impl<SPI, RESET, DIO0, DELAY, CLOCK, PIN> Sx1276<SPI, RESET, DIO0, DELAY, CLOCK>
where
    SPI: SpiDevice,
    RESET: OutputPin<Error = PIN>,
    DIO0: InputPin<Error = PIN>,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    /// Full FSK or OOK bring-up from the stored configuration.
    pub(super) fn configure_fsk(&mut self) -> Result<(), DriverError<SPI, PIN>> {
        let modulation = self.config.modulation;
        self.enter_family(modulation)?;

        let params = self.config.fsk;
        self.set_frequency(self.config.frequency)?;
        self.set_bitrate(params.bitrate)?;
        if modulation == Modulation::Fsk {
            self.set_frequency_deviation(params.frequency_deviation)?;
        }
        self.set_rx_bandwidth(params.rx_bandwidth)?;

        self.set_power(self.config.power, self.config.pa_boost)?;
        self.set_ocp(FSK_OCP_MA)?;

        // Accept any signal level, AGC triggered by the RSSI interrupt.
        self.device.write_register(RssiThresh { value: 0xFF })?;
        self.device.write_register(RxConfig {
            agc_auto_on: true,
            rx_trigger: 0b001,
            ..Default::default()
        })?;
        self.device.write_register(IrqFlags2 {
            flags: FskIrq2::FIFO_OVERRUN,
        })?;

        // The chip's own RX timeouts would abort receptions long before the
        // polling deadline in `receive` expires.
        self.device.write_register(RxTimeout1 { value: 0 })?;
        self.device.write_register(RxTimeout2 { value: 0 })?;
        self.device.write_register(RxTimeout3 { value: 0 })?;

        self.device.write_register(PreambleDetect::default())?;
        self.write_fsk_preamble(params.preamble_length)?;
        self.write_fsk_sync_word(params.sync_word)?;
        self.set_packet_config(params.fixed_length, params.crc)?;
        self.device.write_register(PayloadLength {
            value: MAX_VARIABLE_LENGTH,
        })?;
        self.device.write_register(FifoThresh {
            tx_start_on_fifo_not_empty: true,
            threshold: 0x20,
        })?;
        self.device.write_register(SeqConfig1 {
            sequencer_start: false,
            sequencer_stop: true,
        })?;
        // DIO0: PacketSent in TX, PayloadReady in RX
        self.device.write_register(DioMapping1::default())?;

        info!(
            "{} configured: {} Hz, {} bps",
            modulation,
            self.config.frequency,
            params.bitrate
        );
        Ok(())
    }

    /// Sets the bit rate, 1200 to 300000 bps.
    pub fn set_bitrate(&mut self, bitrate: u32) -> Result<(), DriverError<SPI, PIN>> {
        check_bitrate(bitrate)?;

        if self.bank_selected(Capabilities::FSK_OOK)? {
            let [msb, lsb] = synth::bitrate_register(bitrate).to_be_bytes();
            self.device.write_register(BitrateMsb { value: msb })?;
            self.device.write_register(BitrateLsb { value: lsb })?;
        }

        self.config.fsk.bitrate = bitrate;
        Ok(())
    }

    /// Sets the FSK frequency deviation, 600 to 200000 Hz, or 0 in OOK.
    pub fn set_frequency_deviation(&mut self, deviation: u32) -> Result<(), DriverError<SPI, PIN>> {
        check_frequency_deviation(deviation, self.config.modulation)?;

        if self.bank_selected(Capabilities::FSK_OOK)? {
            let [msb, lsb] = synth::fdev_register(deviation).to_be_bytes();
            self.device.write_register(FdevMsb { value: msb })?;
            self.device.write_register(FdevLsb { value: lsb })?;
        }

        self.config.fsk.frequency_deviation = deviation;
        Ok(())
    }

    /// Sets the receiver channel filter, mirrored into the AFC filter.
    pub fn set_rx_bandwidth(&mut self, bandwidth: RxBandwidth) -> Result<(), DriverError<SPI, PIN>> {
        if self.bank_selected(Capabilities::FSK_OOK)? {
            self.device.write_register(RxBw {
                value: bandwidth.bits(),
            })?;
            self.device.write_register(AfcBw {
                value: bandwidth.bits(),
            })?;
        }

        self.config.fsk.rx_bandwidth = bandwidth;
        Ok(())
    }

    /// Sets the FSK/OOK sync word.
    ///
    /// # Errors
    /// * `Error::InvalidSyncWord` - `sync_word` is empty or longer than 8 bytes
    pub fn set_fsk_sync_word(&mut self, sync_word: &[u8]) -> Result<(), DriverError<SPI, PIN>> {
        let sync_word = SyncWord::new(sync_word).ok_or(ConfigError::InvalidSyncWord)?;
        self.write_fsk_sync_word(sync_word)
    }

    /// Selects fixed or variable length packets and enables the CRC.
    ///
    /// Address filtering and DC-free encoding stay disabled.
    pub fn set_packet_config(&mut self, fixed_length: bool, crc: bool) -> Result<(), DriverError<SPI, PIN>> {
        if self.bank_selected(Capabilities::FSK_OOK)? {
            self.device.write_register(PacketConfig1 {
                fixed_length,
                crc_on: crc,
                ..Default::default()
            })?;
            self.device.write_register(PacketConfig2::default())?;
        }

        self.config.fsk.fixed_length = fixed_length;
        self.config.fsk.crc = crc;
        Ok(())
    }

    fn write_fsk_sync_word(&mut self, sync_word: SyncWord) -> Result<(), DriverError<SPI, PIN>> {
        if self.bank_selected(Capabilities::FSK_OOK)? {
            let bytes = sync_word.as_slice();
            self.device.write_register(SyncConfig {
                auto_restart_rx_mode: 0b10,
                preamble_polarity: false,
                sync_on: true,
                sync_size: (bytes.len() - 1) as u8,
            })?;

            for (address, byte) in (SYNC_VALUE_1..).zip(bytes) {
                self.device.write_raw(address, *byte)?;
            }
        }

        self.config.fsk.sync_word = sync_word;
        Ok(())
    }

    pub(super) fn write_fsk_preamble(&mut self, bytes: u16) -> Result<(), DriverError<SPI, PIN>> {
        if self.bank_selected(Capabilities::FSK_OOK)? {
            let [msb, lsb] = bytes.to_be_bytes();
            self.device.write_register(PreambleMsb { value: msb })?;
            self.device.write_register(PreambleLsb { value: lsb })?;
        }

        self.config.fsk.preamble_length = bytes;
        Ok(())
    }
}
