//! Blocking transmit and receive
//!
//! Both operations start from standby, switch to TX or RX continuous mode, and
//! poll for completion until the deadline in [`RadioConfig`](crate::RadioConfig)
//! expires. LoRa completion is signalled on DIO0; FSK/OOK completion is read
//! from `IrqFlags2`. Whatever the outcome, the chip is left in standby.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use super::{DriverError, Sx1276};
use crate::clock::Clock;
use crate::error::{Error, PinError};
use crate::registers::fsk::{self, FskIrq1, FskIrq2, IrqFlags1, IrqFlags2, RssiValue};
use crate::registers::lora::{self, FifoAddrPtr, FifoRxCurrentAddr, IrqFlags, LoRaIrq, RxNbBytes};
use crate::registers::{DioMapping1, Mode, FIFO};
use crate::synth;

/// Largest payload the FIFO can hold
pub const MAX_PAYLOAD: usize = 255;

impl<SPI, RESET, DIO0, DELAY, CLOCK, PIN> Sx1276<SPI, RESET, DIO0, DELAY, CLOCK>
where
    SPI: SpiDevice,
    RESET: OutputPin<Error = PIN>,
    DIO0: InputPin<Error = PIN>,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    /// Transmits `payload` and blocks until the chip reports it sent.
    ///
    /// # Errors
    /// * `Error::PacketTooLong` - more than 255 bytes, rejected before any bus access
    /// * `Error::WrongModem` - no enabled family is active
    /// * `Error::TxTimeout` - not sent within the TX deadline; the chip is put
    ///   back in standby
    pub fn transmit(&mut self, payload: &[u8]) -> Result<(), DriverError<SPI, PIN>> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::PacketTooLong(payload.len()));
        }
        let lora = self.active_modulation()?.is_lora();
        let len = payload.len() as u8;

        self.standby()?;

        if lora {
            self.device.write_register(DioMapping1 {
                dio0: 0b01,
                ..Default::default()
            })?;
            self.clear_lora_irq()?;
            self.device.write_register(FifoAddrPtr { value: 0 })?;
            self.device.write_fifo(&[], payload)?;
            self.device
                .write_register(lora::PayloadLength { value: len })?;
        } else if self.config.fsk.fixed_length {
            self.device
                .write_register(fsk::PayloadLength { value: len })?;
            self.device.write_fifo(&[], payload)?;
        } else {
            self.device.write_fifo(&[len], payload)?;
        }

        self.set_mode(Mode::Tx)?;

        let timeout = self.config.tx_timeout_ms;
        let sent = self.poll(timeout, |radio| {
            if lora {
                radio.dio0_high()
            } else {
                radio.fsk_flags_set(FskIrq2::PACKET_SENT)
            }
        });
        let sent = self.standby_on_error(sent)?;

        if !sent {
            self.standby()?;
            warn!("no TX done after {} ms", timeout);
            return Err(Error::TxTimeout);
        }

        if lora {
            self.clear_lora_irq()?;
        }
        self.standby()?;

        debug!("sent {} bytes", payload.len());
        Ok(())
    }

    /// Receives one packet into `buffer`, blocking until it arrives.
    ///
    /// At most `buffer.len()` bytes (and never more than 255) are copied out;
    /// the rest of a longer packet is dropped. Returns the number of bytes
    /// copied.
    ///
    /// # Errors
    /// * `Error::WrongModem` - no enabled family is active
    /// * `Error::RxTimeout` - no packet within the RX deadline
    /// * `Error::CrcMismatch` - a packet arrived with a bad CRC; `buffer` is left
    ///   untouched
    pub fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, DriverError<SPI, PIN>> {
        let lora = self.active_modulation()?.is_lora();
        let max_len = buffer.len().min(MAX_PAYLOAD);

        self.standby()?;

        if lora {
            self.device.write_register(DioMapping1::default())?;
            self.clear_lora_irq()?;
            self.device.write_register(FifoAddrPtr { value: 0 })?;
        } else {
            self.device.write_register(IrqFlags1 {
                flags: FskIrq1::all(),
            })?;
            self.device.write_register(IrqFlags2 {
                flags: FskIrq2::all(),
            })?;
        }

        self.set_mode(Mode::RxContinuous)?;

        let timeout = self.config.rx_timeout_ms;
        let ready = self.poll(timeout, |radio| {
            if lora {
                radio.dio0_high()
            } else {
                radio.fsk_flags_set(FskIrq2::PAYLOAD_READY)
            }
        });
        let ready = self.standby_on_error(ready)?;

        if !ready {
            self.standby()?;
            warn!("no packet after {} ms", timeout);
            return Err(Error::RxTimeout);
        }

        let buffer = &mut buffer[..max_len];
        let len = if lora {
            self.read_lora_packet(buffer)
        } else {
            self.read_fsk_packet(buffer)
        };
        let len = self.standby_on_error(len)?;

        debug!("received {} bytes", len);
        Ok(len)
    }

    fn read_lora_packet(&mut self, buffer: &mut [u8]) -> Result<usize, DriverError<SPI, PIN>> {
        let irq = self.device.read_register::<IrqFlags>()?;
        if irq.flags.contains(LoRaIrq::PAYLOAD_CRC_ERROR) {
            self.clear_lora_irq()?;
            warn!("LoRa payload CRC error");
            return Err(Error::CrcMismatch);
        }

        let received = usize::from(self.device.read_register::<RxNbBytes>()?.value);
        let len = received.min(buffer.len());

        let start = self.device.read_register::<FifoRxCurrentAddr>()?.value;
        self.device.write_register(FifoAddrPtr { value: start })?;
        if len > 0 {
            self.device.read_fifo(&mut buffer[..len])?;
        }

        self.clear_lora_irq()?;
        self.standby()?;
        Ok(len)
    }

    fn read_fsk_packet(&mut self, buffer: &mut [u8]) -> Result<usize, DriverError<SPI, PIN>> {
        if self.config.fsk.crc && !self.fsk_flags_set(FskIrq2::CRC_OK)? {
            warn!("FSK payload CRC error");
            return Err(Error::CrcMismatch);
        }

        // RssiValue is only meaningful while the receiver is still running.
        let raw = self.device.read_register::<RssiValue>()?.value;
        self.fsk_rssi = synth::fsk_rssi_dbm(raw);

        let received = if self.config.fsk.fixed_length {
            self.device.read_register::<fsk::PayloadLength>()?.value
        } else {
            self.device.read_raw(FIFO)?
        };
        let len = usize::from(received).min(buffer.len());
        if len > 0 {
            self.device.read_fifo(&mut buffer[..len])?;
        }

        self.standby()?;
        Ok(len)
    }

    /// Passes `result` through, first trying to put the chip back in standby if
    /// it is an error. A failure of that standby write is dropped in favour of
    /// the original error.
    fn standby_on_error<T>(
        &mut self,
        result: Result<T, DriverError<SPI, PIN>>,
    ) -> Result<T, DriverError<SPI, PIN>> {
        if result.is_err() && self.standby().is_err() {
            warn!("standby after failed operation did not take");
        }
        result
    }

    /// Polls `done` until it reports true or `timeout_ms` has passed, yielding to
    /// the host between polls.
    fn poll<F>(&mut self, timeout_ms: u32, mut done: F) -> Result<bool, DriverError<SPI, PIN>>
    where
        F: FnMut(&mut Self) -> Result<bool, DriverError<SPI, PIN>>,
    {
        let start = self.clock.now_ms();

        loop {
            if done(self)? {
                return Ok(true);
            }
            if self.clock.now_ms().saturating_sub(start) > u64::from(timeout_ms) {
                return Ok(false);
            }
            self.clock.yield_now();
        }
    }

    fn dio0_high(&mut self) -> Result<bool, DriverError<SPI, PIN>> {
        Ok(self.pins.dio0.is_high().map_err(PinError::Input)?)
    }

    fn fsk_flags_set(&mut self, flags: FskIrq2) -> Result<bool, DriverError<SPI, PIN>> {
        Ok(self.device.read_register::<IrqFlags2>()?.flags.contains(flags))
    }

    fn clear_lora_irq(&mut self) -> Result<(), DriverError<SPI, PIN>> {
        Ok(self.device.write_register(IrqFlags {
            flags: LoRaIrq::all(),
        })?)
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::digital::ErrorKind;

    use crate::config::{Bandwidth, Modulation, RadioConfig};
    use crate::error::{Error, PinError};
    use crate::registers::Mode;
    use crate::test::fixtures::RxPacket;
    use crate::test::started;

    fn lora_915() -> RadioConfig {
        let mut config = RadioConfig {
            frequency: 915_000_000,
            ..Default::default()
        };
        config.lora.bandwidth = Bandwidth::Khz125;
        config.lora.spreading_factor = 7;
        config.lora.coding_rate = 5;
        config
    }

    fn fsk_434() -> RadioConfig {
        let mut config = RadioConfig {
            modulation: Modulation::Fsk,
            frequency: 434_000_000,
            ..Default::default()
        };
        config.fsk.bitrate = 4_800;
        config.fsk.frequency_deviation = 5_000;
        config.fsk.fixed_length = false;
        config
    }

    #[test]
    fn lora_transmit_bursts_payload_after_fifo_address() {
        let (mut radio, chip) = started(lora_915());

        radio.transmit(&[0x01, 0x02, 0x03]).unwrap();

        let chip = chip.borrow();
        let bursts: Vec<_> = chip
            .transactions
            .iter()
            .filter(|t| t[0] == 0x80)
            .collect();
        assert_eq!(bursts, vec![&vec![0x80, 0x01, 0x02, 0x03]]);
        assert_eq!(chip.tx_payload, vec![0x01, 0x02, 0x03]);
        assert_eq!(chip.reg(0x22), 3);
        assert_eq!(chip.writes_to(0x40), vec![0x40]);
        assert_eq!(chip.reg(0x12), 0x00);
        assert_eq!(chip.reg(0x01), 0x81);
        assert_eq!(radio.mode(), Mode::Standby);
    }

    #[test]
    fn oversize_packet_never_reaches_the_bus() {
        let (mut radio, chip) = started(lora_915());

        assert_eq!(radio.transmit(&[0u8; 256]), Err(Error::PacketTooLong(256)));
        assert!(chip.borrow().transactions.is_empty());
    }

    #[test]
    fn max_size_packet_is_accepted() {
        let (mut radio, chip) = started(lora_915());

        radio.transmit(&[0xA5; 255]).unwrap();
        assert_eq!(chip.borrow().tx_payload.len(), 255);
    }

    #[test]
    fn transmit_timeout_returns_to_standby() {
        let (mut radio, chip) = started(lora_915());
        chip.borrow_mut().complete_tx = false;

        assert_eq!(radio.transmit(&[1]), Err(Error::TxTimeout));
        assert_eq!(chip.borrow().reg(0x01), 0x81);
        assert!(chip.borrow().now_ms() >= 5_000);
    }

    #[test]
    fn fsk_variable_length_transmit_prefixes_length() {
        let (mut radio, chip) = started(fsk_434());

        radio.transmit(&[0xAA, 0xBB]).unwrap();
        let chip = chip.borrow();
        assert!(chip.transactions.contains(&vec![0x80, 0x02, 0xAA, 0xBB]));
        assert!(chip.writes_to(0x32).is_empty());
        assert_eq!(chip.reg(0x01), 0x01);
    }

    #[test]
    fn fsk_fixed_length_transmit_sets_payload_length() {
        let mut config = fsk_434();
        config.fsk.fixed_length = true;
        let (mut radio, chip) = started(config);

        radio.transmit(&[0xAA, 0xBB]).unwrap();
        let chip = chip.borrow();
        assert!(chip.transactions.contains(&vec![0x80, 0xAA, 0xBB]));
        assert_eq!(chip.writes_to(0x32), vec![2]);
    }

    #[test]
    fn lora_receive_reads_from_current_packet_address() {
        let (mut radio, chip) = started(lora_915());
        chip.borrow_mut().rx_packet = Some(RxPacket {
            fifo: vec![9, 8, 7, 6],
            fifo_start: 0x40,
            ..Default::default()
        });

        let mut buffer = [0u8; 16];
        assert_eq!(radio.receive(&mut buffer), Ok(4));
        assert_eq!(&buffer[..4], &[9, 8, 7, 6]);
        assert_eq!(chip.borrow().writes_to(0x0D), vec![0x00, 0x40]);
        assert_eq!(chip.borrow().reg(0x01), 0x81);
        assert_eq!(chip.borrow().reg(0x12), 0x00);
    }

    #[test]
    fn lora_receive_clamps_to_buffer() {
        let (mut radio, chip) = started(lora_915());
        chip.borrow_mut().rx_packet = Some(RxPacket {
            fifo: vec![1, 2, 3, 4, 5, 6],
            ..Default::default()
        });

        let mut buffer = [0u8; 4];
        assert_eq!(radio.receive(&mut buffer), Ok(4));
        assert_eq!(buffer, [1, 2, 3, 4]);
    }

    #[test]
    fn lora_crc_error_returns_no_bytes() {
        let (mut radio, chip) = started(lora_915());
        chip.borrow_mut().rx_packet = Some(RxPacket {
            fifo: vec![1, 2, 3],
            crc_error: true,
            ..Default::default()
        });

        let mut buffer = [0u8; 8];
        assert_eq!(radio.receive(&mut buffer), Err(Error::CrcMismatch));
        assert_eq!(buffer, [0u8; 8]);
        assert_eq!(chip.borrow().reg(0x01), 0x81);
        assert_eq!(chip.borrow().reg(0x12), 0x00);
        assert_eq!(radio.mode(), Mode::Standby);
    }

    #[test]
    fn fsk_variable_length_receive() {
        let (mut radio, chip) = started(fsk_434());
        chip.borrow_mut().rx_packet = Some(RxPacket {
            fifo: vec![0x05, 0x10, 0x20, 0x30, 0x40, 0x50],
            rssi: 180,
            ..Default::default()
        });

        let mut buffer = [0u8; 32];
        assert_eq!(radio.receive(&mut buffer), Ok(5));
        assert_eq!(&buffer[..5], &[0x10, 0x20, 0x30, 0x40, 0x50]);
        assert_eq!(chip.borrow().reg(0x01), 0x01);
        assert_eq!(radio.rssi(), Ok(-90));
    }

    #[test]
    fn fsk_fixed_length_receive_uses_length_register() {
        let mut config = fsk_434();
        config.fsk.fixed_length = true;
        let (mut radio, chip) = started(config);
        {
            let mut chip = chip.borrow_mut();
            chip.set_reg(0x32, 3);
            chip.rx_packet = Some(RxPacket {
                fifo: vec![7, 8, 9],
                ..Default::default()
            });
        }

        let mut buffer = [0u8; 8];
        assert_eq!(radio.receive(&mut buffer), Ok(3));
        assert_eq!(&buffer[..3], &[7, 8, 9]);
    }

    #[test]
    fn fsk_missing_crc_ok_is_mismatch() {
        let (mut radio, chip) = started(fsk_434());
        chip.borrow_mut().rx_packet = Some(RxPacket {
            fifo: vec![0x01, 0xFF],
            crc_error: true,
            ..Default::default()
        });

        let mut buffer = [0u8; 4];
        assert_eq!(radio.receive(&mut buffer), Err(Error::CrcMismatch));
        assert_eq!(buffer, [0u8; 4]);
        assert_eq!(chip.borrow().reg(0x01), 0x01);
    }

    #[test]
    fn fsk_crc_off_ignores_crc_flag() {
        let mut config = fsk_434();
        config.fsk.crc = false;
        let (mut radio, chip) = started(config);
        chip.borrow_mut().rx_packet = Some(RxPacket {
            fifo: vec![0x01, 0xFF],
            crc_error: true,
            ..Default::default()
        });

        let mut buffer = [0u8; 4];
        assert_eq!(radio.receive(&mut buffer), Ok(1));
        assert_eq!(buffer[0], 0xFF);
    }

    #[test]
    fn receive_timeout_forces_standby() {
        let (mut radio, chip) = started(lora_915());

        let mut buffer = [0u8; 8];
        assert_eq!(radio.receive(&mut buffer), Err(Error::RxTimeout));
        assert_eq!(chip.borrow().reg(0x01), 0x81);
        assert_eq!(radio.mode(), Mode::Standby);
        assert!(chip.borrow().now_ms() >= 10_000);
        assert!(chip.borrow().yields > 0);
    }

    #[test]
    fn receive_deadline_follows_config() {
        let mut config = lora_915();
        config.rx_timeout_ms = 50;
        let (mut radio, chip) = started(config);

        let mut buffer = [0u8; 8];
        assert_eq!(radio.receive(&mut buffer), Err(Error::RxTimeout));
        assert!(chip.borrow().now_ms() < 1_000);
    }

    #[test]
    fn fsk_transmit_timeout_returns_to_standby() {
        let (mut radio, chip) = started(fsk_434());
        chip.borrow_mut().complete_tx = false;

        assert_eq!(radio.transmit(&[1, 2]), Err(Error::TxTimeout));
        assert_eq!(chip.borrow().reg(0x01), 0x01);
        assert_eq!(radio.mode(), Mode::Standby);
        assert!(chip.borrow().now_ms() >= 5_000);
    }

    #[test]
    fn fsk_receive_timeout_keeps_family_bits() {
        let (mut radio, chip) = started(fsk_434());

        let mut buffer = [0u8; 8];
        assert_eq!(radio.receive(&mut buffer), Err(Error::RxTimeout));
        assert_eq!(chip.borrow().reg(0x01), 0x01);
        assert_eq!(radio.modulation(), Some(Modulation::Fsk));
    }

    #[test]
    fn ook_receive_timeout_keeps_family_bits() {
        let mut config = fsk_434();
        config.modulation = Modulation::Ook;
        config.fsk.frequency_deviation = 0;
        let (mut radio, chip) = started(config);

        let mut buffer = [0u8; 8];
        assert_eq!(radio.receive(&mut buffer), Err(Error::RxTimeout));
        assert_eq!(chip.borrow().reg(0x01), 0x21);
        assert_eq!(radio.modulation(), Some(Modulation::Ook));
    }

    #[test]
    fn dio0_failure_during_receive_leaves_rx() {
        let (mut radio, chip) = started(lora_915());
        chip.borrow_mut().dio0_fails = true;

        let mut buffer = [0u8; 8];
        assert_eq!(
            radio.receive(&mut buffer),
            Err(Error::Pin(PinError::Input(ErrorKind::Other)))
        );
        assert_eq!(chip.borrow().reg(0x01), 0x81);
        assert_eq!(radio.mode(), Mode::Standby);
    }

    #[test]
    fn dio0_failure_during_transmit_leaves_tx() {
        let (mut radio, chip) = started(lora_915());
        {
            let mut chip = chip.borrow_mut();
            chip.complete_tx = false;
            chip.dio0_fails = true;
        }

        assert_eq!(
            radio.transmit(&[1, 2, 3]),
            Err(Error::Pin(PinError::Input(ErrorKind::Other)))
        );
        assert_eq!(chip.borrow().reg(0x01), 0x81);
        assert_eq!(radio.mode(), Mode::Standby);
    }

    #[test]
    fn transceiver_needs_a_configured_family() {
        let (mut radio, chip) = crate::test::radio(RadioConfig::default());

        assert_eq!(radio.transmit(&[1]), Err(Error::WrongModem));
        assert_eq!(radio.receive(&mut [0u8; 4]), Err(Error::WrongModem));
        assert!(chip.borrow().transactions.is_empty());
    }
}
