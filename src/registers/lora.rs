//! LoRa register bank
//!
//! Only valid while [`OpMode`](super::OpMode) has the LoRa family selected. This
//! module contains:
//! - FIFO pointers and packet length bookkeeping
//! - IRQ flags
//! - Modem configuration (bandwidth, coding rate, spreading factor, CRC)
//! - Packet telemetry (RSSI, SNR, frequency error)
//! - Detection tuning and the sync word

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

byte_register!(
    /// SPI interface address pointer into the FIFO data buffer (address: 0x0D)
    FifoAddrPtr @ 0x0Du8
);

byte_register!(
    /// Write base address in FIFO data buffer for the TX modulator (address: 0x0E)
    FifoTxBaseAddr @ 0x0Eu8
);

byte_register!(
    /// Read base address in FIFO data buffer for the RX demodulator (address: 0x0F)
    FifoRxBaseAddr @ 0x0Fu8
);

byte_register!(
    /// Start address of the last packet received (address: 0x10)
    FifoRxCurrentAddr @ 0x10u8
);

bitflags! {
    /// LoRa interrupt sources
    ///
    /// All flags are sticky and cleared by writing a one to the flag's bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoRaIrq: u8 {
        const RX_TIMEOUT = 1 << 7;
        const RX_DONE = 1 << 6;
        const PAYLOAD_CRC_ERROR = 1 << 5;
        const VALID_HEADER = 1 << 4;
        const TX_DONE = 1 << 3;
        const CAD_DONE = 1 << 2;
        const FHSS_CHANGE_CHANNEL = 1 << 1;
        const CAD_DETECTED = 1;
    }
}

/// IRQ flags register (address: 0x12)
///
/// Writing a flag set clears exactly those flags; writing [`LoRaIrq::all`] clears
/// every pending interrupt.
#[register(0x12u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct IrqFlags {
    pub flags: LoRaIrq,
}

impl FromByteArray for IrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: LoRaIrq::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

byte_register!(
    /// Number of payload bytes of the latest packet received (address: 0x13)
    RxNbBytes @ 0x13u8
);

byte_register!(
    /// SNR estimate of the last packet, two's complement in 0.25 dB steps (address: 0x19)
    PktSnrValue @ 0x19u8
);

byte_register!(
    /// RSSI of the last packet before the band offset is applied (address: 0x1A)
    PktRssiValue @ 0x1Au8
);

/// Modem configuration register 1 (address: 0x1D)
#[register(0x1Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig1 {
    /// Bits [7:4], signal bandwidth code 0 (7.8 kHz) to 9 (500 kHz)
    pub bandwidth: u8,
    /// Bits [3:1], coding rate 4/(4 + value)
    pub coding_rate: u8,
    pub implicit_header: bool,
}

impl Default for ModemConfig1 {
    fn default() -> Self {
        Self {
            bandwidth: 0x07,
            coding_rate: 0x01,
            implicit_header: false,
        }
    }
}

impl FromByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            bandwidth: bytes[0] >> 4,
            coding_rate: (bytes[0] >> 1) & 0x07,
            implicit_header: bytes[0] & 0x01 != 0,
        })
    }
}

impl ToByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([(self.bandwidth & 0x0F) << 4
            | (self.coding_rate & 0x07) << 1
            | u8::from(self.implicit_header)])
    }
}

/// Modem configuration register 2 (address: 0x1E)
#[register(0x1Eu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig2 {
    /// Bits [7:4], spreading factor 6 to 12
    pub spreading_factor: u8,
    pub tx_continuous: bool,
    pub crc_on: bool,
    /// Bits [1:0], RX timeout MSB
    pub symb_timeout_msb: u8,
}

impl Default for ModemConfig2 {
    fn default() -> Self {
        Self {
            spreading_factor: 7,
            tx_continuous: false,
            crc_on: false,
            symb_timeout_msb: 0,
        }
    }
}

impl FromByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            spreading_factor: bytes[0] >> 4,
            tx_continuous: bytes[0] & 0x08 != 0,
            crc_on: bytes[0] & 0x04 != 0,
            symb_timeout_msb: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let tx_continuous = if self.tx_continuous { 0x08 } else { 0x00 };
        let crc_on = if self.crc_on { 0x04 } else { 0x00 };

        Ok([(self.spreading_factor & 0x0F) << 4
            | tx_continuous
            | crc_on
            | (self.symb_timeout_msb & 0x03)])
    }
}

byte_register!(
    /// Preamble length in symbols, MSB (address: 0x20)
    PreambleMsb @ 0x20u8
);

byte_register!(
    /// Preamble length in symbols, LSB (address: 0x21)
    PreambleLsb @ 0x21u8
);

byte_register!(
    /// Payload length in bytes (address: 0x22)
    ///
    /// Sets the number of bytes to transmit, and the expected length in implicit
    /// header mode.
    PayloadLength @ 0x22u8
);

/// Modem configuration register 3 (address: 0x26)
///
/// # Important Notes
/// - The datasheet mandates `low_data_rate_optimize` whenever the symbol length
///   exceeds 16 ms
#[register(0x26u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct ModemConfig3 {
    pub low_data_rate_optimize: bool,
    /// LNA gain set by the internal AGC loop instead of [`Lna::gain`](super::Lna)
    pub agc_auto_on: bool,
}

impl FromByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            low_data_rate_optimize: bytes[0] & 0x08 != 0,
            agc_auto_on: bytes[0] & 0x04 != 0,
        })
    }
}

impl ToByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let ldro = if self.low_data_rate_optimize { 0x08 } else { 0x00 };
        let agc = if self.agc_auto_on { 0x04 } else { 0x00 };

        Ok([ldro | agc])
    }
}

byte_register!(
    /// Estimated frequency error, bits [19:16] in the low nibble (address: 0x28)
    FreqErrorMsb @ 0x28u8
);

byte_register!(
    /// Estimated frequency error, bits [15:8] (address: 0x29)
    FreqErrorMid @ 0x29u8
);

byte_register!(
    /// Estimated frequency error, bits [7:0] (address: 0x2A)
    FreqErrorLsb @ 0x2Au8
);

byte_register!(
    /// LoRa detection optimize (address: 0x31)
    ///
    /// Bits [2:0] must be 0x05 for SF6 and 0x03 for SF7 to SF12. The upper bits are
    /// reserved and keep their reset value of 0xC0.
    DetectionOptimize @ 0x31u8
);

byte_register!(
    /// LoRa detection threshold (address: 0x37)
    ///
    /// 0x0C for SF6, 0x0A for SF7 to SF12.
    DetectionThreshold @ 0x37u8
);

byte_register!(
    /// LoRa sync word (address: 0x39)
    ///
    /// 0x34 is reserved for LoRaWAN networks.
    SyncWord @ 0x39u8
);
