//! FSK/OOK register bank
//!
//! Only valid while [`OpMode`](super::OpMode) has the FSK or OOK family selected.

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

byte_register!(
    /// Bit rate setting, MSB (address: 0x02)
    BitrateMsb @ 0x02u8
);

byte_register!(
    /// Bit rate setting, LSB (address: 0x03)
    BitrateLsb @ 0x03u8
);

byte_register!(
    /// Frequency deviation, bits [13:8] (address: 0x04)
    FdevMsb @ 0x04u8
);

byte_register!(
    /// Frequency deviation, bits [7:0] (address: 0x05)
    FdevLsb @ 0x05u8
);

/// Receiver configuration register (address: 0x0D)
#[register(0x0Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct RxConfig {
    pub restart_rx_on_collision: bool,
    pub restart_rx_without_pll_lock: bool,
    pub restart_rx_with_pll_lock: bool,
    pub afc_auto_on: bool,
    pub agc_auto_on: bool,
    /// Bits [2:0], event that triggers AGC and AFC
    /// - 0b000 none
    /// - 0b001 RSSI interrupt
    /// - 0b110 preamble detect
    /// - 0b111 RSSI interrupt and preamble detect
    pub rx_trigger: u8,
}

impl FromByteArray for RxConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            restart_rx_on_collision: bytes[0] & 0x80 != 0,
            restart_rx_without_pll_lock: bytes[0] & 0x40 != 0,
            restart_rx_with_pll_lock: bytes[0] & 0x20 != 0,
            afc_auto_on: bytes[0] & 0x10 != 0,
            agc_auto_on: bytes[0] & 0x08 != 0,
            rx_trigger: bytes[0] & 0x07,
        })
    }
}

impl ToByteArray for RxConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let flags = [
            (self.restart_rx_on_collision, 0x80),
            (self.restart_rx_without_pll_lock, 0x40),
            (self.restart_rx_with_pll_lock, 0x20),
            (self.afc_auto_on, 0x10),
            (self.agc_auto_on, 0x08),
        ];

        Ok([flags
            .iter()
            .filter(|(set, _)| *set)
            .fold(self.rx_trigger & 0x07, |acc, (_, bit)| acc | bit)])
    }
}

byte_register!(
    /// RSSI trigger level for the RSSI interrupt, -value/2 dBm (address: 0x10)
    RssiThresh @ 0x10u8
);

byte_register!(
    /// Absolute RSSI, -value/2 dBm (address: 0x11)
    ///
    /// Only valid while the receiver is running.
    RssiValue @ 0x11u8
);

byte_register!(
    /// Channel filter bandwidth, mantissa and exponent code (address: 0x12)
    RxBw @ 0x12u8
);

byte_register!(
    /// Channel filter bandwidth used during AFC (address: 0x13)
    AfcBw @ 0x13u8
);

/// Preamble detector register (address: 0x1F)
#[register(0x1Fu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PreambleDetect {
    pub detector_on: bool,
    /// Bits [6:5], number of preamble bytes to detect minus one
    pub size: u8,
    /// Bits [4:0], number of chip errors tolerated, in quarters of a bit
    pub tolerance: u8,
}

impl Default for PreambleDetect {
    fn default() -> Self {
        Self {
            detector_on: true,
            size: 0x01,
            tolerance: 0x0A,
        }
    }
}

impl FromByteArray for PreambleDetect {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            detector_on: bytes[0] & 0x80 != 0,
            size: (bytes[0] >> 5) & 0x03,
            tolerance: bytes[0] & 0x1F,
        })
    }
}

impl ToByteArray for PreambleDetect {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let on = if self.detector_on { 0x80 } else { 0x00 };

        Ok([on | (self.size & 0x03) << 5 | (self.tolerance & 0x1F)])
    }
}

byte_register!(
    /// RX timeout relative to RX start, 0 disables (address: 0x20)
    RxTimeout1 @ 0x20u8
);

byte_register!(
    /// RX timeout relative to RSSI detection, 0 disables (address: 0x21)
    RxTimeout2 @ 0x21u8
);

byte_register!(
    /// RX timeout relative to preamble detection, 0 disables (address: 0x22)
    RxTimeout3 @ 0x22u8
);

byte_register!(
    /// Preamble length in bytes, MSB (address: 0x25)
    PreambleMsb @ 0x25u8
);

byte_register!(
    /// Preamble length in bytes, LSB (address: 0x26)
    PreambleLsb @ 0x26u8
);

/// Sync word recognition control register (address: 0x27)
#[register(0x27u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct SyncConfig {
    /// Bits [7:6], 0b10 restarts the receiver with PLL lock wait after PayloadReady
    pub auto_restart_rx_mode: u8,
    /// Preamble polarity, false = 0xAA, true = 0x55
    pub preamble_polarity: bool,
    pub sync_on: bool,
    /// Bits [2:0], sync word length minus one
    pub sync_size: u8,
}

impl FromByteArray for SyncConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            auto_restart_rx_mode: bytes[0] >> 6,
            preamble_polarity: bytes[0] & 0x20 != 0,
            sync_on: bytes[0] & 0x10 != 0,
            sync_size: bytes[0] & 0x07,
        })
    }
}

impl ToByteArray for SyncConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let polarity = if self.preamble_polarity { 0x20 } else { 0x00 };
        let sync_on = if self.sync_on { 0x10 } else { 0x00 };

        Ok([(self.auto_restart_rx_mode & 0x03) << 6 | polarity | sync_on | (self.sync_size & 0x07)])
    }
}

/// Address of the first of the eight consecutive sync value registers
/// (`RegSyncValue1` .. `RegSyncValue8`, 0x28 to 0x2F)
pub const SYNC_VALUE_1: u8 = 0x28;

/// Packet mode settings register 1 (address: 0x30)
#[register(0x30u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct PacketConfig1 {
    /// false = variable length (first FIFO byte carries the length)
    pub fixed_length: bool,
    /// Bits [6:5], 0 none, 1 Manchester, 2 whitening
    pub dc_free: u8,
    pub crc_on: bool,
    pub crc_auto_clear_off: bool,
    /// Bits [2:1], 0 disables address filtering
    pub address_filtering: u8,
    /// false = CCITT CRC with standard whitening, true = IBM CRC with alternate whitening
    pub crc_whitening_type: bool,
}

impl FromByteArray for PacketConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            fixed_length: bytes[0] & 0x80 == 0,
            dc_free: (bytes[0] >> 5) & 0x03,
            crc_on: bytes[0] & 0x10 != 0,
            crc_auto_clear_off: bytes[0] & 0x08 != 0,
            address_filtering: (bytes[0] >> 1) & 0x03,
            crc_whitening_type: bytes[0] & 0x01 != 0,
        })
    }
}

impl ToByteArray for PacketConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let variable = if self.fixed_length { 0x00 } else { 0x80 };
        let crc_on = if self.crc_on { 0x10 } else { 0x00 };
        let auto_clear_off = if self.crc_auto_clear_off { 0x08 } else { 0x00 };

        Ok([variable
            | (self.dc_free & 0x03) << 5
            | crc_on
            | auto_clear_off
            | (self.address_filtering & 0x03) << 1
            | u8::from(self.crc_whitening_type)])
    }
}

/// Packet mode settings register 2 (address: 0x31)
#[register(0x31u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PacketConfig2 {
    /// false = continuous mode, true = packet mode
    pub packet_mode: bool,
    pub io_home_on: bool,
    pub beacon_on: bool,
    /// Bits [2:0], payload length bits [10:8]
    pub payload_length_msb: u8,
}

impl Default for PacketConfig2 {
    fn default() -> Self {
        Self {
            packet_mode: true,
            io_home_on: false,
            beacon_on: false,
            payload_length_msb: 0,
        }
    }
}

impl FromByteArray for PacketConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            packet_mode: bytes[0] & 0x40 != 0,
            io_home_on: bytes[0] & 0x20 != 0,
            beacon_on: bytes[0] & 0x08 != 0,
            payload_length_msb: bytes[0] & 0x07,
        })
    }
}

impl ToByteArray for PacketConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let packet_mode = if self.packet_mode { 0x40 } else { 0x00 };
        let io_home = if self.io_home_on { 0x20 } else { 0x00 };
        let beacon = if self.beacon_on { 0x08 } else { 0x00 };

        Ok([packet_mode | io_home | beacon | (self.payload_length_msb & 0x07)])
    }
}

byte_register!(
    /// Payload length bits [7:0] (address: 0x32)
    ///
    /// Exact length in fixed length mode, maximum accepted length in variable
    /// length mode.
    PayloadLength @ 0x32u8
);

/// FIFO threshold register (address: 0x35)
#[register(0x35u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct FifoThresh {
    /// Start transmission as soon as the FIFO is not empty instead of on FifoLevel
    pub tx_start_on_fifo_not_empty: bool,
    /// Bits [5:0], FifoLevel interrupt threshold
    pub threshold: u8,
}

impl FromByteArray for FifoThresh {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            tx_start_on_fifo_not_empty: bytes[0] & 0x80 != 0,
            threshold: bytes[0] & 0x3F,
        })
    }
}

impl ToByteArray for FifoThresh {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let start = if self.tx_start_on_fifo_not_empty { 0x80 } else { 0x00 };

        Ok([start | (self.threshold & 0x3F)])
    }
}

/// Top level sequencer settings register 1 (address: 0x36)
///
/// Only the start/stop strobes are modelled; the transition fields stay at zero.
#[register(0x36u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct SeqConfig1 {
    pub sequencer_start: bool,
    pub sequencer_stop: bool,
}

impl FromByteArray for SeqConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            sequencer_start: bytes[0] & 0x80 != 0,
            sequencer_stop: bytes[0] & 0x40 != 0,
        })
    }
}

impl ToByteArray for SeqConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let start = if self.sequencer_start { 0x80 } else { 0x00 };
        let stop = if self.sequencer_stop { 0x40 } else { 0x00 };

        Ok([start | stop])
    }
}

bitflags! {
    /// FSK/OOK status flags, first register
    ///
    /// `RSSI`, `PREAMBLE_DETECT` and `SYNC_ADDRESS_MATCH` are cleared by writing a
    /// one; the others reflect live state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FskIrq1: u8 {
        const MODE_READY = 1 << 7;
        const RX_READY = 1 << 6;
        const TX_READY = 1 << 5;
        const PLL_LOCK = 1 << 4;
        const RSSI = 1 << 3;
        const TIMEOUT = 1 << 2;
        const PREAMBLE_DETECT = 1 << 1;
        const SYNC_ADDRESS_MATCH = 1;
    }
}

bitflags! {
    /// FSK/OOK status flags, second register
    ///
    /// `FIFO_OVERRUN` and `LOW_BAT` are cleared by writing a one; `PACKET_SENT`,
    /// `PAYLOAD_READY` and `CRC_OK` clear when the packet leaves the FIFO or the
    /// mode changes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FskIrq2: u8 {
        const FIFO_FULL = 1 << 7;
        const FIFO_EMPTY = 1 << 6;
        const FIFO_LEVEL = 1 << 5;
        const FIFO_OVERRUN = 1 << 4;
        const PACKET_SENT = 1 << 3;
        const PAYLOAD_READY = 1 << 2;
        const CRC_OK = 1 << 1;
        const LOW_BAT = 1;
    }
}

/// Status register 1 (address: 0x3E)
#[register(0x3Eu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct IrqFlags1 {
    pub flags: FskIrq1,
}

impl FromByteArray for IrqFlags1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: FskIrq1::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqFlags1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

/// Status register 2 (address: 0x3F)
#[register(0x3Fu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct IrqFlags2 {
    pub flags: FskIrq2,
}

impl FromByteArray for IrqFlags2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: FskIrq2::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for IrqFlags2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}
