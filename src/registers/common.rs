//! Registers shared by the LoRa and FSK/OOK register banks
//!
//! This module contains the registers that keep their meaning regardless of the
//! selected modem family:
//! - Operating mode and family select
//! - Carrier frequency
//! - Power amplifier, over-current protection and LNA
//! - DIO mapping
//! - Silicon version

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

use crate::config::Modulation;

/// Transceiver operating mode, bits [2:0] of [`OpMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Sleep = 0,
    Standby = 1,
    /// Frequency synthesis, TX path
    FsTx = 2,
    Tx = 3,
    /// Frequency synthesis, RX path
    FsRx = 4,
    RxContinuous = 5,
    RxSingle = 6,
    /// Channel activity detection (LoRa only)
    Cad = 7,
}

impl Mode {
    /// Decodes the three mode bits of an operating mode byte
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::Sleep,
            1 => Self::Standby,
            2 => Self::FsTx,
            3 => Self::Tx,
            4 => Self::FsRx,
            5 => Self::RxContinuous,
            6 => Self::RxSingle,
            _ => Self::Cad,
        }
    }
}

/// Operating mode register (address: 0x01)
///
/// Combines the transceiver mode with the modem family select bits:
/// - bit 7 `LongRangeMode` selects the LoRa register bank
/// - bits 6-5 `ModulationType` select FSK (00) or OOK (01) while in FSK/OOK mode
/// - bit 3 `LowFrequencyModeOn` selects the low-frequency register set
///
/// # Important Notes
/// - The family bits can only be changed while the chip is in [`Mode::Sleep`]
/// - A write that changes the family clears most modem-specific registers
#[register(0x01u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct OpMode {
    pub modulation: Modulation,
    pub low_frequency_mode: bool,
    pub mode: Mode,
}

impl FromByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let modulation = if bytes[0] & 0x80 != 0 {
            Modulation::LoRa
        } else if bytes[0] & 0x60 == 0x20 {
            Modulation::Ook
        } else {
            Modulation::Fsk
        };

        Ok(Self {
            modulation,
            low_frequency_mode: bytes[0] & 0x08 != 0,
            mode: Mode::from_bits(bytes[0]),
        })
    }
}

impl ToByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let family = match self.modulation {
            Modulation::LoRa => 0x80,
            Modulation::Fsk => 0x00,
            Modulation::Ook => 0x20,
        };
        let lf = if self.low_frequency_mode { 0x08 } else { 0x00 };

        Ok([family | lf | self.mode as u8])
    }
}

byte_register!(
    /// Carrier frequency, bits [23:16] (address: 0x06)
    FrfMsb @ 0x06u8
);

byte_register!(
    /// Carrier frequency, bits [15:8] (address: 0x07)
    FrfMid @ 0x07u8
);

byte_register!(
    /// Carrier frequency, bits [7:0] (address: 0x08)
    ///
    /// The frequency change only takes effect once this byte is written.
    FrfLsb @ 0x08u8
);

/// Power amplifier output pin selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PaSelect {
    /// RFO pin, output power limited to +14 dBm
    Rfo,
    /// PA_BOOST pin, output power up to +20 dBm
    PaBoost,
}

/// Power amplifier configuration register (address: 0x09)
///
/// # Output Power
/// - RFO: Pout = Pmax - (15 - output_power), Pmax = 10.8 + 0.6 * max_power
/// - PA_BOOST: Pout = 17 - (15 - output_power)
#[register(0x09u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PaConfig {
    pub pa_select: PaSelect,
    /// Bits [6:4], only meaningful on the RFO path
    pub max_power: u8,
    /// Bits [3:0]
    pub output_power: u8,
}

impl FromByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            pa_select: if bytes[0] & 0x80 != 0 {
                PaSelect::PaBoost
            } else {
                PaSelect::Rfo
            },
            max_power: (bytes[0] >> 4) & 0x07,
            output_power: bytes[0] & 0x0F,
        })
    }
}

impl ToByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let select = match self.pa_select {
            PaSelect::Rfo => 0x00,
            PaSelect::PaBoost => 0x80,
        };

        Ok([select | (self.max_power & 0x07) << 4 | (self.output_power & 0x0F)])
    }
}

/// Over-current protection register (address: 0x0B)
///
/// # Current Limit Calculation
/// - trim <= 15: Imax = 45 + 5 * trim mA
/// - trim <= 27: Imax = -30 + 10 * trim mA
/// - otherwise 240 mA
#[register(0x0Bu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct Ocp {
    pub enabled: bool,
    /// Bits [4:0]
    pub trim: u8,
}

impl Default for Ocp {
    fn default() -> Self {
        Self {
            enabled: true,
            trim: 0x0B,
        }
    }
}

impl FromByteArray for Ocp {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: bytes[0] & 0x20 != 0,
            trim: bytes[0] & 0x1F,
        })
    }
}

impl ToByteArray for Ocp {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let enabled = if self.enabled { 0x20 } else { 0x00 };

        Ok([enabled | (self.trim & 0x1F)])
    }
}

/// LNA settings register (address: 0x0C)
#[register(0x0Cu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct Lna {
    /// Bits [7:5], 0b001 is maximum gain
    pub gain: u8,
    /// Bits [4:3], low-frequency band boost
    pub boost_lf: u8,
    /// Bits [1:0], 0b11 enables the 150% LNA current boost on the high-frequency band
    pub boost_hf: u8,
}

impl FromByteArray for Lna {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            gain: bytes[0] >> 5,
            boost_lf: (bytes[0] >> 3) & 0x03,
            boost_hf: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for Lna {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([(self.gain & 0x07) << 5 | (self.boost_lf & 0x03) << 3 | (self.boost_hf & 0x03)])
    }
}

/// DIO0..DIO3 mapping register (address: 0x40)
///
/// Each field is a two-bit selector whose meaning depends on the family and mode.
/// For DIO0:
///
/// | value | LoRa     | FSK/OOK packet mode          |
/// |-------|----------|------------------------------|
/// | 00    | RxDone   | PayloadReady (RX) / PacketSent (TX) |
/// | 01    | TxDone   | CrcOk                        |
/// | 10    | CadDone  | -                            |
#[register(0x40u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct DioMapping1 {
    pub dio0: u8,
    pub dio1: u8,
    pub dio2: u8,
    pub dio3: u8,
}

impl FromByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            dio0: bytes[0] >> 6,
            dio1: (bytes[0] >> 4) & 0x03,
            dio2: (bytes[0] >> 2) & 0x03,
            dio3: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([(self.dio0 & 0x03) << 6
            | (self.dio1 & 0x03) << 4
            | (self.dio2 & 0x03) << 2
            | (self.dio3 & 0x03)])
    }
}

/// Silicon version register (address: 0x42)
///
/// Reads [`SILICON_VERSION`](super::SILICON_VERSION) on production silicon.
#[register(0x42u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct Version {
    pub value: u8,
}

impl FromByteArray for Version {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { value: bytes[0] })
    }
}

/// High power DAC register (address: 0x4D)
#[register(0x4Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub enum PaDac {
    /// Default PA_BOOST range, up to +17 dBm
    Default,
    /// +20 dBm on PA_BOOST, requires OCP headroom and a low duty cycle
    HighPower,
}

impl Default for PaDac {
    fn default() -> Self {
        Self::Default
    }
}

impl FromByteArray for PaDac {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(if bytes[0] & 0x07 == 0x07 {
            Self::HighPower
        } else {
            Self::Default
        })
    }
}

impl ToByteArray for PaDac {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([match self {
            Self::Default => 0x84,
            Self::HighPower => 0x87,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_mode_keeps_family_bits() {
        let lora = OpMode {
            modulation: Modulation::LoRa,
            low_frequency_mode: false,
            mode: Mode::Standby,
        };
        assert_eq!(lora.to_bytes(), Ok([0x81]));

        let ook = OpMode {
            modulation: Modulation::Ook,
            low_frequency_mode: false,
            mode: Mode::RxContinuous,
        };
        assert_eq!(ook.to_bytes(), Ok([0x25]));
        assert_eq!(OpMode::from_bytes([0x25]), Ok(ook));
        assert_eq!(OpMode::from_bytes([0x09]).map(|m| m.modulation), Ok(Modulation::Fsk));
    }

    #[test]
    fn pa_config_layout() {
        let boost = PaConfig {
            pa_select: PaSelect::PaBoost,
            max_power: 0,
            output_power: 15,
        };
        assert_eq!(boost.to_bytes(), Ok([0x8F]));

        let rfo = PaConfig {
            pa_select: PaSelect::Rfo,
            max_power: 7,
            output_power: 0,
        };
        assert_eq!(rfo.to_bytes(), Ok([0x70]));
    }

    #[test]
    fn dio_mapping_places_dio0_in_top_bits() {
        let mapping = DioMapping1 {
            dio0: 0b01,
            ..Default::default()
        };
        assert_eq!(mapping.to_bytes(), Ok([0x40]));
    }
}
