//! Radio configuration
//!
//! [`RadioConfig`] is the single owned description of how the chip should be set
//! up. It is validated as a whole before it reaches the bus, so an invalid field
//! never leaves the radio half-configured.
//!
//! The per-family parameter blocks ([`LoRaParams`], [`FskParams`]) are always kept,
//! even while the other family is active. Switching family re-applies the whole
//! block of the new family.

use core::fmt;

use bitflags::bitflags;

use crate::error::ConfigError;

/// Lowest carrier frequency the synthesizer accepts, in Hz
pub const FREQUENCY_MIN_HZ: u32 = 137_000_000;
/// Highest carrier frequency the synthesizer accepts, in Hz
pub const FREQUENCY_MAX_HZ: u32 = 1_020_000_000;

/// Modem family selected in the operating mode register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Modulation {
    /// Chirp spread spectrum
    LoRa,
    /// Frequency shift keying
    Fsk,
    /// On-off keying, shares the FSK register bank
    Ook,
}

impl Modulation {
    /// The capability an operation on this family requires
    pub fn capability(self) -> Capabilities {
        match self {
            Self::LoRa => Capabilities::LORA,
            Self::Fsk | Self::Ook => Capabilities::FSK_OOK,
        }
    }

    /// Whether this family uses the LoRa register bank
    pub fn is_lora(self) -> bool {
        self == Self::LoRa
    }
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LoRa => "LoRa",
            Self::Fsk => "FSK",
            Self::Ook => "OOK",
        })
    }
}

bitflags! {
    /// Modem families the driver is allowed to drive
    ///
    /// Operations on a family outside this set fail with
    /// [`Error::WrongModem`](crate::Error::WrongModem).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const LORA = 1;
        const FSK_OOK = 1 << 1;
    }
}

impl Capabilities {
    /// Whether operations on `modulation` are allowed
    pub fn supports(self, modulation: Modulation) -> bool {
        self.contains(modulation.capability())
    }
}

/// LoRa signal bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bandwidth {
    Khz7_8 = 0,
    Khz10_4 = 1,
    Khz15_6 = 2,
    Khz20_8 = 3,
    Khz31_25 = 4,
    Khz41_7 = 5,
    Khz62_5 = 6,
    Khz125 = 7,
    Khz250 = 8,
    Khz500 = 9,
}

impl Bandwidth {
    const ALL: [Bandwidth; 10] = [
        Self::Khz7_8,
        Self::Khz10_4,
        Self::Khz15_6,
        Self::Khz20_8,
        Self::Khz31_25,
        Self::Khz41_7,
        Self::Khz62_5,
        Self::Khz125,
        Self::Khz250,
        Self::Khz500,
    ];

    /// Bandwidth in Hz
    pub fn hz(self) -> u32 {
        match self {
            Self::Khz7_8 => 7_800,
            Self::Khz10_4 => 10_400,
            Self::Khz15_6 => 15_600,
            Self::Khz20_8 => 20_800,
            Self::Khz31_25 => 31_250,
            Self::Khz41_7 => 41_700,
            Self::Khz62_5 => 62_500,
            Self::Khz125 => 125_000,
            Self::Khz250 => 250_000,
            Self::Khz500 => 500_000,
        }
    }

    /// Looks up the bandwidth with exactly this value in Hz
    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|bw| bw.hz() == hz)
    }

    /// Decodes the `ModemConfig1` bandwidth nibble
    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.get(usize::from(bits)).copied()
    }

    /// Encodes the `ModemConfig1` bandwidth nibble
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// FSK/OOK channel filter bandwidth, encoded as the chip's mantissa/exponent code
///
/// The single sideband bandwidths listed assume FSK; in OOK the effective
/// bandwidth is halved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxBandwidth {
    Khz2_6 = 0x17,
    Khz3_1 = 0x0F,
    Khz3_9 = 0x07,
    Khz5_2 = 0x16,
    Khz6_3 = 0x0E,
    Khz7_8 = 0x06,
    Khz10_4 = 0x15,
    Khz12_5 = 0x0D,
    Khz15_6 = 0x05,
    Khz20_8 = 0x14,
    Khz25 = 0x0C,
    Khz31_3 = 0x04,
    Khz41_7 = 0x13,
    Khz50 = 0x0B,
    Khz62_5 = 0x03,
    Khz83_3 = 0x12,
    Khz100 = 0x0A,
    Khz125 = 0x02,
    Khz166_7 = 0x11,
    Khz200 = 0x09,
    Khz250 = 0x01,
}

impl RxBandwidth {
    const ALL: [RxBandwidth; 21] = [
        Self::Khz2_6,
        Self::Khz3_1,
        Self::Khz3_9,
        Self::Khz5_2,
        Self::Khz6_3,
        Self::Khz7_8,
        Self::Khz10_4,
        Self::Khz12_5,
        Self::Khz15_6,
        Self::Khz20_8,
        Self::Khz25,
        Self::Khz31_3,
        Self::Khz41_7,
        Self::Khz50,
        Self::Khz62_5,
        Self::Khz83_3,
        Self::Khz100,
        Self::Khz125,
        Self::Khz166_7,
        Self::Khz200,
        Self::Khz250,
    ];

    /// Single sideband filter bandwidth in Hz
    pub fn hz(self) -> u32 {
        match self {
            Self::Khz2_6 => 2_600,
            Self::Khz3_1 => 3_100,
            Self::Khz3_9 => 3_900,
            Self::Khz5_2 => 5_200,
            Self::Khz6_3 => 6_300,
            Self::Khz7_8 => 7_800,
            Self::Khz10_4 => 10_400,
            Self::Khz12_5 => 12_500,
            Self::Khz15_6 => 15_600,
            Self::Khz20_8 => 20_800,
            Self::Khz25 => 25_000,
            Self::Khz31_3 => 31_300,
            Self::Khz41_7 => 41_700,
            Self::Khz50 => 50_000,
            Self::Khz62_5 => 62_500,
            Self::Khz83_3 => 83_300,
            Self::Khz100 => 100_000,
            Self::Khz125 => 125_000,
            Self::Khz166_7 => 166_700,
            Self::Khz200 => 200_000,
            Self::Khz250 => 250_000,
        }
    }

    /// Picks the filter closest to `hz`; on a tie the narrower one wins.
    pub fn from_hz(hz: u32) -> Self {
        let mut best = Self::Khz2_6;
        for bw in Self::ALL {
            if bw.hz().abs_diff(hz) < best.hz().abs_diff(hz) {
                best = bw;
            }
        }
        best
    }

    /// Mantissa/exponent code for `RxBw` and `AfcBw`
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// A FSK/OOK sync word of one to eight bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWord {
    bytes: [u8; 8],
    len: u8,
}

impl SyncWord {
    /// Copies `word`, returning `None` unless it is one to eight bytes long
    pub fn new(word: &[u8]) -> Option<Self> {
        if word.is_empty() || word.len() > 8 {
            return None;
        }

        let mut bytes = [0u8; 8];
        bytes[..word.len()].copy_from_slice(word);
        Some(Self {
            bytes,
            len: word.len() as u8,
        })
    }

    /// The sync word bytes, first transmitted first
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }
}

impl Default for SyncWord {
    fn default() -> Self {
        Self {
            bytes: [0x12, 0xAD, 0, 0, 0, 0, 0, 0],
            len: 2,
        }
    }
}

/// LoRa modem parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoRaParams {
    pub bandwidth: Bandwidth,
    /// 6 to 12
    pub spreading_factor: u8,
    /// Coding rate denominator, 5 (4/5) to 8 (4/8)
    pub coding_rate: u8,
    /// Preamble length in symbols
    pub preamble_length: u16,
    pub sync_word: u8,
    pub crc: bool,
}

impl Default for LoRaParams {
    fn default() -> Self {
        Self {
            bandwidth: Bandwidth::Khz125,
            spreading_factor: 7,
            coding_rate: 5,
            preamble_length: 8,
            sync_word: 0x12,
            crc: true,
        }
    }
}

/// FSK/OOK modem parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FskParams {
    /// Bits per second, 1200 to 300000
    pub bitrate: u32,
    /// Hz, 600 to 200000, or 0 for OOK
    pub frequency_deviation: u32,
    pub rx_bandwidth: RxBandwidth,
    pub sync_word: SyncWord,
    /// Fixed length packets use the payload length register instead of a
    /// length byte in front of the payload
    pub fixed_length: bool,
    pub crc: bool,
    /// Preamble length in bytes
    pub preamble_length: u16,
}

impl Default for FskParams {
    fn default() -> Self {
        Self {
            bitrate: 4_800,
            frequency_deviation: 5_000,
            rx_bandwidth: RxBandwidth::Khz10_4,
            sync_word: SyncWord::default(),
            fixed_length: false,
            crc: true,
            preamble_length: 5,
        }
    }
}

/// Complete driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub modulation: Modulation,
    pub capabilities: Capabilities,
    /// Carrier frequency in Hz
    pub frequency: u32,
    /// Requested output power in dBm, clamped to the selected PA path
    pub power: i8,
    /// Use the PA_BOOST pin instead of RFO
    pub pa_boost: bool,
    pub lora: LoRaParams,
    pub fsk: FskParams,
    /// Ceiling on the wait for TX completion
    pub tx_timeout_ms: u32,
    /// Ceiling on the wait for a received packet
    pub rx_timeout_ms: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            modulation: Modulation::LoRa,
            capabilities: Capabilities::all(),
            frequency: 434_000_000,
            power: 17,
            pa_boost: true,
            lora: LoRaParams::default(),
            fsk: FskParams::default(),
            tx_timeout_ms: 5_000,
            rx_timeout_ms: 10_000,
        }
    }
}

impl RadioConfig {
    /// Checks every field against the hardware-legal ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.capabilities.supports(self.modulation) {
            return Err(ConfigError::WrongModem);
        }
        check_frequency(self.frequency)?;
        check_spreading_factor(self.lora.spreading_factor)?;
        check_coding_rate(self.lora.coding_rate)?;
        check_bitrate(self.fsk.bitrate)?;
        check_frequency_deviation(self.fsk.frequency_deviation, self.modulation)?;

        Ok(())
    }
}

pub(crate) fn check_frequency(frequency: u32) -> Result<(), ConfigError> {
    if (FREQUENCY_MIN_HZ..=FREQUENCY_MAX_HZ).contains(&frequency) {
        Ok(())
    } else {
        Err(ConfigError::InvalidFrequency)
    }
}

pub(crate) fn check_spreading_factor(sf: u8) -> Result<(), ConfigError> {
    if (6..=12).contains(&sf) {
        Ok(())
    } else {
        Err(ConfigError::InvalidSpreadingFactor)
    }
}

pub(crate) fn check_coding_rate(denominator: u8) -> Result<(), ConfigError> {
    if (5..=8).contains(&denominator) {
        Ok(())
    } else {
        Err(ConfigError::InvalidCodingRate)
    }
}

pub(crate) fn check_bitrate(bitrate: u32) -> Result<(), ConfigError> {
    if (1_200..=300_000).contains(&bitrate) {
        Ok(())
    } else {
        Err(ConfigError::InvalidBitrate)
    }
}

/// A zero deviation is only meaningful for OOK, which does not shift frequency.
pub(crate) fn check_frequency_deviation(
    deviation: u32,
    modulation: Modulation,
) -> Result<(), ConfigError> {
    match deviation {
        0 if modulation == Modulation::Ook => Ok(()),
        600..=200_000 => Ok(()),
        _ => Err(ConfigError::InvalidFrequencyDeviation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(RadioConfig::default().validate(), Ok(()));
    }

    #[test]
    fn bandwidth_lookup() {
        assert_eq!(Bandwidth::from_hz(125_000), Some(Bandwidth::Khz125));
        assert_eq!(Bandwidth::from_hz(125_001), None);
        assert_eq!(Bandwidth::from_bits(9), Some(Bandwidth::Khz500));
        assert_eq!(Bandwidth::from_bits(10), None);
    }

    #[test]
    fn rx_bandwidth_snaps_to_nearest_filter() {
        assert_eq!(RxBandwidth::from_hz(10_400), RxBandwidth::Khz10_4);
        assert_eq!(RxBandwidth::from_hz(11_000), RxBandwidth::Khz10_4);
        assert_eq!(RxBandwidth::from_hz(12_000), RxBandwidth::Khz12_5);
        assert_eq!(RxBandwidth::from_hz(0), RxBandwidth::Khz2_6);
        assert_eq!(RxBandwidth::from_hz(1_000_000), RxBandwidth::Khz250);
        assert_eq!(RxBandwidth::from_hz(150_000).bits(), 0x11);
    }

    #[test]
    fn sync_word_length_limits() {
        assert!(SyncWord::new(&[]).is_none());
        assert!(SyncWord::new(&[0; 9]).is_none());
        assert_eq!(
            SyncWord::new(&[1, 2, 3]).map(|w| w.as_slice().len()),
            Some(3)
        );
    }

    #[test]
    fn deviation_zero_only_for_ook() {
        assert_eq!(
            check_frequency_deviation(0, Modulation::Fsk),
            Err(ConfigError::InvalidFrequencyDeviation)
        );
        assert_eq!(check_frequency_deviation(0, Modulation::Ook), Ok(()));
        assert_eq!(
            check_frequency_deviation(599, Modulation::Ook),
            Err(ConfigError::InvalidFrequencyDeviation)
        );
        assert_eq!(check_frequency_deviation(200_000, Modulation::Fsk), Ok(()));
    }

    #[test]
    fn capability_gate() {
        let config = RadioConfig {
            modulation: Modulation::Fsk,
            capabilities: Capabilities::LORA,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::WrongModem));
    }

    #[test]
    fn frequency_range_is_inclusive() {
        assert_eq!(check_frequency(FREQUENCY_MIN_HZ), Ok(()));
        assert_eq!(check_frequency(FREQUENCY_MAX_HZ), Ok(()));
        assert_eq!(
            check_frequency(FREQUENCY_MAX_HZ + 1),
            Err(ConfigError::InvalidFrequency)
        );
    }
}
