//! Error types for the SX1276 driver.

use core::fmt;

/// An error related to SPI communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiError<E> {
    /// A register or FIFO write transaction failed.
    Write(E),
    /// A register or FIFO read transaction failed.
    Read(E),
}

/// An error related to GPIO pin operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError<E> {
    /// Driving the reset line failed.
    Output(E),
    /// Sampling the DIO0 line failed.
    Input(E),
}

/// A parameter rejected before it reaches the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    InvalidBandwidth,
    InvalidSpreadingFactor,
    InvalidCodingRate,
    InvalidFrequency,
    InvalidBitrate,
    InvalidFrequencyDeviation,
    InvalidSyncWord,
    /// The modem family is not in the enabled capabilities.
    WrongModem,
}

/// The main error type for the SX1276 driver.
///
/// Every failure is reported as one of these codes. Validation errors are raised
/// before any register is written, and timeouts and CRC failures put the chip back
/// in standby before they are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<SPI, PIN> {
    /// An SPI-related error.
    Spi(SpiError<SPI>),
    /// A pin-related error.
    Pin(PinError<PIN>),
    /// The version register did not read back as an SX1276; carries the byte read.
    ChipNotFound(u8),
    /// Payload longer than the 255 byte FIFO; carries the rejected length.
    PacketTooLong(usize),
    TxTimeout,
    RxTimeout,
    CrcMismatch,
    InvalidBandwidth,
    InvalidSpreadingFactor,
    InvalidCodingRate,
    InvalidFrequency,
    InvalidBitrate,
    InvalidFrequencyDeviation,
    InvalidSyncWord,
    /// The operation needs a modem family that is not active or not enabled.
    WrongModem,
}

impl<SPI, PIN> From<SpiError<SPI>> for Error<SPI, PIN> {
    fn from(err: SpiError<SPI>) -> Self {
        Error::Spi(err)
    }
}

impl<SPI, PIN> From<ConfigError> for Error<SPI, PIN> {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidBandwidth => Error::InvalidBandwidth,
            ConfigError::InvalidSpreadingFactor => Error::InvalidSpreadingFactor,
            ConfigError::InvalidCodingRate => Error::InvalidCodingRate,
            ConfigError::InvalidFrequency => Error::InvalidFrequency,
            ConfigError::InvalidBitrate => Error::InvalidBitrate,
            ConfigError::InvalidFrequencyDeviation => Error::InvalidFrequencyDeviation,
            ConfigError::InvalidSyncWord => Error::InvalidSyncWord,
            ConfigError::WrongModem => Error::WrongModem,
        }
    }
}

impl<SPI, PIN> From<PinError<PIN>> for Error<SPI, PIN> {
    fn from(err: PinError<PIN>) -> Self {
        Error::Pin(err)
    }
}

impl<SPI: fmt::Debug, PIN: fmt::Debug> fmt::Display for Error<SPI, PIN> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(err) => write!(f, "SPI error: {err:?}"),
            Self::Pin(err) => write!(f, "pin error: {err:?}"),
            Self::ChipNotFound(version) => {
                write!(f, "no SX1276 found, version register read {version:#04x}")
            }
            Self::PacketTooLong(len) => write!(f, "packet of {len} bytes exceeds 255"),
            Self::TxTimeout => f.write_str("transmit timed out"),
            Self::RxTimeout => f.write_str("receive timed out"),
            Self::CrcMismatch => f.write_str("payload CRC mismatch"),
            Self::InvalidBandwidth => f.write_str("invalid bandwidth"),
            Self::InvalidSpreadingFactor => f.write_str("invalid spreading factor"),
            Self::InvalidCodingRate => f.write_str("invalid coding rate"),
            Self::InvalidFrequency => f.write_str("invalid carrier frequency"),
            Self::InvalidBitrate => f.write_str("invalid bit rate"),
            Self::InvalidFrequencyDeviation => f.write_str("invalid frequency deviation"),
            Self::InvalidSyncWord => f.write_str("invalid sync word"),
            Self::WrongModem => f.write_str("operation not supported by the active modem"),
        }
    }
}
