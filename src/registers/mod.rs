//! Register definitions for the SX1276 radio
//! Generated from the SX1276/77/78/79 datasheet, rev. 7
//!
//! The register file is split into three banks:
//!
//! - [`common`]: registers shared by both modem families (operating mode, carrier
//!   frequency, power amplifier, LNA, DIO mapping, silicon version)
//! - [`lora`]: registers that are only valid while the LoRa family bit is set
//! - [`fsk`]: registers that are only valid while the FSK/OOK family is selected
//!
//! Many addresses in the `0x0D..=0x3F` range are multiplexed between the LoRa and
//! FSK/OOK banks. Writing a LoRa register while the chip is in FSK/OOK mode lands
//! in whichever FSK register shares the address, so the family must be selected
//! before touching either bank.

/// Declares a register that holds one plain byte with no sub-fields.
macro_rules! byte_register {
    ($(#[$doc:meta])* $name:ident @ $addr:tt) => {
        $(#[$doc])*
        #[register($addr)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
        pub struct $name {
            pub value: u8,
        }

        impl FromByteArray for $name {
            type Error = Infallible;
            type Array = [u8; 1];

            fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
                Ok(Self { value: bytes[0] })
            }
        }

        impl ToByteArray for $name {
            type Error = Infallible;
            type Array = [u8; 1];

            fn to_bytes(self) -> Result<Self::Array, Self::Error> {
                Ok([self.value])
            }
        }
    };
}

pub mod common;
pub mod fsk;
pub mod lora;

pub use common::*;

/// FIFO read/write access (address: 0x00)
///
/// Shared by both families. In LoRa mode the byte lands at [`lora::FifoAddrPtr`],
/// which auto-increments; in FSK/OOK mode the FIFO behaves as a 64-byte queue.
pub const FIFO: u8 = 0x00;

/// Expected content of the [`Version`] register on genuine silicon.
pub const SILICON_VERSION: u8 = 0x12;
