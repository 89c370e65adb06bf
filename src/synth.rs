//! Frequency synthesizer and power amplifier arithmetic
//!
//! Pure conversions between physical quantities and register encodings. Nothing in
//! here touches the bus; [`Sx1276`](crate::Sx1276) validates its inputs and writes
//! the results.

use crate::config::Bandwidth;
use crate::registers::{PaConfig, PaDac, PaSelect};

/// Crystal oscillator frequency
pub const FXOSC: u32 = 32_000_000;

/// Synthesizer step is `FXOSC / 2^19`, roughly 61 Hz
const FSTEP_SHIFT: u32 = 19;

/// Carriers below this use the low-frequency RSSI calibration
pub const RSSI_HF_THRESHOLD_HZ: u32 = 862_000_000;

/// Carrier frequency in Hz to the 24-bit `Frf` value, truncating
pub fn frf_from_hz(frequency: u32) -> u32 {
    ((u64::from(frequency) << FSTEP_SHIFT) / u64::from(FXOSC)) as u32
}

/// 24-bit `Frf` value back to Hz, truncating
pub fn hz_from_frf(frf: u32) -> u32 {
    ((u64::from(frf & 0x00FF_FFFF) * u64::from(FXOSC)) >> FSTEP_SHIFT) as u32
}

/// Bit rate in bps to the 16-bit `Bitrate` value (fractional part left at zero)
pub fn bitrate_register(bitrate: u32) -> u16 {
    (FXOSC / bitrate.max(1)) as u16
}

/// Frequency deviation in Hz to the 14-bit `Fdev` value
pub fn fdev_register(deviation: u32) -> u16 {
    (((u64::from(deviation) << FSTEP_SHIFT) / u64::from(FXOSC)) as u16) & 0x3FFF
}

/// Sign-extends the 20-bit frequency error field assembled from `FreqErrorMsb/Mid/Lsb`
pub fn freq_error_raw(msb: u8, mid: u8, lsb: u8) -> i32 {
    let raw = u32::from(msb & 0x0F) << 16 | u32::from(mid) << 8 | u32::from(lsb);

    if raw & 0x8_0000 != 0 {
        (raw | 0xFFF0_0000) as i32
    } else {
        raw as i32
    }
}

/// Frequency error in Hz: `raw * 2^24 / FXOSC * BW / 500 kHz`
pub fn frequency_error_hz(raw: i32, bandwidth: Bandwidth) -> i32 {
    let numerator = i64::from(raw) * (1 << 24) * i64::from(bandwidth.hz());
    let denominator = i64::from(FXOSC) * 500_000;

    (numerator / denominator) as i32
}

/// Packet RSSI in dBm from the raw `PktRssiValue` byte
pub fn lora_rssi_dbm(raw: u8, frequency: u32) -> i16 {
    let offset = if frequency < RSSI_HF_THRESHOLD_HZ { 164 } else { 157 };

    i16::from(raw) - offset
}

/// FSK/OOK RSSI in dBm from the raw `RssiValue` byte
pub fn fsk_rssi_dbm(raw: u8) -> i16 {
    -(i16::from(raw) / 2)
}

/// Power amplifier register pair for a requested output power
///
/// The PA_BOOST path covers 2 to 20 dBm; above 17 dBm the high power DAC is
/// enabled, which adds 3 dB on top of the programmed level. The RFO path covers
/// -1 to 14 dBm with the maximum `max_power` setting.
pub fn pa_settings(power: i8, pa_boost: bool) -> (PaConfig, PaDac) {
    if pa_boost {
        let mut level = power.min(20);
        let dac = if level > 17 {
            level -= 3;
            PaDac::HighPower
        } else {
            PaDac::Default
        };
        let level = level.max(2);

        (
            PaConfig {
                pa_select: PaSelect::PaBoost,
                max_power: 0,
                output_power: (level - 2) as u8,
            },
            dac,
        )
    } else {
        let level = power.clamp(-1, 14);

        (
            PaConfig {
                pa_select: PaSelect::Rfo,
                max_power: 7,
                output_power: (level + 1) as u8,
            },
            PaDac::Default,
        )
    }
}

/// Over-current protection trim for a current limit in mA
pub fn ocp_trim(milliamps: u8) -> u8 {
    match milliamps {
        0..=120 => (milliamps.max(45) - 45) / 5,
        121..=240 => ((u16::from(milliamps) + 30) / 10) as u8,
        _ => 27,
    }
}

/// Symbol time above which LoRa low data rate optimisation is mandatory
pub fn needs_low_data_rate_optimize(spreading_factor: u8, bandwidth: Bandwidth) -> bool {
    // Symbol time is 2^SF / BW seconds; compare in microseconds.
    let symbol_us = (1_000_000u64 << spreading_factor) / u64::from(bandwidth.hz());
    symbol_us > 16_000
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of [`pa_settings`]: the power level a register pair encodes
    fn programmed_power(config: PaConfig, dac: PaDac) -> i8 {
        let level = config.output_power as i8;
        match (config.pa_select, dac) {
            (PaSelect::PaBoost, PaDac::HighPower) => level + 5,
            (PaSelect::PaBoost, PaDac::Default) => level + 2,
            (PaSelect::Rfo, _) => level - 1,
        }
    }

    #[test]
    fn frf_round_trips_within_one_step() {
        let step = FXOSC >> FSTEP_SHIFT;
        let mut f = 137_000_000u32;
        while f <= 1_020_000_000 {
            let back = hz_from_frf(frf_from_hz(f));
            assert!(back <= f && f - back <= step + 1, "{f} -> {back}");
            f += 7_919_777;
        }
        let back = hz_from_frf(frf_from_hz(1_020_000_000));
        assert!(1_020_000_000 - back <= step + 1);
    }

    #[test]
    fn frf_known_values() {
        assert_eq!(frf_from_hz(915_000_000), 0xE4C000);
        assert_eq!(frf_from_hz(434_000_000), 0x6C8000);
        assert_eq!(frf_from_hz(868_000_000), 0xD90000);
    }

    #[test]
    fn bitrate_and_deviation() {
        assert_eq!(bitrate_register(4_800), 0x1A0A);
        assert_eq!(bitrate_register(300_000), 106);
        assert_eq!(fdev_register(5_000), 81);
        assert_eq!(fdev_register(200_000), 3276);
        assert_eq!(fdev_register(0), 0);
    }

    #[test]
    fn freq_error_sign_extension() {
        assert_eq!(freq_error_raw(0x00, 0x00, 0x01), 1);
        assert_eq!(freq_error_raw(0x0F, 0xFF, 0xFF), -1);
        assert_eq!(freq_error_raw(0x08, 0x00, 0x00), -524_288);
        // upper nibble is not part of the field
        assert_eq!(freq_error_raw(0xF7, 0xFF, 0xFF), 524_287);
    }

    #[test]
    fn frequency_error_scales_with_bandwidth() {
        assert_eq!(frequency_error_hz(0, Bandwidth::Khz125), 0);
        assert_eq!(frequency_error_hz(1_000, Bandwidth::Khz125), 131);
        assert_eq!(frequency_error_hz(1_000, Bandwidth::Khz500), 524);
        assert_eq!(frequency_error_hz(-1_000, Bandwidth::Khz500), -524);
    }

    #[test]
    fn rssi_offsets() {
        assert_eq!(lora_rssi_dbm(100, 434_000_000), -64);
        assert_eq!(lora_rssi_dbm(100, 861_999_999), -64);
        assert_eq!(lora_rssi_dbm(100, 862_000_000), -57);
        assert_eq!(fsk_rssi_dbm(181), -90);
    }

    #[test]
    fn boost_path_is_clamped_to_2_through_20() {
        for power in i8::MIN..=i8::MAX {
            let (config, dac) = pa_settings(power, true);
            assert_eq!(config.pa_select, PaSelect::PaBoost);
            assert!(config.output_power <= 15);
            let effective = programmed_power(config, dac);
            assert!((2..=20).contains(&effective), "{power} -> {effective}");
            if (2..=20).contains(&power) {
                assert_eq!(effective, power);
            }
        }
    }

    #[test]
    fn rfo_path_is_clamped_to_minus_1_through_14() {
        for power in i8::MIN..=i8::MAX {
            let (config, dac) = pa_settings(power, false);
            assert_eq!(config.pa_select, PaSelect::Rfo);
            assert_eq!(dac, PaDac::Default);
            assert_eq!(programmed_power(config, dac), power.clamp(-1, 14));
        }
    }

    #[test]
    fn ocp_trim_matches_datasheet() {
        assert_eq!(ocp_trim(100), 11);
        assert_eq!(ocp_trim(120), 0x0F);
        assert_eq!(ocp_trim(240), 0x1B);
        assert_eq!(ocp_trim(255), 27);
        assert_eq!(ocp_trim(10), 0);
    }

    #[test]
    fn low_data_rate_optimize_threshold() {
        assert!(!needs_low_data_rate_optimize(7, Bandwidth::Khz125));
        assert!(!needs_low_data_rate_optimize(10, Bandwidth::Khz125));
        assert!(needs_low_data_rate_optimize(11, Bandwidth::Khz125));
        assert!(needs_low_data_rate_optimize(12, Bandwidth::Khz125));
        assert!(!needs_low_data_rate_optimize(12, Bandwidth::Khz500));
    }
}
