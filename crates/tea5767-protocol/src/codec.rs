//! 5-byte register codec
//!
//! Write transactions carry a [`DeviceConfig`], read transactions carry a
//! [`DeviceStatus`]. Every field maps to its own bit range in one byte; no
//! field straddles bytes except the PLL word, which the layout splits
//! explicitly.
//!
//! ```text
//! write  B0 MUTE SM  PLL13..PLL8
//!        B1 PLL7..PLL0
//!        B2 SUD SSL1 SSL0 HLSI MS MR ML SWP1
//!        B3 SWP2 STBY BL XTAL SMUTE HCC SNC SI
//!        B4 PLLREF DTC - - - - - -
//!
//! read   B0 RF BLF PLL13..PLL8
//!        B1 PLL7..PLL0
//!        B2 STEREO IF6..IF0
//!        B3 LEV3..LEV0 CI3..CI1 -
//!        B4 reserved
//! ```
//!
//! The same five bytes mean different things depending on direction, so the
//! reverse mappings ([`decode_control`], [`encode_status`]) exist for the
//! device side: simulators and traffic dumps.

use crate::error::DomainError;
use crate::frequency::{Crystal, InjectionSide, PllWord};
use crate::registers::{control, DeviceConfig, SearchDirection, SearchStopLevel};
use crate::status::{flags, DeviceStatus};

/// Length of every read and write transaction
pub const TRANSACTION_LEN: usize = 5;

fn bit(set: bool, mask: u8) -> u8 {
    if set {
        mask
    } else {
        0
    }
}

/// Pack a configuration into the write registers
pub fn encode(config: &DeviceConfig) -> [u8; TRANSACTION_LEN] {
    let pll = config.pll_word();

    let byte0 = bit(config.mute, control::MUTE)
        | bit(config.search_mode, control::SEARCH_MODE)
        | pll.upper();

    let byte1 = pll.lower();

    let byte2 = bit(
        config.search_direction == SearchDirection::Up,
        control::SEARCH_UP,
    ) | (config.search_stop_level.code() << control::SEARCH_STOP_SHIFT)
        | bit(
            config.injection_side() == InjectionSide::High,
            control::HLSI,
        )
        | bit(config.forced_mono, control::MONO)
        | bit(config.mute_right, control::MUTE_RIGHT)
        | bit(config.mute_left, control::MUTE_LEFT)
        | bit(config.software_port1, control::SWP1);

    let byte3 = bit(config.software_port2, control::SWP2)
        | bit(config.standby, control::STANDBY)
        | bit(config.japanese_band, control::JAPAN_BAND)
        | bit(config.crystal().xtal_select(), control::XTAL)
        | bit(config.soft_mute, control::SOFT_MUTE)
        | bit(config.high_cut_control, control::HCC)
        | bit(config.stereo_noise_canceling, control::SNC)
        | bit(config.port1_ready_output, control::SEARCH_INDICATOR);

    let byte4 = bit(config.crystal().pll_ref_select(), control::PLL_REF)
        | bit(config.de_emphasis_75us, control::DTC);

    let bytes = [byte0, byte1, byte2, byte3, byte4];
    tracing::trace!("encoded control registers {:02X?}", bytes);
    bytes
}

/// Unpack the read registers
pub fn decode(bytes: &[u8; TRANSACTION_LEN]) -> DeviceStatus {
    DeviceStatus {
        ready: bytes[0] & flags::READY != 0,
        band_limit_reached: bytes[0] & flags::BAND_LIMIT != 0,
        pll_word: PllWord::from_bytes(bytes[0], bytes[1]),
        stereo: bytes[2] & flags::STEREO != 0,
        if_counter: bytes[2] & flags::IF_COUNTER_MASK,
        signal_level: bytes[3] >> flags::LEVEL_SHIFT,
        chip_id: (bytes[3] & flags::CHIP_ID_MASK) >> 1,
    }
}

/// Unpack write registers back into a configuration
///
/// Fails for register contents the device does not allow: search stop
/// level 0 or both clock-select bits set.
pub fn decode_control(bytes: &[u8; TRANSACTION_LEN]) -> Result<DeviceConfig, DomainError> {
    let crystal = Crystal::from_select_bits(
        bytes[3] & control::XTAL != 0,
        bytes[4] & control::PLL_REF != 0,
    )?;
    let search_stop_level = SearchStopLevel::try_from(
        (bytes[2] & control::SEARCH_STOP_MASK) >> control::SEARCH_STOP_SHIFT,
    )?;
    let injection_side = if bytes[2] & control::HLSI != 0 {
        InjectionSide::High
    } else {
        InjectionSide::Low
    };

    let mut config = DeviceConfig::new(crystal)
        .with_injection_side(injection_side)
        .with_pll_word(PllWord::from_bytes(bytes[0], bytes[1]));

    config.mute = bytes[0] & control::MUTE != 0;
    config.search_mode = bytes[0] & control::SEARCH_MODE != 0;
    config.search_direction = if bytes[2] & control::SEARCH_UP != 0 {
        SearchDirection::Up
    } else {
        SearchDirection::Down
    };
    config.search_stop_level = search_stop_level;
    config.forced_mono = bytes[2] & control::MONO != 0;
    config.mute_right = bytes[2] & control::MUTE_RIGHT != 0;
    config.mute_left = bytes[2] & control::MUTE_LEFT != 0;
    config.software_port1 = bytes[2] & control::SWP1 != 0;
    config.software_port2 = bytes[3] & control::SWP2 != 0;
    config.standby = bytes[3] & control::STANDBY != 0;
    config.japanese_band = bytes[3] & control::JAPAN_BAND != 0;
    config.soft_mute = bytes[3] & control::SOFT_MUTE != 0;
    config.high_cut_control = bytes[3] & control::HCC != 0;
    config.stereo_noise_canceling = bytes[3] & control::SNC != 0;
    config.port1_ready_output = bytes[3] & control::SEARCH_INDICATOR != 0;
    config.de_emphasis_75us = bytes[4] & control::DTC != 0;

    Ok(config)
}

/// Pack a status snapshot into read registers
pub fn encode_status(status: &DeviceStatus) -> [u8; TRANSACTION_LEN] {
    [
        bit(status.ready, flags::READY)
            | bit(status.band_limit_reached, flags::BAND_LIMIT)
            | status.pll_word.upper(),
        status.pll_word.lower(),
        bit(status.stereo, flags::STEREO) | (status.if_counter & flags::IF_COUNTER_MASK),
        ((status.signal_level & 0x0F) << flags::LEVEL_SHIFT)
            | ((status.chip_id << 1) & flags::CHIP_ID_MASK),
        0x00,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency;
    use proptest::prelude::*;

    /// Configuration with every boolean cleared
    fn all_clear() -> DeviceConfig {
        let mut config = DeviceConfig::new(Crystal::Khz32768).with_mute(false);
        config.search_mode = false;
        config
    }

    #[test]
    fn test_mute_only_sets_msb_of_first_byte() {
        let config = all_clear().with_mute(true).with_pll_word(PllWord::new(0));
        let bytes = encode(&config);
        assert_eq!(bytes[0], 0x80);
    }

    #[test]
    fn test_mute_search_and_upper_bits() {
        let config = all_clear()
            .with_pll_word(PllWord::from_bytes(0x12, 0x34))
            .with_search(SearchDirection::Up);
        let bytes = encode(&config);
        assert_eq!(bytes[0], 0xD2);
        assert_eq!(bytes[1], 0x34);
    }

    #[test]
    fn test_byte2_layout() {
        let mut config = all_clear()
            .with_search_stop_level(SearchStopLevel::High)
            .with_injection_side(InjectionSide::Low)
            .with_forced_mono(true);
        config.search_direction = SearchDirection::Down;
        config.mute_right = true;
        config.software_port1 = true;
        // SUD=0, SSL=11, HLSI=0, MS=1, MR=1, ML=0, SWP1=1
        assert_eq!(encode(&config)[2], 0b0110_1101);
    }

    #[test]
    fn test_byte3_and_byte4_for_each_crystal() {
        let config = all_clear()
            .with_standby(true)
            .with_high_cut_control(true)
            .with_stereo_noise_canceling(true);
        // STBY + XTAL + HCC + SNC
        assert_eq!(encode(&config)[3], 0x56);
        assert_eq!(encode(&config)[4], 0x00);

        let config = config.with_crystal(Crystal::Mhz6_5);
        assert_eq!(encode(&config)[3], 0x46);
        assert_eq!(encode(&config)[4], 0x80);

        let mut config = config.with_crystal(Crystal::Mhz13);
        config.de_emphasis_75us = true;
        assert_eq!(encode(&config)[3], 0x46);
        assert_eq!(encode(&config)[4], 0x40);
    }

    #[test]
    fn test_decode_status_fields() {
        let status = decode(&[0xED, 0xA5, 0xB7, 0xA6, 0x00]);
        assert!(status.ready);
        assert!(status.band_limit_reached);
        assert_eq!(status.pll_word.value(), 0x2DA5);
        assert!(status.stereo);
        assert_eq!(status.if_counter, 0x37);
        assert_eq!(status.signal_level, 10);
        assert_eq!(status.chip_id, 3);
        assert_eq!(status.frequency_mhz(Crystal::Khz32768), 95.5);
    }

    #[test]
    fn test_decode_accepts_any_bytes() {
        let status = decode(&[0xFF; 5]);
        assert_eq!(status.pll_word.value(), PllWord::MAX);
        assert_eq!(status.signal_level, 15);
        assert_eq!(status.if_counter, 0x7F);
        assert_eq!(status.chip_id, 7);
    }

    #[test]
    fn test_decode_control_rejects_stop_level_zero() {
        let mut bytes = encode(&DeviceConfig::default());
        bytes[2] &= !control::SEARCH_STOP_MASK;
        assert!(matches!(
            decode_control(&bytes),
            Err(DomainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_decode_control_rejects_both_clock_bits() {
        let mut bytes = encode(&DeviceConfig::default());
        bytes[4] |= control::PLL_REF;
        assert!(decode_control(&bytes).is_err());
    }

    fn device_config() -> impl Strategy<Value = DeviceConfig> {
        (
            0usize..frequency::CHANNEL_COUNT,
            prop_oneof![
                Just(Crystal::Khz32768),
                Just(Crystal::Mhz6_5),
                Just(Crystal::Mhz13)
            ],
            prop_oneof![Just(InjectionSide::High), Just(InjectionSide::Low)],
            1u8..=3,
            any::<[bool; 14]>(),
        )
            .prop_map(|(channel, crystal, side, ssl, b)| {
                let mut config = DeviceConfig::new(crystal)
                    .with_injection_side(side)
                    .with_frequency(frequency::channel_frequency(channel))
                    .unwrap()
                    .with_search_stop_level(SearchStopLevel::try_from(ssl).unwrap());
                config.mute = b[0];
                config.search_mode = b[1];
                config.search_direction = if b[2] {
                    SearchDirection::Up
                } else {
                    SearchDirection::Down
                };
                config.forced_mono = b[3];
                config.mute_left = b[4];
                config.mute_right = b[5];
                config.software_port1 = b[6];
                config.software_port2 = b[7];
                config.standby = b[8];
                config.japanese_band = b[9];
                config.soft_mute = b[10];
                config.high_cut_control = b[11];
                config.stereo_noise_canceling = b[12];
                config.de_emphasis_75us = b[13];
                config
            })
    }

    proptest! {
        #[test]
        fn pll_word_survives_write_then_read(config in device_config()) {
            let status = decode(&encode(&config));
            prop_assert_eq!(status.pll_word, config.pll_word());
            prop_assert_eq!(
                status.frequency_mhz_for(config.crystal(), config.injection_side()),
                config.station_frequency_mhz()
            );
        }

        #[test]
        fn control_registers_decode_to_the_same_config(config in device_config()) {
            let decoded = decode_control(&encode(&config)).unwrap();
            prop_assert_eq!(decoded, config);
        }

        #[test]
        fn status_registers_survive_device_side_encoding(bytes in any::<[u8; 4]>()) {
            let raw = [bytes[0], bytes[1], bytes[2], bytes[3] & 0xFE, 0x00];
            prop_assert_eq!(encode_status(&decode(&raw)), raw);
        }
    }
}
