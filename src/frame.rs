//! Frame validation and field decoding.
//!
//! Each report from the device is five bytes: `[item, value_hi, value_lo,
//! checksum, 0x0d]` where `checksum` is the wrapping sum of the first three
//! bytes. The item byte selects the measured quantity; only temperature and
//! CO2 concentration are decoded, every other item is ignored.
//!
//! Encoding reference: ZyAura ZG01 module manual, page 8.

use crate::assembler::Field;
use crate::constants::{CO2_ID, FRAME_LEN, KELVIN_OFFSET, TEMPERATURE_ID, TERMINATOR};

/// One raw report as read from the device.
pub type RawFrame = [u8; FRAME_LEN];

/// Measured quantity carried by a frame, tagged by its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Ambient temperature in 1/16 Kelvin.
    Temperature,
    /// CO2 concentration in ppm.
    Co2Concentration,
}

impl FieldKind {
    /// Maps an item byte to its kind, `None` for items we don't decode.
    pub fn from_item(item: u8) -> Option<Self> {
        match item {
            TEMPERATURE_ID => Some(FieldKind::Temperature),
            CO2_ID => Some(FieldKind::Co2Concentration),
            _ => None,
        }
    }
}

/// A typed but unconverted field taken from a valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementField {
    pub kind: FieldKind,
    pub raw_value: u16,
}

impl MeasurementField {
    /// Temperature in degrees Celsius. Only meaningful for `Temperature` fields.
    pub fn celsius(&self) -> f64 {
        f64::from(self.raw_value) / 16.0 - KELVIN_OFFSET
    }

    /// Converts the raw value to its physical unit.
    pub fn to_field(self) -> Field {
        match self.kind {
            FieldKind::Temperature => Field::Temperature(self.celsius()),
            FieldKind::Co2Concentration => Field::Co2(self.raw_value),
        }
    }
}

/// Wrapping sum of the three leading bytes.
pub fn checksum(frame: &RawFrame) -> u8 {
    frame[..3].iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Checks the checksum and terminator of a frame.
pub fn validate(frame: &RawFrame) -> bool {
    checksum(frame) == frame[3] && frame[4] == TERMINATOR
}

/// Extracts the field carried by a frame, `None` for unknown items.
///
/// The frame is expected to have passed [`validate`].
pub fn decode(frame: &RawFrame) -> Option<MeasurementField> {
    let kind = FieldKind::from_item(frame[0])?;
    let raw_value = u16::from(frame[1]) << 8 | u16::from(frame[2]);
    Some(MeasurementField { kind, raw_value })
}

/// Builds a well-formed frame, used by the tests and by device simulators.
pub fn encode(item: u8, raw_value: u16) -> RawFrame {
    let [hi, lo] = raw_value.to_be_bytes();
    let mut frame = [item, hi, lo, 0, TERMINATOR];
    frame[3] = checksum(&frame);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    // xorshift32, good enough to shake out the validator
    struct Bytes(u32);

    impl Bytes {
        fn next(&mut self) -> u8 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 17;
            self.0 ^= self.0 << 5;
            (self.0 >> 24) as u8
        }

        fn frame(&mut self) -> RawFrame {
            [self.next(), self.next(), self.next(), self.next(), self.next()]
        }
    }

    fn reference(frame: &RawFrame) -> bool {
        (u32::from(frame[0]) + u32::from(frame[1]) + u32::from(frame[2])) % 256
            == u32::from(frame[3])
            && frame[4] == 0x0d
    }

    #[test]
    fn validate_matches_reference_on_random_frames() {
        let mut rng = Bytes(0x2545_f491);
        for _ in 0..100_000 {
            let mut frame = rng.frame();
            assert_eq!(validate(&frame), reference(&frame), "{:02X?}", frame);

            // same bytes, fixed up to be valid
            frame[3] = checksum(&frame);
            frame[4] = TERMINATOR;
            assert!(validate(&frame), "{:02X?}", frame);
        }
    }

    #[test]
    fn any_other_checksum_byte_is_rejected() {
        let good = encode(CO2_ID, 612);
        for cs in 0..=255u8 {
            let mut frame = good;
            frame[3] = cs;
            assert_eq!(validate(&frame), cs == good[3]);
        }
    }

    #[test]
    fn any_other_terminator_is_rejected() {
        let good = encode(TEMPERATURE_ID, 0x12a0);
        for end in 0..=255u8 {
            let mut frame = good;
            frame[4] = end;
            assert_eq!(validate(&frame), end == TERMINATOR);
        }
    }

    #[test]
    fn checksum_wraps() {
        let frame = [0xff, 0xff, 0x03, 0x01, TERMINATOR];
        assert!(validate(&frame));
    }

    #[test]
    fn temperature_frame() {
        let field = decode(&encode(0x42, 0x12a0)).unwrap();
        assert_eq!(field.kind, FieldKind::Temperature);
        assert_eq!(field.raw_value, 0x12a0);
        assert_eq!(field.celsius(), 4768.0 / 16.0 - 273.15);
        assert!((field.celsius() - 24.85).abs() < 1e-9);

        // 0x1130 is 275 K
        let field = decode(&encode(0x42, 0x1130)).unwrap();
        assert!((field.celsius() - 1.85).abs() < 1e-9);
    }

    #[test]
    fn co2_frame_is_unconverted() {
        let field = decode(&encode(0x50, 612)).unwrap();
        assert_eq!(field.kind, FieldKind::Co2Concentration);
        assert_eq!(field.to_field(), Field::Co2(612));
    }

    #[test]
    fn unknown_items_decode_to_nothing() {
        for item in (0..=255u8).filter(|&b| b != 0x42 && b != 0x50) {
            assert_eq!(decode(&encode(item, 1000)), None);
        }
    }

    #[test]
    fn value_is_big_endian() {
        let field = decode(&[0x50, 0x02, 0x64, 0xb6, 0x0d]).unwrap();
        assert_eq!(field.raw_value, 0x0264);
    }
}
