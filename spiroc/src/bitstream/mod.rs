//! The full configuration register of a single chip
//!
//! Bits are stored in stream order. The first [`ChipKind::margin_bits`] are guard bits, followed by
//! the data bits. Data fields are addressed by their sub-address, the offset from the start of the
//! data bits, and are read most significant bit first.

pub mod params;

use crate::core::{
    ChipKind,
    NCHANNELS,
};
use spiroc_utils::{
    hex::{
        self,
        bits_to_hex,
        bits_to_string,
        hex_to_bits,
    },
    layout::Layout,
};
use std::{
    ffi::OsStr,
    path::{
        Path,
        PathBuf,
    },
};
use thiserror::Error;
use tracing::{
    debug,
    info,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Hex(#[from] hex::Error),
    #[error("Config file must be txt file: {0}")]
    Extension(PathBuf),
    #[error("There is no such file: {0}")]
    NoSuchFile(PathBuf),
    #[error("Expected exactly 1 line for config file, found {0}")]
    Lines(usize),
    #[error("the length of config text is not correct: expected {expected}, found {found}")]
    LineLength { expected: usize, found: usize },
    #[error("the length of binary config is not correct: expected {expected}, found {found}")]
    BitLength { expected: usize, found: usize },
    #[error("Bits {start}..{end} are outside the {data_bits} data bits")]
    OutOfRange {
        start: usize,
        end: usize,
        data_bits: usize,
    },
    #[error("Can not read {0} bits into a 32-bit value")]
    TooWide(usize),
    #[error("Value {value} does not fit in {bits} bits")]
    ValueTooLarge { value: u64, bits: usize },
    #[error("Channel {0} is out of range")]
    Channel(usize),
    #[error("The named parameters are only defined for spiroc2d, not {0}")]
    UnsupportedChip(ChipKind),
    #[error("Expected {expected} threshold values, found {found}")]
    ThresholdCount { expected: usize, found: usize },
    #[error("A one bit parameter must be 0 or 1, got {0}")]
    NotBinary(u32),
    #[error("Invalid default `{value}` for field `{name}`")]
    Default { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitstream {
    kind: ChipKind,
    bits: Vec<bool>,
}

impl Bitstream {
    /// Wrap stream ordered `bits`, which must cover the whole register
    /// # Errors
    /// Returns an error if the number of bits does not match the chip
    pub fn from_bits(kind: ChipKind, bits: Vec<bool>) -> Result<Self, Error> {
        if bits.len() != kind.total_bits() {
            return Err(Error::BitLength {
                expected: kind.total_bits(),
                found: bits.len(),
            });
        }
        Ok(Self { kind, bits })
    }

    /// A register of all zeros
    #[must_use]
    pub fn zeroed(kind: ChipKind) -> Self {
        Self {
            kind,
            bits: vec![false; kind.total_bits()],
        }
    }

    /// Build the register holding the default value of every field of `layout`.
    ///
    /// Defaults are decimal. Fields holding one value per channel get the default in every
    /// channel.
    /// # Errors
    /// Returns an error if a default is not a decimal number or does not fit in its field
    pub fn from_defaults(kind: ChipKind, layout: &Layout) -> Result<Self, Error> {
        let mut bitstream = Self::zeroed(kind);
        for (field, start) in layout.offsets() {
            let value: u64 = field.default.parse().map_err(|_| Error::Default {
                name: field.name.to_string(),
                value: field.default.clone(),
            })?;
            let chunk = if field.bits % NCHANNELS == 0 {
                field.bits / NCHANNELS
            } else {
                field.bits
            };
            for chunk_start in (start..start + field.bits).step_by(chunk) {
                bitstream.modify(chunk_start, &value_bits(value, chunk)?)?;
            }
        }
        Ok(bitstream)
    }

    /// Parse a `0x` prefixed line holding the whole register
    /// # Errors
    /// Returns an error if the line is not hex or has the wrong length
    pub fn from_hex_line(kind: ChipKind, line: &str) -> Result<Self, Error> {
        let digits = hex::bitstream_line(line)?;
        if digits.len() != kind.hex_digits() {
            return Err(Error::LineLength {
                expected: kind.line_length(),
                found: digits.len() + 2,
            });
        }
        Self::from_bits(kind, hex_to_bits(digits)?)
    }

    /// Parse the bitstream as stored in an acquisition XML document, which omits the final digit
    /// # Errors
    /// Returns an error if the text is not hex or has the wrong length
    pub fn from_xml_text(kind: ChipKind, text: &str) -> Result<Self, Error> {
        let digits = hex::bitstream_line(text)?;
        if digits.len() + 1 != kind.hex_digits() {
            return Err(Error::LineLength {
                expected: kind.line_length() - 1,
                found: digits.len() + 2,
            });
        }
        Self::from_bits(kind, hex_to_bits(&format!("{digits}0"))?)
    }

    /// Read a bitstream text file (`.txt`, a single line)
    /// # Errors
    /// Returns an error on IO failures, a wrong extension or malformed contents
    pub fn open<T>(kind: ChipKind, filename: T) -> Result<Self, Error>
    where
        T: AsRef<Path>,
    {
        let path = filename.as_ref();
        if path.extension() != Some(OsStr::new("txt")) {
            return Err(Error::Extension(path.into()));
        }
        if !path.exists() {
            return Err(Error::NoSuchFile(path.into()));
        }
        let contents = std::fs::read_to_string(path)?;
        let lines: Vec<_> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
        match lines.as_slice() {
            [line] => Self::from_hex_line(kind, line),
            _ => Err(Error::Lines(lines.len())),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChipKind {
        self.kind
    }

    /// Every bit of the register, margin included
    #[must_use]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// The data bits, without the margin
    #[must_use]
    pub fn data(&self) -> &[bool] {
        &self.bits[self.kind.margin_bits()..]
    }

    /// The `0x` prefixed uppercase text form
    /// # Errors
    /// Returns an error if the register is not a whole number of hex digits
    pub fn to_hex_line(&self) -> Result<String, Error> {
        Ok(format!("0x{}", bits_to_hex(&self.bits)?))
    }

    /// The text form stored in acquisition XML documents, without the final digit
    /// # Errors
    /// Returns an error if the register is not a whole number of hex digits
    pub fn to_xml_text(&self) -> Result<String, Error> {
        let mut line = self.to_hex_line()?;
        line.pop();
        Ok(line)
    }

    /// Write the text form to `filename`, without a trailing newline
    /// # Errors
    /// Returns an error on IO failures
    pub fn write<T>(&self, filename: T) -> Result<(), Error>
    where
        T: AsRef<Path>,
    {
        std::fs::write(filename.as_ref(), self.to_hex_line()?)?;
        info!(path = ?filename.as_ref(), "Wrote the new bitstream");
        Ok(())
    }

    fn range(&self, start: usize, len: usize) -> Result<std::ops::Range<usize>, Error> {
        let data_bits = self.kind.data_bits();
        let end = start.checked_add(len).unwrap_or(usize::MAX);
        if end > data_bits {
            return Err(Error::OutOfRange {
                start,
                end,
                data_bits,
            });
        }
        let margin = self.kind.margin_bits();
        Ok(margin + start..margin + end)
    }

    /// The `len` bits of the field at sub-address `start`, most significant first
    /// # Errors
    /// Returns an error if the field goes past the data bits
    pub fn field(&self, start: usize, len: usize) -> Result<&[bool], Error> {
        let range = self.range(start, len)?;
        Ok(&self.bits[range])
    }

    /// Same as [`Bitstream::field`], as a `'0'`/`'1'` string
    /// # Errors
    /// Returns an error if the field goes past the data bits
    pub fn field_string(&self, start: usize, len: usize) -> Result<String, Error> {
        Ok(bits_to_string(self.field(start, len)?))
    }

    /// The integer value of the field at sub-address `start`
    /// # Errors
    /// Returns an error if the field goes past the data bits or is wider than 32 bits
    pub fn value(&self, start: usize, len: usize) -> Result<u32, Error> {
        if len > 32 {
            return Err(Error::TooWide(len));
        }
        Ok(self
            .field(start, len)?
            .iter()
            .fold(0, |acc, b| (acc << 1) | u32::from(*b)))
    }

    /// Overwrite the field at sub-address `start` with `bits`
    /// # Errors
    /// Returns an error if the field goes past the data bits
    pub fn modify(&mut self, start: usize, bits: &[bool]) -> Result<(), Error> {
        let range = self.range(start, bits.len())?;
        debug!(start, bits = %bits_to_string(bits), "Modifying bitstream");
        self.bits[range].copy_from_slice(bits);
        Ok(())
    }

    /// Write `value` into the `len` bit field at sub-address `start`
    /// # Errors
    /// Returns an error if the value does not fit or the field goes past the data bits
    pub fn set_value(&mut self, start: usize, len: usize, value: u32) -> Result<(), Error> {
        self.modify(start, &value_bits(u64::from(value), len)?)
    }
}

/// `value` as `len` bits, most significant first
fn value_bits(value: u64, len: usize) -> Result<Vec<bool>, Error> {
    if len < 64 && value >> len != 0 {
        return Err(Error::ValueTooLarge { value, bits: len });
    }
    Ok((0..len)
        .rev()
        .map(|i| i < 64 && (value >> i) & 1 == 1)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::builtin_layout;
    use paste::paste;

    fn zeros_line(kind: ChipKind) -> String {
        format!("0x{}", "0".repeat(kind.hex_digits()))
    }

    macro_rules! test_chip_io {
        ($chip:ident) => {
            paste! {
                #[test]
                fn [<test_hex_roundtrip_ $chip:lower>]() {
                    let kind = ChipKind::$chip;
                    let line = format!("0x{}", "5A".repeat(kind.hex_digits() / 2));
                    let bitstream = Bitstream::from_hex_line(kind, &line).unwrap();
                    assert_eq!(bitstream.bits().len(), kind.total_bits());
                    assert_eq!(bitstream.data().len(), kind.data_bits());
                    assert_eq!(bitstream.to_hex_line().unwrap(), line);
                }

                #[test]
                fn [<test_xml_text_ $chip:lower>]() {
                    let kind = ChipKind::$chip;
                    let mut bitstream = Bitstream::zeroed(kind);
                    bitstream.set_value(0, 8, 0xA5).unwrap();
                    let text = bitstream.to_xml_text().unwrap();
                    assert_eq!(text.len(), kind.line_length() - 1);
                    assert_eq!(Bitstream::from_xml_text(kind, &text).unwrap(), bitstream);
                }

                #[test]
                fn [<test_defaults_ $chip:lower>]() {
                    let kind = ChipKind::$chip;
                    let layout = builtin_layout(kind).unwrap();
                    let bitstream = Bitstream::from_defaults(kind, &layout).unwrap();
                    let trigth = layout.get("trigger_threshold_dac").unwrap();
                    assert_eq!(bitstream.value(trigth.subadd, trigth.bits).unwrap(), 250);
                    let mask = layout.get("discriminator_mask").unwrap();
                    assert!(bitstream.field(mask.subadd, mask.bits).unwrap().iter().all(|b| *b));
                    assert!(bitstream.bits()[..kind.margin_bits()].iter().all(|b| !*b));
                }
            }
        };
    }

    test_chip_io!(Spiroc2b);
    test_chip_io!(Spiroc2d);

    #[test]
    fn test_line_length() {
        let err = Bitstream::from_hex_line(ChipKind::Spiroc2b, &zeros_line(ChipKind::Spiroc2d))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::LineLength {
                expected: 236,
                found: 300
            }
        ));
        assert!(matches!(
            Bitstream::from_hex_line(ChipKind::Spiroc2d, "1234"),
            Err(Error::Hex(hex::Error::NotHex))
        ));
    }

    #[test]
    fn test_stream_order() {
        let kind = ChipKind::Spiroc2d;
        // The last digit holds the margin, the digit before it starts the data
        let mut line = zeros_line(kind);
        line.replace_range(line.len() - 2..line.len() - 1, "4");
        let bitstream = Bitstream::from_hex_line(kind, &line).unwrap();
        // Integer bit 6 is the first data bit
        assert_eq!(bitstream.field(0, 2).unwrap(), [true, false]);
        assert_eq!(bitstream.value(0, 4).unwrap(), 0b1000);
    }

    #[test]
    fn test_value_msb_first() {
        let mut bitstream = Bitstream::zeroed(ChipKind::Spiroc2d);
        bitstream.set_value(931, 10, 250).unwrap();
        assert_eq!(bitstream.field_string(931, 10).unwrap(), "0011111010");
        assert_eq!(bitstream.value(931, 10).unwrap(), 250);
    }

    #[test]
    fn test_bounds() {
        let mut bitstream = Bitstream::zeroed(ChipKind::Spiroc2b);
        assert!(bitstream.field(920, 9).is_ok());
        assert!(matches!(
            bitstream.field(921, 9),
            Err(Error::OutOfRange {
                start: 921,
                end: 930,
                data_bits: 929
            })
        ));
        assert!(bitstream.modify(928, &[true, true]).is_err());
        assert!(matches!(bitstream.value(0, 33), Err(Error::TooWide(33))));
        assert!(matches!(
            bitstream.set_value(0, 4, 16),
            Err(Error::ValueTooLarge { value: 16, bits: 4 })
        ));
    }

    #[test]
    fn test_bounds_overflow() {
        let mut bitstream = Bitstream::zeroed(ChipKind::Spiroc2b);
        assert!(matches!(
            bitstream.field(usize::MAX - 1, 5),
            Err(Error::OutOfRange {
                end: usize::MAX,
                ..
            })
        ));
        assert!(bitstream.modify(usize::MAX, &[true]).is_err());
        assert!(bitstream.value(usize::MAX, 1).is_err());
        let mut bitstream = Bitstream::zeroed(ChipKind::Spiroc2d);
        assert!(matches!(
            bitstream.one_bit_param(usize::MAX),
            Err(Error::OutOfRange { .. })
        ));
        assert!(bitstream.set_one_bit_param(usize::MAX, 1).is_err());
    }

    #[test]
    fn test_open() {
        let dir = tempfile::tempdir().unwrap();
        let kind = ChipKind::Spiroc2d;

        let good = dir.path().join("config.txt");
        std::fs::write(&good, format!("{}\n", zeros_line(kind))).unwrap();
        assert_eq!(Bitstream::open(kind, &good).unwrap(), Bitstream::zeroed(kind));

        let two = dir.path().join("two.txt");
        std::fs::write(&two, format!("{0}\n{0}\n", zeros_line(kind))).unwrap();
        assert!(matches!(Bitstream::open(kind, &two), Err(Error::Lines(2))));

        assert!(matches!(
            Bitstream::open(kind, dir.path().join("config.dat")),
            Err(Error::Extension(_))
        ));
        assert!(matches!(
            Bitstream::open(kind, dir.path().join("missing.txt")),
            Err(Error::NoSuchFile(_))
        ));
    }

    #[test]
    fn test_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut bitstream = Bitstream::zeroed(ChipKind::Spiroc2b);
        bitstream.set_value(10, 4, 0xF).unwrap();
        bitstream.write(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.ends_with('\n'));
        assert_eq!(Bitstream::open(ChipKind::Spiroc2b, &path).unwrap(), bitstream);
    }
}
