//! The core types and constants describing SPIROC chips
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};
use thiserror::Error;

/// Number of channels of a single chip
pub const NCHANNELS: usize = 36;
/// Number of chips that a single DIF can read out
pub const NCHIPS: usize = 20;

/// Largest value of a 4-bit parameter
pub const MAX_VALUE_4BITS: u32 = 15;
/// Largest value of a 6-bit parameter
pub const MAX_VALUE_6BITS: u32 = 63;
/// Largest value of an 8-bit parameter
pub const MAX_VALUE_8BITS: u32 = 255;
/// Largest value of a 10-bit parameter
pub const MAX_VALUE_10BITS: u32 = 1023;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Chip type must be spiroc2b/spiroc2d, got `{0}`")]
pub struct UnknownChip(pub String);

/// The supported chip revisions
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChipKind {
    Spiroc2b,
    Spiroc2d,
}

impl ChipKind {
    pub const ALL: [ChipKind; 2] = [ChipKind::Spiroc2b, ChipKind::Spiroc2d];

    /// Lowercase name, as used on the command line and in file names
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ChipKind::Spiroc2b => "spiroc2b",
            ChipKind::Spiroc2d => "spiroc2d",
        }
    }

    /// Number of configuration bits, excluding the margin
    #[must_use]
    pub fn data_bits(self) -> usize {
        match self {
            ChipKind::Spiroc2b => 929,
            ChipKind::Spiroc2d => 1186,
        }
    }

    /// Number of guard bits at the start of the register
    #[must_use]
    pub fn margin_bits(self) -> usize {
        match self {
            ChipKind::Spiroc2b => 7,
            ChipKind::Spiroc2d => 6,
        }
    }

    #[must_use]
    pub fn total_bits(self) -> usize {
        self.data_bits() + self.margin_bits()
    }

    /// Number of hexadecimal digits of the bitstream, without the `0x` prefix
    #[must_use]
    pub fn hex_digits(self) -> usize {
        self.total_bits() / 4
    }

    /// Length of a bitstream text line, prefix included
    #[must_use]
    pub fn line_length(self) -> usize {
        self.hex_digits() + 2
    }

    /// Number of rows of the register-layout table
    #[must_use]
    pub fn layout_rows(self) -> usize {
        match self {
            ChipKind::Spiroc2b => 69,
            ChipKind::Spiroc2d => 85,
        }
    }
}

impl fmt::Display for ChipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChipKind {
    type Err = UnknownChip;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spiroc2b" => Ok(ChipKind::Spiroc2b),
            "spiroc2d" => Ok(ChipKind::Spiroc2d),
            _ => Err(UnknownChip(s.to_owned())),
        }
    }
}

/// Is `chip_id` a valid index for a DIF reading out `n_chips` chips
#[must_use]
pub fn check_chip_id(chip_id: i16, n_chips: u16) -> bool {
    u16::try_from(chip_id).map_or(false, |id| id < n_chips)
}
