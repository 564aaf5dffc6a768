//! Named parameters of the SPIROC2D register map
use super::{
    Bitstream,
    Error,
};
use crate::core::{
    ChipKind,
    MAX_VALUE_10BITS,
    MAX_VALUE_4BITS,
    MAX_VALUE_6BITS,
    MAX_VALUE_8BITS,
    NCHANNELS,
};
use std::ops::Range;

/// Position of a parameter in the data bits
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Param {
    pub start: usize,
    pub len: usize,
    /// Distance between consecutive channels for per-channel parameters
    pub stride: usize,
}

impl Param {
    #[must_use]
    pub fn start_of(&self, channel: usize) -> usize {
        self.start + self.stride * channel
    }
}

pub const TRIGTH: Param = Param {
    start: 931,
    len: 10,
    stride: 0,
};
pub const GAINTH: Param = Param {
    start: 941,
    len: 10,
    stride: 0,
};
/// 8 bits of DAC followed by the "DAC ON" bit
pub const INPUT_DAC: Param = Param {
    start: 37,
    len: 8,
    stride: 9,
};
/// 6 bits of high gain, 6 bits of low gain and 3 zero bits
pub const AMP_DAC: Param = Param {
    start: 367,
    len: 6,
    stride: 15,
};
pub const TRIG_ADJ: Param = Param {
    start: 1006,
    len: 4,
    stride: 4,
};
pub const INPUT_DAC_REF: Param = Param {
    start: 36,
    len: 1,
    stride: 0,
};
pub const CHIP_ID: Param = Param {
    start: 1158,
    len: 8,
    stride: 0,
};

/// The channels addressed by `channel`, where [`NCHANNELS`] means all of them
fn channels(channel: usize) -> Result<Range<usize>, Error> {
    match channel {
        NCHANNELS => Ok(0..NCHANNELS),
        c if c < NCHANNELS => Ok(c..c + 1),
        c => Err(Error::Channel(c)),
    }
}

fn single_channel(channel: usize) -> Result<usize, Error> {
    if channel < NCHANNELS {
        Ok(channel)
    } else {
        Err(Error::Channel(channel))
    }
}

fn check_max(value: u32, max: u32, bits: usize) -> Result<(), Error> {
    if value > max {
        return Err(Error::ValueTooLarge {
            value: u64::from(value),
            bits,
        });
    }
    Ok(())
}

impl Bitstream {
    fn require_spiroc2d(&self) -> Result<(), Error> {
        match self.kind {
            ChipKind::Spiroc2d => Ok(()),
            other => Err(Error::UnsupportedChip(other)),
        }
    }

    fn read_param(&self, param: Param, channel: usize) -> Result<u32, Error> {
        self.require_spiroc2d()?;
        self.value(param.start_of(channel), param.len)
    }

    fn write_param(&mut self, param: Param, max: u32, value: u32) -> Result<(), Error> {
        self.require_spiroc2d()?;
        check_max(value, max, param.len)?;
        self.set_value(param.start, param.len, value)
    }

    /// Global trigger threshold
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d
    pub fn trigth(&self) -> Result<u32, Error> {
        self.read_param(TRIGTH, 0)
    }

    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or the value is larger than 10 bits
    pub fn set_trigth(&mut self, value: u32) -> Result<(), Error> {
        self.write_param(TRIGTH, MAX_VALUE_10BITS, value)
    }

    /// Gain select threshold
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d
    pub fn gainth(&self) -> Result<u32, Error> {
        self.read_param(GAINTH, 0)
    }

    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or the value is larger than 10 bits
    pub fn set_gainth(&mut self, value: u32) -> Result<(), Error> {
        self.write_param(GAINTH, MAX_VALUE_10BITS, value)
    }

    /// Input DAC of `channel`
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or the channel is out of range
    pub fn input_dac(&self, channel: usize) -> Result<u32, Error> {
        self.read_param(INPUT_DAC, single_channel(channel)?)
    }

    /// Set the input DAC of `channel` ([`NCHANNELS`] for all) and switch it on
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or on out of range arguments
    pub fn set_input_dac(&mut self, channel: usize, value: u32) -> Result<(), Error> {
        self.require_spiroc2d()?;
        check_max(value, MAX_VALUE_8BITS, INPUT_DAC.len)?;
        for ch in channels(channel)? {
            let start = INPUT_DAC.start_of(ch);
            self.set_value(start, INPUT_DAC.len, value)?;
            self.modify(start + INPUT_DAC.len, &[true])?;
        }
        Ok(())
    }

    /// High gain amplifier DAC of `channel`
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or the channel is out of range
    pub fn amp_dac(&self, channel: usize) -> Result<u32, Error> {
        self.read_param(AMP_DAC, single_channel(channel)?)
    }

    /// Low gain amplifier DAC of `channel`
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or the channel is out of range
    pub fn low_gain_amp_dac(&self, channel: usize) -> Result<u32, Error> {
        self.require_spiroc2d()?;
        let start = AMP_DAC.start_of(single_channel(channel)?) + AMP_DAC.len;
        self.value(start, AMP_DAC.len)
    }

    /// Set both the high and low gain amplifier DACs of `channel` ([`NCHANNELS`] for all)
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or on out of range arguments
    pub fn set_amp_dac(&mut self, channel: usize, value: u32) -> Result<(), Error> {
        self.require_spiroc2d()?;
        check_max(value, MAX_VALUE_6BITS, AMP_DAC.len)?;
        let len = AMP_DAC.len;
        for ch in channels(channel)? {
            let start = AMP_DAC.start_of(ch);
            self.set_value(start, len, value)?;
            self.set_value(start + len, len, value)?;
            self.set_value(start + 2 * len, AMP_DAC.stride - 2 * len, 0)?;
        }
        Ok(())
    }

    /// Adjustable threshold of `channel`
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or the channel is out of range
    pub fn trig_adj(&self, channel: usize) -> Result<u32, Error> {
        self.read_param(TRIG_ADJ, single_channel(channel)?)
    }

    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or on out of range arguments
    pub fn set_trig_adj(&mut self, channel: usize, value: u32) -> Result<(), Error> {
        self.require_spiroc2d()?;
        check_max(value, MAX_VALUE_4BITS, TRIG_ADJ.len)?;
        for ch in channels(channel)? {
            self.set_value(TRIG_ADJ.start_of(ch), TRIG_ADJ.len, value)?;
        }
        Ok(())
    }

    /// Set the global threshold and every adjustable threshold from `thresholds`, the global value
    /// followed by one adjustment per channel
    /// # Errors
    /// Returns an error on a wrong number of values or out of range values
    pub fn set_trigth_and_adj(&mut self, thresholds: &[u32]) -> Result<(), Error> {
        self.require_spiroc2d()?;
        let (global, adjust) = match thresholds {
            [global, adjust @ ..] if adjust.len() == NCHANNELS => (*global, adjust),
            _ => {
                return Err(Error::ThresholdCount {
                    expected: NCHANNELS + 1,
                    found: thresholds.len(),
                })
            }
        };
        self.set_trigth(global)?;
        for (ch, value) in adjust.iter().enumerate() {
            self.set_trig_adj(ch, *value)?;
        }
        Ok(())
    }

    /// Input DAC voltage reference bit
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d
    pub fn input_dac_ref(&self) -> Result<u32, Error> {
        self.read_param(INPUT_DAC_REF, 0)
    }

    /// # Errors
    /// Returns an error if the chip is not a spiroc2d
    pub fn chip_id(&self) -> Result<u32, Error> {
        self.read_param(CHIP_ID, 0)
    }

    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or the id is larger than 8 bits
    pub fn set_chip_id(&mut self, value: u32) -> Result<(), Error> {
        self.write_param(CHIP_ID, MAX_VALUE_8BITS, value)
    }

    /// A single bit at `subadd`
    /// # Errors
    /// Returns an error if the chip is not a spiroc2d or the bit is out of range
    pub fn one_bit_param(&self, subadd: usize) -> Result<u32, Error> {
        self.require_spiroc2d()?;
        self.value(subadd, 1)
    }

    /// # Errors
    /// Returns an error if the chip is not a spiroc2d, the bit is out of range or `value` is not
    /// 0 or 1
    pub fn set_one_bit_param(&mut self, subadd: usize, value: u32) -> Result<(), Error> {
        self.require_spiroc2d()?;
        if value > 1 {
            return Err(Error::NotBinary(value));
        }
        self.set_value(subadd, 1, value)
    }
}
