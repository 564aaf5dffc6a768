//! Slicing a bitstream into the named fields of a register-layout table
use crate::{
    bitstream::{
        self,
        Bitstream,
    },
    core::NCHANNELS,
};
use kstring::KString;
use spiroc_utils::layout::{
    self,
    Field,
    Layout,
};
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Bitstream(#[from] bitstream::Error),
    #[error("The layout describes {layout} bits but the chip has {data} data bits")]
    Width { layout: usize, data: usize },
    #[error(transparent)]
    Layout(#[from] layout::Error),
    #[error("No corresponding sub-address.")]
    NoSuchSubAddress,
    #[error("Sub-address {subadd} is out of range (0..{data_bits})")]
    SubAddress { subadd: usize, data_bits: usize },
    #[error("Channel {0} is out of range")]
    Channel(usize),
    #[error("Value {value} does not fit in the {bits} bits of `{name}`")]
    Value {
        name: String,
        value: u32,
        bits: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Whole(String),
    /// One bit string per channel
    Channels(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedField {
    pub name: KString,
    pub bits: usize,
    pub subadd: usize,
    pub value: FieldValue,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Whole(bits) => write!(f, "[{bits}]"),
            FieldValue::Channels(chans) => {
                let chans: Vec<_> = chans.iter().map(|c| format!("[{c}]")).collect();
                f.write_str(&chans.join(","))
            }
        }
    }
}

impl fmt::Display for DecodedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            FieldValue::Whole(_) => write!(f, "name = {} | value = {}", self.name, self.value),
            FieldValue::Channels(_) => {
                write!(f, "name = {} | values = {}", self.name, self.value)
            }
        }
    }
}

fn check_width(bitstream: &Bitstream, layout: &Layout) -> Result<(), Error> {
    let data = bitstream.kind().data_bits();
    if layout.total_bits() != data {
        return Err(Error::Width {
            layout: layout.total_bits(),
            data,
        });
    }
    Ok(layout.check_contiguous()?)
}

fn decode_field(
    bitstream: &Bitstream,
    field: &Field,
    start: usize,
    width: Option<usize>,
) -> Result<FieldValue, Error> {
    Ok(match width {
        Some(width) => FieldValue::Channels(
            (0..NCHANNELS)
                .map(|ch| bitstream.field_string(start + ch * width, width))
                .collect::<Result<_, _>>()?,
        ),
        None => FieldValue::Whole(bitstream.field_string(start, field.bits)?),
    })
}

fn decode_with<F>(
    bitstream: &Bitstream,
    layout: &Layout,
    split: F,
) -> Result<Vec<DecodedField>, Error>
where
    F: Fn(&Field) -> Option<usize>,
{
    check_width(bitstream, layout)?;
    layout
        .offsets()
        .map(|(field, start)| {
            debug!(name = %field.name, start, bits = field.bits, "Decoding field");
            Ok(DecodedField {
                name: field.name.clone(),
                bits: field.bits,
                subadd: field.subadd,
                value: decode_field(bitstream, field, start, split(field))?,
            })
        })
        .collect()
}

/// Slice every field of `layout` out of `bitstream`
/// # Errors
/// Returns an error if the layout does not cover exactly the data bits of the chip, or if a
/// declared sub-address disagrees with the offset of its row
pub fn decode(bitstream: &Bitstream, layout: &Layout) -> Result<Vec<DecodedField>, Error> {
    decode_with(bitstream, layout, |f| f.channel_width(NCHANNELS))
}

/// Same as [`decode`], but every field whose width is a multiple of [`NCHANNELS`] is split per
/// channel, one bit wide chunks included
/// # Errors
/// Same as [`decode`]
pub fn decode_per_channel(
    bitstream: &Bitstream,
    layout: &Layout,
) -> Result<Vec<DecodedField>, Error> {
    decode_with(bitstream, layout, |f| {
        (f.bits % NCHANNELS == 0).then_some(f.bits / NCHANNELS)
    })
}

/// The decoded fields with sub-address `subadd` (all of them if `None`) whose name contains
/// `pattern`
/// # Errors
/// Returns [`Error::NoSuchSubAddress`] if a sub-address was requested and nothing matched
pub fn select<'a>(
    decoded: &'a [DecodedField],
    subadd: Option<usize>,
    pattern: &str,
) -> Result<Vec<&'a DecodedField>, Error> {
    let selected: Vec<_> = decoded
        .iter()
        .filter(|f| subadd.map_or(true, |s| f.subadd == s))
        .filter(|f| f.name.contains(pattern))
        .collect();
    if subadd.is_some() && selected.is_empty() {
        return Err(Error::NoSuchSubAddress);
    }
    Ok(selected)
}

fn field_at<'a>(
    bitstream: &Bitstream,
    layout: &'a Layout,
    subadd: usize,
) -> Result<&'a Field, Error> {
    let data_bits = bitstream.kind().data_bits();
    if subadd >= data_bits {
        return Err(Error::SubAddress { subadd, data_bits });
    }
    layout.by_subadd(subadd).ok_or(Error::NoSuchSubAddress)
}

/// The bits of the field at `subadd`, or of one channel of it
/// # Errors
/// Returns an error on an unknown sub-address or an out of range channel
pub fn subadd_value(
    bitstream: &Bitstream,
    layout: &Layout,
    subadd: usize,
    channel: Option<usize>,
) -> Result<String, Error> {
    let field = field_at(bitstream, layout, subadd)?;
    match (channel, field.channel_width(NCHANNELS)) {
        (Some(ch), _) if ch >= NCHANNELS => Err(Error::Channel(ch)),
        (Some(ch), Some(width)) => Ok(bitstream.field_string(subadd + ch * width, width)?),
        _ => Ok(bitstream.field_string(subadd, field.bits)?),
    }
}

/// The integer value of [`subadd_value`]
/// # Errors
/// Same as [`subadd_value`], and the value must fit in 32 bits
pub fn subadd_integer(
    bitstream: &Bitstream,
    layout: &Layout,
    subadd: usize,
    channel: Option<usize>,
) -> Result<u32, Error> {
    let field = field_at(bitstream, layout, subadd)?;
    let (start, len) = match (channel, field.channel_width(NCHANNELS)) {
        (Some(ch), _) if ch >= NCHANNELS => return Err(Error::Channel(ch)),
        (Some(ch), Some(width)) => (subadd + ch * width, width),
        _ => (subadd, field.bits),
    };
    Ok(bitstream.value(start, len)?)
}

/// Write `value` into the field at `subadd`.
///
/// A field whose width is a multiple of [`NCHANNELS`] holds one value per channel; `channel`
/// selects which one, [`NCHANNELS`] meaning all of them. Other fields ignore `channel`.
/// # Errors
/// Returns an error on an unknown sub-address, an out of range channel or a value too large
/// for the field
pub fn set_subadd_value(
    bitstream: &mut Bitstream,
    layout: &Layout,
    subadd: usize,
    value: u32,
    channel: usize,
) -> Result<(), Error> {
    let field = field_at(bitstream, layout, subadd)?;
    let (width, chans) = if field.bits % NCHANNELS == 0 {
        let chans = match channel {
            NCHANNELS => 0..NCHANNELS,
            c if c < NCHANNELS => c..c + 1,
            c => return Err(Error::Channel(c)),
        };
        (field.bits / NCHANNELS, chans)
    } else {
        (field.bits, 0..1)
    };
    if width < 32 && value >> width != 0 {
        return Err(Error::Value {
            name: field.name.to_string(),
            value,
            bits: width,
        });
    }
    for ch in chans {
        bitstream.set_value(subadd + ch * width, width, value)?;
    }
    Ok(())
}
