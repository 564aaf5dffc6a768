//! This module contains the logic for parsing the register-layout tables that describe the slow
//! control register of a SPIROC chip.
//!
//! Each row of the table is `name,bits,remark,subadd,default`. Rows are stored in register order,
//! so the position of a row fixes the bit offset of its field.
use kstring::KString;
use nom::{
    bytes::complete::take_till,
    character::complete::char,
    combinator::all_consuming,
    multi::separated_list1,
    IResult,
};
use std::{
    io::Read,
    path::Path,
    str::{
        from_utf8,
        FromStr,
    },
};
use thiserror::Error;

/// Number of columns every layout row must have
pub const COLUMNS: usize = 5;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Invalid UTF8 in the layout table")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("The number of array at line {line} is not correct: {columns}")]
    Columns { line: usize, columns: usize },
    #[error("Invalid `{column}` entry at line {line}: `{value}`")]
    Integer {
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("Field `{name}` at line {line} has zero width")]
    ZeroWidth { line: usize, name: String },
    #[error("Field `{name}` declares sub-address {subadd} but starts at bit {offset}")]
    Discontiguous {
        name: String,
        subadd: usize,
        offset: usize,
    },
}

/// A single named bit-field of the register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: KString,
    /// Width in bits
    pub bits: usize,
    pub remark: String,
    /// Sub-address, the bit offset of this field from the start of the data bits
    pub subadd: usize,
    /// Default value, as written in the table
    pub default: String,
}

impl Field {
    /// The width of a single channel chunk if this field holds one value per channel.
    ///
    /// A field is split when its width is a multiple of `channels` and each chunk is wider than
    /// one bit.
    #[must_use]
    pub fn channel_width(&self, channels: usize) -> Option<usize> {
        if channels == 0 || self.bits % channels != 0 {
            return None;
        }
        let width = self.bits / channels;
        (width > 1).then_some(width)
    }
}

/// An ordered register-layout table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Layout {
    fields: Vec<Field>,
}

impl Layout {
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sum of the widths of every field
    #[must_use]
    pub fn total_bits(&self) -> usize {
        self.fields.iter().map(|f| f.bits).sum()
    }

    /// Look up a field by its name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.as_str() == name)
    }

    /// Look up a field by its sub-address
    #[must_use]
    pub fn by_subadd(&self, subadd: usize) -> Option<&Field> {
        self.fields.iter().find(|f| f.subadd == subadd)
    }

    /// Iterate over the fields together with the offset they occupy when laid out contiguously
    pub fn offsets(&self) -> impl Iterator<Item = (&Field, usize)> + '_ {
        self.fields.iter().scan(0, |acc, f| {
            let start = *acc;
            *acc += f.bits;
            Some((f, start))
        })
    }

    /// Checks that every declared sub-address matches the contiguous offset of its row
    /// # Errors
    /// Returns [`Error::Discontiguous`] for the first row that disagrees
    pub fn check_contiguous(&self) -> Result<(), Error> {
        match self.offsets().find(|(f, offset)| f.subadd != *offset) {
            Some((f, offset)) => Err(Error::Discontiguous {
                name: f.name.to_string(),
                subadd: f.subadd,
                offset,
            }),
            None => Ok(()),
        }
    }
}

impl FromStr for Layout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_layout(s)
    }
}

fn cell(input: &str) -> IResult<&str, &str> {
    take_till(|c| c == ',')(input)
}

fn row(input: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(separated_list1(char(','), cell))(input)
}

fn integer(line: usize, column: &'static str, value: &str) -> Result<usize, Error> {
    value.trim().parse().map_err(|_| Error::Integer {
        line,
        column,
        value: value.to_owned(),
    })
}

/// Parse the contents of a register-layout table
/// # Errors
/// Returns an error on rows without exactly [`COLUMNS`] columns or with non-numeric widths and
/// sub-addresses
pub fn parse_layout(input: &str) -> Result<Layout, Error> {
    let mut fields = vec![];
    for (idx, line) in input.lines().enumerate() {
        let line_n = idx + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let (_, cells) = row(line).map_err(|_| Error::Columns {
            line: line_n,
            columns: 0,
        })?;
        if cells.len() != COLUMNS {
            return Err(Error::Columns {
                line: line_n,
                columns: cells.len(),
            });
        }
        let name = cells[0].trim();
        let bits = integer(line_n, "bits", cells[1])?;
        if bits == 0 {
            return Err(Error::ZeroWidth {
                line: line_n,
                name: name.to_owned(),
            });
        }
        fields.push(Field {
            name: KString::from_ref(name),
            bits,
            remark: cells[2].trim().to_owned(),
            subadd: integer(line_n, "subadd", cells[3])?,
            default: cells[4].trim().to_owned(),
        });
    }
    Ok(Layout::new(fields))
}

/// Reads a register-layout table from disk
/// # Errors
/// Returns an error on IO failures or invalid tables
pub fn read_layout_file<T>(filename: T) -> Result<Layout, Error>
where
    T: AsRef<Path>,
{
    let mut file = std::fs::File::open(filename)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    parse_layout(from_utf8(&contents)?)
}
