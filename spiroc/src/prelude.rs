//! Prelude (helpful reexports) for this package

pub use crate::{
    bitstream::Bitstream,
    core::{
        check_chip_id,
        ChipKind,
        NCHANNELS,
        NCHIPS,
    },
    decode::{
        decode,
        select,
        DecodedField,
        FieldValue,
    },
    settings::Settings,
    topology::Topology,
    xml::{
        AcqConfig,
        CalibDoc,
    },
};
pub use spiroc_utils::layout::{
    read_layout_file,
    Layout,
};
