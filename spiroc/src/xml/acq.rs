//! The acquisition configuration document, `ecal/domain/acqpc/gdcc/dif/asu`.
//!
//! GDCCs, DIFs and ASUs are named `gdcc_1_G`, `dif_1_G_D` and `asu_1_G_D_A`, counting from 1.
use super::{
    child,
    child_mut,
    elements,
    elements_mut,
    name_attr,
    read_root,
    set_text,
    text,
    write_root,
    Error,
};
use crate::{
    bitstream::Bitstream,
    core::{
        ChipKind,
        NCHIPS,
    },
};
use std::{
    io::Read,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::{
    debug,
    info,
};
use xmltree::{
    Element,
    XMLNode,
};

pub const BITSTREAM_PARAM: &str = "spiroc2d_bitstream";

#[must_use]
pub fn gdcc_name(gdcc: usize) -> String {
    format!("gdcc_1_{gdcc}")
}

#[must_use]
pub fn dif_name(gdcc: usize, dif: usize) -> String {
    format!("dif_1_{gdcc}_{dif}")
}

#[must_use]
pub fn asu_name(gdcc: usize, dif: usize, asu: usize) -> String {
    format!("asu_1_{gdcc}_{dif}_{asu}")
}

#[derive(Debug, Clone)]
pub struct AcqConfig {
    root: Element,
    path: Option<PathBuf>,
}

impl AcqConfig {
    /// Read the configuration from an `.xml` file
    /// # Errors
    /// Returns an error on a wrong extension, a missing file or malformed XML
    pub fn open<T>(filename: T) -> Result<Self, Error>
    where
        T: AsRef<Path>,
    {
        let path = filename.as_ref();
        Ok(Self {
            root: read_root(path)?,
            path: Some(path.into()),
        })
    }

    /// # Errors
    /// Returns an error on malformed XML
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        Ok(Self {
            root: Element::parse(reader)?,
            path: None,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The `acqpc` element. The document root may be `ecal` itself or hold it.
    /// # Errors
    /// Returns an error if any level of the hierarchy is missing
    pub fn acqpc(&self) -> Result<&Element, Error> {
        let ecal = if self.root.name == "ecal" {
            &self.root
        } else {
            child(&self.root, "ecal")?
        };
        child(child(ecal, "domain")?, "acqpc")
    }

    fn acqpc_mut(&mut self) -> Result<&mut Element, Error> {
        let ecal = if self.root.name == "ecal" {
            &mut self.root
        } else {
            child_mut(&mut self.root, "ecal")?
        };
        child_mut(child_mut(ecal, "domain")?, "acqpc")
    }

    /// Every ASU of every DIF of every GDCC, in document order
    /// # Errors
    /// Returns an error if the `acqpc` element is missing
    pub fn asus(&self) -> Result<impl Iterator<Item = &Element>, Error> {
        Ok(elements(self.acqpc()?, "gdcc")
            .flat_map(|g| elements(g, "dif"))
            .flat_map(|d| elements(d, "asu")))
    }

    fn asu(&self, gdcc: usize, dif: usize, asu: usize) -> Result<&Element, Error> {
        let name = asu_name(gdcc, dif, asu);
        self.asus()?
            .find(|a| name_attr(a) == Some(name.as_str()))
            .ok_or(Error::ElementNotFound(name))
    }

    fn asu_mut(&mut self, gdcc: usize, dif: usize, asu: usize) -> Result<&mut Element, Error> {
        let name = asu_name(gdcc, dif, asu);
        elements_mut(self.acqpc_mut()?, "gdcc")
            .flat_map(|g| elements_mut(g, "dif"))
            .flat_map(|d| elements_mut(d, "asu"))
            .find(|a| name_attr(a) == Some(name.as_str()))
            .ok_or(Error::ElementNotFound(name))
    }

    /// Set every `param` called `name` below any ASU to `value`, returning how many were changed
    pub fn set_param(&mut self, name: &str, value: i64) -> usize {
        fn visit(element: &mut Element, asu: Option<&str>, name: &str, value: i64) -> usize {
            let asu = if element.name == "asu" {
                Some(name_attr(element).unwrap_or_default().to_owned())
            } else {
                asu.map(str::to_owned)
            };
            if let Some(asu_name) = &asu {
                if element.name == "param" && name_attr(element) == Some(name) {
                    set_text(element, value.to_string());
                    info!(asu = %asu_name, param = name, value, "Changed parameter");
                    return 1;
                }
            }
            element
                .children
                .iter_mut()
                .filter_map(|node| match node {
                    XMLNode::Element(e) => Some(e),
                    _ => None,
                })
                .map(|e| visit(e, asu.as_deref(), name, value))
                .sum()
        }
        visit(&mut self.root, None, name, value)
    }

    /// The text of the first `param` called `name` of an ASU
    #[must_use]
    pub fn param(&self, gdcc: usize, dif: usize, asu: usize, name: &str) -> Option<String> {
        fn find(element: &Element, name: &str) -> Option<String> {
            if element.name == "param" && name_attr(element) == Some(name) {
                return Some(text(element));
            }
            element.children.iter().find_map(|node| match node {
                XMLNode::Element(e) => find(e, name),
                _ => None,
            })
        }
        let asu = self.asu(gdcc, dif, asu).ok()?;
        asu.children.iter().find_map(|node| match node {
            XMLNode::Element(e) => find(e, name),
            _ => None,
        })
    }

    /// The bitstream of the 0-based `chip` of a DIF
    /// # Errors
    /// Returns an error if the chip or its bitstream is missing or malformed
    pub fn bitstream(&self, gdcc: usize, dif: usize, chip: usize) -> Result<Bitstream, Error> {
        let asu = self.asu(gdcc, dif, chip + 1)?;
        let param = elements(child(asu, ChipKind::Spiroc2d.name())?, "param")
            .find(|p| name_attr(p) == Some(BITSTREAM_PARAM))
            .ok_or_else(|| Error::ElementNotFound(BITSTREAM_PARAM.to_owned()))?;
        debug!(gdcc, dif, chip, "Reading bitstream");
        Ok(Bitstream::from_xml_text(ChipKind::Spiroc2d, &text(param))?)
    }

    /// Replace the bitstream of the 0-based `chip` of a DIF
    /// # Errors
    /// Returns an error if the chip or its bitstream is missing
    pub fn set_bitstream(
        &mut self,
        gdcc: usize,
        dif: usize,
        chip: usize,
        bitstream: &Bitstream,
    ) -> Result<(), Error> {
        let value = bitstream.to_xml_text()?;
        let asu = self.asu_mut(gdcc, dif, chip + 1)?;
        let param = elements_mut(child_mut(asu, ChipKind::Spiroc2d.name())?, "param")
            .find(|p| name_attr(p) == Some(BITSTREAM_PARAM))
            .ok_or_else(|| Error::ElementNotFound(BITSTREAM_PARAM.to_owned()))?;
        set_text(param, value);
        info!(gdcc, dif, chip, "Changed bitstream");
        Ok(())
    }

    /// The `[trigth, gainth, input DAC, amplifier DAC, adjustable threshold]` of the first
    /// `n_chans` channels of a chip
    /// # Errors
    /// Returns an error if the chip is out of range or its bitstream can not be read
    pub fn chip_config(
        &self,
        gdcc: usize,
        dif: usize,
        chip: usize,
        n_chans: usize,
    ) -> Result<Vec<[u32; 5]>, Error> {
        if chip >= NCHIPS {
            return Err(Error::Chip(chip));
        }
        let bitstream = self.bitstream(gdcc, dif, chip)?;
        let trigth = bitstream.trigth()?;
        let gainth = bitstream.gainth()?;
        (0..n_chans)
            .map(|ch| {
                Ok([
                    trigth,
                    gainth,
                    bitstream.input_dac(ch)?,
                    bitstream.amp_dac(ch)?,
                    bitstream.trig_adj(ch)?,
                ])
            })
            .collect()
    }

    /// # Errors
    /// Returns an error on IO failures
    pub fn write<T>(&self, filename: T) -> Result<(), Error>
    where
        T: AsRef<Path>,
    {
        write_root(&self.root, filename.as_ref())
    }

    /// Overwrite the file this document was read from
    /// # Errors
    /// Returns an error on IO failures or if the document was not read from a file
    pub fn save(&self) -> Result<(), Error> {
        let path = self.path.as_ref().ok_or(Error::NoPath)?;
        write_root(&self.root, path)
    }
}
