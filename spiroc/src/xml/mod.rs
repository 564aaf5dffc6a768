//! The XML documents of the acquisition software: the acquisition configuration holding the
//! bitstream of every chip, and the per channel calibration documents.

pub mod acq;
pub mod calib;

pub use acq::AcqConfig;
pub use calib::CalibDoc;

use crate::{
    bitstream,
    decode,
};
use std::{
    ffi::OsStr,
    fs::File,
    io::BufReader,
    path::{
        Path,
        PathBuf,
    },
};
use thiserror::Error;
use tracing::info;
use xmltree::{
    Element,
    EmitterConfig,
    XMLNode,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] xmltree::ParseError),
    #[error(transparent)]
    Write(#[from] xmltree::Error),
    #[error(transparent)]
    Bitstream(#[from] bitstream::Error),
    #[error(transparent)]
    Decode(#[from] decode::Error),
    #[error("wrong extension! file must be .xml: {0}")]
    Extension(PathBuf),
    #[error("There is no such file: {0}")]
    NoSuchFile(PathBuf),
    #[error("Element {0} doesn't exist")]
    ElementNotFound(String),
    #[error("Element `{name}` holds `{value}`, which is not a number")]
    Number { name: String, value: String },
    #[error("Read different chip config: expected {expected}, found {found}")]
    DifferentChip { expected: i64, found: i64 },
    #[error("Read different channel config: expected {expected}, found {found}")]
    DifferentChannel { expected: i64, found: i64 },
    #[error("Chip {0} is out of range")]
    Chip(usize),
    #[error("The document was not read from a file")]
    NoPath,
}

/// Checks that `path` names an existing `.xml` file
pub(crate) fn check_xml_path(path: &Path) -> Result<(), Error> {
    if path.extension() != Some(OsStr::new("xml")) {
        return Err(Error::Extension(path.into()));
    }
    if !path.is_file() {
        return Err(Error::NoSuchFile(path.into()));
    }
    Ok(())
}

pub(crate) fn read_root(path: &Path) -> Result<Element, Error> {
    check_xml_path(path)?;
    Ok(Element::parse(BufReader::new(File::open(path)?))?)
}

/// Write `root` with an XML declaration, overwriting `path`
pub(crate) fn write_root(root: &Element, path: &Path) -> Result<(), Error> {
    let config = EmitterConfig::new().perform_indent(true);
    root.write_with_config(File::create(path)?, config)?;
    info!(?path, "Wrote XML document");
    Ok(())
}

pub(crate) fn elements<'a>(parent: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    parent.children.iter().filter_map(move |node| match node {
        XMLNode::Element(e) if e.name == name => Some(e),
        _ => None,
    })
}

pub(crate) fn elements_mut<'a>(
    parent: &'a mut Element,
    name: &'a str,
) -> impl Iterator<Item = &'a mut Element> {
    parent.children.iter_mut().filter_map(move |node| match node {
        XMLNode::Element(e) if e.name == name => Some(e),
        _ => None,
    })
}

pub(crate) fn name_attr(element: &Element) -> Option<&str> {
    element.attributes.get("name").map(String::as_str)
}

pub(crate) fn text(element: &Element) -> String {
    element
        .get_text()
        .map(|t| t.trim().to_owned())
        .unwrap_or_default()
}

pub(crate) fn set_text(element: &mut Element, value: impl Into<String>) {
    element.children = vec![XMLNode::Text(value.into())];
}

pub(crate) fn child<'a>(parent: &'a Element, name: &str) -> Result<&'a Element, Error> {
    parent
        .get_child(name)
        .ok_or_else(|| Error::ElementNotFound(name.to_owned()))
}

pub(crate) fn child_mut<'a>(parent: &'a mut Element, name: &str) -> Result<&'a mut Element, Error> {
    parent
        .get_mut_child(name)
        .ok_or_else(|| Error::ElementNotFound(name.to_owned()))
}
