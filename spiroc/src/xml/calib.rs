//! Per channel calibration documents
//!
//! ```xml
//! <data>
//!   <config><chipid>0</chipid><chanid>0</chanid>...</config>
//!   <ch><col_0/>...</ch>
//! </data>
//! ```
use super::{
    child,
    child_mut,
    elements,
    elements_mut,
    read_root,
    set_text,
    text,
    write_root,
    Error,
};
use crate::{
    bitstream::{
        params::{
            AMP_DAC,
            GAINTH,
            INPUT_DAC,
            TRIGTH,
            TRIG_ADJ,
        },
        Bitstream,
    },
    decode::subadd_integer,
};
use spiroc_utils::layout::Layout;
use std::path::Path;
use tracing::debug;
use xmltree::{
    Element,
    XMLNode,
};

/// Elements of `config` that start out unset (`-1`)
const CONFIG_VALUES: [&str; 6] = ["trigth", "gainth", "inputDAC", "HG", "LG", "trig_adj"];

fn col_name(icol: usize) -> String {
    format!("col_{icol}")
}

fn text_element(name: &str, value: impl Into<String>) -> Element {
    let mut element = Element::new(name);
    set_text(&mut element, value);
    element
}

fn push(parent: &mut Element, element: Element) {
    parent.children.push(XMLNode::Element(element));
}

fn number<T: std::str::FromStr>(element: &Element, name: &str) -> Result<T, Error> {
    let value = text(element);
    value.parse().map_err(|_| Error::Number {
        name: name.to_owned(),
        value,
    })
}

/// Find or create the element called `name` below `parent`, and give it `value`
fn set_child_text(
    parent: &mut Element,
    name: &str,
    value: String,
    create: bool,
) -> Result<(), Error> {
    match parent.get_mut_child(name) {
        Some(target) => set_text(target, value),
        None if create => push(parent, text_element(name, value)),
        None => return Err(Error::ElementNotFound(name.to_owned())),
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct CalibDoc {
    root: Element,
}

impl CalibDoc {
    /// A blank document for one channel, with `n_cols` memory columns
    #[must_use]
    pub fn make(chip: usize, chan: usize, n_cols: usize) -> Self {
        let mut config = Element::new("config");
        push(&mut config, text_element("chipid", chip.to_string()));
        push(&mut config, text_element("chanid", chan.to_string()));
        push(&mut config, text_element("start_time", "0"));
        push(&mut config, text_element("stop_time", "0"));
        for name in CONFIG_VALUES {
            push(&mut config, text_element(name, "-1"));
        }
        let mut ch = Element::new("ch");
        for icol in 0..n_cols {
            push(&mut ch, Element::new(&col_name(icol)));
        }
        let mut root = Element::new("data");
        push(&mut root, config);
        push(&mut root, ch);
        Self { root }
    }

    /// # Errors
    /// Returns an error on a wrong extension, a missing file or malformed XML
    pub fn open<T>(filename: T) -> Result<Self, Error>
    where
        T: AsRef<Path>,
    {
        Ok(Self {
            root: read_root(filename.as_ref())?,
        })
    }

    /// # Errors
    /// Returns an error on IO failures
    pub fn write<T>(&self, filename: T) -> Result<(), Error>
    where
        T: AsRef<Path>,
    {
        write_root(&self.root, filename.as_ref())
    }

    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// # Errors
    /// Returns an error if the element is missing or not an integer
    pub fn config_value(&self, name: &str) -> Result<i64, Error> {
        number(child(child(&self.root, "config")?, name)?, name)
    }

    /// # Errors
    /// Returns an error if the element is missing and `create` is false
    pub fn set_config_value(&mut self, name: &str, value: i64, create: bool) -> Result<(), Error> {
        let config = child_mut(&mut self.root, "config")?;
        set_child_text(config, name, value.to_string(), create)
    }

    /// # Errors
    /// Returns an error if the element is missing or not a number
    pub fn col_value(&self, name: &str, icol: usize) -> Result<f64, Error> {
        let col = child(child(&self.root, "ch")?, &col_name(icol))?;
        number(child(col, name)?, name)
    }

    /// # Errors
    /// Returns an error if the column is missing, or the element is missing and `create` is false
    pub fn set_col_value(
        &mut self,
        name: &str,
        icol: usize,
        value: f64,
        create: bool,
    ) -> Result<(), Error> {
        let col = child_mut(child_mut(&mut self.root, "ch")?, &col_name(icol))?;
        set_child_text(col, name, format!("{value:.2}"), create)
    }

    /// # Errors
    /// Returns an error if the element is missing or not a number
    pub fn ch_value(&self, name: &str) -> Result<f64, Error> {
        number(child(child(&self.root, "ch")?, name)?, name)
    }

    /// # Errors
    /// Returns an error if the element is missing and `create` is false
    pub fn set_ch_value(&mut self, name: &str, value: f64, create: bool) -> Result<(), Error> {
        let ch = child_mut(&mut self.root, "ch")?;
        set_child_text(ch, name, format!("{value:.2}"), create)
    }

    /// Fill every `config` element from the bitstream of `chip`, channel `chan`
    /// # Errors
    /// Returns an error if a `config` element describes another chip or channel, or if the
    /// bitstream does not hold the fields
    pub fn fill_from_bitstream(
        &mut self,
        bitstream: &Bitstream,
        layout: &Layout,
        chip: usize,
        chan: usize,
    ) -> Result<(), Error> {
        let expected_chip = i64::try_from(chip).unwrap_or(i64::MAX);
        let expected_chan = i64::try_from(chan).unwrap_or(i64::MAX);
        for config in elements(&self.root, "config") {
            let found: i64 = number(child(config, "chipid")?, "chipid")?;
            if found != expected_chip {
                return Err(Error::DifferentChip {
                    expected: expected_chip,
                    found,
                });
            }
            let found: i64 = number(child(config, "chanid")?, "chanid")?;
            if found != expected_chan {
                return Err(Error::DifferentChannel {
                    expected: expected_chan,
                    found,
                });
            }
        }

        let channel = Some(chan);
        let trigth = subadd_integer(bitstream, layout, TRIGTH.start, None)?;
        let gainth = subadd_integer(bitstream, layout, GAINTH.start, None)?;
        let input_dac = subadd_integer(bitstream, layout, INPUT_DAC.start, channel)? / 2;
        let amp = subadd_integer(bitstream, layout, AMP_DAC.start, channel)? / 8;
        let trig_adj = subadd_integer(bitstream, layout, TRIG_ADJ.start, channel)?;
        let values = [
            ("trigth", trigth),
            ("gainth", gainth),
            ("inputDAC", input_dac),
            ("HG", amp / 64),
            ("LG", amp % 64),
            ("trig_adj", trig_adj),
        ];
        debug!(chip, chan, ?values, "Filling calibration config");

        for config in elements_mut(&mut self.root, "config") {
            for (name, value) in values {
                set_child_text(config, name, value.to_string(), false)?;
            }
        }
        Ok(())
    }

    /// Number of `config` elements
    #[must_use]
    pub fn configs(&self) -> usize {
        elements(&self.root, "config").count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::ChipKind,
        settings::builtin_layout,
    };

    #[test]
    fn test_make() {
        let doc = CalibDoc::make(3, 17, 16);
        assert_eq!(doc.configs(), 1);
        assert_eq!(doc.config_value("chipid").unwrap(), 3);
        assert_eq!(doc.config_value("chanid").unwrap(), 17);
        assert_eq!(doc.config_value("start_time").unwrap(), 0);
        for name in CONFIG_VALUES {
            assert_eq!(doc.config_value(name).unwrap(), -1);
        }
        let ch = child(&doc.root, "ch").unwrap();
        assert_eq!(ch.children.len(), 16);
        assert!(ch.get_child("col_15").is_some());
    }

    #[test]
    fn test_config_value() {
        let mut doc = CalibDoc::make(0, 0, 1);
        doc.set_config_value("trigth", 250, false).unwrap();
        assert_eq!(doc.config_value("trigth").unwrap(), 250);
        assert!(matches!(
            doc.set_config_value("spill", 1, false),
            Err(Error::ElementNotFound(_))
        ));
        doc.set_config_value("spill", 1, true).unwrap();
        assert_eq!(doc.config_value("spill").unwrap(), 1);
    }

    #[test]
    fn test_col_and_ch_values() {
        let mut doc = CalibDoc::make(0, 0, 2);
        assert!(matches!(
            doc.col_value("pe1", 1),
            Err(Error::ElementNotFound(_))
        ));
        doc.set_col_value("pe1", 1, 12.345, true).unwrap();
        assert!((doc.col_value("pe1", 1).unwrap() - 12.35).abs() < 1e-9);
        assert!(doc.set_col_value("pe1", 2, 1.0, true).is_err());
        doc.set_ch_value("gain", 40.0, true).unwrap();
        assert!((doc.ch_value("gain").unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_from_bitstream() {
        let layout = builtin_layout(ChipKind::Spiroc2d).unwrap();
        let mut bs = Bitstream::from_defaults(ChipKind::Spiroc2d, &layout).unwrap();
        bs.set_input_dac(5, 121).unwrap();
        bs.set_amp_dac(5, 40).unwrap();
        bs.set_trig_adj(5, 7).unwrap();

        let mut doc = CalibDoc::make(2, 5, 1);
        doc.fill_from_bitstream(&bs, &layout, 2, 5).unwrap();
        assert_eq!(doc.config_value("trigth").unwrap(), 250);
        assert_eq!(doc.config_value("gainth").unwrap(), 500);
        assert_eq!(doc.config_value("inputDAC").unwrap(), 121);
        assert_eq!(doc.config_value("HG").unwrap(), 40);
        assert_eq!(doc.config_value("LG").unwrap(), 40);
        assert_eq!(doc.config_value("trig_adj").unwrap(), 7);

        assert!(matches!(
            doc.fill_from_bitstream(&bs, &layout, 3, 5),
            Err(Error::DifferentChip {
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            doc.fill_from_bitstream(&bs, &layout, 2, 4),
            Err(Error::DifferentChannel { .. })
        ));
        // The document is checked before the bitstream is read
        assert!(matches!(
            doc.fill_from_bitstream(&bs, &layout, 2, 40),
            Err(Error::DifferentChannel {
                expected: 40,
                found: 5
            })
        ));
        assert_eq!(doc.config_value("trig_adj").unwrap(), 7);
    }
}
