//! The number of GDCCs, DIFs, chips and channels described by an acquisition configuration
//!
//! The topology is keyed by 1-based indices rendered as strings, as in
//! `{"1": {"1": {"1": 32, "2": 32}}}` for one GDCC with one DIF reading two chips.

pub mod native;

use crate::{
    settings::Settings,
    xml::{
        self,
        acq::{
            asu_name,
            dif_name,
            gdcc_name,
        },
        elements,
        name_attr,
        text,
        AcqConfig,
    },
};
use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::Path,
};
use thiserror::Error;
use tracing::{
    debug,
    warn,
};

/// The parameter holding the dash separated list of enabled channels of a chip
pub const ENABLED_CHANNELS_PARAM: &str = "spiroc2d_enable_preamp_chans";

/// GDCC -> DIF -> ASU -> number of channels
pub type TopologyMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, u32>>>;
/// Absolute DIF -> ASU -> number of channels
pub type DifTopologyMap = BTreeMap<String, BTreeMap<String, u32>>;
/// GDCC -> DIF -> absolute DIF
pub type DifMapping = BTreeMap<String, BTreeMap<String, u32>>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] xml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Number of channels not found for {0}")]
    ElementNotFound(String),
    #[error("Invalid list of enabled channels for {asu}: `{value}`")]
    Channels { asu: String, value: String },
    #[error("GDCC {gdcc} DIF {dif} is not in the DIF mapping")]
    NoDif { gdcc: String, dif: String },
    #[error("The topology string is empty")]
    EmptyTopology,
    #[error("The path is not valid UTF8 or holds a NUL byte")]
    Path,
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    pub map: TopologyMap,
    /// Number of DIFs over all the GDCCs
    pub max_difs: usize,
    /// Largest number of chips read by one DIF
    pub max_chips: usize,
    /// Largest number of channels of one chip
    pub max_channels: u32,
    mapping: Option<DifMapping>,
    /// (GDCC, DIF) in document order
    difs: Vec<(String, String)>,
}

/// Number of channels from a dash separated list of enabled channels, the last one plus one
fn count_channels(asu: &str, list: &str) -> Result<u32, Error> {
    list.split('-')
        .filter(|s| !s.trim().is_empty())
        .last()
        .and_then(|last| last.trim().parse::<u32>().ok())
        .map(|last| last + 1)
        .ok_or_else(|| Error::Channels {
            asu: asu.to_owned(),
            value: list.to_owned(),
        })
}

fn check_name(kind: &str, element: &xmltree::Element, expected: &str, count: usize) {
    if name_attr(element) != Some(expected) {
        warn!(
            found = ?name_attr(element),
            expected,
            "Inconsistency found when counting ({kind} = {count})"
        );
    }
}

/// Read a DIF mapping JSON file
/// # Errors
/// Returns an error on IO failures or malformed JSON
pub fn read_dif_mapping<T>(filename: T) -> Result<DifMapping, Error>
where
    T: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

impl Topology {
    /// Read the topology of an acquisition configuration file, taking the DIF mapping from the
    /// environment
    /// # Errors
    /// Returns an error if the document can not be read or misses the number of channels
    pub fn from_config<T>(filename: T) -> Result<Self, Error>
    where
        T: AsRef<Path>,
    {
        Self::from_config_with(filename, &Settings::from_env())
    }

    /// # Errors
    /// Returns an error if the document or the DIF mapping can not be read
    pub fn from_config_with<T>(filename: T, settings: &Settings) -> Result<Self, Error>
    where
        T: AsRef<Path>,
    {
        let config = AcqConfig::open(filename)?;
        let mapping = match settings.dif_mapping_file() {
            Some(path) => Some(read_dif_mapping(path)?),
            None => None,
        };
        Self::from_acq(&config, mapping)
    }

    /// # Errors
    /// Returns an error if an ASU misses the number of channels
    pub fn from_acq(config: &AcqConfig, mapping: Option<DifMapping>) -> Result<Self, Error> {
        let mut topology = Self {
            mapping,
            ..Self::default()
        };
        let acqpc = config.acqpc()?;
        for (ig, gdcc) in elements(acqpc, "gdcc").enumerate() {
            let ig = ig + 1;
            check_name("GDCC", gdcc, &gdcc_name(ig), ig);
            for (id, dif) in elements(gdcc, "dif").enumerate() {
                let id = id + 1;
                check_name("DIF", dif, &dif_name(ig, id), id);
                let mut asus = BTreeMap::new();
                for (ia, asu) in elements(dif, "asu").enumerate() {
                    let ia = ia + 1;
                    let name = asu_name(ig, id, ia);
                    check_name("ASU", asu, &name, ia);
                    let param = elements(asu, "param")
                        .find(|p| name_attr(p) == Some(ENABLED_CHANNELS_PARAM))
                        .ok_or_else(|| Error::ElementNotFound(name.clone()))?;
                    let channels = count_channels(&name, &text(param))?;
                    debug!(asu = %name, channels, "Counted channels");
                    topology.max_channels = topology.max_channels.max(channels);
                    asus.insert(ia.to_string(), channels);
                }
                topology.max_difs += 1;
                topology.max_chips = topology.max_chips.max(asus.len());
                topology
                    .map
                    .entry(ig.to_string())
                    .or_default()
                    .insert(id.to_string(), asus);
                topology.difs.push((ig.to_string(), id.to_string()));
            }
        }
        Ok(topology)
    }

    /// The absolute DIF number of `dif` of `gdcc`. Without a DIF mapping, DIFs are numbered in
    /// document order from 0.
    /// # Errors
    /// Returns an error if the pair is unknown
    pub fn dif(&self, gdcc: &str, dif: &str) -> Result<u32, Error> {
        let missing = || Error::NoDif {
            gdcc: gdcc.to_owned(),
            dif: dif.to_owned(),
        };
        match &self.mapping {
            Some(mapping) => mapping
                .get(gdcc)
                .and_then(|difs| difs.get(dif))
                .copied()
                .ok_or_else(missing),
            None => self
                .difs
                .iter()
                .position(|(g, d)| g == gdcc && d == dif)
                .and_then(|i| u32::try_from(i).ok())
                .ok_or_else(missing),
        }
    }

    /// The topology keyed by absolute DIF number
    /// # Errors
    /// Returns an error if a DIF is missing from the DIF mapping
    pub fn dif_topology(&self) -> Result<DifTopologyMap, Error> {
        let mut dif_map = DifTopologyMap::new();
        for (gdcc, difs) in &self.map {
            for (dif, asus) in difs {
                dif_map.insert(self.dif(gdcc, dif)?.to_string(), asus.clone());
            }
        }
        Ok(dif_map)
    }

    /// # Errors
    /// Returns an error if serialization fails
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.map)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// An acquisition configuration with the given number of enabled channels per DIF and chip
    pub(crate) fn document(gdccs: &[&[&[u32]]]) -> String {
        let mut doc = String::from("<ecal><domain name=\"wagasci\"><acqpc name=\"acqpc\">");
        for (ig, difs) in gdccs.iter().enumerate() {
            doc += &format!("<gdcc name=\"{}\">", gdcc_name(ig + 1));
            for (id, asus) in difs.iter().enumerate() {
                doc += &format!("<dif name=\"{}\">", dif_name(ig + 1, id + 1));
                for (ia, channels) in asus.iter().enumerate() {
                    let list: Vec<_> = (0..*channels).map(|c| c.to_string()).collect();
                    doc += &format!(
                        "<asu name=\"{}\"><param name=\"{ENABLED_CHANNELS_PARAM}\">{}</param></asu>",
                        asu_name(ig + 1, id + 1, ia + 1),
                        list.join("-")
                    );
                }
                doc += "</dif>";
            }
            doc += "</gdcc>";
        }
        doc + "</acqpc></domain></ecal>"
    }

    fn topology(gdccs: &[&[&[u32]]], mapping: Option<DifMapping>) -> Topology {
        let config = AcqConfig::from_reader(document(gdccs).as_bytes()).unwrap();
        Topology::from_acq(&config, mapping).unwrap()
    }

    #[test]
    fn test_count_channels() {
        assert_eq!(count_channels("a", "0-1-2-31").unwrap(), 32);
        assert_eq!(count_channels("a", "5").unwrap(), 6);
        assert_eq!(count_channels("a", "0-1-").unwrap(), 2);
        assert!(matches!(count_channels("a", ""), Err(Error::Channels { .. })));
        assert!(matches!(count_channels("a", "0-x"), Err(Error::Channels { .. })));
    }

    #[test]
    fn test_topology() {
        let topology = topology(&[&[&[32, 32], &[36]], &[&[1, 2, 3]]], None);
        assert_eq!(topology.max_difs, 3);
        assert_eq!(topology.max_chips, 3);
        assert_eq!(topology.max_channels, 36);
        assert_eq!(topology.map["1"]["2"]["1"], 36);
        assert_eq!(topology.map["2"]["1"]["3"], 3);
        assert_eq!(
            topology.to_json().unwrap(),
            r#"{"1":{"1":{"1":32,"2":32},"2":{"1":36}},"2":{"1":{"1":1,"2":2,"3":3}}}"#
        );
    }

    #[test]
    fn test_sequential_difs() {
        let topology = topology(&[&[&[32], &[32]], &[&[16]]], None);
        assert_eq!(topology.dif("1", "1").unwrap(), 0);
        assert_eq!(topology.dif("2", "1").unwrap(), 2);
        assert!(matches!(topology.dif("3", "1"), Err(Error::NoDif { .. })));
        let dif_map = topology.dif_topology().unwrap();
        assert_eq!(dif_map.len(), 3);
        assert_eq!(dif_map["2"]["1"], 16);
    }

    #[test]
    fn test_mapped_difs() {
        let mapping: DifMapping =
            serde_json::from_str(r#"{"1": {"1": 4, "2": 7}}"#).unwrap();
        let topology = topology(&[&[&[32], &[10]]], Some(mapping));
        assert_eq!(topology.dif("1", "2").unwrap(), 7);
        let dif_map = topology.dif_topology().unwrap();
        assert_eq!(dif_map.keys().collect::<Vec<_>>(), vec!["4", "7"]);
        assert_eq!(dif_map["7"]["1"], 10);
    }

    #[test]
    fn test_missing_channels() {
        let doc = document(&[&[&[32]]]).replace(ENABLED_CHANNELS_PARAM, "other");
        let config = AcqConfig::from_reader(doc.as_bytes()).unwrap();
        assert!(matches!(
            Topology::from_acq(&config, None),
            Err(Error::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_inconsistent_names_still_count() {
        let doc = document(&[&[&[32]]]).replace("asu_1_1_1_1", "asu_9");
        let config = AcqConfig::from_reader(doc.as_bytes()).unwrap();
        let topology = Topology::from_acq(&config, None).unwrap();
        assert_eq!(topology.map["1"]["1"]["1"], 32);
    }

    #[test]
    fn test_read_dif_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dif_mapping.txt");
        std::fs::write(&path, r#"{"1": {"1": 1, "2": 2}, "2": {"1": 5}}"#).unwrap();
        let mapping = read_dif_mapping(&path).unwrap();
        assert_eq!(mapping["2"]["1"], 5);
    }
}
