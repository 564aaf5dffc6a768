use crate::{
    bitstream::Bitstream,
    core::{
        check_chip_id as check,
        ChipKind,
    },
    decode::decode,
    settings::Settings,
    topology::Topology,
};
use pyo3::prelude::*;

/// JSON topology of an acquisition configuration file
#[pyfunction]
fn topology_json(path: &str) -> anyhow::Result<String> {
    Ok(Topology::from_config(path)?.to_json()?)
}

/// `(name, subadd, value)` of every field of a bitstream line
#[pyfunction]
fn decode_bitstream(chip: &str, line: &str) -> anyhow::Result<Vec<(String, usize, String)>> {
    let kind: ChipKind = chip.parse()?;
    let layout = Settings::from_env().layout(kind)?;
    let bitstream = Bitstream::from_hex_line(kind, line)?;
    Ok(decode(&bitstream, &layout)?
        .into_iter()
        .map(|f| (f.name.to_string(), f.subadd, f.value.to_string()))
        .collect())
}

#[pyfunction]
fn check_chip_id(chip_id: i16, n_chips: u16) -> bool {
    check(chip_id, n_chips)
}

#[pymodule]
fn spiroc(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(topology_json, m)?)?;
    m.add_function(wrap_pyfunction!(decode_bitstream, m)?)?;
    m.add_function(wrap_pyfunction!(check_chip_id, m)?)?;
    Ok(())
}
