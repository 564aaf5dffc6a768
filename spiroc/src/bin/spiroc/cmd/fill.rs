use anyhow::Context;
use spiroc::{
    core::ChipKind,
    settings::Settings,
    xml::{
        AcqConfig,
        CalibDoc,
    },
};
use std::path::PathBuf;

#[derive(clap::Parser)]
pub struct Cmd {
    /// Acquisition configuration file (.xml)
    #[clap(short = 'f', long = "inputfile")]
    input: PathBuf,
    /// Calibration document to fill (.xml), overwritten
    #[clap(short = 'o', long = "outputfile")]
    output: PathBuf,
    /// Chip number, from 0
    #[clap(short = 'i', long = "chip_num")]
    chip: usize,
    /// Channel number, from 0
    #[clap(short = 'j', long = "chan_num")]
    chan: usize,
}

impl Cmd {
    pub fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let layout = settings.layout(ChipKind::Spiroc2d)?;
        let config = AcqConfig::open(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let bitstream = config.bitstream(1, 1, self.chip)?;
        let mut doc = CalibDoc::open(&self.output)
            .with_context(|| format!("Failed to read {}", self.output.display()))?;
        doc.fill_from_bitstream(&bitstream, &layout, self.chip, self.chan)?;
        doc.write(&self.output)?;
        Ok(())
    }
}
