pub mod change_xml;
pub mod check_all;
pub mod decode;
pub mod edit;
pub mod fill;
pub mod topology;

use anyhow::Context;
use spiroc::{
    bitstream::Bitstream,
    core::ChipKind,
    settings::Settings,
};
use spiroc_utils::layout::Layout;
use std::path::PathBuf;

/// Options shared by the commands working on a bitstream text file
#[derive(clap::Parser)]
pub struct BitstreamOptions {
    /// Chip type: spiroc2b or spiroc2d
    #[clap(short, long)]
    pub chip: ChipKind,
    /// Bitstream text file (.txt)
    #[clap(short = 'f', long = "file")]
    pub file: PathBuf,
}

impl BitstreamOptions {
    pub fn load(&self, settings: &Settings) -> anyhow::Result<(Bitstream, Layout)> {
        let layout = settings
            .layout(self.chip)
            .with_context(|| format!("Failed to read the {} layout table", self.chip))?;
        let bitstream = Bitstream::open(self.chip, &self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        Ok((bitstream, layout))
    }
}
