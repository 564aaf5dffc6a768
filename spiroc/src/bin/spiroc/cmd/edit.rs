use super::BitstreamOptions;
use anyhow::{
    anyhow,
    Context,
};
use clap::ArgGroup;
use spiroc::{
    bitstream::Bitstream,
    core::NCHANNELS,
    decode::set_subadd_value,
    settings::Settings,
};
use std::path::PathBuf;

/// Parameters that can be changed by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Param {
    Trigth,
    Gainth,
    InputDac,
    AmpDac,
    TrigAdj,
    ChipId,
}

impl Param {
    fn apply(self, bitstream: &mut Bitstream, channel: usize, value: u32) -> anyhow::Result<()> {
        let applied = match self {
            Param::Trigth => bitstream.set_trigth(value),
            Param::Gainth => bitstream.set_gainth(value),
            Param::InputDac => bitstream.set_input_dac(channel, value),
            Param::AmpDac => bitstream.set_amp_dac(channel, value),
            Param::TrigAdj => bitstream.set_trig_adj(channel, value),
            Param::ChipId => bitstream.set_chip_id(value),
        };
        Ok(applied?)
    }
}

#[derive(clap::Parser)]
#[clap(group(ArgGroup::new("target").required(true).args(["param", "subadd"])))]
pub struct Cmd {
    #[clap(flatten)]
    common: BitstreamOptions,
    /// Named parameter to change (spiroc2d only)
    #[clap(short, long, value_enum)]
    param: Option<Param>,
    /// Sub-address of the field to change
    #[clap(short, long)]
    subadd: Option<usize>,
    /// New value
    #[clap(short, long)]
    value: u32,
    /// Channel to change, from 0 to 35, or 36 for all of them
    #[clap(short = 'b', long = "subbit", default_value_t = NCHANNELS)]
    channel: usize,
    /// Name of the output file, prefixed with the chip type
    #[clap(short, long, default_value = "new_config.txt", conflicts_with = "overwrite")]
    output: PathBuf,
    /// Overwrite the input file
    #[clap(short = 'r', long)]
    overwrite: bool,
}

impl Cmd {
    fn output_path(&self) -> anyhow::Result<PathBuf> {
        if self.overwrite {
            return Ok(self.common.file.clone());
        }
        let name = self
            .output
            .file_name()
            .ok_or_else(|| anyhow!("Invalid output file {}", self.output.display()))?;
        Ok(self.output.with_file_name(format!(
            "{}_{}",
            self.common.chip,
            name.to_string_lossy()
        )))
    }

    pub fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let (mut bitstream, layout) = self.common.load(settings)?;
        match (self.param, self.subadd) {
            (Some(param), _) => param.apply(&mut bitstream, self.channel, self.value)?,
            (None, Some(subadd)) => {
                set_subadd_value(&mut bitstream, &layout, subadd, self.value, self.channel)?;
            }
            (None, None) => return Err(anyhow!("Select sub-address.")),
        }
        let output = self.output_path()?;
        bitstream
            .write(&output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("{}", output.display());
        Ok(())
    }
}
