use anyhow::Context;
use spiroc::xml::AcqConfig;
use std::path::PathBuf;

#[derive(clap::Parser)]
pub struct Cmd {
    /// Acquisition configuration file (.xml)
    xml: PathBuf,
    /// Name of the parameter to change
    param: String,
    /// New value of the parameter
    #[clap(allow_negative_numbers = true)]
    integer: i64,
    /// Write the result here instead of overwriting the input
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl Cmd {
    pub fn run(self) -> anyhow::Result<()> {
        println!("target xml : {}", self.xml.display());
        println!("target parameter : {}", self.param);
        let mut config = AcqConfig::open(&self.xml)
            .with_context(|| format!("Failed to read {}", self.xml.display()))?;
        let changed = config.set_param(&self.param, self.integer);
        println!("{changed} parameters changed");
        let written = match &self.output {
            Some(output) => config.write(output),
            None => config.save(),
        };
        written.context("Failed to write the configuration")
    }
}
