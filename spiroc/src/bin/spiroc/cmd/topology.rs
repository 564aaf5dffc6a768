use spiroc::{
    settings::Settings,
    topology::Topology,
};
use std::path::PathBuf;

#[derive(clap::Parser)]
pub struct Cmd {
    /// Acquisition configuration file (.xml)
    config: PathBuf,
    /// Key the topology by absolute DIF number
    #[clap(long)]
    dif: bool,
}

impl Cmd {
    pub fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let topology = Topology::from_config_with(&self.config, settings)?;
        let json = if self.dif {
            serde_json::to_string(&topology.dif_topology()?)?
        } else {
            topology.to_json()?
        };
        println!("{json}");
        Ok(())
    }
}
