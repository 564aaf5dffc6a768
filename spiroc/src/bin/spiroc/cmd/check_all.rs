use super::BitstreamOptions;
use spiroc::{
    decode::decode_per_channel,
    settings::Settings,
};

#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    common: BitstreamOptions,
}

impl Cmd {
    pub fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let (bitstream, layout) = self.common.load(settings)?;
        for field in decode_per_channel(&bitstream, &layout)? {
            println!("{field}");
        }
        Ok(())
    }
}
