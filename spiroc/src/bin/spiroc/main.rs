mod cmd;

use clap::Parser;
use spiroc::settings::Settings;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LevelFilter {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LevelFilter {
    fn into_tracing(self) -> tracing::level_filters::LevelFilter {
        match self {
            Self::Off => tracing::level_filters::LevelFilter::OFF,
            Self::Error => tracing::level_filters::LevelFilter::ERROR,
            Self::Warn => tracing::level_filters::LevelFilter::WARN,
            Self::Info => tracing::level_filters::LevelFilter::INFO,
            Self::Debug => tracing::level_filters::LevelFilter::DEBUG,
            Self::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

#[derive(clap::Parser)]
#[clap(name = "spiroc", about = "SPIROC2b/2d configuration tools", version)]
struct Cli {
    /// Default log level, overridden by `RUST_LOG`
    #[clap(long, global = true, value_enum, default_value = "warn")]
    log_level: LevelFilter,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(clap::Subcommand)]
enum Subcommand {
    /// Print the fields of a bitstream text file
    Decode(cmd::decode::Cmd),
    /// Change one field of a bitstream text file
    Edit(cmd::edit::Cmd),
    /// Change a parameter of every chip of an acquisition configuration
    ChangeXml(cmd::change_xml::Cmd),
    /// Fill a calibration document from the bitstream of an acquisition configuration
    Fill(cmd::fill::Cmd),
    /// Print every field of a bitstream text file, split per channel
    CheckAll(cmd::check_all::Cmd),
    /// Print the topology of an acquisition configuration as JSON
    Topology(cmd::topology::Cmd),
}

impl Subcommand {
    fn run(self, settings: &Settings) -> anyhow::Result<()> {
        match self {
            Subcommand::Decode(cmd) => cmd.run(settings),
            Subcommand::Edit(cmd) => cmd.run(settings),
            Subcommand::ChangeXml(cmd) => cmd.run(),
            Subcommand::Fill(cmd) => cmd.run(settings),
            Subcommand::CheckAll(cmd) => cmd.run(settings),
            Subcommand::Topology(cmd) => cmd.run(settings),
        }
    }
}

fn setup_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into_tracing().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.log_level);
    let settings = Settings::from_env();
    tracing::debug!(?settings, "Resolved settings");
    match cli.subcommand.run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}
