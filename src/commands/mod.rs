use clap::{Parser, Subcommand};

pub mod decode;
pub mod encode;
pub mod replace;

#[derive(Parser)]
#[command(
    name = "unvivtool",
    author,
    version,
    arg_required_else_help = true,
    about = "decode, encode and patch BIGF/BIGH/BIG4/C0FB archives"
)]
pub struct Commands {
    #[command(subcommand)]
    pub operation: Operation,
    /// print extra diagnostics (entry counts, skipped paths, warnings)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

impl Commands {
    pub fn start(self) -> anyhow::Result<()> {
        let level = if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .init();

        match self.operation {
            Operation::D(cmd) => cmd.start(),
            Operation::E(cmd) => cmd.start(),
            Operation::R(cmd) => cmd.start(),
        }
    }
}

#[derive(Subcommand)]
pub enum Operation {
    /// decode (extract) an archive
    #[command(name = "d")]
    D(decode::Args),
    /// encode (create) an archive
    #[command(name = "e")]
    E(encode::Args),
    /// replace one entry in an existing archive
    #[command(name = "r")]
    R(replace::Args),
}
