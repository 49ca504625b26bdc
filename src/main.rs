use clap::Parser;

mod commands;
mod utils;

fn main() -> anyhow::Result<()> {
    commands::Commands::parse().start()
}
