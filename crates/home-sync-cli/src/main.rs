mod args;
mod commands;

use clap::Parser;
use std::process::ExitCode;

use args::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    commands::run_cli(cli).await
}
