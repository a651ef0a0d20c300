use std::io;
use std::process::ExitCode;

use clap::Parser;

use nfe_client_rs::*;

fn main() -> ExitCode {
    env_logger::init();
    let args = Cli::parse();
    if let Err(e) = run(&args, &mut io::stdout().lock()) {
        log::error!("{:#}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
