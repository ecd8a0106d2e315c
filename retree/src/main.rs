use clap::Parser;
use log::error;
use retree::config::{Cli, Config};
use std::{
    io::{self, IsTerminal},
    process::ExitCode,
};

fn main() -> ExitCode {
    env_logger::init();

    // cmd.exe はクォートを除去せずに引数を渡す
    let config = Config {
        color: io::stdout().is_terminal(),
        ..Config::from_cli(Cli::parse(), cfg!(windows))
    };

    match retree::run(config, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:?}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
