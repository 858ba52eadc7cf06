//! ngramdex CLI binary.

use std::io::Write;
use std::process;

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use ngramdex::cli::args::NgramdexArgs;
use ngramdex::cli::commands::execute_command;

/// Our own messages follow `-v`/`-q`; dependencies (hyper, axum) stay at warn.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    Builder::new()
        .filter_level(level.min(LevelFilter::Warn))
        .filter_module("ngramdex", level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

fn main() {
    let args = NgramdexArgs::parse();
    init_logging(args.verbosity());

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
