mod app;
mod cache;
mod cli;
mod config;
mod consts;
mod decision;
mod error;
mod hooks;
mod output;
mod statusline;
mod store;
mod utils;

use clap::Parser;

use cli::Cli;
use config::Config;
use utils::init_logging;

fn main() {
    let config = Config::load();
    let cli = Cli::parse().with_config(&config);

    init_logging(cli.debug);
    config.report();

    if let Err(e) = app::run(&cli, &config) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
