mod catalog;
mod classify;
mod cli;
mod config;
mod engine;
mod model;
mod sink;
mod storage;
mod transport;

use std::process;

use config::Config;

fn main() {
    // RUST_LOG overrides; warnings and errors only by default.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(&config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
