use clap::Parser;
use env_logger::{Builder, Env};

use prefsync_cli::Cli;

fn main() {
    Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if let Err(e) = prefsync_cli::run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
