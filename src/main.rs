use clap::Parser;
use soa_consolidator_lib::commands::{self, Cli};

fn main() {
    soa_consolidator_lib::init_tracing();
    let cli = Cli::parse();
    if let Err(e) = commands::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
