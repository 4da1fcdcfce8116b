use clap::Parser;
use sqlbridge_rs::cli::args::Cli;
use sqlbridge_rs::cli::dispatch::handle;

fn main() {
    let cli = Cli::parse();
    handle(cli);
}
