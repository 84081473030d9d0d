use clap::Parser;
use env_logger::Env;
use tabular_processor::cli::{self, Cli};

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    if let Err(e) = cli::run(args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
