use clap::Parser;
use onelock::TeardownRegistry;
use std::process;
use tracing::Level;

mod cli;

fn main() {
    let args = cli::Args::parse();

    let level = if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    // Dropping does not happen across process::exit, so run it by hand.
    let teardown = TeardownRegistry::new();
    let exit_code = match cli::run(args, &teardown) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    teardown.run();

    process::exit(exit_code);
}
