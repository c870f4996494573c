// Entry point: parse flags, set up logging, build the requested report.
//
// Exit codes: 0 on success, 2 when the input does not fit the report's
// schema (the report was refused), 1 for anything else.
use analytics_report::cli::{self, Cli};
use clap::Parser;
use std::process;

fn main() {
    let args = Cli::parse();
    cli::setup_logging(args.verbose, args.quiet);

    if let Err(e) = cli::run(&args) {
        if e.is_schema_error() {
            eprintln!("Report refused: the input does not match the report schema.");
            eprintln!("{}", e);
            process::exit(2);
        }
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
