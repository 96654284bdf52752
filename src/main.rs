use std::env;
use std::process;

use tracing::{info, Level};

use minnow::cli::{usage, CliOptions};
use minnow::driver::{compile_to_file, format_error, read_source};

fn main() {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "minnow".to_string());

    let opts = match CliOptions::parse(args) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{}", usage(&program));
            process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(if opts.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(input = %opts.input.display(), output = %opts.output.display(), "compiling");

    let source = match read_source(&opts.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", format_error("", &e));
            process::exit(1);
        }
    };

    if let Err(e) = compile_to_file(&source, &opts.output) {
        eprintln!("{}", format_error(&source, &e));
        process::exit(1);
    }
}
