//! Main entry point for the retgz CLI.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use retgz::cli::Args;
use retgz::{Options, RepackError};

fn main() -> ExitCode {
    let args = Args::parse();
    let opts = args.options();

    let mut failed = false;
    for input in &args.inputs {
        if let Err(e) = run_one(&args, &opts, input) {
            eprintln!("error recompressing {}: {}", input.display(), e);
            // Encoder failures are configuration bugs; no later input
            // would fare better.
            if e.is_fatal() {
                return ExitCode::FAILURE;
            }
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_one(args: &Args, opts: &Options, input: &Path) -> Result<(), RepackError> {
    let bytes = retgz::recompress_path(input, opts)?;

    if let Some(out) = &args.output {
        println!("[write] {} ({} bytes)", out.display(), bytes.len());
        fs::write(out, &bytes).map_err(|source| RepackError::Io { source, path: out.clone() })?;
    }
    Ok(())
}
