//! Verifies candidate tar.gz archives against a reference plain tar and
//! optionally deletes the candidates that fail. Shares the recompression
//! verifier, so "clean" means the same thing here as it does at the end of
//! a recompression run.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use retgz::{archive, verify, RepackError};

#[derive(Parser, Debug)]
#[command(author, version, about = "Verify recompressed archives against a reference tar", long_about = None)]
struct Args {
    /// Reference archive: a plain (uncompressed) tar.
    reference: PathBuf,

    /// Candidate tar.gz archives to verify.
    #[arg(required = true)]
    candidates: Vec<PathBuf>,

    /// Remove candidates that fail verification.
    #[arg(long = "rm")]
    rm: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match clean(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error cleaning: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn clean(args: &Args) -> Result<bool, RepackError> {
    let file = File::open(&args.reference)
        .map_err(|source| RepackError::Io { source, path: args.reference.clone() })?;
    let reference = archive::entries_from_tar(BufReader::new(file), 0)?;

    let mut all_clean = true;
    for candidate in &args.candidates {
        let bytes = fs::read(candidate)
            .map_err(|source| RepackError::Io { source, path: candidate.clone() })?;

        match verify::check(&bytes, &reference) {
            Ok(()) => println!("[clean] ok: {}", candidate.display()),
            Err(e) => {
                println!("[clean] mismatch: {}: {}", candidate.display(), e);
                all_clean = false;
                if args.rm {
                    fs::remove_file(candidate)
                        .map_err(|source| RepackError::Io { source, path: candidate.clone() })?;
                }
            }
        }
    }
    Ok(all_clean)
}
