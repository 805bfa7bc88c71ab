use clap::Parser;
use std::path::PathBuf;

use crate::order::Strategy;
use crate::{pool, Options};

#[derive(Parser, Debug)]
#[command(author, version, about = "Recompress tar.gz archives by reordering entries for a smaller gzip stream", long_about = None)]
pub struct Args {
    /// Input archives (tar, optionally gzip-wrapped).
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output path. When omitted the result is computed and verified but
    /// not written anywhere.
    #[arg(short = 'o')]
    pub output: Option<PathBuf>,

    /// Ordering strategy: 0 = greedy, 1 = exhaustive (tiny archives only),
    /// 2 = batched greedy.
    #[arg(short = 'm', default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub mode: u8,

    /// Number of worker threads. [default: logical CPUs - 1, minimum 1]
    #[arg(short = 'w')]
    pub workers: Option<usize>,

    /// Candidates committed per step with -m 2.
    #[arg(short = 'b', default_value_t = 1)]
    pub batch_size: usize,

    /// Sketch block size in bytes; entries larger than twice this are
    /// probed through a head+tail sketch. 0 disables sketching.
    #[arg(short = 'k', default_value_t = 44000)]
    pub block_size: usize,
}

impl Args {
    /// Resolves the parsed flags into library options.
    pub fn options(&self) -> Options {
        Options {
            strategy: Strategy::from_mode(self.mode).unwrap_or(Strategy::Greedy),
            workers: self.workers.unwrap_or_else(pool::default_workers).max(1),
            batch_size: self.batch_size.max(1),
            block_size: self.block_size,
        }
    }
}
