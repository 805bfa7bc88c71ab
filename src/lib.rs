//! # retgz Core Library
//!
//! This crate provides the core functionality for the `retgz` tool, which
//! shrinks tar+gzip archives by reordering their entries. Gzip's DEFLATE
//! window lets an entry back-reference the bytes of whatever precedes it,
//! so placing similar entries next to each other compresses better; the
//! entry set, headers and contents are preserved byte-for-byte.
//!
//! ## Key Modules
//!
//! - [`archive`]: Loads a tar stream into memory, with optional sketching.
//! - [`oracle`]: Scores entry adjacency via DEFLATE preset dictionaries.
//! - [`pool`]: The worker threads that fan pair probes out over CPUs.
//! - [`order`]: Greedy, batched-greedy and exhaustive ordering strategies.
//! - [`emit`]: Rewrites the permuted archive at best compression.
//! - [`verify`]: Proves the output still carries exactly the input entries.

pub mod archive;
pub mod cli;
pub mod emit;
pub mod error;
pub mod oracle;
pub mod order;
pub mod pool;
pub mod verify;

pub use error::RepackError;

use std::path::Path;
use std::sync::Arc;

use archive::TarEntry;
use order::Strategy;
use pool::Pool;

/// Holds all configuration options for a recompression run.
#[derive(Debug, Clone)]
pub struct Options {
    /// How the regular-file block of the permutation is ordered.
    pub strategy: Strategy,
    /// Worker thread count (minimum 1).
    pub workers: usize,
    /// Candidates committed per step under the batched strategy.
    pub batch_size: usize,
    /// Sketch block size in bytes; 0 disables sketching.
    pub block_size: usize,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            strategy: Strategy::Greedy,
            workers: pool::default_workers(),
            batch_size: 1,
            block_size: 44000,
        }
    }
}

/// Loads `path` and returns the recompressed, verified archive bytes.
pub fn recompress_path(path: &Path, opts: &Options) -> Result<Vec<u8>, RepackError> {
    let entries = archive::read_archive(path, opts.block_size)?;
    recompress_entries(entries, opts)
}

/// Runs the full pipeline over pre-loaded entries: plan the permutation
/// through the worker pool, emit the permuted archive, then verify the
/// result against the input before handing it back.
pub fn recompress_entries(entries: Vec<TarEntry>, opts: &Options) -> Result<Vec<u8>, RepackError> {
    println!("[load] entries: {}", entries.len());

    let entries = Arc::new(entries);
    let pool = Pool::new(Arc::clone(&entries), opts.workers);
    let perm = order::plan(&entries, opts.strategy, &pool, opts.batch_size)?;
    drop(pool);

    let bytes = emit::write_archive(&entries, &perm)?;
    verify::check(&bytes, &entries)?;
    Ok(bytes)
}
