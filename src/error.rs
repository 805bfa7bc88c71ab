use std::io;
use std::path::PathBuf;

/// The primary error type for all operations in the `retgz` crate.
#[derive(Debug)]
pub enum RepackError {
    /// An I/O error occurred, typically while reading or writing an archive.
    /// Includes the path where the error happened when one is known.
    Io { source: io::Error, path: PathBuf },

    /// An entry's content ended before the size declared in its header.
    ShortRead { name: String, expected: u64, got: u64 },

    /// Two entries in the input archive share the same name. The verifier
    /// looks entries up by name, so this is fatal at load time.
    DuplicateName(String),

    /// The DEFLATE encoder failed. Encoder configuration is fixed at
    /// compile time, so this aborts the whole process rather than just the
    /// current input.
    Encoder(String),

    /// A worker channel disconnected before the run finished.
    Pool(String),

    /// The ordering engine produced a permutation that is not a bijection
    /// over the entry list.
    Plan(String),

    /// The recompressed archive contains an entry name the input did not.
    MissingEntry(String),

    /// An emitted header does not match the input header for this name.
    HeaderMismatch(String),

    /// An emitted entry's content does not match the input content.
    ContentMismatch(String),

    /// The recompressed archive has a different number of entries.
    EntryCount { expected: usize, actual: usize },
}

impl std::fmt::Display for RepackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepackError::Io { source, path } => {
                if path.as_os_str().is_empty() {
                    write!(f, "I/O error: {}", source)
                } else {
                    write!(f, "I/O error on path '{}': {}", path.display(), source)
                }
            }
            RepackError::ShortRead { name, expected, got } => {
                write!(f, "short read on entry '{}': expected {} bytes, got {}", name, expected, got)
            }
            RepackError::DuplicateName(name) => write!(f, "duplicate entry name '{}'", name),
            RepackError::Encoder(msg) => write!(f, "DEFLATE encoder error: {}", msg),
            RepackError::Pool(msg) => write!(f, "worker pool error: {}", msg),
            RepackError::Plan(msg) => write!(f, "ordering error: {}", msg),
            RepackError::MissingEntry(name) => {
                write!(f, "verification failed: entry '{}' not present in the input", name)
            }
            RepackError::HeaderMismatch(name) => {
                write!(f, "verification failed: header mismatch on entry '{}'", name)
            }
            RepackError::ContentMismatch(name) => {
                write!(f, "verification failed: content mismatch on entry '{}'", name)
            }
            RepackError::EntryCount { expected, actual } => {
                write!(f, "verification failed: expected {} entries, found {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for RepackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepackError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for RepackError {
    fn from(err: io::Error) -> Self {
        RepackError::Io { source: err, path: PathBuf::new() }
    }
}

impl From<flate2::CompressError> for RepackError {
    fn from(err: flate2::CompressError) -> Self {
        RepackError::Encoder(err.to_string())
    }
}

impl RepackError {
    /// True for errors that invalidate the whole process, not just the
    /// current input file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RepackError::Encoder(_))
    }
}
