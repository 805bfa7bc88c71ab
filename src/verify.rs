//! # Verifier
//!
//! Proves that a recompressed archive still carries exactly the input's
//! entries. Reordering exercises the riskiest parts of the pipeline
//! (permutation, sketching, concurrency); a silent corruption would be far
//! worse than the verification cost, which is small next to the O(N²)
//! oracle work.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::MultiGzDecoder;
use tar::Archive;

use crate::archive::TarEntry;
use crate::RepackError;

/// Decompresses `compressed`, walks the embedded tar, and asserts that
/// every emitted entry matches the reference entry of the same name:
/// identical raw header block, byte-equal content, and a final entry-count
/// check. Errors name the first differing entry.
pub fn check(compressed: &[u8], reference: &[TarEntry]) -> Result<(), RepackError> {
    // Duplicate names were rejected at load time, so this map is total.
    let mut by_name: HashMap<&[u8], &TarEntry> = HashMap::with_capacity(reference.len());
    for entry in reference {
        by_name.insert(entry.name.as_slice(), entry);
    }

    let mut archive = Archive::new(MultiGzDecoder::new(compressed));
    let mut seen = 0usize;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path_bytes().into_owned();
        let display = String::from_utf8_lossy(&name).into_owned();

        let Some(original) = by_name.get(name.as_slice()) else {
            return Err(RepackError::MissingEntry(display));
        };
        if entry.header().as_bytes()[..] != original.header.as_bytes()[..] {
            return Err(RepackError::HeaderMismatch(display));
        }

        let mut content = Vec::with_capacity(original.content.len());
        entry.read_to_end(&mut content)?;
        if content != original.content {
            return Err(RepackError::ContentMismatch(display));
        }
        seen += 1;
    }

    if seen != reference.len() {
        return Err(RepackError::EntryCount { expected: reference.len(), actual: seen });
    }
    Ok(())
}
