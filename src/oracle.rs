//! # Affinity Oracle
//!
//! Scores how well one entry compresses when placed directly after another.
//! The gain for an ordered pair `(i, j)` is `solo(j) - joint(j | i)`:
//! `joint` is the DEFLATE size of j's probe bytes with i's tail bytes
//! installed as a preset dictionary, `solo` the size with no dictionary.
//! Both are byte counts at best compression; the compressed output itself
//! is discarded.

use std::collections::HashMap;

use flate2::{Compress, Compression, FlushCompress, Status};

use crate::archive::TarEntry;
use crate::RepackError;

/// DEFLATE's sliding window. A longer dictionary cannot be referenced, so
/// tails are trimmed to this before being installed.
pub const DICT_WINDOW: usize = 32 * 1024;

/// A reusable gain prober. Each worker owns exactly one: the encoder is
/// reset between measurements instead of reallocated, and the solo cache
/// is private to the owning worker.
pub struct AffinityProbe {
    enc: Compress,
    scratch: Vec<u8>,
    solo: HashMap<usize, i64>,
    use_sketch: bool,
}

impl AffinityProbe {
    /// `use_sketch` selects sketched probe/dictionary bytes when an entry
    /// carries a sketch; with `false` the full content is always used.
    /// The worker pool probes sketched.
    pub fn new(use_sketch: bool) -> AffinityProbe {
        AffinityProbe {
            enc: Compress::new(Compression::best(), false),
            scratch: vec![0u8; DICT_WINDOW],
            solo: HashMap::new(),
            use_sketch,
        }
    }

    /// Gain of placing entry `j` directly after entry `i`. Positive when
    /// i's tail helps j compress, zero or negative otherwise.
    pub fn pair_gain(&mut self, entries: &[TarEntry], i: usize, j: usize) -> Result<i64, RepackError> {
        let solo = self.solo_len(entries, j)?;
        let dict = if self.use_sketch { entries[i].dict_bytes() } else { entries[i].full_bytes() };
        let probe = self.probe_input(&entries[j]);
        let joint = self.deflate_len(Some(&dict), &probe)? as i64;
        Ok(solo - joint)
    }

    /// Sum of adjacent-pair gains over a longer permutation. The
    /// exhaustive strategy scores whole candidates this way, which lets
    /// the solo cache keep paying off.
    pub fn chain_gain(&mut self, entries: &[TarEntry], perm: &[usize]) -> Result<i64, RepackError> {
        let mut total = 0i64;
        for pair in perm.windows(2) {
            total += self.pair_gain(entries, pair[0], pair[1])?;
        }
        Ok(total)
    }

    /// Cached baseline: DEFLATE size of `j` compressed alone. Sound to
    /// memoize because it depends on entry j only.
    pub fn solo_len(&mut self, entries: &[TarEntry], j: usize) -> Result<i64, RepackError> {
        if let Some(&len) = self.solo.get(&j) {
            return Ok(len);
        }
        let probe = self.probe_input(&entries[j]);
        let len = self.deflate_len(None, &probe)? as i64;
        self.solo.insert(j, len);
        Ok(len)
    }

    fn probe_input(&self, entry: &TarEntry) -> Vec<u8> {
        if self.use_sketch { entry.probe_bytes() } else { entry.full_bytes() }
    }

    /// Compressed size of `input`, optionally primed with a preset
    /// dictionary. Output lands in a scratch buffer that is overwritten on
    /// every iteration; only the running length is kept.
    fn deflate_len(&mut self, dict: Option<&[u8]>, input: &[u8]) -> Result<u64, RepackError> {
        self.enc.reset();
        if let Some(dict) = dict {
            let dict = &dict[dict.len().saturating_sub(DICT_WINDOW)..];
            if !dict.is_empty() {
                self.enc.set_dictionary(dict)?;
            }
        }

        let mut pos = 0usize;
        loop {
            let before_in = self.enc.total_in();
            let status = self
                .enc
                .compress(&input[pos..], &mut self.scratch, FlushCompress::Finish)?;
            pos += (self.enc.total_in() - before_in) as usize;

            match status {
                Status::StreamEnd => return Ok(self.enc.total_out()),
                // Ok/BufError just mean the scratch filled up; it is
                // discarded, so loop with the same buffer.
                Status::Ok | Status::BufError => {}
            }
        }
    }
}
