//! # Ordering Engine
//!
//! Builds the output permutation. All strategies share the same shape:
//! directory entries first in input order, regular files in strategy order,
//! every remaining entry type last in input order. Regular files are placed
//! by repeatedly asking the worker pool which unplaced candidate pairs best
//! with the current tail entry.

use crate::archive::TarEntry;
use crate::pool::{JointResult, Pool};
use crate::RepackError;

/// How the regular-file block of the permutation is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Greedy one-step extension; O(N²) pair probes.
    Greedy,
    /// Exhaustive enumeration of all N! candidates. Tiny inputs only.
    Bruteforce,
    /// Greedy, but commits the top-B candidates per step.
    Partitioned,
}

impl Strategy {
    /// CLI mode mapping: 0=greedy, 1=exhaustive, 2=batched-greedy.
    pub fn from_mode(mode: u8) -> Option<Strategy> {
        match mode {
            0 => Some(Strategy::Greedy),
            1 => Some(Strategy::Bruteforce),
            2 => Some(Strategy::Partitioned),
            _ => None,
        }
    }
}

/// Computes the full output permutation. The result is always a bijection
/// over the entry indices, directories first and non-regular stragglers
/// last.
pub fn plan(
    entries: &[TarEntry],
    strategy: Strategy,
    pool: &Pool,
    batch_size: usize,
) -> Result<Vec<usize>, RepackError> {
    let mut perm = match strategy {
        Strategy::Greedy => grow(entries, pool, 1)?,
        Strategy::Partitioned => grow(entries, pool, batch_size.max(1))?,
        Strategy::Bruteforce => bruteforce(entries, pool)?,
    };
    append_leftovers(entries, &mut perm);

    if perm.len() != entries.len() {
        return Err(RepackError::Plan(format!(
            "permutation covers {} of {} entries",
            perm.len(),
            entries.len()
        )));
    }
    Ok(perm)
}

/// Result comparator shared by every strategy. `a` wins on higher gain; on
/// equal gain the strictly lower index pair wins. The tiebreak is a partial
/// order — incomparable ties fall through to arrival order, which is
/// acceptable because both placements compress to the same size.
pub fn beats(a: &JointResult, b: &JointResult) -> bool {
    if a.gain > b.gain {
        return true;
    }
    a.gain == b.gain
        && a.perm.len() >= 2
        && b.perm.len() >= 2
        && a.perm[0] < b.perm[0]
        && a.perm[1] < b.perm[1]
}

/// Directory indices in input order; the permutation preamble. Directories
/// never enter affinity scoring.
pub fn dirs_first(entries: &[TarEntry]) -> Vec<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_dir())
        .map(|(i, _)| i)
        .collect()
}

/// Appends every index not yet placed, in input order: symlinks, hardlinks
/// and any other non-regular entries end up here.
pub fn append_leftovers(entries: &[TarEntry], perm: &mut Vec<usize>) {
    for i in 0..entries.len() {
        if !perm.contains(&i) {
            perm.push(i);
        }
    }
}

fn regular_indices(entries: &[TarEntry]) -> Vec<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_regular())
        .map(|(i, _)| i)
        .collect()
}

/// Greedy growth; `batch` of 1 is the plain greedy strategy, larger values
/// commit the top-B candidates per step.
fn grow(entries: &[TarEntry], pool: &Pool, batch: usize) -> Result<Vec<usize>, RepackError> {
    let mut perm = dirs_first(entries);
    if !perm.is_empty() {
        println!("[order] dir prefix {:?}", perm);
    }

    // Without a directory prefix there is no tail entry to pair against,
    // so the first step scans every ordered pair of regular files.
    if perm.is_empty() {
        seed_best_pair(entries, pool, &mut perm)?;
    }

    loop {
        let step = next_candidates(entries, &perm, pool, batch)?;
        let Some(best) = step.first() else { break };
        println!("[order] best {:?} gain {}", best.perm, best.gain);
        for result in &step {
            perm.push(result.perm[1]);
        }
    }

    Ok(perm)
}

/// First-step seeding for archives with no directories: score every ordered
/// pair of regular files and start the permutation with the winner. A lone
/// regular file is placed directly.
fn seed_best_pair(
    entries: &[TarEntry],
    pool: &Pool,
    perm: &mut Vec<usize>,
) -> Result<(), RepackError> {
    let regs = regular_indices(entries);
    match regs.len() {
        0 => {}
        1 => perm.push(regs[0]),
        _ => {
            let mut job_count = 0u64;
            for &i in &regs {
                for &j in &regs {
                    if i != j {
                        pool.submit(vec![i, j])?;
                        job_count += 1;
                    }
                }
            }

            let mut best: Option<JointResult> = None;
            for _ in 0..job_count {
                let result = pool.recv()?;
                if best.as_ref().map_or(true, |b| beats(&result, b)) {
                    best = Some(result);
                }
            }
            if let Some(best) = best {
                println!("[order] seed pair {:?} gain {}", best.perm, best.gain);
                perm.extend_from_slice(&best.perm);
            }
        }
    }
    Ok(())
}

/// One growth step: submits a pair job for every unplaced regular file
/// against the current tail, then keeps the top `batch` results sorted
/// best-first. Applies the empty-content guard before returning.
fn next_candidates(
    entries: &[TarEntry],
    perm: &[usize],
    pool: &Pool,
    batch: usize,
) -> Result<Vec<JointResult>, RepackError> {
    let Some(&last) = perm.last() else {
        return Ok(Vec::new());
    };

    let mut job_count = 0usize;
    for (j, entry) in entries.iter().enumerate() {
        if !entry.is_regular() || perm.contains(&j) {
            continue;
        }
        pool.submit(vec![last, j])?;
        job_count += 1;
    }

    let mut best: Vec<JointResult> = Vec::new();
    for _ in 0..job_count {
        let result = pool.recv()?;

        if best.len() >= batch {
            // Full batch and not better than the current worst: drop.
            if !beats(&result, &best[best.len() - 1]) {
                continue;
            }
        }
        let pos = best
            .iter()
            .position(|b| beats(&result, b))
            .unwrap_or(best.len());
        best.insert(pos, result);
        best.truncate(batch);
    }

    Ok(empty_content_guard(entries, best))
}

/// Empty-content entries compress to nearly nothing no matter what sits
/// next to them, so a batch led by one is unrepresentative: commit only the
/// single best result in that case.
fn empty_content_guard(entries: &[TarEntry], mut batch: Vec<JointResult>) -> Vec<JointResult> {
    if batch.len() > 1 && batch[0].perm.iter().any(|&i| entries[i].content.is_empty()) {
        batch.truncate(1);
    }
    batch
}

/// Scores every permutation of the regular-file set (identity included) and
/// keeps the comparator-best. Candidates are submitted with the directory
/// prefix attached; workers score by adjacent-pair sum.
fn bruteforce(entries: &[TarEntry], pool: &Pool) -> Result<Vec<usize>, RepackError> {
    let dir_perm = dirs_first(entries);
    println!("[bruteforce] dir prefix {:?}", dir_perm);

    let regs = regular_indices(entries);
    if regs.is_empty() {
        return Ok(dir_perm);
    }

    let mut state = vec![0usize; regs.len()];
    let mut job_count = 0u64;
    loop {
        let mut candidate = dir_perm.clone();
        candidate.extend(apply_state(&regs, &state));
        pool.submit(candidate)?;
        job_count += 1;
        if !next_state(&mut state) {
            break;
        }
    }
    println!("[bruteforce] jobs {}", job_count);

    let tick = (job_count / 10).max(1);
    let mut best: Option<JointResult> = None;
    for done in 0..job_count {
        let result = pool.recv()?;
        if best.as_ref().map_or(true, |b| beats(&result, b)) {
            best = Some(result);
        }
        if done % tick == 0 {
            if let Some(b) = &best {
                println!("[bruteforce] best @ {:3}%: {:?} gain {}", done * 100 / job_count, b.perm, b.gain);
            }
        }
    }

    best.map(|b| b.perm)
        .ok_or_else(|| RepackError::Plan("exhaustive search produced no result".into()))
}

/// Odometer step over the swap-offset encoding: `state[i]` holds how far
/// ahead position i swaps. Returns false once every combination has been
/// produced.
fn next_state(state: &mut [usize]) -> bool {
    let len = state.len();
    for i in 0..len.saturating_sub(1) {
        if state[i] < len - i - 1 {
            state[i] += 1;
            return true;
        }
        state[i] = 0;
    }
    false
}

/// Materializes a swap-offset state into a permutation of `base`.
fn apply_state(base: &[usize], state: &[usize]) -> Vec<usize> {
    let mut perm = base.to_vec();
    for (i, &offset) in state.iter().enumerate() {
        if i + offset < perm.len() {
            perm.swap(i, i + offset);
        }
    }
    perm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::entries_from_tar;

    fn result(perm: Vec<usize>, gain: i64) -> JointResult {
        JointResult { perm, gain }
    }

    fn add_file(builder: &mut tar::Builder<Vec<u8>>, name: &str, content: &[u8]) {
        let mut header = tar::Header::new_ustar();
        header.set_path(name).unwrap();
        header.set_size(content.len() as u64);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, content).unwrap();
    }

    // Index layout: 0 = a.txt, 1 = empty.txt, 2 = sub/, 3 = b.txt.
    fn sample_entries() -> Vec<TarEntry> {
        let mut builder = tar::Builder::new(Vec::new());
        add_file(&mut builder, "a.txt", b"alpha");
        add_file(&mut builder, "empty.txt", b"");

        let mut dir = tar::Header::new_ustar();
        dir.set_path("sub/").unwrap();
        dir.set_size(0);
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_cksum();
        builder.append(&dir, &b""[..]).unwrap();

        add_file(&mut builder, "b.txt", b"beta");

        let bytes = builder.into_inner().unwrap();
        entries_from_tar(&bytes[..], 0).unwrap()
    }

    #[test]
    fn comparator_prefers_higher_gain() {
        assert!(beats(&result(vec![5, 6], 10), &result(vec![0, 1], 9)));
        assert!(!beats(&result(vec![0, 1], 9), &result(vec![5, 6], 10)));
    }

    #[test]
    fn comparator_breaks_ties_on_co_ordered_indices() {
        assert!(beats(&result(vec![0, 2], 7), &result(vec![1, 3], 7)));
        // Indices not strictly co-ordered: incomparable both ways.
        assert!(!beats(&result(vec![0, 3], 7), &result(vec![1, 2], 7)));
        assert!(!beats(&result(vec![1, 2], 7), &result(vec![0, 3], 7)));
    }

    #[test]
    fn comparator_ignores_short_perms() {
        assert!(!beats(&result(vec![0], 7), &result(vec![1, 2], 7)));
    }

    #[test]
    fn dirs_first_and_leftovers_cover_everything() {
        let entries = sample_entries();
        let mut perm = dirs_first(&entries);
        assert_eq!(perm, vec![2]);
        append_leftovers(&entries, &mut perm);
        assert_eq!(perm, vec![2, 0, 1, 3]);
    }

    #[test]
    fn empty_guard_collapses_batches_led_by_empty_entries() {
        let entries = sample_entries();
        // Entry 1 has empty content; a multi-result batch led by it shrinks.
        let batch = vec![result(vec![0, 1], 4), result(vec![0, 3], 3)];
        let guarded = empty_content_guard(&entries, batch);
        assert_eq!(guarded.len(), 1);
        // A batch led by non-empty entries is untouched.
        let batch = vec![result(vec![0, 3], 4), result(vec![3, 0], 3)];
        let guarded = empty_content_guard(&entries, batch);
        assert_eq!(guarded.len(), 2);
    }

    #[test]
    fn state_enumeration_yields_all_distinct_permutations() {
        let base = vec![10, 11, 12, 13];
        let mut state = vec![0usize; base.len()];
        let mut seen = std::collections::HashSet::new();
        loop {
            let perm = apply_state(&base, &state);
            let mut sorted = perm.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, base);
            assert!(seen.insert(perm));
            if !next_state(&mut state) {
                break;
            }
        }
        assert_eq!(seen.len(), 24);
        assert!(seen.contains(&base));
    }
}
