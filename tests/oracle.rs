use rand::{thread_rng, Rng};

use retgz::archive::{entries_from_tar, TarEntry, BLOCK_LEN};
use retgz::oracle::AffinityProbe;

fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in entries {
        let mut header = tar::Header::new_ustar();
        header.set_path(name).unwrap();
        header.set_size(content.len() as u64);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, *content).unwrap();
    }
    builder.into_inner().unwrap()
}

fn load(tar_bytes: &[u8], block_size: usize) -> Vec<TarEntry> {
    entries_from_tar(tar_bytes, block_size).unwrap()
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    thread_rng().fill(&mut buf[..]);
    buf
}

#[test]
fn gains_are_deterministic() {
    let a = random_bytes(2048);
    let b = random_bytes(2048);
    let entries = load(&build_tar(&[("a", &a), ("b", &b)]), 0);

    let mut probe = AffinityProbe::new(true);
    let first = probe.pair_gain(&entries, 0, 1).unwrap();
    let second = probe.pair_gain(&entries, 0, 1).unwrap();
    assert_eq!(first, second);

    // A fresh probe (empty cache) must agree as well.
    let mut fresh = AffinityProbe::new(true);
    assert_eq!(fresh.pair_gain(&entries, 0, 1).unwrap(), first);
}

#[test]
fn solo_cache_matches_fresh_computation() {
    let a = random_bytes(1024);
    let b = random_bytes(1024);
    let entries = load(&build_tar(&[("a", &a), ("b", &b)]), 0);

    let mut probe = AffinityProbe::new(true);
    probe.pair_gain(&entries, 0, 1).unwrap();

    // The cached solo term equals what a cold probe computes from scratch.
    let cached = probe.solo_len(&entries, 1).unwrap();
    let cold = AffinityProbe::new(true).solo_len(&entries, 1).unwrap();
    assert_eq!(cached, cold);
}

#[test]
fn empty_content_gain_is_within_framing_slack() {
    let a: Vec<u8> = b"x".repeat(100);
    let entries = load(&build_tar(&[("a", &a), ("empty", b"")]), 0);

    let mut probe = AffinityProbe::new(true);
    let gain = probe.pair_gain(&entries, 0, 1).unwrap();
    // Only the 512-byte header frame is in play for an empty entry.
    assert!(gain.abs() < BLOCK_LEN as i64, "gain {}", gain);
}

#[test]
fn identical_content_gains_are_positive() {
    let content = random_bytes(4096);
    let entries = load(&build_tar(&[("a", &content), ("b", &content)]), 0);

    let mut probe = AffinityProbe::new(true);
    let gain = probe.pair_gain(&entries, 0, 1).unwrap();
    assert!(gain > 0, "gain {}", gain);
}

#[test]
fn self_primed_beats_noise_primed() {
    let a = random_bytes(4096);
    let b = random_bytes(4096);
    let entries = load(&build_tar(&[("a", &a), ("b", &b)]), 0);

    let mut probe = AffinityProbe::new(true);
    let related = probe.pair_gain(&entries, 0, 0).unwrap();
    let unrelated = probe.pair_gain(&entries, 0, 1).unwrap();
    // An entry primed with its own bytes beats one primed with noise.
    assert!(related > unrelated, "related {} unrelated {}", related, unrelated);
}

#[test]
fn chain_gain_is_the_sum_of_adjacent_pairs() {
    let a = random_bytes(1024);
    let b = random_bytes(1024);
    let c = random_bytes(1024);
    let entries = load(&build_tar(&[("a", &a), ("b", &b), ("c", &c)]), 0);

    let mut probe = AffinityProbe::new(true);
    let chain = probe.chain_gain(&entries, &[0, 1, 2]).unwrap();
    let pairs = probe.pair_gain(&entries, 0, 1).unwrap() + probe.pair_gain(&entries, 1, 2).unwrap();
    assert_eq!(chain, pairs);
}

#[test]
fn sketch_bounds_probe_size() {
    let big = random_bytes(1 << 20);
    let entries = load(&build_tar(&[("big", &big)]), 44000);

    let entry = &entries[0];
    assert!(entry.sketch.is_some());
    // One header block plus the sketched content, padded to the block grid.
    let padded = 44000usize.div_ceil(BLOCK_LEN) * BLOCK_LEN;
    assert_eq!(entry.probe_bytes().len(), BLOCK_LEN + padded);
    assert_eq!(entry.dict_bytes().len(), BLOCK_LEN + padded);
    // The emitter-facing bytes are untouched by sketching.
    assert_eq!(entry.content.len(), 1 << 20);
}
