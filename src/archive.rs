//! # Archive Loader
//!
//! Reads a tar stream (optionally gzip-wrapped) into an in-memory entry
//! list. Each entry keeps its raw 512-byte header block and full content so
//! the emitter can reproduce both verbatim; large entries additionally get a
//! head+tail sketch that only the affinity oracle looks at.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tar::{Archive, EntryType, Header};

use crate::RepackError;

/// Tar stores data in 512-byte blocks; content is zero-padded up to the
/// next boundary.
pub const BLOCK_LEN: usize = 512;

/// First and last bytes of a large entry, used by the oracle instead of the
/// full content. The sketched header carries `size = block_size` so the
/// probe bytes still frame as a well-formed tar entry.
#[derive(Debug, Clone)]
pub struct Sketch {
    pub header: Header,
    pub head: Vec<u8>,
    pub tail: Vec<u8>,
}

/// One member of the input archive. Immutable after load.
#[derive(Debug, Clone)]
pub struct TarEntry {
    /// Raw header block exactly as read from the input.
    pub header: Header,
    /// Full path bytes. GNU long-name records are folded in by the reader,
    /// so this may be longer than the 100-byte header name field.
    pub name: Vec<u8>,
    /// Full link target bytes for link entries, when present.
    pub link_name: Option<Vec<u8>>,
    /// Entry content, exactly `size` bytes for regular files.
    pub content: Vec<u8>,
    /// Present only when sketching is enabled and the content is larger
    /// than twice the block size.
    pub sketch: Option<Sketch>,
}

impl TarEntry {
    pub fn is_regular(&self) -> bool {
        self.header.entry_type() == EntryType::Regular
    }

    pub fn is_dir(&self) -> bool {
        self.header.entry_type() == EntryType::Directory
    }

    /// Entry name for diagnostics.
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Bytes the oracle compresses when this entry is the candidate:
    /// the sketched head when a sketch exists, else the full entry,
    /// framed as tar octets.
    pub fn probe_bytes(&self) -> Vec<u8> {
        match &self.sketch {
            Some(s) => frame(&s.header, &s.head),
            None => frame(&self.header, &self.content),
        }
    }

    /// Bytes the oracle installs as the preset dictionary when this entry
    /// is the predecessor: the sketched tail when a sketch exists, else
    /// the full entry, framed as tar octets.
    pub fn dict_bytes(&self) -> Vec<u8> {
        match &self.sketch {
            Some(s) => frame(&s.header, &s.tail),
            None => frame(&self.header, &self.content),
        }
    }

    /// Unsketched probe bytes. The gain-dump tool uses these to report
    /// full-content gains next to the sketched ones.
    pub fn full_bytes(&self) -> Vec<u8> {
        frame(&self.header, &self.content)
    }
}

/// Frames a header and content the way they appear in a tar stream:
/// header block, content, zero padding to the next 512-byte boundary.
pub fn frame(header: &Header, content: &[u8]) -> Vec<u8> {
    let pad = (BLOCK_LEN - content.len() % BLOCK_LEN) % BLOCK_LEN;
    let mut out = Vec::with_capacity(BLOCK_LEN + content.len() + pad);
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(content);
    out.resize(out.len() + pad, 0);
    out
}

/// Opens `path` and loads its entries. A gzip wrapper is detected from the
/// magic bytes and stripped transparently; plain tar is accepted as-is.
pub fn read_archive(path: &Path, block_size: usize) -> Result<Vec<TarEntry>, RepackError> {
    let mut file = File::open(path)
        .map_err(|source| RepackError::Io { source, path: path.to_path_buf() })?;

    let mut magic = [0u8; 2];
    let mut filled = 0;
    while filled < magic.len() {
        let n = file.read(&mut magic[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    let rewound = io::Cursor::new(magic[..filled].to_vec()).chain(file);

    if filled == 2 && magic == [0x1f, 0x8b] {
        entries_from_tar(MultiGzDecoder::new(rewound), block_size)
    } else {
        entries_from_tar(rewound, block_size)
    }
}

/// Walks a plain tar stream and buffers every entry. Iteration order is
/// preserved. Fails on duplicate names, short content, and stream errors.
pub fn entries_from_tar<R: Read>(reader: R, block_size: usize) -> Result<Vec<TarEntry>, RepackError> {
    let mut archive = Archive::new(reader);
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let header = entry.header().clone();
        let name = entry.path_bytes().into_owned();
        let link_name = entry.link_name_bytes().map(|l| l.into_owned());
        let size = header.entry_size()?;

        let mut content = Vec::with_capacity(size as usize);
        entry.read_to_end(&mut content)?;

        if !seen.insert(name.clone()) {
            return Err(RepackError::DuplicateName(String::from_utf8_lossy(&name).into_owned()));
        }
        if header.entry_type() == EntryType::Regular && (content.len() as u64) < size {
            return Err(RepackError::ShortRead {
                name: String::from_utf8_lossy(&name).into_owned(),
                expected: size,
                got: content.len() as u64,
            });
        }

        let sketch = make_sketch(&header, &content, block_size);
        entries.push(TarEntry { header, name, link_name, content, sketch });
    }

    Ok(entries)
}

fn make_sketch(header: &Header, content: &[u8], block_size: usize) -> Option<Sketch> {
    if block_size == 0 || content.len() <= 2 * block_size {
        return None;
    }
    let mut sketched = header.clone();
    sketched.set_size(block_size as u64);
    sketched.set_cksum();
    Some(Sketch {
        header: sketched,
        head: content[..block_size].to_vec(),
        tail: content[content.len() - block_size..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tar_with_one_file(name: &str, content: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = Header::new_ustar();
        header.set_path(name).unwrap();
        header.set_size(content.len() as u64);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();
        builder.append(&header, content).unwrap();
        builder.into_inner().unwrap()
    }

    #[test]
    fn frame_pads_to_block_boundaries() {
        let mut header = Header::new_ustar();
        header.set_path("x").unwrap();
        header.set_size(5);
        header.set_cksum();

        let framed = frame(&header, b"hello");
        assert_eq!(framed.len(), 2 * BLOCK_LEN);
        assert_eq!(&framed[..BLOCK_LEN], header.as_bytes().as_slice());
        assert_eq!(&framed[BLOCK_LEN..BLOCK_LEN + 5], b"hello");
        assert!(framed[BLOCK_LEN + 5..].iter().all(|&b| b == 0));

        // Content on an exact block boundary needs no padding.
        let framed = frame(&header, &[1u8; BLOCK_LEN]);
        assert_eq!(framed.len(), 2 * BLOCK_LEN);
    }

    #[test]
    fn sketching_starts_past_twice_the_block_size() {
        let at_limit = vec![3u8; 200];
        let entries = entries_from_tar(&tar_with_one_file("a", &at_limit)[..], 100).unwrap();
        assert!(entries[0].sketch.is_none());

        let past_limit = vec![3u8; 201];
        let entries = entries_from_tar(&tar_with_one_file("a", &past_limit)[..], 100).unwrap();
        let sketch = entries[0].sketch.as_ref().unwrap();
        assert_eq!(sketch.head.len(), 100);
        assert_eq!(sketch.tail.len(), 100);
        assert_eq!(sketch.header.entry_size().unwrap(), 100);

        // Sketching disabled leaves even huge entries whole.
        let entries = entries_from_tar(&tar_with_one_file("a", &past_limit)[..], 0).unwrap();
        assert!(entries[0].sketch.is_none());
    }

    #[test]
    fn sketch_takes_head_and_tail_bytes() {
        let mut content = vec![0u8; 300];
        content[..100].fill(b'H');
        content[200..].fill(b'T');

        let entries = entries_from_tar(&tar_with_one_file("a", &content)[..], 100).unwrap();
        let sketch = entries[0].sketch.as_ref().unwrap();
        assert!(sketch.head.iter().all(|&b| b == b'H'));
        assert!(sketch.tail.iter().all(|&b| b == b'T'));
        // The original content is untouched for the emitter.
        assert_eq!(entries[0].content, content);
    }
}
