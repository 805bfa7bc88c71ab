//! # Emitter
//!
//! Rewrites the archive in permutation order: a tar stream wrapped in gzip
//! at best compression, built entirely in memory. Header blocks and content
//! come verbatim from the loader's records — sketches never reach the
//! output.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};

use crate::archive::{frame, TarEntry};
use crate::RepackError;

/// Serializes `entries` in `perm` order into gzip-wrapped tar bytes.
pub fn write_archive(entries: &[TarEntry], perm: &[usize]) -> Result<Vec<u8>, RepackError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::best());
    let mut builder = Builder::new(encoder);

    for &i in perm {
        let entry = &entries[i];
        // Names and link targets beyond the 100-byte header fields need a
        // GNU longname/longlink record ahead of the real header, which is
        // then still written verbatim.
        if entry.name.len() > 100 {
            write_gnu_long(builder.get_mut(), EntryType::GNULongName, &entry.name)?;
        }
        if let Some(link) = &entry.link_name {
            if link.len() > 100 {
                write_gnu_long(builder.get_mut(), EntryType::GNULongLink, link)?;
            }
        }
        builder.append(&entry.header, &entry.content[..])?;
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

fn write_gnu_long<W: Write>(out: &mut W, kind: EntryType, data: &[u8]) -> Result<(), RepackError> {
    let mut body = Vec::with_capacity(data.len() + 1);
    body.extend_from_slice(data);
    body.push(0);

    let mut header = Header::new_gnu();
    header.set_path("././@LongLink")?;
    header.set_entry_type(kind);
    header.set_size(body.len() as u64);
    header.set_cksum();

    out.write_all(&frame(&header, &body))?;
    Ok(())
}
