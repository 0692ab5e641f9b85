//! Content fingerprints for duplicate grouping.
//!
//! Small files are hashed in full. Larger files are sampled (head, tail and
//! length) so that a single huge file cannot dominate a scan. This is a
//! heuristic: sampled fingerprints can collide for files that differ only in
//! the middle.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Files below this size are hashed in full.
pub const FULL_HASH_LIMIT: u64 = 5 * 1024 * 1024;

/// Bytes sampled from each end of larger files.
pub const SAMPLE_LEN: usize = 8 * 1024;

const BUF_SIZE: usize = 64 * 1024;

/// Fingerprint the file at `path`, whose size is `size`.
pub fn fingerprint(path: &Path, size: u64) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();

    if size < FULL_HASH_LIMIT {
        let mut buf = vec![0u8; BUF_SIZE];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    } else {
        let mut head = vec![0u8; SAMPLE_LEN];
        let n = read_up_to(&mut file, &mut head)?;
        hasher.update(&head[..n]);

        file.seek(SeekFrom::End(-(SAMPLE_LEN as i64)))?;
        let mut tail = vec![0u8; SAMPLE_LEN];
        let n = read_up_to(&mut file, &mut tail)?;
        hasher.update(&tail[..n]);

        hasher.update(size.to_string().as_bytes());
    }

    Ok(to_hex(&hasher.finalize()))
}

fn read_up_to(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
