//! Line-ending-normalized content digests.
//!
//! Checkouts on Windows (and git's autocrlf in particular) rewrite line
//! endings, so digests are taken over content whose `\r\n`, `\r` and `\n`
//! terminators have all been replaced by a single `\n`. A final terminator is
//! dropped, so `"a\nb\n"` and `"a\nb"` share a digest.

use std::path::Path;

use sha1::{Digest, Sha1};

use crate::error::{io_err, SyncError};

/// Hex SHA-1 of the normalized form of `content`.
pub fn digest(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(normalize_line_endings(content));
    hex::encode(hasher.finalize())
}

/// Digest of the file at `path`.
pub fn digest_file(path: &Path) -> Result<String, SyncError> {
    let content = std::fs::read(path).map_err(|e| io_err(path, e))?;
    Ok(digest(&content))
}

/// Split on any newline sequence and rejoin with `\n`.
pub fn normalize_line_endings(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut pending_newline = false;
    let mut bytes = content.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        match byte {
            b'\r' | b'\n' => {
                if pending_newline {
                    out.push(b'\n');
                }
                pending_newline = true;
                if byte == b'\r' && bytes.peek() == Some(&b'\n') {
                    bytes.next();
                }
            }
            _ => {
                if pending_newline {
                    out.push(b'\n');
                    pending_newline = false;
                }
                out.push(byte);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(digest(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(digest(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn all_line_endings_hash_identically() {
        let lf = digest(b"a\nb");
        assert_eq!(digest(b"a\r\nb"), lf);
        assert_eq!(digest(b"a\rb"), lf);
    }

    #[test]
    fn trailing_terminator_is_dropped() {
        assert_eq!(digest(b"abc\n"), digest(b"abc"));
        assert_eq!(digest(b"abc\r\n"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn blank_lines_are_kept() {
        assert_eq!(normalize_line_endings(b"a\r\n\r\nb\r\n"), b"a\n\nb".to_vec());
        assert_eq!(normalize_line_endings(b"a\n\n"), b"a\n".to_vec());
        assert_eq!(normalize_line_endings(b"\n\na"), b"\n\na".to_vec());
        assert_eq!(normalize_line_endings(b"\n"), Vec::<u8>::new());
        assert_ne!(digest(b"a\n\nb"), digest(b"a\nb"));
    }

    #[test]
    fn cr_lf_pair_is_one_terminator_but_lf_cr_is_two() {
        assert_eq!(normalize_line_endings(b"a\r\nb"), b"a\nb".to_vec());
        assert_eq!(normalize_line_endings(b"a\n\rb"), b"a\n\nb".to_vec());
    }

    #[test]
    fn single_byte_edit_changes_digest() {
        assert_ne!(digest(b"code,name\n1,foo\n"), digest(b"code,name\n1,fop\n"));
    }

    #[test]
    fn stable_across_calls() {
        let content = b"code,name\r\n1,foo\r\n";
        assert_eq!(digest(content), digest(content));
    }
}
