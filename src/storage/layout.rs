use std::path::{Path, PathBuf};
use std::fs;
use crate::core::error::Result;
use crate::core::types::DocKey;

/// Directory structure for tiered-out documents
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub docs_dir: PathBuf,      // One record file per tiered-out key
}

impl StorageLayout {
    pub const RECORD_EXTENSION: &'static str = "doc";

    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let docs_dir = base_dir.join("docs");
        fs::create_dir_all(&docs_dir)?;

        Ok(StorageLayout {
            base_dir,
            docs_dir,
        })
    }

    /// `scheme://host/a/b` → `<docs>/scheme%3A%2F%2F/host/a/b.doc`; keys
    /// without a scheme map their `/`-separated segments directly. Each
    /// segment is percent-encoded. A plain segment never contains `/`, so it
    /// never encodes to `%2F` and cannot collide with a scheme directory.
    pub fn document_path(&self, key: &DocKey) -> PathBuf {
        let raw = key.as_str();
        let (scheme, rest) = match raw.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() => (Some(scheme), rest),
            _ => (None, raw),
        };

        let mut path = self.docs_dir.clone();
        if let Some(scheme) = scheme {
            path.push(encode_segment(&format!("{}://", scheme)));
        }
        // Empty segments are kept (encoded) so "a//b" and "a/b" stay distinct.
        let mut segments: Vec<String> = rest.split('/').map(encode_segment).collect();
        let last = segments.pop().unwrap_or_default();
        for dir in &segments {
            path.push(dir);
        }
        path.push(format!("{}.{}", last, Self::RECORD_EXTENSION));
        path
    }

    /// Delete every record and directory under the docs root, returning how
    /// many top-level entries were removed.
    pub fn clear_documents(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.docs_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            removed += 1;
        }
        Ok(removed)
    }

    /// Remove empty directories from `file`'s parent upward, stopping at the
    /// docs root.
    pub fn prune_empty_parents(&self, file: &Path) {
        let mut current = file.parent();
        while let Some(dir) = current {
            if dir == self.docs_dir || !dir.starts_with(&self.docs_dir) {
                break;
            }
            // Fails on non-empty directories, which ends the walk.
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

fn encode_segment(segment: &str) -> String {
    if segment.is_empty() {
        return "%".to_string();
    }
    let only_dots = segment.chars().all(|c| c == '.');
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || byte == b'-'
            || byte == b'_'
            || (byte == b'.' && !only_dots);
        if keep {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}
