// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path utilities for the JSON document store layout.
//!
//! ```text
//! {root}/
//!   users/
//!     000000000001-{id}.json
//!   refresh_tokens/
//!   detections/
//!   logs/
//!   patients/
//! ```
//!
//! The zero-padded sequence prefix records insertion order; directory
//! listings sorted by file name therefore iterate oldest document first.

use std::path::{Path, PathBuf};

/// Default data directory when `DATA_DIR` is not set.
pub const DEFAULT_DATA_ROOT: &str = "./data";

/// Width of the insertion sequence prefix in document file names.
const SEQUENCE_WIDTH: usize = 12;

#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one collection.
    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    /// File name for a document given its insertion sequence and id.
    pub fn document_file_name(sequence: u64, id: &str) -> String {
        format!("{sequence:0width$}-{id}.json", width = SEQUENCE_WIDTH)
    }

    /// Full path of a document file.
    pub fn document(&self, collection: &str, sequence: u64, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(Self::document_file_name(sequence, id))
    }

    /// Parse the insertion sequence back out of a document file name.
    pub fn sequence_of(file_name: &str) -> Option<u64> {
        let (sequence, _) = file_name.split_once('-')?;
        sequence.parse().ok()
    }

    /// Scratch file used by the write-read-delete health probe.
    pub fn health_check_file(&self) -> PathBuf {
        self.root.join(".health_check")
    }
}
