// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::BlobFs;
use std::path::{Path, PathBuf};

/// Blob filesystem configuration builder
pub struct Config {
    /// Base folder
    #[doc(hidden)]
    pub path: PathBuf,
}

impl Config {
    /// Creates a new configuration for the given base folder.
    ///
    /// The folder and the `blob/`, `cache/` and `meta/` subfolders are
    /// created on [`Config::open`] if missing.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().into(),
        }
    }

    /// Opens the blob filesystem.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn open(self) -> crate::Result<BlobFs> {
        BlobFs::open(self)
    }
}
