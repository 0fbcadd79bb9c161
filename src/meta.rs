// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::BlobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// Persisted form of a path's meta entry.
///
/// Serialized as UTF-8 JSON inside the path's `.meta` file; unknown fields
/// are tolerated on load.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct MetaEntry {
    pub blob: BlobId,
    pub create_at: DateTime<Utc>,
    #[serde(default)]
    pub extras: HashMap<String, String>,
}

/// Content handle returned by [`crate::Objects::pull`].
///
/// Reads and seeks go straight to the underlying blob file; dropping the
/// handle closes it. The handle stays readable even if a garbage collection
/// pass unlinks the blob file afterwards.
pub struct PullContent {
    pub(crate) file: File,

    /// Timestamp of the meta entry
    pub create_at: DateTime<Utc>,

    /// Blob id of the content
    pub etag: BlobId,

    /// Free-form options stored alongside the entry
    pub extras: HashMap<String, String>,
}

impl Read for PullContent {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for PullContent {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}
