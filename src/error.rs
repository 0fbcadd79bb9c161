// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::BlobId;
use std::path::PathBuf;

/// Represents errors that can occur in the blob filesystem
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Meta entry (de)serialization failed
    Json(serde_json::Error),

    /// Path has no meta entry, or the blob is not registered
    NotFound,

    /// Blob id is too short to address the blob tree
    InvalidId(BlobId),

    /// Refcount decrement on a blob that has no remaining references
    RefcountUnderflow(BlobId),

    /// On-disk state contradicts the content-addressed layout
    Corruption(PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlobFsError: {self:?}")
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Blob filesystem result
pub type Result<T> = std::result::Result<T, Error>;
