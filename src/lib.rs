// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A content-addressed blob filesystem with a path-indexed namespace.
//!
//! Two planes are layered over one base directory:
//!
//! - The *blob plane* stores opaque byte streams under the lowercase hex
//!   SHA-256 digest of their content, deduplicating equal payloads, with
//!   reference-counted lifetime and a stop-the-world garbage collector.
//! - The *meta plane* maps caller-chosen, slash-delimited paths to blob ids
//!   and carries per-path metadata (creation time, free-form options).
//!
//! Writes stage into a cache folder and are renamed into the blob tree, so
//! a half-written blob is never addressable. Replacing a path's content
//! atomically swaps the referenced blob while honoring refcounts; blobs
//! that lose their last reference linger until [`BlobFs::blob_gc`] sweeps
//! them.
//!
//! All operations are safe under concurrent use from arbitrary threads.
//! The locks are process-local: sharing one base directory between
//! processes is not supported.
//!
//! # Example usage
//!
//! ```
//! use blobfs::{Config, Objects};
//! use std::io::Read;
//! #
//! # let folder = tempfile::tempdir()?;
//!
//! let fs = Config::new(folder.path()).open()?;
//!
//! fs.push("reports/2024/q1", "hello world".as_bytes(), None)?;
//!
//! // pushing equal bytes elsewhere references the same blob
//! fs.push("latest", "hello world".as_bytes(), None)?;
//!
//! let mut content = fs.pull("reports/2024/q1")?;
//! let mut buf = String::new();
//! content.read_to_string(&mut buf)?;
//! assert_eq!("hello world", buf);
//!
//! // namespaces prefix every path they are given
//! let team = fs.child("team-a");
//! team.push("notes", "n".as_bytes(), None)?;
//! assert!(fs.pull("team-a/notes").is_ok());
//!
//! // expire everything, then reclaim the unreferenced blobs
//! fs.remove("", None, chrono::TimeDelta::milliseconds(-1))?;
//! fs.blob_gc()?;
//! assert!(fs.pull_or_none("latest").is_none());
//! #
//! # Ok::<(), blobfs::Error>(())
//! ```
//!
//! For a one-way byte stream that should be persisted as a side effect,
//! [`Objects::transparent`] tees the stream: the caller reads the bytes
//! while the same sequence is committed at the target path.

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]

mod r#abstract;

mod blob_fs;

#[doc(hidden)]
pub mod blob_store;

mod config;
mod error;

#[doc(hidden)]
pub mod file;

#[doc(hidden)]
pub mod lock_group;

mod meta;
mod namespace;
mod path;
mod pipe;

#[doc(hidden)]
pub mod ref_table;

mod tee;

pub use crate::{
    blob_fs::BlobFs,
    config::Config,
    error::{Error, Result},
    meta::PullContent,
    namespace::Namespace,
    r#abstract::Objects,
    tee::Transparent,
};

/// Blob id: the lowercase hexadecimal rendering of the SHA-256 digest of
/// the blob's content (64 characters). Doubles as the entry's ETag.
pub type BlobId = String;
