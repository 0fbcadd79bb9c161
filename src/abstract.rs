// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{meta::PullContent, namespace::Namespace, tee::Transparent};
use chrono::TimeDelta;
use regex::Regex;
use std::{collections::HashMap, io::Read};

/// Capability set shared by the root filesystem and its namespace facades.
///
/// Paths are forward-slash delimited and normalized before use: duplicate
/// and surrounding slashes are dropped, `.`/`..` are resolved, and reserved
/// component names are escaped.
pub trait Objects {
    /// Stores `input` at `path`, replacing any previous content.
    ///
    /// The bytes are deduplicated by digest: pushing equal content to many
    /// paths stores one blob. `extras` is a free-form string map persisted
    /// alongside the entry.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    fn push<R: Read>(
        &self,
        path: &str,
        input: R,
        extras: Option<HashMap<String, String>>,
    ) -> crate::Result<()>;

    /// Opens the content stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entry exists at `path`.
    fn pull(&self, path: &str) -> crate::Result<PullContent>;

    /// Like [`Objects::pull`], but maps any failure to `None`.
    fn pull_or_none(&self, path: &str) -> Option<PullContent> {
        self.pull(path).ok()
    }

    /// Rewrites the entry's timestamp to now, leaving content untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entry exists at `path`.
    fn cleanup(&self, path: &str) -> crate::Result<()>;

    /// Removes entries under `base` whose timestamp is older than `ttl`.
    ///
    /// `filter`, if set, must match an entry's normalized path for it to be
    /// considered. A negative `ttl` expires everything. A missing base is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    fn remove(&self, base: &str, filter: Option<&Regex>, ttl: TimeDelta) -> crate::Result<()>;

    /// Streams `input` back to the caller while persisting it at `path`.
    ///
    /// See [`Transparent`] for the locking and cancellation contract.
    fn transparent<R: Read + Send + 'static>(
        &self,
        path: &str,
        input: R,
        extras: Option<HashMap<String, String>>,
    ) -> Transparent;

    /// Returns a facade that prefixes every path with `name`.
    fn child(&self, name: &str) -> Namespace;
}
