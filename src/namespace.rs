// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    blob_fs::BlobFs, meta::PullContent, r#abstract::Objects, tee::Transparent,
};
use chrono::TimeDelta;
use regex::Regex;
use std::{collections::HashMap, io::Read};

/// Prefix-prepending facade over a [`BlobFs`].
///
/// Every operation delegates to the root filesystem with `<group>/`
/// prepended to the path; nested children compose their prefixes.
#[derive(Clone)]
pub struct Namespace {
    root: BlobFs,
    group: String,
}

impl Namespace {
    pub(crate) fn new(root: BlobFs, group: &str) -> Self {
        Self {
            root,
            group: group.trim_matches('/').to_string(),
        }
    }

    fn prefixed(&self, path: &str) -> String {
        format!("{}/{path}", self.group)
    }
}

impl Objects for Namespace {
    fn push<R: Read>(
        &self,
        path: &str,
        input: R,
        extras: Option<HashMap<String, String>>,
    ) -> crate::Result<()> {
        self.root.push(&self.prefixed(path), input, extras)
    }

    fn pull(&self, path: &str) -> crate::Result<PullContent> {
        self.root.pull(&self.prefixed(path))
    }

    fn cleanup(&self, path: &str) -> crate::Result<()> {
        self.root.cleanup(&self.prefixed(path))
    }

    fn remove(&self, base: &str, filter: Option<&Regex>, ttl: TimeDelta) -> crate::Result<()> {
        self.root.remove(&self.prefixed(base), filter, ttl)
    }

    fn transparent<R: Read + Send + 'static>(
        &self,
        path: &str,
        input: R,
        extras: Option<HashMap<String, String>>,
    ) -> Transparent {
        self.root.transparent(&self.prefixed(path), input, extras)
    }

    fn child(&self, name: &str) -> Namespace {
        Namespace::new(self.root.clone(), &self.prefixed(name))
    }
}
