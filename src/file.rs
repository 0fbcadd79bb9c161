// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{io::Write, path::Path};

pub const BLOB_FOLDER: &str = "blob";
pub const CACHE_FOLDER: &str = "cache";
pub const META_FOLDER: &str = "meta";

/// File name of a meta entry inside its path folder.
pub const META_FILE: &str = ".meta";

/// Reserved path component, escaped alongside [`META_FILE`].
pub const RESERVED_BLOB: &str = ".blob";

/// Name prefix of staging files inside the cache folder.
pub const CACHE_PREFIX: &str = "cache.";

/// Atomically rewrites a file.
pub fn rewrite_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    #[expect(
        clippy::expect_used,
        reason = "every file should have a parent directory"
    )]
    let folder = path.parent().expect("should have a parent");

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file_mut().sync_all()?;
    temp_file.persist(path)?;

    #[cfg(not(target_os = "windows"))]
    fsync_directory(folder)?;

    Ok(())
}

#[cfg(not(target_os = "windows"))]
pub fn fsync_directory(path: &Path) -> std::io::Result<()> {
    let file = std::fs::File::open(path)?;
    debug_assert!(file.metadata()?.is_dir());
    file.sync_all()
}

#[cfg(target_os = "windows")]
pub fn fsync_directory(_path: &Path) -> std::io::Result<()> {
    // Cannot fsync directory on Windows
    Ok(())
}
