// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    blob_store::BlobStore,
    config::Config,
    file::{self, META_FILE, META_FOLDER},
    lock_group::LockGroup,
    meta::{MetaEntry, PullContent},
    namespace::Namespace,
    path::normalize,
    r#abstract::Objects,
    tee::Transparent,
    Error,
};
use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use std::{
    collections::HashMap,
    io::{ErrorKind, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

/// A content-addressed blob filesystem over one base directory.
///
/// Cheaply cloneable handle; all clones share the same state.
///
/// # Examples
///
/// ```
/// use blobfs::{Config, Objects};
/// # use std::io::Read;
/// #
/// # let folder = tempfile::tempdir()?;
///
/// let fs = Config::new(folder.path()).open()?;
///
/// fs.push("reports/q1", "hello world".as_bytes(), None)?;
///
/// let mut content = fs.pull("reports/q1")?;
/// let mut buf = String::new();
/// content.read_to_string(&mut buf)?;
/// assert_eq!("hello world", buf);
/// #
/// # Ok::<(), blobfs::Error>(())
/// ```
#[derive(Clone)]
pub struct BlobFs(Arc<BlobFsInner>);

impl std::ops::Deref for BlobFs {
    type Target = BlobFsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[allow(clippy::module_name_repetitions)]
pub struct BlobFsInner {
    /// Base folder
    pub path: PathBuf,

    /// Meta tree root (`<base>/meta`)
    pub(crate) meta_path: PathBuf,

    /// Content-addressed blob plane
    pub(crate) blobs: BlobStore,

    /// Per-path lock table for the meta plane
    pub(crate) meta_lockers: LockGroup,
}

impl BlobFs {
    /// Opens a blob filesystem per the given configuration.
    ///
    /// Creates the directory layout if missing and rebuilds in-memory
    /// refcounts from the blob tree.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn open(config: Config) -> crate::Result<Self> {
        let path = std::path::absolute(&config.path)?;
        std::fs::create_dir_all(&path)?;

        let meta_path = path.join(META_FOLDER);
        std::fs::create_dir_all(&meta_path)?;

        let blobs = BlobStore::recover(
            path.join(file::BLOB_FOLDER),
            path.join(file::CACHE_FOLDER),
        )?;

        // re-link every persisted meta entry so surviving blobs are not
        // swept before their paths are touched again
        seed_meta_links(&blobs, &meta_path)?;

        log::debug!("Opened blob filesystem at {path:?}");

        Ok(Self(Arc::new(BlobFsInner {
            path,
            meta_path,
            blobs,
            meta_lockers: LockGroup::default(),
        })))
    }

    /// Removes every blob no meta entry references anymore.
    ///
    /// Stop-the-world for the blob plane: mutually exclusive with all
    /// concurrent blob creation and opening.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn blob_gc(&self) -> crate::Result<()> {
        self.blobs.gc()
    }

    fn meta_folder(&self, norm: &str) -> PathBuf {
        if norm.is_empty() {
            self.meta_path.clone()
        } else {
            self.meta_path.join(norm)
        }
    }

    fn meta_load(&self, norm: &str) -> crate::Result<MetaEntry> {
        let payload = match std::fs::read(self.meta_folder(norm).join(META_FILE)) {
            Ok(payload) => payload,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::NotFound),
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_slice(&payload)?)
    }

    fn meta_save(&self, norm: &str, entry: &MetaEntry) -> crate::Result<()> {
        let folder = self.meta_folder(norm);
        std::fs::create_dir_all(&folder)?;

        let payload = serde_json::to_vec(entry)?;
        file::rewrite_atomic(&folder.join(META_FILE), &payload)?;

        Ok(())
    }

    /// Push body, assuming the caller already holds the per-path write lock.
    pub(crate) fn push_locked<R: Read>(
        &self,
        norm: &str,
        input: R,
        extras: Option<HashMap<String, String>>,
    ) -> crate::Result<()> {
        let id = self.blobs.create(input)?;

        // swap the referenced blob: the old one loses this path's
        // reference before the new one gains it
        if let Ok(prior) = self.meta_load(norm) {
            self.blobs.unlink(&prior.blob)?;
        }
        self.blobs.link(&id)?;

        log::trace!("push {norm:?} -> {id}");

        self.meta_save(
            norm,
            &MetaEntry {
                blob: id,
                create_at: Utc::now(),
                extras: extras.unwrap_or_default(),
            },
        )
    }

    fn remove_walk(
        &self,
        folder: &Path,
        filter: Option<&Regex>,
        deadline: DateTime<Utc>,
    ) -> crate::Result<()> {
        let read_dir = match std::fs::read_dir(folder) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in read_dir {
            let entry = entry?;

            if entry.file_type()?.is_dir() {
                self.remove_walk(&entry.path(), filter, deadline)?;
            } else if entry.file_name() == META_FILE {
                self.remove_entry(&entry.path(), filter, deadline)?;
            }
        }

        Ok(())
    }

    fn remove_entry(
        &self,
        meta_file: &Path,
        filter: Option<&Regex>,
        deadline: DateTime<Utc>,
    ) -> crate::Result<()> {
        #[expect(
            clippy::expect_used,
            reason = "meta files live inside their path folder"
        )]
        let folder = meta_file.parent().expect("should have a parent");

        let Ok(rel) = folder.strip_prefix(&self.meta_path) else {
            return Ok(());
        };
        let logical = rel.to_string_lossy().replace('\\', "/");

        if let Some(filter) = filter {
            if !filter.is_match(&logical) {
                return Ok(());
            }
        }

        let handle = self.meta_lockers.open(&logical);
        let _guard = handle.lock(false);

        let meta = match self.meta_load(&logical) {
            Ok(meta) => meta,

            // raced with another remove
            Err(Error::NotFound) => return Ok(()),

            Err(e) => return Err(e),
        };

        if meta.create_at < deadline {
            self.blobs.unlink(&meta.blob)?;
            std::fs::remove_file(meta_file)?;
            self.meta_lockers.delete(&logical);

            log::trace!("removed meta entry {logical:?}");
        }

        Ok(())
    }
}

/// Walks the meta tree on startup and links each entry's blob.
///
/// Refcounts are process-local; after a restart the blob scan seeds every
/// count at zero, so the meta entries' references are replayed here. An
/// entry pointing at a missing blob is left alone and surfaces as
/// `NotFound` on pull.
fn seed_meta_links(blobs: &BlobStore, folder: &Path) -> crate::Result<()> {
    let read_dir = match std::fs::read_dir(folder) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for entry in read_dir {
        let entry = entry?;

        if entry.file_type()?.is_dir() {
            seed_meta_links(blobs, &entry.path())?;
        } else if entry.file_name() == META_FILE {
            let payload = std::fs::read(entry.path())?;

            let Ok(meta) = serde_json::from_slice::<MetaEntry>(&payload) else {
                log::warn!("skipping unparsable meta entry {:?}", entry.path());
                continue;
            };

            if blobs.link(&meta.blob).is_err() {
                log::warn!(
                    "meta entry {:?} references unknown blob {}",
                    entry.path(),
                    meta.blob,
                );
            }
        }
    }

    Ok(())
}

impl Objects for BlobFs {
    fn push<R: Read>(
        &self,
        path: &str,
        input: R,
        extras: Option<HashMap<String, String>>,
    ) -> crate::Result<()> {
        let norm = normalize(path);

        let handle = self.meta_lockers.open(&norm);
        let _guard = handle.lock(false);

        self.push_locked(&norm, input, extras)
    }

    fn pull(&self, path: &str) -> crate::Result<PullContent> {
        let norm = normalize(path);

        let handle = self.meta_lockers.open(&norm);
        let _guard = handle.lock(true);

        let meta = match self.meta_load(&norm) {
            Ok(meta) => meta,
            Err(e) => {
                self.meta_lockers.delete(&norm);
                return Err(e);
            }
        };

        match self.blobs.open(&meta.blob) {
            Ok(file) => Ok(PullContent {
                file,
                create_at: meta.create_at,
                etag: meta.blob,
                extras: meta.extras,
            }),
            Err(e) => {
                self.meta_lockers.delete(&norm);
                Err(e)
            }
        }
    }

    fn cleanup(&self, path: &str) -> crate::Result<()> {
        let norm = normalize(path);

        let handle = self.meta_lockers.open(&norm);
        let _guard = handle.lock(false);

        let mut meta = self.meta_load(&norm)?;
        meta.create_at = Utc::now();

        self.meta_save(&norm, &meta)
    }

    fn remove(&self, base: &str, filter: Option<&Regex>, ttl: TimeDelta) -> crate::Result<()> {
        let deadline = Utc::now() - ttl;
        let root = self.meta_folder(&normalize(base));

        self.remove_walk(&root, filter, deadline)
    }

    fn transparent<R: Read + Send + 'static>(
        &self,
        path: &str,
        input: R,
        extras: Option<HashMap<String, String>>,
    ) -> Transparent {
        let norm = normalize(path);

        let handle = self.meta_lockers.open(&norm);
        let guard = handle.lock(false);

        Transparent::spawn(self.clone(), norm, guard, input, extras)
    }

    fn child(&self, name: &str) -> Namespace {
        Namespace::new(self.clone(), name)
    }
}
