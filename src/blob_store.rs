// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    file::CACHE_PREFIX,
    lock_group::LockGroup,
    ref_table::RefTable,
    BlobId, Error,
};
use sha2::{Digest, Sha256};
use std::{
    fs::File,
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
    sync::RwLock,
};

/// Content-addressed blob storage over a directory tree.
///
/// Blobs are keyed by the lowercase hex SHA-256 digest of their content and
/// live under `blob/<xx>/<yy>/<id>` where `xx`/`yy` are the first two
/// 2-char prefixes of the id. Writes stage into `cache/` and are renamed
/// into place, so a half-written blob is never addressable.
///
/// All mutations hold `gc_lock` shared; [`BlobStore::gc`] holds it
/// exclusively, so no file disappears mid-operation. Lock order is
/// `gc_lock`, then the per-id lock, then the [`RefTable`] latch; it is never
/// inverted.
pub struct BlobStore {
    blob_path: PathBuf,
    cache_path: PathBuf,

    lockers: LockGroup,
    refs: RefTable,

    gc_lock: RwLock<()>,
}

/// Fans written bytes into the staging file and the digest state.
struct DigestWriter<W: Write> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.inner.write_all(data)?;
        self.hasher.update(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

fn is_valid_id(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|byte| matches!(byte, b'0'..=b'9' | b'a'..=b'f'))
}

impl BlobStore {
    /// Opens the store, rebuilding in-memory refcounts from the blob tree.
    ///
    /// Every regular file whose name is a valid blob id is registered with
    /// a zero count; nothing else is persisted across restarts.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn recover(blob_path: PathBuf, cache_path: PathBuf) -> crate::Result<Self> {
        std::fs::create_dir_all(&blob_path)?;
        std::fs::create_dir_all(&cache_path)?;

        let store = Self {
            blob_path,
            cache_path,
            lockers: LockGroup::default(),
            refs: RefTable::default(),
            gc_lock: RwLock::new(()),
        };

        store.scan(&store.blob_path)?;

        log::debug!(
            "Recovered blob store at {:?}, {} blobs registered",
            store.blob_path,
            store.refs.len(),
        );

        Ok(store)
    }

    fn scan(&self, folder: &Path) -> crate::Result<()> {
        for entry in std::fs::read_dir(folder)? {
            let entry = entry?;

            if entry.file_type()?.is_dir() {
                self.scan(&entry.path())?;
            } else if let Some(name) = entry.file_name().to_str() {
                if is_valid_id(name) {
                    self.refs.init(name);
                }
            }
        }

        Ok(())
    }

    fn blob_file_path(&self, id: &str) -> crate::Result<PathBuf> {
        match (id.get(0..2), id.get(2..4)) {
            (Some(first), Some(second)) if id.len() >= 5 => {
                Ok(self.blob_path.join(first).join(second).join(id))
            }
            _ => Err(Error::InvalidId(id.into())),
        }
    }

    /// Streams `input` into the store, returning the content digest id.
    ///
    /// Idempotent: concurrent calls with identical input settle on the same
    /// id without leaving orphan files. An existing regular file at the
    /// destination is renamed over, which is benign since equal ids imply
    /// equal content.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or `Corruption` if the
    /// destination exists as a directory.
    pub fn create<R: Read>(&self, mut input: R) -> crate::Result<BlobId> {
        let _gc = self.gc_lock.read().expect("lock is poisoned");

        // stage into the cache folder; the temp file removes itself if we
        // bail before the rename
        let staged = tempfile::Builder::new()
            .prefix(CACHE_PREFIX)
            .tempfile_in(&self.cache_path)?;

        let mut writer = DigestWriter {
            inner: staged,
            hasher: Sha256::new(),
        };
        std::io::copy(&mut input, &mut writer)?;
        writer.flush()?;

        let id: BlobId = hex::encode(writer.hasher.finalize());

        let handle = self.lockers.open(&id);
        let _guard = handle.lock(false);

        let dest = self.blob_file_path(&id)?;

        #[expect(
            clippy::expect_used,
            reason = "the fan-out path always has a parent directory"
        )]
        std::fs::create_dir_all(dest.parent().expect("should have a parent"))?;

        match dest.metadata() {
            Ok(meta) if meta.is_dir() => return Err(Error::Corruption(dest)),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        writer.inner.persist(&dest).map_err(|e| Error::Io(e.error))?;
        self.refs.init(&id);

        log::trace!("created blob {id}");

        Ok(id)
    }

    /// Opens a blob for reading.
    ///
    /// The returned handle's lifetime is independent of the garbage
    /// collector: on POSIX hosts a later sweep unlinks the file while the
    /// handle keeps reading, and on Windows the file is opened with delete
    /// sharing so the sweep succeeds as well.
    ///
    /// # Errors
    ///
    /// Returns `InvalidId` for ids shorter than 5 characters and `NotFound`
    /// for unregistered ids.
    pub fn open(&self, id: &str) -> crate::Result<File> {
        let _gc = self.gc_lock.read().expect("lock is poisoned");

        let dest = self.blob_file_path(id)?;

        if !self.refs.exists(id) {
            return Err(Error::NotFound);
        }

        Ok(File::open(dest)?)
    }

    /// Increments the refcount of `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not registered.
    pub fn link(&self, id: &str) -> crate::Result<()> {
        self.refs.link(id)
    }

    /// Decrements the refcount of `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is not registered, `RefcountUnderflow`
    /// if the count is already zero.
    pub fn unlink(&self, id: &str) -> crate::Result<()> {
        self.refs.unlink(id)
    }

    /// Removes a blob regardless of its refcount.
    ///
    /// A missing file is not an error. The per-id lock handle and the
    /// refcount entry are retired along with the file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn delete(&self, id: &str) -> crate::Result<()> {
        let _gc = self.gc_lock.read().expect("lock is poisoned");

        let dest = self.blob_file_path(id)?;

        let handle = self.lockers.open(id);
        let _guard = handle.lock(false);

        match std::fs::remove_file(dest) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.lockers.delete(id);
        self.refs.delete(id);

        Ok(())
    }

    /// Removes every blob whose refcount is zero.
    ///
    /// Mutually exclusive with all other store operations. A removal error
    /// short-circuits the sweep; the affected entry is retained and retried
    /// on the next pass.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn gc(&self) -> crate::Result<()> {
        let _gc = self.gc_lock.write().expect("lock is poisoned");

        let mut swept = 0;

        self.refs.gc(|id| {
            let dest = self.blob_file_path(id)?;

            let handle = self.lockers.open(id);
            let _guard = handle.lock(false);

            match std::fs::remove_file(dest) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    log::error!("could not sweep blob {id}: {e:?}");
                    return Err(e.into());
                }
            }

            self.lockers.delete(id);
            swept += 1;

            Ok(())
        })?;

        log::debug!("blob gc swept {swept} blobs");

        Ok(())
    }

    /// Number of blobs currently registered.
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.refs.len()
    }
}
