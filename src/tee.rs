// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    blob_fs::BlobFs,
    lock_group::LockGuard,
    pipe::{pipe, PipeReader},
    Error,
};
use std::{
    collections::HashMap,
    io::{ErrorKind, Read, Write},
    thread::JoinHandle,
};

const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Streaming duplication handle returned by [`crate::Objects::transparent`].
///
/// Reads deliver exactly the source's bytes while the same byte sequence is
/// persisted at the target path. Back-pressure couples the two: when the
/// consumer stops reading, ingestion into the blob store pauses as well.
///
/// The per-path write lock is taken when the tee is created and released
/// only once the consumer is closed *and* persistence has terminated, so a
/// queued writer on the same path observes either the previous content or
/// the fully committed new one. Closing (or dropping) the handle is the
/// cancellation signal: if the source failed or not all bytes were read, no
/// meta entry is written and the staged blob stays unreferenced for the
/// next [`crate::BlobFs::blob_gc`].
pub struct Transparent {
    reader: Option<PipeReader>,
    copier: Option<JoinHandle<()>>,
    persist: Option<JoinHandle<crate::Result<()>>>,
    guard: Option<LockGuard>,
}

impl Transparent {
    pub(crate) fn spawn<R: Read + Send + 'static>(
        fs: BlobFs,
        norm: String,
        guard: LockGuard,
        mut input: R,
        extras: Option<HashMap<String, String>>,
    ) -> Self {
        let (persist_writer, persist_reader) = pipe();
        let (consumer_writer, consumer_reader) = pipe();

        #[expect(clippy::expect_used, reason = "spawn only fails when out of resources")]
        let copier = std::thread::Builder::new()
            .name("blobfs-tee-copy".into())
            .spawn(move || {
                let mut persist_writer = persist_writer;
                let mut consumer_writer = consumer_writer;
                let mut buf = vec![0; COPY_CHUNK_SIZE];

                loop {
                    let chunk = match input.read(&mut buf) {
                        Ok(0) => break,
                        Ok(count) => buf.get(..count).unwrap_or_default(),
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => {
                            log::debug!("tee source failed: {e:?}");
                            let message = e.to_string();
                            persist_writer
                                .close_with_error(std::io::Error::new(e.kind(), message.clone()));
                            consumer_writer
                                .close_with_error(std::io::Error::new(e.kind(), message));
                            return;
                        }
                    };

                    // the persistence side first, matching its back-pressure
                    // against the consumer's
                    let fanned = persist_writer
                        .write_all(chunk)
                        .and_then(|()| consumer_writer.write_all(chunk));

                    if let Err(e) = fanned {
                        let message = e.to_string();
                        persist_writer
                            .close_with_error(std::io::Error::new(e.kind(), message.clone()));
                        consumer_writer.close_with_error(std::io::Error::new(e.kind(), message));
                        return;
                    }
                }

                // both writers drop here, ending both streams
            })
            .expect("should spawn tee copier");

        #[expect(clippy::expect_used, reason = "spawn only fails when out of resources")]
        let persist = std::thread::Builder::new()
            .name("blobfs-tee-push".into())
            .spawn(move || fs.push_locked(&norm, persist_reader, extras))
            .expect("should spawn tee persistence");

        Self {
            reader: Some(consumer_reader),
            copier: Some(copier),
            persist: Some(persist),
            guard: Some(guard),
        }
    }

    /// Closes the consumer side, waits for the fan-out and persistence to
    /// terminate, then releases the per-path lock.
    ///
    /// # Errors
    ///
    /// Returns the persistence outcome: `Err` if the source failed, the
    /// consumer closed before the stream ended, or storing the bytes failed.
    pub fn close(mut self) -> crate::Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> crate::Result<()> {
        // dropping the read end unblocks the copier if the consumer left
        // bytes behind
        drop(self.reader.take());

        if let Some(copier) = self.copier.take() {
            let _ = copier.join();
        }

        let outcome = match self.persist.take() {
            Some(persist) => persist.join().unwrap_or_else(|_| {
                Err(Error::Io(std::io::Error::other(
                    "tee persistence task panicked",
                )))
            }),
            None => Ok(()),
        };

        if let Some(guard) = self.guard.take() {
            guard.release();
        }

        outcome
    }
}

impl Read for Transparent {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.reader {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for Transparent {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
