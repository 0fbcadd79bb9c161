// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::{Error, ErrorKind, Read, Result, Write};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

enum Message {
    Chunk(Vec<u8>),
    Failed(Error),
}

/// Creates an in-process byte pipe.
///
/// The pipe is a rendezvous channel: a write blocks until the read side has
/// picked the chunk up, which is what couples consumer back-pressure to the
/// producer. Dropping the reader fails subsequent writes with `BrokenPipe`;
/// dropping the writer yields end-of-stream. [`PipeWriter::close_with_error`]
/// makes the reader observe the error once buffered chunks are drained.
pub(crate) fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = sync_channel(0);

    (
        PipeWriter { tx },
        PipeReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
            failed: None,
        },
    )
}

/// Write end of a [`pipe`].
pub(crate) struct PipeWriter {
    tx: SyncSender<Message>,
}

impl PipeWriter {
    /// Closes the pipe, failing the read side with `error`.
    pub(crate) fn close_with_error(self, error: Error) {
        // the reader may already be gone
        let _ = self.tx.send(Message::Failed(error));
    }
}

impl Write for PipeWriter {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        self.tx
            .send(Message::Chunk(data.to_vec()))
            .map_err(|_| Error::new(ErrorKind::BrokenPipe, "pipe reader was closed"))?;

        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Read end of a [`pipe`].
pub(crate) struct PipeReader {
    rx: Receiver<Message>,
    chunk: Vec<u8>,
    pos: usize,
    failed: Option<(ErrorKind, String)>,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.pos < self.chunk.len() {
                let mut rest = self.chunk.get(self.pos..).unwrap_or_default();
                let count = rest.read(buf)?;
                self.pos += count;
                return Ok(count);
            }

            if let Some((kind, message)) = &self.failed {
                return Err(Error::new(*kind, message.clone()));
            }

            match self.rx.recv() {
                Ok(Message::Chunk(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Message::Failed(error)) => {
                    self.failed = Some((error.kind(), error.to_string()));
                }

                // writer is gone, stream ends
                Err(_) => return Ok(0),
            }
        }
    }
}
