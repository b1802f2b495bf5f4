//! Background writer for one stream file.
//!
//! The file is created and the header encoded when the writer is created.
//! Frame records are handed to a dedicated worker thread through a bounded
//! channel, so every append for a file is written in submission order and
//! never blocks the caller on disk I/O. When the queue is full the record is
//! refused with `QueueFull` and nothing is written for it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use crate::depth_pipeline::common::error::{PipelineError, Result};
use crate::depth_pipeline::stream_file::header::{FpsMode, StreamFileHeader};

/// Records a writer may hold in memory before appends are refused.
pub const WRITER_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterKind {
    /// Exactly one frame, elapsed time always 0
    Capture,
    /// Unbounded frames until finished
    Recording,
}

/// What ended up on disk once a writer is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub frames_written: u64,
    pub bytes_written: u64,
}

enum WriterCommand {
    Append { elapsed_ms: u32, payload: Vec<u8> },
    Sync(Sender<Result<()>>),
}

pub struct StreamWriter {
    path: PathBuf,
    header: StreamFileHeader,
    kind: WriterKind,
    frames_submitted: u64,
    sender: Option<Sender<WriterCommand>>,
    worker: Option<JoinHandle<Result<WriteSummary>>>,
}

impl StreamWriter {
    pub fn open_for_capture<P: AsRef<Path>>(
        path: P,
        platform_id: u8,
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
    ) -> Result<Self> {
        let header = StreamFileHeader::dynamic(platform_id, width, height, bytes_per_pixel);
        Self::create(path, header, WriterKind::Capture)
    }

    pub fn open_for_recording<P: AsRef<Path>>(
        path: P,
        platform_id: u8,
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
    ) -> Result<Self> {
        let header = StreamFileHeader::dynamic(platform_id, width, height, bytes_per_pixel);
        Self::create(path, header, WriterKind::Recording)
    }

    pub fn create<P: AsRef<Path>>(
        path: P,
        header: StreamFileHeader,
        kind: WriterKind,
    ) -> Result<Self> {
        Self::create_with_capacity(path, header, kind, WRITER_QUEUE_CAPACITY)
    }

    /// Like [`StreamWriter::create`] with a custom queue capacity (at least 1).
    pub fn create_with_capacity<P: AsRef<Path>>(
        path: P,
        header: StreamFileHeader,
        kind: WriterKind,
        capacity: usize,
    ) -> Result<Self> {
        header.validate()?;
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut output = BufWriter::new(file);
        header.write_to(&mut output)?;

        debug!(path = %path.display(), kind = ?kind, "Stream file created");

        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        let worker_path = path.clone();
        let worker = thread::Builder::new()
            .name("stream-writer".to_string())
            .spawn(move || write_loop(worker_path, header, output, receiver))?;

        Ok(Self {
            path,
            header,
            kind,
            frames_submitted: 0,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &StreamFileHeader {
        &self.header
    }

    pub fn kind(&self) -> WriterKind {
        self.kind
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Queues one frame record. Returns once the record is queued, not written.
    /// Fails with `QueueFull` when the writer thread is behind.
    pub fn append_frame(&mut self, elapsed_ms: u32, payload: Vec<u8>) -> Result<()> {
        if payload.len() != self.header.frame_bytes() {
            return Err(PipelineError::FrameSize {
                expected: self.header.frame_bytes(),
                actual: payload.len(),
            });
        }
        if self.kind == WriterKind::Capture && self.frames_submitted > 0 {
            return Err(PipelineError::WriterClosed);
        }
        let elapsed_ms = match self.kind {
            WriterKind::Capture => 0,
            WriterKind::Recording => elapsed_ms,
        };

        let sender = self.sender.as_ref().ok_or(PipelineError::WriterClosed)?;
        match sender.try_send(WriterCommand::Append { elapsed_ms, payload }) {
            Ok(()) => {
                self.frames_submitted += 1;
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                warn!(path = %self.path.display(), "Writer queue full, dropping frame");
                Err(PipelineError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(PipelineError::WriterClosed),
        }
    }

    /// Blocks until every record queued so far is flushed to the file.
    pub fn sync(&self) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(PipelineError::WriterClosed)?;
        let (ack_sender, ack_receiver) = crossbeam_channel::bounded(1);
        sender
            .send(WriterCommand::Sync(ack_sender))
            .map_err(|_| PipelineError::WriterClosed)?;
        ack_receiver.recv().map_err(|_| PipelineError::WriterClosed)?
    }

    /// Stops accepting frames, waits for queued records and closes the file.
    pub fn finish(mut self) -> Result<WriteSummary> {
        self.shutdown()
    }

    /// Like [`StreamWriter::finish`], but waits on a separate thread and hands
    /// the outcome to `on_done`.
    pub fn finish_detached<F>(mut self, on_done: F)
    where
        F: FnOnce(Result<WriteSummary>) + Send + 'static,
    {
        let sender = self.sender.take();
        let worker = self.worker.take();
        let path = self.path.clone();
        let spawned = thread::Builder::new()
            .name("stream-finalize".to_string())
            .spawn(move || {
                drop(sender);
                on_done(join_worker(worker));
            });
        if let Err(e) = spawned {
            error!(path = %path.display(), error = %e, "Cannot spawn stream finalizer");
        }
    }

    fn shutdown(&mut self) -> Result<WriteSummary> {
        self.sender.take();
        join_worker(self.worker.take())
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if let Err(e) = self.shutdown() {
            warn!(path = %self.path.display(), error = %e, "Stream writer dropped with error");
        }
    }
}

fn join_worker(worker: Option<JoinHandle<Result<WriteSummary>>>) -> Result<WriteSummary> {
    let worker = worker.ok_or(PipelineError::WriterClosed)?;
    worker.join().map_err(|_| PipelineError::WriterClosed)?
}

fn write_loop(
    path: PathBuf,
    header: StreamFileHeader,
    mut output: BufWriter<File>,
    receiver: Receiver<WriterCommand>,
) -> Result<WriteSummary> {
    let mut frames_written = 0u64;
    let mut bytes_written = header.encode().len() as u64;
    let mut failure: Option<std::io::Error> = None;

    for command in receiver {
        match command {
            WriterCommand::Append { elapsed_ms, payload } => {
                if failure.is_some() {
                    continue;
                }
                match write_record(&mut output, &header, elapsed_ms, &payload) {
                    Ok(written) => {
                        frames_written += 1;
                        bytes_written += written;
                    }
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "Failed to append frame");
                        failure = Some(e);
                    }
                }
            }
            WriterCommand::Sync(ack) => {
                let result = match &failure {
                    Some(e) => Err(PipelineError::Io(std::io::Error::new(e.kind(), e.to_string()))),
                    None => output.flush().map_err(PipelineError::from),
                };
                let _ = ack.send(result);
            }
        }
    }

    if let Some(e) = failure {
        return Err(PipelineError::Io(e));
    }
    output.flush()?;
    output.get_ref().sync_all()?;

    info!(
        path = %path.display(),
        frames = frames_written,
        bytes = bytes_written,
        "Stream file closed"
    );
    Ok(WriteSummary {
        path,
        frames_written,
        bytes_written,
    })
}

fn write_record(
    output: &mut BufWriter<File>,
    header: &StreamFileHeader,
    elapsed_ms: u32,
    payload: &[u8],
) -> std::io::Result<u64> {
    let mut written = payload.len() as u64;
    if header.fps_mode == FpsMode::Dynamic {
        output.write_all(&elapsed_ms.to_le_bytes())?;
        written += 4;
    }
    output.write_all(payload)?;
    Ok(written)
}
