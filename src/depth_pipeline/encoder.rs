//! Colour stream encoding during recordings

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use crate::depth_pipeline::common::error::{PipelineError, Result};

/// Sink for the colour frames of a recording.
///
/// `start` is called once when a recording begins, `push_frame` for every
/// colour frame delivered while it runs and `stop` when it ends.
pub trait ColorEncoder: Send {
    /// Extension (without dot) of the files this encoder produces.
    fn file_extension(&self) -> &str;
    fn start(&mut self, path: &Path) -> Result<()>;
    fn push_frame(&mut self, frame: &[u8]) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

/// Writes the colour stream as Motion-JPEG: encoded frames back to back.
#[derive(Default)]
pub struct MjpegFileEncoder {
    output: Option<(PathBuf, BufWriter<File>)>,
    frames: u64,
}

impl MjpegFileEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.output.is_some()
    }
}

impl ColorEncoder for MjpegFileEncoder {
    fn file_extension(&self) -> &str {
        "mjpeg"
    }

    fn start(&mut self, path: &Path) -> Result<()> {
        if self.output.is_some() {
            return Err(PipelineError::Encode("encoder already started".to_string()));
        }
        let file = File::create(path)?;
        self.output = Some((path.to_path_buf(), BufWriter::new(file)));
        self.frames = 0;
        debug!(path = %path.display(), "Colour encoder started");
        Ok(())
    }

    fn push_frame(&mut self, frame: &[u8]) -> Result<()> {
        let (_, output) = self
            .output
            .as_mut()
            .ok_or_else(|| PipelineError::Encode("encoder not started".to_string()))?;
        output.write_all(frame)?;
        self.frames += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let Some((path, mut output)) = self.output.take() else {
            return Ok(());
        };
        output.flush()?;
        output.get_ref().sync_all()?;
        info!(path = %path.display(), frames = self.frames, "Colour stream closed");
        Ok(())
    }
}

type ColorWorkerResult = (Box<dyn ColorEncoder>, Result<u64>);

/// Runs a started [`ColorEncoder`] on a `color-writer` thread fed by a
/// bounded queue, so encoding never happens on the frame-delivery thread.
pub struct ColorStreamWriter {
    sender: Option<Sender<Vec<u8>>>,
    worker: Option<JoinHandle<ColorWorkerResult>>,
}

impl ColorStreamWriter {
    /// Moves an encoder whose `start` already succeeded onto the writer thread.
    pub fn spawn(encoder: Box<dyn ColorEncoder>, capacity: usize) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        let worker = thread::Builder::new()
            .name("color-writer".to_string())
            .spawn(move || encode_loop(encoder, receiver))?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queues one colour frame. Fails with `QueueFull` when the encoder is behind.
    pub fn push(&self, frame: Vec<u8>) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(PipelineError::WriterClosed)?;
        match sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Colour queue full, dropping frame");
                Err(PipelineError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(PipelineError::WriterClosed),
        }
    }

    /// Drains the queue, stops the encoder and hands it back for reuse along
    /// with the number of frames encoded. The encoder is lost only if the
    /// writer thread panicked.
    pub fn finish(mut self) -> (Option<Box<dyn ColorEncoder>>, Result<u64>) {
        self.shutdown()
    }

    fn shutdown(&mut self) -> (Option<Box<dyn ColorEncoder>>, Result<u64>) {
        self.sender.take();
        match self.worker.take().map(JoinHandle::join) {
            Some(Ok((encoder, result))) => (Some(encoder), result),
            Some(Err(_)) => (
                None,
                Err(PipelineError::Encode("colour writer panicked".to_string())),
            ),
            None => (None, Err(PipelineError::WriterClosed)),
        }
    }
}

impl Drop for ColorStreamWriter {
    fn drop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if let (_, Err(e)) = self.shutdown() {
            warn!(error = %e, "Colour writer dropped with error");
        }
    }
}

fn encode_loop(
    mut encoder: Box<dyn ColorEncoder>,
    receiver: Receiver<Vec<u8>>,
) -> ColorWorkerResult {
    let mut frames = 0u64;
    let mut failure = None;
    for frame in receiver {
        if failure.is_some() {
            continue;
        }
        match encoder.push_frame(&frame) {
            Ok(()) => frames += 1,
            Err(e) => {
                error!(error = %e, "Failed to encode colour frame");
                failure = Some(e);
            }
        }
    }

    let stopped = encoder.stop();
    let result = match failure {
        Some(e) => Err(e),
        None => stopped.map(|()| frames),
    };
    (encoder, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_concatenated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_rgb.mjpeg");
        let mut encoder = MjpegFileEncoder::new();

        encoder.start(&path).unwrap();
        encoder.push_frame(&[0xFF, 0xD8, 1, 0xFF, 0xD9]).unwrap();
        encoder.push_frame(&[0xFF, 0xD8, 2, 0xFF, 0xD9]).unwrap();
        encoder.stop().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 1, 0xFF, 0xD9, 0xFF, 0xD8, 2, 0xFF, 0xD9]);
        assert!(!encoder.is_active());
    }

    #[test]
    fn test_push_before_start_fails() {
        let mut encoder = MjpegFileEncoder::new();
        assert!(matches!(encoder.push_frame(&[1, 2, 3]), Err(PipelineError::Encode(_))));
    }

    #[test]
    fn test_stream_writer_encodes_off_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threaded_rgb.mjpeg");
        let mut encoder = MjpegFileEncoder::new();
        encoder.start(&path).unwrap();

        let writer = ColorStreamWriter::spawn(Box::new(encoder), 8).unwrap();
        writer.push(vec![1, 2]).unwrap();
        writer.push(vec![3]).unwrap();
        let (encoder, result) = writer.finish();

        assert_eq!(result.unwrap(), 2);
        assert_eq!(encoder.unwrap().file_extension(), "mjpeg");
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_stream_writer_reports_encode_failure() {
        // never started, so every push fails
        let writer = ColorStreamWriter::spawn(Box::new(MjpegFileEncoder::new()), 8).unwrap();
        writer.push(vec![1]).unwrap();
        writer.push(vec![2]).unwrap();
        let (encoder, result) = writer.finish();

        assert!(encoder.is_some());
        assert!(matches!(result, Err(PipelineError::Encode(_))));
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut encoder = MjpegFileEncoder::new();
        assert!(encoder.stop().is_ok());
    }
}
