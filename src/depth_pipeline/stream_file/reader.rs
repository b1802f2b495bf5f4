use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use tracing::debug;

use crate::depth_pipeline::common::error::{PipelineError, Result};
use crate::depth_pipeline::stream_file::header::{FpsMode, StreamFileHeader};

/// One frame record read back from a stream file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFrame {
    /// Milliseconds since the previous frame; `None` in fixed-fps files
    pub elapsed_ms: Option<u32>,
    /// Raw little-endian samples in output order
    pub payload: Vec<u8>,
}

impl RecordedFrame {
    pub fn samples(&self) -> Vec<u16> {
        self.payload
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}

/// Sequential reader over a stream file, used for post-hoc reprocessing.
pub struct StreamFileReader<R: Read = BufReader<File>> {
    input: R,
    header: StreamFileHeader,
    frames_read: u64,
}

impl StreamFileReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening stream file");
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read> StreamFileReader<R> {
    pub fn from_reader(mut input: R) -> Result<Self> {
        let header = StreamFileHeader::read_from(&mut input)?;
        Ok(Self {
            input,
            header,
            frames_read: 0,
        })
    }

    pub fn header(&self) -> &StreamFileHeader {
        &self.header
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Reads the next record, `None` at a clean end of file.
    pub fn next_frame(&mut self) -> Result<Option<RecordedFrame>> {
        let elapsed_ms = match self.header.fps_mode {
            FpsMode::Dynamic => {
                let mut word = [0u8; 4];
                match read_full(&mut self.input, &mut word)? {
                    0 => return Ok(None),
                    4 => Some(u32::from_le_bytes(word)),
                    partial => {
                        return Err(self.truncated(partial, word.len()));
                    }
                }
            }
            FpsMode::Fixed(_) => None,
        };

        let mut payload = vec![0u8; self.header.frame_bytes()];
        let read = read_full(&mut self.input, &mut payload)?;
        if read == 0 && elapsed_ms.is_none() {
            return Ok(None);
        }
        if read != payload.len() {
            return Err(self.truncated(read, payload.len()));
        }

        self.frames_read += 1;
        Ok(Some(RecordedFrame { elapsed_ms, payload }))
    }

    fn truncated(&self, got: usize, wanted: usize) -> PipelineError {
        PipelineError::MalformedStream(format!(
            "record {} truncated: {} of {} bytes",
            self.frames_read, got, wanted
        ))
    }
}

impl<R: Read> Iterator for StreamFileReader<R> {
    type Item = Result<RecordedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

/// Fills `buf` as far as the input allows and reports how many bytes were read.
fn read_full<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(PipelineError::Io(e)),
        }
    }
    Ok(filled)
}
