use std::io::{Read, Write};

use crate::depth_pipeline::common::error::{PipelineError, Result};

/// Encoded size of [`StreamFileHeader`]: one byte plus four 32-bit integers.
pub const HEADER_LEN: usize = 1 + 4 * 4;

/// Largest frame payload a header may declare (64 MiB).
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Whether frame records carry their own timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpsMode {
    /// Every record starts with the elapsed milliseconds since the previous frame
    Dynamic,
    /// Frames arrive at a fixed rate, records carry no timestamp
    Fixed(u32),
}

impl FpsMode {
    fn code(&self) -> u32 {
        match self {
            FpsMode::Dynamic => 0,
            FpsMode::Fixed(fps) => *fps,
        }
    }

    fn from_code(code: u32) -> Self {
        match code {
            0 => FpsMode::Dynamic,
            fps => FpsMode::Fixed(fps),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFileHeader {
    pub platform_id: u8,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub fps_mode: FpsMode,
}

impl StreamFileHeader {
    pub fn dynamic(platform_id: u8, width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        Self {
            platform_id,
            width,
            height,
            bytes_per_pixel,
            fps_mode: FpsMode::Dynamic,
        }
    }

    /// Raw payload size of one frame, `None` if it does not fit in `usize`.
    pub fn checked_frame_bytes(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.bytes_per_pixel as usize)
    }

    /// Raw payload size of one frame. Saturates for geometries that
    /// [`StreamFileHeader::validate`] rejects.
    pub fn frame_bytes(&self) -> usize {
        self.checked_frame_bytes().unwrap_or(usize::MAX)
    }

    /// Checks that the declared geometry is non-empty and within [`MAX_FRAME_BYTES`].
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.bytes_per_pixel == 0 {
            return Err(PipelineError::MalformedStream(format!(
                "empty frame geometry {}x{}x{}",
                self.width, self.height, self.bytes_per_pixel
            )));
        }
        match self.checked_frame_bytes() {
            Some(bytes) if bytes <= MAX_FRAME_BYTES => Ok(()),
            _ => Err(PipelineError::MalformedStream(format!(
                "frame geometry {}x{}x{} exceeds {} bytes",
                self.width, self.height, self.bytes_per_pixel, MAX_FRAME_BYTES
            ))),
        }
    }

    /// Size of one frame record including its timestamp, if any.
    pub fn record_len(&self) -> usize {
        match self.fps_mode {
            FpsMode::Dynamic => self.frame_bytes().saturating_add(4),
            FpsMode::Fixed(_) => self.frame_bytes(),
        }
    }

    /// Number of whole records in a file of `file_len` bytes.
    pub fn frame_count(&self, file_len: u64) -> u64 {
        let record_len = self.record_len() as u64;
        if record_len == 0 {
            return 0;
        }
        file_len.saturating_sub(HEADER_LEN as u64) / record_len
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0] = self.platform_id;
        bytes[1..5].copy_from_slice(&self.width.to_le_bytes());
        bytes[5..9].copy_from_slice(&self.height.to_le_bytes());
        bytes[9..13].copy_from_slice(&self.bytes_per_pixel.to_le_bytes());
        bytes[13..17].copy_from_slice(&self.fps_mode.code().to_le_bytes());
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(PipelineError::MalformedStream(format!(
                "header needs {} bytes, got {}",
                HEADER_LEN,
                bytes.len()
            )));
        }
        let word = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        let header = Self {
            platform_id: bytes[0],
            width: word(1),
            height: word(5),
            bytes_per_pixel: word(9),
            fps_mode: FpsMode::from_code(word(13)),
        };
        header.validate()?;
        Ok(header)
    }

    pub fn write_to<W: Write>(&self, output: &mut W) -> Result<()> {
        output.write_all(&self.encode())?;
        Ok(())
    }

    pub fn read_from<R: Read>(input: &mut R) -> Result<Self> {
        let mut bytes = [0u8; HEADER_LEN];
        input.read_exact(&mut bytes).map_err(|e| {
            PipelineError::MalformedStream(format!("cannot read header: {}", e))
        })?;
        Self::decode(&bytes)
    }
}
