//! Frame data types

use crate::depth_pipeline::common::error::{PipelineError, Result};

/// One raw ToF frame: `width * height` packed 16-bit samples, row-major.
#[derive(Debug, Clone)]
pub struct RawDepthFrame {
    width: usize,
    height: usize,
    samples: Vec<u16>,
}

impl RawDepthFrame {
    pub fn new(samples: Vec<u16>, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions(width, height));
        }
        let expected = width * height;
        if samples.len() != expected {
            return Err(PipelineError::FrameSize {
                expected: expected * 2,
                actual: samples.len() * 2,
            });
        }
        Ok(Self { width, height, samples })
    }

    /// Builds a frame from a little-endian byte plane, as sensors usually hand it over.
    pub fn from_le_bytes(bytes: &[u8], width: usize, height: usize) -> Result<Self> {
        let expected = width * height * 2;
        if bytes.len() != expected {
            return Err(PipelineError::FrameSize {
                expected,
                actual: bytes.len(),
            });
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(samples, width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }
}

/// Colour-mapped depth image, one packed `0xAARRGGBB` word per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationFrame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl VisualizationFrame {
    pub fn alpha(&self, index: usize) -> u8 {
        (self.pixels[index] >> 24) as u8
    }

    /// Interleaved `[R, G, B, A, ...]` bytes for image encoders.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&argb| {
                let [a, r, g, b] = argb.to_be_bytes();
                [r, g, b, a]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rejects_mismatched_payload() {
        let result = RawDepthFrame::new(vec![0u16; 15], 4, 4);
        assert!(matches!(
            result,
            Err(PipelineError::FrameSize { expected: 32, actual: 30 })
        ));
    }

    #[test]
    fn test_frame_from_le_bytes() {
        let frame = RawDepthFrame::from_le_bytes(&[0x34, 0x12, 0xFF, 0xE0], 2, 1).unwrap();
        assert_eq!(frame.samples(), &[0x1234, 0xE0FF]);
    }

    #[test]
    fn test_rgba8_channel_order() {
        let frame = VisualizationFrame {
            width: 1,
            height: 1,
            pixels: vec![0x80_11_22_33],
        };
        assert_eq!(frame.alpha(0), 0x80);
        assert_eq!(frame.to_rgba8(), vec![0x11, 0x22, 0x33, 0x80]);
    }
}
