//! TIFF export of visualization frames

use std::io::Write;

use tracing::debug;

use crate::depth_pipeline::common::error::{PipelineError, Result};
use crate::depth_pipeline::frame::VisualizationFrame;

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression, balanced level
    Deflate,
}

/// Configuration for exported images
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub compression: TiffCompression,
    /// Predictor value for compression (2 for horizontal differencing)
    pub predictor: Option<u16>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
        }
    }
}

impl ExportConfig {
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder::default()
    }
}

/// Builder for ExportConfig
#[derive(Default)]
pub struct ExportConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
}

impl ExportConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn build(self) -> ExportConfig {
        let default = ExportConfig::default();
        ExportConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
        }
    }
}

pub trait VisualizationWriter {
    fn write_frame(
        &self,
        frame: &VisualizationFrame,
        output: &mut dyn Write,
        config: &ExportConfig,
    ) -> Result<()>;
}

/// Writes frames as 8-bit RGBA TIFF images; transparent pixels stay transparent.
pub struct TiffVisualizationWriter;

impl VisualizationWriter for TiffVisualizationWriter {
    fn write_frame(
        &self,
        frame: &VisualizationFrame,
        output: &mut dyn Write,
        config: &ExportConfig,
    ) -> Result<()> {
        debug!("Encoding RGBA TIFF image: {}x{}", frame.width, frame.height);
        if frame.width == 0 || frame.height == 0 || frame.pixels.len() != frame.width * frame.height
        {
            return Err(PipelineError::InvalidDimensions(frame.width, frame.height));
        }

        let compression = match config.compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::Deflate => tiff::encoder::Compression::Deflate(
                tiff::encoder::compression::DeflateLevel::Balanced,
            ),
        };

        let mut buffer = Vec::new();
        let mut encoder = tiff::encoder::TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| PipelineError::Encode(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => tiff::tags::Predictor::Horizontal,
                _ => tiff::tags::Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        let rgba = frame.to_rgba8();
        encoder
            .write_image::<tiff::encoder::colortype::RGBA8>(
                frame.width as u32,
                frame.height as u32,
                &rgba,
            )
            .map_err(|e| PipelineError::Encode(e.to_string()))?;

        output.write_all(&buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame() -> VisualizationFrame {
        VisualizationFrame {
            width: 3,
            height: 2,
            pixels: vec![0xFF0000FF, 0x00FF0000, 0x7F00FF00, 0xFF0000FF, 0x00FF0000, 0x7F00FF00],
        }
    }

    #[test]
    fn test_config_builder() {
        let config = ExportConfig::builder()
            .compression(TiffCompression::Lzw)
            .predictor(Some(2))
            .build();

        assert_eq!(config.compression, TiffCompression::Lzw);
        assert_eq!(config.predictor, Some(2));
    }

    #[test]
    fn test_writes_tiff_header() {
        let mut output = Cursor::new(Vec::new());
        TiffVisualizationWriter
            .write_frame(&frame(), &mut output, &ExportConfig::default())
            .unwrap();

        let bytes = output.into_inner();
        assert!(bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*"));
        assert!(bytes.len() > 3 * 2 * 4);
    }

    #[test]
    fn test_compressed_export() {
        for compression in [TiffCompression::Lzw, TiffCompression::Deflate] {
            let config = ExportConfig::builder().compression(compression).build();
            let mut output = Cursor::new(Vec::new());
            assert!(TiffVisualizationWriter
                .write_frame(&frame(), &mut output, &config)
                .is_ok());
        }
    }

    #[test]
    fn test_rejects_inconsistent_frame() {
        let bad = VisualizationFrame {
            width: 4,
            height: 4,
            pixels: vec![0; 3],
        };
        let mut output = Cursor::new(Vec::new());
        let result = TiffVisualizationWriter.write_frame(&bad, &mut output, &ExportConfig::default());
        assert!(matches!(result, Err(PipelineError::InvalidDimensions(4, 4))));
    }
}
