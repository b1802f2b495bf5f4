//! Depth frame processing and dual-stream capture pipeline
//!
//! Raw ToF frames are decoded, filtered by confidence, remapped for the current
//! device rotation and turned into a colour-mapped visualization, while the raw
//! samples are persisted to capture and recording files on background writers.

pub mod common;
pub mod config;
pub mod frame;
pub mod decode;
pub mod normalize;
pub mod remap;
pub mod color;
pub mod render;
pub mod fps;
pub mod timing;
pub mod stream_file;
pub mod session;
pub mod encoder;
pub mod observer;
pub mod storage;
pub mod camera;
pub mod export;

pub use common::{PipelineError, Result};

pub use config::{PipelineConfig, PipelineConfigBuilder};

pub use frame::{RawDepthFrame, VisualizationFrame};

pub use decode::{DepthSample, RangeStats, INVALID_RANGE};

pub use normalize::{RangeBounds, MAX_SCALAR};

pub use remap::{RotationClass, SourceWindow};

pub use render::{DepthRenderer, RenderedDepth};

pub use fps::{FpsCounter, FrameRateMonitor, StreamKind};

pub use timing::{StageTimings, Timer};

pub use stream_file::{
    FpsMode, RecordedFrame, StreamFileHeader, StreamFileReader, StreamWriter, WriteSummary,
    WriterKind,
};

pub use session::{CaptureOutcome, CaptureProgress, CaptureSession, SessionState, SubCapture};

pub use encoder::{ColorEncoder, MjpegFileEncoder};

pub use observer::{NullObserver, PipelineObserver};

pub use storage::OutputPaths;

pub use camera::{DepthCamera, DepthCameraBuilder, StreamAvailability};

pub use export::{ExportConfig, TiffCompression, TiffVisualizationWriter, VisualizationWriter};
