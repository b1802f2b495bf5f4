//! Output callbacks of the pipeline

use crate::depth_pipeline::frame::VisualizationFrame;
use crate::depth_pipeline::session::CaptureOutcome;

/// Receives everything the pipeline publishes for display.
///
/// Callbacks run on the camera worker thread (capture completion may also
/// arrive from a writer thread) and should return quickly.
pub trait PipelineObserver: Send + Sync {
    fn on_visualization_ready(&self, _frame: &VisualizationFrame) {}
    fn on_status_text(&self, _text: &str) {}
    fn on_fps_text(&self, _text: &str) {}
    fn on_range_text(&self, _min_mm: i16, _max_mm: i16) {}
    fn on_record_timer(&self, _text: &str) {}
    fn on_capture_complete(&self, _outcome: &CaptureOutcome) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}
