use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossbeam_channel::Receiver;
use tracing::{debug, error, info_span, trace, warn};

use crate::depth_pipeline::camera::{
    finish_sub_capture, lock, persist_rgb_capture, ActiveRecording, DynamicRanging, FrameMessage,
    Shared,
};
use crate::depth_pipeline::common::error::PipelineError;
use crate::depth_pipeline::config::PipelineConfig;
use crate::depth_pipeline::fps::{FrameRateMonitor, StreamKind};
use crate::depth_pipeline::frame::RawDepthFrame;
use crate::depth_pipeline::observer::PipelineObserver;
use crate::depth_pipeline::remap::RotationClass;
use crate::depth_pipeline::render::DepthRenderer;
use crate::depth_pipeline::session::SubCapture;

/// Body of the `camera-worker` thread.
pub(super) struct FrameWorker {
    shared: Arc<Mutex<Shared>>,
    observer: Arc<dyn PipelineObserver>,
    dynamic_ranging: DynamicRanging,
    renderer: DepthRenderer,
    monitor: FrameRateMonitor,
}

impl FrameWorker {
    pub(super) fn new(
        config: Arc<PipelineConfig>,
        shared: Arc<Mutex<Shared>>,
        observer: Arc<dyn PipelineObserver>,
        dynamic_ranging: DynamicRanging,
    ) -> Self {
        Self {
            renderer: DepthRenderer::new(&config),
            monitor: FrameRateMonitor::new(config.fps_window, Instant::now()),
            shared,
            observer,
            dynamic_ranging,
        }
    }

    pub(super) fn run(mut self, receiver: Receiver<FrameMessage>) {
        debug!("Camera worker started");
        for message in receiver {
            match message {
                FrameMessage::Depth {
                    frame,
                    rotation_hint,
                    received_at,
                } => self.on_depth_frame(frame, rotation_hint, received_at),
                FrameMessage::Color { bytes, received_at } => {
                    self.on_color_frame(bytes, received_at)
                }
                FrameMessage::Barrier(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("Camera worker exiting");
    }

    fn publish_fps(&mut self, stream: StreamKind, now: Instant) {
        self.monitor.record(stream, now);
        self.observer.on_fps_text(&self.monitor.fps_text());
    }

    fn on_depth_frame(&mut self, frame: RawDepthFrame, rotation_hint: u8, received_at: Instant) {
        let _span = info_span!("depth_frame", rotation_hint).entered();
        self.publish_fps(StreamKind::Depth, received_at);

        let (needs_render, clear_status) = {
            let mut shared = lock(&self.shared);
            let clear_status = std::mem::take(&mut shared.clear_status_on_frame);
            let capturing_depth = shared
                .armed
                .as_ref()
                .is_some_and(|armed| armed.depth_writer.is_some());
            let needs_render =
                shared.previewing || shared.recording.is_some() || capturing_depth;
            (needs_render, clear_status)
        };
        if clear_status {
            self.observer.on_status_text("");
        }
        if !needs_render {
            trace!("Preview off, depth frame skipped");
            return;
        }

        let rotation = RotationClass::from_hint(rotation_hint);
        let rendered = match self.renderer.render(&frame, rotation, (self.dynamic_ranging)()) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(error = %e, "Dropping depth frame");
                return;
            }
        };
        rendered.timings.log_summary();

        self.observer.on_visualization_ready(&rendered.visualization);
        if !rendered.stats.is_degenerate() {
            self.observer
                .on_range_text(rendered.stats.min, rendered.stats.max);
        }

        self.persist_depth(rendered.record_bytes, received_at);
    }

    fn persist_depth(&mut self, record_bytes: Vec<u8>, received_at: Instant) {
        let mut shared = lock(&self.shared);

        if let Some(recording) = recording_for(&mut shared.recording, received_at) {
            let since = recording.last_frame_at.unwrap_or(recording.started_at);
            let elapsed_ms = received_at.saturating_duration_since(since).as_millis() as u32;
            match recording.writer.append_frame(elapsed_ms, record_bytes.clone()) {
                Ok(()) => recording.last_frame_at = Some(received_at),
                Err(e) => note_failure(recording, e, "Failed to queue recording frame"),
            }
        }

        let capture = shared
            .armed
            .as_mut()
            .filter(|armed| received_at >= armed.armed_at)
            .and_then(|armed| armed.depth_writer.take().map(|writer| (armed.capture_id, writer)));
        drop(shared);

        let Some((capture_id, mut writer)) = capture else {
            return;
        };
        if let Err(e) = writer.append_frame(0, record_bytes) {
            error!(error = %e, "Failed to queue capture frame");
            finish_sub_capture(
                &self.shared,
                self.observer.as_ref(),
                capture_id,
                SubCapture::Depth,
                Err(e.to_string()),
            );
            return;
        }

        let shared = Arc::clone(&self.shared);
        let observer = Arc::clone(&self.observer);
        writer.finish_detached(move |result| {
            let result = result
                .map(|summary| {
                    debug!(path = %summary.path.display(), "Capture depth saved");
                })
                .map_err(|e| e.to_string());
            finish_sub_capture(&shared, observer.as_ref(), capture_id, SubCapture::Depth, result);
        });
    }

    fn on_color_frame(&mut self, mut bytes: Vec<u8>, received_at: Instant) {
        self.publish_fps(StreamKind::Main, received_at);

        let mut shared = lock(&self.shared);
        let capture = shared
            .armed
            .as_mut()
            .filter(|armed| received_at >= armed.armed_at)
            .and_then(|armed| armed.rgb_path.take().map(|path| (armed.capture_id, path)));

        if let Some(recording) = recording_for(&mut shared.recording, received_at) {
            if let Some(color) = recording.color.as_ref() {
                let frame = match capture {
                    Some(_) => bytes.clone(),
                    None => std::mem::take(&mut bytes),
                };
                if let Err(e) = color.push(frame) {
                    note_failure(recording, e, "Failed to queue colour frame");
                }
            }
        }
        drop(shared);

        if let Some((capture_id, path)) = capture {
            persist_rgb_capture(
                Arc::clone(&self.shared),
                Arc::clone(&self.observer),
                capture_id,
                path,
                bytes,
            );
        }
    }
}

/// The running recording, if `received_at` falls inside it.
fn recording_for(
    recording: &mut Option<ActiveRecording>,
    received_at: Instant,
) -> Option<&mut ActiveRecording> {
    recording
        .as_mut()
        .filter(|recording| received_at >= recording.started_at)
}

/// A full queue drops the frame; anything else fails the recording.
fn note_failure(recording: &mut ActiveRecording, e: PipelineError, context: &str) {
    match e {
        PipelineError::QueueFull => debug!("{}: queue full, frame dropped", context),
        e => {
            error!(error = %e, "{}", context);
            recording.failure.get_or_insert_with(|| e.to_string());
        }
    }
}
