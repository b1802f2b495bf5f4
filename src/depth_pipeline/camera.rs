//! Frame-processor actor and control surface of a depth camera session
//!
//! Frames handed to [`DepthCamera`] are queued on a bounded channel and
//! processed in arrival order by a single `camera-worker` thread. Control
//! requests (capture, recording, open/close) run on the caller's thread and
//! go through the session state machine under one lock. Stream files are
//! written by their own writer threads, so the worker never waits on disk.

mod ticker;
mod worker;

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, error, info, warn};

use crate::depth_pipeline::common::error::{PipelineError, Result};
use crate::depth_pipeline::config::PipelineConfig;
use crate::depth_pipeline::encoder::{ColorEncoder, ColorStreamWriter, MjpegFileEncoder};
use crate::depth_pipeline::frame::RawDepthFrame;
use crate::depth_pipeline::observer::{NullObserver, PipelineObserver};
use crate::depth_pipeline::session::{CaptureSession, SessionState, SubCapture};
use crate::depth_pipeline::storage::{self, OutputPaths};
use crate::depth_pipeline::stream_file::{StreamWriter, WriteSummary, WRITER_QUEUE_CAPACITY};

use ticker::RecordTicker;
use worker::FrameWorker;

pub const STATUS_STARTING: &str = "Camera is starting...";
pub const STATUS_NO_DEPTH: &str = "No depth camera found";
pub const STATUS_NO_COLOR: &str = "No color camera found";

/// Which upstream streams the device provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamAvailability {
    pub depth: bool,
    pub color: bool,
}

impl Default for StreamAvailability {
    fn default() -> Self {
        Self {
            depth: true,
            color: true,
        }
    }
}

type DynamicRanging = Arc<dyn Fn() -> bool + Send + Sync>;

enum FrameMessage {
    Depth {
        frame: RawDepthFrame,
        rotation_hint: u8,
        received_at: Instant,
    },
    Color {
        bytes: Vec<u8>,
        received_at: Instant,
    },
    Barrier(Sender<()>),
}

/// Writers armed for the next frames of a one-shot capture. Only frames
/// received after `armed_at` are captured.
struct ArmedCapture {
    capture_id: u64,
    armed_at: Instant,
    depth_writer: Option<StreamWriter>,
    rgb_path: Option<PathBuf>,
}

/// Only frames received after `started_at` belong to the recording.
struct ActiveRecording {
    writer: StreamWriter,
    started_at: Instant,
    last_frame_at: Option<Instant>,
    color: Option<ColorStreamWriter>,
    ticker: Option<RecordTicker>,
    failure: Option<String>,
}

/// State shared by the control surface and the worker.
struct Shared {
    session: CaptureSession,
    capture_id: u64,
    armed: Option<ArmedCapture>,
    recording: Option<ActiveRecording>,
    /// Idle colour encoder; lent to a `ColorStreamWriter` while recording
    encoder: Option<Box<dyn ColorEncoder>>,
    previewing: bool,
    clear_status_on_frame: bool,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DepthCameraBuilder {
    config: PipelineConfig,
    observer: Option<Arc<dyn PipelineObserver>>,
    encoder: Option<Box<dyn ColorEncoder>>,
    dynamic_ranging: Option<DynamicRanging>,
    streams: StreamAvailability,
}

impl DepthCameraBuilder {
    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn color_encoder(mut self, encoder: Box<dyn ColorEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Queried once per depth frame to choose dynamic over static ranging.
    pub fn dynamic_ranging<F>(mut self, enabled: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.dynamic_ranging = Some(Arc::new(enabled));
        self
    }

    pub fn streams(mut self, streams: StreamAvailability) -> Self {
        self.streams = streams;
        self
    }

    pub fn build(self) -> Result<DepthCamera> {
        self.config.validate()?;

        let config = Arc::new(self.config);
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(NullObserver) as Arc<dyn PipelineObserver>);
        let encoder = self
            .encoder
            .unwrap_or_else(|| Box::new(MjpegFileEncoder::new()) as Box<dyn ColorEncoder>);
        let dynamic_ranging = self
            .dynamic_ranging
            .unwrap_or_else(|| Arc::new(|| false) as DynamicRanging);
        let streams = self.streams;

        if !streams.depth {
            error!("No depth-capable stream found");
            observer.on_status_text(STATUS_NO_DEPTH);
        }
        if !streams.color {
            error!("No color-capable stream found");
            observer.on_status_text(STATUS_NO_COLOR);
        }

        let shared = Arc::new(Mutex::new(Shared {
            session: CaptureSession::new(),
            capture_id: 0,
            armed: None,
            recording: None,
            encoder: Some(encoder),
            previewing: config.previewing,
            clear_status_on_frame: false,
        }));

        let (sender, receiver) = crossbeam_channel::bounded(config.frame_queue_capacity);
        let frame_worker = FrameWorker::new(
            Arc::clone(&config),
            Arc::clone(&shared),
            Arc::clone(&observer),
            dynamic_ranging,
        );
        let worker = thread::Builder::new()
            .name("camera-worker".to_string())
            .spawn(move || frame_worker.run(receiver))?;

        info!(
            sensor = %format!("{}x{}", config.sensor_width, config.sensor_height),
            scaled = %format!("{}x{}", config.scaled_width, config.scaled_height),
            queue = config.frame_queue_capacity,
            "Depth camera ready"
        );

        Ok(DepthCamera {
            config,
            shared,
            observer,
            streams,
            sender: Some(sender),
            worker: Some(worker),
        })
    }
}

pub struct DepthCamera {
    config: Arc<PipelineConfig>,
    shared: Arc<Mutex<Shared>>,
    observer: Arc<dyn PipelineObserver>,
    streams: StreamAvailability,
    sender: Option<Sender<FrameMessage>>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for DepthCamera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepthCamera")
            .field("streams", &self.streams)
            .field("state", &self.state())
            .finish()
    }
}

impl DepthCamera {
    pub fn builder(config: PipelineConfig) -> DepthCameraBuilder {
        DepthCameraBuilder {
            config,
            observer: None,
            encoder: None,
            dynamic_ranging: None,
            streams: StreamAvailability::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn streams(&self) -> StreamAvailability {
        self.streams
    }

    pub fn state(&self) -> SessionState {
        lock(&self.shared).session.state().clone()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.shared).session.is_open()
    }

    /// Queues a depth frame for processing. Fails with `QueueFull` when the
    /// worker is behind; the frame is dropped in that case.
    pub fn deliver_depth_frame(
        &self,
        samples: Vec<u16>,
        width: usize,
        height: usize,
        rotation_hint: u8,
    ) -> Result<()> {
        if !self.streams.depth {
            return Err(PipelineError::StreamUnavailable("depth"));
        }
        let frame = RawDepthFrame::new(samples, width, height)?;
        self.enqueue(FrameMessage::Depth {
            frame,
            rotation_hint,
            received_at: Instant::now(),
        })
    }

    pub fn deliver_color_frame(&self, bytes: Vec<u8>) -> Result<()> {
        if !self.streams.color {
            return Err(PipelineError::StreamUnavailable("color"));
        }
        self.enqueue(FrameMessage::Color {
            bytes,
            received_at: Instant::now(),
        })
    }

    fn enqueue(&self, message: FrameMessage) -> Result<()> {
        if !self.is_open() {
            return Err(PipelineError::NotOpen);
        }
        let sender = self.sender.as_ref().ok_or(PipelineError::NotOpen)?;
        match sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Frame queue full, dropping frame");
                Err(PipelineError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(PipelineError::NotOpen),
        }
    }

    pub fn open(&self) -> Result<()> {
        if !self.streams.depth {
            return Err(PipelineError::StreamUnavailable("depth"));
        }
        let mut shared = lock(&self.shared);
        if shared.session.is_open() {
            return Ok(());
        }
        shared.session.open();
        shared.clear_status_on_frame = true;
        drop(shared);

        info!("Camera session opened");
        self.observer.on_status_text(STATUS_STARTING);
        Ok(())
    }

    /// Closes the camera session. While recording this fails with `Busy`
    /// unless `force` is set, in which case the recording is stopped first.
    pub fn close(&self, force: bool) -> Result<()> {
        let recording = lock(&self.shared).session.is_recording();
        if recording {
            if !force {
                warn!("Close rejected while recording");
                return Err(PipelineError::Busy);
            }
            if let Err(e) = self.stop_recording() {
                error!(error = %e, "Recording failed while closing camera");
            }
        }

        let mut shared = lock(&self.shared);
        if !shared.session.is_open() {
            return Ok(());
        }
        shared.session.close()?;
        shared.capture_id += 1;
        shared.armed = None;
        drop(shared);

        info!("Camera session closed");
        Ok(())
    }

    pub fn set_previewing(&self, previewing: bool) {
        lock(&self.shared).previewing = previewing;
    }

    /// Starts a one-shot capture of the next depth and colour frames. The
    /// writers are armed after the configured settle delay.
    pub fn start_capture(&self, base_name: &str) -> Result<()> {
        let paths = OutputPaths::new(&self.config.output_dir, base_name);
        let mut shared = lock(&self.shared);
        shared
            .session
            .begin_capture(self.streams.depth, self.streams.color)?;
        if let Err(e) = storage::ensure_output_dir(&self.config.output_dir) {
            shared.session.abandon_capture();
            return Err(e);
        }
        shared.capture_id += 1;
        let capture_id = shared.capture_id;
        info!(base = base_name, capture_id, "Capture requested");

        let delay = self.config.capture_settle_delay;
        if delay.is_zero() {
            let failure = arm_capture(&mut shared, &self.config, self.streams, &paths, capture_id);
            drop(shared);
            if let Some((sub, reason)) = failure {
                finish_sub_capture(&self.shared, self.observer.as_ref(), capture_id, sub, Err(reason));
            }
            return Ok(());
        }
        drop(shared);

        let shared = Arc::clone(&self.shared);
        let observer = Arc::clone(&self.observer);
        let config = Arc::clone(&self.config);
        let streams = self.streams;
        let spawned = thread::Builder::new()
            .name("capture-settle".to_string())
            .spawn(move || {
                thread::sleep(delay);
                let mut guard = lock(&shared);
                if guard.capture_id != capture_id || !guard.session.is_capturing() {
                    debug!(capture_id, "Capture gone before arming");
                    return;
                }
                let failure = arm_capture(&mut guard, &config, streams, &paths, capture_id);
                drop(guard);
                if let Some((sub, reason)) = failure {
                    finish_sub_capture(&shared, observer.as_ref(), capture_id, sub, Err(reason));
                }
            });
        if let Err(e) = spawned {
            lock(&self.shared).session.abandon_capture();
            return Err(e.into());
        }
        Ok(())
    }

    /// Starts a continuous recording: depth to a stream file, colour through
    /// the colour encoder.
    pub fn start_recording(&self, base_name: &str) -> Result<()> {
        let paths = OutputPaths::new(&self.config.output_dir, base_name);
        let mut shared = lock(&self.shared);
        shared.session.begin_recording()?;

        match self.open_recording(&mut shared, &paths) {
            Ok(recording) => {
                shared.recording = Some(recording);
                info!(base = base_name, "Recording started");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Cannot start recording");
                shared.session.end_recording();
                Err(e)
            }
        }
    }

    fn open_recording(&self, shared: &mut Shared, paths: &OutputPaths) -> Result<ActiveRecording> {
        storage::ensure_output_dir(&self.config.output_dir)?;
        let writer = StreamWriter::open_for_recording(
            paths.recording_depth(),
            self.config.platform_id,
            self.config.scaled_width as u32,
            self.config.scaled_height as u32,
            self.config.bytes_per_pixel as u32,
        )?;

        let color = if self.streams.color {
            let mut encoder = shared.encoder.take().ok_or_else(|| {
                PipelineError::Encode("colour encoder unavailable".to_string())
            })?;
            let color_path = paths.recording_rgb(encoder.file_extension());
            if let Err(e) = encoder.start(&color_path) {
                shared.encoder = Some(encoder);
                return Err(e);
            }
            Some(ColorStreamWriter::spawn(encoder, WRITER_QUEUE_CAPACITY)?)
        } else {
            None
        };

        let started_at = Instant::now();
        let ticker = match RecordTicker::start(Arc::clone(&self.observer), started_at) {
            Ok(ticker) => Some(ticker),
            Err(e) => {
                warn!(error = %e, "Recording timer unavailable");
                None
            }
        };

        Ok(ActiveRecording {
            writer,
            started_at,
            last_frame_at: None,
            color,
            ticker,
            failure: None,
        })
    }

    /// Stops the active recording and waits for its files to be closed.
    /// Returns `Ok(None)` when nothing was recording. The session is idle
    /// afterwards even when persisting failed.
    pub fn stop_recording(&self) -> Result<Option<WriteSummary>> {
        let mut shared = lock(&self.shared);
        let Some(recording) = shared.recording.take() else {
            shared.session.end_recording();
            return Ok(None);
        };
        drop(shared);

        let ActiveRecording {
            writer,
            color,
            ticker,
            failure,
            ..
        } = recording;
        if let Some(ticker) = ticker {
            ticker.stop();
        }

        // the encoder goes back before the session can start another recording
        let (encoder, color_result) = match color {
            Some(color) => color.finish(),
            None => (None, Ok(0)),
        };
        let mut shared = lock(&self.shared);
        if let Some(encoder) = encoder {
            shared.encoder = Some(encoder);
        }
        shared.session.end_recording();
        drop(shared);
        self.observer.on_record_timer(&storage::format_record_timer(0));

        let summary = writer.finish()?;
        let color_frames = color_result?;
        if let Some(reason) = failure {
            return Err(PipelineError::Encode(reason));
        }

        info!(
            path = %summary.path.display(),
            frames = summary.frames_written,
            color_frames,
            "Recording stopped"
        );
        Ok(Some(summary))
    }

    pub fn list_captured_files(&self) -> Result<Vec<String>> {
        storage::list_captured_files(&self.config.output_dir)
    }

    pub fn clear_captured_files(&self) -> Result<usize> {
        storage::clear_captured_files(&self.config.output_dir)
    }

    /// Blocks until every frame queued before this call has been processed.
    pub fn wait_idle(&self) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(PipelineError::NotOpen)?;
        let (done, wait) = crossbeam_channel::bounded(1);
        sender
            .send(FrameMessage::Barrier(done))
            .map_err(|_| PipelineError::NotOpen)?;
        wait.recv().map_err(|_| PipelineError::NotOpen)
    }

    /// Stops any recording, closes the session and joins the worker.
    pub fn shutdown(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if let Err(e) = self.close(true) {
            warn!(error = %e, "Error while closing camera");
        }
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Camera worker panicked");
            }
        }
        debug!("Depth camera shut down");
    }
}

impl Drop for DepthCamera {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Opens the capture writers. Returns the sub-capture that could not be armed.
fn arm_capture(
    shared: &mut Shared,
    config: &PipelineConfig,
    streams: StreamAvailability,
    paths: &OutputPaths,
    capture_id: u64,
) -> Option<(SubCapture, String)> {
    let mut failure = None;
    let depth_writer = if streams.depth {
        match StreamWriter::open_for_capture(
            paths.capture_depth(),
            config.platform_id,
            config.scaled_width as u32,
            config.scaled_height as u32,
            config.bytes_per_pixel as u32,
        ) {
            Ok(writer) => Some(writer),
            Err(e) => {
                error!(error = %e, "Cannot open capture depth file");
                failure = Some((SubCapture::Depth, e.to_string()));
                None
            }
        }
    } else {
        None
    };
    let rgb_path = streams.color.then(|| paths.capture_rgb());

    debug!(capture_id, "Capture armed");
    shared.armed = Some(ArmedCapture {
        capture_id,
        armed_at: Instant::now(),
        depth_writer,
        rgb_path,
    });
    failure
}

/// Reports one finished sub-capture and publishes the outcome once the
/// capture is complete.
fn finish_sub_capture(
    shared: &Mutex<Shared>,
    observer: &dyn PipelineObserver,
    capture_id: u64,
    sub: SubCapture,
    result: std::result::Result<(), String>,
) {
    let outcome = {
        let mut guard = lock(shared);
        if guard.capture_id != capture_id {
            debug!(capture_id, sub = ?sub, "Result for an abandoned capture");
            return;
        }
        let outcome = guard.session.mark_done(sub, result);
        if outcome.is_some() {
            guard.armed = None;
        }
        outcome
    };
    if let Some(outcome) = outcome {
        observer.on_capture_complete(&outcome);
    }
}

/// Writes a captured colour frame verbatim on a background thread.
fn persist_rgb_capture(
    shared: Arc<Mutex<Shared>>,
    observer: Arc<dyn PipelineObserver>,
    capture_id: u64,
    path: PathBuf,
    bytes: Vec<u8>,
) {
    let spawned = thread::Builder::new()
        .name("rgb-capture".to_string())
        .spawn({
            let shared = Arc::clone(&shared);
            let observer = Arc::clone(&observer);
            let path = path.clone();
            move || {
                let result = fs::write(&path, &bytes).map_err(|e| {
                    error!(path = %path.display(), error = %e, "Cannot write capture image");
                    e.to_string()
                });
                if result.is_ok() {
                    info!(path = %path.display(), bytes = bytes.len(), "Capture image saved");
                }
                finish_sub_capture(&shared, observer.as_ref(), capture_id, SubCapture::Rgb, result);
            }
        });
    if let Err(e) = spawned {
        finish_sub_capture(
            &shared,
            observer.as_ref(),
            capture_id,
            SubCapture::Rgb,
            Err(e.to_string()),
        );
    }
}
