//! Capture/recording state machine
//!
//! A session is either idle, taking a one-shot capture or recording. Entering
//! a busy state requires an idle session and an open camera; a capture returns
//! to idle once every requested sub-capture has reported back.

use tracing::{debug, info, warn};

use crate::depth_pipeline::common::error::{PipelineError, Result};

/// The two halves of a one-shot capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCapture {
    Depth,
    Rgb,
}

/// Final result of a one-shot capture, reported once both halves are done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Saved,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureProgress {
    pub depth_done: bool,
    pub rgb_done: bool,
    failures: Vec<String>,
}

impl CaptureProgress {
    /// Sub-captures that were not requested start out done.
    pub fn new(depth_requested: bool, rgb_requested: bool) -> Self {
        Self {
            depth_done: !depth_requested,
            rgb_done: !rgb_requested,
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.depth_done && self.rgb_done
    }

    fn outcome(&self) -> CaptureOutcome {
        if self.failures.is_empty() {
            CaptureOutcome::Saved
        } else {
            CaptureOutcome::Failed(self.failures.join("; "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing(CaptureProgress),
    Recording,
}

#[derive(Debug, Clone)]
pub struct CaptureSession {
    open: bool,
    state: SessionState,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            open: false,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, SessionState::Capturing(_))
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Marks the camera session closed. Fails with `Busy` while recording;
    /// a pending capture is abandoned.
    pub fn close(&mut self) -> Result<()> {
        if self.is_recording() {
            return Err(PipelineError::Busy);
        }
        self.abandon_capture();
        self.open = false;
        Ok(())
    }

    fn check_can_start(&self) -> Result<()> {
        if !self.is_idle() {
            return Err(PipelineError::Busy);
        }
        if !self.open {
            return Err(PipelineError::NotOpen);
        }
        Ok(())
    }

    pub fn begin_capture(&mut self, depth_requested: bool, rgb_requested: bool) -> Result<()> {
        if let Err(e) = self.check_can_start() {
            warn!(error = %e, "Capture request rejected");
            return Err(e);
        }
        self.state = SessionState::Capturing(CaptureProgress::new(depth_requested, rgb_requested));
        debug!(depth_requested, rgb_requested, "Capture started");
        Ok(())
    }

    pub fn begin_recording(&mut self) -> Result<()> {
        if let Err(e) = self.check_can_start() {
            warn!(error = %e, "Recording request rejected");
            return Err(e);
        }
        self.state = SessionState::Recording;
        Ok(())
    }

    /// Records the result of one sub-capture. Returns the overall outcome when
    /// this completes the capture; the session is idle again at that point.
    pub fn mark_done(
        &mut self,
        sub: SubCapture,
        result: std::result::Result<(), String>,
    ) -> Option<CaptureOutcome> {
        let SessionState::Capturing(progress) = &mut self.state else {
            debug!(sub = ?sub, "Sub-capture finished outside of a capture");
            return None;
        };
        match sub {
            SubCapture::Depth => progress.depth_done = true,
            SubCapture::Rgb => progress.rgb_done = true,
        }
        if let Err(reason) = result {
            progress.failures.push(reason);
        }
        if !progress.is_complete() {
            return None;
        }

        let outcome = progress.outcome();
        self.state = SessionState::Idle;
        info!(outcome = ?outcome, "Capture finished");
        Some(outcome)
    }

    /// Leaves the recording state. Returns `false` if no recording was active.
    pub fn end_recording(&mut self) -> bool {
        if !self.is_recording() {
            return false;
        }
        self.state = SessionState::Idle;
        true
    }

    pub fn abandon_capture(&mut self) -> bool {
        if !self.is_capturing() {
            return false;
        }
        warn!("Pending capture abandoned");
        self.state = SessionState::Idle;
        true
    }
}
