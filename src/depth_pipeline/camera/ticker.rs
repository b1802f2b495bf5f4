use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, Sender};
use tracing::{debug, warn};

use crate::depth_pipeline::common::error::Result;
use crate::depth_pipeline::observer::PipelineObserver;
use crate::depth_pipeline::storage::format_record_timer;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Publishes the elapsed recording time once a second until stopped.
pub(super) struct RecordTicker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RecordTicker {
    pub(super) fn start(observer: Arc<dyn PipelineObserver>, started_at: Instant) -> Result<Self> {
        let (stop, stopped) = crossbeam_channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("record-ticker".to_string())
            .spawn(move || {
                let ticks = tick(TICK_PERIOD);
                loop {
                    select! {
                        recv(ticks) -> _ => {
                            let text = format_record_timer(started_at.elapsed().as_secs());
                            observer.on_record_timer(&text);
                        }
                        recv(stopped) -> _ => break,
                    }
                }
                debug!("Record ticker stopped");
            })?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub(super) fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Record ticker panicked");
            }
        }
    }
}

impl Drop for RecordTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
