//! Rolling-window frame-rate accounting for the depth and colour streams

use std::time::{Duration, Instant};

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Depth,
    Main,
}

/// Frame counter for one stream.
///
/// Frames are counted until more than `window` has elapsed since the window
/// started; the frame that closes the window recomputes the rate, restarts the
/// window and is not itself counted.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: Duration,
    window_start: Instant,
    count: u32,
    last_fps: u32,
}

impl FpsCounter {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            window_start: now,
            count: 0,
            last_fps: 0,
        }
    }

    /// Registers a frame. Returns `true` when the rate was recomputed.
    pub fn record(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed > self.window {
            let seconds = elapsed.as_secs_f64();
            self.last_fps = (self.count as f64 / seconds).round() as u32;
            self.window_start = now;
            self.count = 0;
            true
        } else {
            self.count += 1;
            false
        }
    }

    pub fn last_fps(&self) -> u32 {
        self.last_fps
    }
}

/// Frame rates of both streams of a camera session.
#[derive(Debug, Clone)]
pub struct FrameRateMonitor {
    depth: FpsCounter,
    main: FpsCounter,
}

impl FrameRateMonitor {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            depth: FpsCounter::new(window, now),
            main: FpsCounter::new(window, now),
        }
    }

    pub fn record(&mut self, stream: StreamKind, now: Instant) {
        let counter = match stream {
            StreamKind::Depth => &mut self.depth,
            StreamKind::Main => &mut self.main,
        };
        if counter.record(now) {
            trace!(stream = ?stream, fps = counter.last_fps(), "Frame rate updated");
        }
    }

    pub fn depth_fps(&self) -> u32 {
        self.depth.last_fps()
    }

    pub fn main_fps(&self) -> u32 {
        self.main.last_fps()
    }

    pub fn fps_text(&self) -> String {
        format!("Depth FPS: {}, Main FPS: {}", self.depth_fps(), self.main_fps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1000);

    #[test]
    fn test_twenty_frames_in_window() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(WINDOW, start);

        for i in 1..=20u64 {
            assert!(!counter.record(start + Duration::from_millis(50 * i)));
        }
        assert!(counter.record(start + Duration::from_millis(1001)));
        assert_eq!(counter.last_fps(), 20);
    }

    #[test]
    fn test_empty_window_yields_zero() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(WINDOW, start);

        assert!(counter.record(start + Duration::from_millis(1500)));
        assert_eq!(counter.last_fps(), 0);
    }

    #[test]
    fn test_window_restarts_after_recompute() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(WINDOW, start);
        for i in 1..=10u64 {
            counter.record(start + Duration::from_millis(100 * i));
        }
        counter.record(start + Duration::from_millis(1001));
        assert_eq!(counter.last_fps(), 10);

        // second window: 5 frames over 2s
        for i in 1..=5u64 {
            counter.record(start + Duration::from_millis(1001 + 150 * i));
        }
        counter.record(start + Duration::from_millis(3001));
        assert_eq!(counter.last_fps(), 3);
    }

    #[test]
    fn test_monitor_tracks_streams_independently() {
        let start = Instant::now();
        let mut monitor = FrameRateMonitor::new(WINDOW, start);
        for i in 1..=30u64 {
            monitor.record(StreamKind::Main, start + Duration::from_millis(33 * i));
        }
        monitor.record(StreamKind::Main, start + Duration::from_millis(1001));
        monitor.record(StreamKind::Depth, start + Duration::from_millis(1001));

        assert_eq!(monitor.main_fps(), 30);
        assert_eq!(monitor.depth_fps(), 0);
        assert_eq!(monitor.fps_text(), "Depth FPS: 0, Main FPS: 30");
    }
}
