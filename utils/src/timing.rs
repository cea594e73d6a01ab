// Time helpers shared by the vsync scheduler and frame metadata recording.
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Used for wire-visible timestamps
/// (FrameMeta, input events) where wall-clock time is meaningful across
/// process boundaries.
pub fn get_current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Measures elapsed wall time between `start()` and `end()`.
///
/// Used to fill in the timing fields of FrameMeta without sprinkling
/// `Instant::now()` calls through the render path.
pub struct StopWatch {
    start: Option<Instant>,
    duration: Duration,
}

impl StopWatch {
    pub fn new() -> Self {
        Self {
            start: None,
            duration: Duration::ZERO,
        }
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
    }

    pub fn end(&mut self) {
        if let Some(start) = self.start.take() {
            self.duration = start.elapsed();
        }
    }

    pub fn get_duration(&self) -> Duration {
        self.duration
    }
}

impl Default for StopWatch {
    fn default() -> Self {
        Self::new()
    }
}
