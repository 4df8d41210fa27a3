use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Snapshot of the clock supplied to the render loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds since the source was created or last reset.
    pub seconds: f64,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f64, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source so the next sample starts from zero.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.origin.elapsed().as_secs_f64(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Hand-driven clock. Clones share the same time, so a test can keep one
/// clone and advance it while the render loop owns the other.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    seconds: Arc<Mutex<f64>>,
    frame: u64,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, step: Duration) {
        let mut seconds = self.seconds.lock().unwrap_or_else(|err| err.into_inner());
        *seconds += step.as_secs_f64();
    }

    pub fn seconds(&self) -> f64 {
        *self.seconds.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl TimeSource for ManualTimeSource {
    fn reset(&mut self) {
        *self.seconds.lock().unwrap_or_else(|err| err.into_inner()) = 0.0;
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.seconds(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Decides when the window should ask for the next redraw.
///
/// Without a cap every redraw opportunity renders. With a cap the pacer hands
/// out deadlines one frame interval apart and reports when one has passed.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    next_frame: Option<Instant>,
}

impl FramePacer {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        Self {
            interval,
            next_frame: None,
        }
    }

    pub fn is_capped(&self) -> bool {
        self.interval.is_some()
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match self.next_frame {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_frame
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.next_frame = self.interval.map(|interval| {
            // Keep cadence when on time; restart from `now` after a stall.
            match self.next_frame {
                Some(previous) if now < previous + interval => previous + interval,
                _ => now + interval,
            }
        });
    }

    pub fn reset(&mut self) {
        self.next_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncapped_pacer_is_always_ready() {
        let mut pacer = FramePacer::new(None);
        let now = Instant::now();
        assert!(pacer.ready_for_frame(now));
        pacer.mark_rendered(now);
        assert!(pacer.ready_for_frame(now));
        assert!(pacer.next_deadline().is_none());
    }

    #[test]
    fn capped_pacer_waits_one_interval() {
        let mut pacer = FramePacer::new(Some(10.0));
        let start = Instant::now();
        assert!(pacer.ready_for_frame(start));
        pacer.mark_rendered(start);

        assert!(!pacer.ready_for_frame(start + Duration::from_millis(50)));
        let deadline = pacer.next_deadline().unwrap();
        assert_eq!(deadline, start + Duration::from_millis(100));
        assert!(pacer.ready_for_frame(deadline));
    }

    #[test]
    fn invalid_caps_are_ignored() {
        assert!(!FramePacer::new(Some(0.0)).is_capped());
        assert!(!FramePacer::new(Some(f32::NAN)).is_capped());
        assert!(FramePacer::new(Some(30.0)).is_capped());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualTimeSource::new();
        let mut owned = clock.clone();
        clock.advance(Duration::from_millis(1500));
        let sample = owned.sample();
        assert!((sample.seconds - 1.5).abs() < 1e-9);
        assert_eq!(owned.sample().frame_index, 1);
        owned.reset();
        assert_eq!(clock.seconds(), 0.0);
    }
}
