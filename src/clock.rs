use log::trace;
use std::time::{Duration, Instant};

/// Time since the clock started and since the previous tick, in seconds
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tick {
    pub elapsed: f64,
    pub delta: f64,
}

/// Wall clock timing and frame pacing for the render loop
#[derive(Debug)]
pub struct Clock {
    start: Instant,
    previous_tick: Instant,
    target_duration: Option<Duration>,
}

impl Clock {
    /// `target_fps` of `None` disables pacing
    #[must_use]
    pub fn new(target_fps: Option<f64>) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            previous_tick: now,
            target_duration: target_fps.and_then(frame_duration),
        }
    }

    /// Call once at the start of a frame
    pub fn tick(&mut self) -> Tick {
        let now = Instant::now();
        let tick = Tick {
            elapsed: now.duration_since(self.start).as_secs_f64(),
            delta: now.duration_since(self.previous_tick).as_secs_f64(),
        };
        self.previous_tick = now;
        tick
    }

    /// Sleeps for whatever is left of the target frame duration after the
    /// time spent since the last tick
    pub fn vsync(&self) {
        let Some(target) = self.target_duration else {
            return;
        };
        let spent = self.previous_tick.elapsed();
        if let Some(budget) = sleep_budget(target, spent) {
            trace!("vsync sleeping {:?} after {:?}", budget, spent);
            std::thread::sleep(budget);
        }
    }

    #[must_use]
    pub const fn target_duration(&self) -> Option<Duration> {
        self.target_duration
    }

    /// Time since the clock was created
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Duration of one frame at `fps`, or `None` if `fps` is not a usable rate
#[must_use]
pub fn frame_duration(fps: f64) -> Option<Duration> {
    if fps.is_finite() && fps > 0.0 {
        Duration::try_from_secs_f64(1.0 / fps).ok()
    } else {
        None
    }
}

/// How long to sleep to fill `target`. `None` once `spent` has used it up.
#[must_use]
pub fn sleep_budget(target: Duration, spent: Duration) -> Option<Duration> {
    target.checked_sub(spent).filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_the_remainder() {
        let target = Duration::from_millis(16);
        assert_eq!(
            sleep_budget(target, Duration::from_millis(10)),
            Some(Duration::from_millis(6))
        );
    }

    #[test]
    fn budget_is_never_negative() {
        let target = Duration::from_millis(16);
        assert_eq!(sleep_budget(target, target), None);
        assert_eq!(sleep_budget(target, Duration::from_millis(40)), None);
    }

    #[test]
    fn unusable_rates_disable_pacing() {
        assert!(frame_duration(0.0).is_none());
        assert!(frame_duration(-30.0).is_none());
        assert!(frame_duration(f64::NAN).is_none());
        assert_eq!(frame_duration(4.0), Some(Duration::from_millis(250)));
    }

    #[test]
    fn tiny_rates_do_not_overflow() {
        assert!(frame_duration(1e-30).is_none());
        assert!(Clock::new(Some(1e-30)).target_duration().is_none());
    }

    #[test]
    fn tick_is_monotonic() {
        let mut clock = Clock::new(None);
        let a = clock.tick();
        let b = clock.tick();
        assert!(b.elapsed >= a.elapsed);
        assert!(b.delta >= 0.0);
    }
}
