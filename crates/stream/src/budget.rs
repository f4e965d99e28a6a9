use std::collections::VecDeque;
use std::time::Duration;

/// Statistics from the last window update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamStats {
    pub loaded_this_update: usize,
    pub evicted_this_update: usize,
    /// Regions that failed to decode during this update.
    pub failed_this_update: usize,
    /// Desired regions left for later updates by the load budget.
    pub deferred: usize,
    pub total_loaded: usize,
    pub total_vertices: usize,
    pub update_time: Duration,
}

/// Rolling record of per-region load times.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a sample, dropping the oldest once full.
    pub fn record(&mut self, dt: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(dt);
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.samples.iter().copied().min().unwrap_or(Duration::ZERO)
    }

    pub fn last(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

/// Gates window updates to a fixed interval of accumulated frame time,
/// independent of the render rate.
#[derive(Debug, Clone)]
pub struct UpdateThrottle {
    interval: f32,
    accumulated: f32,
}

impl UpdateThrottle {
    /// The first `tick` always fires.
    pub fn new(interval: f32) -> Self {
        let interval = interval.max(0.0);
        Self {
            interval,
            accumulated: interval,
        }
    }

    /// Advance by `dt` seconds. Returns `true` when an update is due.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.accumulated += dt.max(0.0);
        if self.accumulated >= self.interval {
            self.accumulated = 0.0;
            true
        } else {
            false
        }
    }

    /// Make the next `tick` fire regardless of elapsed time.
    pub fn force(&mut self) {
        self.accumulated = self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_timer_keeps_recent_samples() {
        let mut timer = FrameTimer::new(4);
        for ms in [12, 4, 8] {
            timer.record(Duration::from_millis(ms));
        }

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.average(), Duration::from_millis(8));
        assert_eq!((timer.min(), timer.max()), (Duration::from_millis(4), Duration::from_millis(12)));
        assert_eq!(timer.last(), Some(Duration::from_millis(8)));
    }

    #[test]
    fn full_timer_forgets_oldest_sample() {
        let mut timer = FrameTimer::new(2);
        for ms in [100, 6, 2] {
            timer.record(Duration::from_millis(ms));
        }

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.average(), Duration::from_millis(4));
        assert_eq!(timer.max(), Duration::from_millis(6));
    }

    #[test]
    fn empty_timer_is_zero() {
        let timer = FrameTimer::new(0);
        assert_eq!(timer.average(), Duration::ZERO);
        assert_eq!(timer.last(), None);
    }

    #[test]
    fn throttle_fires_on_interval() {
        let mut throttle = UpdateThrottle::new(0.5);
        assert!(throttle.tick(0.0));
        assert!(!throttle.tick(0.2));
        assert!(!throttle.tick(0.2));
        assert!(throttle.tick(0.2));
        assert!(!throttle.tick(0.1));

        throttle.force();
        assert!(throttle.tick(0.0));
    }

    #[test]
    fn zero_interval_fires_every_tick() {
        let mut throttle = UpdateThrottle::new(0.0);
        assert!(throttle.tick(0.0));
        assert!(throttle.tick(0.016));
    }
}
