use std::time::Duration;

use rand::Rng;

use super::Timer;
use super::TimerCallback;

/// Election countdown with a randomized period drawn from
/// `[timeout_range.0, timeout_range.1)` milliseconds on every reset.
pub(crate) struct ElectionTimer {
    timer: Timer,
    timeout_range: (u64, u64),
}

impl ElectionTimer {
    /// @param: timeout_range: (ELECTION_TIMEOUT_MIN, ELECTION_TIMEOUT_MAX)
    pub(crate) fn new(
        timeout_range: (u64, u64),
        callback: TimerCallback,
    ) -> Self {
        Self {
            timer: Timer::new("election", callback),
            timeout_range,
        }
    }

    pub(crate) fn reset(&self) {
        let (min, max) = self.timeout_range;
        self.timer.start(Self::random_duration(min, max));
    }

    pub(crate) fn stop(&self) {
        self.timer.stop();
    }

    pub(crate) fn take_fired(&self) -> bool {
        self.timer.take_fired()
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub(crate) fn random_duration(
        min: u64,
        max: u64,
    ) -> Duration {
        let mut rng = rand::thread_rng();
        let timeout = rng.gen_range(min..max);
        Duration::from_millis(timeout)
    }
}
