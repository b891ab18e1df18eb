use std::time::Duration;

use super::Timer;
use super::TimerCallback;

/// Fixed period heartbeat countdown, armed only while leading.
pub(crate) struct ReplicationTimer {
    timer: Timer,
    heartbeat_interval: Duration,
}

impl ReplicationTimer {
    pub(crate) fn new(
        heartbeat_interval: Duration,
        callback: TimerCallback,
    ) -> Self {
        Self {
            timer: Timer::new("heartbeat", callback),
            heartbeat_interval,
        }
    }

    pub(crate) fn reset(&self) {
        self.timer.start(self.heartbeat_interval);
    }

    pub(crate) fn stop(&self) {
        self.timer.stop();
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    #[cfg(test)]
    pub(crate) fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }
}
