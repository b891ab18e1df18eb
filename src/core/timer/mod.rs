//! Restartable countdowns driving elections and heartbeats.
//!
//! A [`Timer`] runs its callback at most once per `start`. Restarting or
//! stopping it bumps a generation counter, so a countdown that already slept
//! through but lost the race to a restart never fires. Callbacks only enqueue
//! work; whoever consumes that work calls [`Timer::take_fired`] under its own
//! critical section to drop an expiry that a later reset superseded.

mod election_timer;
mod replication_timer;

pub(crate) use election_timer::*;
pub(crate) use replication_timer::*;


use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

pub(crate) type TimerCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct TimerState {
    generation: u64,
    task: Option<JoinHandle<()>>,
    fired: bool,
}

pub(crate) struct Timer {
    name: &'static str,
    state: Arc<Mutex<TimerState>>,
    callback: TimerCallback,
}

impl Timer {
    pub(crate) fn new(
        name: &'static str,
        callback: TimerCallback,
    ) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(TimerState::default())),
            callback,
        }
    }

    /// (Re)arms the countdown. Any pending countdown is cancelled.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn start(
        &self,
        duration: Duration,
    ) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.fired = false;
        if let Some(task) = state.task.take() {
            task.abort();
        }

        let generation = state.generation;
        let shared = self.state.clone();
        let callback = self.callback.clone();
        let name = self.name;
        state.task = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            {
                let mut state = shared.lock();
                if state.generation != generation {
                    trace!("{} timer generation {} superseded", name, generation);
                    return;
                }
                state.task = None;
                state.fired = true;
            }
            trace!("{} timer fired after {:?}", name, duration);
            callback();
        }));
    }

    /// Cancels the pending countdown, if any.
    pub(crate) fn stop(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.fired = false;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    /// Consumes the expiry: true only if the countdown fired and nothing
    /// restarted or stopped the timer since.
    pub(crate) fn take_fired(&self) -> bool {
        std::mem::take(&mut self.state.lock().fired)
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.state.lock().task.is_some()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(task) = self.state.lock().task.take() {
            task.abort();
        }
    }
}
