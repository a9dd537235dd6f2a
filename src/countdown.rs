use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::runtime::AppEvent;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Owned handle to a repeating countdown timer.
///
/// The ticking thread posts [`AppEvent::Tick`] tagged with the session
/// generation it was started for. Cancelling (or dropping) the handle stops
/// the thread and waits for it, so no tick is produced afterwards.
#[derive(Debug)]
pub struct Countdown {
    generation: u64,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn start(events: Sender<AppEvent>, generation: u64, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if events.send(AppEvent::Tick { generation }).is_err() {
                        break;
                    }
                }
                // explicit stop, or the handle was dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        tracing::debug!(generation, ?interval, "countdown started");

        Self {
            generation,
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            tracing::debug!(generation = self.generation, "countdown cancelled");
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}
