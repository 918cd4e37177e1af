//! Confirmed-commit countdown thread.
//!
//! One dedicated thread per engine, fed over an mpsc channel. Arming
//! carries a generation number so a fire that lost the race against a
//! confirm or a replacing commit is recognized as stale and dropped.

use crate::engine::Shared;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{mpsc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub(crate) enum TimerMsg {
    Arm { generation: u64, deadline: Instant },
    Cancel,
    Shutdown,
}

pub(crate) struct TimerHandle {
    tx: Sender<TimerMsg>,
    join: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub(crate) fn spawn(shared: Weak<Shared>, retry_backoff: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let join = std::thread::Builder::new()
            .name("yangate-confirm-timer".to_string())
            .spawn(move || run(&shared, &rx, retry_backoff))
            .ok();
        if join.is_none() {
            warn!("could not spawn confirmation timer thread");
        }
        Self { tx, join }
    }

    pub(crate) fn arm(&self, generation: u64, deadline: Instant) {
        let _ = self.tx.send(TimerMsg::Arm {
            generation,
            deadline,
        });
    }

    pub(crate) fn cancel(&self) {
        let _ = self.tx.send(TimerMsg::Cancel);
    }

    pub(crate) fn shutdown(&mut self) {
        let _ = self.tx.send(TimerMsg::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run(shared: &Weak<Shared>, rx: &Receiver<TimerMsg>, retry_backoff: Duration) {
    let mut armed: Option<(u64, Instant)> = None;
    loop {
        let msg = match armed {
            None => match rx.recv() {
                Ok(msg) => msg,
                Err(_) => return,
            },
            Some((generation, deadline)) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(msg) => msg,
                    Err(RecvTimeoutError::Timeout) => {
                        let Some(shared) = shared.upgrade() else {
                            return;
                        };
                        match shared.revert_expired(generation) {
                            Ok(()) => armed = None,
                            Err(err) => {
                                // The pending window stays armed; try again
                                // after the backoff rather than dropping it.
                                warn!(%err, "recording confirmed-commit reversion failed, retrying");
                                armed = Some((generation, Instant::now() + retry_backoff));
                            }
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        };
        match msg {
            TimerMsg::Arm {
                generation,
                deadline,
            } => {
                debug!(generation, "confirmation timer armed");
                armed = Some((generation, deadline));
            }
            TimerMsg::Cancel => armed = None,
            TimerMsg::Shutdown => return,
        }
    }
}
