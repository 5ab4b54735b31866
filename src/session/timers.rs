//! Realizes the FSM's abstract timers (seconds + running flag) as real clock wake-ups.
//!
//! The FSM never touches a clock; it only flips `running` bits and `generation` counters on
//! its own `Timer` values (spec design note 9). This wheel is read after every `Fsm::step` call
//! and diffed against the previous snapshot to decide which real delays to arm or cancel.

use std::time::Duration;

use futures::StreamExt;
use tokio_util::time::DelayQueue;

use crate::fsm::{Fsm, TimerName};

const ALL_TIMERS: [TimerName; 6] = [
    TimerName::ConnectRetry,
    TimerName::DelayOpen,
    TimerName::HoldTime,
    TimerName::KeepAlive,
    TimerName::AsOrigination,
    TimerName::RouteAdvertisement,
];

fn timer_index(name: TimerName) -> usize {
    ALL_TIMERS.iter().position(|&n| n == name).unwrap()
}

pub struct TimerWheel {
    queue: DelayQueue<TimerName>,
    keys: [Option<tokio_util::time::delay_queue::Key>; 6],
}

impl TimerWheel {
    pub fn new() -> Self {
        TimerWheel {
            queue: DelayQueue::new(),
            keys: Default::default(),
        }
    }

    /// Re-arm or cancel real delays so they match `fsm`'s timer state, diffing against the
    /// snapshot taken just before the `Fsm::step` call that produced this state.
    pub fn sync(&mut self, before: &[crate::fsm::Timer; 6], fsm: &Fsm) {
        for &name in &ALL_TIMERS {
            let idx = timer_index(name);
            let prior = before[idx];
            let current = *fsm.timer(name);
            if current.running {
                if !prior.running || prior.generation != current.generation {
                    if let Some(key) = self.keys[idx].take() {
                        self.queue.remove(&key);
                    }
                    let key = self
                        .queue
                        .insert(name, Duration::from_secs(current.seconds as u64));
                    self.keys[idx] = Some(key);
                }
            } else if let Some(key) = self.keys[idx].take() {
                self.queue.remove(&key);
            }
        }
    }

    /// Waits for the next timer to expire. Never resolves if nothing is armed -- the caller
    /// selects this alongside other session event sources.
    pub async fn next_expired(&mut self) -> TimerName {
        loop {
            match self.queue.next().await {
                Some(expired) => {
                    let name = *expired.get_ref();
                    let idx = timer_index(name);
                    if self.keys[idx].as_ref() == Some(&expired.key()) {
                        self.keys[idx] = None;
                        return name;
                    }
                    // Stale entry already superseded by a reset; keep waiting.
                }
                None => std::future::pending::<()>().await,
            }
        }
    }
}
