/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Test time/sleep implementation driven by manually advancing a clock
//!
//! [`ManualClock`] implements both [`TimeSource`] and [`AsyncSleep`] from a
//! single shared handle. Sleeps never complete on their own; calling
//! [`ManualClock::advance`] moves the clock forward, completing every sleep
//! that falls due inside the advanced window in due-time order. After each
//! completion the runtime is yielded so that tasks woken by a sleep can run --
//! and queue further sleeps -- before the window closes.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::{Duration, SystemTime};
//! use rotating_credential_types::sleep::AsyncSleep;
//! use rotating_credential_types::test_util::ManualClock;
//!
//! # async fn example() {
//! let clock = ManualClock::new(SystemTime::UNIX_EPOCH);
//! let sleep = clock.clone();
//! let task = tokio::spawn(async move {
//!     sleep.sleep(Duration::from_secs(5)).await;
//! });
//! clock.advance(Duration::from_secs(10)).await;
//! task.await.unwrap();
//! # }
//! ```

use crate::sleep::{AsyncSleep, Sleep};
use crate::time_source::TimeSource;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;

#[derive(Debug)]
struct QueuedSleep {
    due: SystemTime,
    notify: oneshot::Sender<()>,
}

#[derive(Debug)]
struct Inner {
    now: SystemTime,
    sleeps: Vec<QueuedSleep>,
}

/// Manually advanced test clock implementing [`TimeSource`] and [`AsyncSleep`].
#[derive(Clone, Debug)]
pub struct ManualClock {
    inner: Arc<Mutex<Inner>>,
}

impl ManualClock {
    /// Creates a clock whose current time is `start`.
    pub fn new(start: SystemTime) -> Self {
        ManualClock {
            inner: Arc::new(Mutex::new(Inner {
                now: start,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Returns the clock's current time.
    pub fn now(&self) -> SystemTime {
        self.lock().now
    }

    /// Returns the number of sleeps waiting on this clock.
    pub fn pending_sleeps(&self) -> usize {
        self.lock().sleeps.len()
    }

    /// Advances the clock by `duration`.
    ///
    /// Completes every pending sleep that falls due within the advanced window,
    /// earliest first, yielding the runtime after each one so that woken tasks
    /// settle. Sleeps queued by those tasks are completed too when they fall
    /// inside the same window.
    pub async fn advance(&self, duration: Duration) {
        // Recently spawned tasks register their sleeps at first poll; give
        // them a chance to do so before scanning.
        settle().await;
        let target = self.lock().now + duration;
        loop {
            let next = {
                let mut inner = self.lock();
                let due_index = inner
                    .sleeps
                    .iter()
                    .enumerate()
                    .filter(|(_, sleep)| sleep.due <= target)
                    .min_by_key(|(_, sleep)| sleep.due)
                    .map(|(index, _)| index);
                due_index.map(|index| {
                    let sleep = inner.sleeps.remove(index);
                    inner.now = inner.now.max(sleep.due);
                    sleep
                })
            };
            match next {
                Some(sleep) => {
                    // Receiver may be gone if the sleeping task was cancelled.
                    let _ = sleep.notify.send(());
                    settle().await;
                }
                None => break,
            }
        }
        self.lock().now = target;
        settle().await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("cannot be poisoned")
    }
}

/// Yields the runtime enough times for chains of woken tasks to run.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> SystemTime {
        self.lock().now
    }
}

impl AsyncSleep for ManualClock {
    fn sleep(&self, duration: Duration) -> Sleep {
        let (tx, rx) = oneshot::channel::<()>();
        {
            let mut inner = self.lock();
            let due = inner.now + duration;
            inner.sleeps.push(QueuedSleep { due, notify: tx });
        }
        Sleep::new(async move {
            let _ = rx.await;
        })
    }
}

#[cfg(test)]
mod test {
    use super::ManualClock;
    use crate::sleep::AsyncSleep;
    use std::time::{Duration, SystemTime};

    fn epoch_secs(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[tokio::test]
    async fn advance_completes_due_sleeps_in_order() {
        let clock = ManualClock::new(epoch_secs(0));
        let sleeps = vec![
            tokio::spawn(clock.sleep(Duration::from_secs(1))),
            tokio::spawn(clock.sleep(Duration::from_secs(3))),
            tokio::spawn(clock.sleep(Duration::from_secs(10))),
        ];

        clock.advance(Duration::from_secs(5)).await;
        assert_eq!(clock.now(), epoch_secs(5));
        assert!(sleeps[0].is_finished());
        assert!(sleeps[1].is_finished());
        assert!(!sleeps[2].is_finished());
        assert_eq!(clock.pending_sleeps(), 1);
    }

    #[tokio::test]
    async fn sleeps_queued_inside_the_window_complete() {
        let clock = ManualClock::new(epoch_secs(0));
        let chained = clock.clone();
        let task = tokio::spawn(async move {
            chained.sleep(Duration::from_secs(1)).await;
            chained.sleep(Duration::from_secs(2)).await;
            chained.sleep(Duration::from_secs(3)).await;
        });

        clock.advance(Duration::from_secs(6)).await;
        assert_eq!(clock.now(), epoch_secs(6));
        task.await.unwrap();
    }
}
