/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::rotation::{refresh, Inner};
use rotating_credential_types::sleep::AsyncSleep;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

/// Handle to an armed background refresh task.
#[derive(Debug)]
pub(super) struct SchedulerTask {
    handle: JoinHandle<()>,
    generation: u64,
}

impl SchedulerTask {
    pub(super) fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancels the task. A task cancelled while sleeping never fires.
    pub(super) fn abort(&self) {
        self.handle.abort();
    }
}

/// Computes how long to wait before refreshing credentials expiring at `expiration`.
///
/// The refresh is scheduled `background_buffer` ahead of the expiration; a
/// deadline already in the past yields a zero delay, which fires immediately.
pub(super) fn refresh_delay(
    now: SystemTime,
    expiration: SystemTime,
    background_buffer: Duration,
) -> Duration {
    let deadline = expiration - background_buffer;
    deadline.duration_since(now).unwrap_or(Duration::ZERO)
}

/// Arms a background refresh for credentials expiring at `expiration`.
///
/// Called with the store lock held; the caller stores the returned task in the
/// scheduler slot before releasing the lock, so a zero-delay fire cannot
/// observe a missing registration.
pub(super) fn arm(inner: &Arc<Inner>, expiration: SystemTime, generation: &mut u64) -> SchedulerTask {
    *generation += 1;
    let generation = *generation;
    let delay = refresh_delay(inner.time_source.now(), expiration, inner.background_buffer);
    tracing::debug!(delay_secs = delay.as_secs(), "armed background credential refresh");
    let task_inner = Arc::clone(inner);
    let handle = tokio::spawn(async move {
        if !delay.is_zero() {
            task_inner.sleep_impl.sleep(delay).await;
        }
        refresh::background_fire(&task_inner, generation);
    });
    SchedulerTask { handle, generation }
}
