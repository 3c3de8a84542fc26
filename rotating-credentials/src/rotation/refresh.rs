/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::rotation::store::ProviderState;
use crate::rotation::{Inner, ProviderStatus};
use rotating_credential_types::retrieve::RetrieveCredentials;
use rotating_credential_types::{Credentials, CredentialsError};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

pub(super) type RefreshOutcome = Result<Credentials, CredentialsError>;

/// An in-flight refresh: the spawned task plus a broadcast of its outcome.
///
/// The outcome channel is how one refresh serves many callers: every waiter of
/// the same task observes the same credentials or the same error.
#[derive(Debug)]
pub(super) struct RefreshTask {
    handle: JoinHandle<()>,
    outcome: watch::Receiver<Option<RefreshOutcome>>,
}

impl RefreshTask {
    pub(super) fn waiter(&self) -> RefreshWaiter {
        RefreshWaiter(self.outcome.clone())
    }

    /// Aborts the refresh. Waiters observe `Cancelled`.
    pub(super) fn abort(&self) {
        self.handle.abort();
    }
}

/// A caller joined onto an in-flight refresh.
#[derive(Debug)]
pub(super) struct RefreshWaiter(watch::Receiver<Option<RefreshOutcome>>);

impl RefreshWaiter {
    /// Waits for the refresh to finish and returns its outcome.
    ///
    /// If the refresh task is aborted before completing, the outcome channel
    /// closes without a value and the waiter observes `Cancelled`.
    pub(super) async fn wait(mut self) -> RefreshOutcome {
        match self.0.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().expect("guarded by wait_for"),
            Err(_) => Err(CredentialsError::cancelled()),
        }
    }
}

/// Starts an on-demand refresh.
///
/// Called with the store lock held; the caller tags the state `Pending` with
/// the returned task before releasing the lock. On success the new credentials
/// are installed (which re-arms the scheduler); on failure the state becomes
/// `Missing` so the next `get` starts a fresh attempt instead of reusing a
/// stale pending task.
pub(super) fn begin_on_demand(inner: &Arc<Inner>) -> RefreshTask {
    let (tx, rx) = watch::channel(None);
    let task_inner = Arc::clone(inner);
    let handle = tokio::spawn(async move {
        let span = tracing::debug_span!(
            "refresh_credentials",
            mode = "on_demand",
            role_session_name = task_inner.role_session_name.as_deref().unwrap_or_default(),
        );
        let result = task_inner
            .retriever
            .retrieve_credentials()
            .instrument(span)
            .await;
        let outcome = match result {
            Ok(credentials) => {
                let mut store = task_inner.store.lock();
                Inner::install_locked(&task_inner, &mut store, credentials.clone());
                drop(store);
                tracing::info!(
                    provider = credentials.provider_name(),
                    "installed refreshed credentials"
                );
                Ok(credentials)
            }
            Err(err) => {
                tracing::warn!(error = %err, "on-demand credential refresh failed");
                task_inner.store.lock().state = ProviderState::Missing;
                Err(err)
            }
        };
        let _ = tx.send(Some(outcome));
    });
    RefreshTask { handle, outcome: rx }
}

/// Entry point for a fired scheduler task.
///
/// Declines when the provider is no longer running, when the firing task has
/// been superseded or cancelled, or when an on-demand refresh has taken over
/// the state. Otherwise spawns the background refresh without tagging the
/// state `Pending`: callers keep receiving the held (still valid) credentials
/// while it runs.
pub(super) fn background_fire(inner: &Arc<Inner>, generation: u64) {
    let mut store = inner.store.lock();
    if inner.status() != ProviderStatus::Running {
        return;
    }
    match &store.scheduler {
        Some(task) if task.generation() == generation => {}
        _ => return,
    }
    store.scheduler = None;
    if !matches!(store.state, ProviderState::Present(_)) {
        return;
    }
    if store.background.is_some() {
        return;
    }

    let (tx, rx) = watch::channel(None);
    let task_inner = Arc::clone(inner);
    let handle = tokio::spawn(async move {
        let span = tracing::debug_span!(
            "refresh_credentials",
            mode = "background",
            role_session_name = task_inner.role_session_name.as_deref().unwrap_or_default(),
        );
        let result = task_inner
            .retriever
            .retrieve_credentials()
            .instrument(span)
            .await;
        let outcome = match result {
            Ok(credentials) => {
                let mut store = task_inner.store.lock();
                store.background = None;
                Inner::install_locked(&task_inner, &mut store, credentials.clone());
                drop(store);
                tracing::info!(
                    provider = credentials.provider_name(),
                    "installed refreshed credentials"
                );
                Ok(credentials)
            }
            Err(err) => {
                task_inner.store.lock().background = None;
                log_background_failure(&task_inner, &err);
                Err(err)
            }
        };
        let _ = tx.send(Some(outcome));
    });
    store.background = Some(RefreshTask { handle, outcome: rx });
}

/// A failed background refresh is logged and suppressed: the held credentials
/// stay installed, no retry is scheduled, and the next `get` inside the
/// expiration buffer refreshes on demand.
fn log_background_failure(inner: &Inner, err: &CredentialsError) {
    let now = inner.time_source.now();
    let expired = inner
        .store
        .snapshot()
        .and_then(|credentials| credentials.expiry())
        .map(|expiry| expiry <= now)
        .unwrap_or(false);
    if expired {
        tracing::error!(error = %err, "background credential refresh failed and the held credentials are expired");
    } else {
        tracing::warn!(error = %err, "background credential refresh failed; continuing with held credentials");
    }
}
