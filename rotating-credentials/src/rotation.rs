/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Rotating credentials provider
//!
//! [`RotatingCredentialsProvider`] keeps a set of short-lived credentials
//! fresh. Construction performs an initial fetch, so a provider either starts
//! out holding usable credentials or fails with the retriever's error. Once
//! [started](RotatingCredentialsProvider::start), a background task refreshes
//! the credentials ahead of their expiration; callers of
//! [`get`](RotatingCredentialsProvider::get) are served from the held value
//! without ever waiting on a refresh while it is still valid.
//!
//! Two buffers control rotation:
//!
//! - the **background buffer** (default 300 s) is the lead time before the
//!   expiration at which the scheduled refresh fires;
//! - the **expiration buffer** (default 120 s) is the staleness threshold at
//!   which `get` stops returning the held credentials and refreshes on
//!   demand instead. Concurrent callers past the threshold are coalesced onto
//!   a single refresh and all receive its outcome.
//!
//! A failed background refresh is logged and suppressed: the held credentials
//! stay in place and no retry is scheduled, so the next `get` inside the
//! expiration buffer performs the refresh on demand. A failed on-demand
//! refresh is returned to the callers that waited on it.
//!
//! [`shutdown`](RotatingCredentialsProvider::shutdown) cancels the scheduler
//! and any in-flight refresh, shuts the retriever down exactly once, and is
//! idempotent. After shutdown both `get` and
//! [`current_credentials`](RotatingCredentialsProvider::current_credentials)
//! fail with [`CredentialsError::ProviderShutDown`].

use crate::provider_config::ProviderConfig;
use rotating_credential_types::retrieve::RetrieveCredentials;
use rotating_credential_types::sleep::SharedAsyncSleep;
use rotating_credential_types::time_source::SharedTimeSource;
use rotating_credential_types::{Credentials, CredentialsError, SharedCredentialsRetriever};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;

mod refresh;
mod scheduler;
mod store;

use store::{CredentialStore, ProviderState, StoreState};

const DEFAULT_EXPIRATION_BUFFER: Duration = Duration::from_secs(120);
const DEFAULT_BACKGROUND_BUFFER: Duration = Duration::from_secs(300);

/// Lifecycle status of a [`RotatingCredentialsProvider`].
///
/// Transitions are monotonic: `Initialized → Running → ShuttingDown →
/// Stopped`, and `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProviderStatus {
    /// Constructed; background rotation has not been started.
    Initialized,
    /// Background rotation is active.
    Running,
    /// Shutdown has begun; tasks are being cancelled.
    ShuttingDown,
    /// Terminal state. No further transitions occur.
    Stopped,
}

#[derive(Debug)]
pub(crate) struct Inner {
    retriever: SharedCredentialsRetriever,
    time_source: SharedTimeSource,
    sleep_impl: SharedAsyncSleep,
    expiration_buffer: Duration,
    background_buffer: Duration,
    role_session_name: Option<String>,
    store: CredentialStore,
    status_tx: watch::Sender<ProviderStatus>,
}

impl Inner {
    fn status(&self) -> ProviderStatus {
        *self.status_tx.borrow()
    }

    fn is_fresh(&self, credentials: &Credentials, now: SystemTime) -> bool {
        match credentials.expiry() {
            None => true,
            Some(expiration) => expiration > now + self.expiration_buffer,
        }
    }

    /// Installs `credentials` as current: updates the state and the snapshot,
    /// cancels the previously armed scheduler, and re-arms when the provider
    /// is running and the new credentials expire.
    fn install_locked(inner: &Arc<Self>, store: &mut StoreState, credentials: Credentials) {
        store.state = ProviderState::Present(credentials.clone());
        inner.store.set_snapshot(credentials.clone());
        if let Some(previous) = store.scheduler.take() {
            previous.abort();
        }
        if inner.status() == ProviderStatus::Running {
            if let Some(expiration) = credentials.expiry() {
                let armed = scheduler::arm(inner, expiration, &mut store.generation);
                store.scheduler = Some(armed);
            }
        }
    }
}

/// A provider of short-lived AWS credentials that keeps them fresh by
/// refreshing from a pluggable [`RetrieveCredentials`] source before they
/// expire.
///
/// See the [module docs](crate::rotation) for the rotation model.
///
/// # Example
///
/// ```rust,no_run
/// use rotating_credentials::RotatingCredentialsProvider;
/// use rotating_credential_types::{retrieve_credentials_fn, Credentials};
///
/// # async fn docs() -> Result<(), rotating_credential_types::CredentialsError> {
/// let provider = RotatingCredentialsProvider::builder()
///     .retriever(retrieve_credentials_fn(|| async {
///         // An async process to retrieve credentials would go here:
///         Ok(Credentials::new("example", "example", None, None, "my_provider_name"))
///     }))
///     .build()
///     .await?;
/// provider.start();
/// let credentials = provider.get().await?;
/// # drop(credentials);
/// provider.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RotatingCredentialsProvider {
    inner: Arc<Inner>,
}

/// Builder for [`RotatingCredentialsProvider`].
#[derive(Debug, Default)]
pub struct Builder {
    retriever: Option<SharedCredentialsRetriever>,
    expiration_buffer: Option<Duration>,
    background_buffer: Option<Duration>,
    role_session_name: Option<String>,
    provider_config: Option<ProviderConfig>,
}

impl Builder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// The credential source refreshed from. Required.
    pub fn retriever(mut self, retriever: impl RetrieveCredentials + 'static) -> Self {
        self.retriever = Some(SharedCredentialsRetriever::new(retriever));
        self
    }

    /// (Optional) The staleness threshold at which `get` refreshes on demand
    /// instead of returning the held credentials. Defaults to 120 seconds.
    pub fn expiration_buffer(mut self, buffer: Duration) -> Self {
        self.expiration_buffer = Some(buffer);
        self
    }

    /// (Optional) The lead time before the expiration at which the scheduled
    /// background refresh fires. Defaults to 300 seconds.
    pub fn background_buffer(mut self, buffer: Duration) -> Self {
        self.background_buffer = Some(buffer);
        self
    }

    /// (Optional) Session name recorded in refresh logs.
    pub fn role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = Some(name.into());
        self
    }

    /// Apply general provider configuration (environment, time source, sleep
    /// implementation).
    pub fn configure(mut self, config: &ProviderConfig) -> Self {
        self.provider_config = Some(config.clone());
        self
    }

    /// Performs the initial credential fetch and creates the provider.
    ///
    /// Construction either succeeds holding usable credentials or fails with
    /// the retriever's error.
    pub async fn build(self) -> Result<RotatingCredentialsProvider, CredentialsError> {
        let retriever = self.retriever.expect("retriever is required");
        let config = self.provider_config.unwrap_or_default();
        let initial = retriever.retrieve_credentials().await?;
        tracing::debug!(
            provider = initial.provider_name(),
            "retrieved initial credentials"
        );
        let (status_tx, _) = watch::channel(ProviderStatus::Initialized);
        Ok(RotatingCredentialsProvider {
            inner: Arc::new(Inner {
                retriever,
                time_source: config.time_source(),
                sleep_impl: config.sleep_impl(),
                expiration_buffer: self.expiration_buffer.unwrap_or(DEFAULT_EXPIRATION_BUFFER),
                background_buffer: self.background_buffer.unwrap_or(DEFAULT_BACKGROUND_BUFFER),
                role_session_name: self.role_session_name,
                store: CredentialStore::new(initial),
                status_tx,
            }),
        })
    }
}

impl RotatingCredentialsProvider {
    /// Returns a new `Builder` that can be used to construct the provider.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Returns the provider's lifecycle status.
    pub fn status(&self) -> ProviderStatus {
        self.inner.status()
    }

    /// Starts background rotation.
    ///
    /// Arms the first scheduled refresh iff the held credentials expire.
    /// A no-op from any state other than `Initialized`.
    pub fn start(&self) {
        let transitioned = self.inner.status_tx.send_if_modified(|status| {
            if *status == ProviderStatus::Initialized {
                *status = ProviderStatus::Running;
                true
            } else {
                false
            }
        });
        if !transitioned {
            return;
        }
        let mut store = self.inner.store.lock();
        let expiration = match &store.state {
            ProviderState::Present(credentials) => credentials.expiry(),
            _ => None,
        };
        match expiration {
            Some(expiration) => {
                let armed = scheduler::arm(&self.inner, expiration, &mut store.generation);
                store.scheduler = Some(armed);
            }
            None => {
                tracing::debug!("held credentials never expire; background rotation is not scheduled");
            }
        }
    }

    /// Returns the held credentials, refreshing them first when they are
    /// within the expiration buffer.
    ///
    /// The fast path never waits on a refresh: while the held credentials are
    /// valid they are returned immediately, even when a background refresh is
    /// in flight. Past the staleness threshold, concurrent callers are
    /// coalesced onto a single refresh (joining an in-flight background
    /// refresh when one exists) and all receive the same outcome.
    pub async fn get(&self) -> Result<Credentials, CredentialsError> {
        if self.inner.status() >= ProviderStatus::ShuttingDown {
            return Err(CredentialsError::shut_down());
        }
        let now = self.inner.time_source.now();
        let waiter = {
            let mut store = self.inner.store.lock();
            match &store.state {
                ProviderState::Present(credentials) if self.inner.is_fresh(credentials, now) => {
                    return Ok(credentials.clone())
                }
                ProviderState::Present(_) => {
                    if let Some(background) = &store.background {
                        tracing::debug!(
                            "held credentials are stale; joining in-flight background refresh"
                        );
                        background.waiter()
                    } else {
                        if let Some(armed) = store.scheduler.take() {
                            armed.abort();
                        }
                        tracing::debug!("held credentials are stale; starting on-demand refresh");
                        let task = refresh::begin_on_demand(&self.inner);
                        let waiter = task.waiter();
                        store.state = ProviderState::Pending(task);
                        waiter
                    }
                }
                ProviderState::Pending(task) => task.waiter(),
                ProviderState::Missing => {
                    if let Some(armed) = store.scheduler.take() {
                        armed.abort();
                    }
                    tracing::debug!("no usable credentials held; starting on-demand refresh");
                    let task = refresh::begin_on_demand(&self.inner);
                    let waiter = task.waiter();
                    store.state = ProviderState::Pending(task);
                    waiter
                }
            }
        };
        waiter.wait().await
    }

    /// Returns the most recently installed credentials without suspending.
    ///
    /// Serves the held value even while a refresh is in flight. Fails with
    /// [`CredentialsError::ProviderShutDown`] once shutdown has begun.
    pub fn current_credentials(&self) -> Result<Credentials, CredentialsError> {
        if self.inner.status() >= ProviderStatus::ShuttingDown {
            return Err(CredentialsError::shut_down());
        }
        self.inner.store.snapshot().ok_or_else(|| {
            CredentialsError::missing_credentials("no credentials have been retrieved")
        })
    }

    /// Shuts the provider down.
    ///
    /// Cancels the scheduler and any in-flight refresh (their waiters observe
    /// [`CredentialsError::Cancelled`]), shuts the retriever down exactly
    /// once, then transitions to `Stopped` and releases
    /// [`wait`](RotatingCredentialsProvider::wait)ers.
    ///
    /// Idempotent: later calls (and concurrent calls, which wait for the first
    /// to finish) return `Ok(())`. A retriever shutdown error is surfaced to
    /// the initiating caller but does not prevent the transition to `Stopped`.
    pub async fn shutdown(&self) -> Result<(), CredentialsError> {
        let initiated = self.inner.status_tx.send_if_modified(|status| {
            if *status < ProviderStatus::ShuttingDown {
                *status = ProviderStatus::ShuttingDown;
                true
            } else {
                false
            }
        });
        if !initiated {
            self.wait().await;
            return Ok(());
        }
        tracing::debug!("shutting down rotating credentials provider");
        {
            let mut store = self.inner.store.lock();
            if let Some(armed) = store.scheduler.take() {
                armed.abort();
            }
            if let Some(background) = store.background.take() {
                background.abort();
            }
            if let ProviderState::Pending(task) =
                std::mem::replace(&mut store.state, ProviderState::Missing)
            {
                task.abort();
            }
        }
        self.inner.store.clear_snapshot();
        let result = self.inner.retriever.shutdown().await;
        self.inner.status_tx.send_replace(ProviderStatus::Stopped);
        result
    }

    /// Waits until the provider reaches `Stopped`.
    ///
    /// If `shutdown` is never called, this waits indefinitely.
    pub async fn wait(&self) {
        let mut status_rx = self.inner.status_tx.subscribe();
        let _ = status_rx
            .wait_for(|status| *status == ProviderStatus::Stopped)
            .await;
    }
}

impl Drop for RotatingCredentialsProvider {
    fn drop(&mut self) {
        // A provider should be shut down before being dropped; if it wasn't,
        // cancel the spawned tasks so they don't outlive the provider.
        if self.inner.status() < ProviderStatus::ShuttingDown {
            let mut store = self.inner.store.lock();
            if let Some(armed) = store.scheduler.take() {
                armed.abort();
            }
            if let Some(background) = store.background.take() {
                background.abort();
            }
            if let ProviderState::Pending(task) =
                std::mem::replace(&mut store.state, ProviderState::Missing)
            {
                task.abort();
            }
        }
    }
}
