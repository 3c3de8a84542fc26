/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::rotation::refresh::RefreshTask;
use crate::rotation::scheduler::SchedulerTask;
use rotating_credential_types::Credentials;
use std::sync::{Mutex, MutexGuard, RwLock};

/// The lifecycle of the currently held credentials.
#[derive(Debug)]
pub(super) enum ProviderState {
    /// Usable credentials are held.
    Present(Credentials),
    /// An on-demand refresh is in flight; new callers join it.
    Pending(RefreshTask),
    /// The last on-demand refresh failed and no usable credentials remain.
    Missing,
}

#[derive(Debug)]
pub(super) struct StoreState {
    pub(super) state: ProviderState,
    /// In-flight background refresh, if any. Distinct from `Pending`: callers
    /// holding still-valid credentials are never routed through it.
    pub(super) background: Option<RefreshTask>,
    /// Armed background scheduler, if any. At most one per provider.
    pub(super) scheduler: Option<SchedulerTask>,
    /// Monotonic counter distinguishing scheduler arms; a fire whose
    /// generation no longer matches the armed task has been superseded.
    pub(super) generation: u64,
}

/// Serialized access to the provider state, plus a separately readable snapshot
/// of the most recently installed credentials.
///
/// The state mutex is never held across an `.await` and never across code that
/// can panic, so lock acquisition treats poisoning as unreachable. The snapshot
/// cell backs the synchronous accessor; it is written only while the state lock
/// is held, which keeps installation order and snapshot order identical.
#[derive(Debug)]
pub(super) struct CredentialStore {
    state: Mutex<StoreState>,
    snapshot: RwLock<Option<Credentials>>,
}

impl CredentialStore {
    pub(super) fn new(initial: Credentials) -> Self {
        CredentialStore {
            state: Mutex::new(StoreState {
                state: ProviderState::Present(initial.clone()),
                background: None,
                scheduler: None,
                generation: 0,
            }),
            snapshot: RwLock::new(Some(initial)),
        }
    }

    /// Returns the most recently installed credentials.
    ///
    /// Remains valid while a refresh is in flight; cleared only by shutdown.
    pub(super) fn snapshot(&self) -> Option<Credentials> {
        self.snapshot.read().expect("cannot be poisoned").clone()
    }

    pub(super) fn set_snapshot(&self, credentials: Credentials) {
        *self.snapshot.write().expect("cannot be poisoned") = Some(credentials);
    }

    pub(super) fn clear_snapshot(&self) {
        *self.snapshot.write().expect("cannot be poisoned") = None;
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("cannot be poisoned")
    }
}
