/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Configuration options for credential retrievers and the rotating provider

use rotating_credential_types::env::Env;
use rotating_credential_types::sleep::{AsyncSleep, SharedAsyncSleep, TokioSleep};
use rotating_credential_types::time_source::{SharedTimeSource, TimeSource};

/// Configuration options shared by credential retrievers and the rotating provider
///
/// Retriever builders offer a `configure` method which applies general
/// configuration options. The defaults read the real process environment, use
/// wall-clock time, and sleep on the Tokio timer; tests substitute fakes for
/// all three.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    env: Env,
    time_source: SharedTimeSource,
    sleep_impl: SharedAsyncSleep,
    http_client: Option<reqwest::Client>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            env: Env::default(),
            time_source: SharedTimeSource::default(),
            sleep_impl: SharedAsyncSleep::new(TokioSleep::new()),
            http_client: None,
        }
    }
}

impl ProviderConfig {
    pub(crate) fn env(&self) -> Env {
        self.env.clone()
    }

    pub(crate) fn time_source(&self) -> SharedTimeSource {
        self.time_source.clone()
    }

    pub(crate) fn sleep_impl(&self) -> SharedAsyncSleep {
        self.sleep_impl.clone()
    }

    pub(crate) fn http_client(&self) -> Option<reqwest::Client> {
        self.http_client.clone()
    }

    /// Override the process environment for this configuration
    ///
    /// This method exists primarily for testing credential retrievers
    pub fn with_env(self, env: Env) -> Self {
        ProviderConfig { env, ..self }
    }

    /// Override the time source for this configuration
    pub fn with_time_source(self, time_source: impl TimeSource + 'static) -> Self {
        ProviderConfig {
            time_source: SharedTimeSource::new(time_source),
            ..self
        }
    }

    /// Override the sleep implementation for this configuration
    pub fn with_sleep_impl(self, sleep_impl: impl AsyncSleep + 'static) -> Self {
        ProviderConfig {
            sleep_impl: SharedAsyncSleep::new(sleep_impl),
            ..self
        }
    }

    /// Override the HTTP client used by HTTP-based retrievers
    pub fn with_http_client(self, http_client: reqwest::Client) -> Self {
        ProviderConfig {
            http_client: Some(http_client),
            ..self
        }
    }
}
