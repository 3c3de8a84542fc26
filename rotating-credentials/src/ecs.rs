/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Credentials retriever for the ECS container metadata endpoint
//!
//! Containers with a task role are given a link-local endpoint that serves
//! short-lived credentials: `http://169.254.170.2<path>`, where `<path>` comes
//! from the `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` environment variable. The
//! response body is the JSON payload handled by
//! [`json_credentials`](crate::json_credentials).

use crate::json_credentials;
use crate::provider_config::ProviderConfig;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, HOST, USER_AGENT};
use rotating_credential_types::env::Env;
use rotating_credential_types::retrieve::{self, future, RetrieveCredentials};
use rotating_credential_types::time_source::SharedTimeSource;
use rotating_credential_types::CredentialsError;
use std::error::Error;
use std::fmt;

pub(crate) const ENV_RELATIVE_URI: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";

const ECS_HOST: &str = "169.254.170.2";
const DEFAULT_ENDPOINT: &str = "http://169.254.170.2";
const PROVIDER_NAME: &str = "EcsContainer";
const USER_AGENT_VALUE: &str = concat!("rotating-credentials/", env!("CARGO_PKG_VERSION"));

/// Error returned when the metadata endpoint answers with a non-2xx status.
#[derive(Debug)]
struct ResponseStatusError {
    status: reqwest::StatusCode,
}

impl fmt::Display for ResponseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the container metadata endpoint returned HTTP status {}",
            self.status
        )
    }
}

impl Error for ResponseStatusError {}

/// Retrieves credentials from the ECS container metadata endpoint.
#[derive(Clone, Debug)]
pub struct EcsCredentialsRetriever {
    client: reqwest::Client,
    env: Env,
    time_source: SharedTimeSource,
    endpoint: String,
    relative_uri: Option<String>,
}

/// Builder for [`EcsCredentialsRetriever`]
#[derive(Debug, Default)]
pub struct Builder {
    provider_config: Option<ProviderConfig>,
    endpoint: Option<String>,
    relative_uri: Option<String>,
}

impl Builder {
    /// Override the configuration used for this retriever
    pub fn configure(mut self, config: &ProviderConfig) -> Self {
        self.provider_config = Some(config.clone());
        self
    }

    /// Override the endpoint scheme/authority (default `http://169.254.170.2`)
    ///
    /// This method exists primarily for testing.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Override the relative URI instead of reading
    /// `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`
    pub fn relative_uri(mut self, relative_uri: impl Into<String>) -> Self {
        self.relative_uri = Some(relative_uri.into());
        self
    }

    /// Creates the [`EcsCredentialsRetriever`]
    pub fn build(self) -> EcsCredentialsRetriever {
        let config = self.provider_config.unwrap_or_default();
        EcsCredentialsRetriever {
            client: config.http_client().unwrap_or_default(),
            env: config.env(),
            time_source: config.time_source(),
            endpoint: self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            relative_uri: self.relative_uri,
        }
    }
}

impl EcsCredentialsRetriever {
    /// Returns a builder for `EcsCredentialsRetriever`
    pub fn builder() -> Builder {
        Builder::default()
    }

    fn credentials_url(&self) -> Result<String, CredentialsError> {
        let relative_uri = match &self.relative_uri {
            Some(relative_uri) => relative_uri.clone(),
            None => self.env.get(ENV_RELATIVE_URI).map_err(|_| {
                CredentialsError::missing_credentials(
                    "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI is not set",
                )
            })?,
        };
        let path = if relative_uri.starts_with('/') {
            relative_uri
        } else {
            format!("/{}", relative_uri)
        };
        Ok(format!("{}{}", self.endpoint, path))
    }

    async fn credentials(&self) -> retrieve::Result {
        let url = self.credentials_url()?;
        tracing::debug!(url = %url, "loading credentials from the container metadata endpoint");
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(HOST, ECS_HOST)
            .header(ACCEPT, "*/*")
            .header(CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(CredentialsError::transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CredentialsError::transport(ResponseStatusError { status }));
        }
        let body = response.text().await.map_err(CredentialsError::transport)?;
        json_credentials::parse_credentials(&body, self.time_source.now(), PROVIDER_NAME)
    }
}

impl RetrieveCredentials for EcsCredentialsRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::new(self.credentials())
    }
}
