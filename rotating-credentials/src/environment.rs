/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Load static credentials from the process environment

use rotating_credential_types::env::Env;
use rotating_credential_types::retrieve::{self, future, RetrieveCredentials};
use rotating_credential_types::{Credentials, CredentialsError};

pub(crate) const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub(crate) const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub(crate) const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

const PROVIDER_NAME: &str = "Environment";

/// Loads credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, and
/// (optionally) `AWS_SESSION_TOKEN`.
///
/// Environment credentials carry no expiration, so a provider holding them
/// never schedules a background refresh.
#[derive(Clone, Debug, Default)]
pub struct EnvironmentVariableCredentialsRetriever {
    env: Env,
}

impl EnvironmentVariableCredentialsRetriever {
    /// Creates a retriever that reads the real process environment.
    pub fn new() -> Self {
        Self::new_with_env(Env::default())
    }

    /// Creates a retriever that reads the given environment.
    ///
    /// This method exists primarily for testing.
    pub fn new_with_env(env: Env) -> Self {
        EnvironmentVariableCredentialsRetriever { env }
    }

    fn credentials(&self) -> retrieve::Result {
        let access_key_id = self.env.get(ENV_ACCESS_KEY_ID).map_err(|_| {
            CredentialsError::missing_credentials("AWS_ACCESS_KEY_ID is not set")
        })?;
        let secret_access_key = self.env.get(ENV_SECRET_ACCESS_KEY).map_err(|_| {
            CredentialsError::missing_credentials("AWS_SECRET_ACCESS_KEY is not set")
        })?;
        let session_token = self.env.get(ENV_SESSION_TOKEN).ok();
        Ok(Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            PROVIDER_NAME,
        ))
    }
}

impl RetrieveCredentials for EnvironmentVariableCredentialsRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::ready(self.credentials())
    }
}
