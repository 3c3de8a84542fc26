/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Assume-role credential retrieval
//!
//! [`AssumeRole`] is the abstract contract: given an [`AssumeRoleInput`],
//! produce credentials. [`StsAssumeRole`] backs it with an
//! [`aws_sdk_sts::Client`]; tests back it with scripted responses.
//! [`AssumeRoleRetriever`] adapts either into a
//! [`RetrieveCredentials`] source for the rotating provider.

use rotating_credential_types::retrieve::{self, future, RetrieveCredentials};
use rotating_credential_types::{Credentials, CredentialsError};
use std::error::Error;
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

const PROVIDER_NAME: &str = "AssumeRole";

const MIN_SESSION_DURATION: Duration = Duration::from_secs(900);
const MAX_SESSION_DURATION: Duration = Duration::from_secs(3600);

/// Error returned for a session duration outside `[900 s, 3600 s]`.
#[derive(Debug)]
pub struct InvalidSessionDuration {
    duration: Duration,
}

impl fmt::Display for InvalidSessionDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "assume-role session duration must be between {} and {} seconds, got {}",
            MIN_SESSION_DURATION.as_secs(),
            MAX_SESSION_DURATION.as_secs(),
            self.duration.as_secs()
        )
    }
}

impl Error for InvalidSessionDuration {}

/// Input for an STS `AssumeRole` call.
///
/// When no duration is set, the server default applies.
#[derive(Clone, Debug)]
pub struct AssumeRoleInput {
    role_arn: String,
    role_session_name: String,
    duration: Option<Duration>,
}

impl AssumeRoleInput {
    /// Creates an input for the given role and session name.
    pub fn new(role_arn: impl Into<String>, role_session_name: impl Into<String>) -> Self {
        AssumeRoleInput {
            role_arn: role_arn.into(),
            role_session_name: role_session_name.into(),
            duration: None,
        }
    }

    /// Sets the requested session duration.
    ///
    /// STS bounds the duration to `[900 s, 3600 s]`; values outside that range
    /// are rejected here rather than by the service.
    pub fn with_duration(mut self, duration: Duration) -> Result<Self, InvalidSessionDuration> {
        if duration < MIN_SESSION_DURATION || duration > MAX_SESSION_DURATION {
            return Err(InvalidSessionDuration { duration });
        }
        self.duration = Some(duration);
        Ok(self)
    }

    /// The role to assume.
    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    /// The session name recorded by STS.
    pub fn role_session_name(&self) -> &str {
        &self.role_session_name
    }

    /// The requested session duration, if any.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

/// The assume-role contract.
pub trait AssumeRole: Send + Sync + Debug {
    /// Assumes the role described by `input` and returns its credentials.
    fn assume_role<'a>(&'a self, input: &'a AssumeRoleInput) -> future::RetrieveCredentials<'a>;
}

/// Adapts an [`AssumeRole`] implementation into a [`RetrieveCredentials`]
/// source: every refresh re-assumes the configured role.
#[derive(Debug)]
pub struct AssumeRoleRetriever {
    client: Arc<dyn AssumeRole>,
    input: AssumeRoleInput,
}

impl AssumeRoleRetriever {
    /// Creates a retriever that assumes the role described by `input` through
    /// `client` on every refresh.
    pub fn new(client: impl AssumeRole + 'static, input: AssumeRoleInput) -> Self {
        AssumeRoleRetriever {
            client: Arc::new(client),
            input,
        }
    }
}

impl RetrieveCredentials for AssumeRoleRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        self.client.assume_role(&self.input)
    }
}

#[derive(Debug)]
struct NoCredentialsInResponse;

impl fmt::Display for NoCredentialsInResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the AssumeRole response contained no credentials")
    }
}

impl Error for NoCredentialsInResponse {}

/// [`AssumeRole`] implementation backed by the AWS SDK STS client.
///
/// The client carries its own region, HTTP stack, and base credentials; this
/// type only issues the `AssumeRole` call and converts the result.
#[derive(Clone, Debug)]
pub struct StsAssumeRole {
    client: aws_sdk_sts::Client,
}

impl StsAssumeRole {
    /// Creates an `StsAssumeRole` from a configured STS client.
    pub fn new(client: aws_sdk_sts::Client) -> Self {
        StsAssumeRole { client }
    }

    async fn call(&self, input: &AssumeRoleInput) -> retrieve::Result {
        tracing::debug!(role_arn = %input.role_arn(), "assuming role");
        let output = self
            .client
            .assume_role()
            .role_arn(input.role_arn())
            .role_session_name(input.role_session_name())
            .set_duration_seconds(input.duration().map(|duration| duration.as_secs() as i32))
            .send()
            .await
            .map_err(|err| CredentialsError::role_assumption_failed(input.role_arn(), err))?;
        let credentials = output.credentials().ok_or_else(|| {
            CredentialsError::role_assumption_failed(input.role_arn(), NoCredentialsInResponse)
        })?;
        let expiration: aws_smithy_types::DateTime = credentials.expiration().to_owned();
        let expiration = SystemTime::try_from(expiration)
            .map_err(|err| CredentialsError::role_assumption_failed(input.role_arn(), err))?;
        Ok(Credentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            Some(credentials.session_token().to_string()),
            Some(expiration),
            PROVIDER_NAME,
        ))
    }
}

impl AssumeRole for StsAssumeRole {
    fn assume_role<'a>(&'a self, input: &'a AssumeRoleInput) -> future::RetrieveCredentials<'a> {
        future::RetrieveCredentials::new(self.call(input))
    }
}
