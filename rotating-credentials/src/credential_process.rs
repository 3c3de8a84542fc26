/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Credentials retriever for an external process
//!
//! Intended for development environments where a helper script obtains
//! role credentials; see
//! [`default_retriever`](crate::default_retriever::default_retriever) for how
//! it is selected in debug builds.

use crate::json_credentials;
use crate::provider_config::ProviderConfig;
use rotating_credential_types::retrieve::{self, future, RetrieveCredentials};
use rotating_credential_types::time_source::SharedTimeSource;
use rotating_credential_types::CredentialsError;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::process::ExitStatus;
use tokio::process::Command;

const PROVIDER_NAME: &str = "CredentialProcess";
const DEV_CREDENTIALS_COMMAND: &str = "/usr/local/bin/get-credentials.sh";
const DEV_SESSION_DURATION_SECS: u32 = 900;

/// Error returned when the external process exits unsuccessfully.
#[derive(Debug)]
struct ProcessFailed {
    status: ExitStatus,
    stderr: String,
}

impl fmt::Display for ProcessFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "external credential process exited with {}: {}",
            self.status, self.stderr
        )
    }
}

impl Error for ProcessFailed {}

/// Returns the given `command` string with arguments redacted if there were any
pub(crate) fn debug_fmt_command_string(command: &str) -> Cow<'_, str> {
    match command.find(char::is_whitespace) {
        Some(index) => Cow::Owned(format!("{} ** arguments redacted **", &command[0..index])),
        None => Cow::Borrowed(command),
    }
}

/// Retrieves credentials by running an external command and decoding its stdout
/// as a credential payload.
pub struct CredentialProcessRetriever {
    command: String,
    time_source: SharedTimeSource,
}

impl fmt::Debug for CredentialProcessRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Security: the command arguments may be sensitive and must be redacted
        f.debug_struct("CredentialProcessRetriever")
            .field("command", &debug_fmt_command_string(&self.command))
            .finish()
    }
}

impl CredentialProcessRetriever {
    /// Creates a retriever running the given command.
    pub fn new(command: impl Into<String>) -> Self {
        CredentialProcessRetriever {
            command: command.into(),
            time_source: SharedTimeSource::default(),
        }
    }

    /// Creates the dev-mode retriever for the given role:
    /// `/usr/local/bin/get-credentials.sh -r <role_arn> -d 900`.
    pub fn for_dev_role(role_arn: &str, config: &ProviderConfig) -> Self {
        CredentialProcessRetriever {
            command: format!(
                "{} -r {} -d {}",
                DEV_CREDENTIALS_COMMAND, role_arn, DEV_SESSION_DURATION_SECS
            ),
            time_source: config.time_source(),
        }
    }

    async fn credentials(&self) -> retrieve::Result {
        tracing::debug!(
            command = %debug_fmt_command_string(&self.command),
            "loading credentials from external process"
        );

        let output = Command::new("sh")
            .args(["-c", &self.command])
            .output()
            .await
            .map_err(CredentialsError::transport)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(CredentialsError::transport(ProcessFailed {
                status: output.status,
                stderr,
            }));
        }

        let stdout = std::str::from_utf8(&output.stdout).map_err(|_| {
            CredentialsError::missing_credentials("credential process output was not valid UTF-8")
        })?;
        json_credentials::parse_credentials(stdout, self.time_source.now(), PROVIDER_NAME)
    }
}

impl RetrieveCredentials for CredentialProcessRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::new(self.credentials())
    }
}
