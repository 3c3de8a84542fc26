/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Error returned when credentials cannot be retrieved or refreshed.
///
/// This error is `Clone`: a single refresh outcome is delivered to every caller
/// coalesced onto the in-flight refresh, so underlying error sources are held
/// behind an `Arc`.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CredentialsError {
    /// The credential source produced no usable credentials.
    ///
    /// Returned when a credential payload fails validation (a `"null"` literal
    /// in a credential field, an expiration that has already passed, a decode
    /// error) or when no credential source could be discovered.
    MissingCredentials {
        /// Human-readable description of what was missing or invalid.
        reason: Cow<'static, str>,
    },

    /// An STS `AssumeRole` call failed or returned no credentials.
    RoleAssumptionFailed {
        /// The role that was being assumed.
        role_arn: String,
        /// The underlying STS or transport error.
        source: Arc<dyn Error + Send + Sync + 'static>,
    },

    /// The retriever failed at the transport layer.
    ///
    /// For example an I/O error talking to the container metadata endpoint, or
    /// a subprocess that could not be spawned.
    RetrieverTransport {
        /// The underlying I/O error.
        source: Arc<dyn Error + Send + Sync + 'static>,
    },

    /// `get` was called after the provider finished shutting down.
    ProviderShutDown,

    /// An in-flight refresh was cancelled by shutdown.
    Cancelled,
}

impl CredentialsError {
    /// The credential source produced no usable credentials.
    pub fn missing_credentials(reason: impl Into<Cow<'static, str>>) -> Self {
        CredentialsError::MissingCredentials {
            reason: reason.into(),
        }
    }

    /// An STS `AssumeRole` call failed or returned no credentials.
    pub fn role_assumption_failed(
        role_arn: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        CredentialsError::RoleAssumptionFailed {
            role_arn: role_arn.into(),
            source: Arc::new(source),
        }
    }

    /// The retriever failed at the transport layer.
    pub fn transport(source: impl Error + Send + Sync + 'static) -> Self {
        CredentialsError::RetrieverTransport {
            source: Arc::new(source),
        }
    }

    /// The provider has shut down.
    pub fn shut_down() -> Self {
        CredentialsError::ProviderShutDown
    }

    /// An in-flight refresh was cancelled.
    pub fn cancelled() -> Self {
        CredentialsError::Cancelled
    }
}

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::MissingCredentials { reason } => {
                write!(f, "no credentials available: {}", reason)
            }
            CredentialsError::RoleAssumptionFailed { role_arn, source } => {
                write!(f, "failed to assume role {}: {}", role_arn, source)
            }
            CredentialsError::RetrieverTransport { source } => {
                write!(f, "credential retriever transport error: {}", source)
            }
            CredentialsError::ProviderShutDown => {
                write!(f, "the credentials provider has shut down")
            }
            CredentialsError::Cancelled => {
                write!(f, "the credential refresh was cancelled by shutdown")
            }
        }
    }
}

impl Error for CredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CredentialsError::RoleAssumptionFailed { source, .. } => Some(source.as_ref() as _),
            CredentialsError::RetrieverTransport { source } => Some(source.as_ref() as _),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::CredentialsError;
    use std::error::Error;

    #[derive(Debug)]
    struct Cause;
    impl std::fmt::Display for Cause {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "connection reset")
        }
    }
    impl Error for Cause {}

    #[test]
    fn display_includes_cause() {
        let err = CredentialsError::transport(Cause);
        assert_eq!(
            format!("{}", err),
            "credential retriever transport error: connection reset"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn errors_are_cloneable() {
        let err = CredentialsError::role_assumption_failed("arn:aws:iam::123:role/a", Cause);
        let clone = err.clone();
        assert_eq!(format!("{}", err), format!("{}", clone));
    }
}
