/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::SystemTime;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use zeroize::Zeroizing;

/// AWS credentials
///
/// An opaque struct representing a set of IAM credentials: an access key id, a
/// secret access key, an optional session token, and an optional expiration.
///
/// When `Credentials` is dropped, its contents are zeroed in memory. Credentials
/// uses an interior Arc to ensure that even when cloned, credentials don't exist
/// in multiple memory locations.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials(Arc<Inner>);

#[derive(Eq, PartialEq)]
struct Inner {
    access_key_id: Zeroizing<String>,
    secret_access_key: Zeroizing<String>,
    session_token: Zeroizing<Option<String>>,

    /// A point in time after which the credentials should no longer be used.
    ///
    /// The provider compares this value against its expiration and background
    /// buffers to decide when a refresh is due. `None` means the credentials
    /// never expire and no rotation is scheduled for them.
    expiry: Option<SystemTime>,

    provider_name: &'static str,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut creds = f.debug_struct("Credentials");
        creds
            .field("provider_name", &self.0.provider_name)
            .field("access_key_id", &self.0.access_key_id.as_str())
            .field("secret_access_key", &"** redacted **");
        match self.expiry() {
            Some(expiry) => {
                if let Ok(formatted) = OffsetDateTime::from(expiry).format(&Rfc3339) {
                    creds.field("expiry", &formatted);
                } else {
                    creds.field("expiry", &expiry);
                }
            }
            None => {
                creds.field("expiry", &"never");
            }
        }
        creds.finish()
    }
}

impl Credentials {
    /// Creates `Credentials`.
    ///
    /// Intended for use from [`RetrieveCredentials`](crate::RetrieveCredentials)
    /// implementations. It is __NOT__ secure to hardcode credentials into your
    /// application.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expiry: Option<SystemTime>,
        provider_name: &'static str,
    ) -> Self {
        Credentials(Arc::new(Inner {
            access_key_id: Zeroizing::new(access_key_id.into()),
            secret_access_key: Zeroizing::new(secret_access_key.into()),
            session_token: Zeroizing::new(session_token),
            expiry,
            provider_name,
        }))
    }

    /// Returns the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.0.access_key_id
    }

    /// Returns the secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.0.secret_access_key
    }

    /// Returns the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.0.session_token.as_deref()
    }

    /// Returns the time at which the credentials expire, if any.
    pub fn expiry(&self) -> Option<SystemTime> {
        self.0.expiry
    }

    /// Returns the name of the retriever that produced these credentials.
    ///
    /// Used only for logging.
    pub fn provider_name(&self) -> &'static str {
        self.0.provider_name
    }
}
