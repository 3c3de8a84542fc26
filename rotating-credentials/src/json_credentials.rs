/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Codec for the JSON credential payload returned by the container metadata
//! endpoint, the dev-mode subprocess, and file-based credential sources.

use rotating_credential_types::{Credentials, CredentialsError};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// The recognized payload keys, case-sensitive.
///
/// `Token` is the preferred session token key; `SessionToken` is honored iff
/// `Token` is absent. Unrecognized keys are ignored.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
struct CredentialsDocument {
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "Token", default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(
        rename = "SessionToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    session_token: Option<String>,
    #[serde(rename = "Expiration", default, skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

/// Deserialize a credential payload.
///
/// Returns [`CredentialsError::MissingCredentials`] when the payload cannot be
/// parsed, when any credential field holds the literal string `"null"` (the
/// endpoint's way of signalling "no credentials available"), or when the
/// `Expiration` timestamp is not strictly in the future.
pub fn parse_credentials(
    payload: &str,
    now: SystemTime,
    provider_name: &'static str,
) -> Result<Credentials, CredentialsError> {
    let document: CredentialsDocument = serde_json::from_str(payload).map_err(|err| {
        CredentialsError::missing_credentials(format!("invalid credentials payload: {}", err))
    })?;

    validate_field("AccessKeyId", &document.access_key_id)?;
    validate_field("SecretAccessKey", &document.secret_access_key)?;
    let session_token = document.token.or(document.session_token);
    if let Some(token) = &session_token {
        validate_field("Token", token)?;
    }

    let expiry = match document.expiration {
        Some(raw) => {
            let parsed = OffsetDateTime::parse(&raw, &Rfc3339).map_err(|err| {
                CredentialsError::missing_credentials(format!(
                    "invalid Expiration timestamp: {}",
                    err
                ))
            })?;
            let expiry = SystemTime::from(parsed);
            if expiry <= now {
                return Err(CredentialsError::missing_credentials(
                    "credential expiration has already passed",
                ));
            }
            Some(expiry)
        }
        None => None,
    };

    Ok(Credentials::new(
        document.access_key_id,
        document.secret_access_key,
        session_token,
        expiry,
        provider_name,
    ))
}

fn validate_field(key: &'static str, value: &str) -> Result<(), CredentialsError> {
    if value == "null" {
        return Err(CredentialsError::missing_credentials(format!(
            "{} was the literal string \"null\"",
            key
        )));
    }
    if value.is_empty() {
        return Err(CredentialsError::missing_credentials(format!(
            "{} was empty",
            key
        )));
    }
    Ok(())
}

/// Serialize credentials back into the payload format.
///
/// The session token is emitted under the preferred `Token` key.
pub fn format_credentials(credentials: &Credentials) -> String {
    let expiration = credentials.expiry().map(|expiry| {
        OffsetDateTime::from(expiry)
            .format(&Rfc3339)
            .expect("system time is within the formattable range")
    });
    let document = CredentialsDocument {
        access_key_id: credentials.access_key_id().to_string(),
        secret_access_key: credentials.secret_access_key().to_string(),
        token: credentials.session_token().map(str::to_string),
        session_token: None,
        expiration,
    };
    serde_json::to_string(&document).expect("document contains only string fields")
}
