/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Rotating AWS credentials provider.
//!
//! This crate keeps short-lived IAM credentials fresh: a
//! [`RotatingCredentialsProvider`] holds the current credentials, refreshes
//! them from a pluggable [`RetrieveCredentials`](rotating_credential_types::RetrieveCredentials)
//! source before they expire, and tolerates transient refresh failures without
//! disrupting in-flight consumers.
//!
//! Retrievers for the common credential sources are included:
//!
//! - [`ecs::EcsCredentialsRetriever`] -- the container metadata endpoint
//! - [`environment::EnvironmentVariableCredentialsRetriever`] -- static keys
//!   from the process environment
//! - [`sts::AssumeRoleRetriever`] -- STS `AssumeRole`
//! - `credential_process::CredentialProcessRetriever` -- a dev-mode subprocess
//!   (requires the `credentials-process` feature, enabled by default)
//!
//! [`default_retriever::default_retriever`] picks one of these based on the
//! process environment.
//!
//! # Example
//!
//! ```rust,no_run
//! use rotating_credentials::provider_config::ProviderConfig;
//! use rotating_credentials::{default_retriever::default_retriever, RotatingCredentialsProvider};
//!
//! # async fn docs() -> Result<(), rotating_credential_types::CredentialsError> {
//! let config = ProviderConfig::default();
//! let provider = RotatingCredentialsProvider::builder()
//!     .retriever(default_retriever(&config)?)
//!     .configure(&config)
//!     .build()
//!     .await?;
//! provider.start();
//! let credentials = provider.get().await?;
//! # drop(credentials);
//! provider.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "credentials-process")]
pub mod credential_process;
pub mod default_retriever;
pub mod ecs;
pub mod environment;
pub mod json_credentials;
pub mod provider_config;
pub mod rotation;
pub mod sts;

pub use rotation::{ProviderStatus, RotatingCredentialsProvider};
