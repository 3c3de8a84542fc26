/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Credential types and contracts shared by rotating credentials providers.
//!
//! This crate contains the [`Credentials`] value type, the [`RetrieveCredentials`]
//! trait implemented by pluggable credential sources, the [`CredentialsError`]
//! taxonomy, and runtime-agnostic time/sleep abstractions used to schedule
//! credential rotation.

pub mod env;
mod error;
pub mod retrieve;
pub mod sleep;
#[cfg(feature = "test-util")]
pub mod test_util;
pub mod time_source;

mod credentials_impl;

pub use credentials_impl::Credentials;
pub use error::CredentialsError;
pub use retrieve::{retrieve_credentials_fn, RetrieveCredentials, SharedCredentialsRetriever};
