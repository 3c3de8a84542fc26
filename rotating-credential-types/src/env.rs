/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Process environment abstraction for testing
//!
//! Environment variables are global to a process, and, as such, are difficult to
//! test with a multi-threaded test runner like Rust's. This enables loading
//! environment variables either from the actual process environment
//! ([`std::env::var`]) or from a hash map.

use std::collections::HashMap;
use std::env::VarError;
use std::sync::Arc;

/// Environment variable abstraction
///
/// Process environments are cheap to clone:
/// - Faked process environments are wrapped in an internal Arc
/// - Real process environments are pointer-sized
#[derive(Clone, Debug)]
pub struct Env(Arc<Inner>);

#[derive(Debug)]
enum Inner {
    Real,
    Fake(HashMap<String, String>),
}

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}

impl Env {
    /// Returns the value of the environment variable `k`
    pub fn get(&self, k: &str) -> Result<String, VarError> {
        match self.0.as_ref() {
            Inner::Real => std::env::var(k),
            Inner::Fake(map) => map.get(k).cloned().ok_or(VarError::NotPresent),
        }
    }

    /// Creates an environment backed by the real process environment
    pub fn real() -> Self {
        Env(Arc::new(Inner::Real))
    }

    /// Creates a fake process environment from a slice of tuples.
    ///
    /// # Example
    /// ```rust
    /// use rotating_credential_types::env::Env;
    /// let mock_env = Env::from_slice(&[
    ///     ("AWS_ACCESS_KEY_ID", "akid"),
    ///     ("AWS_SECRET_ACCESS_KEY", "secret"),
    /// ]);
    /// ```
    pub fn from_slice(vars: &[(&str, &str)]) -> Self {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Env(Arc::new(Inner::Fake(map)))
    }
}

#[cfg(test)]
mod test {
    use super::Env;

    #[test]
    fn fake_env_returns_configured_values() {
        let env = Env::from_slice(&[("A", "1")]);
        assert_eq!(env.get("A").unwrap(), "1");
        assert!(env.get("B").is_err());
    }
}
