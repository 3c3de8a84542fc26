/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Retriever discovery from the process environment

use crate::ecs::{self, EcsCredentialsRetriever};
use crate::environment::{self, EnvironmentVariableCredentialsRetriever};
use crate::provider_config::ProviderConfig;
use rotating_credential_types::{CredentialsError, SharedCredentialsRetriever};

#[cfg(all(debug_assertions, feature = "credentials-process"))]
const ENV_DEV_ROLE_ARN: &str = "DEV_CREDENTIALS_IAM_ROLE_ARN";

/// Chooses a credential retriever based on the process environment.
///
/// Resolution order:
/// 1. `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` set: the
///    [ECS container retriever](EcsCredentialsRetriever)
/// 2. `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` set: the
///    [static environment retriever](EnvironmentVariableCredentialsRetriever)
/// 3. Debug builds only, `DEV_CREDENTIALS_IAM_ROLE_ARN` set: the
///    [subprocess retriever](crate::credential_process::CredentialProcessRetriever)
///    invoking `get-credentials.sh` for that role
///
/// Returns [`CredentialsError::MissingCredentials`] when no source is
/// detected.
pub fn default_retriever(
    config: &ProviderConfig,
) -> Result<SharedCredentialsRetriever, CredentialsError> {
    let env = config.env();

    if env.get(ecs::ENV_RELATIVE_URI).is_ok() {
        tracing::debug!("selected the container metadata credentials retriever");
        return Ok(SharedCredentialsRetriever::new(
            EcsCredentialsRetriever::builder().configure(config).build(),
        ));
    }

    if env.get(environment::ENV_ACCESS_KEY_ID).is_ok()
        && env.get(environment::ENV_SECRET_ACCESS_KEY).is_ok()
    {
        tracing::debug!("selected the static environment credentials retriever");
        return Ok(SharedCredentialsRetriever::new(
            EnvironmentVariableCredentialsRetriever::new_with_env(env),
        ));
    }

    #[cfg(all(debug_assertions, feature = "credentials-process"))]
    if let Ok(role_arn) = env.get(ENV_DEV_ROLE_ARN) {
        tracing::debug!(role_arn = %role_arn, "selected the dev-mode subprocess credentials retriever");
        return Ok(SharedCredentialsRetriever::new(
            crate::credential_process::CredentialProcessRetriever::for_dev_role(&role_arn, config),
        ));
    }

    Err(CredentialsError::missing_credentials(
        "no credential source detected in the environment",
    ))
}

#[cfg(test)]
mod test {
    use super::default_retriever;
    use crate::provider_config::ProviderConfig;
    use rotating_credential_types::env::Env;
    use rotating_credential_types::CredentialsError;

    fn config(vars: &[(&str, &str)]) -> ProviderConfig {
        ProviderConfig::default().with_env(Env::from_slice(vars))
    }

    #[test]
    fn container_uri_selects_the_ecs_retriever() {
        let retriever = default_retriever(&config(&[
            ("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI", "/v2/abc"),
            ("AWS_ACCESS_KEY_ID", "akid"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]))
        .expect("ecs source");
        assert!(format!("{:?}", retriever).contains("EcsCredentialsRetriever"));
    }

    #[test]
    fn static_keys_select_the_environment_retriever() {
        let retriever = default_retriever(&config(&[
            ("AWS_ACCESS_KEY_ID", "akid"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]))
        .expect("environment source");
        assert!(format!("{:?}", retriever).contains("EnvironmentVariableCredentialsRetriever"));
    }

    #[test]
    fn access_key_without_secret_is_not_enough() {
        let err = default_retriever(&config(&[("AWS_ACCESS_KEY_ID", "akid")]))
            .expect_err("incomplete static keys");
        assert!(matches!(err, CredentialsError::MissingCredentials { .. }));
    }

    #[cfg(all(debug_assertions, feature = "credentials-process"))]
    #[test]
    fn dev_role_selects_the_subprocess_retriever() {
        let retriever = default_retriever(&config(&[(
            "DEV_CREDENTIALS_IAM_ROLE_ARN",
            "arn:aws:iam::123:role/dev",
        )]))
        .expect("dev source");
        assert!(format!("{:?}", retriever).contains("CredentialProcessRetriever"));
    }

    #[test]
    fn empty_environment_is_an_error() {
        let err = default_retriever(&config(&[])).expect_err("no sources");
        assert!(matches!(err, CredentialsError::MissingCredentials { .. }));
    }
}
