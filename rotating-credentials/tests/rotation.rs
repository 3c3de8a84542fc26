/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! End-to-end rotation behavior, driven by a manually advanced clock and
//! scripted retrievers.

use futures_util::future::join_all;
use rotating_credential_types::retrieve::{self, future, RetrieveCredentials};
use rotating_credential_types::test_util::ManualClock;
use rotating_credential_types::{Credentials, CredentialsError};
use rotating_credentials::provider_config::ProviderConfig;
use rotating_credentials::sts::{AssumeRole, AssumeRoleInput, AssumeRoleRetriever};
use rotating_credentials::{ProviderStatus, RotatingCredentialsProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing_test::traced_test;

const START: u64 = 1_700_000_000;

fn at(offset: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(START + offset)
}

fn start_clock() -> ManualClock {
    ManualClock::new(at(0))
}

fn creds(key: &str, expiry_offset: Option<u64>) -> Credentials {
    Credentials::new(key, "secret", None, expiry_offset.map(at), "test")
}

fn transport_err() -> CredentialsError {
    CredentialsError::transport(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset",
    ))
}

/// Returns scripted results in order, then `MissingCredentials` once the
/// script is exhausted. Counts retrieval and shutdown calls.
#[derive(Clone, Debug)]
struct ScriptedRetriever {
    script: Arc<Mutex<Vec<retrieve::Result>>>,
    calls: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

impl ScriptedRetriever {
    fn new(script: Vec<retrieve::Result>) -> Self {
        ScriptedRetriever {
            script: Arc::new(Mutex::new(script)),
            calls: Arc::new(AtomicUsize::new(0)),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl RetrieveCredentials for ScriptedRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let result = if script.is_empty() {
            Err(CredentialsError::missing_credentials(
                "retriever script exhausted",
            ))
        } else {
            script.remove(0)
        };
        future::RetrieveCredentials::ready(result)
    }

    fn shutdown<'a>(&'a self) -> future::Shutdown<'a>
    where
        Self: 'a,
    {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        future::Shutdown::ready(Ok(()))
    }
}

async fn scripted_provider(
    script: Vec<retrieve::Result>,
    clock: &ManualClock,
    expiration_buffer: u64,
    background_buffer: u64,
) -> (RotatingCredentialsProvider, ScriptedRetriever) {
    let retriever = ScriptedRetriever::new(script);
    let config = ProviderConfig::default()
        .with_time_source(clock.clone())
        .with_sleep_impl(clock.clone());
    let provider = RotatingCredentialsProvider::builder()
        .retriever(retriever.clone())
        .configure(&config)
        .expiration_buffer(Duration::from_secs(expiration_buffer))
        .background_buffer(Duration::from_secs(background_buffer))
        .build()
        .await
        .expect("initial fetch succeeds");
    (provider, retriever)
}

#[tokio::test]
async fn background_refresh_lands_before_expiry() {
    let clock = start_clock();
    let (provider, retriever) = scripted_provider(
        vec![
            Ok(creds("k1", Some(10))),
            Ok(creds("k2", Some(20))),
            Ok(creds("k3", Some(3600))),
        ],
        &clock,
        2,
        5,
    )
    .await;
    provider.start();

    // t=0: k1 is fresh
    assert_eq!(provider.get().await.unwrap().access_key_id(), "k1");

    // the scheduler fires at t=5 (k1 expiry minus the background buffer)
    clock.advance(Duration::from_secs(6)).await;
    assert_eq!(provider.get().await.unwrap().access_key_id(), "k2");

    // t=12: k2 still fresh, the next fire is armed for t=15
    clock.advance(Duration::from_secs(6)).await;
    assert_eq!(provider.get().await.unwrap().access_key_id(), "k2");

    // t=16: the t=15 fire has installed k3
    clock.advance(Duration::from_secs(4)).await;
    assert_eq!(provider.get().await.unwrap().access_key_id(), "k3");

    assert_eq!(retriever.calls(), 3);
    provider.shutdown().await.expect("clean shutdown");
}

#[traced_test]
#[tokio::test]
async fn background_failure_is_suppressed_while_credentials_are_valid() {
    let clock = start_clock();
    let (provider, retriever) = scripted_provider(
        vec![
            Ok(creds("k1", Some(10))),
            Err(transport_err()),
            Ok(creds("k2", Some(20))),
        ],
        &clock,
        2,
        5,
    )
    .await;
    provider.start();

    assert_eq!(provider.get().await.unwrap().access_key_id(), "k1");

    // t=6: the background attempt at t=5 failed silently; k1 is still served
    clock.advance(Duration::from_secs(6)).await;
    assert_eq!(provider.get().await.unwrap().access_key_id(), "k1");
    assert_eq!(retriever.calls(), 2);
    assert!(logs_contain("background credential refresh failed"));

    // t=9: within the expiration buffer of k1; get refreshes on demand
    clock.advance(Duration::from_secs(3)).await;
    let refreshed = provider.get().await.unwrap();
    assert_eq!(refreshed.access_key_id(), "k2");
    assert_eq!(retriever.calls(), 3);

    // snapshot freshness: the synchronous accessor sees exactly the value the
    // on-demand refresh returned
    assert_eq!(provider.current_credentials().unwrap(), refreshed);
    provider.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn terminal_on_demand_failure_surfaces_and_marks_credentials_missing() {
    let clock = start_clock();
    let (provider, retriever) = scripted_provider(
        vec![
            Ok(creds("k1", Some(10))),
            Err(transport_err()),
            Err(transport_err()),
        ],
        &clock,
        2,
        5,
    )
    .await;
    provider.start();

    assert_eq!(provider.get().await.unwrap().access_key_id(), "k1");

    // t=5: background attempt fails (suppressed). t=9: on-demand attempt
    // fails and the error reaches the caller.
    clock.advance(Duration::from_secs(9)).await;
    let err = provider.get().await.expect_err("on-demand failure surfaces");
    assert!(matches!(err, CredentialsError::RetrieverTransport { .. }));

    // the legacy snapshot still serves the last installed value
    assert_eq!(provider.current_credentials().unwrap().access_key_id(), "k1");

    // the store is Missing: the next get starts a fresh attempt instead of
    // reusing the failed one (the exhausted script reports missing creds)
    let err = provider.get().await.expect_err("script exhausted");
    assert!(matches!(err, CredentialsError::MissingCredentials { .. }));
    assert_eq!(retriever.calls(), 4);
}

#[tokio::test]
async fn payload_scenarios_are_covered_by_the_codec() {
    // Scenario 4 lives with the codec: see `json_credentials` unit tests for
    // the "null" literal, past expiration, and Token/SessionToken cases. This
    // test pins the decode path end to end through a retriever.
    let clock = start_clock();
    let payload = r#"{"AccessKeyId":"a","SecretAccessKey":"s","SessionToken":"xyz"}"#;
    let now = clock.now();
    let creds =
        rotating_credentials::json_credentials::parse_credentials(payload, now, "test").unwrap();
    assert_eq!(creds.session_token(), Some("xyz"));
}

#[derive(Debug)]
struct MockSts {
    clock: ManualClock,
    calls: Arc<AtomicUsize>,
}

impl AssumeRole for MockSts {
    fn assume_role<'a>(&'a self, input: &'a AssumeRoleInput) -> future::RetrieveCredentials<'a> {
        assert_eq!(input.role_session_name(), "rotation-test");
        self.calls.fetch_add(1, Ordering::SeqCst);
        let expiry = self.clock.now() + Duration::from_secs(305);
        future::RetrieveCredentials::ready(Ok(Credentials::new(
            "assumed-key",
            "assumed-secret",
            Some("assumed-token".to_string()),
            Some(expiry),
            "test",
        )))
    }
}

#[tokio::test]
async fn assume_role_delegation_rotates_and_stops_cleanly() {
    let clock = start_clock();
    let calls = Arc::new(AtomicUsize::new(0));
    let retriever = AssumeRoleRetriever::new(
        MockSts {
            clock: clock.clone(),
            calls: Arc::clone(&calls),
        },
        AssumeRoleInput::new("arn:aws:iam::123456789012:role/rotator", "rotation-test")
            .with_duration(Duration::from_secs(900))
            .unwrap(),
    );
    let config = ProviderConfig::default()
        .with_time_source(clock.clone())
        .with_sleep_impl(clock.clone());
    let provider = RotatingCredentialsProvider::builder()
        .retriever(retriever)
        .configure(&config)
        .role_session_name("rotation-test")
        .build()
        .await
        .expect("assume role succeeds");
    provider.start();

    let first = provider.get().await.unwrap();
    assert_eq!(first.access_key_id(), "assumed-key");
    assert_eq!(first.session_token(), Some("assumed-token"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    provider.shutdown().await.expect("clean shutdown");
    provider.wait().await;
    assert_eq!(provider.status(), ProviderStatus::Stopped);

    // no task remains: advancing past the armed deadline triggers nothing
    clock.advance(Duration::from_secs(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_gets_coalesce_onto_one_refresh() {
    let now = SystemTime::now();
    let retriever = ScriptedRetriever::new(vec![
        Ok(Credentials::new(
            "k1",
            "secret",
            None,
            Some(now + Duration::from_secs(1)),
            "test",
        )),
        Ok(Credentials::new(
            "k2",
            "secret",
            None,
            Some(now + Duration::from_secs(3600)),
            "test",
        )),
    ]);
    // default expiration buffer (120 s) makes k1 stale immediately
    let provider = Arc::new(
        RotatingCredentialsProvider::builder()
            .retriever(retriever.clone())
            .build()
            .await
            .expect("initial fetch succeeds"),
    );

    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.get().await.expect("refresh succeeds") })
        })
        .collect();
    for result in join_all(tasks).await {
        assert_eq!(result.unwrap().access_key_id(), "k2");
    }
    // one initial fetch plus exactly one coalesced refresh
    assert_eq!(retriever.calls(), 2);
}

#[tokio::test]
async fn shutdown_is_idempotent_and_shuts_the_retriever_down_once() {
    let clock = start_clock();
    let (provider, retriever) =
        scripted_provider(vec![Ok(creds("k1", Some(3600)))], &clock, 120, 300).await;
    provider.start();
    assert_eq!(provider.status(), ProviderStatus::Running);

    provider.shutdown().await.expect("first shutdown");
    assert_eq!(provider.status(), ProviderStatus::Stopped);
    assert_eq!(retriever.shutdowns(), 1);

    provider.shutdown().await.expect("second shutdown is a no-op");
    assert_eq!(retriever.shutdowns(), 1);
    provider.wait().await;

    let err = provider.get().await.expect_err("get after shutdown");
    assert!(matches!(err, CredentialsError::ProviderShutDown));
    let err = provider
        .current_credentials()
        .expect_err("snapshot after shutdown");
    assert!(matches!(err, CredentialsError::ProviderShutDown));
}

#[tokio::test]
async fn concurrent_shutdowns_converge() {
    let clock = start_clock();
    let (provider, retriever) =
        scripted_provider(vec![Ok(creds("k1", Some(3600)))], &clock, 120, 300).await;
    provider.start();
    let provider = Arc::new(provider);

    let shutdowns: Vec<_> = (0..3)
        .map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.shutdown().await })
        })
        .collect();
    for result in join_all(shutdowns).await {
        result.unwrap().expect("every shutdown call succeeds");
    }
    assert_eq!(provider.status(), ProviderStatus::Stopped);
    assert_eq!(retriever.shutdowns(), 1);
}

#[tokio::test]
async fn credentials_without_expiration_never_schedule_refreshes() {
    let clock = start_clock();
    let (provider, retriever) = scripted_provider(vec![Ok(creds("k1", None))], &clock, 2, 5).await;
    provider.start();

    clock.advance(Duration::from_secs(7200)).await;
    assert_eq!(clock.pending_sleeps(), 0);
    assert_eq!(provider.get().await.unwrap().access_key_id(), "k1");
    assert_eq!(retriever.calls(), 1);
    provider.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn credentials_stale_at_construction_refresh_on_first_get() {
    let clock = start_clock();
    // k1 expires in 10 s, inside the 120 s expiration buffer from the start
    let (provider, retriever) = scripted_provider(
        vec![Ok(creds("k1", Some(10))), Ok(creds("k2", Some(7200)))],
        &clock,
        120,
        300,
    )
    .await;

    assert_eq!(provider.get().await.unwrap().access_key_id(), "k2");
    assert_eq!(retriever.calls(), 2);
}

/// Returns one good set of credentials, then hangs forever.
#[derive(Debug)]
struct HangAfterFirst {
    first: Mutex<Option<Credentials>>,
}

impl RetrieveCredentials for HangAfterFirst {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        match self.first.lock().unwrap().take() {
            Some(credentials) => future::RetrieveCredentials::ready(Ok(credentials)),
            None => future::RetrieveCredentials::new(std::future::pending()),
        }
    }
}

#[tokio::test]
async fn in_flight_background_refresh_does_not_block_valid_callers() {
    let clock = start_clock();
    let config = ProviderConfig::default()
        .with_time_source(clock.clone())
        .with_sleep_impl(clock.clone());
    let provider = Arc::new(
        RotatingCredentialsProvider::builder()
            .retriever(HangAfterFirst {
                first: Mutex::new(Some(creds("k1", Some(10)))),
            })
            .configure(&config)
            .expiration_buffer(Duration::from_secs(2))
            .background_buffer(Duration::from_secs(5))
            .build()
            .await
            .expect("initial fetch succeeds"),
    );
    provider.start();

    // t=6: the background refresh fired at t=5 and is hanging; the held
    // credentials are still valid and are served without waiting
    clock.advance(Duration::from_secs(6)).await;
    assert_eq!(provider.get().await.unwrap().access_key_id(), "k1");

    // t=9: inside the expiration buffer; this caller joins the hanging
    // background refresh
    clock.advance(Duration::from_secs(3)).await;
    let joined = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.get().await })
    };
    clock.advance(Duration::ZERO).await;
    assert!(!joined.is_finished());

    // shutdown cancels the in-flight refresh; the joined caller observes it
    provider.shutdown().await.expect("clean shutdown");
    let result = joined.await.unwrap();
    assert!(matches!(result, Err(CredentialsError::Cancelled)));
}

#[tokio::test]
async fn cancelled_on_demand_refresh_propagates_to_waiters() {
    let provider = Arc::new(
        RotatingCredentialsProvider::builder()
            .retriever(HangAfterFirst {
                first: Mutex::new(Some(Credentials::new(
                    "k1",
                    "secret",
                    None,
                    Some(SystemTime::now() + Duration::from_secs(1)),
                    "test",
                ))),
            })
            .build()
            .await
            .expect("initial fetch succeeds"),
    );

    // stale immediately under the default expiration buffer
    let waiter = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.get().await })
    };
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert!(!waiter.is_finished());

    provider.shutdown().await.expect("clean shutdown");
    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(CredentialsError::Cancelled)));
}
