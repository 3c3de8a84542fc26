/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The [`RetrieveCredentials`] contract implemented by pluggable credential sources.
//!
//! A retriever knows how to fetch one set of credentials from somewhere: the
//! ECS container metadata endpoint, STS, a subprocess, or the process
//! environment. The rotating provider owns a retriever and calls it whenever a
//! refresh is due; it calls [`RetrieveCredentials::shutdown`] exactly once when
//! the provider itself shuts down.

use crate::{Credentials, CredentialsError};
use std::fmt;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

/// Result type for credential retrievers.
pub type Result = std::result::Result<Credentials, CredentialsError>;

/// Named futures returned by [`RetrieveCredentials`] implementations.
pub mod future {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

    enum Inner<'a, T> {
        Ready(Option<T>),
        Boxed(BoxFuture<'a, T>),
    }

    impl<T: Unpin> Future for Inner<'_, T> {
        type Output = T;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            match self.get_mut() {
                Inner::Ready(value) => {
                    Poll::Ready(value.take().expect("future polled after completion"))
                }
                Inner::Boxed(future) => future.as_mut().poll(cx),
            }
        }
    }

    /// Future returned by [`RetrieveCredentials::retrieve_credentials`](super::RetrieveCredentials::retrieve_credentials).
    pub struct RetrieveCredentials<'a>(Inner<'a, super::Result>);

    impl<'a> RetrieveCredentials<'a> {
        /// Creates a `RetrieveCredentials` future from another future.
        pub fn new(future: impl Future<Output = super::Result> + Send + 'a) -> Self {
            RetrieveCredentials(Inner::Boxed(Box::pin(future)))
        }

        /// Creates a `RetrieveCredentials` future that is immediately ready.
        pub fn ready(result: super::Result) -> Self {
            RetrieveCredentials(Inner::Ready(Some(result)))
        }
    }

    impl Future for RetrieveCredentials<'_> {
        type Output = super::Result;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            Pin::new(&mut self.0).poll(cx)
        }
    }

    /// Future returned by [`RetrieveCredentials::shutdown`](super::RetrieveCredentials::shutdown).
    pub struct Shutdown<'a>(Inner<'a, std::result::Result<(), super::CredentialsError>>);

    impl<'a> Shutdown<'a> {
        /// Creates a `Shutdown` future from another future.
        pub fn new(
            future: impl Future<Output = std::result::Result<(), super::CredentialsError>> + Send + 'a,
        ) -> Self {
            Shutdown(Inner::Boxed(Box::pin(future)))
        }

        /// Creates a `Shutdown` future that is immediately ready.
        pub fn ready(result: std::result::Result<(), super::CredentialsError>) -> Self {
            Shutdown(Inner::Ready(Some(result)))
        }
    }

    impl Future for Shutdown<'_> {
        type Output = std::result::Result<(), super::CredentialsError>;

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            Pin::new(&mut self.0).poll(cx)
        }
    }
}

/// Asynchronous credential retriever
///
/// Implementations fetch one set of credentials per call. They may suspend and
/// they may fail; the rotating provider is responsible for scheduling calls and
/// for tolerating transient failures.
pub trait RetrieveCredentials: Send + Sync + Debug {
    /// Returns a future that retrieves credentials.
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a;

    /// Releases any resources held by the retriever.
    ///
    /// Idempotent. Called exactly once by the owning provider during its own
    /// shutdown, regardless of how many refreshes have used the retriever. The
    /// default implementation does nothing.
    fn shutdown<'a>(&'a self) -> future::Shutdown<'a>
    where
        Self: 'a,
    {
        future::Shutdown::ready(Ok(()))
    }
}

/// Static credentials are themselves a (never-expiring) retriever.
impl RetrieveCredentials for Credentials {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::ready(Ok(self.clone()))
    }
}

impl RetrieveCredentials for Arc<dyn RetrieveCredentials> {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        self.as_ref().retrieve_credentials()
    }

    fn shutdown<'a>(&'a self) -> future::Shutdown<'a>
    where
        Self: 'a,
    {
        self.as_ref().shutdown()
    }
}

/// Credential retriever wrapper that may be shared
///
/// Newtype wrapper around [`RetrieveCredentials`] that implements `Clone` using
/// an internal `Arc`.
#[derive(Clone, Debug)]
pub struct SharedCredentialsRetriever(Arc<dyn RetrieveCredentials>);

impl SharedCredentialsRetriever {
    /// Creates a new `SharedCredentialsRetriever` from a `RetrieveCredentials`.
    ///
    /// The given retriever will be wrapped in an internal `Arc`. If your
    /// retriever is already in an `Arc`, use
    /// `SharedCredentialsRetriever::from(retriever)` instead.
    pub fn new(retriever: impl RetrieveCredentials + 'static) -> Self {
        SharedCredentialsRetriever(Arc::new(retriever))
    }
}

impl AsRef<dyn RetrieveCredentials> for SharedCredentialsRetriever {
    fn as_ref(&self) -> &(dyn RetrieveCredentials + 'static) {
        self.0.as_ref()
    }
}

impl From<Arc<dyn RetrieveCredentials>> for SharedCredentialsRetriever {
    fn from(retriever: Arc<dyn RetrieveCredentials>) -> Self {
        SharedCredentialsRetriever(retriever)
    }
}

impl RetrieveCredentials for SharedCredentialsRetriever {
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        self.0.retrieve_credentials()
    }

    fn shutdown<'a>(&'a self) -> future::Shutdown<'a>
    where
        Self: 'a,
    {
        self.0.shutdown()
    }
}

/// A [`RetrieveCredentials`] implemented by a closure.
///
/// See [`retrieve_credentials_fn`] for more details.
pub struct RetrieveCredentialsFn<T> {
    f: T,
}

impl<T> Debug for RetrieveCredentialsFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrieveCredentialsFn").finish()
    }
}

impl<T, F> RetrieveCredentials for RetrieveCredentialsFn<T>
where
    T: Fn() -> F + Send + Sync,
    F: Future<Output = Result> + Send + 'static,
{
    fn retrieve_credentials<'a>(&'a self) -> future::RetrieveCredentials<'a>
    where
        Self: 'a,
    {
        future::RetrieveCredentials::new((self.f)())
    }
}

/// Returns a new [`RetrieveCredentialsFn`] with the given closure. This allows you
/// to create a [`RetrieveCredentials`] implementation from an async block that
/// returns a [`Result`].
///
/// # Example
///
/// ```rust
/// use rotating_credential_types::{retrieve_credentials_fn, Credentials};
///
/// let retriever = retrieve_credentials_fn(|| async {
///     // An async process to retrieve credentials would go here:
///     Ok(Credentials::new("example", "example", None, None, "my_provider_name"))
/// });
/// ```
pub fn retrieve_credentials_fn<T, F>(f: T) -> RetrieveCredentialsFn<T>
where
    T: Fn() -> F + Send + Sync,
    F: Future<Output = Result> + Send + 'static,
{
    RetrieveCredentialsFn { f }
}
