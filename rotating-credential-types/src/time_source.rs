/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Time source abstraction to support testing

use std::fmt::Debug;
use std::sync::Arc;
use std::time::SystemTime;

/// Trait with a `now()` function returning the current time
pub trait TimeSource: Debug + Send + Sync {
    /// Returns the current time
    fn now(&self) -> SystemTime;
}

/// Time source delegating to `SystemTime::now()`
#[non_exhaustive]
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Creates a new `SystemTimeSource`
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Wrapper type for sharable `TimeSource`
#[derive(Clone, Debug)]
pub struct SharedTimeSource(Arc<dyn TimeSource>);

impl Default for SharedTimeSource {
    fn default() -> Self {
        SharedTimeSource(Arc::new(SystemTimeSource))
    }
}

impl SharedTimeSource {
    /// Creates a new `SharedTimeSource` from a `TimeSource`
    pub fn new(source: impl TimeSource + 'static) -> Self {
        SharedTimeSource(Arc::new(source))
    }

    /// Returns the current time
    pub fn now(&self) -> SystemTime {
        self.0.now()
    }
}

impl From<Arc<dyn TimeSource>> for SharedTimeSource {
    fn from(source: Arc<dyn TimeSource>) -> Self {
        SharedTimeSource(source)
    }
}

impl TimeSource for SharedTimeSource {
    fn now(&self) -> SystemTime {
        self.0.now()
    }
}
