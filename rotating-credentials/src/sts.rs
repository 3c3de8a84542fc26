/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Credential retrieval through the AWS Security Token Service (STS).

pub use assume_role::{
    AssumeRole, AssumeRoleInput, AssumeRoleRetriever, InvalidSessionDuration, StsAssumeRole,
};

mod assume_role;
