// Copyright [2026] [Joseph Verdicchio]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright (c) 2026 Joseph Verdicchio and TrustEscrow Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod demo;
pub mod scenario;

use serde_json::{json, Value};
use trustescrow_core::digest::{canonical_json_hash, data_hash};
use trustescrow_core::{TrustEscrowError, TrustEscrowResult};

/// Hash of `bytes` as validators see it. With `canonical_json` the bytes are
/// parsed as JSON and hashed in sorted-key form.
pub fn hash_input(bytes: &[u8], canonical_json: bool) -> TrustEscrowResult<Value> {
    let hash = if canonical_json {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| TrustEscrowError::InvalidArgument(format!("not JSON: {e}")))?;
        canonical_json_hash(&value)?
    } else {
        data_hash(bytes)
    };
    Ok(json!({
        "data_hash": hash,
        "bytes": bytes.len(),
        "canonical_json": canonical_json,
    }))
}

pub fn error_json(err: &TrustEscrowError) -> Value {
    json!({ "error": err.to_string(), "kind": err.kind() })
}
