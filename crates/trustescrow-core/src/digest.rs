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

use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::types::{Address, DataHash, Hash32};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const ADDRESS_DOMAIN: &[u8] = b"trustescrow/address/v1";

pub fn sha256(bytes: &[u8]) -> Hash32 {
    let mut h = Sha256::new();
    h.update(bytes);
    h.finalize().into()
}

/// Digest under which validators and the ledger know a piece of work.
pub fn data_hash(bytes: &[u8]) -> DataHash {
    DataHash(sha256(bytes))
}

fn sort_json(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, val) in entries {
                sorted.insert(k, sort_json(val));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}

/// Sorted-key compact JSON encoding; stable across input key order.
pub fn canonical_json_bytes(value: &Value) -> TrustEscrowResult<Vec<u8>> {
    serde_json::to_vec(&sort_json(value.clone()))
        .map_err(|e| TrustEscrowError::InvalidArgument(format!("json encoding failed: {e}")))
}

pub fn canonical_json_hash(value: &Value) -> TrustEscrowResult<DataHash> {
    Ok(data_hash(&canonical_json_bytes(value)?))
}

/// Deterministic address for a named actor or a deployed component.
pub fn derive_address(namespace: &str, label: &[u8]) -> Address {
    let mut h = Sha256::new();
    h.update(ADDRESS_DOMAIN);
    h.update((namespace.len() as u32).to_be_bytes());
    h.update(namespace.as_bytes());
    h.update(label);
    let digest = h.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..32]);
    Address(out)
}
