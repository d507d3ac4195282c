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

use crate::digest::{canonical_json_bytes, data_hash};
use crate::error::TrustEscrowResult;
use crate::types::DataHash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Content-addressed store for deliverables that validators inspect.
///
/// Entries are keyed by `data_hash(bytes)`, so a lookup can never return bytes
/// that disagree with the hash a claim presents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactStore {
    blobs: BTreeMap<DataHash, Vec<u8>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, bytes: Vec<u8>) -> DataHash {
        let hash = data_hash(&bytes);
        self.blobs.entry(hash).or_insert(bytes);
        hash
    }

    pub fn put_json(&mut self, value: &Value) -> TrustEscrowResult<DataHash> {
        Ok(self.put(canonical_json_bytes(value)?))
    }

    pub fn get(&self, hash: &DataHash) -> Option<&[u8]> {
        self.blobs.get(hash).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}
