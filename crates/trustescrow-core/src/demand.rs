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

//! Demand payloads.
//!
//! The engine stores a [`Demand`] as an opaque byte blob and forwards it to the
//! validator the escrower named. The typed schemas below are the convention the
//! shipped validators agree on: sorted-key JSON with a `schema` tag.

use crate::digest::{canonical_json_bytes, data_hash};
use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::types::{Address, DataHash, Timestamp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Demand(Vec<u8>);

impl Demand {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Digest recorded next to every score a validator component publishes.
    pub fn digest(&self) -> DataHash {
        data_hash(&self.0)
    }

    pub fn encode(schema: &DemandSchema) -> TrustEscrowResult<Self> {
        let value = serde_json::to_value(schema)
            .map_err(|e| TrustEscrowError::InvalidDemand(e.to_string()))?;
        Ok(Self(canonical_json_bytes(&value)?))
    }

    pub fn content(content: impl Into<Vec<u8>>) -> TrustEscrowResult<Self> {
        Self::encode(&DemandSchema::Content(ContentDemand {
            content: content.into(),
        }))
    }

    pub fn mediation(mediator: Address, deadline: Timestamp) -> TrustEscrowResult<Self> {
        Self::encode(&DemandSchema::Mediation(MediationDemand { mediator, deadline }))
    }

    pub fn rubric(demand: RubricDemand) -> TrustEscrowResult<Self> {
        Self::encode(&DemandSchema::Rubric(demand))
    }

    pub fn decode(&self) -> TrustEscrowResult<DemandSchema> {
        serde_json::from_slice(&self.0).map_err(|e| TrustEscrowError::InvalidDemand(e.to_string()))
    }

    pub fn decode_content(&self) -> TrustEscrowResult<ContentDemand> {
        match self.decode()? {
            DemandSchema::Content(d) => Ok(d),
            other => Err(unexpected("content/v1", &other)),
        }
    }

    pub fn decode_mediation(&self) -> TrustEscrowResult<MediationDemand> {
        match self.decode()? {
            DemandSchema::Mediation(d) => Ok(d),
            other => Err(unexpected("mediation/v1", &other)),
        }
    }

    pub fn decode_rubric(&self) -> TrustEscrowResult<RubricDemand> {
        match self.decode()? {
            DemandSchema::Rubric(d) => Ok(d),
            other => Err(unexpected("rubric/v1", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &DemandSchema) -> TrustEscrowError {
    TrustEscrowError::InvalidDemand(format!(
        "expected {expected}, got {}",
        got.schema_name()
    ))
}

impl std::fmt::Debug for Demand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Demand({} bytes)", self.0.len())
    }
}

impl Serialize for Demand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Demand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map(Self).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum DemandSchema {
    #[serde(rename = "content/v1")]
    Content(ContentDemand),
    #[serde(rename = "mediation/v1")]
    Mediation(MediationDemand),
    #[serde(rename = "rubric/v1")]
    Rubric(RubricDemand),
}

impl DemandSchema {
    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::Content(_) => "content/v1",
            Self::Mediation(_) => "mediation/v1",
            Self::Rubric(_) => "rubric/v1",
        }
    }
}

/// Expected deliverable content for the deterministic check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDemand {
    #[serde(rename = "content_hex", with = "hex_vec")]
    pub content: Vec<u8>,
}

/// Designated mediator and the end of its objection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediationDemand {
    pub mediator: Address,
    pub deadline: Timestamp,
}

fn default_text_field() -> String {
    "analysis".to_string()
}

/// Quality rubric applied to a JSON report artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricDemand {
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub key_components: Vec<String>,
    #[serde(default = "default_text_field")]
    pub text_field: String,
}

impl Default for RubricDemand {
    fn default() -> Self {
        Self {
            required_fields: Vec::new(),
            key_components: Vec::new(),
            text_field: default_text_field(),
        }
    }
}

mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
