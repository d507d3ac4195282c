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

use crate::directory::AgentDirectory;
use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::journal::{Journal, Transactional};
use crate::types::{Address, AgentId, DataHash, Score, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub validator_agent_id: AgentId,
    pub server_agent_id: AgentId,
    pub data_hash: DataHash,
    pub requested_at: Timestamp,
}

impl ValidationRequest {
    pub fn binds(&self, validator_agent_id: AgentId, server_agent_id: AgentId) -> bool {
        self.validator_agent_id == validator_agent_id && self.server_agent_id == server_agent_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub data_hash: DataHash,
    pub score: Score,
    pub publisher: Address,
    /// Digest of the demand a deployed validator scored against. `None` when
    /// the validator agent published the score itself.
    #[serde(default)]
    pub demand_digest: Option<DataHash>,
    pub responded_at: Timestamp,
}

/// Request/response store keyed by data-hash.
///
/// A request must precede its response, and a response is written once.
pub trait ValidationLedger {
    fn validation_request(
        &mut self,
        directory: &dyn AgentDirectory,
        caller: Address,
        validator_agent_id: AgentId,
        server_agent_id: AgentId,
        data_hash: DataHash,
        now: Timestamp,
    ) -> TrustEscrowResult<()>;

    fn validation_response(
        &mut self,
        directory: &dyn AgentDirectory,
        publisher: Address,
        data_hash: DataHash,
        score: Score,
        demand_digest: Option<DataHash>,
        now: Timestamp,
    ) -> TrustEscrowResult<()>;

    fn get_validation_request(&self, data_hash: &DataHash) -> Option<&ValidationRequest>;

    fn get_validation_response(&self, data_hash: &DataHash) -> Option<&ValidationResponse>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRegistry {
    requests: BTreeMap<DataHash, ValidationRequest>,
    responses: BTreeMap<DataHash, ValidationResponse>,
    #[serde(skip)]
    journal: Journal<LedgerUndo>,
}

#[derive(Debug, Clone, Copy)]
enum LedgerUndo {
    Requested(DataHash),
    Responded(DataHash),
}

impl ValidationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    pub fn response_count(&self) -> usize {
        self.responses.len()
    }

    /// Checks everything `validation_response` would check, without writing.
    pub fn check_response(
        &self,
        directory: &dyn AgentDirectory,
        publisher: Address,
        data_hash: &DataHash,
    ) -> TrustEscrowResult<()> {
        let request = self
            .requests
            .get(data_hash)
            .ok_or(TrustEscrowError::ValidationRequestNotFound(*data_hash))?;
        if self.responses.contains_key(data_hash) {
            return Err(TrustEscrowError::ValidationAlreadyResponded(*data_hash));
        }
        let validator = directory
            .get_agent(request.validator_agent_id)
            .ok_or(TrustEscrowError::AgentNotFound(request.validator_agent_id))?;
        if validator.address != publisher {
            return Err(TrustEscrowError::UnauthorizedValidator);
        }
        Ok(())
    }
}

impl ValidationLedger for ValidationRegistry {
    fn validation_request(
        &mut self,
        directory: &dyn AgentDirectory,
        caller: Address,
        validator_agent_id: AgentId,
        server_agent_id: AgentId,
        data_hash: DataHash,
        now: Timestamp,
    ) -> TrustEscrowResult<()> {
        if !directory.agent_exists(validator_agent_id) {
            return Err(TrustEscrowError::AgentNotFound(validator_agent_id));
        }
        let server = directory
            .get_agent(server_agent_id)
            .ok_or(TrustEscrowError::AgentNotFound(server_agent_id))?;
        if server.address != caller {
            return Err(TrustEscrowError::InvalidArgument(
                "validation must be requested by the server agent".to_string(),
            ));
        }
        if self.requests.contains_key(&data_hash) {
            return Err(TrustEscrowError::ValidationAlreadyRequested(data_hash));
        }
        self.requests.insert(
            data_hash,
            ValidationRequest {
                validator_agent_id,
                server_agent_id,
                data_hash,
                requested_at: now,
            },
        );
        self.journal.record(LedgerUndo::Requested(data_hash));
        Ok(())
    }

    fn validation_response(
        &mut self,
        directory: &dyn AgentDirectory,
        publisher: Address,
        data_hash: DataHash,
        score: Score,
        demand_digest: Option<DataHash>,
        now: Timestamp,
    ) -> TrustEscrowResult<()> {
        self.check_response(directory, publisher, &data_hash)?;
        self.responses.insert(
            data_hash,
            ValidationResponse {
                data_hash,
                score,
                publisher,
                demand_digest,
                responded_at: now,
            },
        );
        self.journal.record(LedgerUndo::Responded(data_hash));
        Ok(())
    }

    fn get_validation_request(&self, data_hash: &DataHash) -> Option<&ValidationRequest> {
        self.requests.get(data_hash)
    }

    fn get_validation_response(&self, data_hash: &DataHash) -> Option<&ValidationResponse> {
        self.responses.get(data_hash)
    }
}

impl Transactional for ValidationRegistry {
    fn commit(&mut self) {
        self.journal.clear();
    }

    fn rollback(&mut self) {
        for undo in self.journal.unwind() {
            match undo {
                LedgerUndo::Requested(h) => {
                    self.requests.remove(&h);
                }
                LedgerUndo::Responded(h) => {
                    self.responses.remove(&h);
                }
            }
        }
    }
}
