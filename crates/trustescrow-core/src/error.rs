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

use crate::types::{Address, AgentId, DataHash};
use thiserror::Error;

pub type TrustEscrowResult<T> = Result<T, TrustEscrowError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustEscrowError {
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("invalid escrow parameters: {0}")]
    InvalidEscrowParameters(String),

    #[error("value transfer failed: {0}")]
    TransferFailed(String),

    #[error("escrow is missing or already settled")]
    InvalidEscrow,

    #[error("caller is not authorized to settle this escrow")]
    UnauthorizedClaim,

    #[error("validation does not authorize release: {0}")]
    InvalidValidation(String),

    #[error("mediation pending; retry after the deadline")]
    AwaitingMediation,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("domain already registered: {0}")]
    DomainAlreadyRegistered(String),

    #[error("address already registered: {0}")]
    AddressAlreadyRegistered(Address),

    #[error("caller does not control agent {0}")]
    UnauthorizedAgentUpdate(AgentId),

    #[error("validation already requested for {0}")]
    ValidationAlreadyRequested(DataHash),

    #[error("no validation request for {0}")]
    ValidationRequestNotFound(DataHash),

    #[error("validation already answered for {0}")]
    ValidationAlreadyResponded(DataHash),

    #[error("publisher is not the requested validator agent")]
    UnauthorizedValidator,

    #[error("score {0} outside 0..=100")]
    ScoreOutOfRange(u8),

    #[error("demand payload rejected: {0}")]
    InvalidDemand(String),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(DataHash),

    #[error("no validator deployed at {0}")]
    ValidatorNotDeployed(Address),

    #[error("mediation already recorded for {0}")]
    MediationAlreadyRecorded(DataHash),

    #[error("event log broken at record {0}")]
    EventLogBroken(u64),
}

impl TrustEscrowError {
    /// Stable snake_case name, used in CLI output and scenario expectations.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentNotFound(_) => "agent_not_found",
            Self::InvalidEscrowParameters(_) => "invalid_escrow_parameters",
            Self::TransferFailed(_) => "transfer_failed",
            Self::InvalidEscrow => "invalid_escrow",
            Self::UnauthorizedClaim => "unauthorized_claim",
            Self::InvalidValidation(_) => "invalid_validation",
            Self::AwaitingMediation => "awaiting_mediation",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::DomainAlreadyRegistered(_) => "domain_already_registered",
            Self::AddressAlreadyRegistered(_) => "address_already_registered",
            Self::UnauthorizedAgentUpdate(_) => "unauthorized_agent_update",
            Self::ValidationAlreadyRequested(_) => "validation_already_requested",
            Self::ValidationRequestNotFound(_) => "validation_request_not_found",
            Self::ValidationAlreadyResponded(_) => "validation_already_responded",
            Self::UnauthorizedValidator => "unauthorized_validator",
            Self::ScoreOutOfRange(_) => "score_out_of_range",
            Self::InvalidDemand(_) => "invalid_demand",
            Self::ArtifactNotFound(_) => "artifact_not_found",
            Self::ValidatorNotDeployed(_) => "validator_not_deployed",
            Self::MediationAlreadyRecorded(_) => "mediation_already_recorded",
            Self::EventLogBroken(_) => "event_log_broken",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let errors = [
            TrustEscrowError::AgentNotFound(AgentId(1)),
            TrustEscrowError::InvalidEscrowParameters(String::new()),
            TrustEscrowError::TransferFailed(String::new()),
            TrustEscrowError::InvalidEscrow,
            TrustEscrowError::UnauthorizedClaim,
            TrustEscrowError::InvalidValidation(String::new()),
            TrustEscrowError::AwaitingMediation,
            TrustEscrowError::UnauthorizedValidator,
        ];
        let mut kinds: Vec<&str> = errors.iter().map(TrustEscrowError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}
