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

//! Pluggable validators.
//!
//! A validator turns `(data_hash, demand)` into a [`Score`] and publishes it to
//! the validation ledger under its own address. The engine only knows the
//! [`Validator`] contract; concrete policies are looked up at the current
//! address of the validator agent named on each escrow.

mod deterministic;
mod mediation;
mod rubric;

pub use deterministic::DeterministicCheckValidator;
pub use mediation::{MediationBook, MediationDecision, MediationState, OptimisticMediationValidator};
pub use rubric::RubricValidator;

use crate::artifacts::ArtifactStore;
use crate::demand::Demand;
use crate::digest::derive_address;
use crate::directory::AgentDirectory;
use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::events::{EscrowEvent, EventLog};
use crate::journal::{Journal, Transactional};
use crate::types::{Address, DataHash, Score, Timestamp};
use crate::validation::ValidationLedger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    DeterministicCheck,
    OptimisticMediation,
    Rubric,
}

/// What a validator may observe while scoring.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub now: Timestamp,
    pub artifacts: &'a ArtifactStore,
}

pub trait Validator: Send + Sync + fmt::Debug {
    fn kind(&self) -> ValidatorKind;

    /// Pure scoring step; never writes the ledger.
    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        data_hash: &DataHash,
        demand: &Demand,
    ) -> TrustEscrowResult<Score>;

    fn mediation_book(&self) -> Option<&MediationBook> {
        None
    }

    fn mediation_book_mut(&mut self) -> Option<&mut MediationBook> {
        None
    }

    fn box_clone(&self) -> Box<dyn Validator>;
}

impl Clone for Box<dyn Validator> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Validators deployed on the chain, keyed by their address.
#[derive(Debug, Clone, Default)]
pub struct ValidatorSet {
    validators: BTreeMap<Address, Box<dyn Validator>>,
    deployed: u64,
    journal: Journal<RecordedDecision>,
}

#[derive(Debug, Clone, Copy)]
struct RecordedDecision {
    validator: Address,
    mediator: Address,
    data_hash: DataHash,
}

impl ValidatorSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn deploy(&mut self, validator: Box<dyn Validator>) -> Address {
        let address = derive_address("validator", &self.deployed.to_be_bytes());
        self.deployed += 1;
        self.validators.insert(address, validator);
        address
    }

    pub fn get(&self, address: &Address) -> Option<&dyn Validator> {
        self.validators.get(address).map(std::boxed::Box::as_ref)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut (dyn Validator + 'static)> {
        self.validators.get_mut(address).map(std::boxed::Box::as_mut)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.validators.contains_key(address)
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.validators.keys().copied().collect()
    }

    pub fn mediation_book_mut(&mut self, address: &Address) -> TrustEscrowResult<&mut MediationBook> {
        self.validators
            .get_mut(address)
            .ok_or(TrustEscrowError::ValidatorNotDeployed(*address))?
            .mediation_book_mut()
            .ok_or_else(|| {
                TrustEscrowError::InvalidArgument(format!("{address} does not accept mediation"))
            })
    }

    /// Writes `mediator`'s decision into the book of the validator at `address`.
    pub fn record_mediation(
        &mut self,
        address: &Address,
        mediator: Address,
        data_hash: DataHash,
        decision: MediationDecision,
    ) -> TrustEscrowResult<()> {
        self.mediation_book_mut(address)?
            .record(mediator, data_hash, decision)?;
        self.journal.record(RecordedDecision {
            validator: *address,
            mediator,
            data_hash,
        });
        Ok(())
    }

    /// Scores with the validator at `address` and publishes the result under
    /// that address.
    #[allow(clippy::too_many_arguments)]
    pub fn validate(
        &self,
        address: &Address,
        ctx: &EvaluationContext<'_>,
        directory: &dyn AgentDirectory,
        ledger: &mut dyn ValidationLedger,
        events: &mut EventLog,
        data_hash: DataHash,
        demand: &Demand,
    ) -> TrustEscrowResult<Score> {
        let validator = self
            .get(address)
            .ok_or(TrustEscrowError::ValidatorNotDeployed(*address))?;
        let score = validator.evaluate(ctx, &data_hash, demand)?;
        ledger.validation_response(
            directory,
            *address,
            data_hash,
            score,
            Some(demand.digest()),
            ctx.now,
        )?;
        events.emit(
            ctx.now,
            EscrowEvent::ValidationResponded {
                data_hash,
                score,
                publisher: *address,
                demand_digest: Some(demand.digest()),
            },
        )?;
        tracing::debug!(
            validator = %address,
            kind = ?validator.kind(),
            data_hash = %data_hash,
            score = score.value(),
            "validation published"
        );
        Ok(score)
    }
}

impl Transactional for ValidatorSet {
    fn commit(&mut self) {
        self.journal.clear();
    }

    fn rollback(&mut self) {
        for undo in self.journal.unwind() {
            if let Some(book) = self
                .validators
                .get_mut(&undo.validator)
                .and_then(|v| v.mediation_book_mut())
            {
                book.forget(&undo.mediator, &undo.data_hash);
            }
        }
    }
}
