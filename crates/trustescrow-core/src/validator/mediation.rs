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

use super::{EvaluationContext, Validator, ValidatorKind};
use crate::demand::Demand;
use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::types::{Address, DataHash, Score};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediationDecision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediationState {
    NoResponse,
    Accepted,
    Rejected,
}

impl From<MediationDecision> for MediationState {
    fn from(value: MediationDecision) -> Self {
        match value {
            MediationDecision::Accepted => Self::Accepted,
            MediationDecision::Rejected => Self::Rejected,
        }
    }
}

/// Decisions keyed by `(mediator, data_hash)`.
///
/// `NoResponse` is the absence of an entry; an entry, once written, is final.
#[derive(Debug, Clone, Default)]
pub struct MediationBook {
    decisions: BTreeMap<(Address, DataHash), MediationDecision>,
}

impl MediationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, mediator: &Address, data_hash: &DataHash) -> MediationState {
        self.decisions
            .get(&(*mediator, *data_hash))
            .copied()
            .map(MediationState::from)
            .unwrap_or(MediationState::NoResponse)
    }

    pub fn record(
        &mut self,
        mediator: Address,
        data_hash: DataHash,
        decision: MediationDecision,
    ) -> TrustEscrowResult<()> {
        if self.decisions.contains_key(&(mediator, data_hash)) {
            return Err(TrustEscrowError::MediationAlreadyRecorded(data_hash));
        }
        self.decisions.insert((mediator, data_hash), decision);
        Ok(())
    }

    pub(crate) fn forget(&mut self, mediator: &Address, data_hash: &DataHash) {
        self.decisions.remove(&(*mediator, *data_hash));
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Optimistic dispute policy.
///
/// The designated mediator may accept or reject explicitly at any time; an
/// explicit decision is final in both directions. Without one, the claim is
/// pending until the deadline and accepted after it.
#[derive(Debug, Clone, Default)]
pub struct OptimisticMediationValidator {
    book: MediationBook,
}

impl OptimisticMediationValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn book(&self) -> &MediationBook {
        &self.book
    }
}

impl Validator for OptimisticMediationValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::OptimisticMediation
    }

    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        data_hash: &DataHash,
        demand: &Demand,
    ) -> TrustEscrowResult<Score> {
        let terms = demand.decode_mediation()?;
        match self.book.state(&terms.mediator, data_hash) {
            MediationState::Accepted => Ok(Score::FULL),
            MediationState::Rejected => Ok(Score::ZERO),
            MediationState::NoResponse if ctx.now <= terms.deadline => {
                Err(TrustEscrowError::AwaitingMediation)
            }
            MediationState::NoResponse => Ok(Score::FULL),
        }
    }

    fn mediation_book(&self) -> Option<&MediationBook> {
        Some(&self.book)
    }

    fn mediation_book_mut(&mut self) -> Option<&mut MediationBook> {
        Some(&mut self.book)
    }

    fn box_clone(&self) -> Box<dyn Validator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;

    const MEDIATOR: Address = Address([7; 20]);
    const DEADLINE: u64 = 1_000;

    fn eval(v: &OptimisticMediationValidator, now: u64, h: DataHash) -> TrustEscrowResult<Score> {
        let store = ArtifactStore::new();
        let ctx = EvaluationContext {
            now,
            artifacts: &store,
        };
        v.evaluate(&ctx, &h, &Demand::mediation(MEDIATOR, DEADLINE).unwrap())
    }

    #[test]
    fn silence_awaits_then_accepts() {
        let v = OptimisticMediationValidator::new();
        let h = DataHash([1; 32]);
        assert_eq!(eval(&v, DEADLINE - 1, h), Err(TrustEscrowError::AwaitingMediation));
        assert_eq!(eval(&v, DEADLINE, h), Err(TrustEscrowError::AwaitingMediation));
        assert_eq!(eval(&v, DEADLINE + 1, h), Ok(Score::FULL));
    }

    #[test]
    fn rejection_survives_the_deadline() {
        let mut v = OptimisticMediationValidator::new();
        let h = DataHash([2; 32]);
        v.mediation_book_mut()
            .unwrap()
            .record(MEDIATOR, h, MediationDecision::Rejected)
            .unwrap();
        assert_eq!(eval(&v, 0, h), Ok(Score::ZERO));
        assert_eq!(eval(&v, DEADLINE * 10, h), Ok(Score::ZERO));
    }

    #[test]
    fn acceptance_is_immediate_and_final() {
        let mut v = OptimisticMediationValidator::new();
        let h = DataHash([3; 32]);
        let book = v.mediation_book_mut().unwrap();
        book.record(MEDIATOR, h, MediationDecision::Accepted).unwrap();
        assert_eq!(
            book.record(MEDIATOR, h, MediationDecision::Rejected),
            Err(TrustEscrowError::MediationAlreadyRecorded(h))
        );
        assert_eq!(eval(&v, 0, h), Ok(Score::FULL));
        assert_eq!(eval(&v, DEADLINE + 5, h), Ok(Score::FULL));
    }

    #[test]
    fn other_mediators_are_ignored() {
        let mut v = OptimisticMediationValidator::new();
        let h = DataHash([4; 32]);
        v.mediation_book_mut()
            .unwrap()
            .record(Address([8; 20]), h, MediationDecision::Rejected)
            .unwrap();
        assert_eq!(eval(&v, DEADLINE + 1, h), Ok(Score::FULL));
        assert_eq!(v.book().state(&MEDIATOR, &h), MediationState::NoResponse);
        assert_eq!(v.book().state(&Address([8; 20]), &h), MediationState::Rejected);
    }
}
