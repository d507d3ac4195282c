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
use crate::digest::data_hash;
use crate::error::TrustEscrowResult;
use crate::types::{DataHash, Score};

/// Scores 100 when the digest of the demanded content equals the presented
/// data-hash and 0 otherwise. Stateless; always answers in the same call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicCheckValidator;

impl DeterministicCheckValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn score(content: &[u8], presented: &DataHash) -> Score {
        if data_hash(content) == *presented {
            Score::FULL
        } else {
            Score::ZERO
        }
    }
}

impl Validator for DeterministicCheckValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::DeterministicCheck
    }

    fn evaluate(
        &self,
        _ctx: &EvaluationContext<'_>,
        data_hash: &DataHash,
        demand: &Demand,
    ) -> TrustEscrowResult<Score> {
        let expected = demand.decode_content()?;
        Ok(Self::score(&expected.content, data_hash))
    }

    fn box_clone(&self) -> Box<dyn Validator> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;
    use crate::error::TrustEscrowError;

    #[test]
    fn equal_digest_scores_full() {
        let store = ArtifactStore::new();
        let ctx = EvaluationContext {
            now: 0,
            artifacts: &store,
        };
        let v = DeterministicCheckValidator::new();
        let demand = Demand::content(b"Hello, World!".to_vec()).unwrap();
        assert_eq!(
            v.evaluate(&ctx, &data_hash(b"Hello, World!"), &demand).unwrap(),
            Score::FULL
        );
        assert_eq!(
            v.evaluate(&ctx, &data_hash(b"Wrong Data"), &demand).unwrap(),
            Score::ZERO
        );
    }

    #[test]
    fn empty_content_is_a_valid_demand() {
        assert_eq!(
            DeterministicCheckValidator::score(b"", &data_hash(b"")),
            Score::FULL
        );
        assert_eq!(
            DeterministicCheckValidator::score(b"", &DataHash::ZERO),
            Score::ZERO
        );
    }

    #[test]
    fn foreign_demand_is_rejected() {
        let store = ArtifactStore::new();
        let ctx = EvaluationContext {
            now: 0,
            artifacts: &store,
        };
        let demand = Demand::mediation(crate::types::Address([1; 20]), 10).unwrap();
        assert!(matches!(
            DeterministicCheckValidator::new().evaluate(&ctx, &DataHash::ZERO, &demand),
            Err(TrustEscrowError::InvalidDemand(_))
        ));
    }
}
