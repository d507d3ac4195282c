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
use crate::demand::{Demand, RubricDemand};
use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::types::{DataHash, Score};
use serde_json::{Map, Value};

/// Scores a JSON report artifact against a completeness/methodology rubric.
///
/// The artifact is looked up by the presented data-hash, so the score always
/// refers to exactly the bytes that were hashed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RubricValidator;

fn percent(hit: usize, total: usize) -> u64 {
    if total == 0 {
        return 100;
    }
    (hit as u64 * 100) / total as u64
}

impl RubricValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn score_report(report: &Map<String, Value>, rubric: &RubricDemand) -> Score {
        let present = rubric
            .required_fields
            .iter()
            .filter(|f| report.contains_key(f.as_str()))
            .count();
        let completeness = percent(present, rubric.required_fields.len());

        let text = report
            .get(&rubric.text_field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        let found = rubric
            .key_components
            .iter()
            .filter(|c| text.contains(&c.to_lowercase()))
            .count();
        let methodology = percent(found, rubric.key_components.len());

        let combined = (completeness + methodology) / 2;
        Score::new(u8::try_from(combined).unwrap_or(Score::MAX_VALUE)).unwrap_or(Score::FULL)
    }

    pub fn score_bytes(bytes: &[u8], rubric: &RubricDemand) -> Score {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(report)) => Self::score_report(&report, rubric),
            _ => Score::ZERO,
        }
    }
}

impl Validator for RubricValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Rubric
    }

    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        data_hash: &DataHash,
        demand: &Demand,
    ) -> TrustEscrowResult<Score> {
        let rubric = demand.decode_rubric()?;
        let bytes = ctx
            .artifacts
            .get(data_hash)
            .ok_or(TrustEscrowError::ArtifactNotFound(*data_hash))?;
        Ok(Self::score_bytes(bytes, &rubric))
    }

    fn box_clone(&self) -> Box<dyn Validator> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;
    use serde_json::json;

    fn rubric() -> RubricDemand {
        RubricDemand {
            required_fields: vec![
                "analysis".to_string(),
                "summary".to_string(),
                "sources".to_string(),
                "confidence".to_string(),
            ],
            key_components: vec![
                "market".to_string(),
                "risk".to_string(),
                "trend".to_string(),
            ],
            ..RubricDemand::default()
        }
    }

    #[test]
    fn complete_report_scores_full() {
        let report = json!({
            "analysis": "Market TREND is up; risk is moderate.",
            "summary": "ok",
            "sources": [],
            "confidence": 0.8,
        });
        let bytes = serde_json::to_vec(&report).unwrap();
        assert_eq!(RubricValidator::score_bytes(&bytes, &rubric()), Score::FULL);
    }

    #[test]
    fn partial_report_floors_the_average() {
        // 3/4 fields = 75, 1/3 components = 33, (75 + 33) / 2 = 54
        let report = json!({
            "analysis": "the market went sideways",
            "summary": "meh",
            "sources": [],
        });
        let bytes = serde_json::to_vec(&report).unwrap();
        assert_eq!(RubricValidator::score_bytes(&bytes, &rubric()).value(), 54);
    }

    #[test]
    fn non_object_scores_zero() {
        assert_eq!(RubricValidator::score_bytes(b"[1,2]", &rubric()), Score::ZERO);
        assert_eq!(RubricValidator::score_bytes(b"not json", &rubric()), Score::ZERO);
    }

    #[test]
    fn empty_rubric_accepts_any_object() {
        assert_eq!(
            RubricValidator::score_bytes(b"{}", &RubricDemand::default()),
            Score::FULL
        );
    }

    #[test]
    fn missing_artifact_is_an_error() {
        let mut store = ArtifactStore::new();
        let demand = Demand::rubric(rubric()).unwrap();
        let missing = DataHash([9; 32]);
        let ctx = EvaluationContext {
            now: 0,
            artifacts: &store,
        };
        assert_eq!(
            RubricValidator::new().evaluate(&ctx, &missing, &demand),
            Err(TrustEscrowError::ArtifactNotFound(missing))
        );

        let h = store.put(b"{\"analysis\":\"risk\"}".to_vec());
        let ctx = EvaluationContext {
            now: 0,
            artifacts: &store,
        };
        // 1/4 fields = 25, 1/3 components = 33
        assert_eq!(
            RubricValidator::new().evaluate(&ctx, &h, &demand).unwrap().value(),
            29
        );
    }
}
