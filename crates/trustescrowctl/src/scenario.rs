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

//! JSON scenario runner.
//!
//! A scenario names its actors instead of spelling out addresses. Plain actors
//! get a derived address, validators the address they were deployed at. Every
//! step carries an `expect` (`"ok"` or an error kind) and the run passes only
//! if every step matched.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use trustescrow_core::digest::{canonical_json_hash, data_hash, derive_address};
use trustescrow_core::validator::ValidatorKind;
use trustescrow_core::{
    Address, AgentId, Amount, Chain, ChainConfig, DataHash, Demand, DepositParams,
    DeterministicCheckValidator, EscrowId, MediationDecision, OptimisticMediationValidator,
    RubricDemand, RubricValidator, Timestamp, TrustEscrowError, TrustEscrowResult, Validator,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub config: ChainConfig,
    /// Initial balances by actor name.
    #[serde(default)]
    pub funds: BTreeMap<String, Amount>,
    pub steps: Vec<Step>,
}

fn expect_ok() -> String {
    "ok".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: Op,
    #[serde(default = "expect_ok")]
    pub expect: String,
}

/// Deliverable reference: raw text, canonical JSON, or an explicit hash.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRef {
    Text(String),
    Json(Value),
    Hash(DataHash),
}

impl DataRef {
    fn resolve(&self) -> TrustEscrowResult<DataHash> {
        match self {
            Self::Text(t) => Ok(data_hash(t.as_bytes())),
            Self::Json(v) => canonical_json_hash(v),
            Self::Hash(h) => Ok(*h),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DemandSpec {
    None,
    Content {
        text: String,
    },
    Mediation {
        mediator: String,
        /// Seconds after the deposit's block time.
        deadline_in: u64,
    },
    Rubric {
        #[serde(default)]
        required_fields: Vec<String>,
        #[serde(default)]
        key_components: Vec<String>,
        #[serde(default)]
        text_field: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    DeployValidator {
        name: String,
        kind: ValidatorKind,
    },
    RegisterAgent {
        actor: String,
        domain: String,
    },
    Fund {
        actor: String,
        amount: u64,
    },
    Advance {
        secs: u64,
    },
    SetTime {
        time: Timestamp,
    },
    PublishArtifact {
        data: DataRef,
    },
    RequestValidation {
        caller: String,
        validator: String,
        server: String,
        data: DataRef,
    },
    SubmitResponse {
        caller: String,
        data: DataRef,
        score: u8,
    },
    Deposit {
        caller: String,
        escrow: String,
        validator: String,
        server: String,
        amount: u64,
        #[serde(default)]
        attached: Option<u64>,
        expires_in: u64,
        min_validation: u8,
        demand: DemandSpec,
    },
    ValidateEscrow {
        caller: String,
        escrow: String,
        data: DataRef,
    },
    Claim {
        caller: String,
        escrow: String,
        data: DataRef,
    },
    Reclaim {
        caller: String,
        escrow: String,
    },
    Mediate {
        caller: String,
        validator: String,
        data: DataRef,
        decision: MediationDecision,
    },
    RequestMediation {
        caller: String,
        escrow: String,
        data: DataRef,
    },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeployValidator { .. } => "deploy_validator",
            Self::RegisterAgent { .. } => "register_agent",
            Self::Fund { .. } => "fund",
            Self::Advance { .. } => "advance",
            Self::SetTime { .. } => "set_time",
            Self::PublishArtifact { .. } => "publish_artifact",
            Self::RequestValidation { .. } => "request_validation",
            Self::SubmitResponse { .. } => "submit_response",
            Self::Deposit { .. } => "deposit",
            Self::ValidateEscrow { .. } => "validate_escrow",
            Self::Claim { .. } => "claim",
            Self::Reclaim { .. } => "reclaim",
            Self::Mediate { .. } => "mediate",
            Self::RequestMediation { .. } => "request_mediation",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub expect: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub passed: bool,
    pub steps: Vec<StepOutcome>,
    pub audit: Value,
}

fn to_json<T: Serialize>(value: &T) -> TrustEscrowResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| TrustEscrowError::InvalidArgument(format!("json encoding: {e}")))
}

fn unknown(what: &str, name: &str) -> TrustEscrowError {
    TrustEscrowError::InvalidArgument(format!("unknown {what} {name:?}"))
}

pub fn load(path: &Path) -> TrustEscrowResult<Scenario> {
    let payload = fs::read(path)
        .map_err(|e| TrustEscrowError::InvalidArgument(format!("read {}: {e}", path.display())))?;
    serde_json::from_slice(&payload)
        .map_err(|e| TrustEscrowError::InvalidArgument(format!("scenario: {e}")))
}

pub struct ScenarioRunner {
    chain: Chain,
    actors: BTreeMap<String, Address>,
    agents: BTreeMap<String, AgentId>,
    escrows: BTreeMap<String, EscrowId>,
}

impl ScenarioRunner {
    pub fn new(config: &ChainConfig) -> TrustEscrowResult<Self> {
        Ok(Self {
            chain: config.build_chain()?,
            actors: BTreeMap::new(),
            agents: BTreeMap::new(),
            escrows: BTreeMap::new(),
        })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn actor(&mut self, name: &str) -> Address {
        *self
            .actors
            .entry(name.to_string())
            .or_insert_with(|| derive_address("actor", name.as_bytes()))
    }

    fn agent(&self, name: &str) -> TrustEscrowResult<AgentId> {
        self.agents.get(name).copied().ok_or_else(|| unknown("agent", name))
    }

    fn escrow(&self, name: &str) -> TrustEscrowResult<EscrowId> {
        self.escrows.get(name).copied().ok_or_else(|| unknown("escrow", name))
    }

    fn validator(&self, name: &str) -> TrustEscrowResult<Address> {
        self.actors
            .get(name)
            .copied()
            .filter(|a| self.chain.state().validators.contains(a))
            .ok_or_else(|| unknown("validator", name))
    }

    fn demand(&mut self, spec: &DemandSpec) -> TrustEscrowResult<Demand> {
        match spec {
            DemandSpec::None => Ok(Demand::default()),
            DemandSpec::Content { text } => Demand::content(text.as_bytes().to_vec()),
            DemandSpec::Mediation {
                mediator,
                deadline_in,
            } => {
                let mediator = self.actor(mediator);
                Demand::mediation(mediator, self.chain.now().saturating_add(*deadline_in))
            }
            DemandSpec::Rubric {
                required_fields,
                key_components,
                text_field,
            } => {
                let mut rubric = RubricDemand {
                    required_fields: required_fields.clone(),
                    key_components: key_components.clone(),
                    ..RubricDemand::default()
                };
                if let Some(field) = text_field {
                    rubric.text_field = field.clone();
                }
                Demand::rubric(rubric)
            }
        }
    }

    pub fn execute(&mut self, op: &Op) -> TrustEscrowResult<Value> {
        match op {
            Op::DeployValidator { name, kind } => {
                let validator: Box<dyn Validator> = match kind {
                    ValidatorKind::DeterministicCheck => Box::new(DeterministicCheckValidator::new()),
                    ValidatorKind::OptimisticMediation => {
                        Box::new(OptimisticMediationValidator::new())
                    }
                    ValidatorKind::Rubric => Box::new(RubricValidator::new()),
                };
                if self.actors.contains_key(name) {
                    return Err(TrustEscrowError::InvalidArgument(format!(
                        "actor {name:?} already exists"
                    )));
                }
                let address = self.chain.deploy_validator(validator);
                self.actors.insert(name.clone(), address);
                Ok(json!({ "address": address }))
            }
            Op::RegisterAgent { actor, domain } => {
                let address = self.actor(actor);
                let agent_id = self.chain.register_agent(address, domain, address)?;
                self.agents.insert(actor.clone(), agent_id);
                Ok(json!({ "agent_id": agent_id, "address": address }))
            }
            Op::Fund { actor, amount } => {
                let address = self.actor(actor);
                let balance = self.chain.fund(address, Amount::from(*amount))?;
                Ok(json!({ "balance": to_json(&balance)? }))
            }
            Op::Advance { secs } => Ok(json!({ "now": self.chain.advance_time(*secs) })),
            Op::SetTime { time } => {
                let now = self.chain.set_time(*time)?;
                Ok(json!({ "now": now }))
            }
            Op::PublishArtifact { data } => {
                let hash = match data {
                    DataRef::Text(t) => self.chain.publish_artifact(t.as_bytes().to_vec()),
                    DataRef::Json(v) => self.chain.publish_json_artifact(v)?,
                    DataRef::Hash(_) => {
                        return Err(TrustEscrowError::InvalidArgument(
                            "an artifact needs content, not a hash".to_string(),
                        ))
                    }
                };
                Ok(json!({ "data_hash": hash }))
            }
            Op::RequestValidation {
                caller,
                validator,
                server,
                data,
            } => {
                let caller = self.actor(caller);
                let validator_agent_id = self.agent(validator)?;
                let server_agent_id = self.agent(server)?;
                let hash = data.resolve()?;
                self.chain
                    .request_validation(caller, validator_agent_id, server_agent_id, hash)?;
                Ok(json!({ "data_hash": hash }))
            }
            Op::SubmitResponse {
                caller,
                data,
                score,
            } => {
                let caller = self.actor(caller);
                let hash = data.resolve()?;
                self.chain.submit_validation_response(caller, hash, *score)?;
                Ok(json!({ "data_hash": hash, "score": score }))
            }
            Op::Deposit {
                caller,
                escrow,
                validator,
                server,
                amount,
                attached,
                expires_in,
                min_validation,
                demand,
            } => {
                if self.escrows.contains_key(escrow) {
                    return Err(TrustEscrowError::InvalidArgument(format!(
                        "escrow {escrow:?} already exists"
                    )));
                }
                let caller = self.actor(caller);
                let params = DepositParams {
                    validator_agent_id: self.agent(validator)?,
                    server_agent_id: self.agent(server)?,
                    amount: Amount::from(*amount),
                    expiration_time: self.chain.now().saturating_add(*expires_in),
                    min_validation: *min_validation,
                    demand: self.demand(demand)?,
                };
                let id = self
                    .chain
                    .deposit_escrow(caller, &params, Amount::from(attached.unwrap_or(*amount)))?;
                self.escrows.insert(escrow.clone(), id);
                Ok(json!({ "escrow_id": id, "expiration_time": params.expiration_time }))
            }
            Op::ValidateEscrow {
                caller,
                escrow,
                data,
            } => {
                let caller = self.actor(caller);
                let id = self.escrow(escrow)?;
                let score = self.chain.validate_escrow(caller, id, data.resolve()?)?;
                Ok(json!({ "score": score }))
            }
            Op::Claim {
                caller,
                escrow,
                data,
            } => {
                let caller = self.actor(caller);
                let id = self.escrow(escrow)?;
                let paid = self.chain.claim_escrow(caller, id, data.resolve()?)?;
                Ok(json!({ "escrow_id": id, "paid": to_json(&paid)? }))
            }
            Op::Reclaim { caller, escrow } => {
                let caller = self.actor(caller);
                let id = self.escrow(escrow)?;
                let paid = self.chain.reclaim_expired(caller, id)?;
                Ok(json!({ "escrow_id": id, "paid": to_json(&paid)? }))
            }
            Op::Mediate {
                caller,
                validator,
                data,
                decision,
            } => {
                let caller = self.actor(caller);
                let validator = self.validator(validator)?;
                self.chain
                    .mediate(caller, validator, data.resolve()?, *decision)?;
                Ok(json!({ "decision": decision }))
            }
            Op::RequestMediation {
                caller,
                escrow,
                data,
            } => {
                let caller = self.actor(caller);
                let id = self.escrow(escrow)?;
                let record = self.chain.get_escrow(id);
                let validator = self
                    .chain
                    .agent(record.validator_agent_id)
                    .map(|agent| agent.address)
                    .ok_or(TrustEscrowError::AgentNotFound(record.validator_agent_id))?;
                let hash = data.resolve()?;
                self.chain
                    .request_mediation(caller, validator, hash, &record.demand)?;
                let terms = record.demand.decode_mediation()?;
                Ok(json!({ "mediator": terms.mediator, "deadline": terms.deadline }))
            }
        }
    }

    pub fn run_step(&mut self, index: usize, step: &Step) -> StepOutcome {
        let result = self.execute(&step.op);
        let (outcome, value, error) = match result {
            Ok(v) => ("ok".to_string(), Some(v), None),
            Err(e) => (e.kind().to_string(), None, Some(e.to_string())),
        };
        let passed = outcome == step.expect;
        if passed {
            tracing::debug!(index, op = step.op.name(), %outcome, "step matched");
        } else {
            tracing::warn!(index, op = step.op.name(), expect = %step.expect, %outcome, "step mismatch");
        }
        StepOutcome {
            index,
            op: step.op.name(),
            expect: step.expect.clone(),
            outcome,
            value,
            error,
            passed,
        }
    }

    /// Agents, escrows, named balances, events and the verified head of the
    /// event hash chain.
    pub fn audit(&self) -> TrustEscrowResult<Value> {
        let state = self.chain.state();
        let agents: Vec<Value> = state
            .directory
            .agents()
            .map(to_json)
            .collect::<TrustEscrowResult<_>>()?;
        let names: BTreeMap<EscrowId, &str> = self
            .escrows
            .iter()
            .map(|(name, id)| (*id, name.as_str()))
            .collect();
        let escrows = state
            .engine
            .escrows()
            .map(|(id, escrow)| {
                let mut v = to_json(escrow)?;
                if let Value::Object(map) = &mut v {
                    map.insert("escrow_id".to_string(), json!(id));
                    if let Some(name) = names.get(&id) {
                        map.insert("name".to_string(), json!(name));
                    }
                }
                Ok(v)
            })
            .collect::<TrustEscrowResult<Vec<Value>>>()?;
        let mut balances = serde_json::Map::new();
        for (name, address) in &self.actors {
            balances.insert(name.clone(), to_json(&self.chain.balance_of(address))?);
        }
        Ok(json!({
            "now": self.chain.now(),
            "agents": agents,
            "escrows": escrows,
            "balances": balances,
            "total_locked": to_json(&self.chain.total_locked())?,
            "events": to_json(&self.chain.events())?,
            "event_head": self.chain.verify_events()?.to_hex(),
        }))
    }
}

pub fn run(scenario: &Scenario) -> TrustEscrowResult<ScenarioReport> {
    let mut runner = ScenarioRunner::new(&scenario.config)?;
    for (name, amount) in &scenario.funds {
        let address = runner.actor(name);
        runner.chain.fund(address, *amount)?;
    }
    let steps: Vec<StepOutcome> = scenario
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| runner.run_step(i, step))
        .collect();
    let passed = steps.iter().all(|s| s.passed);
    tracing::info!(steps = steps.len(), passed, "scenario finished");
    Ok(ScenarioReport {
        passed,
        steps,
        audit: runner.audit()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_parse_with_default_expectation() {
        let step: Step = serde_json::from_value(json!({
            "op": "claim",
            "caller": "alice",
            "escrow": "e1",
            "data": {"text": "Hello, World!"}
        }))
        .unwrap();
        assert_eq!(step.expect, "ok");
        assert_eq!(step.op.name(), "claim");
    }

    #[test]
    fn unknown_names_surface_as_invalid_argument() {
        let scenario: Scenario = serde_json::from_value(json!({
            "steps": [
                {"op": "reclaim", "caller": "charlie", "escrow": "missing", "expect": "invalid_argument"},
                {"op": "mediate", "caller": "bob", "validator": "nobody", "data": {"text": "x"}, "decision": "accepted", "expect": "invalid_argument"}
            ]
        }))
        .unwrap();
        let report = run(&scenario).unwrap();
        assert!(report.passed, "{:?}", report.steps);
    }

    #[test]
    fn actor_addresses_are_stable() {
        let mut runner = ScenarioRunner::new(&ChainConfig::default()).unwrap();
        let a = runner.actor("alice");
        assert_eq!(a, runner.actor("alice"));
        assert_eq!(a, derive_address("actor", b"alice"));
        assert_ne!(a, runner.actor("bob"));
    }
}
