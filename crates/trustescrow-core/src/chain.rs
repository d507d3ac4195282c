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

//! In-process execution substrate.
//!
//! [`Chain`] owns every piece of protocol state and runs each entry point as
//! one atomic unit. Every component journals its changes; a failed call
//! unwinds those journals, so it changes no balance, ledger entry, escrow flag
//! or event.

use crate::artifacts::ArtifactStore;
use crate::bank::{Bank, ValueTransfer};
use crate::clock::BlockClock;
use crate::demand::Demand;
use crate::digest::derive_address;
use crate::directory::{AgentDirectory, AgentInfo, AgentRegistry};
use crate::engine::{CallContext, DepositParams, EngineHost, Escrow, EscrowEngine};
use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::events::{self, EscrowEvent, EventLog, EventRecord};
use crate::journal::Transactional;
use crate::types::{Address, AgentId, Amount, DataHash, EscrowId, EventHash, Score, Timestamp};
use crate::validation::{ValidationLedger, ValidationRegistry, ValidationRequest, ValidationResponse};
use crate::validator::{EvaluationContext, MediationDecision, Validator, ValidatorSet};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ChainState {
    pub clock: BlockClock,
    pub bank: Bank,
    pub directory: AgentRegistry,
    pub ledger: ValidationRegistry,
    pub artifacts: ArtifactStore,
    pub validators: ValidatorSet,
    pub engine: EscrowEngine,
    pub events: EventLog,
}

impl ChainState {
    pub fn new(genesis_time: Timestamp) -> Self {
        Self {
            clock: BlockClock::new(genesis_time),
            bank: Bank::new(),
            directory: AgentRegistry::new(),
            ledger: ValidationRegistry::new(),
            artifacts: ArtifactStore::new(),
            validators: ValidatorSet::empty(),
            engine: EscrowEngine::new(derive_address("engine", b"custody")),
            events: EventLog::new(),
        }
    }

    fn split(&mut self) -> (&mut EscrowEngine, EngineHost<'_>) {
        (
            &mut self.engine,
            EngineHost {
                directory: &self.directory,
                ledger: &mut self.ledger,
                validators: &self.validators,
                artifacts: &self.artifacts,
                bank: &mut self.bank,
                events: &mut self.events,
            },
        )
    }
}

impl Transactional for ChainState {
    fn commit(&mut self) {
        self.bank.commit();
        self.directory.commit();
        self.ledger.commit();
        self.validators.commit();
        self.engine.commit();
        self.events.commit();
    }

    fn rollback(&mut self) {
        self.bank.rollback();
        self.directory.rollback();
        self.ledger.rollback();
        self.validators.rollback();
        self.engine.rollback();
        self.events.rollback();
    }
}

#[derive(Debug, Clone)]
pub struct Chain {
    state: ChainState,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Chain {
    pub fn new(genesis_time: Timestamp) -> Self {
        Self {
            state: ChainState::new(genesis_time),
        }
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    fn transact<T>(
        &mut self,
        op: &'static str,
        caller: Address,
        f: impl FnOnce(&mut ChainState, CallContext) -> TrustEscrowResult<T>,
    ) -> TrustEscrowResult<T> {
        let ctx = CallContext {
            caller,
            now: self.state.clock.now(),
        };
        match f(&mut self.state, ctx) {
            Ok(v) => {
                self.state.commit();
                Ok(v)
            }
            Err(err) => {
                self.state.rollback();
                tracing::warn!(
                    op,
                    caller = %caller,
                    now = ctx.now,
                    kind = err.kind(),
                    error = %err,
                    "call rolled back"
                );
                Err(err)
            }
        }
    }

    // clock

    pub fn now(&self) -> Timestamp {
        self.state.clock.now()
    }

    pub fn advance_time(&mut self, secs: u64) -> Timestamp {
        self.state.clock.advance(secs)
    }

    pub fn set_time(&mut self, ts: Timestamp) -> TrustEscrowResult<Timestamp> {
        self.state.clock.set(ts)
    }

    // value

    pub fn fund(&mut self, address: Address, amount: Amount) -> TrustEscrowResult<Amount> {
        self.transact("fund", address, |s, _| s.bank.mint(address, amount))
    }

    pub fn set_refuses_value(&mut self, address: Address, refuses: bool) {
        self.state.bank.set_refuses_value(address, refuses);
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.state.bank.balance_of(address)
    }

    // identity

    pub fn register_agent(
        &mut self,
        caller: Address,
        domain: &str,
        address: Address,
    ) -> TrustEscrowResult<AgentId> {
        self.transact("register_agent", caller, |s, ctx| {
            let agent_id = s.directory.register_agent(ctx.caller, domain, address)?;
            let info = s
                .directory
                .get_agent(agent_id)
                .cloned()
                .ok_or(TrustEscrowError::AgentNotFound(agent_id))?;
            s.events.emit(
                ctx.now,
                EscrowEvent::AgentRegistered {
                    agent_id,
                    domain: info.domain,
                    address,
                },
            )?;
            tracing::info!(agent_id = agent_id.0, address = %address, "agent registered");
            Ok(agent_id)
        })
    }

    pub fn update_agent(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        new_domain: Option<&str>,
        new_address: Option<Address>,
    ) -> TrustEscrowResult<AgentInfo> {
        self.transact("update_agent", caller, |s, ctx| {
            let info = s
                .directory
                .update_agent(ctx.caller, agent_id, new_domain, new_address)?;
            s.events.emit(
                ctx.now,
                EscrowEvent::AgentUpdated {
                    agent_id,
                    domain: info.domain.clone(),
                    address: info.address,
                },
            )?;
            tracing::info!(agent_id = agent_id.0, address = %info.address, "agent updated");
            Ok(info)
        })
    }

    pub fn agent(&self, agent_id: AgentId) -> Option<&AgentInfo> {
        self.state.directory.get_agent(agent_id)
    }

    pub fn resolve_by_domain(&self, domain: &str) -> Option<&AgentInfo> {
        self.state.directory.resolve_by_domain(domain)
    }

    pub fn resolve_by_address(&self, address: &Address) -> Option<&AgentInfo> {
        self.state.directory.resolve_by_address(address)
    }

    // validation ledger

    pub fn request_validation(
        &mut self,
        caller: Address,
        validator_agent_id: AgentId,
        server_agent_id: AgentId,
        data_hash: DataHash,
    ) -> TrustEscrowResult<()> {
        self.transact("request_validation", caller, |s, ctx| {
            s.ledger.validation_request(
                &s.directory,
                ctx.caller,
                validator_agent_id,
                server_agent_id,
                data_hash,
                ctx.now,
            )?;
            s.events.emit(
                ctx.now,
                EscrowEvent::ValidationRequested {
                    data_hash,
                    validator_agent_id,
                    server_agent_id,
                },
            )?;
            tracing::debug!(data_hash = %data_hash, validator = validator_agent_id.0, server = server_agent_id.0, "validation requested");
            Ok(())
        })
    }

    /// A validator agent publishing a score it computed elsewhere.
    pub fn submit_validation_response(
        &mut self,
        caller: Address,
        data_hash: DataHash,
        score: u8,
    ) -> TrustEscrowResult<()> {
        self.transact("submit_validation_response", caller, |s, ctx| {
            let score = Score::new(score)?;
            s.ledger
                .validation_response(&s.directory, ctx.caller, data_hash, score, None, ctx.now)?;
            s.events.emit(
                ctx.now,
                EscrowEvent::ValidationResponded {
                    data_hash,
                    score,
                    publisher: ctx.caller,
                    demand_digest: None,
                },
            )?;
            Ok(())
        })
    }

    pub fn get_validation_request(&self, data_hash: &DataHash) -> ValidationRequest {
        self.state
            .ledger
            .get_validation_request(data_hash)
            .copied()
            .unwrap_or_default()
    }

    pub fn get_validation_response(&self, data_hash: &DataHash) -> Option<ValidationResponse> {
        self.state.ledger.get_validation_response(data_hash).copied()
    }

    // validators and artifacts

    pub fn deploy_validator(&mut self, validator: Box<dyn Validator>) -> Address {
        let kind = validator.kind();
        let address = self.state.validators.deploy(validator);
        tracing::info!(validator = %address, ?kind, "validator deployed");
        address
    }

    pub fn publish_artifact(&mut self, bytes: Vec<u8>) -> DataHash {
        self.state.artifacts.put(bytes)
    }

    pub fn publish_json_artifact(&mut self, value: &Value) -> TrustEscrowResult<DataHash> {
        self.state.artifacts.put_json(value)
    }

    /// Runs the validator at `validator` directly and publishes its score.
    pub fn validate(
        &mut self,
        caller: Address,
        validator: Address,
        data_hash: DataHash,
        demand: &Demand,
    ) -> TrustEscrowResult<Score> {
        self.transact("validate", caller, |s, ctx| {
            let eval = EvaluationContext {
                now: ctx.now,
                artifacts: &s.artifacts,
            };
            s.validators.validate(
                &validator,
                &eval,
                &s.directory,
                &mut s.ledger,
                &mut s.events,
                data_hash,
                demand,
            )
        })
    }

    /// Records `decision` under the caller's own address as mediator.
    pub fn mediate(
        &mut self,
        caller: Address,
        validator: Address,
        data_hash: DataHash,
        decision: MediationDecision,
    ) -> TrustEscrowResult<()> {
        self.transact("mediate", caller, |s, ctx| {
            s.validators
                .record_mediation(&validator, ctx.caller, data_hash, decision)?;
            s.events.emit(
                ctx.now,
                EscrowEvent::MediationRecorded {
                    data_hash,
                    mediator: ctx.caller,
                    decision,
                },
            )?;
            tracing::info!(mediator = %ctx.caller, data_hash = %data_hash, ?decision, "mediation recorded");
            Ok(())
        })
    }

    /// Notifies the demand's mediator that a decision window is open. No state changes.
    pub fn request_mediation(
        &mut self,
        caller: Address,
        validator: Address,
        data_hash: DataHash,
        demand: &Demand,
    ) -> TrustEscrowResult<()> {
        self.transact("request_mediation", caller, |s, ctx| {
            if s.validators.get(&validator).and_then(|v| v.mediation_book()).is_none() {
                return Err(TrustEscrowError::ValidatorNotDeployed(validator));
            }
            let terms = demand.decode_mediation()?;
            s.events.emit(
                ctx.now,
                EscrowEvent::MediationRequested {
                    data_hash,
                    mediator: terms.mediator,
                    deadline: terms.deadline,
                },
            )?;
            Ok(())
        })
    }

    // escrow

    pub fn deposit_escrow(
        &mut self,
        caller: Address,
        params: &DepositParams,
        attached_value: Amount,
    ) -> TrustEscrowResult<EscrowId> {
        self.transact("deposit_escrow", caller, |s, ctx| {
            let (engine, mut host) = s.split();
            engine.deposit_escrow(&mut host, ctx, params, attached_value)
        })
    }

    pub fn validate_escrow(
        &mut self,
        caller: Address,
        escrow_id: EscrowId,
        data_hash: DataHash,
    ) -> TrustEscrowResult<Score> {
        self.transact("validate_escrow", caller, |s, ctx| {
            let (engine, mut host) = s.split();
            engine.validate_escrow(&mut host, ctx, escrow_id, data_hash)
        })
    }

    pub fn claim_escrow(
        &mut self,
        caller: Address,
        escrow_id: EscrowId,
        data_hash: DataHash,
    ) -> TrustEscrowResult<Amount> {
        self.transact("claim_escrow", caller, |s, ctx| {
            let (engine, mut host) = s.split();
            engine.claim_escrow(&mut host, ctx, escrow_id, data_hash)
        })
    }

    pub fn reclaim_expired(
        &mut self,
        caller: Address,
        escrow_id: EscrowId,
    ) -> TrustEscrowResult<Amount> {
        self.transact("reclaim_expired", caller, |s, ctx| {
            let (engine, mut host) = s.split();
            engine.reclaim_expired(&mut host, ctx, escrow_id)
        })
    }

    pub fn get_escrow(&self, escrow_id: EscrowId) -> Escrow {
        self.state.engine.get_escrow(escrow_id)
    }

    pub fn escrow_count(&self) -> u64 {
        self.state.engine.escrow_count()
    }

    pub fn total_locked(&self) -> Amount {
        self.state.engine.total_locked()
    }

    pub fn custody(&self) -> Address {
        self.state.engine.custody()
    }

    // audit

    pub fn events(&self) -> &[EventRecord] {
        self.state.events.records()
    }

    pub fn event_head(&self) -> EventHash {
        self.state.events.head()
    }

    /// Re-derives every link of the event log and returns its head.
    pub fn verify_events(&self) -> TrustEscrowResult<EventHash> {
        events::verify_chain(self.state.events.records())
    }
}

/// A [`Chain`] shared between threads; calls are linearized by the lock.
#[derive(Debug, Clone, Default)]
pub struct SharedChain {
    inner: Arc<Mutex<Chain>>,
}

impl SharedChain {
    pub fn new(chain: Chain) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chain)),
        }
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut Chain) -> T) -> T {
        let mut chain = self.inner.lock();
        f(&mut chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::data_hash;
    use crate::validator::DeterministicCheckValidator;

    const ESCROWER: Address = Address([1; 20]);
    const SERVER: Address = Address([2; 20]);

    fn setup() -> (Chain, AgentId, AgentId) {
        let mut chain = Chain::new(1_000);
        let v = chain.deploy_validator(Box::new(DeterministicCheckValidator::new()));
        let server = chain.register_agent(SERVER, "server.test", SERVER).unwrap();
        let validator = chain.register_agent(v, "validator.test", v).unwrap();
        chain.fund(ESCROWER, 5).unwrap();
        (chain, validator, server)
    }

    #[test]
    fn failed_payout_rolls_back_everything() {
        let (mut chain, validator, server) = setup();
        let params = DepositParams {
            validator_agent_id: validator,
            server_agent_id: server,
            amount: 5,
            expiration_time: 2_000,
            min_validation: 50,
            demand: Demand::content(b"x".to_vec()).unwrap(),
        };
        let id = chain.deposit_escrow(ESCROWER, &params, 5).unwrap();
        let h = data_hash(b"x");
        chain.request_validation(SERVER, validator, server, h).unwrap();
        let events_before = chain.events().len();

        chain.set_refuses_value(SERVER, true);
        assert!(matches!(
            chain.claim_escrow(SERVER, id, h),
            Err(TrustEscrowError::TransferFailed(_))
        ));
        assert!(!chain.get_escrow(id).claimed);
        assert!(chain.get_validation_response(&h).is_none());
        assert_eq!(chain.events().len(), events_before);
        assert_eq!(chain.total_locked(), 5);
        assert_eq!(chain.balance_of(&chain.custody()), 5);

        chain.set_refuses_value(SERVER, false);
        assert_eq!(chain.claim_escrow(SERVER, id, h), Ok(5));
        assert_eq!(chain.balance_of(&SERVER), 5);
        assert_eq!(chain.total_locked(), 0);
    }

    #[test]
    fn rejected_deposit_leaves_no_trace() {
        let (mut chain, validator, server) = setup();
        let head = chain.event_head();
        let params = DepositParams {
            validator_agent_id: validator,
            server_agent_id: server,
            amount: 6,
            expiration_time: 2_000,
            min_validation: 0,
            demand: Demand::default(),
        };
        assert!(matches!(
            chain.deposit_escrow(ESCROWER, &params, 6),
            Err(TrustEscrowError::TransferFailed(_))
        ));
        assert_eq!(chain.escrow_count(), 0);
        assert_eq!(chain.event_head(), head);
        assert_eq!(chain.verify_events(), Ok(head));
        assert_eq!(chain.balance_of(&ESCROWER), 5);
    }

    #[test]
    fn rollback_spans_every_component_touched() {
        let (mut chain, validator, server) = setup();
        let head = chain.event_head();
        let params = DepositParams {
            validator_agent_id: validator,
            server_agent_id: server,
            amount: 5,
            expiration_time: 2_000,
            min_validation: 0,
            demand: Demand::default(),
        };
        let h = data_hash(b"dropped");
        let result: TrustEscrowResult<()> = chain.transact("test", ESCROWER, |s, ctx| {
            s.bank.mint(ESCROWER, 7)?;
            s.directory.register_agent(Address([7; 20]), "late.test", Address([7; 20]))?;
            s.ledger
                .validation_request(&s.directory, SERVER, validator, server, h, ctx.now)?;
            let (engine, mut host) = s.split();
            engine.deposit_escrow(&mut host, ctx, &params, 5)?;
            Err(TrustEscrowError::InvalidArgument("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(chain.balance_of(&ESCROWER), 5);
        assert_eq!(chain.state().bank.total_supply(), 5);
        assert!(chain.resolve_by_domain("late.test").is_none());
        assert!(chain.get_validation_response(&h).is_none());
        assert!(chain.state().ledger.get_validation_request(&h).is_none());
        assert_eq!(chain.escrow_count(), 0);
        assert_eq!(chain.total_locked(), 0);
        assert_eq!(chain.event_head(), head);
        assert_eq!(chain.verify_events(), Ok(head));

        let id = chain.deposit_escrow(ESCROWER, &params, 5).unwrap();
        assert_eq!(id, EscrowId(0));
        assert_eq!(chain.verify_events(), Ok(chain.event_head()));
    }

    #[test]
    fn shared_chain_linearizes_calls() {
        let shared = SharedChain::new(Chain::new(0));
        let handles: Vec<_> = (1..=4u8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.with(|c| c.fund(Address([i; 20]), 10)))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
        assert_eq!(shared.with(|c| c.state().bank.total_supply()), 40);
    }
}
