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

//! Escrow settlement engine.
//!
//! The engine holds locked value in its custody account and releases it at
//! most once per escrow: to the registered server agent when a linked
//! validation meets the escrow's threshold, or back to the escrower after
//! expiration. It never interprets demands; it forwards them to the validator
//! agent named on the escrow, resolved to its current address at call time.

use crate::artifacts::ArtifactStore;
use crate::bank::ValueTransfer;
use crate::demand::Demand;
use crate::directory::AgentDirectory;
use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::events::{EscrowEvent, EventLog};
use crate::journal::{Journal, Transactional};
use crate::types::{Address, AgentId, Amount, DataHash, EscrowId, Score, Timestamp};
use crate::validation::ValidationLedger;
use crate::validator::{EvaluationContext, ValidatorSet};
use serde::{Deserialize, Serialize};

/// Stored escrow record. The all-zero value is the "absent" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub escrower: Address,
    pub validator_agent_id: AgentId,
    pub server_agent_id: AgentId,
    pub amount: Amount,
    pub expiration_time: Timestamp,
    pub min_validation: u8,
    /// Terminal flag shared by claim and reclaim.
    pub claimed: bool,
    pub demand: Demand,
}

impl Escrow {
    pub fn exists(&self) -> bool {
        self.amount != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositParams {
    pub validator_agent_id: AgentId,
    pub server_agent_id: AgentId,
    pub amount: Amount,
    pub expiration_time: Timestamp,
    pub min_validation: u8,
    #[serde(default)]
    pub demand: Demand,
}

/// Transaction sender and block time of the current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

/// Everything outside the engine that a settlement call touches.
pub struct EngineHost<'a> {
    pub directory: &'a dyn AgentDirectory,
    pub ledger: &'a mut dyn ValidationLedger,
    pub validators: &'a ValidatorSet,
    pub artifacts: &'a ArtifactStore,
    pub bank: &'a mut dyn ValueTransfer,
    pub events: &'a mut EventLog,
}

impl EngineHost<'_> {
    /// Current address of the escrow's validator agent, if a component is
    /// deployed there.
    fn deployed_validator(&self, escrow: &Escrow) -> Option<Address> {
        self.directory
            .get_agent(escrow.validator_agent_id)
            .map(|agent| agent.address)
            .filter(|address| self.validators.contains(address))
    }

    fn publish(
        &mut self,
        now: Timestamp,
        validator: &Address,
        data_hash: DataHash,
        demand: &Demand,
    ) -> TrustEscrowResult<Score> {
        let ctx = EvaluationContext {
            now,
            artifacts: self.artifacts,
        };
        self.validators.validate(
            validator,
            &ctx,
            self.directory,
            &mut *self.ledger,
            &mut *self.events,
            data_hash,
            demand,
        )
    }
}

fn rejected(op: &'static str, escrow_id: EscrowId, err: TrustEscrowError) -> TrustEscrowError {
    tracing::debug!(op, escrow_id = escrow_id.0, kind = err.kind(), reason = %err, "precondition failed");
    err
}

fn invalid_validation(reason: impl Into<String>) -> TrustEscrowError {
    TrustEscrowError::InvalidValidation(reason.into())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowEngine {
    escrows: Vec<Escrow>,
    custody: Address,
    #[serde(skip)]
    journal: Journal<EngineUndo>,
}

#[derive(Debug, Clone, Copy)]
enum EngineUndo {
    Deposited,
    Settled(EscrowId),
}

impl EscrowEngine {
    pub fn new(custody: Address) -> Self {
        Self {
            escrows: Vec::new(),
            custody,
            journal: Journal::default(),
        }
    }

    /// Account holding every unsettled escrow's value.
    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn escrow_count(&self) -> u64 {
        self.escrows.len() as u64
    }

    pub fn escrow(&self, escrow_id: EscrowId) -> Option<&Escrow> {
        usize::try_from(escrow_id.0)
            .ok()
            .and_then(|i| self.escrows.get(i))
    }

    /// Pure read; absent ids yield the zero-valued sentinel.
    pub fn get_escrow(&self, escrow_id: EscrowId) -> Escrow {
        self.escrow(escrow_id).cloned().unwrap_or_default()
    }

    pub fn escrows(&self) -> impl Iterator<Item = (EscrowId, &Escrow)> {
        self.escrows
            .iter()
            .enumerate()
            .map(|(i, e)| (EscrowId(i as u64), e))
    }

    pub fn total_locked(&self) -> Amount {
        self.escrows
            .iter()
            .filter(|e| !e.claimed)
            .fold(0, |acc: Amount, e| acc.saturating_add(e.amount))
    }

    fn live_escrow(&self, op: &'static str, escrow_id: EscrowId) -> TrustEscrowResult<Escrow> {
        match self.escrow(escrow_id) {
            Some(e) if e.exists() => Ok(e.clone()),
            _ => Err(rejected(op, escrow_id, TrustEscrowError::InvalidEscrow)),
        }
    }

    fn settle(&mut self, escrow_id: EscrowId) -> TrustEscrowResult<()> {
        let slot = usize::try_from(escrow_id.0)
            .ok()
            .and_then(|i| self.escrows.get_mut(i))
            .ok_or(TrustEscrowError::InvalidEscrow)?;
        slot.claimed = true;
        self.journal.record(EngineUndo::Settled(escrow_id));
        Ok(())
    }

    pub fn deposit_escrow(
        &mut self,
        host: &mut EngineHost<'_>,
        ctx: CallContext,
        params: &DepositParams,
        attached_value: Amount,
    ) -> TrustEscrowResult<EscrowId> {
        let next = EscrowId(self.escrow_count());
        for agent_id in [params.validator_agent_id, params.server_agent_id] {
            if !host.directory.agent_exists(agent_id) {
                return Err(rejected("deposit", next, TrustEscrowError::AgentNotFound(agent_id)));
            }
        }
        if params.amount == 0 {
            return Err(rejected(
                "deposit",
                next,
                TrustEscrowError::InvalidEscrowParameters("amount must be nonzero".to_string()),
            ));
        }
        if params.expiration_time <= ctx.now {
            return Err(rejected(
                "deposit",
                next,
                TrustEscrowError::InvalidEscrowParameters(format!(
                    "expiration {} is not after {}",
                    params.expiration_time, ctx.now
                )),
            ));
        }
        if params.min_validation > Score::MAX_VALUE {
            return Err(rejected(
                "deposit",
                next,
                TrustEscrowError::InvalidEscrowParameters(format!(
                    "threshold {} outside 0..=100",
                    params.min_validation
                )),
            ));
        }
        if attached_value != params.amount {
            return Err(rejected(
                "deposit",
                next,
                TrustEscrowError::TransferFailed(format!(
                    "attached {attached_value}, declared {}",
                    params.amount
                )),
            ));
        }
        host.bank.transfer(ctx.caller, self.custody, params.amount)?;

        self.escrows.push(Escrow {
            escrower: ctx.caller,
            validator_agent_id: params.validator_agent_id,
            server_agent_id: params.server_agent_id,
            amount: params.amount,
            expiration_time: params.expiration_time,
            min_validation: params.min_validation,
            claimed: false,
            demand: params.demand.clone(),
        });
        self.journal.record(EngineUndo::Deposited);
        host.events.emit(
            ctx.now,
            EscrowEvent::Deposited {
                escrow_id: next,
                escrower: ctx.caller,
                amount: params.amount,
            },
        )?;
        tracing::info!(
            escrow_id = next.0,
            escrower = %ctx.caller,
            amount = %params.amount,
            expiration_time = params.expiration_time,
            min_validation = params.min_validation,
            "escrow deposited"
        );
        Ok(next)
    }

    /// Forwards the escrow's demand to its validator and publishes the score.
    pub fn validate_escrow(
        &self,
        host: &mut EngineHost<'_>,
        ctx: CallContext,
        escrow_id: EscrowId,
        data_hash: DataHash,
    ) -> TrustEscrowResult<Score> {
        let escrow = self.live_escrow("validate", escrow_id)?;
        match host.ledger.get_validation_request(&data_hash) {
            Some(req) if req.binds(escrow.validator_agent_id, escrow.server_agent_id) => {}
            _ => {
                return Err(rejected(
                    "validate",
                    escrow_id,
                    invalid_validation(format!("no linked validation request for {data_hash}")),
                ))
            }
        }
        let Some(validator) = host.deployed_validator(&escrow) else {
            let address = host
                .directory
                .get_agent(escrow.validator_agent_id)
                .map(|agent| agent.address)
                .unwrap_or(Address::ZERO);
            return Err(rejected(
                "validate",
                escrow_id,
                TrustEscrowError::ValidatorNotDeployed(address),
            ));
        };
        host.publish(ctx.now, &validator, data_hash, &escrow.demand)
    }

    /// Releases the escrow to the registered server agent.
    ///
    /// When the ledger has no response for `data_hash` yet and a validator
    /// component is deployed at the validator agent's current address, the
    /// stored demand is evaluated and published within this call. A score a
    /// component published against any other demand never settles the escrow.
    pub fn claim_escrow(
        &mut self,
        host: &mut EngineHost<'_>,
        ctx: CallContext,
        escrow_id: EscrowId,
        data_hash: DataHash,
    ) -> TrustEscrowResult<Amount> {
        let escrow = self.live_escrow("claim", escrow_id)?;
        if ctx.now > escrow.expiration_time || escrow.claimed {
            return Err(rejected("claim", escrow_id, TrustEscrowError::InvalidEscrow));
        }
        let authorized = host
            .directory
            .get_agent(escrow.server_agent_id)
            .is_some_and(|server| server.address == ctx.caller);
        if !authorized {
            return Err(rejected("claim", escrow_id, TrustEscrowError::UnauthorizedClaim));
        }
        match host.ledger.get_validation_request(&data_hash) {
            Some(req) if req.binds(escrow.validator_agent_id, escrow.server_agent_id) => {}
            Some(_) => {
                return Err(rejected(
                    "claim",
                    escrow_id,
                    invalid_validation("validation request bound to another agent pair"),
                ))
            }
            None => {
                return Err(rejected(
                    "claim",
                    escrow_id,
                    invalid_validation(format!("no validation request for {data_hash}")),
                ))
            }
        }

        let component = host.deployed_validator(&escrow);
        let existing = host
            .ledger
            .get_validation_response(&data_hash)
            .map(|r| (r.score, r.demand_digest));
        let score = match (existing, component) {
            (Some((score, Some(digest))), _) if digest == escrow.demand.digest() => score,
            (Some((score, None)), None) => score,
            (Some(_), _) => {
                return Err(rejected(
                    "claim",
                    escrow_id,
                    invalid_validation(format!(
                        "score for {data_hash} was not computed against this escrow's demand"
                    )),
                ))
            }
            (None, Some(validator)) => host
                .publish(ctx.now, &validator, data_hash, &escrow.demand)
                .map_err(|e| match e {
                    TrustEscrowError::AwaitingMediation => e,
                    other => invalid_validation(other.to_string()),
                })
                .map_err(|e| rejected("claim", escrow_id, e))?,
            (None, None) => {
                return Err(rejected(
                    "claim",
                    escrow_id,
                    invalid_validation(format!("no validation response for {data_hash}")),
                ))
            }
        };
        if !score.meets(escrow.min_validation) {
            return Err(rejected(
                "claim",
                escrow_id,
                invalid_validation(format!(
                    "score {} below threshold {}",
                    score.value(),
                    escrow.min_validation
                )),
            ));
        }

        // settled before value moves; a failed transfer rolls the flag back with the call
        self.settle(escrow_id)?;
        host.bank.transfer(self.custody, ctx.caller, escrow.amount)?;
        host.events.emit(
            ctx.now,
            EscrowEvent::Claimed {
                escrow_id,
                claimant: ctx.caller,
                amount: escrow.amount,
            },
        )?;
        tracing::info!(
            escrow_id = escrow_id.0,
            claimant = %ctx.caller,
            amount = %escrow.amount,
            score = score.value(),
            data_hash = %data_hash,
            "escrow claimed"
        );
        Ok(escrow.amount)
    }

    /// Returns the value of an expired, unsettled escrow to its escrower.
    pub fn reclaim_expired(
        &mut self,
        host: &mut EngineHost<'_>,
        ctx: CallContext,
        escrow_id: EscrowId,
    ) -> TrustEscrowResult<Amount> {
        let escrow = self.live_escrow("reclaim", escrow_id)?;
        if escrow.claimed {
            return Err(rejected("reclaim", escrow_id, TrustEscrowError::InvalidEscrow));
        }
        if ctx.caller != escrow.escrower || ctx.now <= escrow.expiration_time {
            return Err(rejected("reclaim", escrow_id, TrustEscrowError::UnauthorizedClaim));
        }

        self.settle(escrow_id)?;
        host.bank.transfer(self.custody, escrow.escrower, escrow.amount)?;
        host.events.emit(
            ctx.now,
            EscrowEvent::Reclaimed {
                escrow_id,
                escrower: escrow.escrower,
                amount: escrow.amount,
            },
        )?;
        tracing::info!(
            escrow_id = escrow_id.0,
            escrower = %escrow.escrower,
            amount = %escrow.amount,
            "escrow reclaimed"
        );
        Ok(escrow.amount)
    }
}

impl Transactional for EscrowEngine {
    fn commit(&mut self) {
        self.journal.clear();
    }

    fn rollback(&mut self) {
        for undo in self.journal.unwind() {
            match undo {
                EngineUndo::Deposited => {
                    self.escrows.pop();
                }
                EngineUndo::Settled(escrow_id) => {
                    if let Some(slot) = usize::try_from(escrow_id.0)
                        .ok()
                        .and_then(|i| self.escrows.get_mut(i))
                    {
                        slot.claimed = false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Bank;
    use crate::digest::data_hash;
    use crate::directory::AgentRegistry;
    use crate::validation::ValidationRegistry;
    use crate::validator::DeterministicCheckValidator;

    const ESCROWER: Address = Address([1; 20]);
    const SERVER: Address = Address([2; 20]);
    const CUSTODY: Address = Address([0xee; 20]);

    struct Fixture {
        directory: AgentRegistry,
        ledger: ValidationRegistry,
        validators: ValidatorSet,
        artifacts: ArtifactStore,
        bank: Bank,
        events: EventLog,
        engine: EscrowEngine,
        validator_agent: AgentId,
        server_agent: AgentId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut validators = ValidatorSet::empty();
            let validator = validators.deploy(Box::new(DeterministicCheckValidator::new()));
            let mut directory = AgentRegistry::new();
            let server_agent = directory.register_agent(SERVER, "server.test", SERVER).unwrap();
            let validator_agent = directory
                .register_agent(validator, "validator.test", validator)
                .unwrap();
            let mut bank = Bank::new();
            bank.mint(ESCROWER, 10).unwrap();
            Self {
                directory,
                ledger: ValidationRegistry::new(),
                validators,
                artifacts: ArtifactStore::new(),
                bank,
                events: EventLog::new(),
                engine: EscrowEngine::new(CUSTODY),
                validator_agent,
                server_agent,
            }
        }

        fn host(&mut self) -> (&mut EscrowEngine, EngineHost<'_>) {
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

        fn params(&self, amount: Amount, min_validation: u8) -> DepositParams {
            DepositParams {
                validator_agent_id: self.validator_agent,
                server_agent_id: self.server_agent,
                amount,
                expiration_time: 200,
                min_validation,
                demand: Demand::content(b"Hello, World!".to_vec()).unwrap(),
            }
        }
    }

    fn at(caller: Address, now: Timestamp) -> CallContext {
        CallContext { caller, now }
    }

    #[test]
    fn deposit_checks_parameters_in_order() {
        let mut fx = Fixture::new();
        let mut bad = fx.params(1, 50);
        bad.server_agent_id = AgentId(99);
        bad.amount = 0;
        let (engine, mut host) = fx.host();
        assert_eq!(
            engine.deposit_escrow(&mut host, at(ESCROWER, 100), &bad, 0),
            Err(TrustEscrowError::AgentNotFound(AgentId(99)))
        );

        let mut fx = Fixture::new();
        let mut p = fx.params(1, 50);
        p.expiration_time = 100;
        let (engine, mut host) = fx.host();
        assert!(matches!(
            engine.deposit_escrow(&mut host, at(ESCROWER, 100), &p, 1),
            Err(TrustEscrowError::InvalidEscrowParameters(_))
        ));
        p.expiration_time = 101;
        p.min_validation = 101;
        assert!(matches!(
            engine.deposit_escrow(&mut host, at(ESCROWER, 100), &p, 1),
            Err(TrustEscrowError::InvalidEscrowParameters(_))
        ));
        p.min_validation = 50;
        assert!(matches!(
            engine.deposit_escrow(&mut host, at(ESCROWER, 100), &p, 2),
            Err(TrustEscrowError::TransferFailed(_))
        ));
        assert_eq!(engine.deposit_escrow(&mut host, at(ESCROWER, 100), &p, 1), Ok(EscrowId(0)));
        assert_eq!(engine.total_locked(), 1);
    }

    #[test]
    fn claim_runs_the_escrow_validator_when_no_response_exists() {
        let mut fx = Fixture::new();
        let p = fx.params(3, 50);
        let good = data_hash(b"Hello, World!");
        let (engine, mut host) = fx.host();
        let id = engine.deposit_escrow(&mut host, at(ESCROWER, 100), &p, 3).unwrap();
        assert_eq!(engine.get_escrow(id).demand, p.demand);

        assert!(matches!(
            engine.claim_escrow(&mut host, at(SERVER, 110), id, good),
            Err(TrustEscrowError::InvalidValidation(_))
        ));
        host.ledger
            .validation_request(host.directory, SERVER, p.validator_agent_id, p.server_agent_id, good, 110)
            .unwrap();
        assert_eq!(
            engine.claim_escrow(&mut host, at(ESCROWER, 110), id, good),
            Err(TrustEscrowError::UnauthorizedClaim)
        );
        assert_eq!(engine.claim_escrow(&mut host, at(SERVER, 110), id, good), Ok(3));
        assert_eq!(host.bank.balance_of(&SERVER), 3);
        let published = host.ledger.get_validation_response(&good).unwrap();
        assert_eq!(published.score, Score::FULL);
        assert_eq!(published.demand_digest, Some(p.demand.digest()));
        assert_eq!(
            engine.claim_escrow(&mut host, at(SERVER, 111), id, good),
            Err(TrustEscrowError::InvalidEscrow)
        );
        assert_eq!(engine.total_locked(), 0);
    }

    #[test]
    fn reclaim_only_after_expiration_and_only_by_escrower() {
        let mut fx = Fixture::new();
        let p = fx.params(2, 0);
        let (engine, mut host) = fx.host();
        let id = engine.deposit_escrow(&mut host, at(ESCROWER, 100), &p, 2).unwrap();
        assert_eq!(
            engine.reclaim_expired(&mut host, at(ESCROWER, 200), id),
            Err(TrustEscrowError::UnauthorizedClaim)
        );
        assert_eq!(
            engine.reclaim_expired(&mut host, at(SERVER, 201), id),
            Err(TrustEscrowError::UnauthorizedClaim)
        );
        assert_eq!(engine.reclaim_expired(&mut host, at(ESCROWER, 201), id), Ok(2));
        assert_eq!(
            engine.reclaim_expired(&mut host, at(ESCROWER, 202), id),
            Err(TrustEscrowError::InvalidEscrow)
        );
        assert_eq!(host.bank.balance_of(&ESCROWER), 10);
    }

    #[test]
    fn rollback_reopens_settled_escrows_and_drops_new_ones() {
        let mut fx = Fixture::new();
        let p = fx.params(2, 0);
        let (engine, mut host) = fx.host();
        let first = engine.deposit_escrow(&mut host, at(ESCROWER, 100), &p, 2).unwrap();
        engine.commit();
        engine.reclaim_expired(&mut host, at(ESCROWER, 201), first).unwrap();
        engine.deposit_escrow(&mut host, at(ESCROWER, 150), &p, 2).unwrap();
        engine.rollback();
        assert_eq!(engine.escrow_count(), 1);
        assert!(!engine.get_escrow(first).claimed);
        assert_eq!(engine.total_locked(), 2);
    }

    #[test]
    fn absent_escrow_reads_as_sentinel() {
        let fx = Fixture::new();
        assert_eq!(fx.engine.get_escrow(EscrowId(5)), Escrow::default());
        assert!(!fx.engine.get_escrow(EscrowId(5)).exists());
    }
}
