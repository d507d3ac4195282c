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

//! Audit trail.
//!
//! Every record commits to its predecessor's hash, so the head hash pins the
//! whole history and any edit, reorder or gap shows up in [`verify_chain`].

use crate::digest::sha256;
use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::journal::Transactional;
use crate::types::{Address, AgentId, Amount, DataHash, EscrowId, EventHash, Score, Timestamp};
use crate::validator::MediationDecision;
use serde::{Deserialize, Serialize};

const LINK_DOMAIN: &[u8] = b"trustescrow.event.v1\0";

/// Audit-trail events. None of them are needed for correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EscrowEvent {
    AgentRegistered {
        agent_id: AgentId,
        domain: String,
        address: Address,
    },
    AgentUpdated {
        agent_id: AgentId,
        domain: String,
        address: Address,
    },
    ValidationRequested {
        data_hash: DataHash,
        validator_agent_id: AgentId,
        server_agent_id: AgentId,
    },
    ValidationResponded {
        data_hash: DataHash,
        score: Score,
        publisher: Address,
        demand_digest: Option<DataHash>,
    },
    Deposited {
        escrow_id: EscrowId,
        escrower: Address,
        amount: Amount,
    },
    Claimed {
        escrow_id: EscrowId,
        claimant: Address,
        amount: Amount,
    },
    Reclaimed {
        escrow_id: EscrowId,
        escrower: Address,
        amount: Amount,
    },
    MediationRequested {
        data_hash: DataHash,
        mediator: Address,
        deadline: Timestamp,
    },
    MediationRecorded {
        data_hash: DataHash,
        mediator: Address,
        decision: MediationDecision,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub index: u64,
    pub block_time: Timestamp,
    /// Hash of the previous record; zero for the first one.
    pub prev_hash: EventHash,
    pub hash: EventHash,
    #[serde(flatten)]
    pub event: EscrowEvent,
}

#[derive(Serialize)]
struct LinkBody<'a> {
    index: u64,
    block_time: Timestamp,
    #[serde(flatten)]
    event: &'a EscrowEvent,
}

/// `sha256(domain || prev_hash || json(index, block_time, event))`
pub fn link_hash(
    prev_hash: &EventHash,
    index: u64,
    block_time: Timestamp,
    event: &EscrowEvent,
) -> TrustEscrowResult<EventHash> {
    let body = serde_json::to_vec(&LinkBody {
        index,
        block_time,
        event,
    })
    .map_err(|e| TrustEscrowError::InvalidArgument(format!("event encoding: {e}")))?;
    let mut buf = Vec::with_capacity(LINK_DOMAIN.len() + 32 + body.len());
    buf.extend_from_slice(LINK_DOMAIN);
    buf.extend_from_slice(prev_hash.as_bytes());
    buf.extend_from_slice(&body);
    Ok(EventHash(sha256(&buf)))
}

/// Recomputes every link and returns the head hash of `records`.
///
/// Fails with the index of the first record whose position, back-link or
/// hash does not match.
pub fn verify_chain(records: &[EventRecord]) -> TrustEscrowResult<EventHash> {
    let mut prev = EventHash::ZERO;
    for (position, record) in (0u64..).zip(records) {
        if record.index != position || record.prev_hash != prev {
            return Err(TrustEscrowError::EventLogBroken(position));
        }
        if link_hash(&prev, record.index, record.block_time, &record.event)? != record.hash {
            return Err(TrustEscrowError::EventLogBroken(position));
        }
        prev = record.hash;
    }
    Ok(prev)
}

/// Append-only, hash-chained event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    committed: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, block_time: Timestamp, event: EscrowEvent) -> TrustEscrowResult<u64> {
        let index = self.records.len() as u64;
        let prev_hash = self.head();
        let hash = link_hash(&prev_hash, index, block_time, &event)?;
        self.records.push(EventRecord {
            index,
            block_time,
            prev_hash,
            hash,
            event,
        });
        Ok(index)
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn get(&self, index: u64) -> Option<&EventRecord> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.records.get(i))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hash of the newest record; zero for an empty log.
    pub fn head(&self) -> EventHash {
        self.records
            .last()
            .map(|r| r.hash)
            .unwrap_or(EventHash::ZERO)
    }
}

impl Transactional for EventLog {
    fn commit(&mut self) {
        self.committed = self.records.len();
    }

    fn rollback(&mut self) {
        self.records.truncate(self.committed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(i: u64) -> EscrowEvent {
        EscrowEvent::Deposited {
            escrow_id: EscrowId(i),
            escrower: Address([1; 20]),
            amount: 1,
        }
    }

    fn log_of(n: u64) -> EventLog {
        let mut log = EventLog::new();
        for i in 0..n {
            log.emit(100 + i, deposit(i)).unwrap();
        }
        log
    }

    #[test]
    fn records_link_to_their_predecessor() {
        let log = log_of(4);
        assert_eq!(log.get(0).unwrap().prev_hash, EventHash::ZERO);
        for pair in log.records().windows(2) {
            assert_eq!(pair[1].prev_hash, pair[0].hash);
        }
        assert_eq!(verify_chain(log.records()), Ok(log.head()));
        assert_eq!(verify_chain(&[]), Ok(EventHash::ZERO));
    }

    #[test]
    fn tampering_is_located() {
        let log = log_of(5);

        let mut edited = log.records().to_vec();
        edited[2].block_time += 1;
        assert_eq!(verify_chain(&edited), Err(TrustEscrowError::EventLogBroken(2)));

        let mut dropped = log.records().to_vec();
        dropped.remove(1);
        assert_eq!(verify_chain(&dropped), Err(TrustEscrowError::EventLogBroken(1)));

        let mut swapped = log.records().to_vec();
        swapped.swap(3, 4);
        assert_eq!(verify_chain(&swapped), Err(TrustEscrowError::EventLogBroken(3)));
    }

    #[test]
    fn head_changes_with_each_append() {
        let mut log = EventLog::new();
        let empty = log.head();
        log.emit(1, deposit(0)).unwrap();
        let one = log.head();
        log.emit(1, deposit(0)).unwrap();
        assert_ne!(empty, one);
        assert_ne!(one, log.head());
    }

    #[test]
    fn rollback_truncates_to_the_last_commit() {
        let mut log = log_of(2);
        log.commit();
        let head = log.head();
        log.emit(9, deposit(7)).unwrap();
        log.emit(9, deposit(8)).unwrap();
        log.rollback();
        assert_eq!(log.len(), 2);
        assert_eq!(log.head(), head);
        log.emit(10, deposit(2)).unwrap();
        assert_eq!(verify_chain(log.records()), Ok(log.head()));
    }

    #[test]
    fn records_serialize_flat() {
        let log = log_of(1);
        let v = serde_json::to_value(&log.records()[0]).unwrap();
        assert_eq!(v["event"], "deposited");
        assert_eq!(v["escrow_id"], 0);
        assert_eq!(v["block_time"], 100);
        assert!(v["hash"].as_str().unwrap().starts_with("0x"));
    }
}
