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

use crate::error::{TrustEscrowError, TrustEscrowResult};
use crate::journal::{Journal, Transactional};
use crate::types::{Address, AgentId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_id: AgentId,
    pub domain: String,
    pub address: Address,
}

/// Read-only identity queries the settlement engine relies on.
pub trait AgentDirectory {
    fn agent_exists(&self, agent_id: AgentId) -> bool {
        self.get_agent(agent_id).is_some()
    }
    fn get_agent(&self, agent_id: AgentId) -> Option<&AgentInfo>;
    fn resolve_by_domain(&self, domain: &str) -> Option<&AgentInfo>;
    fn resolve_by_address(&self, address: &Address) -> Option<&AgentInfo>;
}

/// In-memory identity registry. Ids start at 1; domains and addresses are unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistry {
    agents: BTreeMap<AgentId, AgentInfo>,
    by_domain: BTreeMap<String, AgentId>,
    by_address: BTreeMap<Address, AgentId>,
    next_id: u64,
    #[serde(skip)]
    journal: Journal<DirectoryUndo>,
}

#[derive(Debug, Clone)]
enum DirectoryUndo {
    Registered(AgentId),
    /// Holds the record as it was before the update.
    Updated(AgentInfo),
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_domain(domain: &str) -> TrustEscrowResult<String> {
    let d = domain.trim();
    if d.is_empty() {
        return Err(TrustEscrowError::InvalidArgument(
            "agent domain must be non-empty".to_string(),
        ));
    }
    Ok(d.to_string())
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
            by_domain: BTreeMap::new(),
            by_address: BTreeMap::new(),
            next_id: 1,
            journal: Journal::default(),
        }
    }

    fn unindex(&mut self, agent_id: AgentId) -> Option<AgentInfo> {
        let info = self.agents.remove(&agent_id)?;
        self.by_domain.remove(&info.domain);
        self.by_address.remove(&info.address);
        Some(info)
    }

    fn index(&mut self, info: AgentInfo) {
        self.by_domain.insert(info.domain.clone(), info.agent_id);
        self.by_address.insert(info.address, info.agent_id);
        self.agents.insert(info.agent_id, info);
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentInfo> {
        self.agents.values()
    }

    /// Registers `address` under `domain`. Only the address itself may register.
    pub fn register_agent(
        &mut self,
        caller: Address,
        domain: &str,
        address: Address,
    ) -> TrustEscrowResult<AgentId> {
        if address.is_zero() {
            return Err(TrustEscrowError::InvalidArgument(
                "agent address must be non-zero".to_string(),
            ));
        }
        if caller != address {
            return Err(TrustEscrowError::InvalidArgument(
                "agents register their own address".to_string(),
            ));
        }
        let domain = normalize_domain(domain)?;
        if self.by_domain.contains_key(&domain) {
            return Err(TrustEscrowError::DomainAlreadyRegistered(domain));
        }
        if self.by_address.contains_key(&address) {
            return Err(TrustEscrowError::AddressAlreadyRegistered(address));
        }

        let agent_id = AgentId(self.next_id);
        self.next_id += 1;
        self.index(AgentInfo {
            agent_id,
            domain,
            address,
        });
        self.journal.record(DirectoryUndo::Registered(agent_id));
        Ok(agent_id)
    }

    /// Moves an agent to a new domain and/or address. Only the current address may do so.
    pub fn update_agent(
        &mut self,
        caller: Address,
        agent_id: AgentId,
        new_domain: Option<&str>,
        new_address: Option<Address>,
    ) -> TrustEscrowResult<AgentInfo> {
        let current = self
            .agents
            .get(&agent_id)
            .cloned()
            .ok_or(TrustEscrowError::AgentNotFound(agent_id))?;
        if current.address != caller {
            return Err(TrustEscrowError::UnauthorizedAgentUpdate(agent_id));
        }

        let domain = match new_domain {
            Some(d) => {
                let d = normalize_domain(d)?;
                if d != current.domain && self.by_domain.contains_key(&d) {
                    return Err(TrustEscrowError::DomainAlreadyRegistered(d));
                }
                d
            }
            None => current.domain.clone(),
        };
        let address = match new_address {
            Some(a) => {
                if a.is_zero() {
                    return Err(TrustEscrowError::InvalidArgument(
                        "agent address must be non-zero".to_string(),
                    ));
                }
                if a != current.address && self.by_address.contains_key(&a) {
                    return Err(TrustEscrowError::AddressAlreadyRegistered(a));
                }
                a
            }
            None => current.address,
        };

        self.unindex(agent_id);
        let updated = AgentInfo {
            agent_id,
            domain,
            address,
        };
        self.index(updated.clone());
        self.journal.record(DirectoryUndo::Updated(current));
        Ok(updated)
    }
}

impl Transactional for AgentRegistry {
    fn commit(&mut self) {
        self.journal.clear();
    }

    fn rollback(&mut self) {
        for undo in self.journal.unwind() {
            match undo {
                DirectoryUndo::Registered(agent_id) => {
                    self.unindex(agent_id);
                    self.next_id = agent_id.0;
                }
                DirectoryUndo::Updated(previous) => {
                    self.unindex(previous.agent_id);
                    self.index(previous);
                }
            }
        }
    }
}

impl AgentDirectory for AgentRegistry {
    fn get_agent(&self, agent_id: AgentId) -> Option<&AgentInfo> {
        self.agents.get(&agent_id)
    }

    fn resolve_by_domain(&self, domain: &str) -> Option<&AgentInfo> {
        self.by_domain
            .get(domain.trim())
            .and_then(|id| self.agents.get(id))
    }

    fn resolve_by_address(&self, address: &Address) -> Option<&AgentInfo> {
        self.by_address
            .get(address)
            .and_then(|id| self.agents.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut reg = AgentRegistry::new();
        let a = reg.register_agent(addr(1), "alice.example.com", addr(1)).unwrap();
        let b = reg.register_agent(addr(2), "bob.example.com", addr(2)).unwrap();
        assert_eq!(a, AgentId(1));
        assert_eq!(b, AgentId(2));
        assert!(reg.agent_exists(a));
        assert!(!reg.agent_exists(AgentId::NONE));
        assert_eq!(reg.agent_count(), 2);
    }

    #[test]
    fn resolution_by_domain_and_address() {
        let mut reg = AgentRegistry::new();
        let id = reg.register_agent(addr(1), "alice.example.com", addr(1)).unwrap();
        assert_eq!(reg.resolve_by_domain("alice.example.com").unwrap().agent_id, id);
        assert_eq!(reg.resolve_by_address(&addr(1)).unwrap().domain, "alice.example.com");
        assert!(reg.resolve_by_address(&addr(9)).is_none());
    }

    #[test]
    fn duplicates_and_impersonation_rejected() {
        let mut reg = AgentRegistry::new();
        reg.register_agent(addr(1), "alice.example.com", addr(1)).unwrap();
        assert!(matches!(
            reg.register_agent(addr(2), "alice.example.com", addr(2)),
            Err(TrustEscrowError::DomainAlreadyRegistered(_))
        ));
        assert!(matches!(
            reg.register_agent(addr(1), "other.example.com", addr(1)),
            Err(TrustEscrowError::AddressAlreadyRegistered(_))
        ));
        assert!(matches!(
            reg.register_agent(addr(3), "mallory.example.com", addr(4)),
            Err(TrustEscrowError::InvalidArgument(_))
        ));
        assert!(reg.register_agent(addr(5), "  ", addr(5)).is_err());
    }

    #[test]
    fn rollback_undoes_registration_and_moves() {
        let mut reg = AgentRegistry::new();
        let alice = reg.register_agent(addr(1), "alice.example.com", addr(1)).unwrap();
        reg.commit();
        reg.update_agent(addr(1), alice, Some("alice.example.org"), Some(addr(2)))
            .unwrap();
        reg.register_agent(addr(3), "carol.example.com", addr(3)).unwrap();
        reg.rollback();

        assert_eq!(reg.agent_count(), 1);
        assert_eq!(reg.resolve_by_address(&addr(1)).unwrap().agent_id, alice);
        assert!(reg.resolve_by_address(&addr(2)).is_none());
        assert!(reg.resolve_by_domain("carol.example.com").is_none());
        assert_eq!(
            reg.register_agent(addr(3), "carol.example.com", addr(3)).unwrap(),
            AgentId(2)
        );
    }

    #[test]
    fn update_moves_indexes() {
        let mut reg = AgentRegistry::new();
        let id = reg.register_agent(addr(1), "alice.example.com", addr(1)).unwrap();
        assert!(matches!(
            reg.update_agent(addr(2), id, None, Some(addr(2))),
            Err(TrustEscrowError::UnauthorizedAgentUpdate(_))
        ));
        let info = reg
            .update_agent(addr(1), id, Some("alice.example.org"), Some(addr(2)))
            .unwrap();
        assert_eq!(info.address, addr(2));
        assert!(reg.resolve_by_address(&addr(1)).is_none());
        assert!(reg.resolve_by_domain("alice.example.com").is_none());
        assert_eq!(reg.resolve_by_domain("alice.example.org").unwrap().agent_id, id);
        assert!(matches!(
            reg.update_agent(addr(2), AgentId(42), None, None),
            Err(TrustEscrowError::AgentNotFound(_))
        ));
    }
}
