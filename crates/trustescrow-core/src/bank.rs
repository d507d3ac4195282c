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
use crate::types::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Native value movement. Either the whole transfer happens or none of it.
pub trait ValueTransfer {
    fn balance_of(&self, address: &Address) -> Amount;
    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> TrustEscrowResult<()>;
}

#[derive(Debug, Clone)]
enum BankUndo {
    Balance {
        address: Address,
        previous: Option<Amount>,
    },
    Supply(Amount),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bank {
    balances: BTreeMap<Address, Amount>,
    refusing: BTreeSet<Address>,
    total_supply: Amount,
    #[serde(skip)]
    journal: Journal<BankUndo>,
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, to: Address, amount: Amount) -> TrustEscrowResult<Amount> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| TrustEscrowError::InvalidArgument("supply overflow".to_string()))?;
        // supply bounds every balance, so this cannot overflow once the supply check passed
        let balance = self.balance_of(&to).saturating_add(amount);
        self.set_balance(to, balance);
        self.journal.record(BankUndo::Supply(self.total_supply));
        self.total_supply = supply;
        Ok(balance)
    }

    fn set_balance(&mut self, address: Address, amount: Amount) {
        let previous = self.balances.insert(address, amount);
        self.journal.record(BankUndo::Balance { address, previous });
    }

    /// Marks an address as one that rejects incoming value, like a contract
    /// without a receive hook.
    pub fn set_refuses_value(&mut self, address: Address, refuses: bool) {
        if refuses {
            self.refusing.insert(address);
        } else {
            self.refusing.remove(&address);
        }
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balances(&self) -> &BTreeMap<Address, Amount> {
        &self.balances
    }
}

impl ValueTransfer for Bank {
    fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> TrustEscrowResult<()> {
        if self.refusing.contains(&to) {
            return Err(TrustEscrowError::TransferFailed(format!(
                "{to} refuses incoming value"
            )));
        }
        if amount == 0 || from == to {
            return Ok(());
        }
        let from_balance = self.balance_of(&from);
        let next_from = from_balance.checked_sub(amount).ok_or_else(|| {
            TrustEscrowError::TransferFailed(format!(
                "insufficient balance: {from} holds {from_balance}, needs {amount}"
            ))
        })?;
        let next_to = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or_else(|| TrustEscrowError::TransferFailed(format!("{to} balance overflow")))?;
        self.set_balance(from, next_from);
        self.set_balance(to, next_to);
        Ok(())
    }
}

impl Transactional for Bank {
    fn commit(&mut self) {
        self.journal.clear();
    }

    fn rollback(&mut self) {
        for undo in self.journal.unwind() {
            match undo {
                BankUndo::Balance {
                    address,
                    previous: Some(amount),
                } => {
                    self.balances.insert(address, amount);
                }
                BankUndo::Balance {
                    address,
                    previous: None,
                } => {
                    self.balances.remove(&address);
                }
                BankUndo::Supply(supply) => self.total_supply = supply,
            }
        }
    }
}
